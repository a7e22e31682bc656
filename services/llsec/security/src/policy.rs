//! Security policy: the locally configured protection parameters.

use crate::error::ConfigError;
use crate::keys::MAX_KEYS;
use llsec_wire::{KeyIdMode, SecurityLevel};

/// Default protection level (encryption with a 4-byte MIC)
pub const DEFAULT_SECURITY_LEVEL: SecurityLevel = SecurityLevel::ENC_MIC_32;

/// Default key index
pub const DEFAULT_KEY_INDEX: u8 = 0;

/// Locally configured protection parameters
///
/// `enabled == false` turns the sublayer into a pass-through to the framer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityPolicy {
    enabled: bool,
    level: SecurityLevel,
    key_id_mode: KeyIdMode,
    default_key: u8,
    frame_counter: bool,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            level: DEFAULT_SECURITY_LEVEL,
            key_id_mode: KeyIdMode::Index,
            default_key: DEFAULT_KEY_INDEX,
            frame_counter: true,
        }
    }
}

impl SecurityPolicy {
    /// Enabled policy with the given level and key id mode
    pub fn new(level: SecurityLevel, key_id_mode: KeyIdMode) -> Self {
        Self {
            level,
            key_id_mode,
            ..Self::default()
        }
    }

    /// Policy with link-layer security switched off entirely
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            level: SecurityLevel::NONE,
            ..Self::default()
        }
    }

    /// Whether the security sublayer is active at all
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Switch the security sublayer on or off
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Configured protection level
    pub fn level(&self) -> SecurityLevel {
        self.level
    }

    /// Set the protection level
    pub fn set_level(&mut self, level: SecurityLevel) {
        self.level = level;
    }

    /// Set the protection level from its raw value
    pub fn set_level_raw(&mut self, level: u8) -> Result<(), ConfigError> {
        self.level = SecurityLevel::try_from(level).map_err(|_| ConfigError::InvalidLevel(level))?;
        Ok(())
    }

    /// Configured key id mode
    pub fn key_id_mode(&self) -> KeyIdMode {
        self.key_id_mode
    }

    /// Set the key id mode
    pub fn set_key_id_mode(&mut self, mode: KeyIdMode) {
        self.key_id_mode = mode;
    }

    /// Default key index, used for implicit key id mode
    pub fn default_key(&self) -> u8 {
        self.default_key
    }

    /// Set the default key index; out-of-range indices leave the policy unchanged
    pub fn set_default_key(&mut self, index: usize) -> Result<(), ConfigError> {
        if index >= MAX_KEYS {
            return Err(ConfigError::KeyIndexOutOfRange(index));
        }
        self.default_key = index as u8;
        Ok(())
    }

    /// Whether nonces carry the frame counter
    pub fn uses_frame_counter(&self) -> bool {
        self.frame_counter
    }

    /// Turn frame counters in nonces on or off
    pub fn set_frame_counter(&mut self, enabled: bool) {
        self.frame_counter = enabled;
    }

    /// MIC length implied by the protection level
    pub fn mic_len(&self) -> usize {
        self.level.mic_len()
    }

    /// Whether frames are protected under this policy
    pub fn is_secured(&self) -> bool {
        self.enabled && self.level.is_secured()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let policy = SecurityPolicy::default();
        assert!(policy.is_enabled());
        assert_eq!(policy.level(), SecurityLevel::ENC_MIC_32);
        assert_eq!(policy.mic_len(), 4);
        assert_eq!(policy.key_id_mode(), KeyIdMode::Index);
        assert_eq!(policy.default_key(), 0);
        assert!(policy.uses_frame_counter());
    }

    #[test]
    fn test_mic_len_follows_level() {
        let mut policy = SecurityPolicy::default();
        for (raw, mic) in [(0, 0), (1, 4), (2, 8), (3, 16), (4, 0), (5, 4), (6, 8), (7, 16)] {
            policy.set_level_raw(raw).unwrap();
            assert_eq!(policy.mic_len(), mic, "level {}", raw);
        }
        assert_eq!(policy.set_level_raw(8), Err(ConfigError::InvalidLevel(8)));
        assert_eq!(policy.level().value(), 7);
    }

    #[test]
    fn test_default_key_bounds() {
        let mut policy = SecurityPolicy::default();
        policy.set_default_key(MAX_KEYS - 1).unwrap();
        assert_eq!(policy.default_key() as usize, MAX_KEYS - 1);

        assert_eq!(
            policy.set_default_key(MAX_KEYS),
            Err(ConfigError::KeyIndexOutOfRange(MAX_KEYS))
        );
        assert_eq!(policy.default_key() as usize, MAX_KEYS - 1);
    }

    #[test]
    fn test_disabled() {
        let policy = SecurityPolicy::disabled();
        assert!(!policy.is_enabled());
        assert!(!policy.is_secured());
        assert_eq!(policy.mic_len(), 0);
    }
}
