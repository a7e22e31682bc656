//! Shared security configuration for one node.
//!
//! Keys and policy are written by configuration calls and read by every
//! encode/decode. Frame processing holds a read guard for the whole call, so a
//! key rotation waits for in-flight AEAD work to finish and never hands out a
//! partially written key.

use crate::error::ConfigError;
use crate::keys::{KeyStore, LinkKey};
use crate::policy::SecurityPolicy;
use llsec_wire::{KeyIdMode, LinkAddr, SecurityLevel};
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::info;

/// Key store and policy, guarded together
#[derive(Debug, Clone, Default)]
pub struct SecurityState {
    /// Link keys
    pub keys: KeyStore,
    /// Protection parameters
    pub policy: SecurityPolicy,
}

/// Per-node security configuration shared between the MAC and configuration
/// paths
#[derive(Debug)]
pub struct SecurityContext {
    local_addr: LinkAddr,
    state: RwLock<SecurityState>,
}

impl SecurityContext {
    /// Create a context with an empty key store and the given policy
    pub fn new(local_addr: LinkAddr, policy: SecurityPolicy) -> Self {
        Self::with_state(
            local_addr,
            SecurityState {
                keys: KeyStore::new(),
                policy,
            },
        )
    }

    /// Create a context from a fully provisioned state
    pub fn with_state(local_addr: LinkAddr, state: SecurityState) -> Self {
        Self {
            local_addr,
            state: RwLock::new(state),
        }
    }

    /// This node's link address
    pub fn local_addr(&self) -> LinkAddr {
        self.local_addr
    }

    /// Read access for frame processing
    pub fn read(&self) -> RwLockReadGuard<'_, SecurityState> {
        self.state.read()
    }

    /// Copy of the current policy
    pub fn policy(&self) -> SecurityPolicy {
        self.state.read().policy
    }

    /// Install a key
    pub fn set_key(&self, index: usize, key: LinkKey) -> Result<(), ConfigError> {
        self.state.write().keys.set_key(index, key)
    }

    /// Remove a key
    pub fn clear_key(&self, index: usize) -> Result<(), ConfigError> {
        self.state.write().keys.clear_key(index)
    }

    /// Change the protection level
    pub fn set_level(&self, level: SecurityLevel) {
        info!("llsec level set to {}", level.value());
        self.state.write().policy.set_level(level);
    }

    /// Change the key id mode
    pub fn set_key_id_mode(&self, mode: KeyIdMode) {
        self.state.write().policy.set_key_id_mode(mode);
    }

    /// Change the default key index
    pub fn set_default_key(&self, index: usize) -> Result<(), ConfigError> {
        self.state.write().policy.set_default_key(index)
    }

    /// Turn frame counters in nonces on or off
    pub fn set_frame_counter(&self, enabled: bool) {
        self.state.write().policy.set_frame_counter(enabled);
    }

    /// Switch the security sublayer on or off
    pub fn set_enabled(&self, enabled: bool) {
        info!("llsec {}", if enabled { "enabled" } else { "disabled" });
        self.state.write().policy.set_enabled(enabled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{KEY_LEN, MAX_KEYS};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_configuration_calls() {
        let ctx = SecurityContext::new(LinkAddr::new([1; 8]), SecurityPolicy::default());
        ctx.set_level(SecurityLevel::MIC_128);
        ctx.set_key_id_mode(KeyIdMode::Implicit);
        ctx.set_default_key(2).unwrap();
        ctx.set_key(2, LinkKey::new([9; KEY_LEN])).unwrap();

        let policy = ctx.policy();
        assert_eq!(policy.level(), SecurityLevel::MIC_128);
        assert_eq!(policy.key_id_mode(), KeyIdMode::Implicit);
        assert_eq!(policy.default_key(), 2);
        assert!(ctx.read().keys.is_set(2));

        assert!(ctx.set_default_key(MAX_KEYS).is_err());
        assert!(ctx.set_key(MAX_KEYS, LinkKey::new([0; KEY_LEN])).is_err());
        assert_eq!(ctx.policy().default_key(), 2);
        assert_eq!(ctx.read().keys.configured(), 1);
    }

    #[test]
    fn test_concurrent_rotation_and_reads() {
        let ctx = Arc::new(SecurityContext::new(LinkAddr::NULL, SecurityPolicy::default()));
        ctx.set_key(0, LinkKey::new([0; KEY_LEN])).unwrap();

        let writer = {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for round in 0..200u8 {
                    ctx.set_key(0, LinkKey::new([round; KEY_LEN])).unwrap();
                }
            })
        };

        for _ in 0..200 {
            let state = ctx.read();
            let key = state.keys.get_key(0).unwrap().as_bytes();
            assert!(key.iter().all(|b| *b == key[0]), "torn key observed");
        }

        writer.join().unwrap();
        assert_eq!(ctx.read().keys.get_key(0).unwrap().as_bytes(), &[199; KEY_LEN]);
    }
}
