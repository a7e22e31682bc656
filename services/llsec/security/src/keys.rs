//! Fixed-capacity link key store.

use crate::error::ConfigError;
use std::fmt;
use tracing::debug;

/// Number of key slots
pub const MAX_KEYS: usize = 16;

/// Link key length in bytes (AES-128)
pub const KEY_LEN: usize = 16;

/// 128-bit symmetric link key
#[derive(Clone, PartialEq, Eq)]
pub struct LinkKey([u8; KEY_LEN]);

impl LinkKey {
    /// Wrap raw key bytes
    pub const fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a key from 32 hex digits
    pub fn from_hex(s: &str) -> Result<Self, ConfigError> {
        let bytes = hex::decode(s.trim()).map_err(|e| ConfigError::InvalidKey(e.to_string()))?;
        let bytes: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| ConfigError::InvalidKey(format!("{} bytes", b.len())))?;
        Ok(Self(bytes))
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}...{:02x}", self.0[0], self.0[KEY_LEN - 1])
    }
}

/// Key table indexed by a small integer; unset slots are never handed out
#[derive(Debug, Clone, Default)]
pub struct KeyStore {
    slots: [Option<LinkKey>; MAX_KEYS],
}

impl KeyStore {
    /// Create an empty key store
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `key` at `index`
    pub fn set_key(&mut self, index: usize, key: LinkKey) -> Result<(), ConfigError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ConfigError::KeyIndexOutOfRange(index))?;
        debug!("key {} set to {:?}", index, key);
        *slot = Some(key);
        Ok(())
    }

    /// Remove the key at `index`
    pub fn clear_key(&mut self, index: usize) -> Result<(), ConfigError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ConfigError::KeyIndexOutOfRange(index))?;
        *slot = None;
        Ok(())
    }

    /// Key at `index`, `None` when out of range or unset
    pub fn get_key(&self, index: usize) -> Option<&LinkKey> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Whether a key is configured at `index`
    pub fn is_set(&self, index: usize) -> bool {
        self.get_key(index).is_some()
    }

    /// Number of configured keys
    pub fn configured(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get() {
        let mut store = KeyStore::new();
        assert_eq!(store.configured(), 0);
        assert!(store.get_key(0).is_none());

        store.set_key(3, LinkKey::new([7; KEY_LEN])).unwrap();
        assert_eq!(store.get_key(3), Some(&LinkKey::new([7; KEY_LEN])));
        assert!(store.is_set(3));
        assert!(!store.is_set(2));
        assert_eq!(store.configured(), 1);

        store.clear_key(3).unwrap();
        assert!(store.get_key(3).is_none());
    }

    #[test]
    fn test_out_of_range_leaves_store_unchanged() {
        let mut store = KeyStore::new();
        store.set_key(0, LinkKey::new([1; KEY_LEN])).unwrap();

        assert_eq!(
            store.set_key(MAX_KEYS, LinkKey::new([2; KEY_LEN])),
            Err(ConfigError::KeyIndexOutOfRange(MAX_KEYS))
        );
        assert_eq!(store.configured(), 1);
        assert!(store.get_key(MAX_KEYS).is_none());
        assert!(store.get_key(usize::MAX).is_none());
        assert!(store.clear_key(MAX_KEYS + 1).is_err());
    }

    #[test]
    fn test_from_hex() {
        let key = LinkKey::from_hex("000102030405060708090a0b0c0d0e0f").unwrap();
        assert_eq!(key.as_bytes()[15], 0x0f);
        assert_eq!(format!("{:?}", key), "00...0f");

        assert!(LinkKey::from_hex("0001").is_err());
        assert!(LinkKey::from_hex("not hex at all, not hex at all!!").is_err());
    }
}
