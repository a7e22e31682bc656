//! Link-layer addresses.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Link-layer address size in bytes (IEEE 802.15.4 extended address)
pub const LINKADDR_SIZE: usize = 8;

/// Extended link-layer address of a node
#[derive(Clone, Copy, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkAddr(pub [u8; LINKADDR_SIZE]);

impl LinkAddr {
    /// The null address
    pub const NULL: LinkAddr = LinkAddr([0; LINKADDR_SIZE]);

    /// Create an address from raw bytes
    pub const fn new(bytes: [u8; LINKADDR_SIZE]) -> Self {
        Self(bytes)
    }

    /// Build an address from a slice, `None` unless it is exactly 8 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; LINKADDR_SIZE] = bytes.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; LINKADDR_SIZE] {
        &self.0
    }

    /// Whether this is the null address
    pub fn is_null(&self) -> bool {
        *self == Self::NULL
    }
}

impl From<[u8; LINKADDR_SIZE]> for LinkAddr {
    fn from(bytes: [u8; LINKADDR_SIZE]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pair) in self.0.chunks(2).enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{:02x}{:02x}", pair[0], pair[1])?;
        }
        Ok(())
    }
}

/// Error returned when a link address string cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid link address: {0}")]
pub struct ParseLinkAddrError(pub String);

impl FromStr for LinkAddr {
    type Err = ParseLinkAddrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ':' | '.' | '-'))
            .collect();
        let bytes = hex::decode(&digits).map_err(|_| ParseLinkAddrError(s.to_string()))?;
        Self::from_slice(&bytes).ok_or_else(|| ParseLinkAddrError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let addr = LinkAddr::new([0x00, 0x12, 0x4b, 0x00, 0x06, 0x14, 0x12, 0x34]);
        assert_eq!(addr.to_string(), "0012.4b00.0614.1234");
    }

    #[test]
    fn test_parse_with_separators() {
        let expected = LinkAddr::new([0x00, 0x12, 0x4b, 0x00, 0x06, 0x14, 0x12, 0x34]);
        assert_eq!("0012.4b00.0614.1234".parse::<LinkAddr>().unwrap(), expected);
        assert_eq!("00:12:4b:00:06:14:12:34".parse::<LinkAddr>().unwrap(), expected);
        assert_eq!("00124b0006141234".parse::<LinkAddr>().unwrap(), expected);
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("0012.4b00".parse::<LinkAddr>().is_err());
        assert!("zz12.4b00.0614.1234".parse::<LinkAddr>().is_err());
    }

    #[test]
    fn test_null() {
        assert!(LinkAddr::NULL.is_null());
        assert!(!LinkAddr::new([1; 8]).is_null());
    }
}
