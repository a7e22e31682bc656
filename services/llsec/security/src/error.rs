//! Security sublayer error types.
//!
//! Every error here means "drop this frame" to the MAC layer; none of them is
//! fatal to the node.

use llsec_wire::{KeyIdMode, SecurityLevel, WireError};
use thiserror::Error;

/// Errors while securing an outbound frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The unsecured framer could not build the header
    #[error("header construction failed: {0}")]
    HeaderConstructionFailed(#[from] WireError),

    /// Resolved key index is out of range or not configured
    #[error("key not available: {0}")]
    KeyUnavailable(u16),

    /// The AEAD transform failed
    #[error("failed to authenticate frame")]
    AuthenticationFailed,

    /// Frame plus MIC does not fit the maximum frame size
    #[error("secured frame too long: {0}")]
    FrameTooLong(usize),
}

/// Errors while validating and unsecuring a received frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The unsecured framer could not parse the header
    #[error("could not parse frame: {0}")]
    HeaderParseFailed(#[from] WireError),

    /// Frame security level differs from the local policy
    #[error("wrong security level {received:?} (expected {expected:?})")]
    LevelMismatch {
        /// Level carried by the frame
        received: SecurityLevel,
        /// Locally configured level
        expected: SecurityLevel,
    },

    /// Frame key id mode differs from the local policy
    #[error("wrong key id mode {received:?} (expected {expected:?})")]
    KeyModeMismatch {
        /// Mode carried by the frame
        received: KeyIdMode,
        /// Locally configured mode
        expected: KeyIdMode,
    },

    /// Frame was sent by this node
    #[error("frame from ourselves")]
    SelfAddressed,

    /// Not enough data for the MIC
    #[error("too little data in frame: {data_len} bytes, MIC needs more than {mic_len}")]
    TooShort {
        /// Data length of the received frame
        data_len: usize,
        /// MIC length of the local policy
        mic_len: usize,
    },

    /// Resolved key index is out of range or not configured
    #[error("key not available: {0}")]
    KeyUnavailable(u16),

    /// MIC verification failed
    #[error("unauthentic frame")]
    AuthenticationFailed,
}

/// Errors from configuration calls
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Key slot index is not below the key store capacity
    #[error("key index {0} out of range")]
    KeyIndexOutOfRange(usize),

    /// Security level outside 0..=7
    #[error("invalid security level {0}")]
    InvalidLevel(u8),

    /// Unknown key id mode
    #[error("invalid key id mode {0}")]
    InvalidKeyIdMode(u8),

    /// Key material is not 16 bytes of hex
    #[error("invalid key material: {0}")]
    InvalidKey(String),
}
