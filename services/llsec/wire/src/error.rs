//! Wire layer error types.

use thiserror::Error;

/// Errors raised while laying out or parsing an unsecured link-layer frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Buffer ended before the header was complete
    #[error("incomplete frame")]
    Incomplete,

    /// Frame would exceed the maximum frame size
    #[error("size limit exceeded: {0}")]
    Size(usize),

    /// Unknown frame type
    #[error("unknown frame type {0}")]
    Type(u8),

    /// Security level outside 0..=7
    #[error("invalid security level {0}")]
    Level(u8),

    /// Unknown key identifier mode
    #[error("invalid key id mode {0}")]
    KeyMode(u8),

    /// Reserved bits nonzero
    #[error("reserved bits nonzero")]
    Reserved,

    /// Malformed frame structure
    #[error("malformed frame")]
    Malformed,
}
