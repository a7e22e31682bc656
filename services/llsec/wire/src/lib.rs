//! Link addresses, frame descriptors and unsecured framing for llsec.
//!
//! This crate provides the frame-level plumbing the link-layer security
//! sublayer sits on: typed frame attributes, a bounds-checked frame buffer
//! with header/payload/trailer regions, and the [`Framer`] seam that lays out
//! and parses unsecured headers.
//!
//! ## Frame Layout
//!
//! ```text
//! +----------------------+----------------------------+
//! | header               | written/parsed by a Framer |
//! +----------------------+----------------------------+
//! | payload              | plaintext or ciphertext    |
//! +----------------------+----------------------------+
//! | MIC (opt)            | 0, 4, 8 or 16 bytes        |
//! +----------------------+----------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod addr;
pub mod error;
pub mod frame;
pub mod framer;
pub mod header;

// Re-export main types
pub use addr::{LinkAddr, ParseLinkAddrError, LINKADDR_SIZE};
pub use error::WireError;
pub use frame::{FrameAttributes, FrameDescriptor, MAX_FRAME_SIZE};
pub use framer::{CompactFramer, Framer, COMPACT_BASE_HEADER_LEN};
pub use header::{FrameControl, FrameType, KeyIdMode, SecurityLevel, KEY_INDEX_NONE, MAX_MIC_LEN};
