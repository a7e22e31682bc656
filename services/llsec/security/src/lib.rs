//! IEEE 802.15.4 link-layer security sublayer.
//!
//! Sits between the MAC and an unsecured [`Framer`](llsec_wire::Framer):
//! outbound frames get a frame counter, an optional encrypted payload and a
//! MIC; inbound frames are checked against the local policy, authenticated and
//! decrypted before they reach upper layers.
//!
//! ## Architecture
//!
//! ```text
//!        MAC  (send / input)
//!          |
//!   +------v----------------------------+
//!   | SecureFramer                      |
//!   |   FrameCounterStore  (anti_replay) |
//!   |   AeadAdapter        (ccm_star)    |
//!   +------+-------------------+--------+
//!          |                   |
//!   Framer (llsec-wire)   SecurityContext
//!                          (keys + policy)
//! ```
//!
//! ## Example
//!
//! ```
//! use llsec_security::{LinkKey, SecureFramer, SecurityContext, SecurityPolicy};
//! use llsec_wire::{CompactFramer, FrameAttributes, FrameDescriptor, LinkAddr};
//! use std::sync::Arc;
//!
//! let ctx = Arc::new(SecurityContext::new(LinkAddr::new([1; 8]), SecurityPolicy::default()));
//! ctx.set_key(0, LinkKey::new([0x2b; 16])).unwrap();
//!
//! let mut llsec = SecureFramer::new(ctx, CompactFramer::new());
//! let mut frame = FrameDescriptor::outbound(b"hello", FrameAttributes::default()).unwrap();
//! llsec.prepare_outbound(&mut frame);
//! let hdr_len = llsec.create_secure_frame(&mut frame).unwrap();
//! assert_eq!(frame.total_len(), hdr_len + 5 + 4);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aead;
pub mod anti_replay;
pub mod ccm_star;
pub mod context;
pub mod error;
pub mod keys;
pub mod policy;
pub mod secure;

// Re-export main types
pub use aead::{frame_nonce, AeadAdapter, Nonce, NONCE_LEN};
pub use anti_replay::{AntiReplay, FrameCounterStore};
pub use ccm_star::CcmStar;
pub use context::{SecurityContext, SecurityState};
pub use error::{ConfigError, DecodeError, EncodeError};
pub use keys::{KeyStore, LinkKey, KEY_LEN, MAX_KEYS};
pub use policy::{SecurityPolicy, DEFAULT_KEY_INDEX, DEFAULT_SECURITY_LEVEL};
pub use secure::SecureFramer;
