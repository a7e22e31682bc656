//! Unsecured framing.
//!
//! The security sublayer never lays out header fields itself; it hands the
//! frame descriptor to a [`Framer`] and works on whatever header length the
//! framer reports.

use crate::addr::{LinkAddr, LINKADDR_SIZE};
use crate::frame::FrameDescriptor;
use crate::header::{FrameControl, KeyIdMode, SecurityLevel, KEY_INDEX_NONE};
use crate::WireError;
use bytes::{Buf, BufMut, BytesMut};
use tracing::trace;

/// Compact header size without an auxiliary security header
pub const COMPACT_BASE_HEADER_LEN: usize = 2 + 2 * LINKADDR_SIZE;

/// Auxiliary security header size: level plus frame counter
const AUX_SECURITY_LEN: usize = 1 + 4;

/// Lays out and parses unsecured link-layer headers in place
pub trait Framer {
    /// Write the header described by the frame attributes in front of the
    /// payload, returning the header length
    fn create(&mut self, frame: &mut FrameDescriptor) -> Result<usize, WireError>;

    /// Parse the header at the front of a received frame into its attributes,
    /// returning the header length
    fn parse(&mut self, frame: &mut FrameDescriptor) -> Result<usize, WireError>;

    /// Header length `create` would produce for this frame
    fn length(&self, frame: &FrameDescriptor) -> usize;
}

/// Minimal fixed-layout framer
///
/// ```text
/// 0       frame control (type, security bit, key id mode)
/// 1       sequence number
/// 2..10   receiver address
/// 10..18  sender address
/// -- security level > 0 --
/// 18      security level
/// 19..23  frame counter (little endian)
/// 23      key index (key id mode other than implicit)
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct CompactFramer;

impl CompactFramer {
    /// Create a new compact framer
    pub fn new() -> Self {
        Self
    }

    fn header_len(level: SecurityLevel, mode: KeyIdMode) -> usize {
        let mut len = COMPACT_BASE_HEADER_LEN;
        if level.is_secured() {
            len += AUX_SECURITY_LEN;
            if mode != KeyIdMode::Implicit {
                len += 1;
            }
        }
        len
    }
}

impl Framer for CompactFramer {
    fn create(&mut self, frame: &mut FrameDescriptor) -> Result<usize, WireError> {
        let attrs = *frame.attrs();
        let secured = attrs.security_level.is_secured();
        let len = Self::header_len(attrs.security_level, attrs.key_id_mode);

        let mut hdr = BytesMut::with_capacity(len);
        hdr.put_u8(FrameControl::pack(attrs.frame_type, secured, attrs.key_id_mode).bits());
        hdr.put_u8(attrs.seqno);
        hdr.put_slice(attrs.receiver.as_bytes());
        hdr.put_slice(attrs.sender.as_bytes());
        if secured {
            hdr.put_u8(attrs.security_level.value());
            hdr.put_u32_le(attrs.frame_counter);
            if attrs.key_id_mode != KeyIdMode::Implicit {
                // A sentinel index goes out as 0xff and is refused at key lookup
                hdr.put_u8(u8::try_from(attrs.key_index).unwrap_or(u8::MAX));
            }
        }

        frame.prepend_header(&hdr)?;
        trace!("compact header created len={} data_len={}", len, frame.data_len());
        Ok(len)
    }

    fn parse(&mut self, frame: &mut FrameDescriptor) -> Result<usize, WireError> {
        let mut raw = frame.payload();
        if raw.len() < COMPACT_BASE_HEADER_LEN {
            return Err(WireError::Incomplete);
        }

        let fc = FrameControl::from_bits(raw.get_u8()).ok_or(WireError::Reserved)?;
        let frame_type = fc.frame_type()?;
        let seqno = raw.get_u8();
        let receiver = LinkAddr::from_slice(&raw[..LINKADDR_SIZE]).ok_or(WireError::Malformed)?;
        raw.advance(LINKADDR_SIZE);
        let sender = LinkAddr::from_slice(&raw[..LINKADDR_SIZE]).ok_or(WireError::Malformed)?;
        raw.advance(LINKADDR_SIZE);

        let mut security_level = SecurityLevel::NONE;
        let mut key_id_mode = KeyIdMode::Implicit;
        let mut key_index = KEY_INDEX_NONE;
        let mut frame_counter = 0;

        if fc.contains(FrameControl::SECURITY) {
            key_id_mode = fc.key_id_mode()?;
            let aux_len = Self::header_len(SecurityLevel::MIC_32, key_id_mode)
                - COMPACT_BASE_HEADER_LEN;
            if raw.len() < aux_len {
                return Err(WireError::Incomplete);
            }
            security_level = SecurityLevel::try_from(raw.get_u8())?;
            if !security_level.is_secured() {
                return Err(WireError::Malformed);
            }
            frame_counter = raw.get_u32_le();
            if key_id_mode != KeyIdMode::Implicit {
                key_index = u16::from(raw.get_u8());
            }
        } else if fc.intersects(FrameControl::KEY_MODE_0 | FrameControl::KEY_MODE_1) {
            return Err(WireError::Reserved);
        }

        let len = Self::header_len(security_level, key_id_mode);
        frame.reduce_header(len)?;

        let attrs = frame.attrs_mut();
        attrs.frame_type = frame_type;
        attrs.seqno = seqno;
        attrs.receiver = receiver;
        attrs.sender = sender;
        attrs.security_level = security_level;
        attrs.key_id_mode = key_id_mode;
        attrs.key_index = key_index;
        attrs.frame_counter = frame_counter;

        trace!("compact header parsed len={} data_len={}", len, frame.data_len());
        Ok(len)
    }

    fn length(&self, frame: &FrameDescriptor) -> usize {
        let attrs = frame.attrs();
        Self::header_len(attrs.security_level, attrs.key_id_mode)
    }
}
