//! Frame descriptor for one in-flight link-layer frame.
//!
//! The buffer holds `header | payload | trailer`. The header cursor marks where
//! the payload starts and the data length marks where it ends; anything after
//! that (a MIC while it is being produced or checked) is trailer.

use crate::addr::LinkAddr;
use crate::header::{FrameType, KeyIdMode, SecurityLevel, KEY_INDEX_NONE};
use crate::WireError;
use bytes::{Bytes, BytesMut};

/// Maximum frame size (IEEE 802.15.4 aMaxPhyPacketSize)
pub const MAX_FRAME_SIZE: usize = 127;

/// Typed attributes of a frame, read and written by the framer and the
/// security sublayer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameAttributes {
    /// Frame type
    pub frame_type: FrameType,
    /// Protection level carried by the frame
    pub security_level: SecurityLevel,
    /// Key identifier mode carried by the frame
    pub key_id_mode: KeyIdMode,
    /// Key index, or [`KEY_INDEX_NONE`]
    pub key_index: u16,
    /// Outbound or received frame counter
    pub frame_counter: u32,
    /// MAC sequence number
    pub seqno: u8,
    /// Sender link address
    pub sender: LinkAddr,
    /// Receiver link address
    pub receiver: LinkAddr,
}

impl Default for FrameAttributes {
    fn default() -> Self {
        Self {
            frame_type: FrameType::Data,
            security_level: SecurityLevel::NONE,
            key_id_mode: KeyIdMode::Implicit,
            key_index: KEY_INDEX_NONE,
            frame_counter: 0,
            seqno: 0,
            sender: LinkAddr::NULL,
            receiver: LinkAddr::NULL,
        }
    }
}

/// Mutable record of one MAC frame being encoded or decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    buf: BytesMut,
    hdr_len: usize,
    data_len: usize,
    attrs: FrameAttributes,
}

impl FrameDescriptor {
    /// Create an outbound frame holding only a payload
    pub fn outbound(payload: &[u8], attrs: FrameAttributes) -> Result<Self, WireError> {
        if payload.len() > MAX_FRAME_SIZE {
            return Err(WireError::Size(payload.len()));
        }
        Ok(Self {
            buf: BytesMut::from(payload),
            hdr_len: 0,
            data_len: payload.len(),
            attrs,
        })
    }

    /// Create an inbound frame from received bytes; the framer splits off the
    /// header when parsing
    pub fn inbound(raw: &[u8]) -> Result<Self, WireError> {
        if raw.len() > MAX_FRAME_SIZE {
            return Err(WireError::Size(raw.len()));
        }
        Ok(Self {
            buf: BytesMut::from(raw),
            hdr_len: 0,
            data_len: raw.len(),
            attrs: FrameAttributes::default(),
        })
    }

    /// Frame attributes
    pub fn attrs(&self) -> &FrameAttributes {
        &self.attrs
    }

    /// Mutable frame attributes
    pub fn attrs_mut(&mut self) -> &mut FrameAttributes {
        &mut self.attrs
    }

    /// Header length
    pub fn hdr_len(&self) -> usize {
        self.hdr_len
    }

    /// Data length (payload, plus MIC once an outbound frame is secured)
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Header plus data length
    pub fn total_len(&self) -> usize {
        self.hdr_len + self.data_len
    }

    /// Header bytes
    pub fn header(&self) -> &[u8] {
        &self.buf[..self.hdr_len]
    }

    /// Data bytes following the header
    pub fn payload(&self) -> &[u8] {
        &self.buf[self.hdr_len..self.total_len()]
    }

    /// Mutable data bytes following the header
    pub fn payload_mut(&mut self) -> &mut [u8] {
        let end = self.total_len();
        &mut self.buf[self.hdr_len..end]
    }

    /// Header and data as they go on air
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.total_len()]
    }

    /// Mutable header and data, used to corrupt frames in tests and by radios
    /// that patch fields after framing
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        let end = self.total_len();
        &mut self.buf[..end]
    }

    /// Consume the descriptor, returning header and data
    pub fn into_bytes(mut self) -> Bytes {
        self.buf.truncate(self.total_len());
        self.buf.freeze()
    }

    /// Place a freshly built header in front of the data
    pub fn prepend_header(&mut self, header: &[u8]) -> Result<(), WireError> {
        if self.hdr_len != 0 {
            return Err(WireError::Malformed);
        }
        let total = header.len() + self.data_len;
        if total > MAX_FRAME_SIZE {
            return Err(WireError::Size(total));
        }

        let mut buf = BytesMut::with_capacity(MAX_FRAME_SIZE);
        buf.extend_from_slice(header);
        buf.extend_from_slice(&self.buf[..self.data_len]);
        self.buf = buf;
        self.hdr_len = header.len();
        Ok(())
    }

    /// Move `len` leading data bytes into the header region
    pub fn reduce_header(&mut self, len: usize) -> Result<(), WireError> {
        if len > self.data_len {
            return Err(WireError::Incomplete);
        }
        self.hdr_len += len;
        self.data_len -= len;
        Ok(())
    }

    /// Set the data length; the new end must lie within the buffer
    pub fn set_data_len(&mut self, len: usize) -> Result<(), WireError> {
        let end = self.hdr_len.checked_add(len).ok_or(WireError::Size(usize::MAX))?;
        if end > self.buf.len() {
            return Err(WireError::Size(end));
        }
        self.data_len = len;
        Ok(())
    }

    /// Make room for `len` trailer bytes after the data
    pub fn reserve_trailer(&mut self, len: usize) -> Result<(), WireError> {
        let end = self.total_len() + len;
        if end > MAX_FRAME_SIZE {
            return Err(WireError::Size(end));
        }
        if self.buf.len() < end {
            self.buf.resize(end, 0);
        }
        Ok(())
    }

    /// The `len` bytes following the data, if present
    pub fn trailer(&self, len: usize) -> Option<&[u8]> {
        let start = self.total_len();
        self.buf.get(start..start.checked_add(len)?)
    }

    /// Split the frame into `(a, m, trailer)` for an AEAD invocation.
    ///
    /// `a` is the first `aad_len` bytes, `m` runs from there to the end of the
    /// data, and `trailer` is the `mic_len` bytes after the data. Returns `None`
    /// when the regions do not fit the buffer.
    pub fn aead_regions(
        &mut self,
        aad_len: usize,
        mic_len: usize,
    ) -> Option<(&[u8], &mut [u8], &mut [u8])> {
        let total = self.total_len();
        if aad_len > total {
            return None;
        }
        let end = total.checked_add(mic_len)?;
        let region = self.buf.get_mut(..end)?;
        let (a, rest) = region.split_at_mut(aad_len);
        let (m, trailer) = rest.split_at_mut(total - aad_len);
        Some((&*a, m, trailer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outbound_layout() {
        let mut frame = FrameDescriptor::outbound(b"PING", FrameAttributes::default()).unwrap();
        assert_eq!(frame.hdr_len(), 0);
        assert_eq!(frame.data_len(), 4);

        frame.prepend_header(&[0xAA; 9]).unwrap();
        assert_eq!(frame.hdr_len(), 9);
        assert_eq!(frame.total_len(), 13);
        assert_eq!(frame.header(), &[0xAA; 9]);
        assert_eq!(frame.payload(), b"PING");
    }

    #[test]
    fn test_prepend_header_twice_fails() {
        let mut frame = FrameDescriptor::outbound(b"x", FrameAttributes::default()).unwrap();
        frame.prepend_header(&[1, 2]).unwrap();
        assert_eq!(frame.prepend_header(&[3]), Err(WireError::Malformed));
    }

    #[test]
    fn test_size_limits() {
        let big = vec![0u8; MAX_FRAME_SIZE + 1];
        assert_eq!(
            FrameDescriptor::outbound(&big, FrameAttributes::default()),
            Err(WireError::Size(MAX_FRAME_SIZE + 1))
        );
        assert!(FrameDescriptor::inbound(&big).is_err());

        let mut frame =
            FrameDescriptor::outbound(&[0u8; MAX_FRAME_SIZE - 4], FrameAttributes::default())
                .unwrap();
        assert!(frame.prepend_header(&[0u8; 5]).is_err());
        assert!(frame.reserve_trailer(4).is_ok());
        assert!(frame.reserve_trailer(5).is_err());
    }

    #[test]
    fn test_reduce_header_and_trailer() {
        let mut frame = FrameDescriptor::inbound(&[1, 2, 3, 4, 5, 6]).unwrap();
        frame.reduce_header(2).unwrap();
        assert_eq!(frame.header(), &[1, 2]);
        frame.set_data_len(2).unwrap();
        assert_eq!(frame.payload(), &[3, 4]);
        assert_eq!(frame.trailer(2), Some(&[5u8, 6][..]));
        assert_eq!(frame.trailer(3), None);
        assert!(frame.set_data_len(5).is_err());
        assert_eq!(frame.reduce_header(3), Err(WireError::Incomplete));
    }

    #[test]
    fn test_aead_regions() {
        let mut frame = FrameDescriptor::inbound(&[1, 2, 3, 4, 5, 6, 7]).unwrap();
        frame.reduce_header(2).unwrap();
        frame.set_data_len(3).unwrap();

        let (a, m, mic) = frame.aead_regions(2, 2).unwrap();
        assert_eq!(a, &[1, 2]);
        assert_eq!(m, &[3, 4, 5]);
        assert_eq!(mic, &[6, 7]);

        let (a, m, _) = frame.aead_regions(5, 2).unwrap();
        assert_eq!(a.len(), 5);
        assert!(m.is_empty());

        assert!(frame.aead_regions(6, 0).is_none());
        assert!(frame.aead_regions(2, 3).is_none());
    }

    #[test]
    fn test_into_bytes_drops_trailer() {
        let mut frame = FrameDescriptor::inbound(&[1, 2, 3, 4]).unwrap();
        frame.set_data_len(2).unwrap();
        assert_eq!(frame.into_bytes().as_ref(), &[1, 2]);
    }
}
