//! Header field types shared by the framer and the security sublayer.
//!
//! Frame types, security levels and key identifier modes follow the IEEE
//! 802.15.4 numbering so that attribute values can be written to the wire
//! as-is.

use bitflags::bitflags;

/// Key index sentinel meaning "no key attached to this frame"
pub const KEY_INDEX_NONE: u16 = 0xffff;

/// Largest MIC produced by any security level
pub const MAX_MIC_LEN: usize = 16;

/// Frame types as defined by IEEE 802.15.4
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    /// Beacon frame
    Beacon = 0x00,
    /// Data frame
    Data = 0x01,
    /// Acknowledgment frame
    Ack = 0x02,
    /// MAC command frame
    Command = 0x03,
}

impl TryFrom<u8> for FrameType {
    type Error = crate::WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(FrameType::Beacon),
            0x01 => Ok(FrameType::Data),
            0x02 => Ok(FrameType::Ack),
            0x03 => Ok(FrameType::Command),
            _ => Err(crate::WireError::Type(value)),
        }
    }
}

/// Link-layer protection level (0..=7)
///
/// Bit 2 selects encryption, bits 0-1 select the MIC size. Level 0 means the
/// frame is neither authenticated nor encrypted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecurityLevel(u8);

impl SecurityLevel {
    /// No protection
    pub const NONE: SecurityLevel = SecurityLevel(0);
    /// Authentication only, 4-byte MIC
    pub const MIC_32: SecurityLevel = SecurityLevel(1);
    /// Authentication only, 8-byte MIC
    pub const MIC_64: SecurityLevel = SecurityLevel(2);
    /// Authentication only, 16-byte MIC
    pub const MIC_128: SecurityLevel = SecurityLevel(3);
    /// Encryption only
    pub const ENC: SecurityLevel = SecurityLevel(4);
    /// Encryption with a 4-byte MIC
    pub const ENC_MIC_32: SecurityLevel = SecurityLevel(5);
    /// Encryption with an 8-byte MIC
    pub const ENC_MIC_64: SecurityLevel = SecurityLevel(6);
    /// Encryption with a 16-byte MIC
    pub const ENC_MIC_128: SecurityLevel = SecurityLevel(7);

    /// Raw level value
    pub fn value(self) -> u8 {
        self.0
    }

    /// Whether any protection is applied
    pub fn is_secured(self) -> bool {
        self.0 > 0
    }

    /// Whether the payload is encrypted
    pub fn encrypts(self) -> bool {
        self.0 & 0x4 != 0
    }

    /// MIC length in bytes for this level
    pub fn mic_len(self) -> usize {
        match self.0 & 0x3 {
            0 => 0,
            bits => 2 << bits,
        }
    }

    /// All eight levels, lowest first
    pub fn all() -> impl Iterator<Item = SecurityLevel> {
        (0..=7).map(SecurityLevel)
    }
}

impl TryFrom<u8> for SecurityLevel {
    type Error = crate::WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= 7 {
            Ok(SecurityLevel(value))
        } else {
            Err(crate::WireError::Level(value))
        }
    }
}

impl From<SecurityLevel> for u8 {
    fn from(level: SecurityLevel) -> Self {
        level.0
    }
}

/// How the receiver determines which key protected a frame
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum KeyIdMode {
    /// Key is implied by the receiver's default key
    Implicit = 0,
    /// One-byte key index carried in the frame
    #[default]
    Index = 1,
    /// Key index plus a 4-byte key source
    Source4Index = 2,
    /// Key index plus an 8-byte key source
    Source8Index = 3,
}

impl TryFrom<u8> for KeyIdMode {
    type Error = crate::WireError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KeyIdMode::Implicit),
            1 => Ok(KeyIdMode::Index),
            2 => Ok(KeyIdMode::Source4Index),
            3 => Ok(KeyIdMode::Source8Index),
            _ => Err(crate::WireError::KeyMode(value)),
        }
    }
}

bitflags! {
    /// Frame control flags of the compact header
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FrameControl: u8 {
        /// Frame type, bit 0
        const TYPE_0 = 1 << 0;
        /// Frame type, bit 1
        const TYPE_1 = 1 << 1;
        /// Frame type, bit 2
        const TYPE_2 = 1 << 2;
        /// Auxiliary security header present
        const SECURITY = 1 << 3;
        /// Key id mode, bit 0
        const KEY_MODE_0 = 1 << 4;
        /// Key id mode, bit 1
        const KEY_MODE_1 = 1 << 5;
    }
}

impl FrameControl {
    const TYPE_MASK: u8 = 0x07;
    const KEY_MODE_SHIFT: u8 = 4;

    /// Pack a frame type, security bit and key id mode into frame control
    pub fn pack(typ: FrameType, secured: bool, mode: KeyIdMode) -> Self {
        let mut bits = (typ as u8) & Self::TYPE_MASK;
        if secured {
            bits |= Self::SECURITY.bits();
            bits |= (mode as u8) << Self::KEY_MODE_SHIFT;
        }
        Self::from_bits_retain(bits)
    }

    /// Frame type field
    pub fn frame_type(self) -> Result<FrameType, crate::WireError> {
        FrameType::try_from(self.bits() & Self::TYPE_MASK)
    }

    /// Key id mode field
    pub fn key_id_mode(self) -> Result<KeyIdMode, crate::WireError> {
        KeyIdMode::try_from((self.bits() >> Self::KEY_MODE_SHIFT) & 0x3)
    }
}
