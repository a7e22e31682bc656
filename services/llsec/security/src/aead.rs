//! AEAD adapter seam and CCM* nonce construction.

use crate::keys::LinkKey;
use llsec_wire::{LinkAddr, SecurityLevel, LINKADDR_SIZE};

/// CCM* nonce length
pub const NONCE_LEN: usize = 13;

/// CCM* nonce
pub type Nonce = [u8; NONCE_LEN];

/// Authenticated encryption transform used by the security sublayer
pub trait AeadAdapter {
    /// Load the key used by subsequent [`aead`](AeadAdapter::aead) calls
    fn set_key(&mut self, key: &LinkKey);

    /// Run the transform over one frame.
    ///
    /// `m` is encrypted in place when `forward` is set and decrypted in place
    /// otherwise; `a` is authenticated only. In both directions the MIC over
    /// `a` and the plaintext of `m` is written to `mic`, whose length selects
    /// the MIC size. Returns `false` on internal failure.
    fn aead(&mut self, nonce: &Nonce, m: &mut [u8], a: &[u8], mic: &mut [u8], forward: bool) -> bool;
}

/// Build the nonce for one frame: source address, big-endian frame counter,
/// security level. Without frame counters the nonce is all zeros.
pub fn frame_nonce(
    source: &LinkAddr,
    frame_counter: u32,
    level: SecurityLevel,
    with_counter: bool,
) -> Nonce {
    let mut nonce = [0u8; NONCE_LEN];
    if with_counter {
        nonce[..LINKADDR_SIZE].copy_from_slice(source.as_bytes());
        nonce[LINKADDR_SIZE..LINKADDR_SIZE + 4].copy_from_slice(&frame_counter.to_be_bytes());
        nonce[NONCE_LEN - 1] = level.value();
    }
    nonce
}
