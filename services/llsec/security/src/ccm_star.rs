//! CCM* over AES-128 as used by IEEE 802.15.4 link-layer security.
//!
//! Length field size L = 2 with a 13-byte nonce. MIC lengths 4..=16 (even)
//! authenticate; a zero-length MIC gives encryption only, which plain CCM does
//! not allow.

use crate::aead::{AeadAdapter, Nonce, NONCE_LEN};
use crate::keys::LinkKey;
use aes::cipher::generic_array::GenericArray;
use aes::cipher::{BlockEncrypt, KeyInit};
use aes::{Aes128, Block};
use std::fmt;
use tracing::warn;

const BLOCK_LEN: usize = 16;

/// Size of the message length field
const L: usize = 2;

/// Largest `a` length covered by the two-byte length encoding
const MAX_A_LEN: usize = 0xff00 - 1;

/// Software CCM* adapter
#[derive(Default)]
pub struct CcmStar {
    cipher: Option<Aes128>,
}

impl fmt::Debug for CcmStar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CcmStar")
            .field("keyed", &self.cipher.is_some())
            .finish()
    }
}

impl CcmStar {
    /// Create an adapter with no key loaded
    pub fn new() -> Self {
        Self::default()
    }

    fn valid_mic_len(len: usize) -> bool {
        len == 0 || ((4..=16).contains(&len) && len % 2 == 0)
    }
}

impl AeadAdapter for CcmStar {
    fn set_key(&mut self, key: &LinkKey) {
        self.cipher = Some(Aes128::new(GenericArray::from_slice(key.as_bytes())));
    }

    fn aead(&mut self, nonce: &Nonce, m: &mut [u8], a: &[u8], mic: &mut [u8], forward: bool) -> bool {
        let Some(cipher) = self.cipher.as_ref() else {
            warn!("CCM* invoked without a key");
            return false;
        };
        if !Self::valid_mic_len(mic.len()) || m.len() > u16::MAX as usize || a.len() > MAX_A_LEN {
            warn!("CCM* rejected lengths m={} a={} mic={}", m.len(), a.len(), mic.len());
            return false;
        }

        if forward {
            cbc_mac(cipher, nonce, m, a, mic);
            ctr_crypt(cipher, nonce, m);
        } else {
            ctr_crypt(cipher, nonce, m);
            cbc_mac(cipher, nonce, m, a, mic);
        }

        if !mic.is_empty() {
            let mut s0 = counter_block(nonce, 0);
            cipher.encrypt_block(&mut s0);
            xor_into(mic, &s0);
        }
        true
    }
}

fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

fn counter_block(nonce: &Nonce, counter: u16) -> Block {
    let mut block = Block::default();
    block[0] = (L - 1) as u8;
    block[1..1 + NONCE_LEN].copy_from_slice(nonce);
    block[BLOCK_LEN - L..].copy_from_slice(&counter.to_be_bytes());
    block
}

/// CBC-MAC over B0, the length-prefixed `a` and `m`; leaves the unencrypted
/// tag T in `mic`
fn cbc_mac(cipher: &Aes128, nonce: &Nonce, m: &[u8], a: &[u8], mic: &mut [u8]) {
    if mic.is_empty() {
        return;
    }

    let adata = if a.is_empty() { 0 } else { 0x40 };
    let m_field = ((mic.len() - 2) / 2) as u8;

    let mut x = Block::default();
    x[0] = adata | (m_field << 3) | (L - 1) as u8;
    x[1..1 + NONCE_LEN].copy_from_slice(nonce);
    x[BLOCK_LEN - L..].copy_from_slice(&(m.len() as u16).to_be_bytes());
    cipher.encrypt_block(&mut x);

    if !a.is_empty() {
        let mut first = [0u8; BLOCK_LEN];
        first[..2].copy_from_slice(&(a.len() as u16).to_be_bytes());
        let head = a.len().min(BLOCK_LEN - 2);
        first[2..2 + head].copy_from_slice(&a[..head]);
        xor_into(&mut x, &first);
        cipher.encrypt_block(&mut x);

        for chunk in a[head..].chunks(BLOCK_LEN) {
            xor_into(&mut x, chunk);
            cipher.encrypt_block(&mut x);
        }
    }

    for chunk in m.chunks(BLOCK_LEN) {
        xor_into(&mut x, chunk);
        cipher.encrypt_block(&mut x);
    }

    mic.copy_from_slice(&x[..mic.len()]);
}

/// CTR keystream starting at counter 1
fn ctr_crypt(cipher: &Aes128, nonce: &Nonce, m: &mut [u8]) {
    for (i, chunk) in m.chunks_mut(BLOCK_LEN).enumerate() {
        let mut s = counter_block(nonce, (i + 1) as u16);
        cipher.encrypt_block(&mut s);
        xor_into(chunk, &s);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccm::aead::AeadInPlace;
    use ccm::aead::consts::{U13, U16, U4, U8};
    use ccm::Ccm;

    const KEY: [u8; 16] = [
        0xc0, 0xc1, 0xc2, 0xc3, 0xc4, 0xc5, 0xc6, 0xc7, 0xc8, 0xc9, 0xca, 0xcb, 0xcc, 0xcd, 0xce,
        0xcf,
    ];
    const NONCE: Nonce = [
        0xac, 0xde, 0x48, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x05, 0x06,
    ];

    macro_rules! reference {
        ($tag:ty, $a:expr, $m:expr) => {{
            let cipher = Ccm::<Aes128, $tag, U13>::new(GenericArray::from_slice(&KEY));
            let mut buf = $m.to_vec();
            let tag = cipher
                .encrypt_in_place_detached(GenericArray::from_slice(&NONCE), $a, &mut buf)
                .unwrap();
            (buf, tag.to_vec())
        }};
    }

    fn seal(a: &[u8], m: &[u8], mic_len: usize) -> (Vec<u8>, Vec<u8>) {
        let mut ccm = CcmStar::new();
        ccm.set_key(&LinkKey::new(KEY));
        let mut buf = m.to_vec();
        let mut mic = vec![0u8; mic_len];
        assert!(ccm.aead(&NONCE, &mut buf, a, &mut mic, true));
        (buf, mic)
    }

    fn sample(len: usize, seed: u8) -> Vec<u8> {
        (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
    }

    #[test]
    fn test_matches_reference_ccm() {
        for a_len in [0usize, 1, 13, 14, 15, 30, 40] {
            for m_len in [0usize, 1, 4, 15, 16, 17, 50] {
                let a = sample(a_len, 1);
                let m = sample(m_len, 2);

                assert_eq!(seal(&a, &m, 4), reference!(U4, &a, &m), "a={} m={}", a_len, m_len);
                assert_eq!(seal(&a, &m, 8), reference!(U8, &a, &m), "a={} m={}", a_len, m_len);
                assert_eq!(seal(&a, &m, 16), reference!(U16, &a, &m), "a={} m={}", a_len, m_len);
            }
        }
    }

    #[test]
    fn test_encryption_only_uses_same_keystream() {
        let a = sample(9, 3);
        let m = sample(21, 4);
        let (cipher_only, mic) = seal(&a, &m, 0);
        let (reference_cipher, _) = reference!(U4, &a, &m);
        assert!(mic.is_empty());
        assert_eq!(cipher_only, reference_cipher);
    }

    #[test]
    fn test_reverse_direction_recovers_plaintext_and_mic() {
        let a = sample(11, 5);
        let m = sample(33, 6);
        let (mut cipher, sent_mic) = seal(&a, &m, 8);

        let mut ccm = CcmStar::new();
        ccm.set_key(&LinkKey::new(KEY));
        let mut generated = [0u8; 8];
        assert!(ccm.aead(&NONCE, &mut cipher, &a, &mut generated, false));
        assert_eq!(cipher, m);
        assert_eq!(generated.to_vec(), sent_mic);
    }

    #[test]
    fn test_authentication_only() {
        let a = sample(20, 7);
        let (m, mic) = seal(&a, &[], 16);
        assert!(m.is_empty());
        assert_eq!(mic, reference!(U16, &a, &[0u8; 0]).1);
    }

    #[test]
    fn test_failures() {
        let mut ccm = CcmStar::new();
        let mut mic = [0u8; 4];
        assert!(!ccm.aead(&NONCE, &mut [], &[1], &mut mic, true));

        ccm.set_key(&LinkKey::new(KEY));
        let mut odd = [0u8; 5];
        assert!(!ccm.aead(&NONCE, &mut [], &[1], &mut odd, true));
        let mut too_small = [0u8; 2];
        assert!(!ccm.aead(&NONCE, &mut [], &[1], &mut too_small, true));
        assert!(ccm.aead(&NONCE, &mut [], &[1], &mut mic, true));
    }
}
