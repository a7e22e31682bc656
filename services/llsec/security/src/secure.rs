//! Secure framing: the link-layer security sublayer proper.
//!
//! [`SecureFramer`] wraps an unsecured [`Framer`]. On transmission it stamps
//! the frame counter, lets the framer lay out the header and then appends a
//! MIC, encrypting the payload in place when the level asks for it. On
//! reception it checks the frame against the local policy before verifying
//! the MIC and decrypting.
//!
//! ## AEAD regions
//!
//! ```text
//! encrypting levels (4..=7)     | a = header          | m = payload | MIC |
//! authentication only (1..=3)   | a = header+payload               | MIC |
//! ```

use crate::aead::{frame_nonce, AeadAdapter, Nonce};
use crate::anti_replay::{AntiReplay, FrameCounterStore};
use crate::ccm_star::CcmStar;
use crate::context::SecurityContext;
use crate::error::{DecodeError, EncodeError};
use crate::keys::LinkKey;
use crate::policy::SecurityPolicy;
use llsec_wire::{
    FrameAttributes, FrameDescriptor, FrameType, Framer, KeyIdMode, SecurityLevel,
    KEY_INDEX_NONE, MAX_FRAME_SIZE, MAX_MIC_LEN,
};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info, warn};

/// Link-layer security sublayer for one MAC context
#[derive(Debug)]
pub struct SecureFramer<F, A = CcmStar, C = AntiReplay> {
    ctx: Arc<SecurityContext>,
    framer: F,
    aead: A,
    counters: C,
}

impl<F: Framer> SecureFramer<F> {
    /// Create a secure framer using software CCM* and a fresh frame counter
    pub fn new(ctx: Arc<SecurityContext>, framer: F) -> Self {
        Self::with_parts(ctx, framer, CcmStar::new(), AntiReplay::new())
    }
}

impl<F, A, C> SecureFramer<F, A, C>
where
    F: Framer,
    A: AeadAdapter,
    C: FrameCounterStore,
{
    /// Create a secure framer from explicit collaborators
    pub fn with_parts(ctx: Arc<SecurityContext>, framer: F, aead: A, counters: C) -> Self {
        Self {
            ctx,
            framer,
            aead,
            counters,
        }
    }

    /// Shared security configuration
    pub fn context(&self) -> &Arc<SecurityContext> {
        &self.ctx
    }

    /// Underlying unsecured framer
    pub fn framer(&self) -> &F {
        &self.framer
    }

    /// AEAD adapter
    pub fn adapter(&self) -> &A {
        &self.aead
    }

    /// Outbound frame counter store
    pub fn counters(&self) -> &C {
        &self.counters
    }

    /// Stamp this node's address and the policy's security attributes onto an
    /// outbound frame, as the MAC submission path does before encoding
    pub fn prepare_outbound(&self, frame: &mut FrameDescriptor) {
        let policy = self.ctx.policy();
        let attrs = frame.attrs_mut();
        attrs.sender = self.ctx.local_addr();
        if policy.is_enabled() {
            attrs.security_level = policy.level();
            attrs.key_id_mode = policy.key_id_mode();
            attrs.key_index = u16::from(policy.default_key());
        }
    }

    /// Secure an outbound frame, returning the header length
    pub fn create_secure_frame(&mut self, frame: &mut FrameDescriptor) -> Result<usize, EncodeError> {
        frame.attrs_mut().frame_type = FrameType::Data;

        let ctx = Arc::clone(&self.ctx);
        let state = ctx.read();
        let policy = state.policy;
        if !policy.is_enabled() {
            return Ok(self.framer.create(frame)?);
        }
        let level = policy.level();
        // Header and nonce must agree with the protection applied below
        let attrs = frame.attrs_mut();
        attrs.security_level = level;
        if level.is_secured() {
            attrs.key_id_mode = policy.key_id_mode();
        }

        let attrs = *frame.attrs();
        if level.is_secured()
            && policy.uses_frame_counter()
            && attrs.key_id_mode != KeyIdMode::Implicit
            && attrs.key_index != KEY_INDEX_NONE
        {
            self.counters.set_counter_for_outgoing_frame(frame);
        }

        let hdr_len = self.framer.create(frame)?;
        if !level.is_secured() {
            return Ok(hdr_len);
        }

        let attrs = *frame.attrs();
        let key_index = resolve_key_index(&attrs, &policy);
        let Some(key) = state.keys.get_key(usize::from(key_index)) else {
            error!("Key not available: {}", key_index);
            return Err(EncodeError::KeyUnavailable(key_index));
        };

        let nonce = frame_nonce(
            &ctx.local_addr(),
            attrs.frame_counter,
            attrs.security_level,
            policy.uses_frame_counter(),
        );
        let mic_len = level.mic_len();
        let secured_len = frame.total_len() + mic_len;
        frame
            .reserve_trailer(mic_len)
            .map_err(|_| EncodeError::FrameTooLong(secured_len))?;

        debug!("En/decrypting with key {} {:?}", key_index, key);
        if !Self::transform(&mut self.aead, frame, key, &nonce, hdr_len, level, true) {
            error!("failed to encrypt packet to {}", attrs.receiver);
            return Err(EncodeError::AuthenticationFailed);
        }
        frame
            .set_data_len(frame.data_len() + mic_len)
            .map_err(|_| EncodeError::FrameTooLong(secured_len))?;

        info!(
            direction = "out",
            "{} {} {} ({}) KEY:0x{:02x}",
            attrs.sender,
            attrs.receiver,
            frame.data_len(),
            frame.total_len(),
            attrs.key_index
        );
        Ok(hdr_len)
    }

    /// Validate and unsecure a received frame, returning the header length.
    ///
    /// On success the frame's data is the plaintext payload with the MIC
    /// stripped. Received frame counters are not checked for replay.
    pub fn parse_secure_frame(&mut self, frame: &mut FrameDescriptor) -> Result<usize, DecodeError> {
        let ctx = Arc::clone(&self.ctx);
        let state = ctx.read();
        let policy = state.policy;

        let hdr_len = self.framer.parse(frame).map_err(|e| {
            info!(direction = "in", "could not parse frame: {}", e);
            DecodeError::from(e)
        })?;
        if !policy.is_enabled() {
            return Ok(hdr_len);
        }

        let attrs = *frame.attrs();
        if !attrs.security_level.is_secured() {
            debug!(direction = "in", "frame is not secured");
            return Ok(hdr_len);
        }

        info!(
            direction = "in",
            "{} {} {} {} ({}) LV:{} KM:{} KEY:0x{:02x}",
            attrs.sender,
            attrs.receiver,
            hdr_len,
            frame.data_len(),
            frame.total_len(),
            attrs.security_level.value(),
            attrs.key_id_mode as u8,
            attrs.key_index
        );

        if attrs.security_level != policy.level() {
            info!(
                direction = "in",
                "received frame with wrong security level ({}) from {}",
                attrs.security_level.value(),
                attrs.sender
            );
            return Err(DecodeError::LevelMismatch {
                received: attrs.security_level,
                expected: policy.level(),
            });
        }

        if attrs.key_id_mode != policy.key_id_mode() {
            info!(
                direction = "in",
                "received frame with wrong key id mode ({}) from {}",
                attrs.key_id_mode as u8, attrs.sender
            );
            return Err(DecodeError::KeyModeMismatch {
                received: attrs.key_id_mode,
                expected: policy.key_id_mode(),
            });
        }

        if attrs.sender == ctx.local_addr() {
            info!(direction = "in", "frame from ourselves");
            return Err(DecodeError::SelfAddressed);
        }

        let mic_len = policy.mic_len();
        let data_len = frame.data_len();
        if data_len <= mic_len {
            warn!(direction = "in", "MIC error - too little data in frame!");
            return Err(DecodeError::TooShort { data_len, mic_len });
        }
        frame
            .set_data_len(data_len - mic_len)
            .map_err(|_| DecodeError::TooShort { data_len, mic_len })?;

        let key_index = resolve_key_index(&attrs, &policy);
        let Some(key) = state.keys.get_key(usize::from(key_index)) else {
            error!("Key not available: {}", key_index);
            return Err(DecodeError::KeyUnavailable(key_index));
        };

        let nonce = frame_nonce(
            &attrs.sender,
            attrs.frame_counter,
            attrs.security_level,
            policy.uses_frame_counter(),
        );

        debug!("En/decrypting with key {} {:?}", key_index, key);
        if !Self::transform(&mut self.aead, frame, key, &nonce, hdr_len, policy.level(), false) {
            info!(
                direction = "in",
                "received unauthentic frame {} from {}",
                attrs.frame_counter, attrs.sender
            );
            return Err(DecodeError::AuthenticationFailed);
        }

        Ok(hdr_len)
    }

    /// Header overhead of a secured frame: framer header length plus MIC.
    ///
    /// The MIC is only counted when the frame carries a key index, unlike
    /// encode/decode which add it for every secured level.
    pub fn secure_frame_overhead(&self, frame: &FrameDescriptor) -> usize {
        let len = self.framer.length(frame);
        let policy = self.ctx.policy();
        let attrs = frame.attrs();
        if policy.is_enabled()
            && attrs.security_level.is_secured()
            && attrs.key_index != KEY_INDEX_NONE
        {
            len + policy.mic_len()
        } else {
            len
        }
    }

    /// Largest payload that fits a frame with these attributes
    pub fn max_payload(&self, frame: &FrameDescriptor) -> usize {
        MAX_FRAME_SIZE.saturating_sub(self.secure_frame_overhead(frame))
    }

    /// Run the AEAD over one frame.
    ///
    /// Forward writes the MIC into the trailer. Reverse computes the expected
    /// MIC aside and compares it with the trailer in constant time.
    fn transform(
        aead: &mut A,
        frame: &mut FrameDescriptor,
        key: &LinkKey,
        nonce: &Nonce,
        hdr_len: usize,
        level: SecurityLevel,
        forward: bool,
    ) -> bool {
        let mic_len = level.mic_len();
        let aad_len = if level.encrypts() {
            hdr_len
        } else {
            frame.total_len()
        };
        let Some((a, m, trailer)) = frame.aead_regions(aad_len, mic_len) else {
            return false;
        };

        aead.set_key(key);
        if forward {
            return aead.aead(nonce, m, a, trailer, true);
        }

        let mut generated = [0u8; MAX_MIC_LEN];
        let generated = &mut generated[..mic_len];
        aead.aead(nonce, m, a, generated, false) && bool::from(generated.ct_eq(trailer))
    }
}

/// Implicit key id mode uses the policy's default key, otherwise the frame
/// names its key
fn resolve_key_index(attrs: &FrameAttributes, policy: &SecurityPolicy) -> u16 {
    if attrs.key_id_mode == KeyIdMode::Implicit {
        u16::from(policy.default_key())
    } else {
        attrs.key_index
    }
}
