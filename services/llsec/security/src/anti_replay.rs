//! Outbound frame counters.
//!
//! Only stamping is implemented. Received counters are carried on the frame
//! and end up in the nonce, but they are not checked against a replay window.

use llsec_wire::FrameDescriptor;
use tracing::trace;

/// Source of fresh frame counter values for outgoing frames
pub trait FrameCounterStore {
    /// Advance the counter and stamp its value onto the frame
    fn set_counter_for_outgoing_frame(&mut self, frame: &mut FrameDescriptor);
}

/// Node-wide monotonically increasing frame counter
#[derive(Debug, Default, Clone)]
pub struct AntiReplay {
    counter: u32,
}

impl AntiReplay {
    /// Start counting from zero; the first stamped frame carries 1
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from a persisted counter value
    pub fn starting_at(counter: u32) -> Self {
        Self { counter }
    }

    /// Last value handed out
    pub fn counter(&self) -> u32 {
        self.counter
    }
}

impl FrameCounterStore for AntiReplay {
    fn set_counter_for_outgoing_frame(&mut self, frame: &mut FrameDescriptor) {
        self.counter = self.counter.wrapping_add(1);
        frame.attrs_mut().frame_counter = self.counter;
        trace!("frame counter {}", self.counter);
    }
}
