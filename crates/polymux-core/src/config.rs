//! Runtime configuration derived from the persisted parameters.

use polymux_midi::MAX_CHANNEL;

use crate::params::{ParamId, ParamStore};

/// Largest supported sub-channel count.
pub const MAX_POLYPHONY: u8 = 12;

/// Normalized routing configuration.
///
/// Always rebuilt as a whole from a [`ParamStore`]; never patched field by field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterConfig {
    /// Channel (0-15) whose messages are fanned out. `None` disables routing.
    pub input_channel: Option<u8>,
    /// Output channel (0-15) of sub-channel 0.
    pub output_base_channel: u8,
    /// Live sub-channels (1-12).
    pub polyphony: u8,
}

impl RouterConfig {
    pub fn load<P: ParamStore + ?Sized>(params: &P) -> Self {
        let input = params.get(ParamId::InputChannel);
        let base = params.get(ParamId::OutputBaseChannel);
        let polyphony = params.get(ParamId::Polyphony);

        Self {
            input_channel: if input == 0 {
                None
            } else {
                Some(channel_from_param(input))
            },
            output_base_channel: if base == 0 { 0 } else { channel_from_param(base) },
            // Clamped so slot indexing stays in bounds for stores that skip validation
            polyphony: polyphony.clamp(1, MAX_POLYPHONY as i32) as u8,
        }
    }

    /// True if messages on `channel` belong to the allocation engine.
    #[inline]
    pub fn accepts(&self, channel: u8) -> bool {
        self.input_channel == Some(channel)
    }

    /// Physical output channel of a sub-channel slot, or `None` past channel 16.
    #[inline]
    pub fn output_channel(&self, slot: usize) -> Option<u8> {
        let channel = self.output_base_channel as usize + slot;
        if channel <= MAX_CHANNEL as usize {
            Some(channel as u8)
        } else {
            None
        }
    }

    #[inline]
    pub fn live_slots(&self) -> usize {
        self.polyphony as usize
    }
}

/// 1-16 parameter value to 0-15 channel.
fn channel_from_param(value: i32) -> u8 {
    (value - 1).clamp(0, MAX_CHANNEL as i32) as u8
}
