//! # PolyMux - MIDI channel multiplexer
//!
//! Gives a monophonic synthesizer voice artificial polyphony: keys played on
//! one input channel are spread across a bank of consecutive output channels,
//! each driving its own copy of the voice.
//!
//! ## Architecture
//!
//! PolyMux is an umbrella crate that coordinates:
//! - **polymux-midi** - Channel message types, event normalization, output sinks
//! - **polymux-core** - Parameters, configuration, onboarding trainer, allocator, router
//!
//! ## Quick Start
//!
//! ```
//! use polymux::prelude::*;
//!
//! let mut mux = PolyMux::builder()
//!     .params(MemoryParamStore::default().with(ParamId::InputChannel, 1)?)
//!     .build();
//!
//! // Host callbacks
//! let mut out = MidiBatch::new();
//! let forward = mux.on_channel_message(0x90, 60, 100, &mut out);
//! assert!(!forward);
//! mux.on_heartbeat();
//! # Ok::<(), polymux::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `default` - Library only
//! - `midi-io` - Hardware bridge over midir and the `polymux-bridge` binary

pub use polymux_core as core;
pub use polymux_midi as midi;

pub use polymux_core::{
    ChannelAllocator, MemoryParamStore, ParamId, ParamSpec, ParamStore, PolyMux,
    PolyMuxBuilder, RouterConfig, SubChannelSlot, Trainer, Training, DEFAULT_TRAINING_TICKS,
    HEARTBEAT_PERIOD, MAX_POLYPHONY,
};

pub use polymux_midi::{
    midi_output_channel, midi_output_channel_with_capacity, ChannelEvent, ChannelMessage,
    Command, MidiBatch, MidiOutputConsumer, MidiOutputProducer, MidiSink,
};

mod error;
pub use error::{Error, Result};

mod persist;
pub use persist::{load_params, save_params};

#[cfg(feature = "midi-io")]
mod bridge;
#[cfg(feature = "midi-io")]
pub use bridge::{Bridge, BridgeConfig, MidiPorts};

/// Convenience prelude for common imports
pub mod prelude {
    pub use crate::{
        ChannelEvent, ChannelMessage, MemoryParamStore, MidiBatch, MidiSink, ParamId,
        ParamStore, PolyMux,
    };

    #[cfg(feature = "midi-io")]
    pub use crate::{Bridge, BridgeConfig};
}
