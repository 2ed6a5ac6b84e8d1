//! MIDI wire types for PolyMux.
//!
//! # Features
//!
//! - **Channel messages**: raw status/data bytes with command and channel accessors
//! - **Event normalization**: note-on with velocity 0 and note-off both read as a key release
//! - **Sinks**: allocation-free batches and a lock-free ring buffer for outbound messages
//!
//! # Example
//!
//! ```
//! use polymux_midi::{ChannelEvent, ChannelMessage};
//!
//! let msg = ChannelMessage::new(0x92, 60, 0);
//! assert_eq!(msg.channel(), 2);
//! assert!(matches!(msg.event(), ChannelEvent::KeyReleased { note: 60, .. }));
//! ```

pub mod message;
pub use message::{ChannelEvent, ChannelMessage, Command, MAX_CHANNEL};

pub mod sink;
pub use sink::{MidiBatch, MidiSink};

pub mod output_collector;
pub use output_collector::{
    midi_output_channel, midi_output_channel_with_capacity, MidiOutputConsumer,
    MidiOutputProducer,
};

// Re-export the typed message model used by `ChannelMessage::to_midi_msg`
pub use midi_msg::{Channel, ChannelVoiceMsg, MidiMsg};
