//! Lock-free hand-off of outbound messages to another thread.
//!
//! Host-facing sink for hosts whose MIDI output runs on a different thread
//! than the message callback: the callback passes a [`MidiOutputProducer`]
//! to the router, and the host's sender thread drains the matching
//! [`MidiOutputConsumer`]. Only channel messages fit the ring; system
//! messages passed through by the host are not ordered against it. The
//! `midi-io` bridge forwards system messages, so it sends from a
//! [`MidiBatch`](crate::MidiBatch) inside the callback instead.

use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};

use crate::message::ChannelMessage;
use crate::sink::MidiSink;

/// Default capacity for the output ring buffer
const DEFAULT_CAPACITY: usize = 256;

/// Producer side, owned by the MIDI callback.
pub struct MidiOutputProducer {
    producer: HeapProd<ChannelMessage>,
    dropped: u64,
}

impl MidiOutputProducer {
    /// Returns false if the buffer is full.
    #[inline]
    pub fn push(&mut self, msg: ChannelMessage) -> bool {
        self.producer.try_push(msg).is_ok()
    }

    #[inline]
    pub fn push_slice(&mut self, msgs: &[ChannelMessage]) -> usize {
        self.producer.push_slice(msgs)
    }

    /// Messages lost to a full buffer since creation.
    #[inline]
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl MidiSink for MidiOutputProducer {
    #[inline]
    fn send(&mut self, msg: ChannelMessage) {
        if !self.push(msg) {
            self.dropped += 1;
            tracing::trace!("MIDI output ring buffer full, dropping {:?}", msg);
        }
    }
}

/// Consumer side, owned by the sender thread.
pub struct MidiOutputConsumer {
    consumer: HeapCons<ChannelMessage>,
}

impl MidiOutputConsumer {
    #[inline]
    pub fn pop(&mut self) -> Option<ChannelMessage> {
        self.consumer.try_pop()
    }

    pub fn drain_all(&mut self) -> Vec<ChannelMessage> {
        let mut msgs = Vec::with_capacity(self.consumer.occupied_len());
        while let Some(msg) = self.consumer.try_pop() {
            msgs.push(msg);
        }
        msgs
    }

    #[inline]
    pub fn has_pending(&self) -> bool {
        !self.consumer.is_empty()
    }

    #[inline]
    pub fn pending_count(&self) -> usize {
        self.consumer.occupied_len()
    }
}

pub fn midi_output_channel() -> (MidiOutputProducer, MidiOutputConsumer) {
    midi_output_channel_with_capacity(DEFAULT_CAPACITY)
}

pub fn midi_output_channel_with_capacity(
    capacity: usize,
) -> (MidiOutputProducer, MidiOutputConsumer) {
    let rb = HeapRb::new(capacity);
    let (producer, consumer) = rb.split();
    (
        MidiOutputProducer {
            producer,
            dropped: 0,
        },
        MidiOutputConsumer { consumer },
    )
}
