//! Outbound message sinks.

use smallvec::SmallVec;

use crate::message::ChannelMessage;

/// Inline batch large enough for the worst case of one inbound message
/// (a broadcast to every sub-channel), so the message path never allocates.
pub type MidiBatch = SmallVec<[ChannelMessage; 16]>;

/// Destination for outbound channel messages.
///
/// Implementations must not block: `send` is called from the real-time
/// message handler.
pub trait MidiSink {
    fn send(&mut self, msg: ChannelMessage);
}

impl MidiSink for Vec<ChannelMessage> {
    #[inline]
    fn send(&mut self, msg: ChannelMessage) {
        self.push(msg);
    }
}

impl<A> MidiSink for SmallVec<A>
where
    A: smallvec::Array<Item = ChannelMessage>,
{
    #[inline]
    fn send(&mut self, msg: ChannelMessage) {
        self.push(msg);
    }
}
