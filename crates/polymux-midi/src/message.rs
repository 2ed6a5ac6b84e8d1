//! Raw 3-byte MIDI channel messages.
//!
//! Messages are kept as the exact bytes the host delivered so that anything
//! passed through or broadcast leaves the router byte-for-byte unchanged.

use midi_msg::MidiMsg;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Highest MIDI channel number (0-indexed).
pub const MAX_CHANNEL: u8 = 15;

/// Channel voice command, the high nibble of a status byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum Command {
    NoteOff = 0x80,
    NoteOn = 0x90,
    /// Polyphonic key pressure (per-note aftertouch)
    PolyPressure = 0xA0,
    ControlChange = 0xB0,
    ProgramChange = 0xC0,
    /// Channel pressure (monophonic aftertouch)
    ChannelPressure = 0xD0,
    PitchBend = 0xE0,
}

impl Command {
    /// Decode the command nibble of a status byte.
    ///
    /// Returns `None` for data bytes (< 0x80) and system messages (0xF0-0xFF).
    #[inline]
    pub fn from_status(status: u8) -> Option<Self> {
        match status & 0xF0 {
            0x80 => Some(Self::NoteOff),
            0x90 => Some(Self::NoteOn),
            0xA0 => Some(Self::PolyPressure),
            0xB0 => Some(Self::ControlChange),
            0xC0 => Some(Self::ProgramChange),
            0xD0 => Some(Self::ChannelPressure),
            0xE0 => Some(Self::PitchBend),
            _ => None,
        }
    }

    #[inline]
    pub const fn nibble(self) -> u8 {
        self as u8
    }

    /// Number of data bytes that follow the status byte on the wire.
    #[inline]
    pub const fn data_len(self) -> usize {
        match self {
            Self::ProgramChange | Self::ChannelPressure => 1,
            _ => 2,
        }
    }
}

/// One MIDI channel message as delivered by the host: status plus two data bytes.
///
/// Two-byte messages (program change, channel pressure) carry `data2 = 0`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl ChannelMessage {
    #[inline]
    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
        }
    }

    /// Build a message from a command nibble and a channel (0-15).
    #[inline]
    pub const fn from_parts(command: u8, channel: u8, data1: u8, data2: u8) -> Self {
        Self {
            status: (command & 0xF0) | (channel & 0x0F),
            data1,
            data2,
        }
    }

    #[inline]
    pub const fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self::from_parts(0x90, channel, note, velocity)
    }

    #[inline]
    pub const fn note_off(channel: u8, note: u8, velocity: u8) -> Self {
        Self::from_parts(0x80, channel, note, velocity)
    }

    #[inline]
    pub const fn poly_pressure(channel: u8, note: u8, pressure: u8) -> Self {
        Self::from_parts(0xA0, channel, note, pressure)
    }

    #[inline]
    pub const fn control_change(channel: u8, control: u8, value: u8) -> Self {
        Self::from_parts(0xB0, channel, control, value)
    }

    #[inline]
    pub const fn program_change(channel: u8, program: u8) -> Self {
        Self::from_parts(0xC0, channel, program, 0)
    }

    #[inline]
    pub const fn channel_pressure(channel: u8, pressure: u8) -> Self {
        Self::from_parts(0xD0, channel, pressure, 0)
    }

    /// `bend`: unsigned 14-bit, 8192 = center.
    #[inline]
    pub const fn pitch_bend(channel: u8, bend: u16) -> Self {
        Self::from_parts(
            0xE0,
            channel,
            (bend & 0x7F) as u8,
            ((bend >> 7) & 0x7F) as u8,
        )
    }

    /// High nibble of the status byte.
    #[inline]
    pub const fn command(&self) -> u8 {
        self.status & 0xF0
    }

    /// Low nibble of the status byte.
    #[inline]
    pub const fn channel(&self) -> u8 {
        self.status & 0x0F
    }

    /// True for statuses in the channel message range (note-off through pitch bend).
    #[inline]
    pub const fn is_channel_message(&self) -> bool {
        self.status >= 0x80 && self.status <= 0xEF
    }

    #[inline]
    pub fn kind(&self) -> Option<Command> {
        Command::from_status(self.status)
    }

    /// Normalized view of this message.
    #[inline]
    pub fn event(&self) -> ChannelEvent {
        ChannelEvent::from_message(self)
    }

    /// Same message moved to another channel.
    #[inline]
    pub const fn with_channel(self, channel: u8) -> Self {
        Self::from_parts(self.status, channel, self.data1, self.data2)
    }

    /// Length on the wire: 2 for program change and channel pressure, else 3.
    #[inline]
    pub fn wire_len(&self) -> usize {
        self.kind().map_or(3, |kind| kind.data_len() + 1)
    }

    #[inline]
    pub const fn to_bytes(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }

    /// Parse a complete channel message from wire bytes.
    ///
    /// Returns `None` for system messages, bare data bytes, or truncated input.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let (&status, data) = bytes.split_first()?;
        let kind = Command::from_status(status)?;
        if data.len() < kind.data_len() {
            return None;
        }
        let data2 = if kind.data_len() == 2 { data[1] } else { 0 };
        Some(Self::new(status, data[0], data2))
    }

    /// Decode into a typed `MidiMsg` for inspection and logging.
    pub fn to_midi_msg(&self) -> Result<MidiMsg, midi_msg::ParseError> {
        let bytes = self.to_bytes();
        let (msg, _len) = MidiMsg::from_midi(&bytes[..self.wire_len()])?;
        Ok(msg)
    }
}

impl From<[u8; 3]> for ChannelMessage {
    fn from(bytes: [u8; 3]) -> Self {
        Self::new(bytes[0], bytes[1], bytes[2])
    }
}

/// Channel message normalized by what it means for key tracking.
///
/// Note-on with velocity 0 and explicit note-off both become `KeyReleased`,
/// so release handling has a single path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    KeyPressed { note: u8, velocity: u8 },
    KeyReleased { note: u8, velocity: u8 },
    KeyPressure { note: u8, pressure: u8 },
    /// Anything else (control change, pitch bend, program change, ...).
    /// `command` is the status high nibble.
    Other { command: u8, data1: u8, data2: u8 },
}

impl ChannelEvent {
    pub fn from_message(msg: &ChannelMessage) -> Self {
        match msg.kind() {
            Some(Command::NoteOn) if msg.data2 > 0 => Self::KeyPressed {
                note: msg.data1,
                velocity: msg.data2,
            },
            Some(Command::NoteOn) | Some(Command::NoteOff) => Self::KeyReleased {
                note: msg.data1,
                velocity: msg.data2,
            },
            Some(Command::PolyPressure) => Self::KeyPressure {
                note: msg.data1,
                pressure: msg.data2,
            },
            _ => Self::Other {
                command: msg.command(),
                data1: msg.data1,
                data2: msg.data2,
            },
        }
    }

    #[inline]
    pub fn is_key_pressed(&self) -> bool {
        matches!(self, Self::KeyPressed { .. })
    }

    #[inline]
    pub fn is_key_released(&self) -> bool {
        matches!(self, Self::KeyReleased { .. })
    }
}
