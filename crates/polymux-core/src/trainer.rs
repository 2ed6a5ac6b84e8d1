//! Onboarding trainer: configure input channel and polyphony from one key.
//!
//! Hold a key on the controller, power the router up, then release the key
//! inside the window. The release arrives without a matching press, which
//! is what marks it as a training gesture: its channel becomes the input
//! channel and its pitch class picks the polyphony (C = 1, C# = 2, ... B = 12).
//! Any fresh key press inside the window cancels training instead.

use std::time::Duration;

use polymux_midi::ChannelEvent;

use crate::config::MAX_POLYPHONY;
use crate::error::Result;
use crate::params::{ParamId, ParamStore};

/// Interval at which the host fires the heartbeat.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_millis(100);

/// Length of the training window in heartbeats.
pub const DEFAULT_TRAINING_TICKS: u16 = 150;

/// Settings learned from a training gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Training {
    /// Channel (0-15) the release arrived on.
    pub channel: u8,
    /// Polyphony (1-12) from the released note's pitch class.
    pub polyphony: u8,
}

impl Training {
    pub fn from_release(channel: u8, note: u8) -> Self {
        Self {
            channel,
            polyphony: (note % 12 + 1).min(MAX_POLYPHONY),
        }
    }

    /// Persist the learned settings. Both are written or neither is.
    pub fn apply<P: ParamStore + ?Sized>(&self, params: &mut P) -> Result<()> {
        let previous = params.get(ParamId::Polyphony);
        params.set(ParamId::Polyphony, self.polyphony as i32)?;
        if let Err(e) = params.set(ParamId::InputChannel, self.channel as i32 + 1) {
            if let Err(restore) = params.set(ParamId::Polyphony, previous) {
                tracing::warn!("Failed to restore polyphony {}: {}", previous, restore);
            }
            return Err(e);
        }
        Ok(())
    }
}

/// One-shot state machine: armed while the countdown is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trainer {
    remaining: u16,
}

impl Default for Trainer {
    fn default() -> Self {
        Self::new(DEFAULT_TRAINING_TICKS)
    }
}

impl Trainer {
    pub fn new(ticks: u16) -> Self {
        Self { remaining: ticks }
    }

    #[inline]
    pub fn is_armed(&self) -> bool {
        self.remaining > 0
    }

    /// Heartbeats left in the window.
    #[inline]
    pub fn remaining(&self) -> u16 {
        self.remaining
    }

    pub fn tick(&mut self) {
        if self.remaining > 0 {
            self.remaining -= 1;
            if self.remaining == 0 {
                tracing::debug!("Training window expired");
            }
        }
    }

    /// Close the window without training.
    pub fn cancel(&mut self) {
        self.remaining = 0;
    }

    /// Feed one inbound event. Returns the learned settings on a qualifying release.
    pub fn observe(&mut self, channel: u8, event: &ChannelEvent) -> Option<Training> {
        if !self.is_armed() {
            return None;
        }

        match *event {
            ChannelEvent::KeyPressed { note, .. } => {
                tracing::debug!(
                    "Key {} pressed during training window, training cancelled",
                    note
                );
                self.cancel();
                None
            }
            ChannelEvent::KeyReleased { note, .. } => {
                self.cancel();
                Some(Training::from_release(channel, note))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::params::MemoryParamStore;
    use polymux_midi::ChannelMessage;

    /// Store whose input channel is fixed by the host.
    struct FixedInputStore(MemoryParamStore);

    impl ParamStore for FixedInputStore {
        fn get(&self, id: ParamId) -> i32 {
            self.0.get(id)
        }

        fn set(&mut self, id: ParamId, value: i32) -> Result<()> {
            if id == ParamId::InputChannel {
                return Err(Error::ParamOutOfRange {
                    param: "input_channel",
                    value,
                    min: 15,
                    max: 15,
                });
            }
            self.0.set(id, value)
        }
    }

    fn event(msg: ChannelMessage) -> ChannelEvent {
        msg.event()
    }

    #[test]
    fn test_release_trains() {
        let mut trainer = Trainer::default();
        let training = trainer.observe(3, &event(ChannelMessage::note_off(3, 16, 0)));
        assert_eq!(
            training,
            Some(Training {
                channel: 3,
                polyphony: 5
            })
        );
        assert!(!trainer.is_armed());
    }

    #[test]
    fn test_zero_velocity_note_on_trains() {
        let mut trainer = Trainer::default();
        let training = trainer.observe(0, &event(ChannelMessage::note_on(0, 71, 0)));
        assert_eq!(training.map(|t| t.polyphony), Some(12));
    }

    #[test]
    fn test_press_cancels() {
        let mut trainer = Trainer::default();
        assert_eq!(
            trainer.observe(0, &event(ChannelMessage::note_on(0, 60, 90))),
            None
        );
        assert!(!trainer.is_armed());
        assert_eq!(
            trainer.observe(0, &event(ChannelMessage::note_off(0, 60, 0))),
            None
        );
    }

    #[test]
    fn test_other_messages_ignored() {
        let mut trainer = Trainer::default();
        trainer.observe(0, &event(ChannelMessage::control_change(0, 64, 127)));
        trainer.observe(0, &event(ChannelMessage::poly_pressure(0, 60, 10)));
        assert!(trainer.is_armed());
        assert_eq!(trainer.remaining(), DEFAULT_TRAINING_TICKS);
    }

    #[test]
    fn test_countdown_expires() {
        let mut trainer = Trainer::new(2);
        trainer.tick();
        assert!(trainer.is_armed());
        trainer.tick();
        assert!(!trainer.is_armed());
        trainer.tick();
        assert_eq!(trainer.remaining(), 0);
        assert_eq!(
            trainer.observe(0, &event(ChannelMessage::note_off(0, 60, 0))),
            None
        );
    }

    #[test]
    fn test_apply_writes_params() {
        let mut store = MemoryParamStore::default();
        Training::from_release(9, 62).apply(&mut store).unwrap();
        assert_eq!(store.get(ParamId::InputChannel), 10);
        assert_eq!(store.get(ParamId::Polyphony), 3);
    }

    #[test]
    fn test_apply_is_all_or_nothing() {
        let mut store = FixedInputStore(MemoryParamStore::default());
        let result = Training::from_release(2, 67).apply(&mut store);
        assert!(matches!(result, Err(Error::ParamOutOfRange { value: 3, .. })));
        assert_eq!(store.get(ParamId::Polyphony), 4);
        assert_eq!(store.get(ParamId::InputChannel), 15);
    }
}
