//! Sub-channel allocator with oldest-key eviction.
//!
//! Assigns each held key to one of up to [`MAX_SLOTS`] output sub-channels:
//! - A new key takes the lowest free slot
//! - With every slot busy, the key that was assigned longest ago is evicted
//! - Per-key pressure is narrowed to channel pressure on the key's sub-channel
//! - Everything else is broadcast to all live sub-channels
//!
//! All methods are RT-safe (fixed arena, no allocations).

use polymux_midi::{ChannelEvent, ChannelMessage, Command, MidiSink};

use crate::config::{RouterConfig, MAX_POLYPHONY};

/// Capacity of the slot arena.
pub const MAX_SLOTS: usize = MAX_POLYPHONY as usize;

/// One virtual output sub-channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubChannelSlot {
    /// Note (0-127) currently sounding on this sub-channel
    pub held_note: Option<u8>,
    /// Epoch at assignment; only meaningful while `held_note` is set
    pub acquired_at: u32,
}

impl SubChannelSlot {
    #[inline]
    pub fn is_free(&self) -> bool {
        self.held_note.is_none()
    }

    #[inline]
    pub fn holds(&self, note: u8) -> bool {
        self.held_note == Some(note)
    }
}

/// Fixed bank of sub-channel slots plus the assignment epoch.
#[derive(Debug, Clone)]
pub struct ChannelAllocator {
    slots: [SubChannelSlot; MAX_SLOTS],
    /// Incremented once per assignment. Wraps; ages are wrapping differences.
    epoch: u32,
}

impl Default for ChannelAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelAllocator {
    pub fn new() -> Self {
        Self {
            slots: [SubChannelSlot::default(); MAX_SLOTS],
            epoch: 0,
        }
    }

    /// Start from a given epoch.
    pub fn with_epoch(epoch: u32) -> Self {
        Self {
            slots: [SubChannelSlot::default(); MAX_SLOTS],
            epoch,
        }
    }

    /// Handle one message from the input channel.
    pub fn process<S: MidiSink + ?Sized>(
        &mut self,
        config: &RouterConfig,
        msg: &ChannelMessage,
        sink: &mut S,
    ) {
        self.process_event(config, msg.event(), sink);
    }

    pub fn process_event<S: MidiSink + ?Sized>(
        &mut self,
        config: &RouterConfig,
        event: ChannelEvent,
        sink: &mut S,
    ) {
        match event {
            ChannelEvent::KeyPressed { note, velocity } => {
                self.press(config, note, velocity, sink)
            }
            ChannelEvent::KeyReleased { note, velocity } => {
                self.release(config, note, velocity, sink)
            }
            ChannelEvent::KeyPressure { note, pressure } => {
                if let Some(index) = self.slot_for_note(config, note) {
                    emit(
                        config,
                        index,
                        Command::ChannelPressure.nibble(),
                        pressure,
                        0,
                        sink,
                    );
                }
            }
            ChannelEvent::Other {
                command,
                data1,
                data2,
            } => {
                for index in 0..config.live_slots() {
                    emit(config, index, command, data1, data2, sink);
                }
            }
        }
    }

    fn press<S: MidiSink + ?Sized>(
        &mut self,
        config: &RouterConfig,
        note: u8,
        velocity: u8,
        sink: &mut S,
    ) {
        let note_on = Command::NoteOn.nibble();

        // Same key already held: only possible with more than one source feeding
        // the input. Refresh that voice; both presses now share one release.
        if let Some(index) = self.slot_for_note(config, note) {
            emit(config, index, note_on, note, velocity, sink);
            return;
        }

        if let Some(index) = self.live(config).iter().position(SubChannelSlot::is_free) {
            self.assign(index, note);
            emit(config, index, note_on, note, velocity, sink);
            return;
        }

        let index = self.oldest_slot(config);
        if let Some(evicted) = self.slots[index].held_note {
            tracing::trace!("Evicting note {} from sub-channel {}", evicted, index);
            emit(config, index, Command::NoteOff.nibble(), evicted, 0, sink);
        }
        self.assign(index, note);
        emit(config, index, note_on, note, velocity, sink);
    }

    fn release<S: MidiSink + ?Sized>(
        &mut self,
        config: &RouterConfig,
        note: u8,
        velocity: u8,
        sink: &mut S,
    ) {
        if let Some(index) = self.slot_for_note(config, note) {
            emit(config, index, Command::NoteOff.nibble(), note, velocity, sink);
            self.slots[index].held_note = None;
        }
    }

    fn assign(&mut self, index: usize, note: u8) {
        self.slots[index] = SubChannelSlot {
            held_note: Some(note),
            acquired_at: self.epoch,
        };
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Live slot with the greatest age. Ties go to the lowest index.
    fn oldest_slot(&self, config: &RouterConfig) -> usize {
        let mut oldest = 0;
        let mut oldest_age = 0;
        for (index, slot) in self.live(config).iter().enumerate() {
            let age = self.epoch.wrapping_sub(slot.acquired_at);
            if age > oldest_age {
                oldest = index;
                oldest_age = age;
            }
        }
        oldest
    }

    #[inline]
    fn live(&self, config: &RouterConfig) -> &[SubChannelSlot] {
        &self.slots[..config.live_slots().min(MAX_SLOTS)]
    }

    /// Live slot currently holding `note`.
    pub fn slot_for_note(&self, config: &RouterConfig, note: u8) -> Option<usize> {
        self.live(config).iter().position(|slot| slot.holds(note))
    }

    /// Occupied live slots.
    pub fn active_count(&self, config: &RouterConfig) -> usize {
        self.live(config).iter().filter(|slot| !slot.is_free()).count()
    }

    /// Notes held by live slots, in slot order.
    pub fn held_notes<'a>(&'a self, config: &RouterConfig) -> impl Iterator<Item = u8> + 'a {
        self.live(config).iter().filter_map(|slot| slot.held_note)
    }

    /// The whole arena, including slots beyond the live polyphony.
    pub fn slots(&self) -> &[SubChannelSlot] {
        &self.slots
    }

    pub fn get_slot(&self, index: usize) -> Option<&SubChannelSlot> {
        self.slots.get(index)
    }

    #[inline]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }
}

/// Send on the physical channel of `slot`; dropped past channel 16.
#[inline]
fn emit<S: MidiSink + ?Sized>(
    config: &RouterConfig,
    slot: usize,
    command: u8,
    data1: u8,
    data2: u8,
    sink: &mut S,
) {
    if let Some(channel) = config.output_channel(slot) {
        sink.send(ChannelMessage::from_parts(command, channel, data1, data2));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: u8, polyphony: u8) -> RouterConfig {
        RouterConfig {
            input_channel: Some(0),
            output_base_channel: base,
            polyphony,
        }
    }

    fn run(
        alloc: &mut ChannelAllocator,
        config: &RouterConfig,
        msg: ChannelMessage,
    ) -> Vec<ChannelMessage> {
        let mut out = Vec::new();
        alloc.process(config, &msg, &mut out);
        out
    }

    #[test]
    fn test_basic_allocation() {
        let config = config(0, 4);
        let mut alloc = ChannelAllocator::new();

        let out = run(&mut alloc, &config, ChannelMessage::note_on(0, 60, 100));
        assert_eq!(out, vec![ChannelMessage::note_on(0, 60, 100)]);

        let out = run(&mut alloc, &config, ChannelMessage::note_on(0, 64, 90));
        assert_eq!(out, vec![ChannelMessage::note_on(1, 64, 90)]);

        assert_eq!(alloc.active_count(&config), 2);
        assert_eq!(alloc.epoch(), 2);
        assert_eq!(alloc.held_notes(&config).collect::<Vec<_>>(), vec![60, 64]);
    }

    #[test]
    fn test_free_slot_reused_lowest_first() {
        let config = config(0, 3);
        let mut alloc = ChannelAllocator::new();
        run(&mut alloc, &config, ChannelMessage::note_on(0, 60, 100));
        run(&mut alloc, &config, ChannelMessage::note_on(0, 62, 100));
        run(&mut alloc, &config, ChannelMessage::note_on(0, 64, 100));
        run(&mut alloc, &config, ChannelMessage::note_off(0, 62, 0));
        run(&mut alloc, &config, ChannelMessage::note_off(0, 60, 0));

        let out = run(&mut alloc, &config, ChannelMessage::note_on(0, 67, 100));
        assert_eq!(out, vec![ChannelMessage::note_on(0, 67, 100)]);
    }

    #[test]
    fn test_eviction_oldest() {
        let config = config(0, 2);
        let mut alloc = ChannelAllocator::new();
        run(&mut alloc, &config, ChannelMessage::note_on(0, 60, 100));
        run(&mut alloc, &config, ChannelMessage::note_on(0, 64, 100));

        let out = run(&mut alloc, &config, ChannelMessage::note_on(0, 67, 100));
        assert_eq!(
            out,
            vec![
                ChannelMessage::note_off(0, 60, 0),
                ChannelMessage::note_on(0, 67, 100),
            ]
        );

        // 64 is now the oldest
        let out = run(&mut alloc, &config, ChannelMessage::note_on(0, 69, 100));
        assert_eq!(
            out,
            vec![
                ChannelMessage::note_off(1, 64, 0),
                ChannelMessage::note_on(1, 69, 100),
            ]
        );
    }

    #[test]
    fn test_eviction_survives_epoch_wrap() {
        let config = config(0, 2);
        let mut alloc = ChannelAllocator::with_epoch(u32::MAX);
        run(&mut alloc, &config, ChannelMessage::note_on(0, 60, 100)); // epoch u32::MAX
        run(&mut alloc, &config, ChannelMessage::note_on(0, 64, 100)); // epoch 0
        assert_eq!(alloc.epoch(), 1);

        let out = run(&mut alloc, &config, ChannelMessage::note_on(0, 67, 100));
        assert_eq!(out[0], ChannelMessage::note_off(0, 60, 0));
    }

    #[test]
    fn test_eviction_tie_goes_to_lowest_index() {
        let config = config(0, 3);
        let mut alloc = ChannelAllocator::with_epoch(10);
        for (index, (note, acquired_at)) in [(60, 5), (62, 1), (64, 1)].into_iter().enumerate() {
            alloc.slots[index] = SubChannelSlot {
                held_note: Some(note),
                acquired_at,
            };
        }

        let out = run(&mut alloc, &config, ChannelMessage::note_on(0, 70, 100));
        assert_eq!(
            out,
            vec![
                ChannelMessage::note_off(1, 62, 0),
                ChannelMessage::note_on(1, 70, 100),
            ]
        );
        assert!(alloc.get_slot(2).is_some_and(|slot| slot.holds(64)));
    }

    #[test]
    fn test_release_uses_incoming_velocity() {
        let config = config(0, 2);
        let mut alloc = ChannelAllocator::new();
        run(&mut alloc, &config, ChannelMessage::note_on(0, 60, 100));

        let out = run(&mut alloc, &config, ChannelMessage::note_off(0, 60, 45));
        assert_eq!(out, vec![ChannelMessage::note_off(0, 60, 45)]);
        assert!(alloc.get_slot(0).unwrap().is_free());
    }

    #[test]
    fn test_release_unknown_is_noop() {
        let config = config(0, 2);
        let mut alloc = ChannelAllocator::new();
        run(&mut alloc, &config, ChannelMessage::note_on(0, 60, 100));

        let out = run(&mut alloc, &config, ChannelMessage::note_on(0, 61, 0));
        assert!(out.is_empty());
        assert_eq!(alloc.active_count(&config), 1);
    }

    #[test]
    fn test_duplicate_press_refreshes() {
        let config = config(0, 4);
        let mut alloc = ChannelAllocator::new();
        run(&mut alloc, &config, ChannelMessage::note_on(0, 60, 100));
        run(&mut alloc, &config, ChannelMessage::note_on(0, 62, 100));

        let out = run(&mut alloc, &config, ChannelMessage::note_on(0, 60, 20));
        assert_eq!(out, vec![ChannelMessage::note_on(0, 60, 20)]);
        assert_eq!(alloc.active_count(&config), 2);
        // A refresh is not an assignment
        assert_eq!(alloc.epoch(), 2);
    }

    #[test]
    fn test_poly_pressure_narrowed() {
        let config = config(2, 4);
        let mut alloc = ChannelAllocator::new();
        run(&mut alloc, &config, ChannelMessage::note_on(0, 60, 100));
        run(&mut alloc, &config, ChannelMessage::note_on(0, 64, 100));

        let out = run(&mut alloc, &config, ChannelMessage::poly_pressure(0, 64, 77));
        assert_eq!(out, vec![ChannelMessage::channel_pressure(3, 77)]);

        let out = run(&mut alloc, &config, ChannelMessage::poly_pressure(0, 65, 77));
        assert!(out.is_empty());
    }

    #[test]
    fn test_other_broadcast_to_live_slots() {
        let config = config(0, 3);
        let mut alloc = ChannelAllocator::new();

        let out = run(&mut alloc, &config, ChannelMessage::pitch_bend(0, 0x2001));
        assert_eq!(
            out,
            (0..3)
                .map(|ch| ChannelMessage::pitch_bend(ch, 0x2001))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_output_past_channel_16_dropped() {
        let config = config(14, 4);
        let mut alloc = ChannelAllocator::new();

        let out = run(&mut alloc, &config, ChannelMessage::control_change(0, 1, 64));
        assert_eq!(
            out,
            vec![
                ChannelMessage::control_change(14, 1, 64),
                ChannelMessage::control_change(15, 1, 64),
            ]
        );

        // Slots 2 and 3 still track keys, their output is just dropped
        for note in [60, 62, 64] {
            run(&mut alloc, &config, ChannelMessage::note_on(0, note, 100));
        }
        assert_eq!(alloc.slot_for_note(&config, 64), Some(2));
        assert!(run(&mut alloc, &config, ChannelMessage::note_off(0, 64, 0)).is_empty());
        assert_eq!(alloc.slot_for_note(&config, 64), None);
    }

    #[test]
    fn test_slots_past_polyphony_untouched() {
        let mut alloc = ChannelAllocator::new();
        let narrow = config(0, 1);
        for note in 60..70 {
            run(&mut alloc, &narrow, ChannelMessage::note_on(0, note, 100));
        }
        assert_eq!(alloc.active_count(&narrow), 1);
        assert!(alloc.slots()[1..].iter().all(SubChannelSlot::is_free));
    }
}
