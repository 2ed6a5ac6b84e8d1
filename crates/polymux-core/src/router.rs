//! Message router: the context object the host drives.

use polymux_midi::{ChannelMessage, MidiSink};

use crate::allocator::ChannelAllocator;
use crate::config::RouterConfig;
use crate::error::Result;
use crate::params::{MemoryParamStore, ParamId, ParamStore};
use crate::trainer::{Trainer, DEFAULT_TRAINING_TICKS};

/// Fans one input channel out over a bank of output channels.
///
/// Owns every piece of mutable state (parameters, derived configuration,
/// training window, slot bank), so a host only has to forward its three
/// callbacks. Nothing here blocks or allocates on the message path.
///
/// # Example
///
/// ```
/// use polymux_core::{MemoryParamStore, ParamId, PolyMux};
/// use polymux_midi::ChannelMessage;
///
/// let params = MemoryParamStore::default()
///     .with(ParamId::InputChannel, 1)?
///     .with(ParamId::Polyphony, 2)?;
/// let mut mux = PolyMux::builder().params(params).training_ticks(0).build();
///
/// let mut out = Vec::new();
/// let forward = mux.on_channel_message(0x90, 60, 100, &mut out);
/// assert!(!forward);
/// assert_eq!(out, vec![ChannelMessage::note_on(0, 60, 100)]);
/// # Ok::<(), polymux_core::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct PolyMux<P = MemoryParamStore> {
    params: P,
    config: RouterConfig,
    trainer: Trainer,
    allocator: ChannelAllocator,
}

impl PolyMux<MemoryParamStore> {
    pub fn builder() -> PolyMuxBuilder<MemoryParamStore> {
        PolyMuxBuilder::default()
    }
}

impl Default for PolyMux<MemoryParamStore> {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl<P: ParamStore> PolyMux<P> {
    /// Router over `params` with the default training window.
    pub fn new(params: P) -> Self {
        Self::with_training_ticks(params, DEFAULT_TRAINING_TICKS)
    }

    pub fn with_training_ticks(params: P, ticks: u16) -> Self {
        let config = RouterConfig::load(&params);
        tracing::debug!("PolyMux starting with {:?}", config);
        Self {
            params,
            config,
            trainer: Trainer::new(ticks),
            allocator: ChannelAllocator::new(),
        }
    }

    /// Inbound channel message callback.
    ///
    /// Returns `true` if the host should forward the original message
    /// unchanged, `false` if it was consumed and replaced by whatever was
    /// written to `sink`.
    pub fn on_channel_message<S: MidiSink + ?Sized>(
        &mut self,
        status: u8,
        data1: u8,
        data2: u8,
        sink: &mut S,
    ) -> bool {
        self.route(&ChannelMessage::new(status, data1, data2), sink)
    }

    pub fn route<S: MidiSink + ?Sized>(&mut self, msg: &ChannelMessage, sink: &mut S) -> bool {
        // Training looks at every channel, before the input channel filter
        let event = msg.event();
        if self.trainer.is_armed() && (event.is_key_pressed() || event.is_key_released()) {
            if let Some(training) = self.trainer.observe(msg.channel(), &event) {
                match training.apply(&mut self.params) {
                    Ok(()) => {
                        tracing::info!(
                            "Trained: input channel {}, polyphony {}",
                            training.channel + 1,
                            training.polyphony
                        );
                        self.reload();
                    }
                    Err(e) => tracing::warn!("Failed to store trained settings: {}", e),
                }
            }
        }

        if msg.is_channel_message() && self.config.accepts(msg.channel()) {
            self.allocator.process(&self.config, msg, sink);
            false
        } else {
            true
        }
    }

    /// Periodic heartbeat callback; drives the training countdown.
    pub fn on_heartbeat(&mut self) {
        self.trainer.tick();
    }

    /// Parameter change notification from the host.
    pub fn on_param_change(&mut self, id: ParamId) {
        tracing::debug!("Parameter {} changed to {}", id, self.params.get(id));
        self.reload();
    }

    /// Write a parameter and notify, as the host does for its own edits.
    pub fn set_param(&mut self, id: ParamId, value: i32) -> Result<()> {
        self.params.set(id, value)?;
        self.on_param_change(id);
        Ok(())
    }

    pub fn param(&self, id: ParamId) -> i32 {
        self.params.get(id)
    }

    fn reload(&mut self) {
        self.config = RouterConfig::load(&self.params);
        tracing::debug!("Configuration reloaded: {:?}", self.config);
    }

    #[inline]
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    #[inline]
    pub fn params(&self) -> &P {
        &self.params
    }

    #[inline]
    pub fn allocator(&self) -> &ChannelAllocator {
        &self.allocator
    }

    #[inline]
    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    /// Close the training window early.
    pub fn cancel_training(&mut self) {
        self.trainer.cancel();
    }

    pub fn into_params(self) -> P {
        self.params
    }
}

/// Builder for [`PolyMux`].
pub struct PolyMuxBuilder<P> {
    params: P,
    training_ticks: u16,
}

impl Default for PolyMuxBuilder<MemoryParamStore> {
    fn default() -> Self {
        Self {
            params: MemoryParamStore::default(),
            training_ticks: DEFAULT_TRAINING_TICKS,
        }
    }
}

impl<P: ParamStore> PolyMuxBuilder<P> {
    /// Use a different parameter store.
    pub fn params<Q: ParamStore>(self, params: Q) -> PolyMuxBuilder<Q> {
        PolyMuxBuilder {
            params,
            training_ticks: self.training_ticks,
        }
    }

    /// Training window length in heartbeats. 0 starts disarmed.
    pub fn training_ticks(mut self, ticks: u16) -> Self {
        self.training_ticks = ticks;
        self
    }

    pub fn build(self) -> PolyMux<P> {
        PolyMux::with_training_ticks(self.params, self.training_ticks)
    }
}
