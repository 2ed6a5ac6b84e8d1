//! Channel allocation engine for PolyMux.
//!
//! Gives a monophonic synth voice artificial polyphony by spreading the keys
//! of one input channel over a bank of consecutive output channels.
//!
//! - **Parameters**: three persisted integers behind [`ParamStore`]
//! - **Configuration**: [`RouterConfig`], rebuilt on every parameter change
//! - **Trainer**: configure input channel and polyphony by releasing a key held at power-up
//! - **Allocator**: [`ChannelAllocator`], lowest-free-slot assignment with oldest-key eviction
//! - **Router**: [`PolyMux`], the context object behind the host callbacks

pub mod error;
pub use error::{Error, Result};

pub mod params;
pub use params::{MemoryParamStore, ParamId, ParamSpec, ParamStore};

pub mod config;
pub use config::{RouterConfig, MAX_POLYPHONY};

pub mod trainer;
pub use trainer::{Trainer, Training, DEFAULT_TRAINING_TICKS, HEARTBEAT_PERIOD};

pub mod allocator;
pub use allocator::{ChannelAllocator, SubChannelSlot, MAX_SLOTS};

mod router;
pub use router::{PolyMux, PolyMuxBuilder};
