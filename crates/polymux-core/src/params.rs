//! Persisted integer parameters, addressed by numeric key.
//!
//! The router never keeps its own copy of a setting: it reads these values
//! through [`ParamStore`] and derives [`RouterConfig`](crate::RouterConfig)
//! from them whenever the host reports a change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One of the three persisted parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u16)]
pub enum ParamId {
    /// Input channel, 1-16. 0 disables routing.
    InputChannel = 0,
    /// First output channel, 1-16.
    OutputBaseChannel = 1,
    /// Number of output sub-channels, 1-12.
    Polyphony = 2,
}

/// Declared bounds and default of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub min: i32,
    pub max: i32,
    pub default: i32,
}

impl ParamSpec {
    #[inline]
    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn check(&self, value: i32) -> Result<i32> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(Error::ParamOutOfRange {
                param: self.name,
                value,
                min: self.min,
                max: self.max,
            })
        }
    }
}

const INPUT_CHANNEL: ParamSpec = ParamSpec {
    name: "input_channel",
    min: 0,
    max: 16,
    default: 15,
};

const OUTPUT_BASE_CHANNEL: ParamSpec = ParamSpec {
    name: "output_base_channel",
    min: 1,
    max: 16,
    default: 1,
};

const POLYPHONY: ParamSpec = ParamSpec {
    name: "polyphony",
    min: 1,
    max: 12,
    default: 4,
};

impl ParamId {
    pub const ALL: [ParamId; 3] = [
        ParamId::InputChannel,
        ParamId::OutputBaseChannel,
        ParamId::Polyphony,
    ];

    #[inline]
    pub const fn key(self) -> u16 {
        self as u16
    }

    pub fn from_key(key: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.key() == key)
    }

    pub const fn spec(self) -> ParamSpec {
        match self {
            ParamId::InputChannel => INPUT_CHANNEL,
            ParamId::OutputBaseChannel => OUTPUT_BASE_CHANNEL,
            ParamId::Polyphony => POLYPHONY,
        }
    }

    #[inline]
    pub const fn name(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ParamId {
    type Err = Error;

    /// Accepts the parameter name or its numeric key.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(key) = s.parse::<u16>() {
            return Self::from_key(key).ok_or(Error::UnknownParam(key));
        }
        Self::ALL
            .into_iter()
            .find(|id| id.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownParamName(s.to_string()))
    }
}

/// Host-side parameter storage.
///
/// `set` persists a value; the host is then expected to call
/// [`PolyMux::on_param_change`](crate::PolyMux::on_param_change).
pub trait ParamStore {
    fn get(&self, id: ParamId) -> i32;
    fn set(&mut self, id: ParamId, value: i32) -> Result<()>;
}

/// In-memory parameter store that enforces the declared bounds.
///
/// Serializable so a host can persist it across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryParamStore {
    input_channel: i32,
    output_base_channel: i32,
    polyphony: i32,
}

impl Default for MemoryParamStore {
    fn default() -> Self {
        Self {
            input_channel: INPUT_CHANNEL.default,
            output_base_channel: OUTPUT_BASE_CHANNEL.default,
            polyphony: POLYPHONY.default,
        }
    }
}

impl MemoryParamStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style `set` for tests and setup code.
    pub fn with(mut self, id: ParamId, value: i32) -> Result<Self> {
        self.set(id, value)?;
        Ok(self)
    }

    /// Re-check every value, e.g. after deserializing.
    pub fn validate(&self) -> Result<()> {
        for id in ParamId::ALL {
            id.spec().check(self.get(id))?;
        }
        Ok(())
    }

    fn slot_mut(&mut self, id: ParamId) -> &mut i32 {
        match id {
            ParamId::InputChannel => &mut self.input_channel,
            ParamId::OutputBaseChannel => &mut self.output_base_channel,
            ParamId::Polyphony => &mut self.polyphony,
        }
    }
}

impl ParamStore for MemoryParamStore {
    fn get(&self, id: ParamId) -> i32 {
        match id {
            ParamId::InputChannel => self.input_channel,
            ParamId::OutputBaseChannel => self.output_base_channel,
            ParamId::Polyphony => self.polyphony,
        }
    }

    fn set(&mut self, id: ParamId, value: i32) -> Result<()> {
        *self.slot_mut(id) = id.spec().check(value)?;
        Ok(())
    }
}
