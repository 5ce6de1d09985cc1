// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::path::Path;
use std::sync::Arc;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::superclock::{
    set_most_recent_engine_sample_rate, set_superclock_ticks_per_second, DEFAULT_SAMPLE_RATE,
    DEFAULT_SUPERCLOCK_TICKS_PER_SECOND,
};
use crate::tempo::{Meter, Tempo, TempoMap};

use super::error::ConfigError;

/// Prefix of the environment variables that override file settings, e.g.
/// `TEMPORAL_SAMPLE_RATE` or `TEMPORAL_INITIAL_TEMPO__NOTE_TYPE`.
pub const ENV_PREFIX: &str = "TEMPORAL";

/// A YAML representation of the engine settings.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Settings {
    /// The sample rate the engine runs at.
    #[serde(default = "default_sample_rate")]
    sample_rate: u32,

    /// Superclock ticks per second. Should be divisible by every sample rate in use so
    /// sample positions convert exactly.
    #[serde(default = "default_superclock_ticks_per_second")]
    superclock_ticks_per_second: i64,

    /// The tempo a new map starts with.
    #[serde(default)]
    initial_tempo: TempoSettings,

    /// The meter a new map starts with.
    #[serde(default)]
    initial_meter: MeterSettings,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct TempoSettings {
    note_types_per_minute: f64,

    #[serde(default = "default_note_type")]
    note_type: i32,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct MeterSettings {
    divisions_per_bar: i32,

    #[serde(default = "default_note_type")]
    note_value: i32,
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

fn default_superclock_ticks_per_second() -> i64 {
    DEFAULT_SUPERCLOCK_TICKS_PER_SECOND
}

fn default_note_type() -> i32 {
    4
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            sample_rate: default_sample_rate(),
            superclock_ticks_per_second: default_superclock_ticks_per_second(),
            initial_tempo: TempoSettings::default(),
            initial_meter: MeterSettings::default(),
        }
    }
}

impl Default for TempoSettings {
    fn default() -> Self {
        TempoSettings {
            note_types_per_minute: 120.0,
            note_type: default_note_type(),
        }
    }
}

impl Default for MeterSettings {
    fn default() -> Self {
        MeterSettings {
            divisions_per_bar: 4,
            note_value: default_note_type(),
        }
    }
}

impl Settings {
    /// Loads settings from an optional YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Settings, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings: Settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn superclock_ticks_per_second(&self) -> i64 {
        self.superclock_ticks_per_second
    }

    pub fn initial_tempo(&self) -> Tempo {
        Tempo::new(
            self.initial_tempo.note_types_per_minute,
            self.initial_tempo.note_type,
        )
    }

    pub fn initial_meter(&self) -> Meter {
        Meter::new(
            self.initial_meter.divisions_per_bar,
            self.initial_meter.note_value,
        )
    }

    /// Checks that the settings describe a usable engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_rate == 0 {
            return Err(ConfigError::Invalid {
                name: "sample_rate",
                reason: "must be positive".to_string(),
            });
        }
        if self.superclock_ticks_per_second <= 0 {
            return Err(ConfigError::Invalid {
                name: "superclock_ticks_per_second",
                reason: "must be positive".to_string(),
            });
        }
        let npm = self.initial_tempo.note_types_per_minute;
        let valid = npm.is_finite() && npm > 0.0 && self.initial_tempo.note_type > 0;
        if !valid || !self.initial_tempo().is_valid() {
            return Err(ConfigError::Invalid {
                name: "initial_tempo",
                reason: format!("{} per minute of 1/{}", npm, self.initial_tempo.note_type),
            });
        }
        let meter = self.initial_meter();
        if !meter.is_valid() {
            return Err(ConfigError::Invalid {
                name: "initial_meter",
                reason: meter.to_string(),
            });
        }

        if self.superclock_ticks_per_second % self.sample_rate as i64 != 0 {
            warn!(
                sample_rate = self.sample_rate,
                superclock_ticks_per_second = self.superclock_ticks_per_second,
                "Superclock rate is not a multiple of the sample rate, samples will be rounded"
            );
        }
        Ok(())
    }

    /// Installs the process-wide rates and publishes a map holding the initial tempo and
    /// meter.
    pub fn apply(&self) -> Arc<TempoMap> {
        set_superclock_ticks_per_second(self.superclock_ticks_per_second);
        set_most_recent_engine_sample_rate(self.sample_rate);
        info!(
            sample_rate = self.sample_rate,
            tempo = %self.initial_tempo(),
            meter = %self.initial_meter(),
            "Applying engine settings"
        );
        TempoMap::init(self.new_map())
    }

    /// A map holding only the initial tempo and meter.
    pub fn new_map(&self) -> TempoMap {
        TempoMap::new(self.initial_tempo(), self.initial_meter(), self.sample_rate)
    }
}
