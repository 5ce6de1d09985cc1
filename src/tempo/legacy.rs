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
//! The section-based format used before maps stored clock positions.
//!
//! Sections are positioned by BBT alone with floating point rates. Loading rebuilds a
//! current map by replaying every section as an edit.

use serde::Deserialize;
use tracing::debug;

use crate::bbt::BbtTime;
use crate::superclock::most_recent_engine_sample_rate;

use super::error::StateError;
use super::map::TempoMap;
use super::types::{Meter, Tempo};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LegacyTempoMapState {
    pub version: u64,
    #[serde(default)]
    pub sections: Vec<LegacySection>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind")]
pub enum LegacySection {
    #[serde(rename_all = "kebab-case")]
    Tempo {
        start: String,
        beats_per_minute: f64,
        #[serde(default = "default_tempo_note_type")]
        note_type: f64,
        movable: bool,
    },
    #[serde(rename_all = "kebab-case")]
    Meter {
        start: String,
        beats_per_bar: f64,
        note_type: f64,
        movable: bool,
    },
}

fn default_tempo_note_type() -> f64 {
    4.0
}

impl LegacyTempoMapState {
    /// Rebuilds a current map. The unmovable tempo and meter become the initial ones, then
    /// the remaining meters and tempos are replayed in BBT order.
    pub fn to_map(&self) -> Result<TempoMap, StateError> {
        let mut initial_tempo = None;
        let mut initial_meter = None;
        let mut tempos: Vec<(BbtTime, Tempo)> = Vec::new();
        let mut meters: Vec<(BbtTime, Meter)> = Vec::new();

        for section in &self.sections {
            match section {
                LegacySection::Tempo {
                    start,
                    beats_per_minute,
                    note_type,
                    movable,
                } => {
                    let start: BbtTime = start.parse()?;
                    let valid = beats_per_minute.is_finite() && *beats_per_minute > 0.0;
                    let tempo = Tempo::new(*beats_per_minute, note_type.round() as i32);
                    if !valid || *note_type < 1.0 || !tempo.is_valid() {
                        return Err(StateError::InvalidRecord(format!(
                            "tempo section at {} has an invalid rate",
                            start
                        )));
                    }
                    if *movable {
                        tempos.push((start, tempo));
                    } else if initial_tempo.is_none() {
                        initial_tempo = Some(tempo);
                    }
                }
                LegacySection::Meter {
                    start,
                    beats_per_bar,
                    note_type,
                    movable,
                } => {
                    let start: BbtTime = start.parse()?;
                    let meter = Meter::new(beats_per_bar.round() as i32, note_type.round() as i32);
                    if !meter.is_valid() {
                        return Err(StateError::InvalidRecord(format!(
                            "meter section at {} is invalid: {}",
                            start, meter
                        )));
                    }
                    if *movable {
                        meters.push((start, meter));
                    } else if initial_meter.is_none() {
                        initial_meter = Some(meter);
                    }
                }
            }
        }

        let tempo = initial_tempo.ok_or(StateError::MissingInitialTempo)?;
        let meter = initial_meter.ok_or(StateError::MissingInitialMeter)?;
        let mut map = TempoMap::new(tempo, meter, most_recent_engine_sample_rate());

        // Meters first so every tempo's BBT position resolves against the final bar layout.
        meters.sort_by_key(|(start, _)| *start);
        for (start, meter) in meters {
            debug!(bbt = %start, meter = %meter, "Replaying legacy meter");
            map.set_meter_at_bbt(meter, start)?;
        }

        tempos.sort_by_key(|(start, _)| *start);
        for (start, tempo) in tempos {
            debug!(bbt = %start, tempo = %tempo, "Replaying legacy tempo");
            map.set_tempo_at_bbt(tempo, start)?;
        }

        Ok(map)
    }
}
