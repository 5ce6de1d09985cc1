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
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bbt::BbtTime;
use crate::beats::Beats;
use crate::superclock::{superclock_ticks_per_second, Superclock};
use crate::util::{filename_display, muldiv_round};

use super::error::StateError;
use super::legacy::LegacyTempoMapState;
use super::map::TempoMap;
use super::point::{MeterPoint, MusicTimePoint, Point, Positioned, TempoPoint};
use super::types::{Meter, Tempo, TempoKind};

/// The version written by [`TempoMap::to_yaml`]. Documents with a lower version use the
/// legacy section format.
pub const STATE_VERSION: u64 = 7000;

/// The serialized form of a tempo map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TempoMapState {
    pub version: u64,
    pub superclocks_per_second: Superclock,
    pub sample_rate: u32,
    pub points: Vec<PointRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum PointRecord {
    Tempo(TempoRecord),
    Meter(MeterRecord),
    MusicTime(MusicTimeRecord),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TempoRecord {
    pub sclock: Superclock,
    pub quarters: Beats,
    pub bbt: BbtTime,
    pub scpnt_start: Superclock,
    pub scpnt_end: Superclock,
    pub note_type: i32,
    #[serde(rename = "type")]
    pub kind: TempoKind,
    pub active: bool,
    pub locked_to_meter: bool,
    pub continuing: bool,
    pub omega: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MeterRecord {
    pub sclock: Superclock,
    pub quarters: Beats,
    pub bbt: BbtTime,
    pub note_value: i32,
    pub divisions_per_bar: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MusicTimeRecord {
    pub sclock: Superclock,
    pub quarters: Beats,
    pub bbt: BbtTime,
}

impl PointRecord {
    fn sclock(&self) -> Superclock {
        match self {
            PointRecord::Tempo(record) => record.sclock,
            PointRecord::Meter(record) => record.sclock,
            PointRecord::MusicTime(record) => record.sclock,
        }
    }
}

impl TempoMap {
    /// Captures every point of the map.
    pub fn get_state(&self) -> TempoMapState {
        let mut points: Vec<PointRecord> = Vec::with_capacity(
            self.tempos.len() + self.meters.len() + self.bartimes.len(),
        );

        points.extend(self.meters.iter().map(|mp| {
            PointRecord::Meter(MeterRecord {
                sclock: mp.sclock(),
                quarters: mp.beats(),
                bbt: mp.bbt(),
                note_value: mp.meter().note_value(),
                divisions_per_bar: mp.meter().divisions_per_bar(),
            })
        }));
        points.extend(self.bartimes.iter().map(|mtp| {
            PointRecord::MusicTime(MusicTimeRecord {
                sclock: mtp.sclock(),
                quarters: mtp.beats(),
                bbt: mtp.bbt(),
            })
        }));
        points.extend(self.tempos.iter().map(|tp| {
            let tempo = tp.tempo();
            PointRecord::Tempo(TempoRecord {
                sclock: tp.sclock(),
                quarters: tp.beats(),
                bbt: tp.bbt(),
                scpnt_start: tempo.superclocks_per_note_type(),
                scpnt_end: tempo.end_superclocks_per_note_type(),
                note_type: tempo.note_type(),
                kind: tempo.kind(),
                active: tempo.active(),
                locked_to_meter: tempo.locked_to_meter(),
                continuing: tempo.continuing(),
                omega: tp.omega(),
            })
        }));
        // Stable, so points sharing a position stay meter first and tempo last.
        points.sort_by_key(PointRecord::sclock);

        TempoMapState {
            version: STATE_VERSION,
            superclocks_per_second: superclock_ticks_per_second(),
            sample_rate: self.sample_rate,
            points,
        }
    }

    /// Replaces the map with a captured state. On failure the map is left as it was.
    pub fn set_state(&mut self, state: &TempoMapState) -> Result<(), StateError> {
        *self = TempoMap::from_state(state)?;
        Ok(())
    }

    /// Builds a map from a captured state. Clock values captured at a different
    /// superclock rate are rescaled to the current one.
    pub fn from_state(state: &TempoMapState) -> Result<TempoMap, StateError> {
        if state.version != STATE_VERSION {
            return Err(StateError::UnsupportedVersion(state.version));
        }
        if state.superclocks_per_second <= 0 {
            return Err(StateError::InvalidRecord(format!(
                "superclocks-per-second must be positive, got {}",
                state.superclocks_per_second
            )));
        }
        if state.sample_rate == 0 {
            return Err(StateError::InvalidRecord("sample-rate must be positive".into()));
        }

        let current = superclock_ticks_per_second();
        let rescaled = state.superclocks_per_second != current;
        let scale = |sc: Superclock| {
            if rescaled {
                muldiv_round(sc, current, state.superclocks_per_second)
            } else {
                sc
            }
        };

        let mut tempos = Vec::new();
        let mut meters = Vec::new();
        let mut bartimes = Vec::new();

        for record in &state.points {
            match record {
                PointRecord::Tempo(r) => {
                    let mut tempo = Tempo::from_superclocks(
                        scale(r.scpnt_start),
                        scale(r.scpnt_end),
                        r.note_type,
                    );
                    tempo.set_active(r.active);
                    tempo.set_locked_to_meter(r.locked_to_meter);
                    tempo.set_continuing(r.continuing);
                    if !tempo.is_valid() {
                        return Err(StateError::InvalidRecord(format!(
                            "tempo at {} has an invalid rate",
                            r.bbt
                        )));
                    }
                    if tempo.kind() != r.kind {
                        warn!(bbt = %r.bbt, "Tempo type disagrees with its rates, using the rates");
                    }
                    let point = Point::new(scale(r.sclock), r.quarters, r.bbt);
                    tempos.push(TempoPoint::with_omega(tempo, point, r.omega));
                }
                PointRecord::Meter(r) => {
                    let meter = Meter::new(r.divisions_per_bar, r.note_value);
                    if !meter.is_valid() {
                        return Err(StateError::InvalidRecord(format!(
                            "meter at {} is invalid: {}",
                            r.bbt, meter
                        )));
                    }
                    let point = Point::new(scale(r.sclock), r.quarters, r.bbt);
                    meters.push(MeterPoint::new(meter, point));
                }
                PointRecord::MusicTime(r) => {
                    let point = Point::new(scale(r.sclock), r.quarters, r.bbt);
                    bartimes.push(MusicTimePoint::new(point));
                }
            }
        }

        tempos.sort_by_key(|t| t.sclock());
        meters.sort_by_key(|m| m.sclock());
        bartimes.sort_by_key(|m| m.sclock());

        match tempos.first() {
            Some(tp) if tp.sclock() == 0 && tp.beats().is_zero() => {}
            _ => return Err(StateError::MissingInitialTempo),
        }
        match meters.first() {
            Some(mp) if mp.sclock() == 0 && mp.beats().is_zero() => {}
            _ => return Err(StateError::MissingInitialMeter),
        }

        let mut map = TempoMap::from_parts(tempos, meters, bartimes, state.sample_rate);
        if rescaled {
            // Rounded positions and periods are brought back into agreement.
            map.reset_starting_at(0)?;
        } else {
            map.reset_starting_at(Superclock::MAX)?;
        }
        Ok(map)
    }

    pub fn to_yaml(&self) -> Result<String, StateError> {
        Ok(serde_yml::to_string(&self.get_state())?)
    }

    /// Parses a document in either the current or the legacy format.
    pub fn from_yaml(text: &str) -> Result<TempoMap, StateError> {
        let value: serde_yml::Value = serde_yml::from_str(text)?;
        let version = value
            .get("version")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| StateError::InvalidRecord("missing or invalid version".into()))?;

        if version < STATE_VERSION {
            let legacy: LegacyTempoMapState = serde_yml::from_value(value)?;
            info!(version, "Converting legacy tempo map");
            legacy.to_map()
        } else {
            let state: TempoMapState = serde_yml::from_value(value)?;
            TempoMap::from_state(&state)
        }
    }

    pub fn load(path: &Path) -> Result<TempoMap, StateError> {
        let text = std::fs::read_to_string(path)?;
        match TempoMap::from_yaml(&text) {
            Ok(map) => {
                info!(
                    path = filename_display(path),
                    tempos = map.n_tempos(),
                    meters = map.n_meters(),
                    "Loaded tempo map"
                );
                Ok(map)
            }
            Err(e) => {
                warn!(path = filename_display(path), err = %e, "Failed to load tempo map");
                Err(e)
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StateError> {
        let serialized = self.to_yaml()?;
        info!(path = filename_display(path), points = self.points.len(), "Saving tempo map");

        let mut file = std::fs::File::create(path)?;
        file.write_all(serialized.as_bytes())?;
        Ok(())
    }
}
