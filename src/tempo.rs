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
//! The tempo map and everything positioned on it.
//!
//! Positions are held in three domains at once: superclock ticks, quarter notes and
//! bars|beats|ticks. Edits re-derive every later position so the three always agree.
//! Readers use a per-thread snapshot of the process-wide map (see [`global`]).

mod error;
pub mod global;
mod grid;
pub mod legacy;
mod map;
mod metric;
mod point;
pub mod state;
mod types;
mod walk;

#[cfg(test)]
mod tests;

pub use error::{EditError, StateError};
pub use global::TempoMapWriter;
pub use map::TempoMap;
pub use metric::TempoMetric;
pub use point::{
    GridPoint, MapPoint, MeterPoint, MusicTimePoint, Point, PointKind, Positioned, TempoPoint,
};
pub use state::{TempoMapState, STATE_VERSION};
pub use types::{Meter, Tempo, TempoKind};
