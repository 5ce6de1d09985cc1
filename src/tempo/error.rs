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
use crate::beats::Beats;
use crate::parse::ParseError;
use crate::superclock::Superclock;

use super::types::Meter;

/// Why an edit to a tempo map was refused. A refused edit leaves the map untouched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EditError {
    #[error("tempo rates and note types must be positive")]
    InvalidTempo,

    #[error("invalid meter {0}")]
    InvalidMeter(Meter),

    #[error("position {0} is before the start of the map")]
    BeforeStart(Beats),

    #[error("the initial tempo and meter cannot be moved or removed")]
    InitialPoint,

    #[error("no matching point in the tempo map")]
    NotFound,

    #[error("a point already exists at superclock {0}")]
    Collision(Superclock),

    #[error("the point is already at that position")]
    Unchanged,

    #[error("the edit would leave points out of order at superclock {0}")]
    Ordering(Superclock),

    #[error("time can only be inserted or removed in positive amounts")]
    InvalidDuration,

    #[error("there is no following tempo with a different rate to ramp toward")]
    NoRampTarget,
}

/// Errors loading or saving a tempo map.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yml::Error),

    #[error("unsupported tempo map version {0}")]
    UnsupportedVersion(u64),

    #[error("tempo map has no tempo at the start of the timeline")]
    MissingInitialTempo,

    #[error("tempo map has no meter at the start of the timeline")]
    MissingInitialMeter,

    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("invalid position: {0}")]
    Position(#[from] ParseError),

    #[error("could not rebuild tempo map: {0}")]
    Edit(#[from] EditError),
}
