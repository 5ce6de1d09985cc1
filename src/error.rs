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

use crate::config::ConfigError;
use crate::parse::ParseError;
use crate::tempo::{EditError, StateError};

/// Errors surfaced by the timeline engine.
#[derive(Debug, thiserror::Error)]
pub enum TemporalError {
    /// Two values tagged with different time domains were ordered against each other.
    #[error("cannot order values from different time domains")]
    DomainMismatch,

    #[error(transparent)]
    Edit(#[from] EditError),

    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
