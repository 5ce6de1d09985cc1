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
//! Musical time for audio engines: superclock and beat clocks, tagged timeline positions,
//! and a tempo map converting between them.

pub mod bbt;
pub mod beats;
pub mod config;
pub mod error;
pub mod int62;
pub mod parse;
pub mod rcu;
pub mod superclock;
pub mod tempo;
pub mod timeline;
pub mod util;

pub use bbt::{BbtOffset, BbtTime};
pub use beats::{Beats, RoundMode};
pub use error::TemporalError;
pub use superclock::Superclock;
pub use tempo::{Meter, Tempo, TempoMap};
pub use timeline::{AtomicTimepos, TimeDomain, Timecnt, Timepos};
