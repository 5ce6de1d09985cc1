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
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::parse::{self, ParseError};

/// A bars|beats|ticks position. Bars and beats count from 1 and there is no bar 0: the bar
/// before bar 1 is bar -1. Ticks are measured at the same resolution as
/// [`crate::beats::Beats`], so one beat of an 8th-note meter spans half the ticks of a
/// quarter-note beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BbtTime {
    pub bars: i32,
    pub beats: i32,
    pub ticks: i32,
}

impl BbtTime {
    pub const fn new(bars: i32, beats: i32, ticks: i32) -> BbtTime {
        BbtTime { bars, beats, ticks }
    }

    /// Whether the position is the first beat of a bar.
    pub fn is_bar(&self) -> bool {
        self.beats == 1 && self.ticks == 0
    }

    /// Whether the position falls on a beat.
    pub fn is_beat(&self) -> bool {
        self.ticks == 0
    }

    pub fn round_down_to_beat(&self) -> BbtTime {
        BbtTime::new(self.bars, self.beats, 0)
    }

    pub fn round_down_to_bar(&self) -> BbtTime {
        BbtTime::new(self.bars, 1, 0)
    }

    /// The first beat of the following bar.
    pub fn next_bar(&self) -> BbtTime {
        BbtTime::new(bar_after(self.bars), 1, 0)
    }
}

impl Default for BbtTime {
    fn default() -> Self {
        BbtTime::new(1, 1, 0)
    }
}

/// The bar number following the given one, skipping the nonexistent bar 0.
pub fn bar_after(bars: i32) -> i32 {
    match bars {
        -1 => 1,
        b => b.saturating_add(1),
    }
}

impl fmt::Display for BbtTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.bars, self.beats, self.ticks)
    }
}

impl FromStr for BbtTime {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_bbt(s)
    }
}

impl TryFrom<String> for BbtTime {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BbtTime> for String {
    fn from(value: BbtTime) -> Self {
        value.to_string()
    }
}

/// A distance in bars, beats and ticks. Unlike [`BbtTime`], every field counts from zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BbtOffset {
    pub bars: i32,
    pub beats: i32,
    pub ticks: i32,
}

impl BbtOffset {
    pub const fn new(bars: i32, beats: i32, ticks: i32) -> BbtOffset {
        BbtOffset { bars, beats, ticks }
    }

    pub fn is_zero(&self) -> bool {
        self.bars == 0 && self.beats == 0 && self.ticks == 0
    }

    pub fn is_negative(&self) -> bool {
        self.bars < 0 || self.beats < 0 || self.ticks < 0
    }
}

impl std::ops::Neg for BbtOffset {
    type Output = BbtOffset;

    fn neg(self) -> BbtOffset {
        BbtOffset::new(-self.bars, -self.beats, -self.ticks)
    }
}

impl fmt::Display for BbtOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}|{}", self.bars, self.beats, self.ticks)
    }
}

impl FromStr for BbtOffset {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_bbt_offset(s)
    }
}
