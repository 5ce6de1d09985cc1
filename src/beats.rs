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
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};

use crate::util::{int_div_round, muldiv_round};

/// How a value should be moved onto a boundary (beat, subdivision, bar).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundMode {
    /// Nearest boundary. Exact halves round up.
    Nearest,
    /// Next boundary, unless already on one.
    UpMaybe,
    /// Next boundary, even when already on one.
    UpAlways,
    /// Previous boundary, unless already on one.
    DownMaybe,
    /// Previous boundary, even when already on one.
    DownAlways,
}

/// An exact musical duration or position measured in quarter notes.
///
/// A value is a beat count plus a tick count at [`Beats::PPQN`] ticks per beat. Values are
/// always normalized so the ticks lie in `[0, PPQN)`, with negative values floored (half a
/// beat before zero is `-1:960`). When the beat count would overflow, the excess is carried
/// in the tick field instead.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(from = "RawBeats")]
pub struct Beats {
    beats: i32,
    ticks: i32,
}

/// Un-normalized persisted form of [`Beats`].
#[derive(Deserialize)]
struct RawBeats {
    beats: i32,
    #[serde(default)]
    ticks: i32,
}

impl From<RawBeats> for Beats {
    fn from(raw: RawBeats) -> Self {
        Beats::new(raw.beats, raw.ticks)
    }
}

impl Beats {
    /// Ticks per beat.
    pub const PPQN: i32 = 1920;

    /// The largest representable value.
    pub const MAX: Beats = Beats {
        beats: i32::MAX,
        ticks: i32::MAX,
    };

    /// The smallest representable value.
    pub const MIN: Beats = Beats {
        beats: i32::MIN,
        ticks: i32::MIN,
    };

    pub const ZERO: Beats = Beats { beats: 0, ticks: 0 };

    /// Creates a normalized value from a beat and tick count.
    pub fn new(beats: i32, ticks: i32) -> Beats {
        Beats::from_ticks(beats as i64 * Self::PPQN as i64 + ticks as i64)
    }

    /// Creates a value of whole beats.
    pub const fn from_beats(beats: i32) -> Beats {
        Beats { beats, ticks: 0 }
    }

    /// Creates a normalized value from a raw tick count.
    pub fn from_ticks(ticks: i64) -> Beats {
        let ppqn = Self::PPQN as i64;
        let beats = ticks.div_euclid(ppqn);

        if beats > i32::MAX as i64 {
            let excess = ticks - i32::MAX as i64 * ppqn;
            Beats {
                beats: i32::MAX,
                ticks: excess.min(i32::MAX as i64) as i32,
            }
        } else if beats < i32::MIN as i64 {
            let excess = ticks - i32::MIN as i64 * ppqn;
            Beats {
                beats: i32::MIN,
                ticks: excess.max(i32::MIN as i64) as i32,
            }
        } else {
            Beats {
                beats: beats as i32,
                ticks: ticks.rem_euclid(ppqn) as i32,
            }
        }
    }

    /// Creates a value from ticks counted at a different resolution, such as a MIDI file's
    /// ticks per quarter note.
    pub fn ticks_at_rate(ticks: i64, rate: i64) -> Beats {
        Beats::from_ticks(muldiv_round(ticks, Self::PPQN as i64, rate))
    }

    /// Creates a value from a floating point beat count, rounding to the nearest tick.
    /// Intended for user entry only; timeline arithmetic never goes through floats.
    pub fn from_double(beats: f64) -> Beats {
        Beats::from_ticks((beats * Self::PPQN as f64).round() as i64)
    }

    pub fn get_beats(&self) -> i32 {
        self.beats
    }

    pub fn get_ticks(&self) -> i32 {
        self.ticks
    }

    /// The total number of ticks in this value.
    pub fn to_ticks(&self) -> i64 {
        self.beats as i64 * Self::PPQN as i64 + self.ticks as i64
    }

    /// The value as a floating point beat count. For display only.
    pub fn to_double(&self) -> f64 {
        self.to_ticks() as f64 / Self::PPQN as f64
    }

    pub fn is_zero(&self) -> bool {
        self.beats == 0 && self.ticks == 0
    }

    pub fn is_negative(&self) -> bool {
        self.beats < 0
    }

    pub fn abs(&self) -> Beats {
        if self.is_negative() {
            -*self
        } else {
            *self
        }
    }

    /// The absolute distance between two values.
    pub fn diff(&self, other: &Beats) -> Beats {
        (*self - *other).abs()
    }

    /// Rounds to the nearest whole beat.
    pub fn round_to_beat(&self) -> Beats {
        self.round_to_subdivision(1, RoundMode::Nearest)
    }

    /// Rounds up to a whole beat, leaving whole beats alone.
    pub fn round_up_to_beat(&self) -> Beats {
        self.round_to_subdivision(1, RoundMode::UpMaybe)
    }

    /// Rounds down to a whole beat.
    pub fn round_down_to_beat(&self) -> Beats {
        self.round_to_subdivision(1, RoundMode::DownMaybe)
    }

    /// Rounds to a subdivision of the beat. A subdivision of 4 rounds to sixteenth notes;
    /// values below 1 round to whole beats.
    pub fn round_to_subdivision(&self, subdivision: i32, mode: RoundMode) -> Beats {
        let step = if subdivision <= 1 {
            Self::PPQN as i64
        } else {
            (Self::PPQN / subdivision).max(1) as i64
        };

        Beats::from_ticks(round_ticks(self.to_ticks(), step, mode))
    }
}

/// Rounds a tick count onto a multiple of `step`.
pub(crate) fn round_ticks(ticks: i64, step: i64, mode: RoundMode) -> i64 {
    let floor = ticks.div_euclid(step) * step;
    let rem = ticks - floor;

    match mode {
        RoundMode::Nearest => {
            if rem * 2 >= step {
                floor + step
            } else {
                floor
            }
        }
        RoundMode::UpMaybe => {
            if rem == 0 {
                ticks
            } else {
                floor + step
            }
        }
        RoundMode::UpAlways => floor + step,
        RoundMode::DownMaybe => floor,
        RoundMode::DownAlways => {
            if rem == 0 {
                floor - step
            } else {
                floor
            }
        }
    }
}

impl Add for Beats {
    type Output = Beats;

    fn add(self, rhs: Beats) -> Beats {
        Beats::from_ticks(self.to_ticks().saturating_add(rhs.to_ticks()))
    }
}

impl AddAssign for Beats {
    fn add_assign(&mut self, rhs: Beats) {
        *self = *self + rhs;
    }
}

impl Sub for Beats {
    type Output = Beats;

    fn sub(self, rhs: Beats) -> Beats {
        Beats::from_ticks(self.to_ticks().saturating_sub(rhs.to_ticks()))
    }
}

impl SubAssign for Beats {
    fn sub_assign(&mut self, rhs: Beats) {
        *self = *self - rhs;
    }
}

impl Neg for Beats {
    type Output = Beats;

    fn neg(self) -> Beats {
        Beats::from_ticks(-self.to_ticks())
    }
}

impl Mul<i32> for Beats {
    type Output = Beats;

    fn mul(self, rhs: i32) -> Beats {
        Beats::from_ticks(self.to_ticks().saturating_mul(rhs as i64))
    }
}

/// Division rounds to the nearest tick.
impl Div<i32> for Beats {
    type Output = Beats;

    fn div(self, rhs: i32) -> Beats {
        Beats::from_ticks(int_div_round(self.to_ticks(), rhs as i64))
    }
}

impl fmt::Display for Beats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.beats, self.ticks)
    }
}
