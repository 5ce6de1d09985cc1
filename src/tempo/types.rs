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

use serde::{Deserialize, Serialize};

use crate::bbt::{BbtOffset, BbtTime};
use crate::beats::{round_ticks, Beats, RoundMode};
use crate::superclock::{
    superclock_ticks_per_second, superclock_to_samples, Superclock, MAX_SUPERCLOCK,
};
use crate::util::muldiv_round;

/// Whether a tempo holds steady or ramps toward the next tempo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TempoKind {
    Constant,
    Ramped,
}

/// A tempo. The rate is stored as superclocks per note type, so a 120 BPM quarter-note
/// tempo is half a second of superclock ticks per quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tempo {
    /// The length of one note type at the start of the tempo.
    superclocks_per_note_type: Superclock,

    /// The length of one note type at the end of the tempo. Differs from the start only
    /// for ramped tempos.
    end_superclocks_per_note_type: Superclock,

    /// The note value that counts as one beat of this tempo (4 is a quarter note).
    note_type: i32,

    active: bool,
    locked_to_meter: bool,

    /// Whether this tempo starts from the end rate of the tempo before it.
    continuing: bool,
}

impl Tempo {
    /// Creates a constant tempo. `note_types_per_minute` must be positive.
    pub fn new(note_types_per_minute: f64, note_type: i32) -> Tempo {
        Tempo::new_ramped(note_types_per_minute, note_types_per_minute, note_type)
    }

    /// Creates a tempo that ramps from one rate to another. Both rates must be positive.
    pub fn new_ramped(
        note_types_per_minute: f64,
        end_note_types_per_minute: f64,
        note_type: i32,
    ) -> Tempo {
        Tempo::from_superclocks(
            npm_to_superclocks(note_types_per_minute),
            npm_to_superclocks(end_note_types_per_minute),
            note_type,
        )
    }

    /// Creates a tempo directly from its superclock periods.
    pub fn from_superclocks(
        superclocks_per_note_type: Superclock,
        end_superclocks_per_note_type: Superclock,
        note_type: i32,
    ) -> Tempo {
        Tempo {
            superclocks_per_note_type,
            end_superclocks_per_note_type,
            note_type,
            active: true,
            locked_to_meter: false,
            continuing: false,
        }
    }

    pub fn note_type(&self) -> i32 {
        self.note_type
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn locked_to_meter(&self) -> bool {
        self.locked_to_meter
    }

    pub fn set_locked_to_meter(&mut self, locked: bool) {
        self.locked_to_meter = locked;
    }

    pub fn continuing(&self) -> bool {
        self.continuing
    }

    pub fn set_continuing(&mut self, continuing: bool) {
        self.continuing = continuing;
    }

    pub fn ramped(&self) -> bool {
        self.superclocks_per_note_type != self.end_superclocks_per_note_type
    }

    pub fn kind(&self) -> TempoKind {
        if self.ramped() {
            TempoKind::Ramped
        } else {
            TempoKind::Constant
        }
    }

    pub fn superclocks_per_note_type(&self) -> Superclock {
        self.superclocks_per_note_type
    }

    pub fn end_superclocks_per_note_type(&self) -> Superclock {
        self.end_superclocks_per_note_type
    }

    /// The start period expressed for a different note type.
    pub fn superclocks_per_note_type_as(&self, note_type: i32) -> Superclock {
        muldiv_round(
            self.superclocks_per_note_type,
            self.note_type as i64,
            note_type as i64,
        )
    }

    pub fn superclocks_per_quarter_note(&self) -> Superclock {
        self.superclocks_per_note_type_as(4)
    }

    pub fn end_superclocks_per_quarter_note(&self) -> Superclock {
        muldiv_round(
            self.end_superclocks_per_note_type,
            self.note_type as i64,
            4,
        )
    }

    /// The length of a single tick at the start rate.
    pub fn superclocks_per_ppqn(&self) -> Superclock {
        self.superclocks_per_quarter_note() / Beats::PPQN as i64
    }

    pub fn note_types_per_minute(&self) -> f64 {
        superclocks_to_npm(self.superclocks_per_note_type)
    }

    pub fn end_note_types_per_minute(&self) -> f64 {
        superclocks_to_npm(self.end_superclocks_per_note_type)
    }

    pub fn quarter_notes_per_minute(&self) -> f64 {
        (superclock_ticks_per_second() as f64 * 60.0 * 4.0)
            / (self.note_type as f64 * self.superclocks_per_note_type as f64)
    }

    pub fn samples_per_note_type(&self, sample_rate: u32) -> i64 {
        superclock_to_samples(self.superclocks_per_note_type, sample_rate)
    }

    pub fn samples_per_quarter_note(&self, sample_rate: u32) -> i64 {
        superclock_to_samples(self.superclocks_per_quarter_note(), sample_rate)
    }

    pub(crate) fn set_superclocks_per_note_type(&mut self, sc: Superclock) {
        self.superclocks_per_note_type = sc;
    }

    pub(crate) fn set_end_superclocks_per_note_type(&mut self, sc: Superclock) {
        self.end_superclocks_per_note_type = sc;
    }

    /// Stops ramping, holding the start rate.
    pub(crate) fn clear_ramp(&mut self) {
        self.end_superclocks_per_note_type = self.superclocks_per_note_type;
    }

    /// Scales both periods by `num / den`.
    pub(crate) fn rescale(&mut self, num: i64, den: i64) {
        self.superclocks_per_note_type = muldiv_round(self.superclocks_per_note_type, num, den);
        self.end_superclocks_per_note_type =
            muldiv_round(self.end_superclocks_per_note_type, num, den);
    }

    /// Whether the tempo describes a usable rate.
    pub fn is_valid(&self) -> bool {
        (1..MAX_SUPERCLOCK).contains(&self.superclocks_per_note_type)
            && (1..MAX_SUPERCLOCK).contains(&self.end_superclocks_per_note_type)
            && self.note_type > 0
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ramped() {
            write!(
                f,
                "{:.2}..{:.2} 1/{}",
                self.note_types_per_minute(),
                self.end_note_types_per_minute(),
                self.note_type
            )
        } else {
            write!(f, "{:.2} 1/{}", self.note_types_per_minute(), self.note_type)
        }
    }
}

fn npm_to_superclocks(note_types_per_minute: f64) -> Superclock {
    ((60.0 / note_types_per_minute) * superclock_ticks_per_second() as f64).round() as Superclock
}

fn superclocks_to_npm(superclocks_per_note_type: Superclock) -> f64 {
    (superclock_ticks_per_second() as f64 * 60.0) / superclocks_per_note_type as f64
}

/// A time signature: how many divisions make up a bar and which note value one division is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Meter {
    divisions_per_bar: i32,
    note_value: i32,
}

impl Meter {
    pub const fn new(divisions_per_bar: i32, note_value: i32) -> Meter {
        Meter {
            divisions_per_bar,
            note_value,
        }
    }

    pub fn divisions_per_bar(&self) -> i32 {
        self.divisions_per_bar
    }

    pub fn note_value(&self) -> i32 {
        self.note_value
    }

    /// Whether the meter can be used for bar arithmetic. The note value must divide a whole
    /// note into a whole number of ticks, so tuplet values such as 3 or 6 are accepted
    /// alongside the powers of two.
    pub fn is_valid(&self) -> bool {
        self.divisions_per_bar > 0
            && self.note_value > 0
            && (4 * Beats::PPQN as i64) % self.note_value as i64 == 0
    }

    /// Ticks in one division of the bar.
    pub fn ticks_per_grid(&self) -> i64 {
        4 * Beats::PPQN as i64 / self.note_value as i64
    }

    pub fn ticks_per_bar(&self) -> i64 {
        self.ticks_per_grid() * self.divisions_per_bar as i64
    }

    /// Adds an offset to a position. Bar 0 is skipped in both directions.
    pub fn bbt_add(&self, bbt: BbtTime, offset: BbtOffset) -> BbtTime {
        self.from_linear(self.linear(bbt).saturating_add(self.offset_ticks(offset)))
    }

    /// Subtracts an offset from a position. Bar 0 is skipped in both directions.
    pub fn bbt_subtract(&self, bbt: BbtTime, offset: BbtOffset) -> BbtTime {
        self.from_linear(self.linear(bbt).saturating_sub(self.offset_ticks(offset)))
    }

    /// Moves a position by a signed number of ticks.
    pub(crate) fn bbt_add_ticks(&self, bbt: BbtTime, ticks: i64) -> BbtTime {
        self.from_linear(self.linear(bbt).saturating_add(ticks))
    }

    /// The musical length of an offset under this meter.
    pub fn to_quarters(&self, offset: BbtOffset) -> Beats {
        Beats::from_ticks(self.offset_ticks(offset))
    }

    /// The musical distance from one position to another under this meter.
    pub fn quarters_between(&self, from: BbtTime, to: BbtTime) -> Beats {
        Beats::from_ticks(self.linear(to) - self.linear(from))
    }

    /// Rounds to the nearest bar. A position exactly half way through a bar rounds up.
    pub fn round_to_bar(&self, bbt: BbtTime) -> BbtTime {
        self.round(bbt, self.ticks_per_bar(), RoundMode::Nearest)
    }

    pub fn round_up_to_bar(&self, bbt: BbtTime) -> BbtTime {
        self.round(bbt, self.ticks_per_bar(), RoundMode::UpMaybe)
    }

    pub fn round_down_to_bar(&self, bbt: BbtTime) -> BbtTime {
        self.round(bbt, self.ticks_per_bar(), RoundMode::DownMaybe)
    }

    pub fn round_to_beat(&self, bbt: BbtTime) -> BbtTime {
        self.round(bbt, self.ticks_per_grid(), RoundMode::Nearest)
    }

    pub fn round_up_to_beat(&self, bbt: BbtTime) -> BbtTime {
        self.round(bbt, self.ticks_per_grid(), RoundMode::UpMaybe)
    }

    pub fn round_down_to_beat(&self, bbt: BbtTime) -> BbtTime {
        self.round(bbt, self.ticks_per_grid(), RoundMode::DownMaybe)
    }

    fn round(&self, bbt: BbtTime, step: i64, mode: RoundMode) -> BbtTime {
        self.from_linear(round_ticks(self.linear(bbt), step, mode))
    }

    fn offset_ticks(&self, offset: BbtOffset) -> i64 {
        (offset.bars as i64 * self.divisions_per_bar as i64 + offset.beats as i64)
            * self.ticks_per_grid()
            + offset.ticks as i64
    }

    /// Ticks from 1|1|0 to the given position, counting as if the meter applied throughout.
    fn linear(&self, bbt: BbtTime) -> i64 {
        let bar_index = if bbt.bars > 0 {
            bbt.bars as i64 - 1
        } else {
            bbt.bars as i64
        };
        (bar_index * self.divisions_per_bar as i64 + (bbt.beats as i64 - 1))
            * self.ticks_per_grid()
            + bbt.ticks as i64
    }

    fn from_linear(&self, ticks: i64) -> BbtTime {
        let ticks_per_bar = self.ticks_per_bar();
        let bar_index = ticks.div_euclid(ticks_per_bar);
        let within = ticks.rem_euclid(ticks_per_bar);

        let bars = if bar_index >= 0 {
            bar_index + 1
        } else {
            bar_index
        };

        BbtTime::new(
            bars.clamp(i32::MIN as i64, i32::MAX as i64) as i32,
            (within / self.ticks_per_grid()) as i32 + 1,
            (within % self.ticks_per_grid()) as i32,
        )
    }
}

impl fmt::Display for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.divisions_per_bar, self.note_value)
    }
}
