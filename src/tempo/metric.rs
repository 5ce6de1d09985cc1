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
use crate::bbt::{BbtOffset, BbtTime};
use crate::beats::Beats;
use crate::superclock::{superclock_to_samples, Superclock};
use crate::util::muldiv_round;

use super::point::{MeterPoint, TempoPoint};
use super::types::{Meter, Tempo};

/// The tempo and meter in effect at some instant.
///
/// Metrics are cheap copies taken from a map for the duration of a computation. They are
/// never stored in the map itself, so an edit never leaves one pointing at stale data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoMetric {
    tempo: TempoPoint,
    meter: MeterPoint,
}

impl TempoMetric {
    pub fn new(tempo: TempoPoint, meter: MeterPoint) -> TempoMetric {
        TempoMetric { tempo, meter }
    }

    pub fn tempo_point(&self) -> &TempoPoint {
        &self.tempo
    }

    pub fn meter_point(&self) -> &MeterPoint {
        &self.meter
    }

    pub fn tempo(&self) -> &Tempo {
        self.tempo.tempo()
    }

    pub fn meter(&self) -> &Meter {
        self.meter.meter()
    }

    pub fn note_type(&self) -> i32 {
        self.tempo().note_type()
    }

    pub fn divisions_per_bar(&self) -> i32 {
        self.meter().divisions_per_bar()
    }

    pub fn note_value(&self) -> i32 {
        self.meter().note_value()
    }

    pub fn superclocks_per_note_type(&self) -> Superclock {
        self.tempo().superclocks_per_note_type()
    }

    pub fn superclocks_per_quarter_note(&self) -> Superclock {
        self.tempo().superclocks_per_quarter_note()
    }

    pub fn superclocks_per_note_type_at(&self, sc: Superclock) -> Superclock {
        self.tempo.superclocks_per_note_type_at(sc)
    }

    /// The length of one meter division at the start of the tempo.
    pub fn superclocks_per_grid(&self) -> Superclock {
        muldiv_round(
            self.superclocks_per_note_type(),
            self.note_type() as i64,
            self.note_value() as i64,
        )
    }

    /// The length of one meter division at the given position.
    pub fn superclocks_per_grid_at(&self, sc: Superclock) -> Superclock {
        muldiv_round(
            self.superclocks_per_note_type_at(sc),
            self.note_type() as i64,
            self.note_value() as i64,
        )
    }

    pub fn superclocks_per_bar(&self) -> Superclock {
        self.superclocks_per_grid() * self.divisions_per_bar() as i64
    }

    pub fn samples_per_bar(&self, sample_rate: u32) -> i64 {
        superclock_to_samples(self.superclocks_per_bar(), sample_rate)
    }

    pub fn samples_per_grid(&self, sample_rate: u32) -> i64 {
        superclock_to_samples(self.superclocks_per_grid(), sample_rate)
    }

    pub fn superclock_at(&self, quarters: Beats) -> Superclock {
        self.tempo.superclock_at(quarters)
    }

    pub fn quarters_at(&self, sc: Superclock) -> Beats {
        self.tempo.quarters_at(sc)
    }

    pub fn quarters_at_bbt(&self, bbt: BbtTime) -> Beats {
        self.meter.quarters_at(bbt)
    }

    pub fn bbt_at_beats(&self, quarters: Beats) -> BbtTime {
        self.meter.bbt_at(quarters)
    }

    pub fn bbt_at(&self, sc: Superclock) -> BbtTime {
        self.bbt_at_beats(self.quarters_at(sc))
    }

    pub fn superclock_at_bbt(&self, bbt: BbtTime) -> Superclock {
        self.superclock_at(self.quarters_at_bbt(bbt))
    }

    pub fn bbt_add(&self, bbt: BbtTime, offset: BbtOffset) -> BbtTime {
        self.meter().bbt_add(bbt, offset)
    }

    pub fn bbt_subtract(&self, bbt: BbtTime, offset: BbtOffset) -> BbtTime {
        self.meter().bbt_subtract(bbt, offset)
    }

    pub fn round_to_bar(&self, bbt: BbtTime) -> BbtTime {
        self.meter().round_to_bar(bbt)
    }

    pub fn round_up_to_bar(&self, bbt: BbtTime) -> BbtTime {
        self.meter().round_up_to_bar(bbt)
    }

    pub fn round_down_to_bar(&self, bbt: BbtTime) -> BbtTime {
        self.meter().round_down_to_bar(bbt)
    }

    pub fn round_up_to_beat(&self, bbt: BbtTime) -> BbtTime {
        self.meter().round_up_to_beat(bbt)
    }

    pub fn to_quarters(&self, offset: BbtOffset) -> Beats {
        self.meter().to_quarters(offset)
    }
}

#[cfg(test)]
mod test {
    use crate::bbt::BbtTime;
    use crate::beats::Beats;
    use crate::superclock::DEFAULT_SUPERCLOCK_TICKS_PER_SECOND;
    use crate::tempo::point::{MeterPoint, Point, TempoPoint};
    use crate::tempo::types::{Meter, Tempo};

    use super::TempoMetric;

    fn metric(bpm: f64, note_type: i32, meter: Meter) -> TempoMetric {
        TempoMetric::new(
            TempoPoint::new(Tempo::new(bpm, note_type), Point::default()),
            MeterPoint::new(meter, Point::default()),
        )
    }

    #[test]
    fn test_grid_and_bar_lengths() {
        let common = metric(120.0, 4, Meter::new(4, 4));
        assert_eq!(DEFAULT_SUPERCLOCK_TICKS_PER_SECOND / 2, common.superclocks_per_grid());
        assert_eq!(DEFAULT_SUPERCLOCK_TICKS_PER_SECOND * 2, common.superclocks_per_bar());
        assert_eq!(96_000, common.samples_per_bar(48_000));

        // 6/8 at 120 quarters per minute: an eighth is a quarter second, a bar 1.5 seconds.
        let compound = metric(120.0, 4, Meter::new(6, 8));
        assert_eq!(DEFAULT_SUPERCLOCK_TICKS_PER_SECOND / 4, compound.superclocks_per_grid());
        assert_eq!(
            DEFAULT_SUPERCLOCK_TICKS_PER_SECOND * 3 / 2,
            compound.superclocks_per_bar()
        );
    }

    #[test]
    fn test_conversions() {
        let m = metric(120.0, 4, Meter::new(4, 4));
        let two_bars = DEFAULT_SUPERCLOCK_TICKS_PER_SECOND * 4;
        assert_eq!(BbtTime::new(3, 1, 0), m.bbt_at(two_bars));
        assert_eq!(two_bars, m.superclock_at_bbt(BbtTime::new(3, 1, 0)));
        assert_eq!(Beats::from_beats(8), m.quarters_at(two_bars));
        assert_eq!(Beats::new(5, 960), m.quarters_at_bbt(BbtTime::new(2, 2, 960)));
    }
}
