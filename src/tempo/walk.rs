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
//! Distances that depend on where they are measured from.

use crate::bbt::{BbtOffset, BbtTime};
use crate::beats::Beats;
use crate::superclock::Superclock;
use crate::timeline::{TimeDomain, Timecnt, Timepos};

use super::map::TempoMap;

impl TempoMap {
    /// Walks a BBT offset from `bbt`, one bar and then one beat at a time, so that every
    /// meter change crossed along the way is honored.
    pub fn bbt_walk(&self, bbt: BbtTime, offset: BbtOffset) -> BbtTime {
        let mut current = bbt;

        let bar = BbtOffset::new(offset.bars.signum(), 0, 0);
        for _ in 0..offset.bars.unsigned_abs() {
            current = self.metric_at_bbt(current).bbt_add(current, bar);
        }

        let beat = BbtOffset::new(0, offset.beats.signum(), 0);
        for _ in 0..offset.beats.unsigned_abs() {
            current = self.metric_at_bbt(current).bbt_add(current, beat);
        }

        if offset.ticks != 0 {
            let ticks = BbtOffset::new(0, 0, offset.ticks);
            current = self.metric_at_bbt(current).bbt_add(current, ticks);
        }
        current
    }

    /// The musical distance covered by walking `offset` from `start`.
    pub fn bbtwalk_to_quarters(&self, start: Beats, offset: BbtOffset) -> Beats {
        let end = self.bbt_walk(self.bbt_at_beats(start), offset);
        self.quarters_at_bbt(end) - start
    }

    /// The musical distance covered by `distance` superclock ticks from `start`.
    pub fn scwalk_to_quarters(&self, start: Beats, distance: Superclock) -> Beats {
        let sc = self.superclock_at_beats(start);
        self.quarters_at_superclock(sc + distance) - start
    }

    /// The musical distance between `start` and `start + distance`.
    pub fn superclock_delta_as_quarters(&self, start: Superclock, distance: Superclock) -> Beats {
        self.quarters_at_superclock(start + distance) - self.quarters_at_superclock(start)
    }

    /// The position reached by moving `distance` quarters from `start`.
    pub fn superclock_plus_quarters_as_superclock(
        &self,
        start: Superclock,
        distance: Beats,
    ) -> Superclock {
        self.superclock_at_beats(self.quarters_at_superclock(start) + distance)
    }

    /// The superclock length of `distance` quarters measured from `start`.
    pub fn superclock_quarters_delta_as_superclock(
        &self,
        start: Superclock,
        distance: Beats,
    ) -> Superclock {
        self.superclock_plus_quarters_as_superclock(start, distance) - start
    }

    pub fn superclock_plus_bbt(&self, start: Superclock, offset: BbtOffset) -> Superclock {
        let end = self.bbt_walk(self.bbt_at_superclock(start), offset);
        self.superclock_at_bbt(end)
    }

    /// The length of a BBT offset from `pos`, in the time domain of `pos`.
    pub fn bbt_duration_at(&self, pos: Timepos, offset: BbtOffset) -> Timecnt {
        match pos.as_beats() {
            Some(quarters) => Timecnt::from_beats(self.bbtwalk_to_quarters(quarters, offset), pos),
            None => {
                let start = pos.val();
                Timecnt::from_superclock(self.superclock_plus_bbt(start, offset) - start, pos)
            }
        }
    }

    /// `duration` measured from `pos`, expressed in `domain`.
    pub fn full_duration_at(&self, pos: Timepos, duration: Timecnt, domain: TimeDomain) -> Timecnt {
        if duration.time_domain() == domain {
            return duration.with_position(pos);
        }

        match (domain, duration.as_beats()) {
            (TimeDomain::AudioTime, Some(quarters)) => {
                let start = self.superclock_at(pos);
                let end = self.superclock_at_beats(self.quarters_at(pos) + quarters);
                Timecnt::from_superclock(end - start, pos)
            }
            _ => {
                let start = self.superclock_at(pos);
                let quarters = self.superclock_delta_as_quarters(start, duration.magnitude());
                Timecnt::from_beats(quarters, pos)
            }
        }
    }
}
