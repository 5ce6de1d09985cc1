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
use crate::superclock::Superclock;
use crate::timeline::Timepos;

use super::{Meter, Positioned, Tempo, TempoMap};

#[cfg(test)]
mod edit_tests;
#[cfg(test)]
mod scenario_tests;
#[cfg(test)]
mod state_tests;

/// One quarter note at 120 quarters per minute.
const QUARTER_AT_120: Superclock = 254_016_000;

fn common_time() -> TempoMap {
    TempoMap::new(Tempo::new(120.0, 4), Meter::new(4, 4), 48_000)
}

fn at_beat(beat: i32) -> Timepos {
    Timepos::from_beats(Beats::from_beats(beat))
}

/// Checks the ordering guarantees every map must keep after any edit.
fn assert_consistent(map: &TempoMap) {
    for pair in map.tempos().windows(2) {
        assert!(pair[0].sclock() < pair[1].sclock(), "tempos out of order: {}", map);
        assert!(pair[0].beats() < pair[1].beats(), "tempos out of order: {}", map);
    }
    for pair in map.meters().windows(2) {
        assert!(pair[0].sclock() < pair[1].sclock(), "meters out of order: {}", map);
        assert!(pair[0].beats() < pair[1].beats(), "meters out of order: {}", map);
    }
    for pair in map.points().windows(2) {
        assert!(pair[0].sclock() <= pair[1].sclock(), "points out of order: {}", map);
        assert!(pair[0].beats() <= pair[1].beats(), "points out of order: {}", map);
    }
    for point in map.points() {
        assert_eq!(point.sclock(), map.superclock_at_beats(point.beats()));
    }
    assert_eq!(0, map.first_tempo().sclock());
    assert_eq!(0, map.first_meter().sclock());
}
