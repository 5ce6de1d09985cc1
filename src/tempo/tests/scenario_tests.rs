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
use crate::bbt::BbtTime;
use crate::beats::Beats;
use crate::tempo::{Meter, Positioned, Tempo, TempoMap};
use crate::timeline::Timepos;

use super::{assert_consistent, at_beat, common_time, QUARTER_AT_120};

#[test]
fn test_origin_is_first_bar() {
    let map = common_time();
    assert_eq!(BbtTime::new(1, 1, 0), map.bbt_at_superclock(0));
    assert_eq!(Beats::ZERO, map.quarters_at_superclock(0));
    assert_eq!(1, map.points().len());
    assert!(map.points()[0].kind().is_tempo());
    assert!(map.points()[0].kind().is_meter());
}

#[test]
fn test_tempo_change_doubles_speed() {
    let mut map = common_time();
    let tp = map.set_tempo(Tempo::new(240.0, 4), at_beat(8)).unwrap();

    let eight = 8 * QUARTER_AT_120;
    assert_eq!(eight, tp.sclock());
    assert_eq!(eight, map.superclock_at_beats(Beats::from_beats(8)));
    assert_eq!(
        eight + 8 * (QUARTER_AT_120 / 2),
        map.superclock_at_beats(Beats::from_beats(16))
    );
    assert_eq!(BbtTime::new(3, 1, 0), tp.bbt());
    assert_consistent(&map);
}

#[test]
fn test_meter_change_lands_on_following_bar() {
    let mut map = common_time();

    // Beat 10 is 3|3|0, so the change waits for bar 4.
    let mp = map.set_meter(Meter::new(3, 4), at_beat(10)).unwrap();
    assert_eq!(BbtTime::new(4, 1, 0), mp.bbt());
    assert_eq!(Beats::from_beats(12), mp.beats());
    assert_eq!(12 * QUARTER_AT_120, mp.sclock());

    assert_eq!(BbtTime::new(5, 1, 0), map.bbt_at_beats(Beats::from_beats(15)));
    assert_eq!(BbtTime::new(3, 3, 0), map.bbt_at_beats(Beats::from_beats(10)));
    assert_consistent(&map);
}

#[test]
fn test_grid_every_fourth_bar() {
    let mut map = common_time();
    map.set_tempo_at_bbt(Tempo::new(140.0, 4), BbtTime::new(3, 1, 0))
        .unwrap();
    map.set_meter_at_bbt(Meter::new(3, 4), BbtTime::new(5, 1, 0))
        .unwrap();

    let end = map.superclock_at_bbt(BbtTime::new(20, 1, 0));
    let grid = map.get_grid(0, end, 4);

    let bars: Vec<i32> = grid.iter().map(|g| g.bbt().bars).collect();
    assert_eq!(vec![1, 5, 9, 13, 17], bars);
    assert!(grid.iter().all(|g| g.is_bar()));

    // Bar 9 is 12 quarters into the 3/4 section, all at 140.
    assert_eq!(Beats::from_beats(28), grid[2].beats());
    assert_eq!(8 * QUARTER_AT_120 + 20 * 217_728_000, grid[2].sclock());
    assert!(grid[1].is_explicit_meter());
}

#[test]
fn test_saved_map_loads_identically() {
    let mut map = common_time();
    let tp = map.set_tempo(Tempo::new(90.0, 4), at_beat(8)).unwrap();
    map.set_tempo(Tempo::new(150.0, 8), at_beat(24)).unwrap();
    assert!(map.set_ramped(&tp, true));
    map.set_meter_at_bbt(Meter::new(7, 8), BbtTime::new(4, 1, 0))
        .unwrap();
    map.set_bartime(BbtTime::new(1, 1, 0), at_beat(40)).unwrap();
    map.set_tempo(Tempo::new(60.0, 4), at_beat(44)).unwrap();
    assert_consistent(&map);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tempo-map.yaml");
    map.save(&path).unwrap();
    let loaded = TempoMap::load(&path).unwrap();

    assert_eq!(map, loaded);
    for q in [0, 5, 9, 17, 30, 41, 50] {
        let pos = Timepos::from_beats(Beats::new(q, 333));
        assert_eq!(map.superclock_at(pos), loaded.superclock_at(pos));
        assert_eq!(map.bbt_at(pos), loaded.bbt_at(pos));
    }
}
