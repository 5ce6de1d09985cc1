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
use crate::tempo::{EditError, Meter, Positioned, Tempo, TempoMap};
use crate::timeline::{Timecnt, Timepos};

use super::{assert_consistent, at_beat, common_time, QUARTER_AT_120};

/// 240 from beat 8, 3/4 from bar 5.
fn two_changes() -> TempoMap {
    let mut map = common_time();
    map.set_tempo(Tempo::new(240.0, 4), at_beat(8)).unwrap();
    map.set_meter_at_bbt(Meter::new(3, 4), BbtTime::new(5, 1, 0))
        .unwrap();
    map
}

#[test]
#[should_panic(expected = "invalid initial meter")]
fn test_new_map_needs_valid_meter() {
    TempoMap::new(Tempo::new(120.0, 4), Meter::new(0, 4), 48_000);
}

#[test]
#[should_panic(expected = "invalid initial tempo")]
fn test_new_map_needs_valid_tempo() {
    TempoMap::new(Tempo::new(0.0, 4), Meter::new(4, 4), 48_000);
}

#[test]
fn test_set_tempo_rounds_up_to_beat() {
    let mut map = common_time();
    let tp = map
        .set_tempo(Tempo::new(100.0, 4), Timepos::from_beats(Beats::new(5, 100)))
        .unwrap();
    assert_eq!(Beats::from_beats(6), tp.beats());
    assert_eq!(BbtTime::new(2, 3, 0), tp.bbt());

    // Audio positions round the same way.
    let sc = map.superclock_at_beats(Beats::new(9, 500));
    let tp = map
        .set_tempo(Tempo::new(80.0, 4), Timepos::from_superclock(sc))
        .unwrap();
    assert_eq!(Beats::from_beats(10), tp.beats());
    assert_consistent(&map);
}

#[test]
fn test_set_tempo_replaces_existing() {
    let mut map = common_time();
    map.set_tempo(Tempo::new(240.0, 4), at_beat(8)).unwrap();
    map.set_tempo(Tempo::new(90.0, 4), at_beat(8)).unwrap();
    assert_eq!(2, map.n_tempos());
    assert_eq!(Tempo::new(90.0, 4), *map.tempos()[1].tempo());

    map.set_tempo(Tempo::new(100.0, 4), at_beat(0)).unwrap();
    assert_eq!(2, map.n_tempos());
    assert_eq!(Tempo::new(100.0, 4), *map.first_tempo().tempo());
    assert_eq!(8 * (QUARTER_AT_120 * 120 / 100), map.tempos()[1].sclock());
    assert_consistent(&map);
}

#[test]
fn test_invalid_edits_are_rejected() {
    let mut map = two_changes();
    let before = map.clone();

    assert_eq!(
        Err(EditError::InvalidTempo),
        map.set_tempo(Tempo::new(0.0, 4), at_beat(4))
    );
    assert_eq!(
        Err(EditError::InvalidTempo),
        map.set_tempo(Tempo::new(-30.0, 4), at_beat(4))
    );
    assert_eq!(
        Err(EditError::InvalidTempo),
        map.set_tempo(Tempo::new(120.0, 0), at_beat(4))
    );
    assert_eq!(
        Err(EditError::InvalidMeter(Meter::new(0, 4))),
        map.set_meter(Meter::new(0, 4), at_beat(4))
    );
    assert_eq!(
        Err(EditError::InvalidMeter(Meter::new(4, 7))),
        map.set_meter(Meter::new(4, 7), at_beat(4))
    );
    assert_eq!(
        Err(EditError::InitialPoint),
        map.set_bartime(BbtTime::new(1, 1, 0), at_beat(0))
    );
    let tp = map.tempos()[1];
    assert!(!map.change_tempo(&tp, Tempo::new(0.0, 4)));
    assert_eq!(before, map);
}

#[test]
fn test_initial_points_stay() {
    let mut map = two_changes();
    let before = map.clone();
    let first_tempo = *map.first_tempo();
    let first_meter = *map.first_meter();

    assert!(!map.can_remove_tempo(&first_tempo));
    assert!(!map.can_remove_meter(&first_meter));
    assert!(!map.remove_tempo(&first_tempo));
    assert!(!map.remove_meter(&first_meter));
    assert!(!map.move_tempo(&first_tempo, at_beat(4)));
    assert!(!map.move_meter(&first_meter, at_beat(4)));
    assert!(!map.set_continuing(&first_tempo, true));
    assert_eq!(before, map);
}

#[test]
fn test_remove_tempo_shifts_later_points() {
    let mut map = two_changes();
    let tp = map.tempos()[1];
    assert_eq!(8 * QUARTER_AT_120 + 8 * QUARTER_AT_120 / 2, map.meters()[1].sclock());

    assert!(map.can_remove_tempo(&tp));
    assert!(map.remove_tempo(&tp));
    assert_eq!(1, map.n_tempos());
    assert_eq!(16 * QUARTER_AT_120, map.meters()[1].sclock());
    assert_eq!(Beats::from_beats(16), map.meters()[1].beats());

    // A second removal finds nothing.
    let before = map.clone();
    assert!(!map.remove_tempo(&tp));
    assert_eq!(before, map);
    assert_consistent(&map);
}

#[test]
fn test_remove_meter_keeps_tempo_bbt() {
    let mut map = common_time();
    let mp = map
        .set_meter_at_bbt(Meter::new(3, 4), BbtTime::new(5, 1, 0))
        .unwrap();
    let tp = map
        .set_tempo_at_bbt(Tempo::new(60.0, 4), BbtTime::new(7, 1, 0))
        .unwrap();
    assert_eq!(Beats::from_beats(22), tp.beats());

    assert!(map.remove_meter(&mp));
    assert_eq!(1, map.n_meters());
    assert_eq!(BbtTime::new(7, 1, 0), map.tempos()[1].bbt());
    assert_eq!(Beats::from_beats(24), map.tempos()[1].beats());
    assert_eq!(24 * QUARTER_AT_120, map.tempos()[1].sclock());
    assert_consistent(&map);
}

#[test]
fn test_change_tempo() {
    let mut map = two_changes();
    let tp = map.tempos()[1];
    assert!(map.change_tempo(&tp, Tempo::new(60.0, 4)));
    assert_eq!(Tempo::new(60.0, 4), *map.tempos()[1].tempo());
    assert_eq!(8 * QUARTER_AT_120 + 16 * QUARTER_AT_120, map.meters()[1].sclock());
    assert_consistent(&map);
}

#[test]
fn test_move_tempo() {
    let mut map = two_changes();
    map.set_tempo(Tempo::new(90.0, 4), at_beat(12)).unwrap();
    let tp = map.tempos()[1];
    let before = map.clone();

    assert!(!map.move_tempo(&tp, at_beat(8)));
    assert!(!map.move_tempo(&tp, at_beat(12)));
    assert_eq!(before, map);

    assert!(map.move_tempo(&tp, Timepos::from_beats(Beats::new(10, 768))));
    assert_eq!(3, map.n_tempos());
    assert_eq!(Beats::from_beats(10), map.tempos()[1].beats());
    assert_eq!(Tempo::new(240.0, 4), *map.tempos()[1].tempo());
    assert_eq!(10 * QUARTER_AT_120, map.tempos()[1].sclock());
    assert_consistent(&map);
}

#[test]
fn test_move_meter_to_bar() {
    let mut map = two_changes();
    let mp = map.meters()[1];

    assert!(map.move_meter(&mp, at_beat(21)));
    assert_eq!(BbtTime::new(7, 1, 0), map.meters()[1].bbt());
    assert_eq!(Beats::from_beats(24), map.meters()[1].beats());

    let mp = map.meters()[1];
    assert!(map.move_meter(&mp, at_beat(9)));
    assert_eq!(BbtTime::new(3, 1, 0), map.meters()[1].bbt());
    assert_eq!(Beats::from_beats(8), map.meters()[1].beats());
    assert_consistent(&map);

    let before = map.clone();
    let mp = map.meters()[1];
    assert!(!map.move_meter(&mp, at_beat(8)));
    assert_eq!(before, map);
}

#[test]
fn test_ramp_on_and_off() {
    let mut map = two_changes();
    let last = map.tempos()[1];
    assert!(!map.set_ramped(&last, true));

    let first = *map.first_tempo();
    assert!(map.set_ramped(&first, true));
    assert!(map.first_tempo().actually_ramped());
    assert!(map.tempos()[1].sclock() < 8 * QUARTER_AT_120);
    assert_consistent(&map);

    assert!(map.set_ramped(&first, false));
    assert!(!map.first_tempo().actually_ramped());
    assert_eq!(8 * QUARTER_AT_120, map.tempos()[1].sclock());
}

#[test]
fn test_ramp_follows_later_tempo_change() {
    let mut map = two_changes();
    let first = *map.first_tempo();
    assert!(map.set_ramped(&first, true));

    let tp = map.tempos()[1];
    assert!(map.change_tempo(&tp, Tempo::new(60.0, 4)));
    assert_eq!(
        map.tempos()[1].tempo().superclocks_per_note_type(),
        map.first_tempo().tempo().end_superclocks_per_note_type()
    );
    assert!(map.first_tempo().omega() < 0.0);
}

#[test]
fn test_ramp_moves_meter_inside_segment() {
    let mut map = common_time();
    map.set_tempo_at_bbt(Tempo::new(60.0, 4), BbtTime::new(3, 1, 0))
        .unwrap();
    map.set_meter_at_bbt(Meter::new(3, 4), BbtTime::new(2, 1, 0))
        .unwrap();
    assert_eq!(4 * QUARTER_AT_120, map.meters()[1].sclock());

    let first = *map.first_tempo();
    assert!(map.set_ramped(&first, true));

    // Slowing toward 60, so bar 2 arrives later than it did at a steady 120.
    let four = Beats::from_beats(4);
    let meter = map.meters()[1];
    assert_eq!(four, meter.beats());
    assert_eq!(map.first_tempo().superclock_at(four), meter.sclock());
    assert_eq!(map.superclock_at_beats(four), meter.sclock());
    assert!(meter.sclock() > 4 * QUARTER_AT_120);
    assert_consistent(&map);

    assert!(map.set_ramped(&first, false));
    assert_eq!(4 * QUARTER_AT_120, map.meters()[1].sclock());
    assert_consistent(&map);
}

#[test]
fn test_ramp_end_change_moves_earlier_meter() {
    let mut map = common_time();
    map.set_tempo_at_bbt(Tempo::new(60.0, 4), BbtTime::new(3, 1, 0))
        .unwrap();
    let first = *map.first_tempo();
    assert!(map.set_ramped(&first, true));

    // The shorter bar 2 pulls the end of the ramp in to beat 7.
    map.set_meter_at_bbt(Meter::new(3, 4), BbtTime::new(2, 1, 0))
        .unwrap();
    assert_eq!(Beats::from_beats(7), map.tempos()[1].beats());
    assert_consistent(&map);

    let before = map.meters()[1].sclock();
    let tp = map.tempos()[1];
    assert!(map.change_tempo(&tp, Tempo::new(240.0, 4)));

    let four = Beats::from_beats(4);
    let meter = map.meters()[1];
    assert_eq!(map.first_tempo().superclock_at(four), meter.sclock());
    assert!(meter.sclock() < before);
    assert!(meter.sclock() < 4 * QUARTER_AT_120);
    assert_consistent(&map);
}

#[test]
fn test_ramp_moves_bartime_inside_segment() {
    let mut map = common_time();
    let mtp = map.set_bartime(BbtTime::new(5, 1, 0), at_beat(4)).unwrap();
    map.set_tempo(Tempo::new(60.0, 4), at_beat(8)).unwrap();
    assert_eq!(4 * QUARTER_AT_120, mtp.sclock());
    assert_eq!(BbtTime::new(6, 1, 0), map.tempos()[1].bbt());

    let first = *map.first_tempo();
    assert!(map.set_ramped(&first, true));
    let ramped = map.bartimes()[0];
    assert!(ramped.sclock() > 4 * QUARTER_AT_120);
    assert_eq!(map.superclock_at_beats(Beats::from_beats(4)), ramped.sclock());
    assert_consistent(&map);

    let tp = map.tempos()[1];
    assert!(map.change_tempo(&tp, Tempo::new(240.0, 4)));
    let sped_up = map.bartimes()[0];
    assert_eq!(Beats::from_beats(4), sped_up.beats());
    assert_eq!(BbtTime::new(5, 1, 0), sped_up.bbt());
    assert!(sped_up.sclock() < 4 * QUARTER_AT_120);
    assert_eq!(map.superclock_at_beats(Beats::from_beats(4)), sped_up.sclock());
    assert_consistent(&map);
}

#[test]
fn test_continuing_tempo() {
    let mut map = common_time();
    let tp = map.set_tempo(Tempo::new(90.0, 4), at_beat(8)).unwrap();
    assert!(map.set_continuing(&tp, true));

    let continued = map.tempos()[1].tempo();
    assert!(continued.continuing());
    assert_eq!(QUARTER_AT_120, continued.superclocks_per_note_type());
    assert_eq!(12 * QUARTER_AT_120, map.superclock_at_beats(Beats::from_beats(12)));
}

#[test]
fn test_insert_beats() {
    let mut map = two_changes();
    let pos = at_beat(4);
    map.insert_time(pos, Timecnt::from_beats(Beats::from_beats(4), pos))
        .unwrap();

    assert_eq!(Beats::from_beats(12), map.tempos()[1].beats());
    assert_eq!(Beats::from_beats(20), map.meters()[1].beats());
    assert_eq!(BbtTime::new(6, 1, 0), map.meters()[1].bbt());
    assert_consistent(&map);
}

#[test]
fn test_insert_audio_time() {
    let mut map = common_time();
    map.set_tempo(Tempo::new(240.0, 4), at_beat(8)).unwrap();
    let pos = at_beat(4);
    map.insert_time(pos, Timecnt::from_superclock(2 * QUARTER_AT_120, pos))
        .unwrap();
    assert_eq!(Beats::from_beats(10), map.tempos()[1].beats());

    assert_eq!(
        Err(EditError::InvalidDuration),
        map.insert_time(pos, Timecnt::from_superclock(-1, pos))
    );
    let before = map.clone();
    map.insert_time(pos, Timecnt::from_superclock(0, pos)).unwrap();
    assert_eq!(before, map);
}

#[test]
fn test_remove_time_drops_points_inside() {
    let mut map = two_changes();
    let pos = at_beat(6);
    map.remove_time(pos, Timecnt::from_beats(Beats::from_beats(4), pos))
        .unwrap();

    assert_eq!(1, map.n_tempos());
    assert_eq!(Beats::from_beats(12), map.meters()[1].beats());
    assert_eq!(BbtTime::new(4, 1, 0), map.meters()[1].bbt());
    assert_consistent(&map);
}

#[test]
fn test_sample_rate_change_rescales() {
    let mut map = two_changes();
    let before = map.clone();
    map.sample_rate_changed(96_000);

    assert_eq!(96_000, map.sample_rate());
    for (old, new) in before.tempos().iter().zip(map.tempos()) {
        assert_eq!(old.sclock() * 2, new.sclock());
        assert_eq!(old.beats(), new.beats());
        assert_eq!(
            old.tempo().superclocks_per_note_type() * 2,
            new.tempo().superclocks_per_note_type()
        );
    }
    assert_eq!(before.meters()[1].sclock() * 2, map.meters()[1].sclock());
    assert_eq!(60.0, map.first_tempo().tempo().note_types_per_minute());
    assert_eq!(
        before.bbt_at_beats(Beats::from_beats(13)),
        map.bbt_at_beats(Beats::from_beats(13))
    );
    assert_consistent(&map);

    let rescaled = map.clone();
    map.sample_rate_changed(96_000);
    assert_eq!(rescaled, map);
}

#[test]
fn test_dump_lists_points() {
    let map = two_changes();
    let mut out = Vec::new();
    map.dump(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    assert!(text.starts_with("Tempo map: 2 tempos, 2 meters, 0 BBT resets at 48000 Hz"));
    assert_eq!(1 + map.points().len(), text.lines().count());
}
