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
use crate::parse::ParseError;
use crate::superclock::DEFAULT_SUPERCLOCK_TICKS_PER_SECOND;
use crate::tempo::state::PointRecord;
use crate::tempo::{Meter, Positioned, StateError, Tempo, TempoMap, STATE_VERSION};

use super::{assert_consistent, at_beat, common_time, QUARTER_AT_120};

fn sample_map() -> TempoMap {
    let mut map = common_time();
    let tp = map.set_tempo(Tempo::new(100.0, 4), at_beat(4)).unwrap();
    map.set_tempo(Tempo::new(160.0, 4), at_beat(12)).unwrap();
    assert!(map.set_ramped(&tp, true));
    map.set_meter_at_bbt(Meter::new(5, 4), BbtTime::new(5, 1, 0))
        .unwrap();
    map.set_bartime(BbtTime::new(10, 1, 0), at_beat(30)).unwrap();
    map
}

#[test]
fn test_state_round_trip() {
    let map = sample_map();
    let state = map.get_state();
    assert_eq!(STATE_VERSION, state.version);
    assert_eq!(DEFAULT_SUPERCLOCK_TICKS_PER_SECOND, state.superclocks_per_second);
    assert_eq!(48_000, state.sample_rate);
    assert_eq!(6, state.points.len());

    let rebuilt = TempoMap::from_state(&state).unwrap();
    assert_eq!(map, rebuilt);
    assert_eq!(state, rebuilt.get_state());
}

#[test]
fn test_yaml_layout() {
    let yaml = common_time().to_yaml().unwrap();
    assert!(yaml.contains("version: 7000"), "{}", yaml);
    assert!(yaml.contains("superclocks-per-second: 508032000"), "{}", yaml);
    assert!(yaml.contains("kind: tempo"), "{}", yaml);
    assert!(yaml.contains("kind: meter"), "{}", yaml);

    assert_eq!(common_time(), TempoMap::from_yaml(&yaml).unwrap());
}

#[test]
fn test_set_state_replaces_map() {
    let mut map = common_time();
    let other = sample_map();
    map.set_state(&other.get_state()).unwrap();
    assert_eq!(other, map);
}

#[test]
fn test_failed_load_leaves_map() {
    let mut map = sample_map();
    let before = map.clone();

    let mut state = map.get_state();
    state.points.retain(|p| !matches!(p, PointRecord::Tempo(_)));
    assert!(matches!(
        map.set_state(&state),
        Err(StateError::MissingInitialTempo)
    ));

    let mut state = before.get_state();
    state.points.retain(|p| match p {
        PointRecord::Meter(record) => record.sclock != 0,
        _ => true,
    });
    assert!(matches!(
        map.set_state(&state),
        Err(StateError::MissingInitialMeter)
    ));

    let mut state = before.get_state();
    state.version = 9000;
    assert!(matches!(
        map.set_state(&state),
        Err(StateError::UnsupportedVersion(9000))
    ));
    assert_eq!(before, map);
}

#[test]
fn test_malformed_documents() {
    assert!(matches!(
        TempoMap::from_yaml("version: 7000\npoints: 3\n"),
        Err(StateError::Yaml(_))
    ));
    assert!(matches!(
        TempoMap::from_yaml("points: []\n"),
        Err(StateError::InvalidRecord(_))
    ));
    assert!(matches!(
        TempoMap::from_yaml("[1, 2"),
        Err(StateError::Yaml(_))
    ));

    let yaml = common_time()
        .to_yaml()
        .unwrap()
        .replace("kind: meter", "kind: key-signature");
    assert!(matches!(TempoMap::from_yaml(&yaml), Err(StateError::Yaml(_))));

    let yaml = common_time()
        .to_yaml()
        .unwrap()
        .replace("divisions-per-bar: 4", "divisions-per-bar: 0");
    assert!(matches!(
        TempoMap::from_yaml(&yaml),
        Err(StateError::InvalidRecord(_))
    ));

    // Bar 0 does not exist.
    let mut state = sample_map().get_state();
    for record in &mut state.points {
        if let PointRecord::Meter(meter) = record {
            if meter.quarters > Beats::ZERO {
                meter.bbt = BbtTime::new(0, 1, 0);
            }
        }
    }
    let yaml = serde_yml::to_string(&state).unwrap();
    assert!(matches!(TempoMap::from_yaml(&yaml), Err(StateError::Yaml(_))));
}

#[test]
fn test_rescales_other_superclock_rate() {
    let map = sample_map();
    let mut state = map.get_state();
    state.superclocks_per_second *= 2;
    for point in &mut state.points {
        match point {
            PointRecord::Tempo(record) => {
                record.sclock *= 2;
                record.scpnt_start *= 2;
                record.scpnt_end *= 2;
            }
            PointRecord::Meter(record) => record.sclock *= 2,
            PointRecord::MusicTime(record) => record.sclock *= 2,
        }
    }

    let rebuilt = TempoMap::from_state(&state).unwrap();
    assert_eq!(map, rebuilt);
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        TempoMap::load(&dir.path().join("missing.yaml")),
        Err(StateError::Io(_))
    ));
}

#[test]
fn test_legacy_sections() {
    let map = TempoMap::from_yaml(
        r#"
version: 3000
sections:
  - kind: Tempo
    start: "1|1|0"
    beats-per-minute: 120.0
    movable: false
  - kind: Meter
    start: "1|1|0"
    beats-per-bar: 4.0
    note-type: 4.0
    movable: false
  - kind: Tempo
    start: "7|1|0"
    beats-per-minute: 60.0
    note-type: 4.0
    movable: true
  - kind: Meter
    start: "5|1|0"
    beats-per-bar: 3.0
    note-type: 4.0
    movable: true
"#,
    )
    .unwrap();

    assert_eq!(2, map.n_tempos());
    assert_eq!(2, map.n_meters());
    assert_eq!(Beats::from_beats(16), map.meters()[1].beats());
    assert_eq!(BbtTime::new(7, 1, 0), map.tempos()[1].bbt());
    assert_eq!(Beats::from_beats(22), map.tempos()[1].beats());
    assert_eq!(22 * QUARTER_AT_120, map.tempos()[1].sclock());
    assert_eq!(Tempo::new(60.0, 4), *map.tempos()[1].tempo());
    assert_consistent(&map);
}

#[test]
fn test_legacy_requires_initial_sections() {
    let result = TempoMap::from_yaml(
        r#"
version: 2000
sections:
  - kind: Tempo
    start: "1|1|0"
    beats-per-minute: 120.0
    movable: false
"#,
    );
    assert!(matches!(result, Err(StateError::MissingInitialMeter)));

    let result = TempoMap::from_yaml(
        r#"
version: 2000
sections:
  - kind: Meter
    start: "1|1|0"
    beats-per-bar: 4.0
    note-type: 4.0
    movable: false
"#,
    );
    assert!(matches!(result, Err(StateError::MissingInitialTempo)));

    let result = TempoMap::from_yaml(
        r#"
version: 2000
sections:
  - kind: Tempo
    start: "one"
    beats-per-minute: 120.0
    movable: false
"#,
    );
    assert!(matches!(result, Err(StateError::Position(_))));

    let result = TempoMap::from_yaml(
        r#"
version: 2000
sections:
  - kind: Tempo
    start: "1|0|0"
    beats-per-minute: 120.0
    movable: false
"#,
    );
    assert!(matches!(
        result,
        Err(StateError::Position(ParseError::NoSuchPosition(_)))
    ));
}
