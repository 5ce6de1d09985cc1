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
use std::io;

use tracing::{debug, trace, warn};

use crate::bbt::BbtTime;
use crate::beats::Beats;
use crate::superclock::{most_recent_engine_sample_rate, superclock_to_samples, Superclock};
use crate::timeline::{Timecnt, Timepos};
use crate::util::{muldiv_round, superclock_minutes_seconds};

use super::error::EditError;
use super::metric::TempoMetric;
use super::point::{
    MapPoint, MeterPoint, MusicTimePoint, Point, PointKind, Positioned, TempoPoint,
};
use super::types::{Meter, Tempo};

/// The tempo map: every tempo change, meter change and BBT reset on the timeline, each
/// positioned in superclock, quarter note and BBT time at once.
///
/// The first tempo and the first meter always sit at the origin and can be replaced but
/// never moved or removed. Every edit either succeeds completely or leaves the map as it was.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    pub(crate) tempos: Vec<TempoPoint>,
    pub(crate) meters: Vec<MeterPoint>,
    pub(crate) bartimes: Vec<MusicTimePoint>,
    pub(crate) points: Vec<MapPoint>,
    pub(crate) sample_rate: u32,
}

/// A reference to one explicit point, used while re-deriving positions.
#[derive(Debug, Clone, Copy)]
enum Entry {
    Meter(usize),
    MusicTime(usize),
    Tempo(usize),
}

impl Entry {
    /// Processing order for points sharing a position.
    fn rank(&self) -> u8 {
        match self {
            Entry::Meter(_) => 0,
            Entry::MusicTime(_) => 1,
            Entry::Tempo(_) => 2,
        }
    }
}

/// A point lifted out of the map so it can be placed again somewhere else.
#[derive(Debug, Clone, Copy)]
enum Lifted {
    Meter(Meter),
    MusicTime(BbtTime),
    Tempo(Tempo),
}

impl Lifted {
    fn rank(&self) -> u8 {
        match self {
            Lifted::Meter(_) => 0,
            Lifted::MusicTime(_) => 1,
            Lifted::Tempo(_) => 2,
        }
    }
}

impl Default for TempoMap {
    fn default() -> Self {
        TempoMap::new(
            Tempo::new(120.0, 4),
            Meter::new(4, 4),
            most_recent_engine_sample_rate(),
        )
    }
}

impl TempoMap {
    /// Creates a map holding a single tempo and meter at the origin.
    ///
    /// # Panics
    ///
    /// Panics if either the tempo or the meter is not valid. Values read from settings or
    /// from saved maps are checked before they get here.
    pub fn new(tempo: Tempo, meter: Meter, sample_rate: u32) -> TempoMap {
        assert!(tempo.is_valid(), "invalid initial tempo {}", tempo);
        assert!(meter.is_valid(), "invalid initial meter {}", meter);
        let mut map = TempoMap {
            tempos: vec![TempoPoint::new(tempo, Point::default())],
            meters: vec![MeterPoint::new(meter, Point::default())],
            bartimes: Vec::new(),
            points: Vec::new(),
            sample_rate,
        };
        map.rebuild_points();
        map
    }

    pub(crate) fn from_parts(
        tempos: Vec<TempoPoint>,
        meters: Vec<MeterPoint>,
        bartimes: Vec<MusicTimePoint>,
        sample_rate: u32,
    ) -> TempoMap {
        let mut map = TempoMap {
            tempos,
            meters,
            bartimes,
            points: Vec::new(),
            sample_rate,
        };
        map.rebuild_points();
        map
    }

    pub fn tempos(&self) -> &[TempoPoint] {
        &self.tempos
    }

    pub fn meters(&self) -> &[MeterPoint] {
        &self.meters
    }

    pub fn bartimes(&self) -> &[MusicTimePoint] {
        &self.bartimes
    }

    /// Every explicit point, ordered by position. A tempo and meter change at the same
    /// position share one entry.
    pub fn points(&self) -> &[MapPoint] {
        &self.points
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn n_tempos(&self) -> usize {
        self.tempos.len()
    }

    pub fn n_meters(&self) -> usize {
        self.meters.len()
    }

    pub fn first_tempo(&self) -> &TempoPoint {
        match self.tempos.first() {
            Some(tempo) => tempo,
            None => panic!("tempo map has no initial tempo"),
        }
    }

    pub fn first_meter(&self) -> &MeterPoint {
        match self.meters.first() {
            Some(meter) => meter,
            None => panic!("tempo map has no initial meter"),
        }
    }

    /// Whether the point is at the origin, where the initial tempo and meter live.
    pub fn is_initial(&self, point: &impl Positioned) -> bool {
        point.sclock() == 0
    }

    pub fn can_remove_tempo(&self, tp: &TempoPoint) -> bool {
        !self.is_initial(tp) && self.tempo_index(tp).is_some()
    }

    pub fn can_remove_meter(&self, mp: &MeterPoint) -> bool {
        !self.is_initial(mp) && self.meter_index(mp).is_some()
    }

    pub fn next_tempo(&self, tp: &TempoPoint) -> Option<&TempoPoint> {
        self.tempos.iter().find(|t| t.sclock() > tp.sclock())
    }

    pub fn previous_tempo(&self, tp: &TempoPoint) -> Option<&TempoPoint> {
        self.tempos.iter().rev().find(|t| t.sclock() < tp.sclock())
    }

    fn tempo_index(&self, tp: &TempoPoint) -> Option<usize> {
        self.tempos.iter().position(|t| t.sclock() == tp.sclock())
    }

    fn meter_index(&self, mp: &MeterPoint) -> Option<usize> {
        self.meters.iter().position(|m| m.sclock() == mp.sclock())
    }

    fn bartime_index(&self, mtp: &MusicTimePoint) -> Option<usize> {
        self.bartimes.iter().position(|m| m.sclock() == mtp.sclock())
    }

    pub fn metric_at(&self, pos: Timepos) -> TempoMetric {
        match pos.as_beats() {
            Some(quarters) => self.metric_at_beats(quarters),
            None => self.metric_at_superclock(pos.val()),
        }
    }

    pub fn metric_at_superclock(&self, sc: Superclock) -> TempoMetric {
        self.metric_at_superclock_with(sc, true)
    }

    pub fn metric_at_beats(&self, quarters: Beats) -> TempoMetric {
        self.metric_at_beats_with(quarters, true)
    }

    pub fn metric_at_bbt(&self, bbt: BbtTime) -> TempoMetric {
        self.metric_at_bbt_with(bbt, true)
    }

    /// The metric governing `sc`. A point exactly at `sc` is included only when `can_match`
    /// is set, or when `sc` is the origin.
    pub fn metric_at_superclock_with(&self, sc: Superclock, can_match: bool) -> TempoMetric {
        self.metric_where(|p| p.sclock < sc || ((can_match || sc == 0) && p.sclock == sc))
    }

    pub fn metric_at_beats_with(&self, quarters: Beats, can_match: bool) -> TempoMetric {
        let origin = quarters.is_zero();
        self.metric_where(|p| {
            p.quarters < quarters || ((can_match || origin) && p.quarters == quarters)
        })
    }

    pub fn metric_at_bbt_with(&self, bbt: BbtTime, can_match: bool) -> TempoMetric {
        let origin = bbt == BbtTime::default();
        self.metric_where(|p| p.bbt < bbt || ((can_match || origin) && p.bbt == bbt))
    }

    fn metric_where(&self, governs: impl Fn(&Point) -> bool) -> TempoMetric {
        let tempo = last_governing(&self.tempos, &governs).unwrap_or_else(|| self.first_tempo());
        let meter = last_governing(&self.meters, &governs).unwrap_or_else(|| self.first_meter());

        // A BBT reset after the meter becomes the anchor for counting bars.
        let anchor = match last_governing(&self.bartimes, &governs) {
            Some(mtp) if mtp.sclock() >= meter.sclock() => {
                MeterPoint::new(*meter.meter(), *mtp.point())
            }
            _ => *meter,
        };

        TempoMetric::new(*tempo, anchor)
    }

    pub fn tempo_at(&self, pos: Timepos) -> Tempo {
        *self.metric_at(pos).tempo()
    }

    pub fn meter_at(&self, pos: Timepos) -> Meter {
        *self.metric_at(pos).meter()
    }

    pub fn superclock_at(&self, pos: Timepos) -> Superclock {
        match pos.as_beats() {
            Some(quarters) => self.superclock_at_beats(quarters),
            None => pos.val(),
        }
    }

    pub fn superclock_at_beats(&self, quarters: Beats) -> Superclock {
        self.metric_at_beats(quarters).superclock_at(quarters)
    }

    pub fn superclock_at_bbt(&self, bbt: BbtTime) -> Superclock {
        self.metric_at_bbt(bbt).superclock_at_bbt(bbt)
    }

    pub fn quarters_at(&self, pos: Timepos) -> Beats {
        match pos.as_superclock() {
            Some(sc) => self.quarters_at_superclock(sc),
            None => Beats::from_ticks(pos.val()),
        }
    }

    pub fn quarters_at_superclock(&self, sc: Superclock) -> Beats {
        self.metric_at_superclock(sc).quarters_at(sc)
    }

    pub fn quarters_at_bbt(&self, bbt: BbtTime) -> Beats {
        self.metric_at_bbt(bbt).quarters_at_bbt(bbt)
    }

    pub fn bbt_at(&self, pos: Timepos) -> BbtTime {
        match pos.as_beats() {
            Some(quarters) => self.bbt_at_beats(quarters),
            None => self.bbt_at_superclock(pos.val()),
        }
    }

    pub fn bbt_at_superclock(&self, sc: Superclock) -> BbtTime {
        self.metric_at_superclock(sc).bbt_at(sc)
    }

    pub fn bbt_at_beats(&self, quarters: Beats) -> BbtTime {
        self.metric_at_beats(quarters).bbt_at_beats(quarters)
    }

    pub fn sample_at(&self, pos: Timepos) -> i64 {
        superclock_to_samples(self.superclock_at(pos), self.sample_rate)
    }

    /// Adds a tempo change at `pos`, rounded up to the next beat. A tempo already at that
    /// position is replaced.
    pub fn set_tempo(&mut self, tempo: Tempo, pos: Timepos) -> Result<TempoPoint, EditError> {
        if !tempo.is_valid() {
            return Err(EditError::InvalidTempo);
        }
        let quarters = self.quarters_at(pos).round_up_to_beat();
        let tp = self.transact(|map| map.place_tempo(tempo, quarters))?;
        debug!(
            sclock = tp.sclock(),
            quarters = %tp.beats(),
            bbt = %tp.bbt(),
            tempo = %tempo,
            "Set tempo"
        );
        Ok(tp)
    }

    pub fn set_tempo_at_bbt(
        &mut self,
        tempo: Tempo,
        bbt: BbtTime,
    ) -> Result<TempoPoint, EditError> {
        if !tempo.is_valid() {
            return Err(EditError::InvalidTempo);
        }
        let metric = self.metric_at_bbt_with(bbt, false);
        let quarters = metric.quarters_at_bbt(bbt).round_up_to_beat();
        let tp = self.transact(|map| map.place_tempo(tempo, quarters))?;
        debug!(sclock = tp.sclock(), bbt = %tp.bbt(), tempo = %tempo, "Set tempo");
        Ok(tp)
    }

    /// Replaces the tempo of an existing point, keeping its position.
    pub fn change_tempo(&mut self, tp: &TempoPoint, tempo: Tempo) -> bool {
        let result = self.transact(|map| {
            if !tempo.is_valid() {
                return Err(EditError::InvalidTempo);
            }
            let index = map.tempo_index(tp).ok_or(EditError::NotFound)?;
            map.tempos[index].set_tempo(tempo);
            map.reset_starting_at(map.tempos[index].sclock())
        });
        report("change tempo", result)
    }

    pub fn remove_tempo(&mut self, tp: &TempoPoint) -> bool {
        let result = self.transact(|map| {
            if map.is_initial(tp) {
                return Err(EditError::InitialPoint);
            }
            let index = map.tempo_index(tp).ok_or(EditError::NotFound)?;
            let removed = map.tempos.remove(index);
            map.reset_starting_at(removed.sclock())
        });
        if result.is_ok() {
            debug!(sclock = tp.sclock(), "Removed tempo");
        }
        report("remove tempo", result)
    }

    /// Moves a tempo change to the beat nearest `destination`.
    pub fn move_tempo(&mut self, tp: &TempoPoint, destination: Timepos) -> bool {
        let result = self.transact(|map| {
            if map.tempos.len() < 2 || map.is_initial(tp) {
                return Err(EditError::InitialPoint);
            }
            let index = map.tempo_index(tp).ok_or(EditError::NotFound)?;
            let old = map.tempos.remove(index);
            map.reset_starting_at(old.sclock())?;

            let quarters = map.quarters_at(destination).round_to_beat();
            if quarters == old.beats() {
                return Err(EditError::Unchanged);
            }
            if quarters <= Beats::ZERO {
                return Err(EditError::Collision(0));
            }
            if let Some(existing) = map.tempos.iter().find(|t| t.beats() == quarters) {
                return Err(EditError::Collision(existing.sclock()));
            }

            let metric = map.metric_at_beats_with(quarters, false);
            let point = Point::new(
                metric.superclock_at(quarters),
                quarters,
                metric.bbt_at_beats(quarters),
            );
            map.insert_tempo_point(TempoPoint::new(*old.tempo(), point));
            map.reset_starting_at(point.sclock.min(old.sclock()))
        });
        if result.is_ok() {
            debug!(from = tp.sclock(), to = %destination, "Moved tempo");
        }
        report("move tempo", result)
    }

    /// Turns the ramp toward the following tempo on or off.
    pub fn set_ramped(&mut self, tp: &TempoPoint, ramped: bool) -> bool {
        let result = self.transact(|map| {
            let index = map.tempo_index(tp).ok_or(EditError::NotFound)?;
            if ramped {
                let next = map.tempos.get(index + 1).ok_or(EditError::NoRampTarget)?;
                let note_type = map.tempos[index].tempo().note_type();
                let end = next.tempo().superclocks_per_note_type_as(note_type);
                if end == map.tempos[index].tempo().superclocks_per_note_type() {
                    return Err(EditError::NoRampTarget);
                }
                map.tempos[index].tempo_mut().set_end_superclocks_per_note_type(end);
            } else {
                map.tempos[index].tempo_mut().clear_ramp();
            }
            map.reset_starting_at(map.tempos[index].sclock())
        });
        report("set ramped", result)
    }

    /// Makes a tempo start from the end rate of the tempo before it.
    pub fn set_continuing(&mut self, tp: &TempoPoint, continuing: bool) -> bool {
        let result = self.transact(|map| {
            let index = map.tempo_index(tp).ok_or(EditError::NotFound)?;
            if index == 0 && continuing {
                return Err(EditError::InitialPoint);
            }
            map.tempos[index].tempo_mut().set_continuing(continuing);
            map.reset_starting_at(map.tempos[index].sclock())
        });
        report("set continuing", result)
    }

    /// Adds a meter change at the bar containing `pos`, or the next bar if `pos` is not on a
    /// bar line. A meter already at that bar is replaced.
    pub fn set_meter(&mut self, meter: Meter, pos: Timepos) -> Result<MeterPoint, EditError> {
        let bbt = self.bbt_at(pos);
        self.set_meter_at_bbt(meter, bbt)
    }

    pub fn set_meter_at_bbt(
        &mut self,
        meter: Meter,
        bbt: BbtTime,
    ) -> Result<MeterPoint, EditError> {
        if !meter.is_valid() {
            return Err(EditError::InvalidMeter(meter));
        }
        let mp = self.transact(|map| map.place_meter(meter, bbt))?;
        debug!(
            sclock = mp.sclock(),
            quarters = %mp.beats(),
            bbt = %mp.bbt(),
            meter = %meter,
            "Set meter"
        );
        Ok(mp)
    }

    pub fn remove_meter(&mut self, mp: &MeterPoint) -> bool {
        let result = self.transact(|map| {
            if map.is_initial(mp) {
                return Err(EditError::InitialPoint);
            }
            let index = map.meter_index(mp).ok_or(EditError::NotFound)?;
            let removed = map.meters.remove(index);
            map.reset_starting_at(removed.sclock())
        });
        if result.is_ok() {
            debug!(sclock = mp.sclock(), "Removed meter");
        }
        report("remove meter", result)
    }

    /// Moves a meter change to a bar line near `destination`: the following bar when moving
    /// later, the preceding bar when moving earlier.
    pub fn move_meter(&mut self, mp: &MeterPoint, destination: Timepos) -> bool {
        let result = self.transact(|map| {
            if map.meters.len() < 2 || map.is_initial(mp) {
                return Err(EditError::InitialPoint);
            }
            let index = map.meter_index(mp).ok_or(EditError::NotFound)?;
            let old = map.meters.remove(index);
            map.reset_starting_at(old.sclock())?;

            let target = map.quarters_at(destination);
            let metric = map.metric_at_beats_with(target, false);
            let bbt = metric.bbt_at_beats(target);
            let bbt = if target > old.beats() {
                metric.round_up_to_bar(bbt)
            } else {
                metric.round_down_to_bar(bbt)
            };

            let quarters = metric.quarters_at_bbt(bbt);
            if quarters == old.beats() {
                return Err(EditError::Unchanged);
            }
            if quarters <= Beats::ZERO {
                return Err(EditError::Collision(0));
            }
            if let Some(existing) = map.meters.iter().find(|m| m.beats() == quarters) {
                return Err(EditError::Collision(existing.sclock()));
            }

            let point = Point::new(metric.superclock_at(quarters), quarters, bbt);
            map.insert_meter_point(MeterPoint::new(*old.meter(), point));
            map.reset_starting_at(point.sclock.min(old.sclock()))
        });
        if result.is_ok() {
            debug!(from = mp.sclock(), to = %destination, "Moved meter");
        }
        report("move meter", result)
    }

    /// Restarts BBT counting at `bbt` from the beat at or after `pos`.
    pub fn set_bartime(&mut self, bbt: BbtTime, pos: Timepos) -> Result<MusicTimePoint, EditError> {
        let quarters = self.quarters_at(pos).round_up_to_beat();
        let mtp = self.transact(|map| map.place_bartime(bbt, quarters))?;
        debug!(sclock = mtp.sclock(), quarters = %mtp.beats(), bbt = %bbt, "Set BBT reset");
        Ok(mtp)
    }

    pub fn remove_bartime(&mut self, mtp: &MusicTimePoint) -> bool {
        let result = self.transact(|map| {
            let index = map.bartime_index(mtp).ok_or(EditError::NotFound)?;
            let removed = map.bartimes.remove(index);
            map.reset_starting_at(removed.sclock())
        });
        report("remove BBT reset", result)
    }

    /// Opens a gap of `duration` at `pos`, pushing every later point back by that amount.
    pub fn insert_time(&mut self, pos: Timepos, duration: Timecnt) -> Result<(), EditError> {
        if duration.is_negative() {
            return Err(EditError::InvalidDuration);
        }
        if duration.is_zero() {
            return Ok(());
        }
        let start = self.superclock_at(pos);
        debug!(start, duration = %duration, "Inserting time");

        self.transact(|map| {
            map.shift_points(start, start, |p| match duration.as_beats() {
                Some(quarters) => Timepos::from_beats(p.quarters + quarters),
                None => Timepos::from_superclock(p.sclock + duration.magnitude()),
            })
        })
    }

    /// Cuts `duration` out of the timeline at `pos`. Points inside the cut are dropped and
    /// every later point moves earlier by that amount.
    pub fn remove_time(&mut self, pos: Timepos, duration: Timecnt) -> Result<(), EditError> {
        if duration.is_negative() {
            return Err(EditError::InvalidDuration);
        }
        if duration.is_zero() {
            return Ok(());
        }
        let start = self.superclock_at(pos);
        let end = match duration.as_beats() {
            Some(quarters) => self.superclock_at_beats(self.quarters_at(pos) + quarters),
            None => start + duration.magnitude(),
        };
        debug!(start, end, "Removing time");

        self.transact(|map| {
            map.shift_points(start, end, |p| match duration.as_beats() {
                Some(quarters) => Timepos::from_beats(p.quarters - quarters),
                None => Timepos::from_superclock(p.sclock - duration.magnitude()),
            })
        })
    }

    /// Rescales every position and tempo period for a new engine sample rate.
    ///
    /// Periods are scaled along with positions so musical positions keep their place and
    /// the map stays consistent. Because the superclock rate itself does not change, a
    /// tempo's `note_types_per_minute` afterwards reads as the old rate scaled by old/new:
    /// a 120 per minute tempo reads 60 after going from 48k to 96k.
    pub fn sample_rate_changed(&mut self, sample_rate: u32) {
        if sample_rate == 0 || sample_rate == self.sample_rate {
            return;
        }
        let (num, den) = (sample_rate as i64, self.sample_rate as i64);
        debug!(from = self.sample_rate, to = sample_rate, "Rescaling tempo map");

        let scale = |p: &Point| Point::new(muldiv_round(p.sclock, num, den), p.quarters, p.bbt);
        for tp in &mut self.tempos {
            let point = scale(tp.point());
            tp.set_point(point);
            tp.tempo_mut().rescale(num, den);
        }
        for mp in &mut self.meters {
            let point = scale(mp.point());
            mp.set_point(point);
        }
        for mtp in &mut self.bartimes {
            let point = scale(mtp.point());
            mtp.set_point(point);
        }
        self.sample_rate = sample_rate;

        if let Err(e) = self.reset_starting_at(0) {
            warn!(err = %e, "Tempo map out of order after sample rate change");
        }
    }

    /// Writes a human readable listing of every point.
    pub fn dump(&self, out: &mut impl io::Write) -> io::Result<()> {
        write!(out, "{}", self)
    }

    /// Runs `edit` against a copy of the map, keeping the result only if it succeeds.
    pub(crate) fn transact<T>(
        &mut self,
        edit: impl FnOnce(&mut TempoMap) -> Result<T, EditError>,
    ) -> Result<T, EditError> {
        let mut scratch = self.clone();
        let result = edit(&mut scratch)?;
        *self = scratch;
        Ok(result)
    }

    fn place_tempo(&mut self, tempo: Tempo, quarters: Beats) -> Result<TempoPoint, EditError> {
        if quarters.is_negative() {
            return Err(EditError::BeforeStart(quarters));
        }
        let metric = self.metric_at_beats_with(quarters, false);
        let point = Point::new(
            metric.superclock_at(quarters),
            quarters,
            metric.bbt_at_beats(quarters),
        );
        self.insert_tempo_point(TempoPoint::new(tempo, point));
        self.reset_starting_at(point.sclock)?;

        self.tempos
            .iter()
            .find(|t| t.beats() == quarters)
            .copied()
            .ok_or(EditError::NotFound)
    }

    fn place_meter(&mut self, meter: Meter, bbt: BbtTime) -> Result<MeterPoint, EditError> {
        let metric = self.metric_at_bbt_with(bbt, false);
        let bbt = metric.round_up_to_bar(bbt);
        let quarters = metric.quarters_at_bbt(bbt);
        if quarters.is_negative() {
            return Err(EditError::BeforeStart(quarters));
        }
        let point = Point::new(metric.superclock_at(quarters), quarters, bbt);
        self.insert_meter_point(MeterPoint::new(meter, point));
        self.reset_starting_at(point.sclock)?;

        self.meters
            .iter()
            .find(|m| m.beats() == quarters)
            .copied()
            .ok_or(EditError::NotFound)
    }

    fn place_bartime(
        &mut self,
        bbt: BbtTime,
        quarters: Beats,
    ) -> Result<MusicTimePoint, EditError> {
        if quarters <= Beats::ZERO {
            return Err(EditError::InitialPoint);
        }
        let metric = self.metric_at_beats_with(quarters, false);
        let point = Point::new(metric.superclock_at(quarters), quarters, bbt);
        match self.bartimes.binary_search_by_key(&point.sclock, |m| m.sclock()) {
            Ok(index) => self.bartimes[index].set_point(point),
            Err(index) => self.bartimes.insert(index, MusicTimePoint::new(point)),
        }
        self.reset_starting_at(point.sclock)?;

        self.bartimes
            .iter()
            .find(|m| m.beats() == quarters)
            .copied()
            .ok_or(EditError::NotFound)
    }

    fn insert_tempo_point(&mut self, tp: TempoPoint) {
        match self.tempos.binary_search_by_key(&tp.sclock(), |t| t.sclock()) {
            Ok(index) => self.tempos[index].set_tempo(*tp.tempo()),
            Err(index) => self.tempos.insert(index, tp),
        }
    }

    fn insert_meter_point(&mut self, mp: MeterPoint) {
        match self.meters.binary_search_by_key(&mp.sclock(), |m| m.sclock()) {
            Ok(index) => self.meters[index].set_meter(*mp.meter()),
            Err(index) => self.meters.insert(index, mp),
        }
    }

    /// Lifts every point at or after `start` out of the map and places it again at the
    /// position `target` gives for it. Points before `removed_end` are dropped.
    fn shift_points(
        &mut self,
        start: Superclock,
        removed_end: Superclock,
        target: impl Fn(&Point) -> Timepos,
    ) -> Result<(), EditError> {
        let mut lifted: Vec<(Point, Lifted)> = Vec::new();
        lifted.extend(
            self.tempos
                .iter()
                .skip(1)
                .filter(|t| t.sclock() >= start)
                .map(|t| (*t.point(), Lifted::Tempo(*t.tempo()))),
        );
        lifted.extend(
            self.meters
                .iter()
                .skip(1)
                .filter(|m| m.sclock() >= start)
                .map(|m| (*m.point(), Lifted::Meter(*m.meter()))),
        );
        lifted.extend(
            self.bartimes
                .iter()
                .filter(|m| m.sclock() >= start)
                .map(|m| (*m.point(), Lifted::MusicTime(m.bbt()))),
        );
        lifted.sort_by_key(|(point, item)| (point.sclock, item.rank()));

        let keep = self.tempos.partition_point(|t| t.sclock() < start).max(1);
        self.tempos.truncate(keep);
        let keep = self.meters.partition_point(|m| m.sclock() < start).max(1);
        self.meters.truncate(keep);
        let keep = self.bartimes.partition_point(|m| m.sclock() < start);
        self.bartimes.truncate(keep);
        self.reset_starting_at(start)?;

        for (point, item) in lifted {
            if point.sclock < removed_end {
                trace!(sclock = point.sclock, "Dropping point inside removed time");
                continue;
            }
            let destination = target(&point);
            match item {
                Lifted::Tempo(tempo) => {
                    let quarters = self.quarters_at(destination).round_up_to_beat();
                    self.place_tempo(tempo, quarters)?;
                }
                Lifted::Meter(meter) => {
                    let bbt = self.bbt_at(destination);
                    self.place_meter(meter, bbt)?;
                }
                Lifted::MusicTime(bbt) => {
                    let quarters = self.quarters_at(destination).round_up_to_beat();
                    self.place_bartime(bbt, quarters)?;
                }
            }
        }
        Ok(())
    }

    /// Re-derives the musical position of every point at or after `sc` from its anchor, then
    /// the ramp of every tempo segment, then the superclock position of every point.
    ///
    /// Tempo and meter changes keep their BBT position. BBT resets keep their musical
    /// position. Superclock positions are always derived last, so a point inside a segment
    /// whose ramp changed moves even when it lies before `sc`.
    pub(crate) fn reset_starting_at(&mut self, sc: Superclock) -> Result<(), EditError> {
        trace!(
            sc,
            tempos = self.tempos.len(),
            meters = self.meters.len(),
            bartimes = self.bartimes.len(),
            "Resetting tempo map"
        );

        self.reset_musical_positions(sc);

        for i in 1..self.tempos.len() {
            let quarters = self.tempos[i].beats();
            self.finish_segment(i, quarters);
        }
        if let Some(last) = self.tempos.last_mut() {
            last.compute_omega(0, Beats::ZERO);
        }

        self.reset_superclocks();
        self.check_order()?;
        self.rebuild_points();
        Ok(())
    }

    /// Moves every point at or after `sc` to the quarter note position its anchor gives it.
    fn reset_musical_positions(&mut self, sc: Superclock) {
        let mut meter_index = 0;
        let mut anchor = *self.first_meter();

        for entry in self.entry_order() {
            match entry {
                // The origin never moves.
                Entry::Meter(0) | Entry::Tempo(0) => {}
                Entry::Meter(i) => {
                    let point = *self.meters[i].point();
                    if point.sclock >= sc {
                        let quarters = anchor.quarters_at(point.bbt);
                        self.meters[i].set_point(Point::new(point.sclock, quarters, point.bbt));
                    }
                    meter_index = i;
                    anchor = self.meters[i];
                }
                Entry::MusicTime(i) => {
                    anchor = MeterPoint::new(
                        *self.meters[meter_index].meter(),
                        *self.bartimes[i].point(),
                    );
                }
                Entry::Tempo(i) => {
                    let point = *self.tempos[i].point();
                    if point.sclock >= sc {
                        let quarters = anchor.quarters_at(point.bbt);
                        self.tempos[i].set_point(Point::new(point.sclock, quarters, point.bbt));
                    }
                }
            }
        }
    }

    /// Places every point in superclock time through the tempo governing its musical
    /// position. Ramps must already be settled.
    fn reset_superclocks(&mut self) {
        let mut tempo_index = 0;

        for entry in self.entry_order_by(|p| p.quarters) {
            match entry {
                Entry::Meter(0) | Entry::Tempo(0) => {}
                Entry::Meter(i) => {
                    let point = *self.meters[i].point();
                    let sclock = self.tempos[tempo_index].superclock_at(point.quarters);
                    self.meters[i].set_point(Point::new(sclock, point.quarters, point.bbt));
                }
                Entry::MusicTime(i) => {
                    let point = *self.bartimes[i].point();
                    let sclock = self.tempos[tempo_index].superclock_at(point.quarters);
                    self.bartimes[i].set_point(Point::new(sclock, point.quarters, point.bbt));
                }
                Entry::Tempo(i) => {
                    let point = *self.tempos[i].point();
                    let sclock = self.tempos[tempo_index].superclock_at(point.quarters);
                    self.tempos[i].set_point(Point::new(sclock, point.quarters, point.bbt));
                    tempo_index = i;
                }
            }
        }
    }

    /// Settles the ramp of tempo `i - 1` now that tempo `i` is known to start at `quarters`.
    fn finish_segment(&mut self, i: usize, quarters: Beats) {
        let (before, after) = self.tempos.split_at_mut(i);
        let prev = &mut before[i - 1];
        let next = &mut after[0];

        if next.tempo().continuing() {
            let ramped = next.tempo().ramped();
            let start = muldiv_round(
                prev.tempo().end_superclocks_per_note_type(),
                next.tempo().note_type() as i64,
                prev.tempo().note_type() as i64,
            );
            next.tempo_mut().set_superclocks_per_note_type(start);
            if !ramped {
                next.tempo_mut().clear_ramp();
            }
        }

        if prev.tempo().ramped() {
            let end = next.tempo().superclocks_per_note_type_as(prev.tempo().note_type());
            prev.tempo_mut().set_end_superclocks_per_note_type(end);
        }

        let duration = quarters - prev.beats();
        prev.compute_omega(next.tempo().superclocks_per_quarter_note(), duration);
    }

    fn entry_order(&self) -> Vec<Entry> {
        self.entry_order_by(|p| p.sclock)
    }

    fn entry_order_by<K: Ord>(&self, key: impl Fn(&Point) -> K) -> Vec<Entry> {
        let mut order: Vec<(K, u8, Entry)> = Vec::with_capacity(
            self.tempos.len() + self.meters.len() + self.bartimes.len(),
        );
        for (i, m) in self.meters.iter().enumerate() {
            let entry = Entry::Meter(i);
            order.push((key(m.point()), entry.rank(), entry));
        }
        for (i, m) in self.bartimes.iter().enumerate() {
            let entry = Entry::MusicTime(i);
            order.push((key(m.point()), entry.rank(), entry));
        }
        for (i, t) in self.tempos.iter().enumerate() {
            let entry = Entry::Tempo(i);
            order.push((key(t.point()), entry.rank(), entry));
        }
        order.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
        order.into_iter().map(|(_, _, entry)| entry).collect()
    }

    /// Checks that superclock and musical positions increase together.
    fn check_order(&self) -> Result<(), EditError> {
        strictly_increasing(&self.tempos)?;
        strictly_increasing(&self.meters)?;
        strictly_increasing(&self.bartimes)?;

        let mut all: Vec<&Point> = self
            .tempos
            .iter()
            .map(|t| t.point())
            .chain(self.meters.iter().map(|m| m.point()))
            .chain(self.bartimes.iter().map(|m| m.point()))
            .collect();
        all.sort_by_key(|p| p.sclock);

        if let Some(first) = all.iter().find(|p| p.quarters.is_negative()) {
            return Err(EditError::BeforeStart(first.quarters));
        }
        match all.windows(2).find(|pair| pair[1].quarters < pair[0].quarters) {
            Some(pair) => Err(EditError::Ordering(pair[1].sclock)),
            None => Ok(()),
        }
    }

    /// Merges tempos, meters and BBT resets into the ordered point list.
    pub(crate) fn rebuild_points(&mut self) {
        let mut points: Vec<MapPoint> = Vec::with_capacity(
            self.tempos.len() + self.meters.len() + self.bartimes.len(),
        );

        for entry in self.entry_order() {
            let (point, kind) = match entry {
                Entry::Meter(i) => {
                    let mp = &self.meters[i];
                    (*mp.point(), PointKind::Meter(*mp.meter()))
                }
                Entry::MusicTime(i) => (*self.bartimes[i].point(), PointKind::MusicTime),
                Entry::Tempo(i) => {
                    let tp = &self.tempos[i];
                    (*tp.point(), PointKind::Tempo(*tp.tempo()))
                }
            };

            // A tempo landing on a meter shares its entry.
            if let (Some(last), PointKind::Tempo(tempo)) = (points.last_mut(), kind) {
                if let PointKind::Meter(meter) = last.kind {
                    if last.point.sclock == point.sclock {
                        last.kind = PointKind::TempoAndMeter(tempo, meter);
                        continue;
                    }
                }
            }

            points.push(MapPoint {
                point,
                kind,
                metric: self.metric_at_superclock(point.sclock),
            });
        }
        self.points = points;
    }
}

fn last_governing<'a, P: Positioned>(
    points: &'a [P],
    governs: &impl Fn(&Point) -> bool,
) -> Option<&'a P> {
    points.iter().take_while(|p| governs(p.point())).last()
}

fn strictly_increasing<P: Positioned>(points: &[P]) -> Result<(), EditError> {
    match points
        .windows(2)
        .find(|pair| pair[1].sclock() <= pair[0].sclock() || pair[1].beats() <= pair[0].beats())
    {
        Some(pair) => Err(EditError::Ordering(pair[1].sclock())),
        None => Ok(()),
    }
}

fn report(operation: &str, result: Result<(), EditError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(operation, err = %e, "Rejected tempo map edit");
            false
        }
    }
}

impl fmt::Display for TempoMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Tempo map: {} tempos, {} meters, {} BBT resets at {} Hz",
            self.tempos.len(),
            self.meters.len(),
            self.bartimes.len(),
            self.sample_rate
        )?;
        for point in &self.points {
            let what = match point.kind() {
                PointKind::Tempo(tempo) => format!("tempo {}", tempo),
                PointKind::Meter(meter) => format!("meter {}", meter),
                PointKind::TempoAndMeter(tempo, meter) => {
                    format!("tempo {} meter {}", tempo, meter)
                }
                PointKind::MusicTime => "bbt reset".to_string(),
            };
            writeln!(
                f,
                "  {:>10} {:>8} {:>12}  {}  {}",
                superclock_minutes_seconds(point.sclock()),
                point.beats().to_string(),
                point.bbt().to_string(),
                what,
                point.sclock()
            )?;
        }
        Ok(())
    }
}
