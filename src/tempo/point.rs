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
use crate::superclock::{superclock_to_samples, Superclock, MAX_SUPERCLOCK};
use crate::util::muldiv_round;

use super::metric::TempoMetric;
use super::types::{Meter, Tempo};

/// A single instant expressed in all three time domains at once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Point {
    pub(crate) sclock: Superclock,
    pub(crate) quarters: Beats,
    pub(crate) bbt: BbtTime,
}

impl Point {
    pub fn new(sclock: Superclock, quarters: Beats, bbt: BbtTime) -> Point {
        Point {
            sclock,
            quarters,
            bbt,
        }
    }
}

/// Anything pinned to a [`Point`] on the timeline.
pub trait Positioned {
    fn point(&self) -> &Point;

    fn sclock(&self) -> Superclock {
        self.point().sclock
    }

    fn beats(&self) -> Beats {
        self.point().quarters
    }

    fn bbt(&self) -> BbtTime {
        self.point().bbt
    }

    fn sample(&self, sample_rate: u32) -> i64 {
        superclock_to_samples(self.sclock(), sample_rate)
    }
}

impl Positioned for Point {
    fn point(&self) -> &Point {
        self
    }
}

/// A tempo change pinned to the timeline.
///
/// Ramped tempos carry `omega`, the decay constant of the note period across the segment up
/// to the next tempo. It is derived by the map whenever the segment changes and is zero for
/// constant tempos and for a ramp with nothing to ramp toward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoPoint {
    tempo: Tempo,
    point: Point,
    omega: f64,
}

impl TempoPoint {
    pub fn new(tempo: Tempo, point: Point) -> TempoPoint {
        TempoPoint {
            tempo,
            point,
            omega: 0.0,
        }
    }

    pub(crate) fn with_omega(tempo: Tempo, point: Point, omega: f64) -> TempoPoint {
        TempoPoint {
            tempo,
            point,
            omega,
        }
    }

    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }

    pub(crate) fn tempo_mut(&mut self) -> &mut Tempo {
        &mut self.tempo
    }

    pub(crate) fn set_tempo(&mut self, tempo: Tempo) {
        self.tempo = tempo;
        self.omega = 0.0;
    }

    pub(crate) fn set_point(&mut self, point: Point) {
        self.point = point;
    }

    pub fn omega(&self) -> f64 {
        self.omega
    }

    /// Whether positions inside this tempo's segment follow the exponential ramp.
    pub fn actually_ramped(&self) -> bool {
        self.omega != 0.0
    }

    /// Derives the ramp constant for a segment that ends at a tempo with the given
    /// superclocks per quarter note, `quarter_duration` after this point.
    pub(crate) fn compute_omega(
        &mut self,
        end_superclocks_per_quarter: Superclock,
        quarter_duration: Beats,
    ) {
        let start = self.tempo.superclocks_per_quarter_note();

        self.omega = if !self.tempo.ramped()
            || end_superclocks_per_quarter == start
            || quarter_duration <= Beats::ZERO
        {
            0.0
        } else {
            ((1.0 / end_superclocks_per_quarter as f64) - (1.0 / start as f64))
                / quarter_duration.to_double()
        };
    }

    /// The superclock position of a musical position inside this tempo's segment.
    pub fn superclock_at(&self, quarters: Beats) -> Superclock {
        let delta = quarters - self.point.quarters;
        let per_quarter = self.tempo.superclocks_per_quarter_note();

        if !self.actually_ramped() {
            return self.point.sclock.saturating_add(muldiv_round(
                per_quarter,
                delta.to_ticks(),
                Beats::PPQN as i64,
            ));
        }

        let x = per_quarter as f64 * self.omega * delta.to_double();
        if x <= -1.0 {
            // A slowing ramp that never reaches this position.
            return MAX_SUPERCLOCK;
        }

        let offset = (x.ln_1p() / self.omega).round();
        if !offset.is_finite() || offset >= MAX_SUPERCLOCK as f64 {
            return MAX_SUPERCLOCK;
        }
        self.point.sclock.saturating_add(offset as Superclock)
    }

    /// The musical position of a superclock position inside this tempo's segment.
    ///
    /// Positions at or past [`MAX_SUPERCLOCK`], or whose inverse ramp leaves the range of
    /// [`Beats`], map to [`Beats::MAX`].
    pub fn quarters_at(&self, sc: Superclock) -> Beats {
        if sc >= MAX_SUPERCLOCK {
            return Beats::MAX;
        }

        let delta = sc - self.point.sclock;
        let per_quarter = self.tempo.superclocks_per_quarter_note();

        if !self.actually_ramped() {
            return self.point.quarters
                + Beats::from_ticks(muldiv_round(delta, Beats::PPQN as i64, per_quarter));
        }

        let quarters =
            (self.omega * delta as f64).exp_m1() / (per_quarter as f64 * self.omega);
        let ticks = quarters * Beats::PPQN as f64;

        if !ticks.is_finite() || ticks >= Beats::MAX.to_ticks() as f64 {
            return Beats::MAX;
        }
        self.point.quarters + Beats::from_ticks(ticks.round() as i64)
    }

    /// The length of one note type at the given position inside this tempo's segment.
    pub fn superclocks_per_note_type_at(&self, sc: Superclock) -> Superclock {
        if !self.actually_ramped() {
            return self.tempo.superclocks_per_note_type();
        }

        let delta = (sc - self.point.sclock) as f64;
        (self.tempo.superclocks_per_note_type() as f64 * (-self.omega * delta).exp()).round()
            as Superclock
    }
}

impl Positioned for TempoPoint {
    fn point(&self) -> &Point {
        &self.point
    }
}

/// A meter change pinned to the timeline. Also serves as the BBT anchor for conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MeterPoint {
    meter: Meter,
    point: Point,
}

impl MeterPoint {
    pub fn new(meter: Meter, point: Point) -> MeterPoint {
        MeterPoint { meter, point }
    }

    pub fn meter(&self) -> &Meter {
        &self.meter
    }

    pub(crate) fn set_meter(&mut self, meter: Meter) {
        self.meter = meter;
    }

    pub(crate) fn set_point(&mut self, point: Point) {
        self.point = point;
    }

    /// The musical position of a BBT position counted from this point.
    pub fn quarters_at(&self, bbt: BbtTime) -> Beats {
        self.point.quarters + self.meter.quarters_between(self.point.bbt, bbt)
    }

    /// The BBT position of a musical position counted from this point.
    pub fn bbt_at(&self, quarters: Beats) -> BbtTime {
        self.meter
            .bbt_add_ticks(self.point.bbt, (quarters - self.point.quarters).to_ticks())
    }
}

impl Positioned for MeterPoint {
    fn point(&self) -> &Point {
        &self.point
    }
}

/// A point where BBT counting restarts at an arbitrary bar, such as a pickup or a
/// rehearsal mark renumbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MusicTimePoint {
    point: Point,
}

impl MusicTimePoint {
    pub fn new(point: Point) -> MusicTimePoint {
        MusicTimePoint { point }
    }

    pub(crate) fn set_point(&mut self, point: Point) {
        self.point = point;
    }
}

impl Positioned for MusicTimePoint {
    fn point(&self) -> &Point {
        &self.point
    }
}

/// What an explicit point in the merged map sequence changes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointKind {
    Tempo(Tempo),
    Meter(Meter),
    TempoAndMeter(Tempo, Meter),
    MusicTime,
}

impl PointKind {
    pub fn is_tempo(&self) -> bool {
        matches!(self, PointKind::Tempo(_) | PointKind::TempoAndMeter(..))
    }

    pub fn is_meter(&self) -> bool {
        matches!(self, PointKind::Meter(_) | PointKind::TempoAndMeter(..))
    }

    pub fn is_music_time(&self) -> bool {
        matches!(self, PointKind::MusicTime)
    }
}

/// An entry of the merged, ordered point sequence. Carries the metric in effect from this
/// point on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapPoint {
    pub(crate) point: Point,
    pub(crate) kind: PointKind,
    pub(crate) metric: TempoMetric,
}

impl MapPoint {
    pub fn kind(&self) -> &PointKind {
        &self.kind
    }

    pub fn metric(&self) -> &TempoMetric {
        &self.metric
    }
}

impl Positioned for MapPoint {
    fn point(&self) -> &Point {
        &self.point
    }
}

/// A grid line produced by [`super::TempoMap::get_grid`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridPoint {
    pub(crate) point: Point,
    pub(crate) metric: TempoMetric,
}

impl GridPoint {
    pub fn metric(&self) -> &TempoMetric {
        &self.metric
    }

    /// Whether a tempo change sits on this grid line.
    pub fn is_explicit_tempo(&self) -> bool {
        self.metric.tempo_point().sclock() == self.point.sclock
    }

    /// Whether a meter change or BBT reset sits on this grid line.
    pub fn is_explicit_meter(&self) -> bool {
        self.metric.meter_point().sclock() == self.point.sclock
    }

    pub fn is_bar(&self) -> bool {
        self.point.bbt.is_bar()
    }
}

impl Positioned for GridPoint {
    fn point(&self) -> &Point {
        &self.point
    }
}
