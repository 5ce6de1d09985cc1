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

//! Timeline positions and durations.
//!
//! A [`Timepos`] lives in exactly one time domain: audio time (superclock ticks) or beat
//! time (quarter-note ticks). Converting to the other domain consults the calling
//! thread's tempo map. A [`Timecnt`] is a distance plus the position it is measured from,
//! since the length of a musical duration in audio time depends on where it starts.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::beats::Beats;
use crate::int62::{AtomicInt62, Int62};
use crate::superclock::{
    most_recent_engine_sample_rate, samples_to_superclock, superclock_to_samples, Superclock,
};
use crate::tempo::TempoMap;

/// The clock a position or duration is measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeDomain {
    AudioTime,
    BeatTime,
}

/// A position on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timepos {
    v: Int62,
}

impl Timepos {
    pub fn zero(domain: TimeDomain) -> Timepos {
        Timepos {
            v: Int62::new(domain == TimeDomain::BeatTime, 0),
        }
    }

    /// The latest representable position in the domain.
    pub fn max(domain: TimeDomain) -> Timepos {
        Timepos {
            v: Int62::new(domain == TimeDomain::BeatTime, Int62::MAX),
        }
    }

    pub fn from_superclock(sc: Superclock) -> Timepos {
        Timepos {
            v: Int62::new(false, sc),
        }
    }

    pub fn from_samples(samples: i64, sample_rate: u32) -> Timepos {
        Timepos::from_superclock(samples_to_superclock(samples, sample_rate))
    }

    pub fn from_beats(beats: Beats) -> Timepos {
        Timepos::from_ticks(beats.to_ticks())
    }

    pub fn from_ticks(ticks: i64) -> Timepos {
        Timepos {
            v: Int62::new(true, ticks),
        }
    }

    pub fn time_domain(&self) -> TimeDomain {
        if self.v.flagged() {
            TimeDomain::BeatTime
        } else {
            TimeDomain::AudioTime
        }
    }

    pub fn is_beats(&self) -> bool {
        self.v.flagged()
    }

    pub fn is_superclock(&self) -> bool {
        !self.v.flagged()
    }

    /// The raw value in this position's own domain.
    pub fn val(&self) -> i64 {
        self.v.val()
    }

    /// The superclock value, if the position is in audio time.
    pub fn as_superclock(&self) -> Option<Superclock> {
        self.is_superclock().then(|| self.v.val())
    }

    /// The musical value, if the position is in beat time.
    pub fn as_beats(&self) -> Option<Beats> {
        self.is_beats().then(|| Beats::from_ticks(self.v.val()))
    }

    /// The position in superclock ticks, converting through the thread's tempo map if needed.
    pub fn superclocks(&self) -> Superclock {
        match self.as_beats() {
            Some(beats) => TempoMap::use_map().superclock_at_beats(beats),
            None => self.v.val(),
        }
    }

    /// The musical position, converting through the thread's tempo map if needed.
    pub fn beats(&self) -> Beats {
        match self.as_superclock() {
            Some(sc) => TempoMap::use_map().quarters_at_superclock(sc),
            None => Beats::from_ticks(self.v.val()),
        }
    }

    pub fn ticks(&self) -> i64 {
        self.beats().to_ticks()
    }

    /// The sample position at the engine sample rate.
    pub fn samples(&self) -> i64 {
        self.samples_at(most_recent_engine_sample_rate())
    }

    pub fn samples_at(&self, sample_rate: u32) -> i64 {
        superclock_to_samples(self.superclocks(), sample_rate)
    }

    /// The same instant expressed in the given domain.
    pub fn in_domain(&self, domain: TimeDomain) -> Timepos {
        if domain == self.time_domain() {
            return *self;
        }
        match domain {
            TimeDomain::AudioTime => Timepos::from_superclock(self.superclocks()),
            TimeDomain::BeatTime => Timepos::from_beats(self.beats()),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.v.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.v.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.v.val() > 0
    }

    /// The distance from this position to another, measured in this position's domain and
    /// anchored here.
    pub fn distance(&self, other: &Timepos) -> Timecnt {
        let other = other.in_domain(self.time_domain());
        Timecnt {
            distance: self.v.with_val(other.val() - self.val()),
            position: *self,
        }
    }

    /// The position a duration later than this one.
    pub fn later(&self, duration: &Timecnt) -> Timepos {
        let duration = duration.with_position(*self);
        match self.time_domain() {
            TimeDomain::AudioTime => {
                Timepos::from_superclock(self.val().saturating_add(duration.superclocks()))
            }
            TimeDomain::BeatTime => Timepos::from_beats(
                Beats::from_ticks(self.val()) + duration.beats(),
            ),
        }
    }

    /// The position a duration earlier than this one. A musical duration is measured
    /// backwards from here, so it covers the bars and beats that end at this position.
    pub fn earlier(&self, duration: &Timecnt) -> Timepos {
        match (self.time_domain(), duration.time_domain()) {
            (TimeDomain::AudioTime, TimeDomain::AudioTime)
            | (TimeDomain::BeatTime, TimeDomain::BeatTime) => Timepos {
                v: self.v - duration.magnitude(),
            },
            (TimeDomain::AudioTime, TimeDomain::BeatTime) => {
                let map = TempoMap::use_map();
                let start = map.quarters_at_superclock(self.val())
                    - Beats::from_ticks(duration.magnitude());
                Timepos::from_superclock(map.superclock_at_beats(start))
            }
            (TimeDomain::BeatTime, TimeDomain::AudioTime) => {
                let map = TempoMap::use_map();
                let start = map.superclock_at_beats(Beats::from_ticks(self.val()))
                    - duration.magnitude();
                Timepos::from_beats(map.quarters_at_superclock(start))
            }
        }
    }
}

/// Positions in different domains are ordered by converting the other one into this
/// position's domain.
impl PartialOrd for Timepos {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        let other = other.in_domain(self.time_domain());
        Some(self.val().cmp(&other.val()))
    }
}

impl Add<Timecnt> for Timepos {
    type Output = Timepos;

    fn add(self, rhs: Timecnt) -> Timepos {
        self.later(&rhs)
    }
}

impl Sub<Timecnt> for Timepos {
    type Output = Timepos;

    fn sub(self, rhs: Timecnt) -> Timepos {
        self.earlier(&rhs)
    }
}

impl fmt::Display for Timepos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time_domain() {
            TimeDomain::AudioTime => write!(f, "a{}", self.val()),
            TimeDomain::BeatTime => write!(f, "b{}", self.val()),
        }
    }
}

/// A timeline position shared between threads, such as a playhead one thread advances
/// while others read it. The domain and value are stored in one word and never tear.
#[derive(Debug)]
pub struct AtomicTimepos {
    v: AtomicInt62,
}

impl AtomicTimepos {
    pub fn new(pos: Timepos) -> AtomicTimepos {
        AtomicTimepos {
            v: AtomicInt62::new(pos.v),
        }
    }

    pub fn load(&self) -> Timepos {
        Timepos { v: self.v.load() }
    }

    pub fn store(&self, pos: Timepos) {
        self.v.store(pos.v);
    }

    /// Stores the position, returning the previous one.
    pub fn swap(&self, pos: Timepos) -> Timepos {
        Timepos {
            v: self.v.swap(pos.v),
        }
    }

    /// Stores `new` only if the position is still `current`.
    pub fn compare_exchange(&self, current: Timepos, new: Timepos) -> Result<Timepos, Timepos> {
        self.v
            .compare_exchange(current.v, new.v)
            .map(|v| Timepos { v })
            .map_err(|v| Timepos { v })
    }

    /// Moves the position by `distance` superclock or beat ticks, whichever domain it is
    /// in, returning the new position.
    pub fn advance(&self, distance: i64) -> Timepos {
        Timepos {
            v: self.v.add_assign(distance),
        }
    }
}

/// A duration anchored at the position it is measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timecnt {
    distance: Int62,
    position: Timepos,
}

impl Timecnt {
    pub fn zero(domain: TimeDomain) -> Timecnt {
        Timecnt {
            distance: Int62::new(domain == TimeDomain::BeatTime, 0),
            position: Timepos::zero(domain),
        }
    }

    pub fn from_superclock(sc: Superclock, position: Timepos) -> Timecnt {
        Timecnt {
            distance: Int62::new(false, sc),
            position,
        }
    }

    pub fn from_samples(samples: i64, sample_rate: u32, position: Timepos) -> Timecnt {
        Timecnt::from_superclock(samples_to_superclock(samples, sample_rate), position)
    }

    pub fn from_beats(beats: Beats, position: Timepos) -> Timecnt {
        Timecnt::from_ticks(beats.to_ticks(), position)
    }

    pub fn from_ticks(ticks: i64, position: Timepos) -> Timecnt {
        Timecnt {
            distance: Int62::new(true, ticks),
            position,
        }
    }

    pub fn time_domain(&self) -> TimeDomain {
        if self.distance.flagged() {
            TimeDomain::BeatTime
        } else {
            TimeDomain::AudioTime
        }
    }

    pub fn is_beats(&self) -> bool {
        self.distance.flagged()
    }

    /// The raw distance in this duration's own domain.
    pub fn magnitude(&self) -> i64 {
        self.distance.val()
    }

    pub fn as_superclock(&self) -> Option<Superclock> {
        (!self.is_beats()).then(|| self.distance.val())
    }

    pub fn as_beats(&self) -> Option<Beats> {
        self.is_beats()
            .then(|| Beats::from_ticks(self.distance.val()))
    }

    pub fn position(&self) -> Timepos {
        self.position
    }

    /// The same distance measured from a different position.
    pub fn with_position(&self, position: Timepos) -> Timecnt {
        Timecnt {
            distance: self.distance,
            position,
        }
    }

    /// The position at the end of the duration.
    pub fn end(&self) -> Timepos {
        self.position.later(self)
    }

    /// The length in superclock ticks, converting through the thread's tempo map if needed.
    pub fn superclocks(&self) -> Superclock {
        match self.as_superclock() {
            Some(sc) => sc,
            None => TempoMap::use_map()
                .full_duration_at(self.position, *self, TimeDomain::AudioTime)
                .magnitude(),
        }
    }

    /// The musical length, converting through the thread's tempo map if needed.
    pub fn beats(&self) -> Beats {
        match self.as_beats() {
            Some(beats) => beats,
            None => Beats::from_ticks(
                TempoMap::use_map()
                    .full_duration_at(self.position, *self, TimeDomain::BeatTime)
                    .magnitude(),
            ),
        }
    }

    pub fn ticks(&self) -> i64 {
        self.beats().to_ticks()
    }

    pub fn samples(&self) -> i64 {
        superclock_to_samples(self.superclocks(), most_recent_engine_sample_rate())
    }

    /// The same duration expressed in the given domain.
    pub fn in_domain(&self, domain: TimeDomain) -> Timecnt {
        if domain == self.time_domain() {
            return *self;
        }
        match domain {
            TimeDomain::AudioTime => Timecnt::from_superclock(self.superclocks(), self.position),
            TimeDomain::BeatTime => Timecnt::from_beats(self.beats(), self.position),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.distance.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.distance.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.distance.val() > 0
    }

    pub fn abs(&self) -> Timecnt {
        Timecnt {
            distance: self.distance.abs(),
            position: self.position,
        }
    }

    /// Scales the distance by `num / den`, keeping the position.
    pub fn scale(&self, num: i64, den: i64) -> Timecnt {
        Timecnt {
            distance: self
                .distance
                .with_val(crate::util::muldiv_round(self.distance.val(), num, den)),
            position: self.position,
        }
    }
}

impl Neg for Timecnt {
    type Output = Timecnt;

    fn neg(self) -> Timecnt {
        Timecnt {
            distance: -self.distance,
            position: self.position,
        }
    }
}

/// Sums are expressed in the left-hand duration's domain and keep its position.
impl Add for Timecnt {
    type Output = Timecnt;

    fn add(self, rhs: Timecnt) -> Timecnt {
        let rhs = rhs.in_domain(self.time_domain());
        Timecnt {
            distance: self.distance + rhs.magnitude(),
            position: self.position,
        }
    }
}

impl Sub for Timecnt {
    type Output = Timecnt;

    fn sub(self, rhs: Timecnt) -> Timecnt {
        self + -rhs
    }
}

impl fmt::Display for Timecnt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.time_domain() {
            TimeDomain::AudioTime => write!(f, "a{}@{}", self.magnitude(), self.position),
            TimeDomain::BeatTime => write!(f, "b{}@{}", self.magnitude(), self.position),
        }
    }
}
