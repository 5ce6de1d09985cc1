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

//! A signed 62-bit integer packed with a one-bit flag into a single machine word.
//!
//! The flag lives in bit 62 and the value occupies bits 0-61 in two's complement. Packing
//! both into one word lets [`AtomicInt62`] update flag and value together with a single
//! compare-and-swap.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};
use std::sync::atomic::{self, AtomicI64};

use crate::error::TemporalError;

const FLAG_BIT: i64 = 1 << 62;
const VALUE_MASK: i64 = FLAG_BIT - 1;

/// A flagged 62-bit value. Values outside the 62-bit range are clamped to its ends.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Int62 {
    raw: i64,
}

impl Int62 {
    pub const MAX: i64 = (1 << 61) - 1;
    pub const MIN: i64 = -(1 << 61);

    pub fn new(flagged: bool, val: i64) -> Int62 {
        let val = val.clamp(Self::MIN, Self::MAX);
        let flag = if flagged { FLAG_BIT } else { 0 };
        Int62 {
            raw: (val & VALUE_MASK) | flag,
        }
    }

    pub fn flagged(&self) -> bool {
        self.raw & FLAG_BIT != 0
    }

    /// The sign-extended value.
    pub fn val(&self) -> i64 {
        ((self.raw & VALUE_MASK) << 2) >> 2
    }

    /// A value carrying the same flag.
    pub fn with_val(&self, val: i64) -> Int62 {
        Int62::new(self.flagged(), val)
    }

    pub fn is_zero(&self) -> bool {
        self.val() == 0
    }

    pub fn is_negative(&self) -> bool {
        self.val() < 0
    }

    pub fn abs(&self) -> Int62 {
        self.with_val(self.val().abs())
    }

    /// Orders two values, failing if their flags differ.
    pub fn try_cmp(&self, other: &Int62) -> Result<Ordering, TemporalError> {
        if self.flagged() != other.flagged() {
            return Err(TemporalError::DomainMismatch);
        }
        Ok(self.val().cmp(&other.val()))
    }
}

/// Values with different flags are unordered.
impl PartialOrd for Int62 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.try_cmp(other).ok()
    }
}

impl fmt::Debug for Int62 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Int62")
            .field("flagged", &self.flagged())
            .field("val", &self.val())
            .finish()
    }
}

impl Add<i64> for Int62 {
    type Output = Int62;

    fn add(self, rhs: i64) -> Int62 {
        self.with_val(self.val().saturating_add(rhs))
    }
}

impl Sub<i64> for Int62 {
    type Output = Int62;

    fn sub(self, rhs: i64) -> Int62 {
        self.with_val(self.val().saturating_sub(rhs))
    }
}

impl Mul<i64> for Int62 {
    type Output = Int62;

    fn mul(self, rhs: i64) -> Int62 {
        self.with_val(self.val().saturating_mul(rhs))
    }
}

impl Div<i64> for Int62 {
    type Output = Int62;

    fn div(self, rhs: i64) -> Int62 {
        self.with_val(self.val() / rhs)
    }
}

impl Neg for Int62 {
    type Output = Int62;

    fn neg(self) -> Int62 {
        self.with_val(-self.val())
    }
}

/// An [`Int62`] that can be shared between threads. Every read-modify-write is a
/// compare-and-swap loop over the packed word, so the flag and value never tear.
pub struct AtomicInt62 {
    raw: AtomicI64,
}

impl AtomicInt62 {
    pub fn new(initial: Int62) -> AtomicInt62 {
        AtomicInt62 {
            raw: AtomicI64::new(initial.raw),
        }
    }

    pub fn load(&self) -> Int62 {
        Int62 {
            raw: self.raw.load(atomic::Ordering::Acquire),
        }
    }

    pub fn store(&self, value: Int62) {
        self.raw.store(value.raw, atomic::Ordering::Release);
    }

    /// Stores the value, returning the previous one.
    pub fn swap(&self, value: Int62) -> Int62 {
        Int62 {
            raw: self.raw.swap(value.raw, atomic::Ordering::AcqRel),
        }
    }

    /// Stores `new` if the current value is `current`. Returns the previous value in
    /// either case.
    pub fn compare_exchange(&self, current: Int62, new: Int62) -> Result<Int62, Int62> {
        self.raw
            .compare_exchange(
                current.raw,
                new.raw,
                atomic::Ordering::AcqRel,
                atomic::Ordering::Acquire,
            )
            .map(|raw| Int62 { raw })
            .map_err(|raw| Int62 { raw })
    }

    /// Adds to the value, returning the updated value.
    pub fn add_assign(&self, rhs: i64) -> Int62 {
        self.update(|v| v + rhs)
    }

    /// Subtracts from the value, returning the updated value.
    pub fn sub_assign(&self, rhs: i64) -> Int62 {
        self.update(|v| v - rhs)
    }

    /// Multiplies the value, returning the updated value.
    pub fn mul_assign(&self, rhs: i64) -> Int62 {
        self.update(|v| v * rhs)
    }

    /// Divides the value, returning the updated value.
    pub fn div_assign(&self, rhs: i64) -> Int62 {
        self.update(|v| v / rhs)
    }

    /// Changes the flag, keeping the value.
    pub fn set_flag(&self, flagged: bool) -> Int62 {
        self.update(|v| Int62::new(flagged, v.val()))
    }

    fn update(&self, f: impl Fn(Int62) -> Int62) -> Int62 {
        let mut current = self.raw.load(atomic::Ordering::Acquire);
        loop {
            let next = f(Int62 { raw: current });
            match self.raw.compare_exchange_weak(
                current,
                next.raw,
                atomic::Ordering::AcqRel,
                atomic::Ordering::Acquire,
            ) {
                Ok(_) => return next,
                Err(actual) => current = actual,
            }
        }
    }
}

impl fmt::Debug for AtomicInt62 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.load().fmt(f)
    }
}
