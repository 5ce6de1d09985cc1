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

//! The superclock: a sample-rate independent, integer audio clock.
//!
//! The default rate of 508 032 000 ticks per second (2^10 * 3^4 * 5^3 * 7^2) divides
//! evenly by every common sample rate, so sample positions convert to superclock
//! values without loss.

use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use tracing::info;

use crate::util::{muldiv_floor, muldiv_round};

/// A position or distance on the superclock.
pub type Superclock = i64;

/// The superclock rate used unless configured otherwise.
pub const DEFAULT_SUPERCLOCK_TICKS_PER_SECOND: Superclock = 508_032_000;

/// The largest superclock value a timeline position can hold.
pub const MAX_SUPERCLOCK: Superclock = (1 << 61) - 1;

/// The engine sample rate assumed until one is configured.
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;

static SUPERCLOCK_TICKS_PER_SECOND: AtomicI64 = AtomicI64::new(DEFAULT_SUPERCLOCK_TICKS_PER_SECOND);
static ENGINE_SAMPLE_RATE: AtomicU32 = AtomicU32::new(DEFAULT_SAMPLE_RATE);

/// Returns the process-wide superclock rate.
pub fn superclock_ticks_per_second() -> Superclock {
    SUPERCLOCK_TICKS_PER_SECOND.load(Ordering::Relaxed)
}

/// Sets the process-wide superclock rate. Must happen at startup, before any map exists.
pub fn set_superclock_ticks_per_second(rate: Superclock) {
    info!(rate, "Setting superclock rate");
    SUPERCLOCK_TICKS_PER_SECOND.store(rate, Ordering::Relaxed);
}

/// Returns the most recently configured engine sample rate.
pub fn most_recent_engine_sample_rate() -> u32 {
    ENGINE_SAMPLE_RATE.load(Ordering::Relaxed)
}

/// Records the engine sample rate.
pub fn set_most_recent_engine_sample_rate(sample_rate: u32) {
    ENGINE_SAMPLE_RATE.store(sample_rate, Ordering::Relaxed);
}

/// Converts a superclock value into a sample position, rounding down.
pub fn superclock_to_samples(sc: Superclock, sample_rate: u32) -> i64 {
    muldiv_floor(sc, sample_rate as i64, superclock_ticks_per_second())
}

/// Converts a sample position into a superclock value.
pub fn samples_to_superclock(samples: i64, sample_rate: u32) -> Superclock {
    muldiv_round(samples, superclock_ticks_per_second(), sample_rate as i64)
}

/// Converts a superclock value into seconds. For display only.
pub fn superclock_to_seconds(sc: Superclock) -> f64 {
    sc as f64 / superclock_ticks_per_second() as f64
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_common_rates_divide_evenly() {
        for rate in [44_100, 48_000, 88_200, 96_000, 176_400, 192_000] {
            assert_eq!(0, DEFAULT_SUPERCLOCK_TICKS_PER_SECOND % rate);
        }
    }

    #[test]
    fn test_sample_conversion() {
        let second = superclock_ticks_per_second();
        assert_eq!(48_000, superclock_to_samples(second, 48_000));
        assert_eq!(44_100, superclock_to_samples(second, 44_100));
        assert_eq!(second, samples_to_superclock(48_000, 48_000));

        // Every sample position survives the round trip.
        for samples in [0, 1, 17, 44_099, 1_234_567] {
            let sc = samples_to_superclock(samples, 44_100);
            assert_eq!(samples, superclock_to_samples(sc, 44_100));
        }
    }
}
