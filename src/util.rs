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

use std::path::Path;

use crate::superclock::{superclock_ticks_per_second, Superclock};

/// Extracts a displayable file name from a path, returning a fallback if the name is unreadable.
pub fn filename_display(path: &Path) -> &str {
    path.file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unreadable file name")
}

/// Integer division rounding to nearest, halves away from zero.
pub fn int_div_round(x: i64, y: i64) -> i64 {
    narrow(round_div(x as i128, y as i128))
}

/// Computes `v * n / d` with a 128-bit intermediate, rounding to nearest.
///
/// Panics if the result does not fit in 64 bits. A clock or tick computation that large
/// means the map has been fed values far outside any timeline the engine supports.
pub fn muldiv_round(v: i64, n: i64, d: i64) -> i64 {
    narrow(round_div(v as i128 * n as i128, d as i128))
}

/// Computes `v * n / d` with a 128-bit intermediate, rounding toward negative infinity.
pub fn muldiv_floor(v: i64, n: i64, d: i64) -> i64 {
    narrow((v as i128 * n as i128).div_euclid(d as i128))
}

fn round_div(num: i128, den: i128) -> i128 {
    assert!(den != 0, "division by zero in timeline arithmetic");
    let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
    if num >= 0 {
        (num + den / 2) / den
    } else {
        (num - den / 2) / den
    }
}

fn narrow(v: i128) -> i64 {
    match i64::try_from(v) {
        Ok(v) => v,
        Err(_) => panic!("timeline arithmetic overflow: {} does not fit in 64 bits", v),
    }
}

/// Outputs the given superclock position in a minutes:seconds.millis format.
pub fn superclock_minutes_seconds(sc: Superclock) -> String {
    let millis = muldiv_floor(sc, 1000, superclock_ticks_per_second());
    let sign = if millis < 0 { "-" } else { "" };
    let millis = millis.abs();
    let minutes = millis / 60_000;
    let secs = (millis / 1000) % 60;
    format!("{}{}:{:02}.{:03}", sign, minutes, secs, millis % 1000)
}

#[cfg(test)]
mod test {
    use crate::superclock::DEFAULT_SUPERCLOCK_TICKS_PER_SECOND;
    use crate::util::{int_div_round, muldiv_floor, muldiv_round, superclock_minutes_seconds};

    #[test]
    fn test_int_div_round() {
        assert_eq!(3, int_div_round(5, 2));
        assert_eq!(-3, int_div_round(-5, 2));
        assert_eq!(1, int_div_round(4, 3));
        assert_eq!(2, int_div_round(5, 3));
        assert_eq!(-2, int_div_round(5, -3));
    }

    #[test]
    fn test_muldiv() {
        // Large enough that the intermediate product overflows 64 bits.
        let big = (i64::MAX / 4) & !1;
        assert_eq!(big / 2, muldiv_round(big, 1_000_000, 2_000_000));
        assert_eq!(-1, muldiv_floor(-1, 1, 3));
        assert_eq!(0, muldiv_round(-1, 1, 3));
    }

    #[test]
    #[should_panic]
    fn test_muldiv_overflow_is_fatal() {
        muldiv_round(i64::MAX, 4, 1);
    }

    #[test]
    fn test_superclock_minutes_strings() {
        let second = DEFAULT_SUPERCLOCK_TICKS_PER_SECOND;
        assert_eq!("0:00.000", superclock_minutes_seconds(0));
        assert_eq!("0:05.000", superclock_minutes_seconds(5 * second));
        assert_eq!("0:00.500", superclock_minutes_seconds(second / 2));
        assert_eq!("1:00.000", superclock_minutes_seconds(60 * second));
        assert_eq!("60:06.000", superclock_minutes_seconds(3606 * second));
    }
}
