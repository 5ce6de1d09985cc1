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
use std::str::FromStr;

use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use crate::bbt::{BbtOffset, BbtTime};
use crate::beats::Beats;
use crate::superclock::Superclock;
use crate::tempo::TempoMap;
use crate::timeline::Timepos;

#[derive(Parser)]
#[grammar = "src/parse/timespec.pest"]
struct TimeSpecParser;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid time '{input}' at column {column}: {message}")]
    Syntax {
        input: String,
        column: usize,
        message: String,
    },

    #[error("value out of range in '{0}'")]
    OutOfRange(String),

    #[error("no such position '{0}': there is no bar 0 and beats count from 1")]
    NoSuchPosition(String),
}

/// A position written in any of the supported time domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSpec {
    Bbt(BbtTime),
    Quarters(Beats),
    Samples(i64),
    Superclock(Superclock),
}

impl TimeSpec {
    /// Resolves the literal to a timeline position. BBT positions are converted to quarters
    /// through `map`; samples are read at `sample_rate`.
    pub fn to_timepos(&self, map: &TempoMap, sample_rate: u32) -> Timepos {
        match self {
            TimeSpec::Bbt(bbt) => Timepos::from_beats(map.quarters_at_bbt(*bbt)),
            TimeSpec::Quarters(quarters) => Timepos::from_beats(*quarters),
            TimeSpec::Samples(samples) => Timepos::from_samples(*samples, sample_rate),
            TimeSpec::Superclock(sc) => Timepos::from_superclock(*sc),
        }
    }
}

impl FromStr for TimeSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_time_spec(s)
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeSpec::Bbt(bbt) => write!(f, "{}", bbt),
            TimeSpec::Quarters(quarters) => {
                write!(f, "{}:{}q", quarters.get_beats(), quarters.get_ticks())
            }
            TimeSpec::Samples(samples) => write!(f, "{}s", samples),
            TimeSpec::Superclock(sc) => write!(f, "{}sc", sc),
        }
    }
}

pub fn parse_time_spec(input: &str) -> Result<TimeSpec, ParseError> {
    let mut pairs =
        TimeSpecParser::parse(Rule::position, input).map_err(|e| syntax_error(input, e))?;
    let spec = pairs
        .next()
        .and_then(|position| position.into_inner().next())
        .ok_or_else(|| incomplete(input))?;

    match spec.as_rule() {
        Rule::bbt => Ok(TimeSpec::Bbt(bbt_from_pair(input, spec)?)),
        Rule::quarters => {
            let mut inner = spec.into_inner();
            let beats: i32 = next_number(input, &mut inner)?;
            let ticks: i32 = match inner.next() {
                Some(ticks) => number(ticks)?,
                None => 0,
            };
            Ok(TimeSpec::Quarters(Beats::new(beats, ticks)))
        }
        Rule::superclock => Ok(TimeSpec::Superclock(next_number(input, &mut spec.into_inner())?)),
        Rule::samples => Ok(TimeSpec::Samples(next_number(input, &mut spec.into_inner())?)),
        _ => Err(incomplete(input)),
    }
}

/// Parses a BBT position. There is no bar 0 and beats count from 1.
pub fn parse_bbt(input: &str) -> Result<BbtTime, ParseError> {
    bbt_from_pair(input, bbt_pair(input)?)
}

/// Parses a BBT distance, where every field may be zero.
pub fn parse_bbt_offset(input: &str) -> Result<BbtOffset, ParseError> {
    let (bars, beats, ticks) = bbt_fields(input, bbt_pair(input)?)?;
    Ok(BbtOffset::new(bars, beats, ticks))
}

fn bbt_pair(input: &str) -> Result<Pair<'_, Rule>, ParseError> {
    let mut pairs =
        TimeSpecParser::parse(Rule::bbt_value, input).map_err(|e| syntax_error(input, e))?;
    pairs
        .next()
        .and_then(|value| value.into_inner().next())
        .ok_or_else(|| incomplete(input))
}

fn bbt_from_pair(input: &str, pair: Pair<Rule>) -> Result<BbtTime, ParseError> {
    let (bars, beats, ticks) = bbt_fields(input, pair)?;
    if bars == 0 || beats < 1 {
        return Err(ParseError::NoSuchPosition(input.trim().to_string()));
    }
    Ok(BbtTime::new(bars, beats, ticks))
}

fn bbt_fields(input: &str, pair: Pair<Rule>) -> Result<(i32, i32, i32), ParseError> {
    let mut inner = pair.into_inner();
    Ok((
        next_number(input, &mut inner)?,
        next_number(input, &mut inner)?,
        next_number(input, &mut inner)?,
    ))
}

fn next_number<T: FromStr>(input: &str, pairs: &mut Pairs<Rule>) -> Result<T, ParseError> {
    number(pairs.next().ok_or_else(|| incomplete(input))?)
}

fn number<T: FromStr>(pair: Pair<Rule>) -> Result<T, ParseError> {
    pair.as_str()
        .parse()
        .map_err(|_| ParseError::OutOfRange(pair.as_str().to_string()))
}

fn syntax_error(input: &str, e: pest::error::Error<Rule>) -> ParseError {
    let column = match e.line_col {
        pest::error::LineColLocation::Pos((_, col)) => col,
        pest::error::LineColLocation::Span((_, col), _) => col,
    };
    ParseError::Syntax {
        input: input.to_string(),
        column,
        message: e.variant.message().to_string(),
    }
}

fn incomplete(input: &str) -> ParseError {
    ParseError::Syntax {
        input: input.to_string(),
        column: input.len() + 1,
        message: "incomplete time".to_string(),
    }
}

#[cfg(test)]
mod test {
    use crate::bbt::{BbtOffset, BbtTime};
    use crate::beats::Beats;

    use super::{parse_bbt, parse_bbt_offset, parse_time_spec, ParseError, TimeSpec};

    #[test]
    fn test_each_domain() {
        assert_eq!(
            TimeSpec::Bbt(BbtTime::new(5, 1, 0)),
            parse_time_spec("5|1|0").unwrap()
        );
        assert_eq!(
            TimeSpec::Quarters(Beats::from_beats(12)),
            parse_time_spec("12q").unwrap()
        );
        assert_eq!(
            TimeSpec::Quarters(Beats::new(12, 960)),
            parse_time_spec("12:960q").unwrap()
        );
        assert_eq!(TimeSpec::Samples(48_000), parse_time_spec("48000s").unwrap());
        assert_eq!(
            TimeSpec::Superclock(508_032_000),
            parse_time_spec("508032000sc").unwrap()
        );
        assert_eq!(
            TimeSpec::Bbt(BbtTime::new(-1, 3, 0)),
            parse_time_spec(" -1|3|0 ").unwrap()
        );
    }

    #[test]
    fn test_display_parses_back() {
        for text in ["5|2|480", "12:960q", "48000s", "508032000sc"] {
            let spec = parse_time_spec(text).unwrap();
            assert_eq!(spec, parse_time_spec(&spec.to_string()).unwrap());
        }
    }

    #[test]
    fn test_errors() {
        // No literal form matches, so the error points at the start of the literal.
        match parse_time_spec("12x") {
            Err(ParseError::Syntax { column, .. }) => assert_eq!(1, column),
            other => panic!("expected a syntax error, got {:?}", other),
        }
        assert!(parse_time_spec("").is_err());
        assert!(parse_time_spec("1|2").is_err());
        assert!(parse_time_spec("12 q").is_err());
        assert!(matches!(
            parse_time_spec("99999999999|1|0"),
            Err(ParseError::OutOfRange(_))
        ));
        assert!(parse_bbt("12q").is_err());
        assert_eq!(BbtTime::new(3, 2, 1), parse_bbt("3|2|1").unwrap());
    }

    #[test]
    fn test_positions_count_from_one() {
        for text in ["0|1|0", "3|0|0", "-2|0|480"] {
            assert_eq!(
                Err(ParseError::NoSuchPosition(text.to_string())),
                parse_bbt(text)
            );
        }
        assert!(matches!(
            parse_time_spec("0|1|0"),
            Err(ParseError::NoSuchPosition(_))
        ));
        assert_eq!(BbtTime::new(-1, 1, 0), parse_bbt("-1|1|0").unwrap());

        let offset = parse_bbt_offset("0|0|960").unwrap();
        assert_eq!((0, 0, 960), (offset.bars, offset.beats, offset.ticks));
    }
}
