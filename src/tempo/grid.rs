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
use tracing::trace;

use crate::bbt::{BbtOffset, BbtTime};
use crate::superclock::Superclock;

use super::map::TempoMap;
use super::metric::TempoMetric;
use super::point::{GridPoint, Point, Positioned};

impl TempoMap {
    /// Grid lines from `start` up to but not including `end`.
    ///
    /// With a `bar_mod` of zero there is a line on every meter division. Otherwise only
    /// bars are returned, and only every `bar_mod`-th bar counting from bar 1, so a
    /// `bar_mod` of 4 yields bars 1, 5, 9 and so on.
    pub fn get_grid(&self, start: Superclock, end: Superclock, bar_mod: u32) -> Vec<GridPoint> {
        let mut grid = Vec::new();
        if end <= start {
            return grid;
        }

        let mut metric = self.metric_at_superclock(start);
        let mut bbt = first_line(&metric, metric.bbt_at(start), bar_mod);
        let mut next = self.points.partition_point(|p| p.sclock() <= start);

        loop {
            let limit = self.points.get(next).map_or(end, |p| p.sclock().min(end));

            loop {
                let quarters = metric.quarters_at_bbt(bbt);
                let sclock = metric.superclock_at(quarters);
                if sclock >= limit {
                    break;
                }
                if sclock >= start {
                    grid.push(GridPoint {
                        point: Point::new(sclock, quarters, bbt),
                        metric,
                    });
                }
                bbt = step(&metric, bbt, bar_mod);
            }

            let Some(point) = self.points.get(next) else {
                break;
            };
            let at = point.sclock();
            if at >= end {
                break;
            }

            // Everything changing at this position takes effect together.
            while self.points.get(next).is_some_and(|p| p.sclock() == at) {
                next += 1;
            }
            let absorbed = &self.points[next - 1];
            metric = *absorbed.metric();
            bbt = first_line(&metric, absorbed.bbt(), bar_mod);
            trace!(sclock = at, bbt = %bbt, "Grid crossed map point");
        }

        grid
    }
}

/// The first grid line at or after `bbt`.
fn first_line(metric: &TempoMetric, bbt: BbtTime, bar_mod: u32) -> BbtTime {
    if bar_mod == 0 {
        return metric.round_up_to_beat(bbt);
    }

    let bar = metric.round_up_to_bar(bbt);
    let index = if bar.bars > 0 {
        bar.bars as i64 - 1
    } else {
        bar.bars as i64
    };
    let behind = index.rem_euclid(bar_mod as i64);
    if behind == 0 {
        bar
    } else {
        metric.bbt_add(bar, BbtOffset::new((bar_mod as i64 - behind) as i32, 0, 0))
    }
}

fn step(metric: &TempoMetric, bbt: BbtTime, bar_mod: u32) -> BbtTime {
    if bar_mod == 0 {
        metric.bbt_add(bbt, BbtOffset::new(0, 1, 0))
    } else {
        metric.bbt_add(bbt, BbtOffset::new(bar_mod as i32, 0, 0))
    }
}
