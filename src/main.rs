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
use std::error::Error;
use std::io;
use std::path::{Path, PathBuf};

use clap::{crate_version, Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use temporal::config::Settings;
use temporal::parse::TimeSpec;
use temporal::superclock::{superclock_ticks_per_second, superclock_to_samples};
use temporal::tempo::{GridPoint, Positioned, TempoMap};
use temporal::util::superclock_minutes_seconds;
use temporal::{Meter, Tempo};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A tempo map and timeline tool."
)]
struct Cli {
    /// The path to the engine settings.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Writes a tempo map holding only the configured initial tempo and meter.
    Init {
        /// Where to write the map.
        output: PathBuf,
    },
    /// Prints every point in a tempo map.
    Dump {
        /// The path to the tempo map.
        map: PathBuf,
    },
    /// Converts positions between superclock, samples, quarters and bars|beats|ticks.
    /// Positions are written as 5|1|0, 12q, 12:960q, 48000s or 508032000sc.
    Convert {
        /// The path to the tempo map.
        map: PathBuf,
        /// The positions to convert.
        #[arg(required = true)]
        positions: Vec<TimeSpec>,
    },
    /// Prints the grid lines between two positions.
    Grid {
        /// The path to the tempo map.
        map: PathBuf,
        /// The first position to consider.
        start: TimeSpec,
        /// The position to stop before.
        end: TimeSpec,
        /// Only print every Nth bar, counting from bar 1. Zero prints every beat.
        #[arg(short, long, default_value_t = 0)]
        bar_mod: u32,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Adds or replaces a tempo change. The position is rounded up to a beat.
    SetTempo {
        /// The path to the tempo map.
        map: PathBuf,
        /// Where the tempo starts.
        position: TimeSpec,
        /// Note types per minute.
        bpm: f64,
        /// Ramp from this tempo toward the following one.
        #[arg(short, long)]
        ramp: bool,
        /// The note value that counts as one beat of the tempo.
        #[arg(short, long, default_value_t = 4)]
        note_type: i32,
        /// Where to write the edited map. Defaults to overwriting the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Adds or replaces a meter change. The position is rounded up to a bar.
    SetMeter {
        /// The path to the tempo map.
        map: PathBuf,
        /// Where the meter starts.
        position: TimeSpec,
        /// Divisions per bar.
        divisions_per_bar: i32,
        /// The note value of one division.
        note_value: i32,
        /// Where to write the edited map. Defaults to overwriting the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Removes the tempo change at a position.
    RemoveTempo {
        /// The path to the tempo map.
        map: PathBuf,
        /// The position of the tempo change.
        position: TimeSpec,
        /// Where to write the edited map. Defaults to overwriting the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Removes the meter change at a position.
    RemoveMeter {
        /// The path to the tempo map.
        map: PathBuf,
        /// The position of the meter change.
        position: TimeSpec,
        /// Where to write the edited map. Defaults to overwriting the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Makes the tempo change at a position ramp toward the next tempo.
    Ramp {
        /// The path to the tempo map.
        map: PathBuf,
        /// The position of the tempo change.
        position: TimeSpec,
        /// Stop ramping instead.
        #[arg(long)]
        off: bool,
        /// Where to write the edited map. Defaults to overwriting the input.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rewrites a tempo map, including one in the legacy format, in the current format.
    Upgrade {
        /// The map to read.
        input: PathBuf,
        /// Where to write the map. Defaults to overwriting the input.
        output: Option<PathBuf>,
    },
}

/// One grid line, as printed by `grid --json`.
#[derive(Serialize)]
struct GridLine {
    sclock: i64,
    sample: i64,
    quarters: String,
    bbt: String,
    /// Note types per minute at the line.
    tempo: f64,
    meter: String,
    bar: bool,
}

impl GridLine {
    fn new(point: &GridPoint, sample_rate: u32) -> GridLine {
        let period = point
            .metric()
            .tempo_point()
            .superclocks_per_note_type_at(point.sclock());
        GridLine {
            sclock: point.sclock(),
            sample: superclock_to_samples(point.sclock(), sample_rate),
            quarters: point.beats().to_string(),
            bbt: point.bbt().to_string(),
            tempo: 60.0 * superclock_ticks_per_second() as f64 / period as f64,
            meter: point.metric().meter().to_string(),
            bar: point.is_bar(),
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;
    settings.apply();

    match cli.command {
        Commands::Init { output } => {
            let map = settings.new_map();
            map.save(&output)?;
            print!("{}", map);
        }
        Commands::Dump { map } => {
            let map = install(&map)?;
            map.dump(&mut io::stdout())?;
        }
        Commands::Convert { map, positions } => {
            let map = install(&map)?;
            for spec in positions {
                let pos = spec.to_timepos(&map, map.sample_rate());
                let sc = map.superclock_at(pos);
                println!(
                    "{:>16}  {}  {}sc  {}s  {}  {}",
                    spec.to_string(),
                    superclock_minutes_seconds(sc),
                    sc,
                    map.sample_at(pos),
                    map.quarters_at(pos),
                    map.bbt_at(pos)
                );
            }
        }
        Commands::Grid {
            map,
            start,
            end,
            bar_mod,
            json,
        } => {
            let map = install(&map)?;
            let sample_rate = map.sample_rate();
            let start = map.superclock_at(start.to_timepos(&map, sample_rate));
            let end = map.superclock_at(end.to_timepos(&map, sample_rate));
            let grid = map.get_grid(start, end, bar_mod);

            if json {
                let lines: Vec<GridLine> =
                    grid.iter().map(|p| GridLine::new(p, sample_rate)).collect();
                println!("{}", serde_json::to_string_pretty(&lines)?);
            } else {
                for point in &grid {
                    println!(
                        "{:>10}  {:>12}  {:>8}  {}  {}",
                        superclock_minutes_seconds(point.sclock()),
                        point.bbt().to_string(),
                        point.beats().to_string(),
                        point.metric().tempo(),
                        point.metric().meter()
                    );
                }
            }
        }
        Commands::SetTempo {
            map,
            position,
            bpm,
            ramp,
            note_type,
            output,
        } => {
            let tempo = Tempo::new(bpm, note_type);
            edit(&map, output, |writer| {
                let pos = position.to_timepos(writer, writer.sample_rate());
                let tp = writer.set_tempo(tempo, pos)?;
                if ramp && !writer.set_ramped(&tp, true) {
                    return Err(format!("nothing after {} to ramp toward", tp.bbt()).into());
                }
                Ok(())
            })?;
        }
        Commands::SetMeter {
            map,
            position,
            divisions_per_bar,
            note_value,
            output,
        } => {
            let meter = Meter::new(divisions_per_bar, note_value);
            edit(&map, output, |writer| {
                let pos = position.to_timepos(writer, writer.sample_rate());
                writer.set_meter(meter, pos)?;
                Ok(())
            })?;
        }
        Commands::RemoveTempo {
            map,
            position,
            output,
        } => {
            edit(&map, output, |writer| {
                let pos = position.to_timepos(writer, writer.sample_rate());
                let tp = *writer.metric_at(pos).tempo_point();
                if tp.beats() != writer.quarters_at(pos) || !writer.remove_tempo(&tp) {
                    return Err(format!("no removable tempo change at {}", position).into());
                }
                Ok(())
            })?;
        }
        Commands::RemoveMeter {
            map,
            position,
            output,
        } => {
            edit(&map, output, |writer| {
                let pos = position.to_timepos(writer, writer.sample_rate());
                let quarters = writer.quarters_at(pos);
                let mp = writer.meters().iter().find(|m| m.beats() == quarters).copied();
                match mp {
                    Some(mp) if writer.remove_meter(&mp) => Ok(()),
                    _ => Err(format!("no removable meter change at {}", position).into()),
                }
            })?;
        }
        Commands::Ramp {
            map,
            position,
            off,
            output,
        } => {
            edit(&map, output, |writer| {
                let pos = position.to_timepos(writer, writer.sample_rate());
                let tp = *writer.metric_at(pos).tempo_point();
                if !writer.set_ramped(&tp, !off) {
                    return Err(format!("cannot change the ramp at {}", tp.bbt()).into());
                }
                Ok(())
            })?;
        }
        Commands::Upgrade { input, output } => {
            let map = TempoMap::load(&input)?;
            map.save(output.as_deref().unwrap_or(&input))?;
            print!("{}", map);
        }
    }

    Ok(())
}

/// Loads a map and publishes it as the process-wide map.
fn install(path: &Path) -> Result<std::sync::Arc<TempoMap>, Box<dyn Error>> {
    Ok(TempoMap::init(TempoMap::load(path)?))
}

/// Applies an edit to the map at `path` through the process-wide writer, then saves the
/// published result.
fn edit(
    path: &Path,
    output: Option<PathBuf>,
    apply: impl FnOnce(&mut TempoMap) -> Result<(), Box<dyn Error>>,
) -> Result<(), Box<dyn Error>> {
    install(path)?;

    let mut writer = TempoMap::write_copy();
    if let Err(e) = apply(&mut writer) {
        TempoMap::abort_update(writer);
        return Err(e);
    }
    let published = TempoMap::update(writer);

    published.save(output.as_deref().unwrap_or(path))?;
    print!("{}", published);
    Ok(())
}
