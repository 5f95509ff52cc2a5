extern crate clap;
extern crate mandeltiles;
extern crate num;
extern crate num_cpus;
extern crate tracing_subscriber;

use clap::{App, Arg, ArgMatches};
use mandeltiles::RenderConfig;
use num::Complex;
use std::path::PathBuf;
use std::str::FromStr;

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn parse_complex(s: &str) -> Option<Complex<f64>> {
    match parse_pair(s, ',') {
        Some((re, im)) => Some(Complex { re, im }),
        None => None,
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const LEFTLOWER: &str = "leftlower";
const RIGHTUPPER: &str = "rightupper";
const TILE: &str = "tile";
const THREADS: &str = "threads";
const ITERATIONS: &str = "iterations";
const FLUSH_EVERY: &str = "flush-every";
const QUEUE_CAPACITY: &str = "queue-capacity";

const MAX_THREADS: usize = 256;

fn args<'a>() -> ArgMatches<'a> {
    App::new("mandeltiles")
        .version("0.1.0")
        .about("Tiled, multi-threaded Mandelbrot renderer")
        .arg(
            Arg::with_name(OUTPUT)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .default_value("mandelbrot.ppm")
                .help("Output file; a .png extension writes PNG, anything else binary PPM"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("800x600")
                .validator(|s| validate_pair::<u16>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(LEFTLOWER)
                .long(LEFTLOWER)
                .short("l")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("-2.0,-1.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse left lower corner"))
                .help("Corner of the complex plane at the first pixel"),
        )
        .arg(
            Arg::with_name(RIGHTUPPER)
                .long(RIGHTUPPER)
                .short("r")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("1.0,1.0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse right upper corner"))
                .help("Corner of the complex plane opposite the first pixel"),
        )
        .arg(
            Arg::with_name(TILE)
                .long(TILE)
                .short("T")
                .takes_value(true)
                .default_value("64")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        u16::max_value() as usize,
                        "Could not parse tile size",
                        "Tile size must be at least 1",
                    )
                })
                .help("Edge length of a tile, in pixels"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        MAX_THREADS,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", MAX_THREADS),
                    )
                })
                .help("Number of rendering threads [default: number of CPUs]"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("1000")
                .validator(move |s| {
                    validate_range(
                        &s,
                        1,
                        200_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 200000",
                    )
                })
                .help("Iteration cap per pixel"),
        )
        .arg(
            Arg::with_name(FLUSH_EVERY)
                .long(FLUSH_EVERY)
                .short("f")
                .takes_value(true)
                .default_value("1")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        usize::max_value(),
                        "Could not parse flush interval",
                        "Flush interval must be at least 1",
                    )
                })
                .help("Write the image after every this many tiles"),
        )
        .arg(
            Arg::with_name(QUEUE_CAPACITY)
                .long(QUEUE_CAPACITY)
                .short("q")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        usize::max_value(),
                        "Could not parse queue capacity",
                        "Queue capacity must be at least 1",
                    )
                })
                .help("Slots in the results queue [default: one per tile]"),
        )
        .get_matches()
}

// Every value has already been through its validator, so parsing here
// only fails on a programming error.
fn value<T: FromStr>(matches: &ArgMatches, name: &str) -> Option<T> {
    matches.value_of(name).and_then(|s| T::from_str(s).ok())
}

fn render_config(matches: &ArgMatches) -> RenderConfig {
    let mut config = RenderConfig::default();
    if let Some((width, height)) = matches.value_of(SIZE).and_then(|s| parse_pair(s, 'x')) {
        config.width = width;
        config.height = height;
    }
    if let Some(corner) = matches.value_of(LEFTLOWER).and_then(parse_complex) {
        config.leftlower = corner;
    }
    if let Some(corner) = matches.value_of(RIGHTUPPER).and_then(parse_complex) {
        config.rightupper = corner;
    }
    if let Some(output) = matches.value_of(OUTPUT) {
        config.output = PathBuf::from(output);
    }
    config.tile_size = value(matches, TILE).unwrap_or(config.tile_size);
    config.workers = value(matches, THREADS).unwrap_or_else(num_cpus::get);
    config.iterations = value(matches, ITERATIONS).unwrap_or(config.iterations);
    config.flush_every = value(matches, FLUSH_EVERY).unwrap_or(config.flush_every);
    config.queue_capacity = value(matches, QUEUE_CAPACITY);
    config
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = render_config(&args());
    match mandeltiles::render_to_file(&config) {
        Err(e) => {
            eprintln!("Render failure: {}", e);
            std::process::exit(1);
        }
        Ok(report) => {
            if report.snapshot_failures > 0 && report.snapshots_written == 0 {
                eprintln!("Render finished but {} could not be written", config.output.display());
                std::process::exit(1);
            }
            println!(
                "Mandelbrot image generated successfully: {} ({}x{}, {} tiles)",
                config.output.display(),
                config.width,
                config.height,
                report.tiles
            );
        }
    }
}
