//! Randomize the record order of a point file in place.
//!
//! Usage: cargo run --release --bin shuffle_cloud -- <FILE> [OPTIONS]
//!
//! Options:
//!   --seed <SEED>   Seed for a reproducible shuffle (default: random)
//!
//! The file is rewritten in place. Keep a backup: an interrupted write leaves
//! the file unusable.

use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use rand::SeedableRng;
use rand::rngs::StdRng;

use cloudstream::core::logging;
use cloudstream::tools::{ProgressSink, shuffle_file_with_rng};

const BAR_STEPS: u64 = 1000;

/// Progress sink drawing a terminal progress bar
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(BAR_STEPS);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{bar:40.cyan/blue}] {percent:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("▉▊▋▌▍▎▏ "),
        );
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn report(&mut self, fraction: f32, message: &str) {
        self.bar.set_position((fraction.clamp(0.0, 1.0) * BAR_STEPS as f32) as u64);
        self.bar.set_message(message.to_string());
    }
}

fn print_help() {
    eprintln!("shuffle_cloud - randomize point order of a point file in place");
    eprintln!();
    eprintln!("Usage: shuffle_cloud <FILE> [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("    --seed <SEED>   Seed for a reproducible shuffle (default: random)");
    eprintln!("    -h, --help      Show this help message");
}

fn main() {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|a| a == "-h" || a == "--help") {
        print_help();
        return;
    }

    let Some(path) = parse_positional_arg(&args, &["--seed"]).map(PathBuf::from) else {
        eprintln!("Error: missing point file");
        print_help();
        std::process::exit(1);
    };
    let seed = match parse_u64_arg(&args, "--seed") {
        Ok(seed) => seed,
        Err(e) => {
            eprintln!("Error: {}", e);
            print_help();
            std::process::exit(1);
        }
    };

    println!("=== Point Cloud Shuffle ===");
    println!("File: {}", path.display());
    match seed {
        Some(seed) => println!("Seed: {}", seed),
        None => println!("Seed: random"),
    }
    println!();

    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut progress = BarProgress::new();

    match shuffle_file_with_rng(&path, &mut progress, &mut rng) {
        Ok(report) => {
            progress.bar.finish_with_message("Done");
            println!();
            println!(
                "Shuffled {} points in {:.1}s ({:.0} points/sec)",
                report.point_count,
                report.elapsed.as_secs_f64(),
                report.points_per_sec
            );
        }
        Err(e) => {
            progress.bar.abandon_with_message("Failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

/// First argument that is neither a flag nor the value of one of `value_flags`
fn parse_positional_arg(args: &[String], value_flags: &[&str]) -> Option<String> {
    let mut skip_next = false;
    for arg in args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if value_flags.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if !arg.starts_with('-') {
            return Some(arg.clone());
        }
    }
    None
}

/// Value of `flag`; `Ok(None)` when the flag is absent
fn parse_u64_arg(args: &[String], flag: &str) -> Result<Option<u64>, String> {
    let Some(i) = args.iter().position(|a| a == flag) else {
        return Ok(None);
    };
    let value = args.get(i + 1).ok_or_else(|| format!("Missing value for {}", flag))?;
    value
        .parse()
        .map(Some)
        .map_err(|_| format!("Invalid value for {}: {}", flag, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_seed_parsing() {
        assert_eq!(parse_u64_arg(&args(&["cloud.bin"]), "--seed"), Ok(None));
        assert_eq!(parse_u64_arg(&args(&["cloud.bin", "--seed", "42"]), "--seed"), Ok(Some(42)));
        assert!(parse_u64_arg(&args(&["cloud.bin", "--seed", "forty"]), "--seed").is_err());
        assert!(parse_u64_arg(&args(&["cloud.bin", "--seed", "-1"]), "--seed").is_err());
        assert!(parse_u64_arg(&args(&["cloud.bin", "--seed"]), "--seed").is_err());
    }

    #[test]
    fn test_positional_skips_flag_values() {
        let value_flags = ["--seed"];
        assert_eq!(
            parse_positional_arg(&args(&["--seed", "7", "cloud.bin"]), &value_flags),
            Some("cloud.bin".to_string())
        );
        assert_eq!(parse_positional_arg(&args(&["--seed", "7"]), &value_flags), None);
    }
}
