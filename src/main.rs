use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;
use clap::crate_version;
use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

mod batch;
mod error;
mod exiftool;
mod filename;
mod media;
mod period;
mod reconcile;
mod stats;
mod terminal;
mod timestamp;

use crate::batch::{Mode, RunOptions};

#[derive(Parser)]
#[command(
    version = crate_version!(),
    about = "Sets media file modification times from EXIF metadata or file names",
    name = "restamp"
)]
struct Args {
    /// Directory to process
    #[arg(default_value = ".")]
    directory: PathBuf,

    /// Stamp year/month directories with the end of their period instead of stamping media files
    #[arg(long = "dirs")]
    dirs: bool,

    /// Show what would change without touching anything
    #[arg(long = "dry-run")]
    dry_run: bool,

    /// Take timestamps from file names only, even if exiftool is installed
    #[arg(long = "no-exif")]
    no_exif: bool,

    /// Do not write the .restamp.json run summary
    #[arg(long = "no-summary")]
    no_summary: bool,

    /// Hide the progress bar
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn run_options(&self) -> RunOptions {
        RunOptions {
            target: self.directory.clone(),
            mode: if self.dirs { Mode::Directories } else { Mode::Files },
            dry_run: self.dry_run,
            use_exif: !self.no_exif,
            write_summary: !self.no_summary,
            show_progress: !self.quiet,
        }
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    let multi = setup_logging(args.verbose)?;

    let terminate_flag = Arc::new(AtomicBool::new(false));

    // Register Ctrl+C handler
    {
        let terminate_flag = Arc::clone(&terminate_flag);
        ctrlc::set_handler(move || {
            eprintln!("\n[INFO] Ctrl+C detected! Stopping after the current item...");
            terminate_flag.store(true, Ordering::SeqCst);
        })
        .context("cannot install the Ctrl+C handler")?;
    }

    let summary = batch::run(&args.run_options(), &multi, &terminate_flag)?;

    summary.print();

    Ok(ExitCode::from(summary.exit_code()))
}

/// Routes `log` through env_logger, keeping lines from tearing the progress bar.
fn setup_logging(verbosity: u8) -> anyhow::Result<MultiProgress> {
    let level = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    let logger = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .build();
    let max_level = logger.filter();

    let multi = MultiProgress::new();
    LogWrapper::new(multi.clone(), logger).try_init()?;
    log::set_max_level(max_level);

    Ok(multi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_stamp_files_in_the_current_directory() {
        let args = Args::try_parse_from(["restamp"]).unwrap();
        let options = args.run_options();

        assert_eq!(options.target, PathBuf::from("."));
        assert_eq!(options.mode, Mode::Files);
        assert!(options.use_exif);
        assert!(options.write_summary);
        assert!(options.show_progress);
        assert!(!options.dry_run);
    }

    #[test]
    fn flags_map_onto_run_options() {
        let args = Args::try_parse_from([
            "restamp", "--dirs", "--dry-run", "--no-exif", "--no-summary", "-q", "-vv", "/photos",
        ])
        .unwrap();
        let options = args.run_options();

        assert_eq!(options.target, PathBuf::from("/photos"));
        assert_eq!(options.mode, Mode::Directories);
        assert!(options.dry_run);
        assert!(!options.use_exif);
        assert!(!options.write_summary);
        assert!(!options.show_progress);
        assert_eq!(args.verbose, 2);
    }
}
