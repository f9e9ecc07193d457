use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, bail};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::exiftool::{ExifTool, MetadataProvider};
use crate::media::{self, MediaItem};
use crate::period::{self, PeriodListing};
use crate::reconcile::{Outcome, Reconciler, Reconciliation, Source};
use crate::stats::RunSummary;
use crate::terminal::CursorGuard;
use crate::timestamp::FileSystem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Media files directly inside the target directory.
    Files,
    /// Year and month directories below the target directory.
    Directories,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub target: PathBuf,
    pub mode: Mode,
    pub dry_run: bool,
    pub use_exif: bool,
    pub write_summary: bool,
    pub show_progress: bool,
}

/// Reconciles every item under `options.target` one after the other. Only
/// problems that prevent the run from starting are returned as errors; item
/// failures end up in the summary.
pub fn run(
    options: &RunOptions,
    multi: &MultiProgress,
    terminate_flag: &AtomicBool,
) -> anyhow::Result<RunSummary> {
    if !options.target.is_dir() {
        bail!("{} is not a directory", options.target.display());
    }

    match options.mode {
        Mode::Files => run_files(options, multi, terminate_flag),
        Mode::Directories => run_directories(options, multi, terminate_flag),
    }
}

fn run_files(
    options: &RunOptions,
    multi: &MultiProgress,
    terminate_flag: &AtomicBool,
) -> anyhow::Result<RunSummary> {
    let items = media::list_media(&options.target)
        .with_context(|| format!("cannot list {}", options.target.display()))?;
    log::info!("{} media files in {}", items.len(), options.target.display());

    let exiftool = if options.use_exif { ExifTool::locate() } else { None };
    let reconciler = Reconciler::new(&FileSystem, &FileSystem)
        .with_metadata(exiftool.as_ref().map(|tool| tool as &dyn MetadataProvider))
        .with_dry_run(options.dry_run);

    Ok(stamp_files(items, &reconciler, options, multi, terminate_flag))
}

fn stamp_files(
    mut items: Vec<MediaItem>,
    reconciler: &Reconciler<'_>,
    options: &RunOptions,
    multi: &MultiProgress,
    terminate_flag: &AtomicBool,
) -> RunSummary {
    let mut summary = RunSummary::new(items.len());
    drive(
        &mut items,
        options,
        multi,
        terminate_flag,
        &mut summary,
        |item| item.name.clone(),
        |item| {
            let result = reconciler.reconcile_file(item);
            log::trace!("{}: current {:?}, target {:?}", item.name, item.current, item.target);
            result
        },
    );

    if options.write_summary && !options.dry_run {
        match summary.persist(&options.target) {
            Ok(Some(path)) => log::info!("run summary written to {}", path.display()),
            Ok(None) => {}
            Err(e) => {
                log::error!("{:#}", e);
                summary.failed = true;
            }
        }
    }

    summary
}

fn run_directories(
    options: &RunOptions,
    multi: &MultiProgress,
    terminate_flag: &AtomicBool,
) -> anyhow::Result<RunSummary> {
    let listing = period::list_periods(&options.target)
        .with_context(|| format!("cannot list {}", options.target.display()))?;
    log::info!(
        "{} period directories in {}",
        listing.periods.len(),
        options.target.display()
    );

    Ok(stamp_periods(listing, options, multi, terminate_flag))
}

fn stamp_periods(
    listing: PeriodListing,
    options: &RunOptions,
    multi: &MultiProgress,
    terminate_flag: &AtomicBool,
) -> RunSummary {
    let PeriodListing { mut periods, errors } = listing;
    let reconciler = Reconciler::new(&FileSystem, &FileSystem).with_dry_run(options.dry_run);

    let mut summary = RunSummary::new(periods.len());
    for error in &errors {
        println!("[ERROR] {}", error);
        summary.record_listing_error(error);
    }

    drive(
        &mut periods,
        options,
        multi,
        terminate_flag,
        &mut summary,
        |dir| dir.label(&options.target),
        |dir| reconciler.reconcile_period(dir),
    );

    summary
}

fn drive<T>(
    items: &mut [T],
    options: &RunOptions,
    multi: &MultiProgress,
    terminate_flag: &AtomicBool,
    summary: &mut RunSummary,
    label_of: impl Fn(&T) -> String,
    mut reconcile: impl FnMut(&mut T) -> Reconciliation,
) {
    let progress = Progress::start(options.show_progress, multi, items.len());

    for item in items.iter_mut() {
        if terminate_flag.load(Ordering::SeqCst) {
            summary.interrupted = true;
            break;
        }

        let label = label_of(item);
        progress.bar.set_message(label.clone());

        let result = reconcile(item);
        progress.report(&label, &result, options.dry_run);
        summary.record(&label, &result);
        progress.bar.inc(1);
    }
}

/// Progress bar plus the hidden cursor that goes with it.
struct Progress {
    bar: ProgressBar,
    total: usize,
    _cursor: CursorGuard,
}

impl Progress {
    fn start(visible: bool, multi: &MultiProgress, total: usize) -> Self {
        if !visible {
            return Progress {
                bar: ProgressBar::hidden(),
                total,
                _cursor: CursorGuard::inactive(),
            };
        }

        let bar = multi.add(ProgressBar::new(total as u64));
        let style = ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);

        Progress {
            bar,
            total,
            _cursor: CursorGuard::hide(),
        }
    }

    fn line(&self, message: String) {
        if self.bar.is_hidden() {
            println!("{}", message);
        } else {
            self.bar.println(message);
        }
    }

    fn report(&self, label: &str, result: &Reconciliation, dry_run: bool) {
        let position = self.bar.position() + 1;
        match &result.outcome {
            Outcome::Changed { from, to } => {
                let prefix = if dry_run { "[DRY RUN] " } else { "" };
                let source = match result.source {
                    Some(Source::Metadata) => "EXIF",
                    Some(Source::Filename) => "file name",
                    Some(Source::Period) | None => "period",
                };
                self.line(format!(
                    "{}[{}/{}] Changed: {} {} -> {} ({})",
                    prefix, position, self.total, label, from, to, source
                ));
            }
            Outcome::Skipped => log::info!("[SKIP] Already up to date: {}", label),
            Outcome::ParseError(e) => self.line(format!("[ERROR] {}: {}", label, e)),
            Outcome::StatError(e) | Outcome::WriteError(e) => {
                self.line(format!("[ERROR] {}: {}", label, e))
            }
        }
    }
}

impl Drop for Progress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}
