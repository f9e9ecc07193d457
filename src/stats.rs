use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local, SubsecRound};
use serde::{Deserialize, Serialize};

use crate::error::ListingError;
use crate::reconcile::{Outcome, Reconciliation, Source};

/// Written next to the media files after a run that changed something.
pub const SUMMARY_FILENAME: &str = ".restamp.json";

/// Exit status of an interrupted run.
pub const EXIT_INTERRUPTED: u8 = 130;

/// Counters of one run, owned by the batch loop and updated once per item.
#[derive(Debug)]
pub struct RunSummary {
    pub started: DateTime<Local>,
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
    pub metadata_count: usize,
    pub filename_count: usize,
    /// Names of changed items in processing order.
    pub changed: Vec<String>,
    /// A parse, stat, write or listing error happened.
    pub failed: bool,
    pub interrupted: bool,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SummaryArtifact {
    pub date: DateTime<Local>,
    pub files: Vec<String>,
}

impl RunSummary {
    pub fn new(total: usize) -> Self {
        RunSummary {
            started: Local::now().trunc_subsecs(0),
            total,
            processed: 0,
            skipped: 0,
            errors: 0,
            metadata_count: 0,
            filename_count: 0,
            changed: Vec::new(),
            failed: false,
            interrupted: false,
        }
    }

    pub fn record(&mut self, name: &str, result: &Reconciliation) {
        if result.metadata_error.is_some() {
            self.errors += 1;
        }

        match &result.outcome {
            Outcome::Changed { .. } => {
                self.processed += 1;
                self.changed.push(name.to_string());
                match result.source {
                    Some(Source::Metadata) => self.metadata_count += 1,
                    Some(Source::Filename) => self.filename_count += 1,
                    Some(Source::Period) | None => {}
                }
            }
            Outcome::Skipped => self.skipped += 1,
            Outcome::ParseError(_) | Outcome::StatError(_) => {
                self.skipped += 1;
                self.errors += 1;
                self.failed = true;
            }
            Outcome::WriteError(_) => {
                self.errors += 1;
                self.failed = true;
            }
        }
    }

    /// A directory whose children were never enumerated fails the run.
    pub fn record_listing_error(&mut self, error: &ListingError) {
        log::debug!("{:?}", error.source);
        self.errors += 1;
        self.failed = true;
    }

    pub fn exit_code(&self) -> u8 {
        if self.interrupted {
            EXIT_INTERRUPTED
        } else if self.failed {
            1
        } else {
            0
        }
    }

    pub fn artifact(&self) -> SummaryArtifact {
        SummaryArtifact {
            date: self.started,
            files: self.changed.clone(),
        }
    }

    /// Writes the summary into `dir` if anything changed, returning its path.
    pub fn persist(&self, dir: &Path) -> anyhow::Result<Option<PathBuf>> {
        if self.changed.is_empty() {
            return Ok(None);
        }

        let path = dir.join(SUMMARY_FILENAME);
        let json = serde_json::to_string_pretty(&self.artifact())?;
        fs::write(&path, json)
            .with_context(|| format!("cannot write run summary {}", path.display()))?;

        Ok(Some(path))
    }

    pub fn print(&self) {
        println!("\n=== SUMMARY ===");
        println!("Started: {}", self.started.format("%Y-%m-%d %H:%M:%S"));
        println!("Total items: {}", self.total);
        println!("Changed: {}", self.processed);

        if self.metadata_count + self.filename_count > 0 {
            let resolved = (self.metadata_count + self.filename_count) as f64;
            let metadata_percentage = (self.metadata_count as f64 / resolved) * 100.0;
            let filename_percentage = (self.filename_count as f64 / resolved) * 100.0;

            println!(
                "  - From EXIF data: {} ({:.1}%)",
                self.metadata_count, metadata_percentage
            );
            println!(
                "  - From file name: {} ({:.1}%)",
                self.filename_count, filename_percentage
            );
        }

        println!("Skipped: {}", self.skipped);
        println!("Errors: {}", self.errors);

        if self.interrupted {
            println!("Stopped by user before all items were processed.");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ParseFailure, TimestampError};
    use tempfile::TempDir;

    fn changed(source: Source) -> Reconciliation {
        Reconciliation {
            outcome: Outcome::Changed {
                from: "2020-01-01 00:00:00".to_string(),
                to: "2014-12-25 00:00:00".to_string(),
            },
            source: Some(source),
            metadata_error: None,
        }
    }

    fn with(outcome: Outcome) -> Reconciliation {
        Reconciliation {
            outcome,
            source: None,
            metadata_error: None,
        }
    }

    #[test]
    fn skipped_items_are_not_processed() {
        let mut summary = RunSummary::new(2);
        summary.record("a.jpg", &with(Outcome::Skipped));
        summary.record("b.jpg", &changed(Source::Filename));

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 0);
        assert_eq!(summary.changed, ["b.jpg"]);
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn parse_errors_count_as_skipped_and_failed() {
        let mut summary = RunSummary::new(1);
        let failure = ParseFailure {
            name: "holiday".to_string(),
        };
        summary.record("holiday.jpg", &with(Outcome::ParseError(failure)));

        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn write_errors_fail_the_run() {
        let mut summary = RunSummary::new(1);
        let error = TimestampError::Invalid {
            value: "2014-12-25 25:61:00".to_string(),
        };
        summary.record("x.jpg", &with(Outcome::WriteError(error)));

        assert_eq!(summary.skipped, 0);
        assert_eq!(summary.errors, 1);
        assert!(summary.failed);
    }

    #[test]
    fn listing_errors_fail_the_run() {
        let mut summary = RunSummary::new(1);
        summary.record("2021", &changed(Source::Period));
        summary.record_listing_error(&ListingError {
            path: PathBuf::from("2020"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        });

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.errors, 1);
        assert!(summary.failed);
        assert_eq!(summary.exit_code(), 1);
    }

    #[test]
    fn interrupt_wins_over_failure() {
        let mut summary = RunSummary::new(0);
        summary.failed = true;
        summary.interrupted = true;
        assert_eq!(summary.exit_code(), EXIT_INTERRUPTED);
    }

    #[test]
    fn sources_are_tallied() {
        let mut summary = RunSummary::new(3);
        summary.record("a.jpg", &changed(Source::Metadata));
        summary.record("b.jpg", &changed(Source::Filename));
        summary.record("2021", &changed(Source::Period));

        assert_eq!(summary.metadata_count, 1);
        assert_eq!(summary.filename_count, 1);
        assert_eq!(summary.processed, 3);
    }

    #[test]
    fn artifact_lists_changes_in_order() {
        let dir = TempDir::new().unwrap();
        let mut summary = RunSummary::new(3);
        summary.record("b.jpg", &changed(Source::Filename));
        summary.record("c.jpg", &with(Outcome::Skipped));
        summary.record("a.jpg", &changed(Source::Metadata));

        let path = summary.persist(dir.path()).unwrap().unwrap();
        assert_eq!(path, dir.path().join(SUMMARY_FILENAME));

        let json = fs::read_to_string(&path).unwrap();
        let artifact: SummaryArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(artifact.files, ["b.jpg", "a.jpg"]);
        assert_eq!(artifact.date, summary.started);
    }

    #[test]
    fn nothing_is_written_without_changes() {
        let dir = TempDir::new().unwrap();
        let mut summary = RunSummary::new(1);
        summary.record("a.jpg", &with(Outcome::Skipped));

        assert_eq!(summary.persist(dir.path()).unwrap(), None);
        assert!(!dir.path().join(SUMMARY_FILENAME).exists());
    }
}
