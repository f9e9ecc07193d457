use std::path::Path;

use crate::error::{MetadataError, ParseFailure, TimestampError};
use crate::exiftool::MetadataProvider;
use crate::filename;
use crate::media::{MediaItem, MediaKind};
use crate::period::PeriodDirectory;
use crate::timestamp::{Timestamp, TimestampReader, TimestampWriter};

#[derive(Debug)]
pub enum Outcome {
    /// Modification time was rewritten (or would be, in a dry run).
    Changed { from: String, to: String },
    /// Already at the derived timestamp.
    Skipped,
    ParseError(ParseFailure),
    StatError(TimestampError),
    WriteError(TimestampError),
}

/// Where the target timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Metadata,
    Filename,
    Period,
}

#[derive(Debug)]
pub struct Reconciliation {
    pub outcome: Outcome,
    pub source: Option<Source>,
    /// exiftool failed for this item and the file name was used instead.
    pub metadata_error: Option<MetadataError>,
}

impl Reconciliation {
    fn new(outcome: Outcome, source: Option<Source>) -> Self {
        Reconciliation {
            outcome,
            source,
            metadata_error: None,
        }
    }
}

/// Derives the target timestamp of one item and applies it when it differs
/// from the current one.
pub struct Reconciler<'a> {
    metadata: Option<&'a dyn MetadataProvider>,
    reader: &'a dyn TimestampReader,
    writer: &'a dyn TimestampWriter,
    dry_run: bool,
}

impl<'a> Reconciler<'a> {
    pub fn new(reader: &'a dyn TimestampReader, writer: &'a dyn TimestampWriter) -> Self {
        Reconciler {
            metadata: None,
            reader,
            writer,
            dry_run: false,
        }
    }

    pub fn with_metadata(mut self, provider: Option<&'a dyn MetadataProvider>) -> Self {
        self.metadata = provider;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn reconcile_file(&self, item: &mut MediaItem) -> Reconciliation {
        let path = item.path();
        let mut metadata_error = None;
        let mut resolved = None;

        if item.kind == MediaKind::Image {
            if let Some(provider) = self.metadata {
                match provider.date_time_original(&path) {
                    Ok(Some(timestamp)) => resolved = Some((timestamp, Source::Metadata)),
                    Ok(None) => log::debug!("{}: no DateTimeOriginal, using file name", item.name),
                    Err(e) => {
                        log::warn!("{}, using file name", e);
                        metadata_error = Some(e);
                    }
                }
            }
        }

        let (candidate, source) = match resolved {
            Some(resolved) => resolved,
            None => match filename::parse(item.stem()) {
                Ok(timestamp) => (timestamp, Source::Filename),
                Err(e) => {
                    let mut result = Reconciliation::new(Outcome::ParseError(e), None);
                    result.metadata_error = metadata_error;
                    return result;
                }
            },
        };

        item.target = Some(candidate.clone());
        let outcome = self.settle(&path, &candidate, &mut item.current);

        let mut result = Reconciliation::new(outcome, Some(source));
        result.metadata_error = metadata_error;
        result
    }

    pub fn reconcile_period(&self, dir: &mut PeriodDirectory) -> Reconciliation {
        let Some(target) = dir.period.target() else {
            let error = TimestampError::Invalid {
                value: format!("{:?}", dir.period),
            };
            return Reconciliation::new(Outcome::WriteError(error), Some(Source::Period));
        };

        let outcome = self.settle(&dir.path, &target.comparable(), &mut dir.current);
        Reconciliation::new(outcome, Some(Source::Period))
    }

    /// Compares `candidate` with the current modification time and writes it
    /// if they differ. `current` caches the modification time between calls.
    fn settle(&self, path: &Path, candidate: &str, current: &mut Option<String>) -> Outcome {
        let now = match current.clone() {
            Some(now) => now,
            None => match self.reader.current(path) {
                Ok(now) => {
                    *current = Some(now.clone());
                    now
                }
                Err(e) => return Outcome::StatError(e),
            },
        };

        if now == candidate {
            return Outcome::Skipped;
        }

        let timestamp = match candidate.parse::<Timestamp>() {
            Ok(timestamp) => timestamp,
            Err(e) => return Outcome::WriteError(e),
        };

        if !self.dry_run {
            if let Err(e) = self.writer.apply(path, &timestamp) {
                return Outcome::WriteError(e);
            }
            *current = Some(timestamp.comparable());
        }

        Outcome::Changed {
            from: now,
            to: timestamp.comparable(),
        }
    }
}
