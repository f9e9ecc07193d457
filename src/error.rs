use std::path::PathBuf;

use thiserror::Error;

/// The file name carries nothing that looks like a capture date.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no timestamp found in file name '{name}'")]
pub struct ParseFailure {
    pub name: String,
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to run exiftool on {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("exiftool returned unreadable output for {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Error)]
pub enum TimestampError {
    #[error("cannot read modification time of {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("'{value}' is not a valid timestamp")]
    Invalid { value: String },
    #[error("{value} does not exist in the local time zone")]
    Nonexistent { value: String },
    #[error("cannot set modification time of {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A directory of the tree whose children could not be read.
#[derive(Debug, Error)]
#[error("cannot list {path}: {source}")]
pub struct ListingError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}
