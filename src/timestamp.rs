use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use filetime::FileTime;

use crate::error::TimestampError;

/// Form produced by the file name parser, the metadata resolver and the reader.
pub const COMPARABLE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
/// Form accepted by the writer.
pub const APPLY_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const CANONICAL_LEN: usize = 19;

/// A local wall-clock date-time with whole-second precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    pub fn from_ymd_hms(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        min: u32,
        sec: u32,
    ) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)?
            .and_hms_opt(hour, min, sec)
            .map(Timestamp)
    }

    pub fn comparable(&self) -> String {
        self.0.format(COMPARABLE_FORMAT).to_string()
    }

    pub fn apply_form(&self) -> String {
        self.0.format(APPLY_FORMAT).to_string()
    }

    pub fn naive(&self) -> NaiveDateTime {
        self.0
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    /// Accepts the comparable and the apply form. Leap seconds and short
    /// fields are rejected so that only canonical values get applied.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || TimestampError::Invalid {
            value: value.to_string(),
        };

        if value.len() != CANONICAL_LEN {
            return Err(invalid());
        }

        let parsed = NaiveDateTime::parse_from_str(value, COMPARABLE_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(value, APPLY_FORMAT))
            .map_err(|_| invalid())?;

        if parsed.nanosecond() >= 1_000_000_000 {
            return Err(invalid());
        }

        Ok(Timestamp(parsed))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.comparable())
    }
}

pub trait TimestampReader {
    /// Current modification time in comparable form, truncated to seconds.
    fn current(&self, path: &Path) -> Result<String, TimestampError>;
}

pub trait TimestampWriter {
    /// Sets access and modification time of `path` to `timestamp` in local time.
    fn apply(&self, path: &Path, timestamp: &Timestamp) -> Result<(), TimestampError>;
}

/// The real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystem;

impl TimestampReader for FileSystem {
    fn current(&self, path: &Path) -> Result<String, TimestampError> {
        let modified = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|source| TimestampError::Stat {
                path: path.to_path_buf(),
                source,
            })?;

        let datetime: DateTime<Local> = modified.into();
        Ok(datetime.format(COMPARABLE_FORMAT).to_string())
    }
}

impl TimestampWriter for FileSystem {
    fn apply(&self, path: &Path, timestamp: &Timestamp) -> Result<(), TimestampError> {
        // In a DST fold the earlier instant wins; a DST gap has no instant at all.
        let local = Local
            .from_local_datetime(&timestamp.naive())
            .earliest()
            .ok_or_else(|| TimestampError::Nonexistent {
                value: timestamp.apply_form(),
            })?;

        let time = FileTime::from_unix_time(local.timestamp(), 0);
        filetime::set_file_times(path, time, time).map_err(|source| TimestampError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}
