use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use crate::error::MetadataError;
use crate::timestamp::Timestamp;

/// Source of embedded capture timestamps.
pub trait MetadataProvider {
    /// `DateTimeOriginal` of `path` in `YYYY-MM-DD HH:mm:ss` form, or `None`
    /// when the file does not carry a usable one.
    fn date_time_original(&self, path: &Path) -> Result<Option<String>, MetadataError>;
}

/// The `exiftool` command line program.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
}

impl ExifTool {
    pub fn new(program: PathBuf) -> Self {
        ExifTool { program }
    }

    /// Looks exiftool up in `PATH`. Not finding it only disables metadata
    /// lookups for the run.
    pub fn locate() -> Option<Self> {
        match which::which("exiftool") {
            Ok(path) => {
                log::debug!("using exiftool at {}", path.display());
                Some(ExifTool::new(path))
            }
            Err(_) => {
                log::warn!(
                    "exiftool not found, timestamps come from file names only. Install it with: {}",
                    get_install_instructions()
                );
                None
            }
        }
    }
}

impl MetadataProvider for ExifTool {
    fn date_time_original(&self, path: &Path) -> Result<Option<String>, MetadataError> {
        let output = Command::new(&self.program)
            .args(["-json", "-DateTimeOriginal"])
            .arg(path)
            .output()
            .map_err(|source| MetadataError::Spawn {
                path: path.to_path_buf(),
                source,
            })?;

        if !output.status.success() {
            log::debug!(
                "exiftool exited with {} for {}: {}",
                output.status,
                path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        interpret_output(output.status.success(), &output.stdout).map_err(|source| {
            MetadataError::Output {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

/// exiftool exits non-zero for files it cannot read but may still print valid
/// JSON for them, so a failed status only means Absent when stdout is empty.
pub fn interpret_output(success: bool, stdout: &[u8]) -> Result<Option<String>, serde_json::Error> {
    if !success && stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    parse_exiftool_json(stdout)
}

#[derive(Debug, Deserialize)]
struct ExifRecord {
    #[serde(rename = "DateTimeOriginal")]
    date_time_original: Option<serde_json::Value>,
}

/// Extracts `DateTimeOriginal` from the output of `exiftool -json`.
pub fn parse_exiftool_json(stdout: &[u8]) -> Result<Option<String>, serde_json::Error> {
    let records: Vec<ExifRecord> = serde_json::from_slice(stdout)?;

    let value = records
        .into_iter()
        .next()
        .and_then(|record| record.date_time_original)
        .and_then(|value| value.as_str().map(str::to_string));

    Ok(value.and_then(|raw| {
        let normalized = normalize_exif_date(raw.trim());
        match normalized.parse::<Timestamp>() {
            Ok(_) => Some(normalized),
            Err(_) => {
                log::debug!("ignoring unusable DateTimeOriginal '{}'", raw);
                None
            }
        }
    }))
}

/// `2019:07:04 10:20:30` becomes `2019-07-04 10:20:30`.
pub fn normalize_exif_date(value: &str) -> String {
    value.replacen(':', "-", 2)
}

fn get_install_instructions() -> &'static str {
    if cfg!(windows) {
        "winget install ExifTool"
    } else if cfg!(target_os = "linux") {
        "sudo apt install libimage-exiftool-perl"
    } else if cfg!(target_os = "macos") {
        "brew install exiftool"
    } else {
        "https://exiftool.org/"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_separators_are_replaced() {
        assert_eq!(normalize_exif_date("2019:07:04 10:20:30"), "2019-07-04 10:20:30");
    }

    #[test]
    fn reads_date_time_original() {
        let json = br#"[{
            "SourceFile": "photos/a.jpg",
            "DateTimeOriginal": "2019:07:04 10:20:30"
        }]"#;
        assert_eq!(
            parse_exiftool_json(json).unwrap().as_deref(),
            Some("2019-07-04 10:20:30")
        );
    }

    #[test]
    fn absent_field_is_none() {
        let json = br#"[{"SourceFile": "photos/a.png"}]"#;
        assert_eq!(parse_exiftool_json(json).unwrap(), None);
        assert_eq!(parse_exiftool_json(b"[]").unwrap(), None);
    }

    #[test]
    fn placeholder_and_non_string_values_are_none() {
        let zeroed = br#"[{"DateTimeOriginal": "0000:00:00 00:00:00"}]"#;
        assert_eq!(parse_exiftool_json(zeroed).unwrap(), None);

        let numeric = br#"[{"DateTimeOriginal": 1562235630}]"#;
        assert_eq!(parse_exiftool_json(numeric).unwrap(), None);

        let with_zone = br#"[{"DateTimeOriginal": "2019:07:04 10:20:30+02:00"}]"#;
        assert_eq!(parse_exiftool_json(with_zone).unwrap(), None);
    }

    #[test]
    fn malformed_output_is_an_error() {
        assert!(parse_exiftool_json(b"Error: File not found").is_err());
        assert!(parse_exiftool_json(b"{\"DateTimeOriginal\": 1}").is_err());
    }

    #[test]
    fn failed_run_without_output_is_absent() {
        assert_eq!(interpret_output(false, b"").unwrap(), None);
        assert_eq!(interpret_output(false, b"  \n").unwrap(), None);
    }

    #[test]
    fn failed_run_with_json_is_still_read() {
        let json = br#"[{"SourceFile": "a.jpg", "DateTimeOriginal": "2019:07:04 10:20:30"}]"#;
        assert_eq!(
            interpret_output(false, json).unwrap().as_deref(),
            Some("2019-07-04 10:20:30")
        );
        assert!(interpret_output(false, b"Error: File not found").is_err());
    }

    #[test]
    fn successful_run_without_output_is_an_error() {
        assert!(interpret_output(true, b"").is_err());
    }
}
