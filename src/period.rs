//! Year/month directory trees: `2021/`, `2021/march/`, `2021/03 - martie/`,
//! `2021/all photos/`.

use std::io;
use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use walkdir::WalkDir;

use crate::error::ListingError;
use crate::media::HIDDEN_PREFIX;
use crate::timestamp::Timestamp;

const MONTH_NAMES: &[[&str; 12]] = &[
    [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ],
    [
        "ianuarie", "februarie", "martie", "aprilie", "mai", "iunie", "iulie", "august",
        "septembrie", "octombrie", "noiembrie", "decembrie",
    ],
];

/// Token marking a directory that holds the whole year.
pub const ALL_MARKER: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Year(i32),
    Month(i32, u32),
    All(i32),
}

impl Period {
    /// Last second of the period; `All` gets one second past new year so it
    /// sorts before every month of that year.
    pub fn target(&self) -> Option<Timestamp> {
        match *self {
            Period::Year(year) => Timestamp::from_ymd_hms(year, 12, 31, 23, 59, 59),
            Period::Month(year, month) => {
                let day = last_day_of_month(year, month)?;
                Timestamp::from_ymd_hms(year, month, day, 23, 59, 59)
            }
            Period::All(year) => Timestamp::from_ymd_hms(year, 1, 1, 0, 0, 1),
        }
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year.checked_add(1)?, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|date| date.day())
}

/// Year from a directory name starting with at least four digits.
pub fn parse_year(name: &str) -> Option<i32> {
    let digits: String = name.chars().take_while(char::is_ascii_digit).collect();
    if digits.len() < 4 {
        return None;
    }
    digits.parse().ok()
}

/// Month number (1-12) named by any alphabetic token of `name`.
pub fn parse_month(name: &str) -> Option<u32> {
    let lower = name.to_lowercase();
    lower
        .split(|c: char| !c.is_alphabetic())
        .filter(|token| !token.is_empty())
        .find_map(|token| {
            MONTH_NAMES
                .iter()
                .find_map(|names| names.iter().position(|month| *month == token))
        })
        .map(|index| index as u32 + 1)
}

fn has_all_marker(name: &str) -> bool {
    name.to_lowercase()
        .split(|c: char| !c.is_alphabetic())
        .any(|token| token == ALL_MARKER)
}

/// Period declared by a subdirectory of the year directory `year`.
pub fn classify_subdirectory(year: i32, name: &str) -> Option<Period> {
    if let Some(month) = parse_month(name) {
        Some(Period::Month(year, month))
    } else if has_all_marker(name) {
        Some(Period::All(year))
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct PeriodDirectory {
    pub path: PathBuf,
    pub period: Period,
    pub current: Option<String>,
}

impl PeriodDirectory {
    pub fn new(path: PathBuf, period: Period) -> Self {
        PeriodDirectory {
            path,
            period,
            current: None,
        }
    }

    /// Path relative to the tree root, used in reports.
    pub fn label(&self, root: &Path) -> String {
        self.path
            .strip_prefix(root)
            .unwrap_or(&self.path)
            .display()
            .to_string()
    }
}

fn sorted_subdirectories(dir: &Path) -> io::Result<Vec<(PathBuf, String)>> {
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            log::warn!("skipping non UTF-8 directory {}", entry.path().display());
            continue;
        };
        if name.starts_with(HIDDEN_PREFIX) {
            continue;
        }
        dirs.push((entry.path().to_path_buf(), name.to_string()));
    }
    Ok(dirs)
}

/// Directories to stamp plus the year directories whose children could not
/// be listed.
#[derive(Debug, Default)]
pub struct PeriodListing {
    pub periods: Vec<PeriodDirectory>,
    pub errors: Vec<ListingError>,
}

/// Every recognized directory of the tree under `root`: for each year (by
/// name) its month and "all" subdirectories (by name), then the year itself.
/// Only an unreadable `root` is fatal.
pub fn list_periods(root: &Path) -> io::Result<PeriodListing> {
    collect_periods(root, sorted_subdirectories)
}

fn collect_periods(
    root: &Path,
    list_dir: impl Fn(&Path) -> io::Result<Vec<(PathBuf, String)>>,
) -> io::Result<PeriodListing> {
    let mut listing = PeriodListing::default();

    for (year_path, year_name) in list_dir(root)? {
        let Some(year) = parse_year(&year_name) else {
            log::debug!("ignoring {}, not a year directory", year_path.display());
            continue;
        };

        match list_dir(&year_path) {
            Ok(children) => {
                for (child_path, child_name) in children {
                    match classify_subdirectory(year, &child_name) {
                        Some(period) => {
                            listing.periods.push(PeriodDirectory::new(child_path, period))
                        }
                        None => log::debug!(
                            "ignoring {}, no month or '{}' in name",
                            child_path.display(),
                            ALL_MARKER
                        ),
                    }
                }
            }
            Err(source) => listing.errors.push(ListingError {
                path: year_path.clone(),
                source,
            }),
        }

        listing.periods.push(PeriodDirectory::new(year_path, Period::Year(year)));
    }

    Ok(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};
    use tempfile::TempDir;

    fn target(period: Period) -> String {
        period.target().unwrap().apply_form()
    }

    #[test]
    fn year_ends_on_new_years_eve() {
        assert_eq!(target(Period::Year(2021)), "2021-12-31T23:59:59");
    }

    #[test]
    fn month_ends_on_its_last_day() {
        assert_eq!(target(Period::Month(2021, 3)), "2021-03-31T23:59:59");
        assert_eq!(target(Period::Month(2021, 1)), "2021-01-31T23:59:59");
        assert_eq!(target(Period::Month(2021, 4)), "2021-04-30T23:59:59");
        assert_eq!(target(Period::Month(2021, 12)), "2021-12-31T23:59:59");
        assert_eq!(target(Period::Month(2021, 2)), "2021-02-28T23:59:59");
        assert_eq!(target(Period::Month(2020, 2)), "2020-02-29T23:59:59");
    }

    #[test]
    fn all_marker_is_just_after_new_year() {
        assert_eq!(target(Period::All(2021)), "2021-01-01T00:00:01");
    }

    #[test]
    fn years_need_four_leading_digits() {
        assert_eq!(parse_year("2021"), Some(2021));
        assert_eq!(parse_year("2021 - holidays"), Some(2021));
        assert_eq!(parse_year("202"), None);
        assert_eq!(parse_year("photos 2021"), None);
    }

    #[test]
    fn months_in_english_and_romanian() {
        assert_eq!(classify_subdirectory(2021, "march"), Some(Period::Month(2021, 3)));
        assert_eq!(classify_subdirectory(2021, "ianuarie"), Some(Period::Month(2021, 1)));
        assert_eq!(classify_subdirectory(2021, "05 - Mai"), Some(Period::Month(2021, 5)));
        assert_eq!(classify_subdirectory(2021, "May"), Some(Period::Month(2021, 5)));
        assert_eq!(classify_subdirectory(2021, "12_DECEMBRIE"), Some(Period::Month(2021, 12)));
    }

    #[test]
    fn all_marker_and_unknown_names() {
        assert_eq!(classify_subdirectory(2021, "all"), Some(Period::All(2021)));
        assert_eq!(classify_subdirectory(2021, "All photos"), Some(Period::All(2021)));
        assert_eq!(classify_subdirectory(2021, "small"), None);
        assert_eq!(classify_subdirectory(2021, "misc"), None);
    }

    #[test]
    fn tree_is_listed_children_first() {
        let root = TempDir::new().unwrap();
        let dirs = ["2021/march", "2021/ianuarie", "2021/misc", "2021/.cache", "2020/all", "notes"];
        for dir in dirs {
            fs::create_dir_all(root.path().join(dir)).unwrap();
        }
        File::create(root.path().join("2019.txt")).unwrap();

        let listing = list_periods(root.path()).unwrap();
        assert!(listing.errors.is_empty());

        let listed: Vec<_> = listing
            .periods
            .into_iter()
            .map(|dir| (dir.label(root.path()), dir.period))
            .collect();

        let expected = [
            (Path::new("2020").join("all"), Period::All(2020)),
            (PathBuf::from("2020"), Period::Year(2020)),
            (Path::new("2021").join("ianuarie"), Period::Month(2021, 1)),
            (Path::new("2021").join("march"), Period::Month(2021, 3)),
            (PathBuf::from("2021"), Period::Year(2021)),
        ];
        let expected: Vec<_> = expected
            .into_iter()
            .map(|(path, period)| (path.display().to_string(), period))
            .collect();
        assert_eq!(listed, expected);
    }

    #[test]
    fn unreadable_year_is_reported_and_still_stamped() {
        let root = Path::new("/photos");
        let list_dir = |dir: &Path| -> io::Result<Vec<(PathBuf, String)>> {
            if dir == root {
                Ok(vec![
                    (root.join("2020"), "2020".to_string()),
                    (root.join("2021"), "2021".to_string()),
                ])
            } else if dir == root.join("2020") {
                Err(io::Error::from(io::ErrorKind::PermissionDenied))
            } else {
                Ok(vec![(dir.join("mai"), "mai".to_string())])
            }
        };

        let listing = collect_periods(root, list_dir).unwrap();

        assert_eq!(listing.errors.len(), 1);
        assert_eq!(listing.errors[0].path, root.join("2020"));
        assert_eq!(listing.errors[0].source.kind(), io::ErrorKind::PermissionDenied);

        let periods: Vec<_> = listing.periods.iter().map(|dir| dir.period).collect();
        assert_eq!(periods, [Period::Year(2020), Period::Month(2021, 5), Period::Year(2021)]);
    }

    #[test]
    fn unreadable_root_is_fatal() {
        let root = TempDir::new().unwrap();
        assert!(list_periods(&root.path().join("missing")).is_err());
    }
}
