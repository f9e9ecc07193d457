//! Capture timestamps recovered from loosely structured file names such as
//! `2014-12-25 11-48-02`, `IMG_20141225_114802` or `141225`.

use regex::Regex;

use crate::error::ParseFailure;

lazy_static::lazy_static! {
    // A date is YYYY MM DD or YY MM DD with at most one separator between the
    // parts, month and day within their calendar ranges. A four digit year must
    // start with 19 or 20. Time components are always two digits, so a trailing
    // lone digit ("11;48-2") is left out of the time instead of becoming seconds.
    static ref FOUR_DIGIT_YEAR: Regex = Regex::new(
        r"(?x)
        (?:^|[^0-9])
        (?P<date>
            (?:19|20)[0-9]{2}
            [^0-9]?(?:0[1-9]|1[0-2])
            [^0-9]?(?:0[1-9]|[12][0-9]|3[01])
        )
        (?:[^0-9]?(?P<time>[0-9]{2}(?:[^0-9]?[0-9]{2}){0,2}))?
        "
    )
    .unwrap();

    static ref TWO_DIGIT_YEAR: Regex = Regex::new(
        r"(?x)
        (?:^|[^0-9])
        (?P<date>
            [0-9]{2}
            [^0-9]?(?:0[1-9]|1[0-2])
            [^0-9]?(?:0[1-9]|[12][0-9]|3[01])
        )
        (?:[^0-9]?(?P<time>[0-9]{2}(?:[^0-9]?[0-9]{2}){0,2}))?
        "
    )
    .unwrap();
}

/// Two digit years are expanded into this century.
const PIVOT_CENTURY: &str = "20";

/// Parses the capture timestamp out of a file name with its extension already
/// stripped, returning it in `YYYY-MM-DD HH:mm:ss` form.
///
/// A four digit year anywhere in the name wins over a two digit one, so
/// `IMG_0112 2014-12-25` is read as 2014. Names whose month or day is out of
/// range do not match at all. Calendar ranges of the time part are not checked
/// here; an hour of `25` survives parsing and is rejected when the timestamp
/// is applied.
pub fn parse(stem: &str) -> Result<String, ParseFailure> {
    let failure = || ParseFailure {
        name: stem.to_string(),
    };

    let captures = FOUR_DIGIT_YEAR
        .captures(stem)
        .or_else(|| TWO_DIGIT_YEAR.captures(stem))
        .ok_or_else(failure)?;

    let date = captures.name("date").map(|m| m.as_str()).ok_or_else(failure)?;
    let time = captures.name("time").map(|m| m.as_str()).unwrap_or("");

    Ok(format!("{} {}", normalize_date(date), normalize_time(time)))
}

fn normalize_date(fragment: &str) -> String {
    let mut digits: String = fragment.chars().filter(char::is_ascii_digit).collect();
    if digits.len() == 6 {
        digits.insert_str(0, PIVOT_CENTURY);
    }

    format!("{}-{}-{}", &digits[..4], &digits[4..6], &digits[6..8])
}

fn normalize_time(fragment: &str) -> String {
    let separators = fragment.chars().filter(|c| !c.is_ascii_digit()).count();

    let mut time = if fragment.is_empty() {
        "00:00:00".to_string()
    } else if separators <= 1 {
        let digits: Vec<char> = fragment.chars().filter(char::is_ascii_digit).collect();
        digits
            .chunks(2)
            .map(|pair| pair.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(":")
    } else {
        fragment
            .chars()
            .map(|c| if c.is_ascii_digit() { c } else { ':' })
            .collect()
    };

    while time.len() < 8 {
        time.push_str(":00");
    }

    time
}
