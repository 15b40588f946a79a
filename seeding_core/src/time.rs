//! Mark parsing and formatting.
//!
//! Everything past the roster boundary works on [`Mark`], never on text.
//! Parsing fails closed: a mark that cannot be read becomes
//! [`NoMark::Invalid`] so one bad roster row cannot abort a seeding run.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Marks at or above this value may drop a zero fraction when formatted
const TEN_MINUTES_MS: u64 = 10 * 60 * 1000;

/// A performance time in whole milliseconds
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalTime(u64);

impl CanonicalTime {
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn as_millis(self) -> u64 {
        self.0
    }
}

/// Reason a mark carries no time
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMark {
    /// Did not start
    Dns,
    /// Did not finish
    Dnf,
    /// Disqualified
    Dq,
    /// No mark recorded
    Nm,
    /// Empty cell
    Blank,
    /// Text that could not be read as a mark
    Invalid,
}

impl NoMark {
    /// Literal token this sentinel is displayed as
    pub fn token(self) -> &'static str {
        match self {
            NoMark::Dns => "DNS",
            NoMark::Dnf => "DNF",
            NoMark::Dq => "DQ",
            NoMark::Nm => "NM",
            NoMark::Blank | NoMark::Invalid => "",
        }
    }
}

/// A seed mark or a result: either a time or a sentinel.
///
/// The derived ordering puts every time before every sentinel, which is the
/// order used for both seeding and ranking.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Mark {
    Time(CanonicalTime),
    NoMark(NoMark),
}

impl Mark {
    pub const fn from_millis(millis: u64) -> Self {
        Mark::Time(CanonicalTime(millis))
    }

    /// The time, if this mark has one
    pub fn time(self) -> Option<CanonicalTime> {
        match self {
            Mark::Time(t) => Some(t),
            Mark::NoMark(_) => None,
        }
    }

    pub fn is_time(self) -> bool {
        matches!(self, Mark::Time(_))
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_time(*self))
    }
}

impl From<Mark> for String {
    fn from(mark: Mark) -> Self {
        format_time(mark)
    }
}

impl From<String> for Mark {
    fn from(text: String) -> Self {
        parse_mark(&text)
    }
}

/// Parse a human-entered mark
///
/// Accepts `SS.hh`, `MM:SS.hh` and `HH:MM:SS.hh` with a fraction of one to
/// three digits (or none), `,` as an alternative decimal separator, and the
/// tokens `DNS`, `DNF`, `DQ`/`DSQ`, `NM` in any case. Empty text is
/// [`NoMark::Blank`]; anything else unreadable is [`NoMark::Invalid`].
pub fn parse_mark(text: &str) -> Mark {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Mark::NoMark(NoMark::Blank);
    }

    match trimmed.to_ascii_uppercase().as_str() {
        "DNS" => return Mark::NoMark(NoMark::Dns),
        "DNF" => return Mark::NoMark(NoMark::Dnf),
        "DQ" | "DSQ" => return Mark::NoMark(NoMark::Dq),
        "NM" => return Mark::NoMark(NoMark::Nm),
        _ => {}
    }

    match parse_clock(trimmed) {
        Some(millis) => Mark::from_millis(millis),
        None => {
            tracing::debug!("Unreadable mark {:?}", trimmed);
            Mark::NoMark(NoMark::Invalid)
        }
    }
}

fn parse_clock(text: &str) -> Option<u64> {
    let text = text.replace(',', ".");
    let (whole, fraction) = match text.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (text.as_str(), None),
    };

    let fraction_ms = match fraction {
        None => 0,
        Some(f) if (1..=3).contains(&f.len()) && f.bytes().all(|b| b.is_ascii_digit()) => {
            f.parse::<u64>().ok()? * 10u64.pow(3 - f.len() as u32)
        }
        Some(_) => return None,
    };

    let fields: Vec<&str> = whole.split(':').collect();
    if fields.len() > 3 {
        return None;
    }

    let mut seconds: u64 = 0;
    for (i, field) in fields.iter().enumerate() {
        if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u64 = field.parse().ok()?;
        // Only the leading field may exceed 59 or omit padding
        if i > 0 && (field.len() != 2 || value >= 60) {
            return None;
        }
        seconds = seconds.checked_mul(60)?.checked_add(value)?;
    }

    seconds.checked_mul(1000)?.checked_add(fraction_ms)
}

/// Format a mark for display
///
/// Times under ten minutes always show hundredths (`11.34`, `1:02.55`).
/// Longer times drop a zero fraction (`29:17`). A millisecond value that is
/// not a whole hundredth is shown to the thousandth so it reads back exactly.
pub fn format_time(mark: Mark) -> String {
    match mark {
        Mark::Time(time) => format_canonical(time),
        Mark::NoMark(no_mark) => no_mark.token().to_string(),
    }
}

fn format_canonical(time: CanonicalTime) -> String {
    let millis_total = time.as_millis();
    let total_seconds = millis_total / 1000;
    let millis = millis_total % 1000;

    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let clock = if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}:{:02}", minutes, seconds)
    } else {
        seconds.to_string()
    };

    let fraction = if millis % 10 != 0 {
        format!(".{:03}", millis)
    } else if millis == 0 && millis_total >= TEN_MINUTES_MS {
        String::new()
    } else {
        format!(".{:02}", millis / 10)
    };

    format!("{}{}", clock, fraction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sprint_mark() {
        assert_eq!(parse_mark("11.34"), Mark::from_millis(11_340));
        assert_eq!(parse_mark(" 9.58 "), Mark::from_millis(9_580));
        assert_eq!(parse_mark("10.5"), Mark::from_millis(10_500));
    }

    #[test]
    fn test_parse_clock_forms() {
        assert_eq!(parse_mark("1:02.55"), Mark::from_millis(62_550));
        assert_eq!(parse_mark("29:17"), Mark::from_millis(1_757_000));
        assert_eq!(parse_mark("2:05:30.10"), Mark::from_millis(7_530_100));
    }

    #[test]
    fn test_parse_comma_and_thousandths() {
        assert_eq!(parse_mark("11,34"), Mark::from_millis(11_340));
        assert_eq!(parse_mark("11.345"), Mark::from_millis(11_345));
    }

    #[test]
    fn test_parse_sentinels() {
        assert_eq!(parse_mark("DNS"), Mark::NoMark(NoMark::Dns));
        assert_eq!(parse_mark("dnf"), Mark::NoMark(NoMark::Dnf));
        assert_eq!(parse_mark("DSQ"), Mark::NoMark(NoMark::Dq));
        assert_eq!(parse_mark("NM"), Mark::NoMark(NoMark::Nm));
        assert_eq!(parse_mark("   "), Mark::NoMark(NoMark::Blank));
    }

    #[test]
    fn test_parse_fails_closed() {
        for bad in ["abc", "1:2.55", "1:75.00", "11.", ".55", "11.3456", "-11.00", "1:02:03:04"] {
            assert_eq!(
                parse_mark(bad),
                Mark::NoMark(NoMark::Invalid),
                "{:?} should not parse",
                bad
            );
        }
    }

    #[test]
    fn test_canonical_roundtrip() {
        for text in [
            "0.00", "9.58", "11.34", "59.99", "1:00.00", "1:02.55", "9:59.99", "10:00",
            "29:17", "13:04.12", "1:02:03.40", "2:05:30", "11.345", "DNS", "DNF", "DQ", "NM", "",
        ] {
            assert_eq!(format_time(parse_mark(text)), text);
        }
    }

    #[test]
    fn test_noncanonical_input_reparses_to_same_value() {
        for text in ["45", "10.5", "9:59.9", "1:00:00.0", "11,34", "dsq", "nm"] {
            let first = parse_mark(text);
            assert_eq!(parse_mark(&format_time(first)), first, "{:?}", text);
        }

        // Unreadable text formats as empty and reads back as a blank no-mark
        let invalid = parse_mark("garbage");
        assert_eq!(parse_mark(&format_time(invalid)), Mark::NoMark(NoMark::Blank));
    }

    #[test]
    fn test_times_order_before_sentinels() {
        let mut marks = vec![
            parse_mark("DNS"),
            parse_mark("11.50"),
            parse_mark(""),
            parse_mark("10.90"),
        ];
        marks.sort();
        assert_eq!(marks[0], Mark::from_millis(10_900));
        assert_eq!(marks[1], Mark::from_millis(11_500));
        assert!(!marks[2].is_time());
        assert!(!marks[3].is_time());
    }

    #[test]
    fn test_mark_serializes_as_display_text() {
        let json = serde_json::to_string(&parse_mark("1:02.55")).unwrap();
        assert_eq!(json, "\"1:02.55\"");
        let back: Mark = serde_json::from_str("\"DQ\"").unwrap();
        assert_eq!(back, Mark::NoMark(NoMark::Dq));
    }
}
