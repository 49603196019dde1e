use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};

static COLON_FORM: OnceLock<Regex> = OnceLock::new();

/// `MM:SS` or `HH:MM:SS`, one or two digits in the leading field
fn colon_form() -> &'static Regex {
    COLON_FORM.get_or_init(|| Regex::new(r"^[0-9]{1,2}:[0-9]{2}(:[0-9]{2})?$").unwrap())
}

fn is_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// Check the shape of a time string.
///
/// The empty string is accepted and means "unspecified". Sub-fields are not
/// range checked, so `99:99` passes.
pub fn validate(s: &str) -> bool {
    s.is_empty() || colon_form().is_match(s) || is_digits(s, 4) || is_digits(s, 6)
}

/// Rewrite `MMSS` as `MM:SS` and `HHMMSS` as `HH:MM:SS`.
/// Any other input is returned unchanged.
pub fn normalize(s: &str) -> String {
    if is_digits(s, 4) {
        format!("{}:{}", &s[..2], &s[2..])
    } else if is_digits(s, 6) {
        format!("{}:{}:{}", &s[..2], &s[2..4], &s[4..])
    } else {
        s.to_string()
    }
}

/// Convert `MM:SS`, `HH:MM:SS` or a bare number of seconds to seconds
pub fn to_seconds(s: &str) -> Result<u64> {
    let invalid = || Error::InvalidTimeShape(s.to_string());

    let parts = s
        .split(':')
        .map(|p| p.parse::<u64>().map_err(|_| invalid()))
        .collect::<Result<Vec<_>>>()?;

    let total = match parts.as_slice() {
        [secs] => Some(*secs),
        [m, s] => m.checked_mul(60).and_then(|m| m.checked_add(*s)),
        [h, m, s] => h
            .checked_mul(3600)
            .and_then(|h| m.checked_mul(60).and_then(|m| h.checked_add(m)))
            .and_then(|hm| hm.checked_add(*s)),
        _ => None,
    };

    total.ok_or_else(invalid)
}

/// Split a combined `START-END` token on its single `-`.
///
/// Returns `None` for an empty token. The halves are trimmed but not
/// otherwise validated.
pub fn split_token(token: &str) -> Result<Option<(&str, &str)>> {
    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }

    let (start, end) = token
        .split_once('-')
        .ok_or_else(|| Error::InvalidTimeShape(token.to_string()))?;

    if end.contains('-') {
        return Err(Error::InvalidTimeShape(token.to_string()));
    }

    Ok(Some((start.trim(), end.trim())))
}

/// A point in a video, kept in its normalized colon form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSpec {
    text: String,
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeSpec {
    /// Parse one non-empty time string in any accepted shape
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() || !validate(input) {
            return Err(Error::InvalidTimeShape(input.to_string()));
        }

        let text = normalize(input);
        let fields = text
            .split(':')
            .map(|p| p.parse::<u64>().map_err(|_| Error::InvalidTimeShape(input.to_string())))
            .collect::<Result<Vec<_>>>()?;

        let (hours, minutes, seconds) = match fields.as_slice() {
            [m, s] => (0, *m, *s),
            [h, m, s] => (*h, *m, *s),
            _ => return Err(Error::InvalidTimeShape(input.to_string())),
        };

        Ok(Self {
            text,
            hours,
            minutes,
            seconds,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn total_seconds(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

impl fmt::Display for TimeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Which part of the video to fetch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TimeRange {
    #[default]
    WholeVideo,
    Section { start: TimeSpec, end: TimeSpec },
}

impl TimeRange {
    /// Build a range from separate start and end inputs.
    ///
    /// Both empty means the whole video. Exactly one empty is rejected,
    /// as is an end that does not come after the start.
    pub fn from_parts(start: &str, end: &str) -> Result<Self> {
        let (start, end) = (start.trim(), end.trim());

        match (start.is_empty(), end.is_empty()) {
            (true, true) => return Ok(TimeRange::WholeVideo),
            (false, false) => {}
            _ => return Err(Error::IncompleteTimeRange),
        }

        let start = TimeSpec::parse(start)?;
        let end = TimeSpec::parse(end)?;

        if end.total_seconds() <= start.total_seconds() {
            return Err(Error::InvertedTimeRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }

        Ok(TimeRange::Section { start, end })
    }

    /// Parse a combined `START-END` token such as `0430-0600` or `4:30-6:00`.
    /// An empty token means the whole video.
    pub fn parse_token(token: &str) -> Result<Self> {
        match split_token(token)? {
            Some((start, end)) => Self::from_parts(start, end),
            None => Ok(TimeRange::WholeVideo),
        }
    }

    /// The `*start-end` section clause, absent for the whole video
    pub fn clause(&self) -> Option<String> {
        match self {
            TimeRange::WholeVideo => None,
            TimeRange::Section { start, end } => Some(format!("*{start}-{end}")),
        }
    }

    /// Both endpoints in absolute seconds
    pub fn seconds(&self) -> Option<(u64, u64)> {
        match self {
            TimeRange::WholeVideo => None,
            TimeRange::Section { start, end } => Some((start.total_seconds(), end.total_seconds())),
        }
    }

    /// Filesystem-safe tag for the range, e.g. `01_30-06_00`
    pub fn file_tag(&self) -> Option<String> {
        match self {
            TimeRange::WholeVideo => None,
            TimeRange::Section { start, end } => Some(format!(
                "{}-{}",
                start.as_str().replace(':', "_"),
                end.as_str().replace(':', "_")
            )),
        }
    }

    pub fn is_whole_video(&self) -> bool {
        matches!(self, TimeRange::WholeVideo)
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::WholeVideo => write!(f, "whole video"),
            TimeRange::Section { start, end } => write!(f, "{start}-{end}"),
        }
    }
}
