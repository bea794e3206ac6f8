use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

const DATE: &str = r"\d{1,2}[/\-]\d{1,2}[/\-](?:\d{4}|\d{2})";

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?:^|[^\d])({DATE})\b")).unwrap());
static RANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(&format!(r"(?:^|[^\d])({DATE})\s*[-–]\s*({DATE})\b")).unwrap());

/// A date found on a line, with its byte span so callers can relate it to
/// labels and ranges on the same line.
#[derive(Debug, Clone, PartialEq)]
pub struct DateToken {
    pub start: usize,
    pub end: usize,
    /// `DD/MM/YYYY`, or the raw token when it could not be reshaped.
    pub normalized: String,
    /// `None` when the normalized text is not a real calendar date.
    pub date: Option<NaiveDate>,
}

impl DateToken {
    fn from_match(m: regex::Match<'_>) -> Self {
        let normalized = normalize(m.as_str());
        let date = parse(&normalized);
        DateToken {
            start: m.start(),
            end: m.end(),
            normalized,
            date,
        }
    }

    fn overlaps(&self, start: usize, end: usize) -> bool {
        self.start < end && start < self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub from: DateToken,
    pub to: DateToken,
}

impl DateRange {
    pub fn start(&self) -> usize {
        self.from.start
    }

    pub fn end(&self) -> usize {
        self.to.end
    }

    /// `"D1 - D2"`, both sides normalized.
    pub fn display(&self) -> String {
        format!("{} - {}", self.from.normalized, self.to.normalized)
    }
}

/// Rewrite a `/` or `-` separated three-group date token as `DD/MM/YYYY`.
///
/// Day and month are stripped of non-digits and zero-padded; a two-digit
/// year is always expanded with a `20` prefix, so `1/2/90` becomes
/// `01/02/2090`. Anything that does not split into exactly three groups is
/// returned untouched.
pub fn normalize(token: &str) -> String {
    let token = token.trim();
    let parts: Vec<&str> = token.split(['/', '-']).collect();
    if parts.len() != 3 {
        return token.to_string();
    }
    let digits = |s: &str| s.chars().filter(char::is_ascii_digit).collect::<String>();
    let day = digits(parts[0]);
    let month = digits(parts[1]);
    let mut year = digits(parts[2]);
    if year.len() == 2 {
        year = format!("20{}", year);
    }
    format!("{:0>2}/{:0>2}/{}", day, month, year)
}

pub fn parse(normalized: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(normalized, "%d/%m/%Y").ok()
}

/// All date tokens on a line, left to right.
pub fn find_dates(line: &str) -> Vec<DateToken> {
    DATE_RE
        .captures_iter(line)
        .filter_map(|caps| caps.get(1))
        .map(DateToken::from_match)
        .collect()
}

/// The first `D1 - D2` range on a line.
pub fn find_range(line: &str) -> Option<DateRange> {
    let caps = RANGE_RE.captures(line)?;
    Some(DateRange {
        from: DateToken::from_match(caps.get(1)?),
        to: DateToken::from_match(caps.get(2)?),
    })
}

/// Dates on the line that are not part of `range`.
pub fn dates_outside(line: &str, range: Option<&DateRange>) -> Vec<DateToken> {
    find_dates(line)
        .into_iter()
        .filter(|d| match range {
            Some(r) => !d.overlaps(r.start(), r.end()),
            None => true,
        })
        .collect()
}

/// Fractional years from `date` to `today`; negative for future dates.
pub fn age_in_years(date: NaiveDate, today: NaiveDate) -> f64 {
    (today - date).num_days() as f64 / 365.25
}
