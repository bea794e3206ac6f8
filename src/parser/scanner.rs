use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::{Match, Regex};

use super::candidates::{Candidate, CandidateTable, Pattern};
use super::dates::{self, DateToken};
use super::lines::{is_person_name, is_section_header, ID_RE};

static NAME_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bNAME\b\s*[:\-]?\s*([A-Za-z][A-Za-z .\-]*)").unwrap());
static NAME_ONLY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^NAME\s*:?$").unwrap());
static NAME_BEFORE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z][A-Za-z .\-']*?[A-Za-z])\s*[:#]?\s*\d{6,8}\b").unwrap()
});
static SPOUSE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:SPOUSE\s*/\s*PARTNER|SPOUSE|PARTNER)\b\s*[:\-]?\s*([A-Za-z][A-Za-z .\-']*)?")
        .unwrap()
});
static SPOUSE_BEFORE_ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([A-Z][A-Za-z'\-]+(?:\s+[A-Z][A-Za-z'\-]+)+?)\s+\d+[A-Za-z]?\s+.*\b(?:Rd|Road|Street|Avenue|Ave)\b",
    )
    .unwrap()
});
static DOR_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bDOR\b").unwrap());
static ISSUE_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bISSUED?\b").unwrap());
static VALID_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bVALID\b").unwrap());
static NOT_A_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?:ID|NO|NUMBER|CARD|REF|LICENCE|LICENSE)\b").unwrap());

/// Words that end a labelled name when several fields share one OCR line.
const LABEL_WORDS: &[&str] = &[
    "NAME", "DOR", "ISSUE", "ISSUED", "VALID", "SPOUSE", "PARTNER", "SPOUSE/PARTNER", "OTHER", "ID",
];

/// Lone dates this many years old (exclusive) are taken as a holder's date
/// of record.
const ADULT_AGE_YEARS: (f64, f64) = (18.0, 100.0);

/// Walk every line against the pattern battery.
///
/// `today` anchors the lone-date age heuristic; nothing else here depends on
/// time. Never fails: unmatched text simply contributes no candidates.
pub fn scan(lines: &[String], today: NaiveDate) -> CandidateTable {
    let mut table = CandidateTable::new();

    for (i, line) in lines.iter().enumerate() {
        scan_id(line, i, &mut table);
        scan_name(lines, i, &mut table);
        scan_spouse(line, i, &mut table);
        if !scan_labelled_dates(line, i, &mut table) {
            scan_unlabelled_dates(line, i, today, &mut table);
        }
    }

    table
}

fn scan_id(line: &str, i: usize, table: &mut CandidateTable) {
    for m in ID_RE.find_iter(line) {
        table.push(Candidate::new(Pattern::IdDigits, m.as_str(), i));
    }
}

fn scan_name(lines: &[String], i: usize, table: &mut CandidateTable) {
    // Only text before a spouse label can hold the holder's name;
    // "SPOUSE/PARTNER NAME ..." belongs to the spouse.
    let spouse_at = SPOUSE_LABEL_RE.find(&lines[i]).map(|m| m.start());
    let line = &lines[i][..spouse_at.unwrap_or(lines[i].len())];

    if spouse_at.is_none() && NAME_ONLY_RE.is_match(line) {
        if let Some(next) = lines.get(i + 1) {
            if is_person_name(next) {
                table.push(Candidate::new(Pattern::NameLabelNextLine, next.trim(), i + 1));
            }
        }
        return;
    }

    if let Some(caps) = NAME_LABEL_RE.captures(line) {
        if let Some(name) = caps.get(1).and_then(|m| clean_name(m.as_str())) {
            table.push(Candidate::new(Pattern::NameLabel, name, i));
        }
        return;
    }

    if let Some(caps) = NAME_BEFORE_ID_RE.captures(line) {
        let name = caps[1].trim();
        if is_person_name(name) && !NOT_A_NAME_RE.is_match(name) {
            table.push(Candidate::new(Pattern::NameBeforeId, name, i));
        }
    }
}

fn scan_spouse(line: &str, i: usize, table: &mut CandidateTable) {
    if let Some(caps) = SPOUSE_LABEL_RE.captures(line) {
        if let Some(name) = caps.get(1).and_then(|m| clean_name(m.as_str())) {
            table.push(Candidate::new(Pattern::SpouseLabel, name, i));
        }
        return;
    }

    if let Some(caps) = SPOUSE_BEFORE_ADDRESS_RE.captures(line) {
        let name = caps[1].trim();
        if is_person_name(name) {
            table.push(Candidate::new(Pattern::SpouseBeforeAddress, name, i));
        }
    }
}

/// Label-driven dates. Returns whether the line carried any date label, in
/// which case positional reconciliation is skipped for it.
fn scan_labelled_dates(line: &str, i: usize, table: &mut CandidateTable) -> bool {
    let labels: [(&Regex, Pattern); 3] = [
        (&*DOR_LABEL_RE, Pattern::DorLabel),
        (&*ISSUE_LABEL_RE, Pattern::IssueLabel),
        (&*VALID_LABEL_RE, Pattern::ValidLabel),
    ];

    let mut found: Vec<(Match<'_>, Pattern)> = labels
        .into_iter()
        .filter_map(|(re, pattern)| re.find(line).map(|m| (m, pattern)))
        .collect();
    found.sort_by_key(|(m, _)| m.start());

    for (k, (label, pattern)) in found.iter().enumerate() {
        // A label owns the text up to the next label. Text before the first
        // label is unowned, so that label may fall back to it.
        let end = found.get(k + 1).map_or(line.len(), |(next, _)| next.start());
        let allow_range = *pattern == Pattern::ValidLabel;
        let value = date_after(&line[label.end()..end], allow_range).or_else(|| {
            if k == 0 {
                date_after(&line[..label.start()], allow_range)
            } else {
                None
            }
        });
        if let Some(value) = value {
            table.push(Candidate::new(*pattern, value, i));
        }
    }
    !found.is_empty()
}

/// First date (or, when allowed, first range) in `text`.
fn date_after(text: &str, allow_range: bool) -> Option<String> {
    let first_date = dates::find_dates(text).into_iter().next();
    if allow_range {
        if let Some(range) = dates::find_range(text) {
            let range_first = first_date.as_ref().is_none_or(|d| range.start() <= d.start);
            if range_first {
                return Some(range.display());
            }
        }
    }
    first_date.map(|d| d.normalized)
}

/// Positional reconciliation for a line with dates but no labels: a range
/// is the validity window, then the remaining dates are ordered oldest
/// first and assigned dor, issue, valid.
fn scan_unlabelled_dates(line: &str, i: usize, today: NaiveDate, table: &mut CandidateTable) {
    let range = dates::find_range(line);
    if let Some(range) = &range {
        table.push(Candidate::new(Pattern::ValidRange, range.display(), i));
    }

    let mut rest: Vec<DateToken> = dates::dates_outside(line, range.as_ref())
        .into_iter()
        .filter(|d| d.date.is_some())
        .collect();
    rest.sort_by_key(|d| d.date);

    match rest.as_slice() {
        [older, newer] => {
            table.push(Candidate::new(Pattern::DorOlderOfPair, older.normalized.clone(), i));
            table.push(Candidate::new(Pattern::IssueNewerOfPair, newer.normalized.clone(), i));
        }
        [oldest, middle, newest] => {
            table.push(Candidate::new(Pattern::DorOldestOfThree, oldest.normalized.clone(), i));
            table.push(Candidate::new(Pattern::IssueMiddleOfThree, middle.normalized.clone(), i));
            if range.is_none() {
                table.push(Candidate::new(Pattern::ValidNewestOfThree, newest.normalized.clone(), i));
            }
        }
        [lone] => {
            let Some(date) = lone.date else { return };
            let age = dates::age_in_years(date, today);
            if age > ADULT_AGE_YEARS.0 && age < ADULT_AGE_YEARS.1 {
                table.push(Candidate::new(Pattern::DorLoneAdultDate, lone.normalized.clone(), i));
            }
        }
        _ => {}
    }
}

/// Trim a captured name and cut it at the next field label, for lines where
/// OCR merged several fields.
fn clean_name(raw: &str) -> Option<String> {
    let words: Vec<&str> = raw
        .split_whitespace()
        .take_while(|w| !LABEL_WORDS.contains(&w.to_ascii_uppercase().trim_end_matches(':')))
        .collect();
    let name = words.join(" ");
    let name = name.trim_matches(|c: char| c == '-' || c == ' ');
    if name.is_empty() || is_section_header(name) {
        return None;
    }
    Some(name.to_string())
}
