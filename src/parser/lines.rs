use std::sync::LazyLock;

use regex::Regex;

pub static ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{6,8}\b").unwrap());
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:NAME|DOR|ISSUED?|VALID|SPOUSE\s*/\s*PARTNER|SPOUSE|PARTNER|OTHERS?)\b")
        .unwrap()
});
static LABEL_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:SPOUSE\s*/\s*PARTNER\b|(?:NAME|DOR|ISSUED?|VALID|SPOUSE|PARTNER|OTHERS?)\s*(?:$|[:\-]|\d))",
    )
    .unwrap()
});
static CLOSING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\blicen[cs]e\b|\bfamily\s+season\b").unwrap());
static BARE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z](?:[A-Za-z0-9 \-]*[A-Za-z0-9])?$").unwrap());
static PERSON_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z .'\-]*[A-Za-z.]$").unwrap());
static STREET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:Rd|Road|Street|Avenue|Ave)\b").unwrap());
static OTHER_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^OTHER\s*$").unwrap());

/// Split raw OCR text into trimmed, non-blank lines. A line's index in the
/// returned vector is its line number everywhere downstream.
pub fn tokenize(text: &str) -> Vec<String> {
    text.replace("\r\n", "\n")
        .split(['\n', '\r'])
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Any line that opens a labelled section or marks the document title/footer.
pub fn is_section_header(line: &str) -> bool {
    let line = line.trim();
    HEADER_RE.is_match(line) || CLOSING_RE.is_match(line)
}

/// Narrower than [`is_section_header`]: a label keyword only counts when the
/// line is shaped like a field label. That is the bare keyword, a keyword
/// with a `:`/`-` separator or a numeric value, or an upper-case keyword
/// leading mixed-case text ("NAME John Smith"). "Dor Cohen" stays a name.
pub fn is_label_line(line: &str) -> bool {
    let line = line.trim();
    if CLOSING_RE.is_match(line) || LABEL_LINE_RE.is_match(line) {
        return true;
    }
    match HEADER_RE.find(line) {
        Some(m) => {
            let keyword = m.as_str();
            keyword == keyword.to_uppercase() && line != line.to_uppercase()
        }
        None => false,
    }
}

pub fn is_other_header(line: &str) -> bool {
    OTHER_HEADER_RE.is_match(line.trim())
}

/// Starts with a letter, then letters/digits/spaces/hyphens, ends with a
/// letter or digit. "Child 1" qualifies.
pub fn is_bare_name(line: &str) -> bool {
    BARE_NAME_RE.is_match(line.trim())
}

/// Stricter than [`is_bare_name`]: no digits, allows `.` and `'`.
pub fn is_person_name(line: &str) -> bool {
    let line = line.trim();
    PERSON_NAME_RE.is_match(line) && !is_section_header(line)
}

pub fn has_street_suffix(line: &str) -> bool {
    STREET_RE.is_match(line)
}

pub fn has_id_digits(line: &str) -> bool {
    ID_RE.is_match(line)
}

/// Case- and whitespace-insensitive name comparison.
pub fn same_name(a: &str, b: &str) -> bool {
    let norm = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    !a.trim().is_empty() && norm(a) == norm(b)
}
