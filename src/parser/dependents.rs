use super::dates;
use super::lines::{
    has_id_digits, has_street_suffix, is_bare_name, is_label_line, is_other_header, same_name,
};

/// Names and lines already resolved to the holder or the spouse/partner.
#[derive(Debug, Clone, Default)]
pub struct Claims<'a> {
    pub name: &'a str,
    pub spouse: &'a str,
    /// Line where the spouse/partner appears; implicit dependents follow it.
    pub spouse_line: Option<usize>,
    /// Lines that produced a name or spouse candidate.
    pub lines: Vec<usize>,
}

impl Claims<'_> {
    fn claims_name(&self, line: &str) -> bool {
        same_name(line, self.name) || same_name(line, self.spouse)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependentsSource {
    /// Collected under an `OTHER` header.
    Section,
    /// Inferred from name-shaped lines after the spouse/partner.
    Implicit,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dependents {
    pub names: Vec<String>,
    /// Line index of each collected name.
    pub lines: Vec<usize>,
    /// Index where the pass stopped: the closing header, or `lines.len()`.
    pub stopped_at: usize,
    pub source: Option<DependentsSource>,
}

impl Dependents {
    pub fn joined(&self) -> String {
        self.names.join(", ")
    }

    fn push(&mut self, name: &str, line: usize) {
        if self.names.iter().any(|n| same_name(n, name)) {
            return;
        }
        self.names.push(name.to_string());
        self.lines.push(line);
    }
}

#[derive(Clone, Copy)]
enum State {
    Seeking,
    Collecting,
}

/// Find the dependents ("other") listed on the licence.
///
/// An explicit `OTHER` header wins: names are collected until the next
/// section header. Without one, name-shaped lines after the spouse/partner
/// line that carry no id, date or street are taken instead.
pub fn detect(lines: &[String], claims: &Claims<'_>) -> Dependents {
    let mut found = Dependents {
        names: Vec::new(),
        lines: Vec::new(),
        stopped_at: lines.len(),
        source: None,
    };
    let mut state = State::Seeking;

    for (i, line) in lines.iter().enumerate() {
        match state {
            State::Seeking => {
                if is_other_header(line) {
                    found.source = Some(DependentsSource::Section);
                    state = State::Collecting;
                }
            }
            State::Collecting => {
                if is_label_line(line) {
                    found.stopped_at = i;
                    break;
                }
                if is_bare_name(line) && !claims.claims_name(line) {
                    found.push(line, i);
                }
            }
        }
    }

    if found.source.is_some() {
        return found;
    }

    let Some(anchor) = claims.spouse_line else {
        return found;
    };
    for (i, line) in lines.iter().enumerate().skip(anchor + 1) {
        if is_implicit_dependent(line) && !claims.claims_name(line) && !claims.lines.contains(&i) {
            found.source = Some(DependentsSource::Implicit);
            found.push(line, i);
        }
    }
    found
}

fn is_implicit_dependent(line: &str) -> bool {
    is_bare_name(line)
        && !has_id_digits(line)
        && dates::find_dates(line).is_empty()
        && !has_street_suffix(line)
        && !is_label_line(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lines::tokenize;

    fn claims<'a>(name: &'a str, spouse: &'a str, spouse_line: Option<usize>) -> Claims<'a> {
        Claims {
            name,
            spouse,
            spouse_line,
            lines: Vec::new(),
        }
    }

    #[test]
    fn explicit_section_until_closing_marker() {
        let lines = tokenize("NAME John Smith\nOTHER\nChild 1\nChild 2\nLicence\nTrailing Words");
        let deps = detect(&lines, &claims("John Smith", "", None));
        assert_eq!(deps.names, vec!["Child 1", "Child 2"]);
        assert_eq!(deps.lines, vec![2, 3]);
        assert_eq!(deps.stopped_at, 4);
        assert_eq!(deps.source, Some(DependentsSource::Section));
        assert_eq!(deps.joined(), "Child 1, Child 2");
    }

    #[test]
    fn explicit_section_stops_at_any_header() {
        let lines = tokenize("OTHER\nAmy Smith\nVALID 01/01/2025\nBen Smith");
        let deps = detect(&lines, &claims("", "", None));
        assert_eq!(deps.names, vec!["Amy Smith"]);
        assert_eq!(deps.stopped_at, 2);
    }

    #[test]
    fn explicit_section_skips_non_names_and_claimed_names() {
        let lines = tokenize("OTHER\njohn smith\n12/03/2015\nJane Smith\nAmy Smith\nAmy Smith");
        let deps = detect(&lines, &claims("John Smith", "Jane Smith", None));
        assert_eq!(deps.names, vec!["Amy Smith"]);
        assert_eq!(deps.stopped_at, lines.len());
    }

    #[test]
    fn dependent_named_like_a_label() {
        let lines = tokenize("OTHER\nAmy Smith\nDor Cohen\nLicence");
        let deps = detect(&lines, &claims("", "", None));
        assert_eq!(deps.names, vec!["Amy Smith", "Dor Cohen"]);
        assert_eq!(deps.stopped_at, 3);
    }

    #[test]
    fn empty_section() {
        let lines = tokenize("OTHER\nLicence");
        let deps = detect(&lines, &claims("", "", None));
        assert!(deps.names.is_empty());
        assert_eq!(deps.source, Some(DependentsSource::Section));
    }

    #[test]
    fn header_suppresses_implicit_scan() {
        let lines = tokenize("Jane Smith 12 Kauri Rd\nAmy Smith\nOTHER");
        let deps = detect(&lines, &claims("", "Jane Smith", Some(0)));
        assert!(deps.names.is_empty());
    }

    #[test]
    fn implicit_after_spouse_line() {
        let lines = tokenize(
            "Tom Brown\nJohn Smith 1234567\nJane Smith 12 Kauri Rd\nAmy Smith\n4 Beach Road\n01/01/2015\nBen Smith\nFamily Season Licence",
        );
        let mut c = claims("John Smith", "Jane Smith", Some(2));
        c.lines = vec![1, 2];
        let deps = detect(&lines, &c);
        assert_eq!(deps.names, vec!["Amy Smith", "Ben Smith"]);
        assert_eq!(deps.source, Some(DependentsSource::Implicit));
    }

    #[test]
    fn implicit_skips_claimed_lines() {
        let lines = tokenize("SPOUSE/PARTNER Jane Smith\nJane Smyth\nAmy Smith");
        let mut c = claims("", "Jane Smith", Some(0));
        c.lines = vec![1];
        assert_eq!(detect(&lines, &c).names, vec!["Amy Smith"]);
    }

    #[test]
    fn no_spouse_no_implicit_dependents() {
        let lines = tokenize("John Smith\nAmy Smith");
        let deps = detect(&lines, &claims("John Smith", "", None));
        assert!(deps.names.is_empty());
        assert_eq!(deps.source, None);
    }
}
