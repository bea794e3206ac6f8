use std::cmp::Ordering;
use std::fmt;

use serde::{Serialize, Serializer};

/// The seven fields of a family season licence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Dor,
    Issue,
    Valid,
    SpousePartner,
    Other,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Id,
        Field::Name,
        Field::Dor,
        Field::Issue,
        Field::Valid,
        Field::SpousePartner,
        Field::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Dor => "dor",
            Field::Issue => "issue",
            Field::Valid => "valid",
            Field::SpousePartner => "spousePartner",
            Field::Other => "other",
        }
    }

    /// Accepts the wire name as well as snake_case and a few loose spellings
    /// a reviewer might type on the command line.
    pub fn parse(s: &str) -> Option<Field> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" => Some(Field::Id),
            "name" => Some(Field::Name),
            "dor" => Some(Field::Dor),
            "issue" | "issued" => Some(Field::Issue),
            "valid" => Some(Field::Valid),
            "spousepartner" | "spouse_partner" | "spouse" | "partner" => {
                Some(Field::SpousePartner)
            }
            "other" | "others" | "dependents" => Some(Field::Other),
            _ => None,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A score in `[0, 1]` with a total order, so candidate ranking never
/// depends on float comparison quirks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            return Confidence(0.0);
        }
        Confidence(value.clamp(0.0, 1.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Eq for Confidence {}

impl PartialOrd for Confidence {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Confidence {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0)
    }
}

/// Every heuristic that can produce a candidate. Each pattern belongs to
/// exactly one field and carries its own confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    IdDigits,
    NameLabel,
    NameLabelNextLine,
    NameBeforeId,
    SpouseLabel,
    SpouseBeforeAddress,
    DorLabel,
    IssueLabel,
    ValidLabel,
    ValidRange,
    DorOlderOfPair,
    IssueNewerOfPair,
    DorOldestOfThree,
    IssueMiddleOfThree,
    ValidNewestOfThree,
    DorLoneAdultDate,
    OtherSection,
    OtherImplicit,
}

impl Pattern {
    pub fn field(self) -> Field {
        match self {
            Pattern::IdDigits => Field::Id,
            Pattern::NameLabel | Pattern::NameLabelNextLine | Pattern::NameBeforeId => Field::Name,
            Pattern::SpouseLabel | Pattern::SpouseBeforeAddress => Field::SpousePartner,
            Pattern::DorLabel
            | Pattern::DorOlderOfPair
            | Pattern::DorOldestOfThree
            | Pattern::DorLoneAdultDate => Field::Dor,
            Pattern::IssueLabel | Pattern::IssueNewerOfPair | Pattern::IssueMiddleOfThree => {
                Field::Issue
            }
            Pattern::ValidLabel | Pattern::ValidRange | Pattern::ValidNewestOfThree => Field::Valid,
            Pattern::OtherSection | Pattern::OtherImplicit => Field::Other,
        }
    }

    pub fn confidence(self) -> Confidence {
        let value = match self {
            Pattern::IdDigits
            | Pattern::NameLabel
            | Pattern::SpouseLabel
            | Pattern::DorLabel
            | Pattern::IssueLabel
            | Pattern::ValidLabel
            | Pattern::OtherSection => 1.0,
            Pattern::NameLabelNextLine | Pattern::ValidRange => 0.95,
            Pattern::NameBeforeId | Pattern::DorOlderOfPair | Pattern::DorOldestOfThree => 0.9,
            Pattern::IssueNewerOfPair | Pattern::IssueMiddleOfThree => 0.85,
            Pattern::SpouseBeforeAddress
            | Pattern::ValidNewestOfThree
            | Pattern::DorLoneAdultDate
            | Pattern::OtherImplicit => 0.8,
        };
        Confidence::new(value)
    }

    pub fn id(self) -> &'static str {
        match self {
            Pattern::IdDigits => "id_digits",
            Pattern::NameLabel => "name_label",
            Pattern::NameLabelNextLine => "name_label_next_line",
            Pattern::NameBeforeId => "name_before_id",
            Pattern::SpouseLabel => "spouse_label",
            Pattern::SpouseBeforeAddress => "spouse_before_address",
            Pattern::DorLabel => "dor_label",
            Pattern::IssueLabel => "issue_label",
            Pattern::ValidLabel => "valid_label",
            Pattern::ValidRange => "valid_range",
            Pattern::DorOlderOfPair => "dor_older_of_pair",
            Pattern::IssueNewerOfPair => "issue_newer_of_pair",
            Pattern::DorOldestOfThree => "dor_oldest_of_three",
            Pattern::IssueMiddleOfThree => "issue_middle_of_three",
            Pattern::ValidNewestOfThree => "valid_newest_of_three",
            Pattern::DorLoneAdultDate => "dor_lone_adult_date",
            Pattern::OtherSection => "other_section",
            Pattern::OtherImplicit => "other_implicit",
        }
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.id())
    }
}

/// One hypothesis for one field's value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub value: String,
    pub confidence: Confidence,
    pub source_line: usize,
    #[serde(rename = "patternId")]
    pub pattern: Pattern,
}

impl Candidate {
    pub fn new(pattern: Pattern, value: impl Into<String>, source_line: usize) -> Self {
        Candidate {
            value: value.into(),
            confidence: pattern.confidence(),
            source_line,
            pattern,
        }
    }

    pub fn field(&self) -> Field {
        self.pattern.field()
    }
}

/// Per-field candidate lists in scan order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateTable {
    id: Vec<Candidate>,
    name: Vec<Candidate>,
    dor: Vec<Candidate>,
    issue: Vec<Candidate>,
    valid: Vec<Candidate>,
    spouse_partner: Vec<Candidate>,
    other: Vec<Candidate>,
}

impl CandidateTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files the candidate under the field its pattern belongs to.
    pub fn push(&mut self, candidate: Candidate) {
        self.slot_mut(candidate.field()).push(candidate);
    }

    pub fn get(&self, field: Field) -> &[Candidate] {
        match field {
            Field::Id => &self.id,
            Field::Name => &self.name,
            Field::Dor => &self.dor,
            Field::Issue => &self.issue,
            Field::Valid => &self.valid,
            Field::SpousePartner => &self.spouse_partner,
            Field::Other => &self.other,
        }
    }

    fn slot_mut(&mut self, field: Field) -> &mut Vec<Candidate> {
        match field {
            Field::Id => &mut self.id,
            Field::Name => &mut self.name,
            Field::Dor => &mut self.dor,
            Field::Issue => &mut self.issue,
            Field::Valid => &mut self.valid,
            Field::SpousePartner => &mut self.spouse_partner,
            Field::Other => &mut self.other,
        }
    }

    /// Highest confidence wins; among equals the first inserted wins.
    pub fn best(&self, field: Field) -> Option<&Candidate> {
        self.get(field)
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.confidence.cmp(&b.confidence).then(ib.cmp(ia)))
            .map(|(_, c)| c)
    }

    pub fn len(&self) -> usize {
        Field::ALL.iter().map(|f| self.get(*f).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Line indexes that produced a candidate for `field`.
    pub fn source_lines(&self, field: Field) -> impl Iterator<Item = usize> + '_ {
        self.get(field).iter().map(|c| c.source_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_routes_by_pattern_field() {
        let mut table = CandidateTable::new();
        table.push(Candidate::new(Pattern::ValidRange, "01/10/2024 - 30/09/2025", 3));
        table.push(Candidate::new(Pattern::DorOlderOfPair, "01/01/1982", 3));
        assert_eq!(table.get(Field::Valid).len(), 1);
        assert_eq!(table.get(Field::Dor).len(), 1);
        assert!(table.get(Field::Issue).is_empty());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn every_pattern_belongs_to_its_field_list() {
        let patterns = [
            Pattern::IdDigits,
            Pattern::NameLabel,
            Pattern::NameLabelNextLine,
            Pattern::NameBeforeId,
            Pattern::SpouseLabel,
            Pattern::SpouseBeforeAddress,
            Pattern::DorLabel,
            Pattern::IssueLabel,
            Pattern::ValidLabel,
            Pattern::ValidRange,
            Pattern::DorOlderOfPair,
            Pattern::IssueNewerOfPair,
            Pattern::DorOldestOfThree,
            Pattern::IssueMiddleOfThree,
            Pattern::ValidNewestOfThree,
            Pattern::DorLoneAdultDate,
            Pattern::OtherSection,
            Pattern::OtherImplicit,
        ];
        let mut table = CandidateTable::new();
        for (i, p) in patterns.iter().enumerate() {
            table.push(Candidate::new(*p, "x", i));
        }
        for field in Field::ALL {
            assert!(table.get(field).iter().all(|c| c.pattern.field() == field));
        }
        assert_eq!(table.len(), patterns.len());
    }

    #[test]
    fn best_prefers_higher_confidence() {
        let mut table = CandidateTable::new();
        table.push(Candidate::new(Pattern::DorLoneAdultDate, "01/01/1980", 0));
        table.push(Candidate::new(Pattern::DorLabel, "02/02/1981", 4));
        assert_eq!(table.best(Field::Dor).unwrap().value, "02/02/1981");
    }

    #[test]
    fn best_tie_goes_to_first_inserted() {
        let mut table = CandidateTable::new();
        table.push(Candidate::new(Pattern::NameLabel, "John Smith", 0));
        table.push(Candidate::new(Pattern::NameLabel, "Jon Smyth", 5));
        assert_eq!(table.best(Field::Name).unwrap().value, "John Smith");
    }

    #[test]
    fn best_of_empty_field_is_none() {
        assert!(CandidateTable::new().best(Field::Other).is_none());
    }

    #[test]
    fn confidence_is_clamped_and_ordered() {
        assert_eq!(Confidence::new(1.7).value(), 1.0);
        assert_eq!(Confidence::new(-0.2).value(), 0.0);
        assert_eq!(Confidence::new(f64::NAN).value(), 0.0);
        assert!(Pattern::NameLabel.confidence() > Pattern::NameLabelNextLine.confidence());
        assert!(Pattern::NameLabelNextLine.confidence() > Pattern::NameBeforeId.confidence());
    }

    #[test]
    fn table_serializes_with_wire_names() {
        let mut table = CandidateTable::new();
        table.push(Candidate::new(Pattern::SpouseLabel, "Jane Smith", 2));
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["spousePartner"][0]["value"], "Jane Smith");
        assert_eq!(json["spousePartner"][0]["patternId"], "spouse_label");
        assert_eq!(json["spousePartner"][0]["sourceLine"], 2);
        assert_eq!(json["spousePartner"][0]["confidence"], 1.0);
    }

    #[test]
    fn field_parse_accepts_loose_names() {
        assert_eq!(Field::parse("spousePartner"), Some(Field::SpousePartner));
        assert_eq!(Field::parse("spouse_partner"), Some(Field::SpousePartner));
        assert_eq!(Field::parse("ISSUED"), Some(Field::Issue));
        assert_eq!(Field::parse("address"), None);
        for f in Field::ALL {
            assert_eq!(Field::parse(f.as_str()), Some(f));
        }
    }
}
