use chrono::{DateTime, Utc};
use serde::Serialize;

use super::candidates::Field;

/// Which fields must be non-empty for a scan to count as a success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SuccessPolicy {
    /// name, dor, issue and valid.
    #[default]
    Canonical,
    /// The canonical set plus the licence id.
    RequireId,
}

impl SuccessPolicy {
    pub fn required(self) -> &'static [Field] {
        match self {
            SuccessPolicy::Canonical => &[Field::Name, Field::Dor, Field::Issue, Field::Valid],
            SuccessPolicy::RequireId => {
                &[Field::Id, Field::Name, Field::Dor, Field::Issue, Field::Valid]
            }
        }
    }

    pub fn is_satisfied(self, record: &ExtractedRecord) -> bool {
        self.missing(record).is_empty()
    }

    pub fn missing(self, record: &ExtractedRecord) -> Vec<Field> {
        self.required()
            .iter()
            .copied()
            .filter(|f| record.get(*f).trim().is_empty())
            .collect()
    }
}

/// The resolved licence: one value per field (empty when nothing matched).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    pub id: String,
    pub name: String,
    pub dor: String,
    pub issue: String,
    pub valid: String,
    pub spouse_partner: String,
    pub other: String,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl ExtractedRecord {
    pub fn empty(created_at: DateTime<Utc>) -> Self {
        ExtractedRecord {
            id: String::new(),
            name: String::new(),
            dor: String::new(),
            issue: String::new(),
            valid: String::new(),
            spouse_partner: String::new(),
            other: String::new(),
            success: false,
            created_at,
        }
    }

    pub fn get(&self, field: Field) -> &str {
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

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        let slot = match field {
            Field::Id => &mut self.id,
            Field::Name => &mut self.name,
            Field::Dor => &mut self.dor,
            Field::Issue => &mut self.issue,
            Field::Valid => &mut self.valid,
            Field::SpousePartner => &mut self.spouse_partner,
            Field::Other => &mut self.other,
        };
        *slot = value.into();
    }

    /// Recompute `success` after the fields changed.
    pub fn reassess(&mut self, policy: SuccessPolicy) {
        self.success = policy.is_satisfied(self);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> ExtractedRecord {
        let mut r = ExtractedRecord::empty(Utc::now());
        r.set(Field::Name, "John Smith");
        r.set(Field::Dor, "01/01/1990");
        r.set(Field::Issue, "01/01/2024");
        r.set(Field::Valid, "01/01/2025");
        r
    }

    #[test]
    fn canonical_policy_ignores_id() {
        let r = filled();
        assert!(SuccessPolicy::Canonical.is_satisfied(&r));
        assert_eq!(SuccessPolicy::RequireId.missing(&r), vec![Field::Id]);
    }

    #[test]
    fn require_id_policy() {
        let mut r = filled();
        r.set(Field::Id, "1234567");
        assert!(SuccessPolicy::RequireId.is_satisfied(&r));
    }

    #[test]
    fn whitespace_is_not_a_value() {
        let mut r = filled();
        r.set(Field::Valid, "  ");
        assert_eq!(SuccessPolicy::Canonical.missing(&r), vec![Field::Valid]);
        r.reassess(SuccessPolicy::Canonical);
        assert!(!r.success);
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(filled()).unwrap();
        assert_eq!(json["spousePartner"], "");
        assert_eq!(json["name"], "John Smith");
        assert!(json.get("createdAt").is_some());
    }
}
