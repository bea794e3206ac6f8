use chrono::{DateTime, Utc};
use tracing::debug;

use super::candidates::{Candidate, CandidateTable, Field, Pattern};
use super::dependents::{self, Claims, DependentsSource};
use super::lines::is_section_header;
use super::record::{ExtractedRecord, SuccessPolicy};

/// Settle the candidate table into a record.
///
/// Resolves holder and spouse first so dependents detection can exclude
/// them, files the dependents as an `other` candidate, then takes the best
/// candidate per field.
pub fn resolve(
    lines: &[String],
    table: &mut CandidateTable,
    policy: SuccessPolicy,
    created_at: DateTime<Utc>,
) -> ExtractedRecord {
    let name = best_value(table, Field::Name);
    let spouse = best_value(table, Field::SpousePartner);

    let claims = Claims {
        name: &name,
        spouse: &spouse,
        spouse_line: spouse_line(lines, table),
        lines: table
            .source_lines(Field::Name)
            .chain(table.source_lines(Field::SpousePartner))
            .collect(),
    };
    let deps = dependents::detect(lines, &claims);
    if let (Some(source), Some(first_line)) = (deps.source, deps.lines.first()) {
        let pattern = match source {
            DependentsSource::Section => Pattern::OtherSection,
            DependentsSource::Implicit => Pattern::OtherImplicit,
        };
        table.push(Candidate::new(pattern, deps.joined(), *first_line));
    }
    debug!(dependents = deps.names.len(), stopped_at = deps.stopped_at, "dependents pass");

    let mut record = ExtractedRecord::empty(created_at);
    for field in Field::ALL {
        record.set(field, best_value(table, field));
    }
    record.reassess(policy);
    record
}

fn best_value(table: &CandidateTable, field: Field) -> String {
    table
        .best(field)
        .map(|c| c.value.clone())
        .unwrap_or_default()
}

/// First line that names the spouse/partner: either a spouse label (even a
/// bare one) or the source of a spouse candidate.
fn spouse_line(lines: &[String], table: &CandidateTable) -> Option<usize> {
    let labelled = lines.iter().position(|l| {
        let upper = l.to_ascii_uppercase();
        is_section_header(l) && (upper.starts_with("SPOUSE") || upper.starts_with("PARTNER"))
    });
    let candidate = table.source_lines(Field::SpousePartner).min();
    match (labelled, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
