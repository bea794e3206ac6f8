pub mod arbiter;
pub mod candidates;
pub mod dates;
pub mod dependents;
pub mod lines;
pub mod record;
pub mod scanner;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;
use tracing::debug;

use candidates::CandidateTable;
use record::{ExtractedRecord, SuccessPolicy};

/// The two time inputs of an extraction: the day the age heuristic measures
/// from, and the record's creation stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub today: NaiveDate,
    pub now: DateTime<Utc>,
}

impl Clock {
    pub fn system() -> Self {
        Clock {
            today: Local::now().date_naive(),
            now: Utc::now(),
        }
    }

    pub fn fixed(now: DateTime<Utc>) -> Self {
        Clock {
            today: now.date_naive(),
            now,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExtractOptions {
    pub policy: SuccessPolicy,
    /// `None` reads the system clock.
    pub clock: Option<Clock>,
}

/// Result of one extraction: the record plus every candidate considered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub record: ExtractedRecord,
    pub candidates: CandidateTable,
}

/// Two-stage pipeline: text → lines → candidate table → record.
pub fn extract(text: &str) -> Extraction {
    extract_with(text, &ExtractOptions::default())
}

pub fn extract_with(text: &str, options: &ExtractOptions) -> Extraction {
    let clock = options.clock.unwrap_or_else(Clock::system);
    let lines = lines::tokenize(text);
    let mut candidates = scanner::scan(&lines, clock.today);
    let record = arbiter::resolve(&lines, &mut candidates, options.policy, clock.now);
    debug!(
        lines = lines.len(),
        candidates = candidates.len(),
        success = record.success,
        "extracted licence"
    );
    Extraction { record, candidates }
}

// ── Tests ──
