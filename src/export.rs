use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::db::ScanRow;

const HEADER: [&str; 10] = [
    "id", "name", "dor", "issue", "valid", "spousePartner", "other", "success", "createdAt", "source",
];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CsvRow<'a> {
    id: &'a str,
    name: &'a str,
    dor: &'a str,
    issue: &'a str,
    valid: &'a str,
    spouse_partner: &'a str,
    other: &'a str,
    success: bool,
    created_at: String,
    source: &'a str,
}

impl<'a> From<&'a ScanRow> for CsvRow<'a> {
    fn from(scan: &'a ScanRow) -> Self {
        let r = &scan.record;
        CsvRow {
            id: &r.id,
            name: &r.name,
            dor: &r.dor,
            issue: &r.issue,
            valid: &r.valid,
            spouse_partner: &r.spouse_partner,
            other: &r.other,
            success: r.success,
            created_at: r.created_at.to_rfc3339(),
            source: &scan.source,
        }
    }
}

/// Write scans as CSV with a header row, even when there are none. Returns
/// the number of records.
pub fn write_csv<W: Write>(writer: W, scans: &[ScanRow]) -> Result<usize> {
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(HEADER)?;
    for scan in scans {
        wtr.serialize(CsvRow::from(scan))?;
    }
    wtr.flush()?;
    Ok(scans.len())
}

pub fn export_csv(path: &Path, scans: &[ScanRow]) -> Result<usize> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv(file, scans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::record::ExtractedRecord;
    use chrono::{TimeZone, Utc};

    fn row(source: &str, name: &str, other: &str) -> ScanRow {
        let mut record = ExtractedRecord::empty(Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap());
        record.name = name.to_string();
        record.other = other.to_string();
        ScanRow {
            id: 1,
            source: source.to_string(),
            record,
            locked: Vec::new(),
        }
    }

    #[test]
    fn header_and_quoting() {
        let mut buf = Vec::new();
        let n = write_csv(&mut buf, &[row("a.txt", "John Smith", "Child 1, Child 2")]).unwrap();
        assert_eq!(n, 1);
        let out = String::from_utf8(buf).unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("id,name,dor,issue,valid,spousePartner,other,success,createdAt,source")
        );
        assert_eq!(
            lines.next(),
            Some(",John Smith,,,,,\"Child 1, Child 2\",false,2026-10-18T09:30:00+00:00,a.txt")
        );
    }

    #[test]
    fn export_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scans.csv");
        export_csv(&path, &[row("a.txt", "A", ""), row("b.txt", "B", "")]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn empty_export_keeps_header() {
        let mut buf = Vec::new();
        assert_eq!(write_csv(&mut buf, &[]).unwrap(), 0);
        assert_eq!(
            String::from_utf8(buf).unwrap(),
            "id,name,dor,issue,valid,spousePartner,other,success,createdAt,source\n"
        );
    }
}
