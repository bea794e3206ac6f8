use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::parser::candidates::Field;
use crate::parser::record::{ExtractedRecord, SuccessPolicy};

pub const DEFAULT_DB_PATH: &str = "data/licence_scan.sqlite";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create database directory {}", dir.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS scans (
            id             INTEGER PRIMARY KEY,
            source         TEXT NOT NULL,
            licence_id     TEXT NOT NULL DEFAULT '',
            name           TEXT NOT NULL DEFAULT '',
            dor            TEXT NOT NULL DEFAULT '',
            issue          TEXT NOT NULL DEFAULT '',
            valid          TEXT NOT NULL DEFAULT '',
            spouse_partner TEXT NOT NULL DEFAULT '',
            other          TEXT NOT NULL DEFAULT '',
            success        BOOLEAN NOT NULL,
            locked         TEXT NOT NULL DEFAULT '',
            candidates     TEXT,
            created_at     TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_scans_success ON scans(success);
        CREATE INDEX IF NOT EXISTS idx_scans_source ON scans(source);
        ",
    )?;
    Ok(())
}

// ── Saving ──

/// A freshly extracted record waiting to be stored.
pub struct NewScan {
    pub source: String,
    pub record: ExtractedRecord,
    /// Candidate table as JSON, kept for diagnostics.
    pub candidates: Option<String>,
}

/// Insert scans in one transaction; returns the new row ids in input order.
pub fn save_scans(conn: &Connection, scans: &[NewScan]) -> Result<Vec<i64>> {
    let tx = conn.unchecked_transaction()?;
    let mut ids = Vec::with_capacity(scans.len());
    {
        let mut stmt = tx.prepare(
            "INSERT INTO scans
             (source, licence_id, name, dor, issue, valid, spouse_partner, other,
              success, candidates, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for s in scans {
            let r = &s.record;
            stmt.execute(rusqlite::params![
                s.source, r.id, r.name, r.dor, r.issue, r.valid, r.spouse_partner, r.other,
                r.success, s.candidates, r.created_at.to_rfc3339(),
            ])?;
            ids.push(tx.last_insert_rowid());
        }
    }
    tx.commit()?;
    Ok(ids)
}

// ── Reading ──

pub struct ScanRow {
    pub id: i64,
    pub source: String,
    pub record: ExtractedRecord,
    /// Fields a reviewer corrected by hand.
    pub locked: Vec<Field>,
}

impl ScanRow {
    /// Apply a reviewer's correction: set the field, lock it, and re-judge
    /// the record under `policy`.
    pub fn correct(&mut self, field: Field, value: &str, policy: SuccessPolicy) {
        self.record.set(field, value.trim());
        if !self.locked.contains(&field) {
            self.locked.push(field);
        }
        self.record.reassess(policy);
    }
}

const SCAN_COLUMNS: &str = "id, source, licence_id, name, dor, issue, valid, spouse_partner, other,
                            success, locked, created_at";

fn scan_from_row(row: &Row<'_>) -> rusqlite::Result<ScanRow> {
    let locked: String = row.get(10)?;
    let created_at: String = row.get(11)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(11, Type::Text, Box::new(e)))?
        .with_timezone(&Utc);
    Ok(ScanRow {
        id: row.get(0)?,
        source: row.get(1)?,
        record: ExtractedRecord {
            id: row.get(2)?,
            name: row.get(3)?,
            dor: row.get(4)?,
            issue: row.get(5)?,
            valid: row.get(6)?,
            spouse_partner: row.get(7)?,
            other: row.get(8)?,
            success: row.get(9)?,
            created_at,
        },
        locked: locked.split(',').filter_map(Field::parse).collect(),
    })
}

pub fn fetch_scans(
    conn: &Connection,
    failed_only: bool,
    limit: Option<usize>,
) -> Result<Vec<ScanRow>> {
    let sql = format!(
        "SELECT {} FROM scans{} ORDER BY id{}",
        SCAN_COLUMNS,
        if failed_only { " WHERE success = 0" } else { "" },
        match limit {
            Some(n) => format!(" LIMIT {}", n),
            None => String::new(),
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], scan_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn fetch_scan(conn: &Connection, id: i64) -> Result<Option<ScanRow>> {
    let sql = format!("SELECT {} FROM scans WHERE id = ?1", SCAN_COLUMNS);
    let row = conn.query_row(&sql, [id], scan_from_row).optional()?;
    Ok(row)
}

pub fn fetch_candidates(conn: &Connection, id: i64) -> Result<Option<String>> {
    let json: Option<Option<String>> = conn
        .query_row("SELECT candidates FROM scans WHERE id = ?1", [id], |r| r.get(0))
        .optional()?;
    Ok(json.flatten())
}

// ── Review ──

/// Persist the fields, verdict and locks of an edited scan.
pub fn update_scan(conn: &Connection, scan: &ScanRow) -> Result<()> {
    let r = &scan.record;
    let locked = scan
        .locked
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(",");
    conn.execute(
        "UPDATE scans SET licence_id = ?1, name = ?2, dor = ?3, issue = ?4, valid = ?5,
                spouse_partner = ?6, other = ?7, success = ?8, locked = ?9
         WHERE id = ?10",
        rusqlite::params![
            r.id, r.name, r.dor, r.issue, r.valid, r.spouse_partner, r.other, r.success, locked,
            scan.id,
        ],
    )?;
    Ok(())
}

// ── Stats ──

pub struct Stats {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub corrected: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let total: usize = conn.query_row("SELECT COUNT(*) FROM scans", [], |r| r.get(0))?;
    let succeeded: usize =
        conn.query_row("SELECT COUNT(*) FROM scans WHERE success = 1", [], |r| r.get(0))?;
    let corrected: usize =
        conn.query_row("SELECT COUNT(*) FROM scans WHERE locked != ''", [], |r| r.get(0))?;
    Ok(Stats {
        total,
        succeeded,
        failed: total - succeeded,
        corrected,
    })
}
