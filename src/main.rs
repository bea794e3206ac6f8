use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use licence_scan::parser::candidates::Field;
use licence_scan::parser::record::SuccessPolicy;
use licence_scan::parser::{self, Clock, ExtractOptions, Extraction};
use licence_scan::{db, export};

#[derive(Parser)]
#[command(name = "licence_scan", about = "Extract family season licence fields from OCR text")]
struct Cli {
    /// SQLite database for stored scans
    #[arg(long, global = true, env = "LICENCE_SCAN_DB", default_value = db::DEFAULT_DB_PATH)]
    db: PathBuf,

    /// Also require the licence id for a scan to count as a success
    #[arg(long, global = true)]
    require_id: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract one OCR text file ("-" reads stdin) and print the record as JSON
    Extract {
        path: PathBuf,
        /// Print the full candidate table as well
        #[arg(long)]
        candidates: bool,
        /// Store the record in the database
        #[arg(long)]
        save: bool,
    },
    /// Extract every *.txt file in a directory and store the records
    Scan {
        dir: PathBuf,
        /// Max files to process (default: all)
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Stored scans overview table
    List {
        /// Only scans that failed the success check
        #[arg(long)]
        failed: bool,
        /// Max rows to display
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
    /// Print the candidate table stored with a scan
    Show { id: i64 },
    /// Correct one field of a stored scan and lock it
    Correct {
        id: i64,
        /// id, name, dor, issue, valid, spousePartner or other
        field: String,
        value: String,
    },
    /// Write stored scans to a CSV file
    Export {
        out: PathBuf,
        /// Only scans that failed the success check
        #[arg(long)]
        failed: bool,
    },
    /// Show scan statistics
    Stats,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let options = ExtractOptions {
        policy: if cli.require_id {
            SuccessPolicy::RequireId
        } else {
            SuccessPolicy::Canonical
        },
        clock: None,
    };

    let result = match cli.command {
        Commands::Extract {
            path,
            candidates,
            save,
        } => {
            let text = read_input(&path)?;
            let x = parser::extract_with(&text, &options);
            if candidates {
                println!("{}", serde_json::to_string_pretty(&x)?);
            } else {
                println!("{}", serde_json::to_string_pretty(&x.record)?);
            }
            if save {
                let conn = db::connect(&cli.db)?;
                db::init_schema(&conn)?;
                let source = path.display().to_string();
                let ids = db::save_scans(&conn, &[new_scan(source, x)?])?;
                info!(id = ids[0], "saved scan");
            }
            Ok(())
        }
        Commands::Scan { dir, limit } => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let mut files = list_text_files(&dir)?;
            if let Some(n) = limit {
                files.truncate(n);
            }
            if files.is_empty() {
                println!("No .txt files in {}.", dir.display());
                return Ok(());
            }
            println!("Scanning {} files...", files.len());
            let counts = scan_files(&conn, &files, &options)?;
            counts.print();
            Ok(())
        }
        Commands::List { failed, limit } => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_scans(&conn, failed, Some(limit))?;
            if rows.is_empty() {
                println!("No scans found.");
                return Ok(());
            }

            println!(
                "{:>4} | {:<9} | {:<20} | {:<10} | {:<10} | {:<23} | {:<16} | {:<3}",
                "#", "Id", "Name", "DOR", "Issue", "Valid", "Spouse/Partner", "OK"
            );
            println!("{}", "-".repeat(114));
            for s in &rows {
                let r = &s.record;
                println!(
                    "{:>4} | {:<9} | {:<20} | {:<10} | {:<10} | {:<23} | {:<16} | {:<3}",
                    s.id,
                    truncate(&r.id, 9),
                    truncate(&r.name, 20),
                    truncate(&r.dor, 10),
                    truncate(&r.issue, 10),
                    truncate(&r.valid, 23),
                    truncate(&r.spouse_partner, 16),
                    if r.success { "yes" } else { "no" },
                );
            }

            let with_other: Vec<_> = rows.iter().filter(|s| !s.record.other.is_empty()).collect();
            if !with_other.is_empty() {
                println!("\n--- Other ---");
                for s in &with_other {
                    println!("  {}: {}", s.id, s.record.other);
                }
            }

            println!("\n{} scans", rows.len());
            Ok(())
        }
        Commands::Show { id } => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            match db::fetch_candidates(&conn, id)? {
                Some(json) => {
                    let value: serde_json::Value = serde_json::from_str(&json)?;
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                None => println!("No candidates stored for scan {}.", id),
            }
            Ok(())
        }
        Commands::Correct { id, field, value } => {
            let Some(field) = Field::parse(&field) else {
                bail!("Unknown field '{}'", field);
            };
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let mut scan = db::fetch_scan(&conn, id)?
                .with_context(|| format!("No scan with id {}", id))?;
            scan.correct(field, &value, options.policy);
            db::update_scan(&conn, &scan)?;
            info!(id, %field, success = scan.record.success, "corrected scan");
            println!("{}", serde_json::to_string_pretty(&scan.record)?);
            Ok(())
        }
        Commands::Export { out, failed } => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let rows = db::fetch_scans(&conn, failed, None)?;
            let n = export::export_csv(&out, &rows)?;
            println!("Exported {} scans to {}", n, out.display());
            Ok(())
        }
        Commands::Stats => {
            let conn = db::connect(&cli.db)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Total:     {}", s.total);
            println!("Succeeded: {}", s.succeeded);
            println!("Failed:    {}", s.failed);
            println!("Corrected: {}", s.corrected);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn list_text_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to list {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e.eq_ignore_ascii_case("txt")) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn new_scan(source: String, x: Extraction) -> anyhow::Result<db::NewScan> {
    Ok(db::NewScan {
        source,
        candidates: Some(serde_json::to_string(&x.candidates)?),
        record: x.record,
    })
}

struct ScanCounts {
    scanned: usize,
    succeeded: usize,
    unreadable: usize,
}

impl ScanCounts {
    fn print(&self) {
        println!(
            "Saved {} scans ({} succeeded, {} failed), {} unreadable.",
            self.scanned,
            self.succeeded,
            self.scanned - self.succeeded,
            self.unreadable,
        );
    }
}

fn scan_files(
    conn: &rusqlite::Connection,
    files: &[PathBuf],
    options: &ExtractOptions,
) -> anyhow::Result<ScanCounts> {
    use indicatif::{ProgressBar, ProgressStyle};
    use rayon::prelude::*;

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")?
            .progress_chars("#>-"),
    );

    let mut counts = ScanCounts {
        scanned: 0,
        succeeded: 0,
        unreadable: 0,
    };
    // One clock for the whole batch so every record shares a stamp.
    let options = ExtractOptions {
        clock: Some(options.clock.unwrap_or_else(Clock::system)),
        ..*options
    };

    for chunk in files.chunks(500) {
        let results: Vec<_> = chunk
            .par_iter()
            .map(|path| -> anyhow::Result<(&PathBuf, Extraction)> {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok((path, parser::extract_with(&text, &options)))
            })
            .collect();

        let mut scans = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok((path, x)) => {
                    counts.scanned += 1;
                    if x.record.success {
                        counts.succeeded += 1;
                    }
                    scans.push(new_scan(path.display().to_string(), x)?);
                }
                Err(e) => {
                    counts.unreadable += 1;
                    warn!("{:#}", e);
                }
            }
        }

        db::save_scans(conn, &scans)?;
        pb.inc(chunk.len() as u64);
    }

    pb.finish_and_clear();
    info!(scanned = counts.scanned, succeeded = counts.succeeded, "batch complete");
    Ok(counts)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_width() {
        assert_eq!(truncate("John Smith", 20), "John Smith");
        assert_eq!(truncate("01/10/2024 - 30/09/2025", 10), "01/10/2...");
        assert_eq!(truncate("01/10/2024 - 30/09/2025", 10).chars().count(), 10);
    }

    #[test]
    fn text_files_are_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.TXT", "c.png"] {
            std::fs::write(dir.path().join(name), "NAME John Smith").unwrap();
        }
        let files = list_text_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.TXT", "b.txt"]);
    }

    #[test]
    fn batch_scan_stores_every_readable_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("full.txt"),
            "NAME John Smith\nDOR 01/01/1990\nISSUE 01/01/2024\nVALID 01/01/2025",
        )
        .unwrap();
        std::fs::write(dir.path().join("partial.txt"), "NAME Amy Smith").unwrap();

        let conn = rusqlite::Connection::open_in_memory().unwrap();
        db::init_schema(&conn).unwrap();
        let files = list_text_files(dir.path()).unwrap();
        let counts = scan_files(&conn, &files, &ExtractOptions::default()).unwrap();
        assert_eq!(counts.scanned, 2);
        assert_eq!(counts.succeeded, 1);
        assert_eq!(counts.unreadable, 0);

        let stats = db::get_stats(&conn).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.failed, 1);
    }
}
