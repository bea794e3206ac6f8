//! Field extraction for OCR'd family season licences.
//!
//! [`parser::extract`] turns raw OCR text into an [`parser::record::ExtractedRecord`]
//! plus the candidate table behind it. [`db`] and [`export`] are the thin
//! storage and CSV layers the command-line tool builds on.

pub mod db;
pub mod export;
pub mod parser;
