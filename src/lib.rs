//! # mediaplan
//!
//! Media-plan spreadsheet ingestion: decode an uploaded .xlsx or .xls
//! workbook, canonicalize its column labels and validate that the plan
//! carries the required columns, producing row records ready for
//! downstream use.
//!
//! ## Quick Start
//!
//! ```no_run
//! use mediaplan::{ingest_file, IngestionOutcome};
//!
//! match ingest_file("plano-de-midia.xlsx") {
//!     IngestionOutcome::Accepted(records) => {
//!         println!("{} linhas", records.len());
//!         println!("{}", serde_json::to_string_pretty(&records)?);
//!     }
//!     IngestionOutcome::Rejected(why) => eprintln!("{}", why.message()),
//! }
//! # Ok::<(), serde_json::Error>(())
//! ```
//!
//! ## Lower-level APIs
//!
//! ```no_run
//! use mediaplan::{decode_records, normalize::normalize_records};
//!
//! // Raw records, labels as they appear in the sheet
//! let data = std::fs::read("plano.xlsx")?;
//! let records = decode_records(&data)?;
//!
//! // Canonical labels: accents stripped, uppercased, trimmed
//! let records = normalize_records(records);
//! # Ok::<(), mediaplan::Error>(())
//! ```
//!
//! ## Features
//!
//! - `xlsx` (default): Office Open XML workbook support
//! - `xls` (default): legacy BIFF8 workbook support
//! - `async`: async file ingestion with Tokio

pub mod detect;
pub mod error;
pub mod model;
pub mod normalize;
pub mod pipeline;
pub mod schema;

mod sheet;

#[cfg(feature = "xlsx")]
pub mod xlsx;

#[cfg(feature = "xls")]
pub mod xls;

// Re-exports
pub use detect::{detect_format_from_bytes, is_supported_filename, FileKind};
pub use error::{Error, Result};
pub use model::{CellValue, Record};
pub use pipeline::{ingest_bytes, ingest_file, IngestionOutcome, Rejection};
pub use schema::REQUIRED_FIELDS;

#[cfg(feature = "async")]
pub use pipeline::ingest_file_async;

/// Decode workbook bytes into raw records from the first sheet.
///
/// The container format is detected from the bytes, not from any file
/// name. Labels come back exactly as they appear in the header row; use
/// [`normalize::normalize_records`] to canonicalize them.
///
/// # Example
///
/// ```no_run
/// use mediaplan::decode_records;
///
/// let data = std::fs::read("plano.xlsx")?;
/// let records = decode_records(&data)?;
/// println!("{} linhas", records.len());
/// # Ok::<(), mediaplan::Error>(())
/// ```
pub fn decode_records(data: &[u8]) -> Result<Vec<Record>> {
    let kind = detect_format_from_bytes(data)?;

    match kind {
        #[cfg(feature = "xlsx")]
        FileKind::Xlsx => xlsx::XlsxDecoder::from_bytes(data.to_vec())?.decode(),
        #[cfg(feature = "xls")]
        FileKind::Xls => xls::XlsDecoder::from_bytes(data)?.decode(),
        #[cfg(not(all(feature = "xlsx", feature = "xls")))]
        _ => Err(Error::UnsupportedFileType(kind.extension().to_string())),
    }
}
