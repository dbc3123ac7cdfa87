//! Decoder for Office Open XML (.xlsx) workbooks.
//!
//! Only the first sheet by storage order is consulted; everything else in
//! the package (styles, metadata, further sheets) is ignored.
//!
//! # Example
//!
//! ```no_run
//! use mediaplan::xlsx::XlsxDecoder;
//!
//! let data = std::fs::read("plan.xlsx")?;
//! let records = XlsxDecoder::from_bytes(data)?.decode()?;
//! println!("{} rows", records.len());
//! # Ok::<(), mediaplan::Error>(())
//! ```

mod container;
mod decoder;
mod shared_strings;

pub use container::WorkbookArchive;
pub use decoder::XlsxDecoder;
pub use shared_strings::SharedStrings;
