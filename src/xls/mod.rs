//! Decoder for legacy BIFF8 (.xls) workbooks.
//!
//! The container is an OLE compound file; cell data lives in BIFF8
//! records inside the `Workbook` stream. As with the .xlsx decoder, only
//! the first sheet is consulted.
//!
//! # Example
//!
//! ```no_run
//! use mediaplan::xls::XlsDecoder;
//!
//! let data = std::fs::read("plan.xls")?;
//! let records = XlsDecoder::from_bytes(&data)?.decode()?;
//! println!("{} rows", records.len());
//! # Ok::<(), mediaplan::Error>(())
//! ```

mod biff;
mod cfb;
mod decoder;

pub use decoder::XlsDecoder;
