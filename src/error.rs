//! Error types for the mediaplan library.

use std::io;
use thiserror::Error;

/// Result type alias for mediaplan operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while ingesting a spreadsheet.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file name does not carry a supported spreadsheet extension.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// The bytes match neither a ZIP nor an OLE compound file container.
    #[error("Unknown file format")]
    UnknownFormat,

    /// Error reading the ZIP archive of an .xlsx workbook.
    #[error("ZIP archive error: {0}")]
    ZipArchive(String),

    /// Error parsing XML content inside an .xlsx workbook.
    #[error("XML parse error: {0}")]
    XmlParse(String),

    /// Invalid or malformed data in the workbook container.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The workbook is password protected and cannot be processed.
    #[error("Workbook is encrypted")]
    Encrypted,

    /// The first sheet has a header row but no data rows beneath it.
    #[error("No data rows found in the first sheet")]
    EmptySheet,

    /// One or more required canonical fields are absent from the first record.
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error::ZipArchive(err.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlParse(err.to_string())
    }
}
