//! Container format detection for spreadsheet files.

use crate::error::{Error, Result};

/// ZIP file magic bytes: PK\x03\x04
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// OLE compound file magic bytes.
const CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Detected spreadsheet container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Office Open XML workbook (.xlsx)
    Xlsx,
    /// Legacy BIFF8 workbook (.xls)
    Xls,
}

impl FileKind {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Xlsx => "xlsx",
            FileKind::Xls => "xls",
        }
    }

    /// Returns a human-readable name for this format.
    pub fn name(&self) -> &'static str {
        match self {
            FileKind::Xlsx => "Excel Workbook",
            FileKind::Xls => "Excel 97-2003 Workbook",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the container format from a byte slice.
///
/// An .xlsx workbook is a ZIP archive; a legacy .xls workbook is an OLE
/// compound file. Anything else is reported as [`Error::UnknownFormat`].
///
/// # Example
///
/// ```no_run
/// use mediaplan::detect::detect_format_from_bytes;
///
/// let data = std::fs::read("plan.xlsx")?;
/// let kind = detect_format_from_bytes(&data)?;
/// println!("Detected format: {}", kind);
/// # Ok::<(), mediaplan::Error>(())
/// ```
pub fn detect_format_from_bytes(data: &[u8]) -> Result<FileKind> {
    if data.len() >= 4 && data[..4] == ZIP_MAGIC {
        return Ok(FileKind::Xlsx);
    }
    if data.len() >= 8 && data[..8] == CFB_MAGIC {
        return Ok(FileKind::Xls);
    }
    Err(Error::UnknownFormat)
}

/// Check whether a file name carries a supported spreadsheet extension.
///
/// The comparison is ASCII-case-insensitive, so `PLAN.XLSX` is accepted.
/// File-level entry points use this before any bytes are read; the decoders
/// themselves only look at the content.
pub fn is_supported_filename(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".xlsx") || lower.ends_with(".xls")
}
