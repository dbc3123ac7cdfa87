//! Ingestion pipeline: decode, normalize, validate.
//!
//! The pipeline is the one entry point UI code should call. It never
//! returns an error; every failure collapses into a
//! [`Rejection`] carried by [`IngestionOutcome::Rejected`], with a
//! user-presentable message.

use crate::error::Error;
use crate::model::Record;
use crate::normalize::normalize_records;
use crate::schema::validate_required;
use std::path::Path;

/// Why an upload was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The file name does not end in a supported extension.
    UnsupportedFileType,
    /// The bytes could not be read or decoded as a workbook.
    InvalidFile,
    /// The first sheet has no data rows below the header.
    NoData,
    /// Required columns are absent, in canonical form.
    MissingFields(Vec<String>),
}

impl Rejection {
    /// User-presentable reason, suitable for showing verbatim.
    pub fn message(&self) -> String {
        match self {
            Rejection::UnsupportedFileType => {
                "Por favor, envie um arquivo .xlsx ou .xls".to_string()
            }
            Rejection::InvalidFile => "Erro ao processar o arquivo.".to_string(),
            Rejection::NoData => "Nenhum dado encontrado no arquivo.".to_string(),
            Rejection::MissingFields(fields) => {
                format!("Campos obrigatórios ausentes: {}", fields.join(", "))
            }
        }
    }
}

impl From<Error> for Rejection {
    fn from(err: Error) -> Self {
        match err {
            Error::UnsupportedFileType(_) => Rejection::UnsupportedFileType,
            Error::EmptySheet => Rejection::NoData,
            Error::MissingFields(fields) => Rejection::MissingFields(fields),
            Error::Io(_)
            | Error::UnknownFormat
            | Error::ZipArchive(_)
            | Error::XmlParse(_)
            | Error::InvalidData(_)
            | Error::Encrypted => Rejection::InvalidFile,
        }
    }
}

/// Result of one ingestion attempt. Exactly one variant per invocation;
/// there are no partial results.
#[derive(Debug)]
pub enum IngestionOutcome {
    /// At least one normalized, validated record.
    Accepted(Vec<Record>),
    Rejected(Rejection),
}

impl IngestionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestionOutcome::Accepted(_))
    }

    /// The accepted records, if any.
    pub fn records(&self) -> Option<&[Record]> {
        match self {
            IngestionOutcome::Accepted(records) => Some(records),
            IngestionOutcome::Rejected(_) => None,
        }
    }
}

/// Run the full pipeline over workbook bytes.
///
/// # Example
///
/// ```no_run
/// use mediaplan::{ingest_bytes, IngestionOutcome};
///
/// let data = std::fs::read("plan.xlsx")?;
/// match ingest_bytes(&data) {
///     IngestionOutcome::Accepted(records) => println!("{} rows", records.len()),
///     IngestionOutcome::Rejected(why) => eprintln!("{}", why.message()),
/// }
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn ingest_bytes(data: &[u8]) -> IngestionOutcome {
    match ingest_inner(data) {
        Ok(records) => IngestionOutcome::Accepted(records),
        Err(err) => {
            log::debug!("ingestion rejected: {}", err);
            IngestionOutcome::Rejected(err.into())
        }
    }
}

fn ingest_inner(data: &[u8]) -> crate::error::Result<Vec<Record>> {
    let records = crate::decode_records(data)?;
    let records = normalize_records(records);
    validate_required(&records)?;
    Ok(records)
}

/// Ingest a workbook file from disk.
///
/// The file name is gated first: anything not ending in `.xlsx` or
/// `.xls` is rejected before the bytes are read.
pub fn ingest_file(path: impl AsRef<Path>) -> IngestionOutcome {
    let path = path.as_ref();
    if !has_supported_name(path) {
        return IngestionOutcome::Rejected(Rejection::UnsupportedFileType);
    }
    match std::fs::read(path) {
        Ok(data) => ingest_bytes(&data),
        Err(err) => {
            log::debug!("read failed for {}: {}", path.display(), err);
            IngestionOutcome::Rejected(Rejection::InvalidFile)
        }
    }
}

/// Async variant of [`ingest_file`].
#[cfg(feature = "async")]
pub async fn ingest_file_async(path: impl AsRef<Path>) -> IngestionOutcome {
    let path = path.as_ref();
    if !has_supported_name(path) {
        return IngestionOutcome::Rejected(Rejection::UnsupportedFileType);
    }
    match tokio::fs::read(path).await {
        Ok(data) => ingest_bytes(&data),
        Err(err) => {
            log::debug!("read failed for {}: {}", path.display(), err);
            IngestionOutcome::Rejected(Rejection::InvalidFile)
        }
    }
}

fn has_supported_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(crate::detect::is_supported_filename)
}
