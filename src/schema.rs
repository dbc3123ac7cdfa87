//! Required-field validation.

use crate::error::{Error, Result};
use crate::model::Record;

/// Canonical fields every media plan must carry, in reporting order.
pub const REQUIRED_FIELDS: [&str; 5] = ["CAMPANHA", "PRACA", "MEIO", "VEICULO", "MES"];

/// Validate that the required fields are present.
///
/// Only the first record's key set is inspected; the header row defines
/// one column set for the whole sheet, so row 0 stands in for all rows.
/// Presence means the key exists — an empty value still counts. All
/// missing fields are reported together, in [`REQUIRED_FIELDS`] order.
pub fn validate_required(records: &[Record]) -> Result<()> {
    let first = records.first().ok_or(Error::EmptySheet)?;
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !first.contains_key(field))
        .map(|field| field.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingFields(missing))
    }
}
