//! Column label canonicalization.
//!
//! Media-plan spreadsheets arrive with headers typed by hand: `"Praça"`,
//! `"veiculo "`, `"Mês"`. Canonicalization folds all of those onto the
//! accent-free, upper-case, trimmed form the schema check matches against.

use crate::model::Record;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Canonicalize a column label.
///
/// Applies NFD decomposition, drops combining marks, upper-cases and trims.
/// Total and deterministic for every input string, the empty string
/// included, and idempotent: a canonical label maps to itself.
///
/// # Example
///
/// ```
/// use mediaplan::normalize::canonicalize;
///
/// assert_eq!(canonicalize("Praça"), "PRACA");
/// assert_eq!(canonicalize(" veiculo "), "VEICULO");
/// ```
pub fn canonicalize(label: &str) -> String {
    let stripped: String = label.nfd().filter(|c| !is_combining_mark(*c)).collect();
    stripped.to_uppercase().trim().to_string()
}

/// Rewrite every record's keys into canonical form.
///
/// Values are carried over untouched and row order is preserved; the output
/// has the same length as the input. When two original labels collide on
/// the same canonical key within one record, the later column's value wins
/// (see [`Record::insert`]).
pub fn normalize_records(records: Vec<Record>) -> Vec<Record> {
    records
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .map(|(key, value)| (canonicalize(&key), value))
                .collect()
        })
        .collect()
}
