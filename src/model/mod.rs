//! Tabular data model for ingested spreadsheets.
//!
//! This module defines the format-agnostic structures produced by the
//! decoders: a closed cell value type and an insertion-ordered record.
//! Both the raw (as-authored) and the normalized record roles are carried
//! by the same [`Record`] type; only the keys differ.

mod record;
mod value;

pub use record::*;
pub use value::*;
