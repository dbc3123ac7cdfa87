//! Conversion of decoded cells into records.
//!
//! Both decoders feed their cells into a [`Grid`] and share the same
//! header policy: the first row with any non-empty cell supplies the
//! column labels, and every later row becomes one [`Record`].

use crate::error::{Error, Result};
use crate::model::{CellValue, Record};
use std::collections::BTreeMap;

/// Sparse cell store keyed by `(row, column)`.
///
/// BTreeMap iteration order is row-major, so rows come out in sheet order
/// regardless of the order the decoder discovered the cells in.
#[derive(Debug, Default)]
pub(crate) struct Grid {
    cells: BTreeMap<(u32, u32), CellValue>,
}

impl Grid {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Store a cell. Empty values are kept out of the grid; absence and
    /// blankness are the same thing downstream.
    pub(crate) fn insert(&mut self, row: u32, col: u32, value: CellValue) {
        if !value.is_empty() {
            self.cells.insert((row, col), value);
        }
    }

    /// Convert the grid into an ordered sequence of records.
    ///
    /// The first non-empty row is the header. Columns whose header cell is
    /// blank carry no label and are dropped. Each subsequent row maps every
    /// header label to that row's cell in the same column, with
    /// [`CellValue::Empty`] standing in for absent cells. Rows that are
    /// blank across all labeled columns are skipped.
    ///
    /// Fails with [`Error::EmptySheet`] when no data rows remain, including
    /// the completely blank sheet: an upload is never accepted as zero
    /// records.
    pub(crate) fn into_records(self) -> Result<Vec<Record>> {
        let mut rows: BTreeMap<u32, Vec<(u32, CellValue)>> = BTreeMap::new();
        for ((row, col), value) in self.cells {
            rows.entry(row).or_default().push((col, value));
        }

        let mut rows = rows.into_iter();
        let header: Vec<(u32, String)> = match rows.next() {
            Some((_, cells)) => cells
                .into_iter()
                .map(|(col, value)| (col, value.to_label()))
                .filter(|(_, label)| !label.is_empty())
                .collect(),
            None => return Err(Error::EmptySheet),
        };

        let mut records = Vec::new();
        for (_, cells) in rows {
            let mut record = Record::with_capacity(header.len());
            for (col, label) in &header {
                let value = cells
                    .iter()
                    .find(|(c, _)| c == col)
                    .map(|(_, v)| v.clone())
                    .unwrap_or(CellValue::Empty);
                record.insert(label.clone(), value);
            }
            if !record.is_blank() {
                records.push(record);
            }
        }

        if records.is_empty() {
            return Err(Error::EmptySheet);
        }

        log::debug!(
            "decoded {} records over {} columns",
            records.len(),
            header.len()
        );
        Ok(records)
    }
}
