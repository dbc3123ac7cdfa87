//! XLS decoder implementation.

use super::biff::BiffReader;
use super::cfb::CompoundFile;
use crate::error::{Error, Result};
use crate::model::{CellValue, Record};
use crate::sheet::Grid;

// BIFF8 record types
const FORMULA: u16 = 6;
const EOF: u16 = 10;
const FILE_PASS: u16 = 47;
const CODE_PAGE: u16 = 66;
const BOUND_SHEET8: u16 = 133;
const MUL_RK: u16 = 189;
const SST: u16 = 252;
const LABEL_SST: u16 = 253;
const NUMBER: u16 = 515;
const LABEL: u16 = 516;
const BOOL_ERR: u16 = 517;
const STRING: u16 = 519;
const RK: u16 = 638;
const BOF: u16 = 2057;

/// Decoder for legacy .xls workbooks.
pub struct XlsDecoder {
    reader: BiffReader,
    shared_strings: Vec<String>,
    first_sheet_offset: usize,
}

impl XlsDecoder {
    /// Create a decoder from file bytes.
    ///
    /// Extracts the `Workbook` (or `Book`) stream from the compound file
    /// and scans the workbook globals: code page, shared strings and the
    /// sheet directory. A FILEPASS record aborts with [`Error::Encrypted`].
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let cfb = CompoundFile::from_bytes(data)?;
        let stream = match cfb.stream("Workbook")? {
            Some(stream) => stream,
            None => cfb
                .stream("Book")?
                .ok_or_else(|| Error::InvalidData("no workbook stream".to_string()))?,
        };
        Self::from_workbook_stream(stream)
    }

    /// Create a decoder directly from a BIFF8 workbook stream.
    pub(crate) fn from_workbook_stream(stream: Vec<u8>) -> Result<Self> {
        let mut reader = BiffReader::new(stream);
        let mut shared_strings = Vec::new();
        let mut sheets: Vec<(usize, String)> = Vec::new();

        while let Some(kind) = reader.next()? {
            match kind {
                EOF => break,
                FILE_PASS => return Err(Error::Encrypted),
                CODE_PAGE => {
                    let code_page = reader.read_u16()?;
                    match code_page {
                        // Wide strings are decoded as UTF-16 regardless
                        1200 | 1201 => {}
                        cp => {
                            reader.encoding = codepage::to_encoding(cp).ok_or_else(|| {
                                Error::InvalidData(format!("unsupported code page {}", cp))
                            })?;
                        }
                    }
                }
                SST => shared_strings = load_shared_strings(&mut reader)?,
                BOUND_SHEET8 => {
                    let offset = reader.read_u32()? as usize;
                    reader.skip(2)?;
                    let name = reader.read_short_string()?;
                    sheets.push((offset, name));
                }
                _ => {}
            }
        }

        let (first_sheet_offset, name) = sheets
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidData("workbook has no sheets".to_string()))?;
        log::debug!("first worksheet: {}", name);

        Ok(Self {
            reader,
            shared_strings,
            first_sheet_offset,
        })
    }

    /// Decode the first sheet into an ordered sequence of records.
    pub fn decode(&mut self) -> Result<Vec<Record>> {
        self.reader.goto(self.first_sheet_offset);
        match self.reader.next()? {
            Some(BOF) => {}
            _ => return Err(Error::InvalidData("missing sheet substream".to_string())),
        }

        let mut grid = Grid::new();
        while let Some(kind) = self.reader.next()? {
            match kind {
                EOF | BOF => break,
                NUMBER => {
                    let (row, col) = self.read_cell_position()?;
                    let value = self.reader.read_f64()?;
                    grid.insert(row, col, CellValue::Number(value));
                }
                RK => {
                    let (row, col) = self.read_cell_position()?;
                    let value = self.reader.read_rk()?;
                    grid.insert(row, col, CellValue::Number(value));
                }
                MUL_RK => {
                    let size = self.reader.record_size();
                    if size < 12 {
                        continue;
                    }
                    let row = self.reader.read_u16()? as u32;
                    let first_col = self.reader.read_u16()? as u32;
                    let count = (size - 6) / 6;
                    for i in 0..count as u32 {
                        self.reader.skip(2)?;
                        let value = self.reader.read_rk()?;
                        grid.insert(row, first_col + i, CellValue::Number(value));
                    }
                }
                LABEL_SST => {
                    let (row, col) = self.read_cell_position()?;
                    let index = self.reader.read_u32()? as usize;
                    let value = match self.shared_strings.get(index) {
                        Some(text) if !text.is_empty() => CellValue::Text(text.clone()),
                        _ => CellValue::Empty,
                    };
                    grid.insert(row, col, value);
                }
                LABEL => {
                    let (row, col) = self.read_cell_position()?;
                    let text = self.reader.read_string()?;
                    if !text.is_empty() {
                        grid.insert(row, col, CellValue::Text(text));
                    }
                }
                BOOL_ERR => {
                    let (row, col) = self.read_cell_position()?;
                    let value = self.reader.read_u8()?;
                    let is_error = self.reader.read_u8()? != 0;
                    if !is_error {
                        grid.insert(row, col, CellValue::Bool(value != 0));
                    }
                }
                FORMULA => {
                    let (row, col) = self.read_cell_position()?;
                    let value = self.read_formula_result()?;
                    grid.insert(row, col, value);
                }
                _ => {}
            }
        }

        grid.into_records()
    }

    /// Read the row, column and format index prefix shared by cell records.
    fn read_cell_position(&mut self) -> Result<(u32, u32)> {
        let row = self.reader.read_u16()? as u32;
        let col = self.reader.read_u16()? as u32;
        self.reader.skip(2)?; // ixfe
        Ok((row, col))
    }

    /// Interpret a FORMULA record's cached result.
    ///
    /// Numeric results are stored as the f64 itself; other kinds set the
    /// top two bytes to FF FF and tag the low byte. String results spill
    /// into a STRING record that immediately follows.
    fn read_formula_result(&mut self) -> Result<CellValue> {
        let result = self.reader.read_u64()?;
        if result & 0xFFFF_0000_0000_0000 != 0xFFFF_0000_0000_0000 {
            return Ok(CellValue::Number(f64::from_bits(result)));
        }
        match result & 0xFF {
            0 => match self.reader.next()? {
                Some(STRING) => {
                    let text = self.reader.read_string()?;
                    if text.is_empty() {
                        Ok(CellValue::Empty)
                    } else {
                        Ok(CellValue::Text(text))
                    }
                }
                _ => Err(Error::InvalidData(
                    "formula string result missing".to_string(),
                )),
            },
            1 => Ok(CellValue::Bool(result & 0xFF_0000 != 0)),
            // Error results and cached empty strings
            2 | 3 => Ok(CellValue::Empty),
            tag => Err(Error::InvalidData(format!(
                "unknown formula result tag {}",
                tag
            ))),
        }
    }
}

/// Load the shared string table from an SST record.
fn load_shared_strings(reader: &mut BiffReader) -> Result<Vec<String>> {
    reader.skip(4)?; // total reference count
    let unique = reader.read_u32()? as usize;
    let mut strings = Vec::with_capacity(unique.min(1 << 16));
    for _ in 0..unique {
        strings.push(reader.read_rich_string()?);
    }
    Ok(strings)
}
