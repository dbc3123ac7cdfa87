//! XLSX decoder implementation.

use super::container::WorkbookArchive;
use super::shared_strings::SharedStrings;
use crate::error::{Error, Result};
use crate::model::{CellValue, Record};
use crate::sheet::Grid;
use quick_xml::events::Event;
use std::collections::HashMap;

/// Decoder for .xlsx workbooks.
pub struct XlsxDecoder {
    archive: WorkbookArchive,
    shared_strings: SharedStrings,
    sheet_path: String,
}

impl XlsxDecoder {
    /// Create a decoder from workbook bytes.
    ///
    /// Loads the shared strings table and resolves the worksheet part of
    /// the first sheet listed in `xl/workbook.xml`.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let archive = WorkbookArchive::from_bytes(data)?;

        let shared_strings = if archive.exists("xl/sharedStrings.xml") {
            SharedStrings::parse(&archive.read_xml("xl/sharedStrings.xml")?)?
        } else {
            SharedStrings::default()
        };

        let relationships = parse_workbook_rels(&archive)?;
        let sheet_path = first_sheet_path(&archive, &relationships)?;
        log::debug!("first worksheet part: {}", sheet_path);

        Ok(Self {
            archive,
            shared_strings,
            sheet_path,
        })
    }

    /// Decode the first sheet into an ordered sequence of records.
    pub fn decode(&self) -> Result<Vec<Record>> {
        let xml = self.archive.read_xml(&self.sheet_path)?;
        let grid = self.parse_sheet(&xml)?;
        grid.into_records()
    }

    /// Parse worksheet XML into a cell grid.
    fn parse_sheet(&self, xml: &str) -> Result<Grid> {
        let mut grid = Grid::new();
        let mut reader = quick_xml::Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut buf = Vec::new();
        let mut row: u32 = 0;
        let mut next_row: u32 = 0;
        let mut col: u32 = 0;
        let mut next_col: u32 = 0;
        let mut in_cell = false;
        let mut in_value = false;
        let mut cell_type: Option<String> = None;
        let mut cell_value = String::new();
        let mut has_value = false;

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(ref e)) => match e.name().as_ref() {
                    b"row" => {
                        row = row_index(e)?.unwrap_or(next_row);
                        next_row = row + 1;
                        next_col = 0;
                    }
                    b"c" => {
                        if let Some((r, c)) = cell_ref(e)? {
                            row = r;
                            col = c;
                        } else {
                            col = next_col;
                        }
                        next_col = col + 1;
                        in_cell = true;
                        has_value = false;
                        cell_type = cell_type_attr(e);
                        cell_value.clear();
                    }
                    b"v" | b"t" if in_cell => in_value = true,
                    _ => {}
                },
                // Self-closing rows and cells carry no value; they only
                // advance the sequential position fallback.
                Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                    b"row" => {
                        row = row_index(e)?.unwrap_or(next_row);
                        next_row = row + 1;
                        next_col = 0;
                    }
                    b"c" => {
                        if let Some((_, c)) = cell_ref(e)? {
                            col = c;
                        } else {
                            col = next_col;
                        }
                        next_col = col + 1;
                    }
                    _ => {}
                },
                Ok(Event::Text(ref e)) => {
                    if in_value {
                        cell_value.push_str(&e.unescape().unwrap_or_default());
                        has_value = true;
                    }
                }
                Ok(Event::End(ref e)) => match e.name().as_ref() {
                    b"c" => {
                        if has_value {
                            let value =
                                self.resolve_cell_value(&cell_value, cell_type.as_deref());
                            grid.insert(row, col, value);
                        }
                        in_cell = false;
                    }
                    b"v" | b"t" => in_value = false,
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::XmlParse(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        Ok(grid)
    }

    /// Resolve a cell's raw text into a typed value based on the `t` attribute.
    fn resolve_cell_value(&self, raw: &str, cell_type: Option<&str>) -> CellValue {
        match cell_type {
            Some("s") => {
                // Shared string index
                let text = raw
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| self.shared_strings.get(idx))
                    .unwrap_or("");
                if text.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(text.to_string())
                }
            }
            Some("b") => CellValue::Bool(raw == "1"),
            // Error cells carry no usable value
            Some("e") => CellValue::Empty,
            Some("str") | Some("inlineStr") => {
                if raw.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(raw.to_string())
                }
            }
            _ => {
                if raw.is_empty() {
                    CellValue::Empty
                } else if let Ok(n) = raw.parse::<f64>() {
                    CellValue::Number(n)
                } else {
                    CellValue::Text(raw.to_string())
                }
            }
        }
    }
}

/// Parse `xl/_rels/workbook.xml.rels` into an Id → Target map.
fn parse_workbook_rels(archive: &WorkbookArchive) -> Result<HashMap<String, String>> {
    let mut rels = HashMap::new();

    if let Ok(xml) = archive.read_xml("xl/_rels/workbook.xml.rels") {
        let mut reader = quick_xml::Reader::from_str(&xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                    if e.name().as_ref() == b"Relationship" {
                        let mut id = String::new();
                        let mut target = String::new();
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"Id" => id = String::from_utf8_lossy(&attr.value).to_string(),
                                b"Target" => {
                                    target = String::from_utf8_lossy(&attr.value).to_string()
                                }
                                _ => {}
                            }
                        }
                        if !id.is_empty() && !target.is_empty() {
                            rels.insert(id, target);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(Error::XmlParse(e.to_string())),
                _ => {}
            }
            buf.clear();
        }
    }

    Ok(rels)
}

/// Resolve the worksheet part path of the first sheet in `xl/workbook.xml`.
fn first_sheet_path(
    archive: &WorkbookArchive,
    relationships: &HashMap<String, String>,
) -> Result<String> {
    let xml = archive.read_xml("xl/workbook.xml")?;
    let mut reader = quick_xml::Reader::from_str(&xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut first_rel_id: Option<String> = None;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) => {
                if e.name().as_ref() == b"sheet" && first_rel_id.is_none() {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"r:id" {
                            first_rel_id =
                                Some(String::from_utf8_lossy(&attr.value).to_string());
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::XmlParse(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    let rel_id =
        first_rel_id.ok_or_else(|| Error::InvalidData("workbook has no sheets".to_string()))?;

    Ok(match relationships.get(&rel_id) {
        Some(target) if target.starts_with('/') => target[1..].to_string(),
        Some(target) => format!("xl/{}", target),
        // Producers that skip the .rels part still use the default layout
        None => "xl/worksheets/sheet1.xml".to_string(),
    })
}

/// Extract the 0-based row index from a `<row r="..">` attribute.
fn row_index(e: &quick_xml::events::BytesStart<'_>) -> Result<Option<u32>> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"r" {
            let text = String::from_utf8_lossy(&attr.value);
            let index = text
                .parse::<u32>()
                .map_err(|_| Error::XmlParse(format!("bad row reference: {}", text)))?;
            return Ok(Some(index.saturating_sub(1)));
        }
    }
    Ok(None)
}

/// Extract the `t` attribute of a `<c>` element.
fn cell_type_attr(e: &quick_xml::events::BytesStart<'_>) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"t" {
            return Some(String::from_utf8_lossy(&attr.value).to_string());
        }
    }
    None
}

/// Parse an A1-style cell reference from a `<c r="..">` attribute into
/// 0-based `(row, column)` indexes.
fn cell_ref(e: &quick_xml::events::BytesStart<'_>) -> Result<Option<(u32, u32)>> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == b"r" {
            let text = String::from_utf8_lossy(&attr.value);
            return match parse_cell_ref(&text) {
                Some(pair) => Ok(Some(pair)),
                None => Err(Error::XmlParse(format!("bad cell reference: {}", text))),
            };
        }
    }
    Ok(None)
}

fn parse_cell_ref(reference: &str) -> Option<(u32, u32)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }

    let mut col: u32 = 0;
    for c in letters.chars() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        col = col.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)?;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}
