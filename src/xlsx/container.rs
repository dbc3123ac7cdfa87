//! ZIP container abstraction for .xlsx workbooks.

use crate::error::{Error, Result};
use std::cell::RefCell;
use std::io::{Cursor, Read};

/// ZIP archive wrapper over an .xlsx workbook's bytes.
pub struct WorkbookArchive {
    archive: RefCell<zip::ZipArchive<Cursor<Vec<u8>>>>,
}

impl WorkbookArchive {
    /// Open a workbook archive from a byte vector.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let archive = zip::ZipArchive::new(Cursor::new(data))?;
        Ok(Self {
            archive: RefCell::new(archive),
        })
    }

    /// Read an XML part from the archive as a string.
    ///
    /// Handles UTF-8 (with or without BOM) and UTF-16 LE/BE (with BOM).
    pub fn read_xml(&self, path: &str) -> Result<String> {
        let mut archive = self.archive.borrow_mut();
        let mut part = archive
            .by_name(path)
            .map_err(|_| Error::ZipArchive(format!("missing part: {}", path)))?;

        let mut bytes = Vec::new();
        part.read_to_end(&mut bytes)?;
        decode_xml_bytes(&bytes)
    }

    /// Check if a part exists in the archive.
    pub fn exists(&self, path: &str) -> bool {
        self.archive.borrow().file_names().any(|n| n == path)
    }
}

/// Decode XML bytes handling different encodings.
///
/// OOXML parts are typically UTF-8, but non-standard producers sometimes
/// emit UTF-16.
pub fn decode_xml_bytes(bytes: &[u8]) -> Result<String> {
    if bytes.len() >= 3 && bytes[..3] == [0xEF, 0xBB, 0xBF] {
        // UTF-8 BOM
        return String::from_utf8(bytes[3..].to_vec())
            .map_err(|e| Error::XmlParse(e.to_string()));
    }
    if bytes.len() >= 2 && bytes[..2] == [0xFF, 0xFE] {
        // UTF-16 LE BOM
        return decode_utf16(&bytes[2..], u16::from_le_bytes);
    }
    if bytes.len() >= 2 && bytes[..2] == [0xFE, 0xFF] {
        // UTF-16 BE BOM
        return decode_utf16(&bytes[2..], u16::from_be_bytes);
    }

    String::from_utf8(bytes.to_vec()).map_err(|e| Error::XmlParse(e.to_string()))
}

fn decode_utf16(bytes: &[u8], combine: fn([u8; 2]) -> u16) -> Result<String> {
    let len = bytes.len() & !1;
    let units = (0..len).step_by(2).map(|i| combine([bytes[i], bytes[i + 1]]));
    let content = char::decode_utf16(units)
        .collect::<std::result::Result<String, _>>()
        .map_err(|e| Error::XmlParse(e.to_string()))?;
    // The declaration still names UTF-16; quick-xml would choke on it now
    // that the content is a Rust string.
    Ok(fix_xml_encoding_declaration(&content))
}

/// Rewrite a UTF-16 XML encoding declaration to UTF-8 after decoding.
fn fix_xml_encoding_declaration(content: &str) -> String {
    if let Some(end) = content.find("?>") {
        if content.starts_with("<?xml") {
            let decl = content[..end + 2]
                .replace("encoding=\"UTF-16\"", "encoding=\"UTF-8\"")
                .replace("encoding='UTF-16'", "encoding='UTF-8'")
                .replace("encoding=\"utf-16\"", "encoding=\"UTF-8\"")
                .replace("encoding='utf-16'", "encoding='UTF-8'");
            return format!("{}{}", decl, &content[end + 2..]);
        }
    }
    content.to_string()
}
