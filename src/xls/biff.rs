//! BIFF8 record reader for Excel 97-2003 workbook streams.
//!
//! BIFF8 is a sequence of `[type: u16][size: u16][payload]` records.
//! Payloads larger than a record spill into CONTINUE records, which the
//! reader merges transparently into chunks of the current record.

use crate::error::{Error, Result};
use encoding_rs::Encoding;

/// CONTINUE record type.
const CONTINUE: u16 = 0x003C;

/// Reader over a BIFF8 workbook stream.
pub(crate) struct BiffReader {
    data: Vec<u8>,
    /// Next record's start position.
    pos: usize,
    /// Chunks (start, end) of the current record, CONTINUEs merged.
    chunks: Vec<(usize, usize)>,
    chunk: usize,
    offset: usize,
    /// Encoding for single-byte (compressed) strings, set by CODEPAGE.
    pub(crate) encoding: &'static Encoding,
}

impl BiffReader {
    pub(crate) fn new(data: Vec<u8>) -> Self {
        BiffReader {
            data,
            pos: 0,
            chunks: Vec::new(),
            chunk: 0,
            offset: 0,
            encoding: encoding_rs::WINDOWS_1252,
        }
    }

    /// Advance to the next record and return its type, or `None` at the
    /// end of the stream.
    pub(crate) fn next(&mut self) -> Result<Option<u16>> {
        if self.pos + 4 > self.data.len() {
            return Ok(None);
        }
        self.chunk = 0;
        self.offset = 0;
        self.chunks.clear();

        let kind = self.u16_at(self.pos)?;
        self.push_chunk()?;
        while self.pos + 4 <= self.data.len() && self.u16_at(self.pos)? == CONTINUE {
            self.push_chunk()?;
        }
        Ok(Some(kind))
    }

    fn push_chunk(&mut self) -> Result<()> {
        let size = self.u16_at(self.pos + 2)? as usize;
        let lower = self.pos + 4;
        let upper = lower + size;
        if upper > self.data.len() {
            return Err(Error::InvalidData("truncated BIFF record".to_string()));
        }
        self.pos = upper;
        self.chunks.push((lower, upper));
        Ok(())
    }

    /// Jump to an absolute stream position (a BOUNDSHEET8 offset).
    pub(crate) fn goto(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Total payload size of the current record across all chunks.
    pub(crate) fn record_size(&self) -> usize {
        self.chunks.iter().map(|(lower, upper)| upper - lower).sum()
    }

    /// Read up to `length` bytes from the current chunk, advancing to the
    /// next chunk when this one is exhausted.
    fn read(&mut self, length: usize) -> (&[u8], usize) {
        if let Some((lower, upper)) = self.chunks.get(self.chunk) {
            let start = (*upper).min(*lower + self.offset);
            let end = (*upper).min(start + length);
            if start < *upper {
                if end == *upper {
                    self.chunk += 1;
                    self.offset = 0;
                } else {
                    self.offset += end - start;
                }
                return (&self.data[start..end], end - start);
            }
        }
        (&[], 0)
    }

    /// Read exactly `length` bytes or fail.
    fn read_exact(&mut self, length: usize) -> Result<&[u8]> {
        let (bytes, got) = self.read(length);
        if got == length {
            Ok(bytes)
        } else {
            Err(Error::InvalidData(format!(
                "record ends {} bytes short",
                length - got
            )))
        }
    }

    pub(crate) fn skip(&mut self, length: usize) -> Result<()> {
        self.read_exact(length).map(|_| ())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        self.read_exact(1).map(|b| b[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        self.read_exact(2).map(|b| u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        self.read_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64> {
        self.read_exact(8).map(|b| {
            f64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        })
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        self.read_exact(8).map(|b| {
            u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        })
    }

    /// Decode an RK value: a 30-bit number with integer and percentage
    /// flags packed into the low two bits.
    pub(crate) fn read_rk(&mut self) -> Result<f64> {
        Ok(decode_rk(self.read_u32()?))
    }

    /// ShortXLUnicodeString: 1-byte character count.
    pub(crate) fn read_short_string(&mut self) -> Result<String> {
        let chars = self.read_u8()? as usize;
        let mut content = String::new();
        self.read_string_body(chars, false, &mut content)?;
        Ok(content)
    }

    /// XLUnicodeString: 2-byte character count.
    pub(crate) fn read_string(&mut self) -> Result<String> {
        let chars = self.read_u16()? as usize;
        let mut content = String::new();
        self.read_string_body(chars, false, &mut content)?;
        Ok(content)
    }

    /// XLUnicodeRichExtendedString, as stored in the SST. The string may
    /// continue into the next chunk, where a fresh flags byte restarts it.
    pub(crate) fn read_rich_string(&mut self) -> Result<String> {
        let mut content = String::new();
        let mut expected = self.read_u16()? as usize;
        let mut actual = self.read_string_body(expected, true, &mut content)?;
        while actual < expected {
            expected -= actual;
            actual = self.read_string_body(expected, false, &mut content)?;
        }
        Ok(content)
    }

    /// Read up to `chars` characters into `content` and return how many
    /// were actually read from the current chunk.
    fn read_string_body(
        &mut self,
        chars: usize,
        extended: bool,
        content: &mut String,
    ) -> Result<usize> {
        let flags = self.read_u8()?;
        let wide = flags & 0x1 != 0;
        let rich_runs = if extended && flags & 0x8 != 0 {
            self.read_u16()? as usize
        } else {
            0
        };
        let phonetic_bytes = if extended && flags & 0x4 != 0 {
            self.read_u32()? as usize
        } else {
            0
        };

        let encoding = self.encoding;
        let wanted = if wide { chars * 2 } else { chars };
        let (bytes, got) = self.read(wanted);
        if wide {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                .collect();
            content.push_str(&String::from_utf16_lossy(&units));
        } else {
            let (decoded, _, _) = encoding.decode(bytes);
            content.push_str(&decoded);
        }

        self.skip(4 * rich_runs)?;
        self.skip(phonetic_bytes)?;
        Ok(if wide { got / 2 } else { got })
    }

    fn u16_at(&self, index: usize) -> Result<u16> {
        self.data
            .get(index..index + 2)
            .map(|b| u16::from_le_bytes([b[0], b[1]]))
            .ok_or_else(|| Error::InvalidData("truncated BIFF stream".to_string()))
    }
}

/// Decode an RK-packed number.
fn decode_rk(rk: u32) -> f64 {
    let is_percent = rk & 0x1 != 0;
    let is_integer = rk & 0x2 != 0;
    let mut value = if is_integer {
        ((rk as i32) >> 2) as f64
    } else {
        f64::from_bits(((rk >> 2) as u64) << 34)
    };
    if is_percent {
        value /= 100.0;
    }
    value
}
