//! OLE Compound File Binary reader for legacy .xls workbooks.
//!
//! A .xls file is a CFB container holding the BIFF8 `Workbook` stream.
//! Only stream extraction is implemented here; record parsing lives in
//! [`super::biff`]. All reads are bounds-checked so corrupt files surface
//! as [`Error::InvalidData`] instead of panicking.

use crate::error::{Error, Result};
use std::collections::HashMap;

/// CFB signature, little-endian: D0 CF 11 E0 A1 B1 1A E1.
const CFB_SIGNATURE: u64 = 0xE11A_B1A1_E011_CFD0;

/// Largest regular sector number; higher values are chain sentinels.
const MAX_REG_SECT: u32 = 0xFFFF_FFFA;

/// Streams smaller than this live in the mini stream.
const MINI_STREAM_CUTOFF: usize = 4096;

/// Mini sectors are always 64 bytes.
const MINI_SECTOR_SIZE: usize = 64;

/// Parsed CFB container with its allocation tables and directory.
pub(crate) struct CompoundFile {
    fat: Vec<u32>,
    sectors: Sectors,
    mini_fat: Vec<u32>,
    mini_sectors: Sectors,
    directory: HashMap<String, DirEntry>,
}

impl CompoundFile {
    /// Parse a CFB container from file bytes.
    pub(crate) fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 512 {
            return Err(Error::InvalidData("file too small for a CFB header".to_string()));
        }
        let header = Header::parse(&data[..512])?;
        let sectors = Sectors {
            data: data.to_vec(),
            size: header.sector_size,
            base: header.sector_size,
        };

        let fat = load_fat(&sectors, &header)?;
        let directory = load_directory(&fat, &sectors, header.directory_start)?;
        let mini_fat = load_mini_fat(&fat, &sectors, &header)?;
        let mini_sectors = match directory.get("Root Entry") {
            Some(root) if root.size > 0 => {
                let mut data = read_chain(&fat, &sectors, root.start)?;
                data.truncate(root.size);
                Sectors {
                    data,
                    size: MINI_SECTOR_SIZE,
                    base: 0,
                }
            }
            _ => Sectors {
                data: Vec::new(),
                size: MINI_SECTOR_SIZE,
                base: 0,
            },
        };

        Ok(CompoundFile {
            fat,
            sectors,
            mini_fat,
            mini_sectors,
            directory,
        })
    }

    /// Read a stream's bytes by directory name.
    pub(crate) fn stream(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let entry = match self.directory.get(name) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let mut bytes = if entry.size < MINI_STREAM_CUTOFF {
            read_chain(&self.mini_fat, &self.mini_sectors, entry.start)?
        } else {
            read_chain(&self.fat, &self.sectors, entry.start)?
        };
        bytes.truncate(entry.size);
        Ok(Some(bytes))
    }
}

/// Sector container. `base` is the byte offset of sector 0: one sector
/// size for the main file (the header occupies the first slot), zero for
/// the mini stream.
struct Sectors {
    data: Vec<u8>,
    size: usize,
    base: usize,
}

impl Sectors {
    fn get(&self, index: u32) -> Result<&[u8]> {
        let start = self.base + (index as usize) * self.size;
        if start >= self.data.len() {
            return Err(Error::InvalidData(format!("sector {} out of range", index)));
        }
        let end = self.data.len().min(start + self.size);
        Ok(&self.data[start..end])
    }
}

/// The CFB header fields we need.
struct Header {
    sector_size: usize,
    fat_sector_count: usize,
    directory_start: u32,
    mini_fat_start: u32,
    mini_fat_count: usize,
    difat_start: u32,
    difat_entries: Vec<u32>,
}

impl Header {
    fn parse(data: &[u8]) -> Result<Self> {
        if read_u64(data, 0)? != CFB_SIGNATURE {
            return Err(Error::InvalidData("invalid CFB signature".to_string()));
        }

        let major_version = read_u16(data, 26)?;
        let sector_shift = read_u16(data, 30)?;
        let sector_size = match (major_version, sector_shift) {
            (3, 0x0009) => 512,
            (4, 0x000C) => 4096,
            _ => {
                return Err(Error::InvalidData(format!(
                    "unsupported CFB version {} with sector shift {}",
                    major_version, sector_shift
                )))
            }
        };

        let mut difat_entries = Vec::with_capacity(109);
        for i in 0..109 {
            difat_entries.push(read_u32(data, 76 + i * 4)?);
        }

        Ok(Header {
            sector_size,
            fat_sector_count: read_u32(data, 44)? as usize,
            directory_start: read_u32(data, 48)?,
            mini_fat_start: read_u32(data, 60)?,
            mini_fat_count: read_u32(data, 64)? as usize,
            difat_start: read_u32(data, 68)?,
            difat_entries,
        })
    }
}

/// Collect the FAT from the header DIFAT entries and any chained DIFAT
/// sectors.
fn load_fat(sectors: &Sectors, header: &Header) -> Result<Vec<u32>> {
    let mut difat = header.difat_entries.clone();

    let mut index = header.difat_start;
    let mut hops = 0usize;
    while index <= MAX_REG_SECT {
        let sector = sectors.get(index)?;
        let mut entries = sector_u32s(sector);
        index = entries.pop().unwrap_or(u32::MAX);
        difat.extend(entries);
        hops += 1;
        if hops > header.fat_sector_count + 1 {
            return Err(Error::InvalidData("DIFAT chain loops".to_string()));
        }
    }

    let mut fat = Vec::new();
    let mut count = 0usize;
    for index in difat {
        if index <= MAX_REG_SECT {
            fat.extend(sector_u32s(sectors.get(index)?));
            count += 1;
        }
    }
    if count != header.fat_sector_count {
        return Err(Error::InvalidData(format!(
            "expected {} FAT sectors, found {}",
            header.fat_sector_count, count
        )));
    }

    Ok(fat)
}

fn load_mini_fat(fat: &[u32], sectors: &Sectors, header: &Header) -> Result<Vec<u32>> {
    if header.mini_fat_count == 0 {
        return Ok(Vec::new());
    }
    let bytes = read_chain(fat, sectors, header.mini_fat_start)?;
    Ok(sector_u32s(&bytes))
}

/// Load directory entries, keyed by entry name.
fn load_directory(
    fat: &[u32],
    sectors: &Sectors,
    start: u32,
) -> Result<HashMap<String, DirEntry>> {
    let bytes = read_chain(fat, sectors, start)?;
    let mut directory = HashMap::new();
    for chunk in bytes.chunks(128) {
        if chunk.len() < 128 {
            break;
        }
        if let Some((name, entry)) = DirEntry::parse(chunk)? {
            directory.insert(name, entry);
        }
    }
    if directory.is_empty() {
        return Err(Error::InvalidData("empty CFB directory".to_string()));
    }
    Ok(directory)
}

/// Follow a FAT chain from `start`, concatenating sector contents.
fn read_chain(fat: &[u32], sectors: &Sectors, start: u32) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    let mut index = start;
    let mut steps = 0usize;
    while index <= MAX_REG_SECT {
        content.extend_from_slice(sectors.get(index)?);
        index = *fat
            .get(index as usize)
            .ok_or_else(|| Error::InvalidData(format!("FAT entry {} missing", index)))?;
        steps += 1;
        if steps > fat.len() {
            return Err(Error::InvalidData("FAT chain loops".to_string()));
        }
    }
    Ok(content)
}

/// One directory entry: a stream's start sector and byte size.
struct DirEntry {
    start: u32,
    size: usize,
}

impl DirEntry {
    /// Parse a 128-byte directory entry. Returns `None` for unused slots.
    fn parse(bytes: &[u8]) -> Result<Option<(String, DirEntry)>> {
        let name_len = read_u16(bytes, 64)? as usize;
        if name_len < 2 || name_len > 64 {
            return Ok(None);
        }
        // UTF-16LE, length includes the terminating NUL
        let units: Vec<u16> = bytes[..name_len - 2]
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        let name = String::from_utf16_lossy(&units);

        let start = read_u32(bytes, 116)?;
        let size = read_u64(bytes, 120)? as usize;
        Ok(Some((name, DirEntry { start, size })))
    }
}

fn sector_u32s(bytes: &[u8]) -> Vec<u32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

fn read_u16(data: &[u8], offset: usize) -> Result<u16> {
    data.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| Error::InvalidData("truncated CFB structure".to_string()))
}

fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    data.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| Error::InvalidData("truncated CFB structure".to_string()))
}

fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    data.get(offset..offset + 8)
        .map(|b| {
            u64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        })
        .ok_or_else(|| Error::InvalidData("truncated CFB structure".to_string()))
}
