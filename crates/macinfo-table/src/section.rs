//! `.debug_macinfo` section reader
//!
//! A [`SectionReader`] decodes the entries of one compilation unit starting
//! at a section offset and hands every record to a [`MacroSink`]. Tables load
//! through this trait, so tests and other front ends can supply their own
//! record source.

use crate::cursor::Cursor;
use macinfo_core::{Error, MacinfoKind, MacroRecord, ReaderConfig, Result, MACINFO_END};
use std::path::Path;
use tracing::{debug, warn};

/// Which part of a unit's entry list to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablePart {
    /// Entries before the first start-file record
    Base,
    /// Entries from the first start-file record to the end of the unit
    File,
}

/// Receiver of decoded records
pub trait MacroSink {
    /// Accept one record, in file order
    fn add_entry(&mut self, record: MacroRecord);
}

impl MacroSink for Vec<MacroRecord> {
    fn add_entry(&mut self, record: MacroRecord) {
        self.push(record);
    }
}

/// Records split by the base/file partition rule
#[derive(Debug, Default, Clone)]
pub struct Partition {
    /// Records without a file index
    pub base: Vec<MacroRecord>,
    /// Records attributed to an included file
    pub file: Vec<MacroRecord>,
}

impl MacroSink for Partition {
    fn add_entry(&mut self, record: MacroRecord) {
        if record.is_base() {
            self.base.push(record);
        } else {
            self.file.push(record);
        }
    }
}

/// Source of macro-info records
pub trait SectionReader: Send + Sync {
    /// Decode `part` of the unit list at `offset` into `sink`.
    ///
    /// Returns the number of bytes consumed.
    fn read_table(&self, offset: u64, part: TablePart, sink: &mut dyn MacroSink) -> Result<u64>;

    /// File indices force-included from the command line
    fn command_included_files(&self, base_offset: u64, file_offset: u64) -> Result<Vec<u32>>;
}

/// Reader over the bytes of a `.debug_macinfo` section
pub struct MacinfoSection {
    data: Vec<u8>,
    config: ReaderConfig,
}

impl MacinfoSection {
    /// Create a reader over raw section bytes
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            config: ReaderConfig::default(),
        }
    }

    /// Read a raw section dump from disk
    pub fn open(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        debug!("Read {} bytes of macro info from {:?}", data.len(), path);
        Ok(Self::new(data))
    }

    /// Extract the macro-info section of an ELF object
    pub fn from_object(path: &Path, config: ReaderConfig) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let data = crate::object::extract_section(&bytes, &config.section_name)?.ok_or_else(|| {
            Error::Object(format!("{} has no {} section", path.display(), config.section_name))
        })?;
        Ok(Self { data, config })
    }

    /// Replace the reader configuration
    pub fn with_config(mut self, config: ReaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Section bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Start offset of every unit list in the section
    pub fn unit_offsets(&self) -> Result<Vec<u64>> {
        let mut offsets = Vec::new();
        let mut offset = 0u64;

        while offset < self.data.len() as u64 {
            // Padding between units
            if self.data[offset as usize] == MACINFO_END {
                offset += 1;
                continue;
            }
            let mut skipped = Vec::new();
            let consumed = self.walk(offset, TablePart::File, &mut skipped)?;
            if consumed == 0 {
                warn!("Cannot resynchronize at {:#x}, stopping unit scan", offset);
                break;
            }
            offsets.push(offset);
            offset += consumed;
        }

        Ok(offsets)
    }

    /// Decode entries starting at `offset`, returning the bytes consumed
    fn walk(&self, offset: u64, part: TablePart, sink: &mut dyn MacroSink) -> Result<u64> {
        let mut cursor = Cursor::at(&self.data, offset)?;
        let mut files: Vec<u32> = Vec::new();
        let mut started = false;

        while cursor.has_more_data() {
            let at = cursor.pos();
            let opcode = cursor.read_u8()?;
            if opcode == MACINFO_END {
                // The terminator belongs to the file part.
                if part == TablePart::Base {
                    return Ok(at - offset);
                }
                break;
            }

            let Some(kind) = MacinfoKind::from_opcode(opcode) else {
                if self.config.strict_opcodes {
                    return Err(Error::UnknownOpcode { opcode, offset: at });
                }
                warn!("Unknown macro info opcode {:#04x} at {:#x}, ending unit", opcode, at);
                return Ok(at - offset);
            };

            if part == TablePart::Base && kind == MacinfoKind::StartFile {
                return Ok(at - offset);
            }

            let current = files.last().copied();
            let record = match kind {
                MacinfoKind::Define | MacinfoKind::Undef => {
                    let line = cursor.read_uleb128_u32()?;
                    let text = cursor.read_cstr()?;
                    MacroRecord::new(kind, line, current, text)
                }
                MacinfoKind::StartFile => {
                    let line = cursor.read_uleb128_u32()?;
                    let file = cursor.read_uleb128_u32()?;
                    if files.len() >= self.config.max_include_depth {
                        return Err(Error::malformed(
                            at,
                            format!("include depth exceeds {}", self.config.max_include_depth),
                        ));
                    }
                    files.push(file);
                    started = true;
                    MacroRecord::start_file(line, file)
                }
                MacinfoKind::EndFile => {
                    let file = files
                        .pop()
                        .ok_or_else(|| Error::malformed(at, "end of file without matching start"))?;
                    MacroRecord::end_file(Some(file))
                }
                MacinfoKind::VendorExt => {
                    let constant = cursor.read_uleb128_u32()?;
                    let text = cursor.read_cstr()?;
                    MacroRecord::vendor_ext(constant, current, text)
                }
            };

            // The base table is final once read, so records after the
            // primary file closes are not attributed anywhere.
            if part == TablePart::File && started && record.is_base() {
                warn!("Dropping {} at {:#x} outside any source file", record.kind, at);
                continue;
            }
            sink.add_entry(record);
        }

        Ok(cursor.pos() - offset)
    }
}

impl SectionReader for MacinfoSection {
    fn read_table(&self, offset: u64, part: TablePart, sink: &mut dyn MacroSink) -> Result<u64> {
        let consumed = self.walk(offset, part, sink)?;
        debug!("Read {:?} table at {:#x}: {} bytes", part, offset, consumed);
        Ok(consumed)
    }

    fn command_included_files(&self, _base_offset: u64, file_offset: u64) -> Result<Vec<u32>> {
        let mut records = Vec::new();
        self.walk(file_offset, TablePart::File, &mut records)?;

        let mut included = Vec::new();
        let mut depth = 0usize;
        for record in &records {
            match record.kind {
                MacinfoKind::StartFile => {
                    depth += 1;
                    // Depth 2 is directly inside the primary source file.
                    if depth == 2 && record.line_num == 0 {
                        included.extend(record.file_idx);
                    }
                }
                MacinfoKind::EndFile => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
        }

        Ok(included)
    }
}
