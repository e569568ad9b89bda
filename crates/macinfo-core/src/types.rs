//! Macro-info record types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opcode terminating the entry list of one compilation unit
pub const MACINFO_END: u8 = 0x00;

/// Kind of a `.debug_macinfo` entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MacinfoKind {
    /// `#define`
    Define,
    /// `#undef`
    Undef,
    /// Start of an included file
    StartFile,
    /// End of an included file
    EndFile,
    /// Vendor extension
    VendorExt,
}

impl MacinfoKind {
    /// Decode a DWARF opcode (`DW_MACINFO_*`)
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        match opcode {
            0x01 => Some(MacinfoKind::Define),
            0x02 => Some(MacinfoKind::Undef),
            0x03 => Some(MacinfoKind::StartFile),
            0x04 => Some(MacinfoKind::EndFile),
            0xff => Some(MacinfoKind::VendorExt),
            _ => None,
        }
    }

    /// The DWARF opcode for this kind
    pub fn opcode(&self) -> u8 {
        match self {
            MacinfoKind::Define => 0x01,
            MacinfoKind::Undef => 0x02,
            MacinfoKind::StartFile => 0x03,
            MacinfoKind::EndFile => 0x04,
            MacinfoKind::VendorExt => 0xff,
        }
    }

    /// Whether this kind defines or undefines a macro
    pub fn is_macro(&self) -> bool {
        matches!(self, MacinfoKind::Define | MacinfoKind::Undef)
    }

    /// DWARF constant name
    pub fn dwarf_name(&self) -> &'static str {
        match self {
            MacinfoKind::Define => "DW_MACINFO_define",
            MacinfoKind::Undef => "DW_MACINFO_undef",
            MacinfoKind::StartFile => "DW_MACINFO_start_file",
            MacinfoKind::EndFile => "DW_MACINFO_end_file",
            MacinfoKind::VendorExt => "DW_MACINFO_vendor_ext",
        }
    }
}

impl fmt::Display for MacinfoKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dwarf_name())
    }
}

/// One decoded macro-info entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroRecord {
    /// Entry kind
    pub kind: MacinfoKind,
    /// Line number; the vendor constant for [`MacinfoKind::VendorExt`]
    pub line_num: u32,
    /// Index into the line-program file table, `None` while no file is open
    pub file_idx: Option<u32>,
    /// Macro definition, macro name or vendor string
    pub text: String,
}

impl MacroRecord {
    /// Create a record
    pub fn new(
        kind: MacinfoKind,
        line_num: u32,
        file_idx: Option<u32>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            line_num,
            file_idx,
            text: text.into(),
        }
    }

    /// `#define` record
    pub fn define(line_num: u32, file_idx: Option<u32>, text: impl Into<String>) -> Self {
        Self::new(MacinfoKind::Define, line_num, file_idx, text)
    }

    /// `#undef` record
    pub fn undef(line_num: u32, file_idx: Option<u32>, name: impl Into<String>) -> Self {
        Self::new(MacinfoKind::Undef, line_num, file_idx, name)
    }

    /// Start of `file_idx`, included from line `line_num`
    pub fn start_file(line_num: u32, file_idx: u32) -> Self {
        Self::new(MacinfoKind::StartFile, line_num, Some(file_idx), String::new())
    }

    /// End of `file_idx`
    pub fn end_file(file_idx: Option<u32>) -> Self {
        Self::new(MacinfoKind::EndFile, 0, file_idx, String::new())
    }

    /// Vendor extension carrying `constant` and a string
    pub fn vendor_ext(constant: u32, file_idx: Option<u32>, text: impl Into<String>) -> Self {
        Self::new(MacinfoKind::VendorExt, constant, file_idx, text)
    }

    /// Whether the record belongs to the base table
    pub fn is_base(&self) -> bool {
        self.file_idx.is_none()
    }

    /// File index as printed in dumps, `-1` for base records
    pub fn file_idx_display(&self) -> i64 {
        self.file_idx.map(i64::from).unwrap_or(-1)
    }
}

impl fmt::Display for MacroRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<22} {:>5} {:>4}  {}",
            self.kind.dwarf_name(),
            self.line_num,
            self.file_idx_display(),
            self.text
        )
    }
}
