//! Parallel summaries of many compilation units

use crate::table::MacinfoTable;
use crate::section::SectionReader;
use macinfo_core::{MacroRecord, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

/// Overview of one unit's macro table
#[derive(Debug, Clone, Serialize)]
pub struct UnitSummary {
    /// Section offset of the unit
    pub offset: u64,
    /// Number of base-table records
    pub base_entries: usize,
    /// Number of file-table records
    pub file_entries: usize,
    /// Command-line macros
    pub command_line: Vec<MacroRecord>,
    /// Force-included files
    pub included_files: Vec<u32>,
    /// Load failure, if any
    pub error: Option<String>,
}

impl UnitSummary {
    fn from_table(table: &MacinfoTable) -> Result<Self> {
        Ok(Self {
            offset: table.offset(),
            base_entries: table.base_table()?.len(),
            file_entries: table.file_table()?.len(),
            command_line: table.command_line_macros()?,
            included_files: table.command_line_included_files()?,
            error: None,
        })
    }

    fn failed(offset: u64, error: String) -> Self {
        Self {
            offset,
            base_entries: 0,
            file_entries: 0,
            command_line: Vec::new(),
            included_files: Vec::new(),
            error: Some(error),
        }
    }
}

/// Load the table at every offset in parallel and summarize it
pub fn summarize_units(reader: Arc<dyn SectionReader>, offsets: &[u64]) -> Vec<UnitSummary> {
    info!("Summarizing {} macro info units", offsets.len());

    offsets
        .par_iter()
        .map(|&offset| {
            let table = MacinfoTable::with_reader(offset, reader.clone());
            UnitSummary::from_table(&table).unwrap_or_else(|e| {
                warn!("Unit at {:#x} failed to load: {}", offset, e);
                UnitSummary::failed(offset, e.to_string())
            })
        })
        .collect()
}
