//! Text dump of a macro table

use crate::table::{Entries, MacinfoTable};
use macinfo_core::DumpConfig;
use std::fmt::{self, Write};

impl MacinfoTable {
    /// Write the base table then the file table as text
    pub fn dump<W: Write>(&self, out: &mut W) -> fmt::Result {
        self.dump_with(out, &DumpConfig::default())
    }

    /// [`MacinfoTable::dump`] with explicit options
    pub fn dump_with<W: Write>(&self, out: &mut W, config: &DumpConfig) -> fmt::Result {
        write_header(out, "MACRO Table", self.offset(), config)?;
        match self.base_table() {
            Ok(entries) => write_entries(out, &entries)?,
            Err(e) => {
                // The file table needs the base boundary, so it fails the same way.
                writeln!(out, " <error: {}>", e)?;
                writeln!(out)?;
                writeln!(out, "FILE MACRO Table:")?;
                return writeln!(out, " <error: {}>", e);
            }
        }

        writeln!(out)?;
        match self.file_offset() {
            Ok(offset) => write_header(out, "FILE MACRO Table", offset, config)?,
            Err(_) => writeln!(out, "FILE MACRO Table:")?,
        }
        match self.file_table() {
            Ok(entries) => write_entries(out, &entries),
            Err(e) => writeln!(out, " <error: {}>", e),
        }
    }
}

impl fmt::Display for MacinfoTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.dump(f)
    }
}

fn write_header<W: Write>(
    out: &mut W,
    title: &str,
    offset: u64,
    config: &DumpConfig,
) -> fmt::Result {
    if config.show_offsets {
        writeln!(out, "{} (offset = {:#x}):", title, offset)?;
    } else {
        writeln!(out, "{}:", title)?;
    }
    writeln!(out, " {:<22} {:>5} {:>4}  Definition", "Type", "Line", "File")
}

fn write_entries<W: Write>(out: &mut W, entries: &Entries) -> fmt::Result {
    for record in entries.iter() {
        writeln!(out, " {}", record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::{MacroSink, SectionReader, TablePart};
    use macinfo_core::{Error, MacroRecord, Result};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct BrokenReader {
        reads: AtomicUsize,
    }

    impl SectionReader for BrokenReader {
        fn read_table(
            &self,
            _offset: u64,
            _part: TablePart,
            _sink: &mut dyn MacroSink,
        ) -> Result<u64> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            Err(Error::malformed(0x8, "unexpected end of section"))
        }

        fn command_included_files(
            &self,
            _base_offset: u64,
            _file_offset: u64,
        ) -> Result<Vec<u32>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_dump_populated() {
        let table = MacinfoTable::from_records(
            0x20,
            vec![
                MacroRecord::define(0, None, "__STDC__ 1"),
                MacroRecord::start_file(0, 1),
                MacroRecord::define(4, Some(1), "LIMIT 10"),
                MacroRecord::end_file(Some(1)),
            ],
        );

        let text = table.to_string();
        assert!(text.starts_with("MACRO Table (offset = 0x20):\n"));
        assert!(text.contains("FILE MACRO Table (offset = 0x20):"));
        assert!(text.contains("__STDC__ 1"));
        assert!(text.contains("LIMIT 10"));
        assert_eq!(text.lines().filter(|l| l.contains("DW_MACINFO_")).count(), 4);
    }

    #[test]
    fn test_dump_empty() {
        let mut text = String::new();
        MacinfoTable::new(0)
            .dump_with(&mut text, &DumpConfig { show_offsets: false })
            .unwrap();
        assert_eq!(text.lines().next(), Some("MACRO Table:"));
        assert!(!text.contains("DW_MACINFO_"));
    }

    #[test]
    fn test_dump_reports_load_errors() {
        let reader = Arc::new(BrokenReader::default());
        let table = MacinfoTable::with_reader(0, reader.clone());
        let mut text = String::new();
        table.dump(&mut text).unwrap();
        assert!(text.contains("<error: Malformed macro info at 0x8"));
        assert!(text.contains("FILE MACRO Table:"));
        assert_eq!(text.matches("<error:").count(), 2);
        assert_eq!(reader.reads.load(Ordering::SeqCst), 1);
    }
}
