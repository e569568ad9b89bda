//! Per-unit macro table
//!
//! A [`MacinfoTable`] holds the records of one compilation unit split into a
//! base table (records outside any included file) and a file table. With a
//! [`SectionReader`] attached, each sub-table is decoded on first access and
//! cached; detached tables are filled through [`MacinfoTable::add_entry`].

use crate::heuristic::command_line_span;
use crate::section::{MacroSink, Partition, SectionReader, TablePart};
use macinfo_core::{Error, MacroDefinition, MacroRecord, Result};
use std::sync::{Arc, OnceLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, warn};

/// Load state of a sub-table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// The reader has not run yet
    Unloaded,
    /// Entries are complete
    Loaded,
}

/// Snapshot of a sub-table's entries
pub type Entries = Arc<Vec<MacroRecord>>;

#[derive(Debug)]
struct SubTable {
    state: LoadState,
    entries: Entries,
}

impl SubTable {
    fn new(state: LoadState) -> Self {
        Self {
            state,
            entries: Arc::new(Vec::new()),
        }
    }

    fn extend(&mut self, records: Vec<MacroRecord>) {
        if !records.is_empty() {
            Arc::make_mut(&mut self.entries).extend(records);
        }
    }
}

/// Macro-info table of one compilation unit
pub struct MacinfoTable {
    offset: u64,
    reader: Option<Arc<dyn SectionReader>>,
    base: RwLock<SubTable>,
    file: RwLock<SubTable>,
    file_offset: OnceLock<u64>,
    included_files: RwLock<Option<Vec<u32>>>,
}

impl MacinfoTable {
    /// Create an empty table filled only through [`MacinfoTable::add_entry`]
    pub fn new(offset: u64) -> Self {
        Self {
            offset,
            reader: None,
            base: RwLock::new(SubTable::new(LoadState::Loaded)),
            file: RwLock::new(SubTable::new(LoadState::Loaded)),
            file_offset: OnceLock::from(offset),
            included_files: RwLock::new(Some(Vec::new())),
        }
    }

    /// Create a table whose entries are decoded by `reader` on first access
    pub fn with_reader(offset: u64, reader: Arc<dyn SectionReader>) -> Self {
        Self {
            offset,
            reader: Some(reader),
            base: RwLock::new(SubTable::new(LoadState::Unloaded)),
            file: RwLock::new(SubTable::new(LoadState::Unloaded)),
            file_offset: OnceLock::new(),
            included_files: RwLock::new(None),
        }
    }

    /// Create a detached table from records in file order
    pub fn from_records(offset: u64, records: impl IntoIterator<Item = MacroRecord>) -> Self {
        let mut table = Self::new(offset);
        for record in records {
            table.add_entry(record);
        }
        table
    }

    /// Append a record to the base or the file table, by its file index
    pub fn add_entry(&mut self, record: MacroRecord) {
        let sub = if record.is_base() {
            &mut self.base
        } else {
            &mut self.file
        };
        let sub = sub.get_mut().unwrap_or_else(PoisonError::into_inner);
        Arc::make_mut(&mut sub.entries).push(record);
    }

    /// Section offset of the unit
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Section offset where the file part of the unit begins
    pub fn file_offset(&self) -> Result<u64> {
        if let Some(offset) = self.file_offset.get() {
            return Ok(*offset);
        }
        self.ensure_base()?;
        self.file_offset
            .get()
            .copied()
            .ok_or_else(|| Error::Other("file table offset unknown after loading".into()))
    }

    /// Load state of one sub-table
    pub fn load_state(&self, part: TablePart) -> LoadState {
        let lock = match part {
            TablePart::Base => &self.base,
            TablePart::File => &self.file,
        };
        lock.read().map(|sub| sub.state).unwrap_or(LoadState::Unloaded)
    }

    /// Records without a file index, in file order
    pub fn base_table(&self) -> Result<Entries> {
        self.ensure_base()?;
        Ok(read(&self.base)?.entries.clone())
    }

    /// Records attributed to included files, in file order
    pub fn file_table(&self) -> Result<Entries> {
        self.ensure_file()?;
        Ok(read(&self.file)?.entries.clone())
    }

    /// Macros defined on the command line or predefined by the compiler
    pub fn command_line_macros(&self) -> Result<Vec<MacroRecord>> {
        let base = self.base_table()?;
        let lines: Vec<(u32, Option<u32>)> =
            base.iter().map(|r| (r.line_num, r.file_idx)).collect();
        let span = command_line_span(&lines);
        debug!(
            "Unit {:#x}: {} of {} base entries are command-line macros",
            self.offset,
            span.len(),
            base.len()
        );
        Ok(base[span].to_vec())
    }

    /// Define and undef records of one included file
    pub fn macros(&self, file_idx: u32) -> Result<Vec<MacroRecord>> {
        Ok(self
            .file_table()?
            .iter()
            .filter(|r| r.file_idx == Some(file_idx) && r.kind.is_macro())
            .cloned()
            .collect())
    }

    /// [`MacinfoTable::command_line_macros`] as parsed definitions
    pub fn command_line_definitions(&self) -> Result<Vec<MacroDefinition>> {
        Ok(self
            .command_line_macros()?
            .iter()
            .filter_map(MacroDefinition::from_record)
            .collect())
    }

    /// [`MacinfoTable::macros`] as parsed definitions
    pub fn macro_definitions(&self, file_idx: u32) -> Result<Vec<MacroDefinition>> {
        Ok(self
            .macros(file_idx)?
            .iter()
            .filter_map(MacroDefinition::from_record)
            .collect())
    }

    /// Files force-included from the command line
    pub fn command_line_included_files(&self) -> Result<Vec<u32>> {
        if let Some(files) = read(&self.included_files)?.as_ref() {
            return Ok(files.clone());
        }

        let file_offset = self.file_offset()?;
        let mut cached = write(&self.included_files)?;
        if let Some(files) = cached.as_ref() {
            return Ok(files.clone());
        }

        let files = match &self.reader {
            Some(reader) => reader.command_included_files(self.offset, file_offset)?,
            None => Vec::new(),
        };
        *cached = Some(files.clone());
        Ok(files)
    }

    fn ensure_base(&self) -> Result<()> {
        if read(&self.base)?.state == LoadState::Loaded {
            return Ok(());
        }
        let Some(reader) = &self.reader else {
            return Ok(());
        };

        let mut base = write(&self.base)?;
        if base.state == LoadState::Loaded {
            return Ok(());
        }

        let mut partition = Partition::default();
        let consumed = reader.read_table(self.offset, TablePart::Base, &mut partition)?;
        let _ = self.file_offset.set(self.offset + consumed);
        debug!(
            "Loaded base table at {:#x}: {} entries, file table at {:#x}",
            self.offset,
            partition.base.len(),
            self.offset + consumed
        );

        base.extend(partition.base);
        base.state = LoadState::Loaded;
        if !partition.file.is_empty() {
            write(&self.file)?.extend(partition.file);
        }
        Ok(())
    }

    fn ensure_file(&self) -> Result<()> {
        if read(&self.file)?.state == LoadState::Loaded {
            return Ok(());
        }
        let Some(reader) = &self.reader else {
            return Ok(());
        };
        let file_offset = self.file_offset()?;

        let mut file = write(&self.file)?;
        if file.state == LoadState::Loaded {
            return Ok(());
        }

        let mut partition = Partition::default();
        reader.read_table(file_offset, TablePart::File, &mut partition)?;
        debug!(
            "Loaded file table at {:#x}: {} entries",
            file_offset,
            partition.file.len()
        );

        if !partition.base.is_empty() {
            // The base table is final once loaded.
            warn!(
                "Ignoring {} unattributed records in file table at {:#x}",
                partition.base.len(),
                file_offset
            );
        }
        file.extend(partition.file);
        file.state = LoadState::Loaded;
        Ok(())
    }
}

impl MacroSink for MacinfoTable {
    fn add_entry(&mut self, record: MacroRecord) {
        MacinfoTable::add_entry(self, record);
    }
}

impl std::fmt::Debug for MacinfoTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MacinfoTable")
            .field("offset", &self.offset)
            .field("base", &self.load_state(TablePart::Base))
            .field("file", &self.load_state(TablePart::File))
            .finish()
    }
}

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read().map_err(|_| Error::Lock)
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write().map_err(|_| Error::Lock)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macinfo_core::MacinfoKind;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory reader that counts its invocations
    #[derive(Default)]
    struct FakeReader {
        base: Vec<MacroRecord>,
        file: Vec<MacroRecord>,
        included: Vec<u32>,
        base_reads: AtomicUsize,
        file_reads: AtomicUsize,
        fail: bool,
    }

    impl SectionReader for FakeReader {
        fn read_table(
            &self,
            _offset: u64,
            part: TablePart,
            sink: &mut dyn MacroSink,
        ) -> Result<u64> {
            if self.fail {
                return Err(Error::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "section truncated",
                )));
            }
            let (records, counter) = match part {
                TablePart::Base => (&self.base, &self.base_reads),
                TablePart::File => (&self.file, &self.file_reads),
            };
            counter.fetch_add(1, Ordering::SeqCst);
            for record in records {
                sink.add_entry(record.clone());
            }
            Ok(records.len() as u64 * 4)
        }

        fn command_included_files(
            &self,
            _base_offset: u64,
            _file_offset: u64,
        ) -> Result<Vec<u32>> {
            Ok(self.included.clone())
        }
    }

    fn sample_reader() -> Arc<FakeReader> {
        Arc::new(FakeReader {
            base: vec![
                MacroRecord::define(0, None, "__STDC__ 1"),
                MacroRecord::define(0, None, "__GNUC__ 12"),
                MacroRecord::define(0, None, "DEBUG 1"),
            ],
            file: vec![
                MacroRecord::start_file(0, 1),
                MacroRecord::start_file(0, 2),
                MacroRecord::define(1, Some(2), "CONFIG_H 1"),
                MacroRecord::end_file(Some(2)),
                MacroRecord::define(3, Some(1), "ANSWER 42"),
                MacroRecord::vendor_ext(7, Some(1), "vendor"),
                MacroRecord::undef(9, Some(1), "ANSWER"),
                MacroRecord::end_file(Some(1)),
            ],
            included: vec![2],
            ..FakeReader::default()
        })
    }

    #[test]
    fn test_partition_invariant() {
        let records = vec![
            MacroRecord::define(1, None, "A"),
            MacroRecord::start_file(0, 1),
            MacroRecord::define(2, Some(1), "B"),
            MacroRecord::undef(3, None, "A"),
            MacroRecord::end_file(Some(1)),
        ];
        let table = MacinfoTable::from_records(0, records.clone());

        let base = table.base_table().unwrap();
        let file = table.file_table().unwrap();
        assert!(base.iter().all(|r| r.file_idx.is_none()));
        assert!(file.iter().all(|r| r.file_idx.is_some()));
        assert_eq!(base.len() + file.len(), records.len());
        assert_eq!(base[1].kind, MacinfoKind::Undef);
    }

    #[test]
    fn test_lazy_base_read_once() {
        let reader = sample_reader();
        let table = MacinfoTable::with_reader(0x10, reader.clone());
        assert_eq!(table.load_state(TablePart::Base), LoadState::Unloaded);

        let first: Vec<MacroRecord> = table.base_table().unwrap().to_vec();
        let second: Vec<MacroRecord> = table.base_table().unwrap().to_vec();

        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
        assert_eq!(reader.base_reads.load(Ordering::SeqCst), 1);
        assert_eq!(table.load_state(TablePart::Base), LoadState::Loaded);
        assert_eq!(table.load_state(TablePart::File), LoadState::Unloaded);
        assert_eq!(table.file_offset().unwrap(), 0x10 + 12);
    }

    #[test]
    fn test_file_table_loads_base_first() {
        let reader = sample_reader();
        let table = MacinfoTable::with_reader(0, reader.clone());

        assert_eq!(table.file_table().unwrap().len(), 8);
        assert_eq!(table.file_table().unwrap().len(), 8);
        assert_eq!(reader.base_reads.load(Ordering::SeqCst), 1);
        assert_eq!(reader.file_reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_pre_added_entries_are_kept() {
        let reader = sample_reader();
        let mut table = MacinfoTable::with_reader(0, reader);
        table.add_entry(MacroRecord::define(0, None, "EARLY 1"));

        let base = table.base_table().unwrap();
        assert_eq!(base.len(), 4);
        assert_eq!(base[0].text, "EARLY 1");
    }

    #[test]
    fn test_macros_for_file() {
        let table = MacinfoTable::with_reader(0, sample_reader());

        let macros = table.macros(1).unwrap();
        assert_eq!(
            macros,
            vec![
                MacroRecord::define(3, Some(1), "ANSWER 42"),
                MacroRecord::undef(9, Some(1), "ANSWER"),
            ]
        );
        assert_eq!(table.macros(2).unwrap().len(), 1);
        assert!(table.macros(5).unwrap().is_empty());

        let defs = table.macro_definitions(1).unwrap();
        assert_eq!(defs[0], MacroDefinition::with_value("ANSWER", "42"));
        assert_eq!(defs[1], MacroDefinition::undefined("ANSWER"));
    }

    #[test]
    fn test_command_line_macros() {
        let table = MacinfoTable::with_reader(0, sample_reader());

        // Three entries sharing line 0: ambiguous, everything is returned.
        let macros = table.command_line_macros().unwrap();
        assert_eq!(macros.len(), 3);

        let args: Vec<String> = table
            .command_line_definitions()
            .unwrap()
            .iter()
            .map(MacroDefinition::to_compiler_arg)
            .collect();
        assert_eq!(args, vec!["-D__STDC__=1", "-D__GNUC__=12", "-DDEBUG=1"]);
    }

    #[test]
    fn test_command_line_macros_empty() {
        let table = MacinfoTable::new(0);
        assert!(table.command_line_macros().unwrap().is_empty());
    }

    #[test]
    fn test_command_line_included_files() {
        let table = MacinfoTable::with_reader(0, sample_reader());
        assert_eq!(table.command_line_included_files().unwrap(), vec![2]);
        assert_eq!(table.command_line_included_files().unwrap(), vec![2]);

        let detached = MacinfoTable::new(0);
        assert!(detached.command_line_included_files().unwrap().is_empty());
    }

    #[test]
    fn test_reader_failure_propagates() {
        let reader = Arc::new(FakeReader {
            fail: true,
            ..FakeReader::default()
        });
        let table = MacinfoTable::with_reader(0, reader);

        assert!(matches!(table.base_table(), Err(Error::Io(_))));
        assert!(matches!(table.macros(1), Err(Error::Io(_))));
        assert!(matches!(table.command_line_macros(), Err(Error::Io(_))));
        assert_eq!(table.load_state(TablePart::Base), LoadState::Unloaded);
    }

    #[test]
    fn test_concurrent_readers_load_once() {
        let reader = sample_reader();
        let table = MacinfoTable::with_reader(0, reader.clone());

        std::thread::scope(|scope| {
            for _ in 0..8 {
                scope.spawn(|| {
                    assert_eq!(table.macros(1).unwrap().len(), 2);
                    assert_eq!(table.command_line_macros().unwrap().len(), 3);
                });
            }
        });

        assert_eq!(reader.base_reads.load(Ordering::SeqCst), 1);
        assert_eq!(reader.file_reads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stray_records_keep_base_final() {
        let reader = Arc::new(FakeReader {
            base: vec![
                MacroRecord::define(1, None, "A"),
                MacroRecord::define(2, Some(3), "MISPLACED"),
            ],
            file: vec![
                MacroRecord::start_file(0, 1),
                MacroRecord::end_file(Some(1)),
                MacroRecord::define(5, None, "TRAILING"),
            ],
            ..FakeReader::default()
        });
        let table = MacinfoTable::with_reader(0, reader);

        let base = table.base_table().unwrap();
        assert_eq!(base.len(), 1);

        let file = table.file_table().unwrap().to_vec();
        assert_eq!(file.len(), 3);
        assert_eq!(file[0].text, "MISPLACED");

        // Loading the file table leaves the base table untouched.
        assert_eq!(table.base_table().unwrap(), base);
        assert!(file.iter().all(|r| r.text != "TRAILING"));
    }
}
