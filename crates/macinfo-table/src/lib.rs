//! macinfo Table
//!
//! Decoding of the DWARF `.debug_macinfo` section and reconstruction of
//! per-unit macro tables.
//!
//! ## Modules
//!
//! - `cursor` - Bounds-checked reads of LEB128 operands and strings
//! - `section` - Section reader trait and the `.debug_macinfo` decoder
//! - `table` - Lazily loaded base and file tables of one unit
//! - `heuristic` - Detection of command-line macros in the base table
//! - `dump` - Text dump of a table
//! - `object` - Section extraction from ELF objects
//! - `units` - Parallel summaries over all units of a section

pub mod cursor;
pub mod dump;
pub mod heuristic;
pub mod object;
pub mod section;
pub mod table;
pub mod units;

pub use heuristic::command_line_span;
pub use section::{MacinfoSection, MacroSink, Partition, SectionReader, TablePart};
pub use table::{Entries, LoadState, MacinfoTable};
pub use units::{summarize_units, UnitSummary};
