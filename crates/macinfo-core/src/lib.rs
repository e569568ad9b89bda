//! macinfo Core
//!
//! Core types, errors and configuration shared by the macro-info reader
//! and the command-line tool.

pub mod config;
pub mod definition;
pub mod error;
pub mod types;

pub use config::{Config, DumpConfig, ReaderConfig};
pub use definition::MacroDefinition;
pub use error::{Error, Result};
pub use types::*;
