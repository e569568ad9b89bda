//! macinfo CLI
//!
//! Command-line interface for inspecting `.debug_macinfo` sections.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use macinfo_core::{Config, MacroDefinition, MacroRecord};
use macinfo_table::{summarize_units, MacinfoSection, MacinfoTable, SectionReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "macinfo")]
#[command(author, version, about = "DWARF macro info inspector", long_about = None)]
struct Cli {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Input {
    /// Raw section dump, or an ELF object with --object
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Treat FILE as an ELF object and extract the section from it
    #[arg(long)]
    object: bool,

    /// Unit offset within the section (decimal or 0x-prefixed hex)
    #[arg(long, default_value = "0", value_parser = parse_offset)]
    offset: u64,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump the base and file tables of a unit
    Dump {
        #[command(flatten)]
        input: Input,
    },

    /// Show macros defined on the compiler command line
    Cmdline {
        #[command(flatten)]
        input: Input,

        /// Print as compiler -D/-U arguments
        #[arg(long)]
        args: bool,
    },

    /// Show the macros of one included file
    File {
        #[command(flatten)]
        input: Input,

        /// File index from the line-program file table
        #[arg(short, long)]
        index: u32,
    },

    /// Show files force-included from the command line
    Includes {
        #[command(flatten)]
        input: Input,
    },

    /// Summarize every unit in the section
    Units {
        #[command(flatten)]
        input: Input,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Dump { input } => cmd_dump(&input, &config)?,
        Commands::Cmdline { input, args } => cmd_cmdline(&input, &config, args)?,
        Commands::File { input, index } => cmd_file(&input, &config, index)?,
        Commands::Includes { input } => cmd_includes(&input, &config)?,
        Commands::Units { input } => cmd_units(&input, &config)?,
    }

    Ok(())
}

fn parse_offset(s: &str) -> std::result::Result<u64, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| format!("invalid offset '{}': {}", s, e))
}

fn open_section(input: &Input, config: &Config) -> Result<Arc<MacinfoSection>> {
    let section = if input.object {
        MacinfoSection::from_object(&input.file, config.reader.clone())
    } else {
        MacinfoSection::open(&input.file).map(|s| s.with_config(config.reader.clone()))
    }
    .with_context(|| format!("failed to read {}", input.file.display()))?;

    debug!("Loaded {} bytes from {}", section.data().len(), input.file.display());
    Ok(Arc::new(section))
}

fn open_table(input: &Input, config: &Config) -> Result<MacinfoTable> {
    let section: Arc<dyn SectionReader> = open_section(input, config)?;
    Ok(MacinfoTable::with_reader(input.offset, section))
}

fn print_records(title: &str, file: &Path, records: &[MacroRecord], format: &str) -> Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }

    println!("{} in {}:", title, file.display());
    if records.is_empty() {
        println!("  (none)");
    }
    for record in records {
        println!("  {}", record);
    }
    Ok(())
}

fn cmd_dump(input: &Input, config: &Config) -> Result<()> {
    let table = open_table(input, config)?;

    if input.format == "json" {
        let result = serde_json::json!({
            "offset": table.offset(),
            "file_offset": table.file_offset()?,
            "base": &*table.base_table()?,
            "file": &*table.file_table()?,
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let mut text = String::new();
    table.dump_with(&mut text, &config.dump)?;
    print!("{}", text);
    Ok(())
}

fn cmd_cmdline(input: &Input, config: &Config, args: bool) -> Result<()> {
    let table = open_table(input, config)?;
    let macros = table.command_line_macros()?;

    if args {
        let args: Vec<String> = macros
            .iter()
            .filter_map(MacroDefinition::from_record)
            .map(|d| d.to_compiler_arg())
            .collect();
        if input.format == "json" {
            println!("{}", serde_json::to_string_pretty(&args)?);
        } else {
            println!("{}", args.join(" "));
        }
        return Ok(());
    }

    print_records("Command-line macros", &input.file, &macros, &input.format)
}

fn cmd_file(input: &Input, config: &Config, index: u32) -> Result<()> {
    let table = open_table(input, config)?;
    let macros = table.macros(index)?;
    print_records(&format!("Macros of file #{}", index), &input.file, &macros, &input.format)
}

fn cmd_includes(input: &Input, config: &Config) -> Result<()> {
    let table = open_table(input, config)?;
    let files = table.command_line_included_files()?;

    if input.format == "json" {
        println!("{}", serde_json::to_string_pretty(&files)?);
    } else if files.is_empty() {
        println!("No command-line includes");
    } else {
        for file in files {
            println!("  file #{}", file);
        }
    }
    Ok(())
}

fn cmd_units(input: &Input, config: &Config) -> Result<()> {
    let section = open_section(input, config)?;
    let offsets = section.unit_offsets()?;
    let summaries = summarize_units(section, &offsets);

    if input.format == "json" {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("{} units in {}:", summaries.len(), input.file.display());
    for summary in &summaries {
        match &summary.error {
            Some(error) => println!("  {:#010x}  error: {}", summary.offset, error),
            None => println!(
                "  {:#010x}  base {:>4}  file {:>5}  command-line {:>4}  includes {:?}",
                summary.offset,
                summary.base_entries,
                summary.file_entries,
                summary.command_line.len(),
                summary.included_files
            ),
        }
    }
    Ok(())
}
