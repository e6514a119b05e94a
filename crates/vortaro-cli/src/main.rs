//! # Vortaro CLI
//!
//! Command-line interface for the Vortaro dictionary tool.
//!
//! ## Commands
//!
//! - `vortaro index` - Index new or changed dictionary files
//! - `vortaro search <text>` - Look up words containing a substring
//! - `vortaro languages` - List the indexed from-languages
//! - `vortaro status` - Show index status and statistics
//! - `vortaro clear` - Delete the index
//! - `vortaro configure` - Write a default configuration file
//!
//! ## Example Usage
//!
//! ```bash
//! # Put dict.cc exports under <data_dir>/dict.cc/, then
//! vortaro index
//!
//! # Serbian words containing "ar", in either script
//! vortaro search ar -f sr
//! vortaro search шар
//! ```

mod app;
mod commands;
mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Vortaro - multilingual dictionary search
#[derive(Parser)]
#[command(name = "vortaro")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true, env = "VORTARO_CONFIG")]
    config: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index new or changed dictionary files
    Index {
        /// Discard the index and rebuild it from scratch
        #[arg(short, long)]
        force: bool,

        /// Reindex these files even if they look unchanged
        #[arg(long = "file", value_name = "PATH")]
        files: Vec<PathBuf>,
    },

    /// Search for words containing the given text
    #[command(alias = "s")]
    Search {
        /// Text to look for, in Latin or native script
        text: String,

        /// Maximum number of rows (0 = fit the terminal)
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Only search these from-languages (repeatable)
        #[arg(short, long = "from", value_name = "LANG")]
        from: Vec<String>,

        /// Only show translations into these languages (repeatable)
        #[arg(short, long = "to", value_name = "LANG")]
        to: Vec<String>,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: OutputFormat,

        /// Table width in columns (0 = terminal width)
        #[arg(short, long)]
        width: Option<usize>,
    },

    /// List the languages you can search from
    Languages,

    /// Show index status and statistics
    Status,

    /// Clear the index and all data
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Write a default configuration file
    Configure,
}

#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let Cli {
        config: config_path,
        verbose,
        quiet,
        command,
    } = Cli::parse();

    // Configure writes the file the other commands read
    if let Commands::Configure = command {
        init_logging(verbose, quiet, "warn");
        return commands::configure::run(config_path.as_deref());
    }

    let config = match &config_path {
        Some(path) => vortaro_core::Config::load_from(path)?,
        None => vortaro_core::Config::load()?,
    };
    init_logging(verbose, quiet, &config.general.log_level);

    match command {
        Commands::Index { force, files } => commands::index::run(config, force, files),
        Commands::Search {
            text,
            limit,
            from,
            to,
            output,
            width,
        } => commands::search::run(config, &text, limit, from, to, output, width),
        Commands::Languages => commands::languages::run(config),
        Commands::Status => commands::status::run(config),
        Commands::Clear { yes } => commands::clear::run(config, yes),
        Commands::Configure => Ok(()),
    }
}

fn init_logging(verbose: u8, quiet: bool, configured: &str) {
    let log_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => configured,
            1 => "debug",
            _ => "trace",
        }
    };

    // Logs go to stderr so JSON output stays clean
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .init();
}
