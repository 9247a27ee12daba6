use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::resolver::format::XML_SPREADSHEET;
use crate::resolver::{Backend, Selection};

#[derive(Parser)]
#[command(name = "sheetclip", about = "Read spreadsheet tables from the X11 clipboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Read and parse the clipboard's spreadsheet content
    Read {
        #[command(flatten)]
        source: SourceArgs,

        /// How to print a parsed payload
        #[arg(long, value_enum, default_value_t = OutputMode::Tsv)]
        output: OutputMode,
    },

    /// Print the raw payload, terminator included
    Dump {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// List the formats the clipboard owner offers
    Formats {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Print every new spreadsheet payload until interrupted
    Watch {
        #[command(flatten)]
        source: SourceArgs,

        /// Polling interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,

        /// How to print a parsed payload
        #[arg(long, value_enum, default_value_t = OutputMode::Tsv)]
        output: OutputMode,
    },
}

/// Where the payload comes from.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Clipboard format to read
    #[arg(long, default_value = XML_SPREADSHEET)]
    pub format_name: String,

    /// Clipboard backend
    #[arg(long, value_enum, default_value_t = Backend::X11)]
    pub backend: Backend,

    /// X selection to read
    #[arg(long, value_enum, default_value_t = Selection::Clipboard)]
    pub selection: Selection,

    /// How long to wait for the selection owner, in milliseconds
    #[arg(long, default_value_t = 3000)]
    pub timeout_ms: u64,

    /// Read a saved payload from this file instead of the clipboard
    #[arg(long)]
    pub input: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Tab-separated rows, one block per worksheet
    Tsv,
    /// Indented element tree
    Tree,
}
