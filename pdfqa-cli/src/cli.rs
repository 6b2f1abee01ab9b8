//! Command-line arguments.

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

/// Ask questions about a PDF document, answered only from its contents.
#[derive(Parser, Debug)]
#[command(name = "pdfqa", version, about)]
pub struct Cli {
    /// Raise the default log level to debug. `RUST_LOG` still wins.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Load the PDF into the vector store, replacing earlier contents.
    Ingest {
        /// PDF to ingest. Defaults to `PDF_PATH` or `./document.pdf`.
        #[arg(long)]
        pdf: Option<PathBuf>,
        /// Keep existing chunks instead of replacing the collection.
        #[arg(long)]
        append: bool,
    },
    /// Start the interactive question shell.
    Chat,
    /// Print the chunks nearest to a query with their distances.
    Search {
        /// Query text.
        query: String,
        /// Number of chunks to return.
        #[arg(short, default_value_t = 10)]
        k: usize,
    },
    /// Run the reference questions through the answer pipeline.
    Selftest,
}

impl Commands {
    /// Log level used when neither `RUST_LOG` nor `-v` is given.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Commands::Ingest { .. } | Commands::Selftest => "info",
            Commands::Chat | Commands::Search { .. } => "warn",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::parse_from(["pdfqa", "ingest", "--pdf", "report.pdf", "--append"]);
        assert_eq!(
            cli.command,
            Commands::Ingest { pdf: Some(PathBuf::from("report.pdf")), append: true }
        );

        let cli = Cli::parse_from(["pdfqa", "-v", "search", "revenue", "-k", "3"]);
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.command, Commands::Search { query: "revenue".into(), k: 3 });
    }

    #[test]
    fn chat_is_quiet_by_default() {
        assert_eq!(Commands::Chat.default_log_level(), "warn");
        assert_eq!(Commands::Selftest.default_log_level(), "info");
    }
}
