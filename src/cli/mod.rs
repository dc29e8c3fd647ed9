//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "callsight",
    version,
    about = "Ask questions about earnings call transcripts",
    long_about = "Callsight indexes earnings call transcripts into a local vector index and answers \
                  questions about them, grounding every answer in retrieved transcript excerpts."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/callsight/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load, chunk, embed and index the transcript directory
    Ingest {
        /// Transcript directory (defaults to transcripts.dir from the config)
        #[arg(short, long, value_name = "DIR")]
        dir: Option<PathBuf>,

        /// Clear the index and re-ingest every transcript
        #[arg(long)]
        rebuild: bool,
    },

    /// Answer a question from the indexed transcripts
    Query {
        /// Question to ask
        question: String,

        /// Number of excerpts to retrieve (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Only use excerpts from this company
        #[arg(long)]
        company: Option<String>,

        /// Print the excerpts the answer was based on
        #[arg(long)]
        sources: bool,
    },

    /// Show the excerpts most similar to a text, without generating an answer
    Search {
        /// Search text
        text: String,

        /// Maximum number of results (defaults to retrieval.top_k)
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Only show excerpts from this company
        #[arg(long)]
        company: Option<String>,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Interactive question answering with conversation history
    Chat {
        /// Number of excerpts to retrieve per question
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Only use excerpts from this company
        #[arg(long)]
        company: Option<String>,
    },

    /// Show index statistics
    Stats,

    /// List companies present in the index
    Companies,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
