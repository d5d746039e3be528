//! CLI module for Lectern.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Lectern - question answering over lecture-video subtitles
///
/// Finds the course video passages most relevant to a question and answers
/// with timestamps pointing back into the videos.
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "LECTERN_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the HTTP query service
    Serve {
        /// Host to bind to (default: server.host from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (default: server.port from config, or $PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Build a corpus file from a folder of subtitle JSON files
    Index {
        /// Folder containing one JSON file per video
        dir: String,

        /// Output corpus file (default: corpus.path from config)
        #[arg(short, long)]
        output: Option<String>,

        /// Merge every N consecutive chunks of a video into one
        #[arg(long, default_value = "1")]
        merge: usize,
    },

    /// Ask a question and get an answer with video timestamps
    Ask {
        /// The question to ask
        query: String,

        /// Number of chunks to use as context
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show the chunks most relevant to a query, without generating an answer
    Search {
        /// Search query
        query: String,

        /// Maximum number of results
        #[arg(short = 'k', long)]
        top_k: Option<usize>,
    },

    /// Show what the loaded corpus contains
    Info,

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

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "retrieval.top_k")
        key: String,
        /// Configuration value
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ask_with_k() {
        let cli = Cli::try_parse_from(["lectern", "-v", "ask", "what is a VAO?", "-k", "3"]).unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Ask { query, top_k } => {
                assert_eq!(query, "what is a VAO?");
                assert_eq!(top_k, Some(3));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_index_defaults() {
        let cli = Cli::try_parse_from(["lectern", "index", "newjsons"]).unwrap();
        match cli.command {
            Commands::Index { dir, output, merge } => {
                assert_eq!(dir, "newjsons");
                assert!(output.is_none());
                assert_eq!(merge, 1);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
