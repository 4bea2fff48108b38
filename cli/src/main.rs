//! `qcr` - retrieval-augmented answers over past manufacturing quality cases.
//!
//! ```bash
//! qcr build                      # index every supported file under ./data
//! qcr ask "How did we fix weld porosity?"
//! qcr search "paint peeling" -k 3 --json
//! qcr chat
//! ```

mod chat;
mod commands;
mod demo;
mod logging;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use qcr_core::error::AppError;

use commands::AppContext;

/// Quality case retrieval and answer assistant.
#[derive(Parser)]
#[command(name = "qcr", version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Folder with quality case files (overrides QUALITY_DATA_FOLDER)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Vector index directory (overrides QCR_INDEX_PATH)
    #[arg(long, global = true)]
    index_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show index readiness and configuration
    Status {
        /// Also call the API to verify the key and base URL
        #[arg(long)]
        check_api: bool,
    },
    /// Build the index from the data folder if it does not exist yet
    Build {
        /// Rebuild even if an index already exists
        #[arg(long)]
        force: bool,
    },
    /// Delete the index and build it again from the data folder
    Rebuild {
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Add files or folders to the existing index
    Update {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Append every chunk, even ones already indexed
        #[arg(long)]
        append: bool,
    },
    /// Ask a question and get an answer grounded in past cases
    Ask {
        question: String,
        #[arg(long)]
        no_sources: bool,
        #[arg(long)]
        json: bool,
    },
    /// Find cases similar to a description
    Search {
        query: String,
        #[arg(short, default_value = "5")]
        k: usize,
        #[arg(long)]
        json: bool,
    },
    /// List the documents most relevant to a query
    Docs {
        query: String,
        #[arg(short, default_value = "3")]
        k: usize,
        #[arg(long)]
        json: bool,
    },
    /// Search by several keywords and merge the results
    Keywords {
        #[arg(required = true)]
        keywords: Vec<String>,
        #[arg(short, default_value = "5")]
        k: usize,
        #[arg(long)]
        json: bool,
    },
    /// Interactive question-and-answer session
    Chat,
    /// Seed sample cases, build the index and run sample questions
    Demo,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let ctx = AppContext::load(cli.data_dir, cli.index_path)?;
    match cli.command {
        Command::Status { check_api } => commands::status(&ctx, check_api),
        Command::Build { force } => commands::build(&ctx, force),
        Command::Rebuild { yes } => commands::rebuild(&ctx, yes),
        Command::Update { paths, append } => commands::update(&ctx, &paths, append),
        Command::Ask {
            question,
            no_sources,
            json,
        } => commands::ask(&ctx, &question, !no_sources, json),
        Command::Search { query, k, json } => commands::search(&ctx, &query, k, json),
        Command::Docs { query, k, json } => commands::docs(&ctx, &query, k, json),
        Command::Keywords { keywords, k, json } => commands::keywords(&ctx, &keywords, k, json),
        Command::Chat => chat::run(&ctx),
        Command::Demo => demo::run(&ctx),
    }
}

fn report_error(e: &AppError) {
    eprintln!("error: {e}");
    if let Some(details) = &e.details {
        eprintln!("  details: {details}");
    }
    if e.retryable {
        eprintln!("  this error may be temporary; try again");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["qcr", "search", "weld", "-k", "3", "--index-path", "idx", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.index_path, Some(PathBuf::from("idx")));
        match cli.command {
            Command::Search { query, k, json } => {
                assert_eq!(query, "weld");
                assert_eq!(k, 3);
                assert!(!json);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn keywords_and_update_require_arguments() {
        assert!(Cli::try_parse_from(["qcr", "keywords"]).is_err());
        assert!(Cli::try_parse_from(["qcr", "update"]).is_err());
        let cli = Cli::try_parse_from(["qcr", "keywords", "weld", "paint"]).unwrap();
        match cli.command {
            Command::Keywords { keywords, k, .. } => {
                assert_eq!(keywords, vec!["weld", "paint"]);
                assert_eq!(k, 5);
            }
            _ => panic!("expected keywords"),
        }
    }
}
