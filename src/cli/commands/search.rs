//! Search command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the search command.
pub async fn run_search(query: &str, top_k: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(&settings, Operation::Search) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::from_settings(&settings).await?;

    let spinner = Output::spinner("Searching...");
    let result = orchestrator.search(query, top_k).await;
    spinner.finish_and_clear();

    match result {
        Ok(results) if results.results.is_empty() => {
            Output::warning("No results found matching your query.");
            Ok(())
        }
        Ok(results) => {
            Output::success(&format!("Found {} results", results.results.len()));
            for entry in &results.results {
                Output::search_result(
                    &entry.number,
                    &entry.title,
                    &entry.format_timestamp(),
                    entry.score,
                    &entry.text,
                );
            }
            Ok(())
        }
        Err(failure) => {
            Output::error(&format!("Search failed: {}", failure.error.user_message()));
            Err(failure.into())
        }
    }
}
