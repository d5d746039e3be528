//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(query: &str, top_k: Option<usize>, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(&settings, Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let mut orchestrator = Orchestrator::from_settings(&settings).await?;
    if let Some(k) = top_k {
        orchestrator = orchestrator.with_top_k(k);
    }

    let spinner = Output::spinner("Searching the course videos...");
    let result = orchestrator.answer(query).await;
    spinner.finish_and_clear();

    match result {
        Ok(answer) => {
            println!("\n{}\n", answer.answer);

            if !answer.sources.is_empty() {
                Output::header("Sources");
                for source in &answer.sources {
                    Output::search_result(
                        &source.number,
                        &source.title,
                        &source.format_timestamp(),
                        source.score,
                        &source.text,
                    );
                }
            }
            Ok(())
        }
        Err(failure) => {
            Output::error(failure.error.user_message());
            Err(failure.into())
        }
    }
}
