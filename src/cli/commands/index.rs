//! Index command: build a corpus file from subtitle JSON files.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::create_embedder;
use crate::indexer::Indexer;
use anyhow::Result;

/// Run the index command.
pub async fn run_index(dir: &str, output: Option<String>, merge: usize, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(&settings, Operation::Index) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let dir = Settings::expand_path(dir);
    if !dir.is_dir() {
        anyhow::bail!("{} is not a directory", dir.display());
    }
    let output = output
        .map(|p| Settings::expand_path(&p))
        .unwrap_or_else(|| settings.corpus_path());

    let embedder = create_embedder(&settings.embedding)?;
    let indexer = Indexer::new(
        embedder,
        settings.embedding.batch_size,
        settings.embedding.max_concurrent_batches,
    );

    Output::info(&format!("Indexing {}", dir.display()));
    let progress = Output::progress_bar(0, "embedding");
    let result = indexer.run(&dir, &output, merge, Some(&progress)).await;
    progress.finish_and_clear();

    match result {
        Ok(report) => {
            Output::success(&format!("Wrote {}", report.output.display()));
            Output::kv("Files", &report.files.to_string());
            Output::kv("Chunks", &report.chunks.to_string());
            Output::kv("Skipped (empty)", &report.skipped.to_string());
            Output::kv("Dimensions", &report.dimensions.to_string());
            Ok(())
        }
        Err(e) => {
            Output::error(&format!("Indexing failed: {}", e));
            Err(e.into())
        }
    }
}
