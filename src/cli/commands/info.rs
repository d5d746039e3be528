//! Info command: summarize the configured corpus.

use crate::cli::Output;
use crate::config::Settings;
use crate::corpus::{load_corpus, CorpusHandle};
use anyhow::Result;

/// Run the info command.
pub async fn run_info(settings: Settings) -> Result<()> {
    let store = match load_corpus(&settings.corpus).await {
        CorpusHandle::Ready(store) => store,
        CorpusHandle::Unavailable { reason } => {
            Output::error(&format!("Corpus unavailable: {}", reason));
            anyhow::bail!("corpus unavailable");
        }
    };

    let summary = store.summary();
    Output::header(&format!("Corpus ({} videos)", summary.videos.len()));
    println!();
    for video in &summary.videos {
        Output::video_info(&video.number, &video.title, video.chunk_count, video.duration_seconds);
    }

    println!();
    Output::kv("Total chunks", &summary.chunk_count.to_string());
    Output::kv("Dimensions", &summary.dimensions.to_string());
    Output::kv("Model", summary.model.as_deref().unwrap_or("unknown"));
    Output::kv("Embedder", &format!("{} ({})", settings.embedding.provider, settings.embedding.model()));
    Ok(())
}
