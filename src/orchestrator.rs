//! Query orchestrator for Lectern.
//!
//! Runs one request through validate → embed → rank → assemble → generate.
//! Each stage fails fast with a [`QueryError`] naming the stage; nothing is
//! retried here. Retry policy, if any, belongs to the provider implementations.

use crate::config::{Prompts, Settings};
use crate::corpus::{load_corpus, CorpusHandle};
use crate::embedding::{create_embedder, Embedder};
use crate::error::{ProviderError, Result};
use crate::generation::{create_generator, Generator};
use crate::rag::{ContextAssembler, ContextEntry, Context, DEFAULT_MAX_TEXT_CHARS};
use crate::ranking::{create_ranker, RankQuery, Ranker, RankingError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::client::with_deadline;

const DEFAULT_TOP_K: usize = 5;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Why a query could not be answered.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("corpus unavailable: {reason}")]
    CorpusUnavailable { reason: String },

    #[error("retrieval unavailable: {0}")]
    RetrievalUnavailable(ProviderError),

    #[error("ranking failed: {0}")]
    Ranking(#[from] RankingError),

    #[error("generation unavailable: {0}")]
    GenerationUnavailable(ProviderError),
}

impl QueryError {
    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::EmptyQuery => "empty_query",
            QueryError::CorpusUnavailable { .. } => "corpus_unavailable",
            QueryError::RetrievalUnavailable(_) => "retrieval_unavailable",
            QueryError::Ranking(_) => "ranking_error",
            QueryError::GenerationUnavailable(_) => "generation_unavailable",
        }
    }

    /// Whether a provider refused the call for quota or billing reasons.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            QueryError::RetrievalUnavailable(e) | QueryError::GenerationUnavailable(e) => e.is_rate_limited(),
            _ => false,
        }
    }

    /// Message safe to show to the person who asked.
    pub fn user_message(&self) -> &'static str {
        if self.is_rate_limited() {
            return "API limit reached or billing required. Please try again later.";
        }
        match self {
            QueryError::EmptyQuery => "Please enter a question.",
            QueryError::CorpusUnavailable { .. } => {
                "Embeddings not loaded. Please set EMBEDDINGS_URL or add an embeddings file to the project."
            }
            QueryError::RetrievalUnavailable(_) => {
                "Searching the course videos is unavailable right now. Please try again later."
            }
            QueryError::Ranking(_) => "The course index could not be searched. Please contact the site administrator.",
            QueryError::GenerationUnavailable(_) => {
                "Sorry, the AI model is currently unavailable. Please try again later."
            }
        }
    }
}

/// A failed query, keeping the original text so the caller can retry it.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct QueryFailure {
    pub query: String,
    pub error: QueryError,
}

/// A generated answer and the context it was generated from.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub query: String,
    pub answer: String,
    pub sources: Vec<ContextEntry>,
}

/// Retrieval-only results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub results: Vec<ContextEntry>,
}

/// Coordinates the corpus and the two providers for each query.
///
/// Holds only shared, read-only state, so one instance serves any number of
/// concurrent requests.
pub struct Orchestrator {
    corpus: CorpusHandle,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    ranker: Arc<dyn Ranker>,
    assembler: ContextAssembler,
    top_k: usize,
    embed_timeout: Duration,
    generate_timeout: Duration,
}

impl Orchestrator {
    /// Load the corpus and build the configured providers.
    ///
    /// A corpus that fails to load does not make this fail: the orchestrator
    /// starts and answers every query with `CorpusUnavailable`.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let corpus = load_corpus(&settings.corpus).await;
        let embedder = create_embedder(&settings.embedding)?;
        let generator = create_generator(&settings.generation, prompts)?;
        let ranker = create_ranker(settings.retrieval.ranker);

        info!(
            embedder = embedder.name(),
            generator = generator.name(),
            ranker = ranker.name(),
            "Orchestrator ready"
        );

        Ok(Self::with_components(corpus, embedder, generator, ranker)
            .with_top_k(settings.retrieval.top_k)
            .with_max_text_chars(settings.retrieval.max_text_chars)
            .with_timeouts(settings.embedding.timeout(), settings.generation.timeout()))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        corpus: CorpusHandle,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        ranker: Arc<dyn Ranker>,
    ) -> Self {
        Self {
            corpus,
            embedder,
            generator,
            ranker,
            assembler: ContextAssembler::new(DEFAULT_MAX_TEXT_CHARS),
            top_k: DEFAULT_TOP_K,
            embed_timeout: DEFAULT_TIMEOUT,
            generate_timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the number of chunks handed to the generator.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Set the per-chunk text limit.
    pub fn with_max_text_chars(mut self, max_text_chars: usize) -> Self {
        self.assembler = ContextAssembler::new(max_text_chars);
        self
    }

    /// Set the deadlines for the embed and generate calls.
    pub fn with_timeouts(mut self, embed: Duration, generate: Duration) -> Self {
        self.embed_timeout = embed;
        self.generate_timeout = generate;
        self
    }

    pub fn corpus(&self) -> &CorpusHandle {
        &self.corpus
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer a query.
    #[instrument(skip(self, query), fields(request_id = %Uuid::new_v4()))]
    pub async fn answer(&self, query: &str) -> std::result::Result<Answer, QueryFailure> {
        let fail = |error: QueryError| {
            warn!(kind = error.kind(), rate_limited = error.is_rate_limited(), "Query failed: {}", error);
            QueryFailure {
                query: query.to_string(),
                error,
            }
        };

        let context = self.retrieve(query, self.top_k).await.map_err(fail)?;

        let answer = with_deadline(
            self.generator.name(),
            self.generate_timeout,
            self.generator.generate(&context, query),
        )
        .await
        .map_err(|e| fail(QueryError::GenerationUnavailable(e)))?;

        info!(sources = context.len(), "Answered query");
        Ok(Answer {
            query: query.to_string(),
            answer,
            sources: context.into_entries(),
        })
    }

    /// Retrieve the best `k` chunks (default: the configured top-k) without
    /// generating an answer.
    #[instrument(skip(self, query), fields(request_id = %Uuid::new_v4()))]
    pub async fn search(
        &self,
        query: &str,
        k: Option<usize>,
    ) -> std::result::Result<SearchResults, QueryFailure> {
        match self.retrieve(query, k.unwrap_or(self.top_k)).await {
            Ok(context) => Ok(SearchResults {
                query: query.to_string(),
                results: context.into_entries(),
            }),
            Err(error) => {
                warn!(kind = error.kind(), "Search failed: {}", error);
                Err(QueryFailure {
                    query: query.to_string(),
                    error,
                })
            }
        }
    }

    /// Validate, embed, rank and assemble.
    async fn retrieve(&self, query: &str, k: usize) -> std::result::Result<Context, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::EmptyQuery);
        }

        let store = match &self.corpus {
            CorpusHandle::Ready(store) => Arc::clone(store),
            CorpusHandle::Unavailable { reason } => {
                return Err(QueryError::CorpusUnavailable {
                    reason: reason.clone(),
                })
            }
        };

        let vector = if self.ranker.requires_embedding() {
            let vector = with_deadline(
                self.embedder.name(),
                self.embed_timeout,
                self.embedder.embed_query(query),
            )
            .await
            .map_err(QueryError::RetrievalUnavailable)?;
            Some(vector)
        } else {
            None
        };

        let ranked = self
            .ranker
            .top_k(&store, &RankQuery::new(query, vector.as_deref()), k)?;
        debug!(
            ranker = self.ranker.name(),
            candidates = ranked.len(),
            top_score = ranked.first().map(|r| r.score),
            "Ranked corpus"
        );

        Ok(self.assembler.build(&ranked))
    }
}
