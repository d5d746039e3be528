//! Lectern - question answering over lecture-video subtitles
//!
//! Answers questions about a video course by retrieving the most relevant
//! subtitle chunks and asking a language model to answer from them, citing
//! the video and timestamp of each point.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `corpus` - Subtitle chunks with their embeddings, loaded read-only at start
//! - `embedding` - Query and document embedding providers
//! - `ranking` - Top-k retrieval strategies (cosine, lexical)
//! - `rag` - Context assembly and prompt construction
//! - `generation` - Answer generation providers
//! - `orchestrator` - Per-request pipeline and its typed failures
//! - `server` - HTTP surface
//! - `indexer` - Offline corpus builder
//!
//! # Example
//!
//! ```rust,no_run
//! use lectern::config::Settings;
//! use lectern::orchestrator::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let orchestrator = Orchestrator::from_settings(&settings).await?;
//!
//!     match orchestrator.answer("How do I draw a triangle?").await {
//!         Ok(answer) => println!("{}", answer.answer),
//!         Err(failure) => eprintln!("{}", failure.error.user_message()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod corpus;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod indexer;
pub mod orchestrator;
pub mod rag;
pub mod ranking;
pub mod server;

pub use error::{LecternError, Result};
