//! # askdoc
//!
//! Retrieval-augmented question answering and risk-event extraction for PDF
//! documents.
//!
//! askdoc turns a PDF into an in-memory similarity index (extract → chunk →
//! embed) and answers questions against it by retrieving the most similar
//! passages and conditioning a chat completion on them. A second mode pulls
//! structured risk events out of the document as validated JSON, with a
//! bounded retry loop around the model call.
//!
//! The crate is the core of a UI-driven assistant: it exposes typed
//! operations on an explicit [`session::Session`] and leaves rendering,
//! upload handling, and credential storage to the embedding application.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐   ┌────────────────┐
//! │   PDF    │──▶│ Extract +   │──▶│  Similarity    │
//! │  bytes   │   │ Chunk+Embed │   │ Index (memory) │
//! └──────────┘   └─────────────┘   └───────┬────────┘
//!                                          │ top-k
//!                      ┌───────────────────┤
//!                      ▼                   ▼
//!                 ┌──────────┐       ┌──────────┐
//!                 │   Q&A    │       │  Event   │
//!                 │  prompt  │       │ extract  │
//!                 └────┬─────┘       └────┬─────┘
//!                      └───────┬──────────┘
//!                              ▼
//!                      ┌──────────────┐
//!                      │  Completion  │
//!                      │   endpoint   │
//!                      └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use askdoc::{config::Config, pipeline::Pipeline, session::Session};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::from_config(Config::default())?;
//! let mut session = Session::new();
//!
//! let bytes = std::fs::read("contract.pdf")?;
//! let info = pipeline.index_document(&mut session, "contract.pdf", &bytes).await?;
//! println!("indexed {} chunks over {} pages", info.chunk_count, info.pages);
//!
//! let answer = pipeline.ask(&mut session, "合同金额是多少？").await?;
//! println!("{}", answer.text);
//!
//! for event in pipeline.extract_events(&session).await? {
//!     println!("{} [{:?}]", event.event_name, event.risk_level);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Pipeline-level error type |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Separator-aware overlapping chunker |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | In-memory cosine similarity index |
//! | [`completion`] | Chat completion client |
//! | [`prompt`] | Prompt assembly |
//! | [`events`] | Structured risk-event extraction |
//! | [`session`] | Per-user session state |
//! | [`pipeline`] | Orchestration of the user actions |
//! | [`testing`] | Mock providers for tests |

pub mod chunk;
pub mod completion;
pub mod config;
pub mod embedding;
pub mod error;
pub mod events;
pub mod extract;
pub mod index;
pub mod models;
pub mod pipeline;
pub mod prompt;
pub mod session;
pub mod testing;
