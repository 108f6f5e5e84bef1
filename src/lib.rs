//! # docqa-context
//!
//! Context retrieval for document question answering.
//!
//! Given a document's extracted text and a question, docqa-context cuts the
//! text into overlapping chunks, narrows them with a keyword prefilter,
//! re-ranks the survivors with an optional language-model rater, and packs
//! the best into a length-bounded context string for the answering step.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────┐   ┌──────────┐   ┌───────────┐
//! │  Segment  │──▶│ Prefilter │──▶│   Rank   │──▶│ Assemble  │
//! │ (chunks)  │   │ (keyword) │   │ (rater)  │   │ (budget)  │
//! └───────────┘   └───────────┘   └──────────┘   └───────────┘
//!                                      │
//!                        ┌─────────────┴─────────┐
//!                        ▼                       ▼
//!                   ┌──────────┐          ┌────────────┐
//!                   │  Gemini  │          │   Ollama   │
//!                   └──────────┘          └────────────┘
//! ```
//!
//! The pipeline itself lives in [`docqa_context_core`]; this crate adds
//! configuration, rating providers, text extraction, the CLI, and the HTTP
//! server.
//!
//! ## Quick Start
//!
//! ```bash
//! docqa chunk handbook.pdf
//! docqa context handbook.pdf "What is the refund window?"
//! docqa serve
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`extract`] | PDF and plain-text extraction |
//! | [`rater`] | Rating service providers |
//! | [`chunk`] | `docqa chunk` |
//! | [`stats`] | `docqa stats` |
//! | [`context`] | `docqa context` |
//! | [`server`] | HTTP server |

pub mod chunk;
pub mod config;
pub mod context;
pub mod extract;
pub mod rater;
pub mod server;
pub mod stats;
