//! # docqa-context core
//!
//! Shared, WASM-safe logic for single-document question answering: chunk
//! models, boundary-aware segmentation, the lexical prefilter, the
//! rating-assisted ranker, and budget-constrained context assembly.
//!
//! This crate contains no tokio, HTTP client, or filesystem I/O. The
//! external rating service is reached only through the [`rater::Rater`]
//! trait, which the calling application implements.
//!
//! ```text
//! text ─▶ segment ─▶ prefilter ─▶ rank ─▶ assemble ─▶ ContextBundle
//! ```

pub mod assemble;
pub mod chunk;
pub mod models;
pub mod pipeline;
pub mod prefilter;
pub mod rank;
pub mod rater;
pub mod stats;
pub mod store;
