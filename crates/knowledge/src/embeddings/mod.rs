//! Query embedding.
//!
//! The retriever embeds each query with the same provider and model the
//! index was built with, then ranks stored passage vectors against it.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
