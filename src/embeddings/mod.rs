//! Embedding generation for queries and community posts

pub mod client;

pub use client::EmbeddingClient;
pub use client::EmbeddingProvider;
