//! Turns chunk text into dense vectors. Two backends share the [`embedder::Embedder`]
//! trait: a local ONNX Runtime model driven over `tokenizers`/`ort` (offline, used in
//! tests and air-gapped deployments) and an HTTP-backed embedding service reached via
//! `reqwest`. [`embedder::RetryingEmbedder`] wraps either one with the retry/truncate/
//! zero-vector-fallback policy the indexing stage expects from every embedder.

pub mod config;
pub mod embedder;

pub use embedder::{
    Embedder, EmbedderError, EmbedderInfo, OnnxHttpConfig, OnnxHttpEmbedder, OnnxStdIoConfig,
    OnnxStdIoEmbedder, ProviderKind, RetryingEmbedder,
};
