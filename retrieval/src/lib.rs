//! R (Retriever): hybrid query fusion over the lexical and vector indexes
//! maintained by `chunking_store`, query-time dedup, citation formatting,
//! and the scope predicate an agent runs before invoking retrieval at all.

mod citation;
mod fusion;
mod scope;
mod searcher;

pub use citation::{format_citation, format_source};
pub use fusion::FusionWeights;
pub use scope::{check_scope, BlockedCategory, ScopeResult};
pub use searcher::{HybridSearcher, RetrievalError, ScoredResult, SearchResponse};
