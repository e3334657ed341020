//! Hybrid retrieval: dense (vector) + sparse (BM25) search fused with
//! Reciprocal Rank Fusion, cross-encoder reranking, context compression,
//! query understanding, and persistent index management.

mod fusion;
#[cfg(feature = "hybrid-search")]
mod bm25;
#[cfg(feature = "hybrid-search")]
mod hybrid;
#[cfg(feature = "reranker")]
mod reranker;
#[cfg(feature = "context-compression")]
mod context;
mod index_manager;
mod pipeline;
mod query_processor;

pub use fusion::{max_score_fusion, reciprocal_rank_fusion, weighted_sum_fusion, FusedResult, FusionMethod};

#[cfg(feature = "hybrid-search")]
pub use bm25::{BM25Config, BM25Index, BM25SearchResult};
#[cfg(feature = "hybrid-search")]
pub use hybrid::{HybridConfig, HybridRetriever, HybridSearchResult};

#[cfg(feature = "reranker")]
pub use reranker::{
    FastEmbedReranker, RerankDocument, RerankResult, Reranker, RerankerConfig, RerankerModel,
};

#[cfg(feature = "context-compression")]
pub use context::{
    CompressedToolContext, CompressionConfig, CompressionResult, CompressionStrategy,
    ToolParameter,
};

pub use index_manager::{IndexConfig, IndexManager, IndexMetadata, IndexStats, SkillChecksum, SyncResult};

pub use pipeline::{
    IndexDocument, PipelineHealth, PipelineIndexStats, PipelineSearchResult, ProviderStatus,
    SearchPipeline,
};

pub use query_processor::{
    EntityType, ExtractedEntity, ProcessedQuery, QueryExpansion, QueryIntent, QueryProcessor,
};
