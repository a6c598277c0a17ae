pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod metadata;
pub mod models;
pub mod pipeline;
pub mod search;
pub mod stats;
pub mod status;
pub mod stores;
pub mod traits;

pub use chunking::split_page;
pub use embeddings::{
    Embedder, EmbeddingOutcome, GeminiEmbedder, EMBEDDING_DIMENSION, GEMINI_EMBEDDING_MODEL,
};
pub use error::{IndexError, SearchError};
pub use extractor::{LopdfExtractor, PageText, PdfExtractor};
pub use metadata::MetadataExtractor;
pub use models::{
    BaseMetadata, ChunkMetadata, ChunkType, ChunkerOptions, IndexReport, LoaChunk, QueryHits,
    SearchFilters, SearchResponse, SearchResult, Section, COLLECTION_NAME, SOURCE_DOCUMENT,
};
pub use pipeline::{IndexingPipeline, DEFAULT_BATCH_SIZE};
pub use search::SearchService;
pub use stats::{collection_stats, CollectionStats, STATS_SAMPLE_LIMIT};
pub use status::{AlreadyIndexing, IndexingSnapshot, IndexingStatus};
pub use stores::ChromaStore;
pub use traits::VectorStore;
