use crate::error::SearchError;
use crate::models::{ChunkMetadata, QueryHits, SearchFilters};
use async_trait::async_trait;

/// Storage collaborator holding chunk texts, metadata, and vectors.
///
/// `query` returns hits ordered by ascending distance; the search layer
/// trusts that order.
#[async_trait]
pub trait VectorStore {
    /// Creates the backing collection if it does not exist yet.
    async fn ensure_ready(&self) -> Result<(), SearchError>;

    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadatas: &[ChunkMetadata],
    ) -> Result<(), SearchError>;

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filters: Option<&SearchFilters>,
    ) -> Result<QueryHits, SearchError>;

    async fn count(&self) -> Result<u64, SearchError>;

    /// Returns up to `limit` stored metadata records for stats sampling.
    async fn sample(&self, limit: usize) -> Result<Vec<ChunkMetadata>, SearchError>;

    /// Drops and recreates the collection, returning how many records were
    /// deleted.
    async fn reset(&self) -> Result<u64, SearchError>;
}
