use crate::embeddings::Embedder;
use crate::error::SearchError;
use crate::models::{SearchFilters, SearchResponse, SearchResult};
use crate::traits::VectorStore;
use tracing::warn;

/// Semantic similarity search over the stored chunks.
///
/// The backend reports cosine distances in ascending order; results keep
/// that order and carry `score = 1 - distance`, unclamped, so very poor
/// matches surface as negative scores instead of being hidden.
pub struct SearchService<E, S> {
    embedder: E,
    store: S,
}

impl<E, S> SearchService<E, S>
where
    E: Embedder + Send + Sync,
    S: VectorStore + Send + Sync,
{
    pub fn new(embedder: E, store: S) -> Self {
        Self { embedder, store }
    }

    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filters: Option<&SearchFilters>,
    ) -> Result<SearchResponse, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::Request("query is empty".to_string()));
        }

        let outcome = self.embedder.embed(query).await;
        if outcome.is_degraded() {
            warn!("query embedding degraded, results will have low relevance");
        }
        let vector = outcome.into_vector();

        let hits = self.store.query(&vector, k, filters).await?;

        let results: Vec<SearchResult> = hits
            .documents
            .into_iter()
            .zip(hits.metadatas)
            .zip(hits.distances)
            .enumerate()
            .map(|(position, ((text, metadata), distance))| SearchResult {
                rank: position + 1,
                text,
                metadata,
                score: 1.0 - distance,
                distance,
            })
            .collect();

        Ok(SearchResponse {
            query: query.to_string(),
            total_results: results.len(),
            results,
        })
    }
}
