use crate::error::SearchError;
use crate::traits::VectorStore;
use serde::Serialize;
use std::collections::BTreeMap;

/// How many stored records the stats endpoint samples for its histograms.
pub const STATS_SAMPLE_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CollectionStats {
    pub collection_name: String,
    pub total_documents: u64,
    pub embedding_model: String,
    pub embedding_dimension: usize,
    pub sample_chunk_types: BTreeMap<String, u64>,
    pub sample_sections: BTreeMap<String, u64>,
}

/// Aggregates a document count plus chunk-type/section histograms over a
/// small metadata sample.
pub async fn collection_stats<S>(
    store: &S,
    collection_name: &str,
    embedding_model: &str,
    embedding_dimension: usize,
) -> Result<CollectionStats, SearchError>
where
    S: VectorStore + Sync,
{
    let total_documents = store.count().await?;
    let sample = store.sample(STATS_SAMPLE_LIMIT).await?;

    let mut sample_chunk_types = BTreeMap::new();
    let mut sample_sections = BTreeMap::new();
    for metadata in &sample {
        *sample_chunk_types
            .entry(metadata.chunk_type.to_string())
            .or_insert(0u64) += 1;
        *sample_sections
            .entry(metadata.section.to_string())
            .or_insert(0u64) += 1;
    }

    Ok(CollectionStats {
        collection_name: collection_name.to_string(),
        total_documents,
        embedding_model: embedding_model.to_string(),
        embedding_dimension,
        sample_chunk_types,
        sample_sections,
    })
}
