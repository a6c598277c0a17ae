use crate::chunking::split_page;
use crate::embeddings::Embedder;
use crate::error::IndexError;
use crate::extractor::{LopdfExtractor, PageText, PdfExtractor};
use crate::metadata::MetadataExtractor;
use crate::models::{ChunkMetadata, ChunkerOptions, IndexReport, LoaChunk, COLLECTION_NAME};
use crate::traits::VectorStore;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::{debug, info, warn};

pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Drives chunking, enrichment, embedding, and batched storage over an
/// entire document.
///
/// The pipeline is sequential: one embedding request per chunk, then
/// fixed-size insertion batches. A failed batch is logged and skipped so
/// later batches still run; the report reflects the partial counts.
pub struct IndexingPipeline<E, S> {
    embedder: E,
    store: S,
    options: ChunkerOptions,
    batch_size: usize,
    collection_name: String,
}

impl<E, S> IndexingPipeline<E, S>
where
    E: Embedder + Send + Sync,
    S: VectorStore + Send + Sync,
{
    pub fn new(embedder: E, store: S) -> Self {
        Self {
            embedder,
            store,
            options: ChunkerOptions::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            collection_name: COLLECTION_NAME.to_string(),
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_options(mut self, options: ChunkerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_collection_name(mut self, collection_name: impl Into<String>) -> Self {
        self.collection_name = collection_name.into();
        self
    }

    pub async fn index_pdf(&self, path: &Path) -> Result<IndexReport, IndexError> {
        let bytes = tokio::fs::read(path).await?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let checksum = format!("{:x}", hasher.finalize());

        let pages = LopdfExtractor.extract_pages(path)?;
        info!(path = %path.display(), pages = pages.len(), "pdf extracted");

        self.index_pages(&pages, Some(checksum), &path.display().to_string())
            .await
    }

    /// Indexes already-extracted pages. Pages whose text is empty after
    /// trimming are skipped; a document yielding zero chunks is an error,
    /// not an empty run.
    pub async fn index_pages(
        &self,
        pages: &[PageText],
        document_checksum: Option<String>,
        origin: &str,
    ) -> Result<IndexReport, IndexError> {
        let extractor = MetadataExtractor::new()?;

        let mut chunks: Vec<LoaChunk> = Vec::new();
        for page in pages {
            if page.text.trim().is_empty() {
                continue;
            }
            let starting_index = chunks.len() as u64;
            let page_chunks = split_page(
                &page.text,
                page.number,
                starting_index,
                &extractor,
                &self.options,
            );
            chunks.extend(page_chunks);
        }

        if chunks.is_empty() {
            return Err(IndexError::ExtractionEmpty(origin.to_string()));
        }
        info!(total_chunks = chunks.len(), "document chunked");

        self.store.ensure_ready().await?;

        let mut embeddings = Vec::with_capacity(chunks.len());
        let mut degraded_embeddings = 0usize;
        for chunk in &chunks {
            let outcome = self.embedder.embed(&chunk.text).await;
            if outcome.is_degraded() {
                degraded_embeddings += 1;
                warn!(chunk_id = %chunk.id, "embedding degraded to zero vector");
            }
            embeddings.push(outcome.into_vector());
        }

        let ids: Vec<String> = chunks.iter().map(|chunk| chunk.id.clone()).collect();
        let documents: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let metadatas: Vec<ChunkMetadata> =
            chunks.iter().map(|chunk| chunk.metadata.clone()).collect();

        let mut total_inserted = 0usize;
        let mut start = 0usize;
        while start < chunks.len() {
            let end = (start + self.batch_size).min(chunks.len());
            match self
                .store
                .upsert(
                    &ids[start..end],
                    &embeddings[start..end],
                    &documents[start..end],
                    &metadatas[start..end],
                )
                .await
            {
                Ok(()) => {
                    total_inserted += end - start;
                    debug!(batch_start = start, batch_len = end - start, "batch inserted");
                }
                Err(error) => {
                    warn!(
                        batch_start = start,
                        error = %error,
                        "batch insert failed, continuing with remaining batches"
                    );
                }
            }
            start = end;
        }

        Ok(IndexReport {
            total_chunks: chunks.len(),
            total_inserted,
            collection_name: self.collection_name.clone(),
            embedding_model: self.embedder.model_name().to_string(),
            degraded_embeddings,
            document_checksum,
        })
    }
}
