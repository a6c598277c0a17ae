use crate::error::SearchError;
use crate::models::{ChunkMetadata, QueryHits, SearchFilters};
use crate::traits::VectorStore;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use url::Url;

/// ChromaDB REST client. The collection is created on demand with cosine
/// distance, matching the score conversion `1 - distance` downstream.
pub struct ChromaStore {
    endpoint: String,
    collection: String,
    vector_size: usize,
    client: Client,
}

impl ChromaStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
    ) -> Result<Self, SearchError> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            collection: collection.into(),
            vector_size,
            client: Client::new(),
        })
    }

    pub fn collection_name(&self) -> &str {
        &self.collection
    }

    fn api_root(&self) -> String {
        format!("{}/api/v1", self.endpoint)
    }

    /// Resolves the collection id, creating the collection when missing.
    /// Chroma addresses data operations by id, not by name.
    async fn collection_id(&self) -> Result<String, SearchError> {
        let response = self
            .client
            .post(format!("{}/collections", self.api_root()))
            .json(&json!({
                "name": self.collection,
                "get_or_create": true,
                "metadata": {
                    "hnsw:space": "cosine",
                    "description": "LOA 2026 - Lei Orçamentária Anual de Fortaleza",
                },
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/id")
            .and_then(Value::as_str)
            .map(|id| id.to_string())
            .ok_or_else(|| SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: "collection response has no id".to_string(),
            })
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), SearchError> {
        if vector.len() != self.vector_size {
            return Err(SearchError::Request(format!(
                "vector dimension {} is not {}",
                vector.len(),
                self.vector_size
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl VectorStore for ChromaStore {
    async fn ensure_ready(&self) -> Result<(), SearchError> {
        self.collection_id().await.map(|_| ())
    }

    async fn upsert(
        &self,
        ids: &[String],
        vectors: &[Vec<f32>],
        documents: &[String],
        metadatas: &[ChunkMetadata],
    ) -> Result<(), SearchError> {
        if ids.len() != vectors.len() || ids.len() != documents.len() || ids.len() != metadatas.len()
        {
            return Err(SearchError::Request(format!(
                "mismatched batch lengths: {} ids, {} vectors, {} documents, {} metadatas",
                ids.len(),
                vectors.len(),
                documents.len(),
                metadatas.len()
            )));
        }

        if ids.is_empty() {
            return Ok(());
        }

        for vector in vectors {
            self.check_dimensions(vector)?;
        }

        let collection_id = self.collection_id().await?;
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/add",
                self.api_root(),
                collection_id
            ))
            .json(&json!({
                "ids": ids,
                "embeddings": vectors,
                "documents": documents,
                "metadatas": metadatas,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        k: usize,
        filters: Option<&SearchFilters>,
    ) -> Result<QueryHits, SearchError> {
        self.check_dimensions(vector)?;

        let mut body = json!({
            "query_embeddings": [vector],
            "n_results": k,
            "include": ["documents", "metadatas", "distances"],
        });
        if let Some(clause) = filters.and_then(SearchFilters::to_where) {
            body["where"] = clause;
        }

        let collection_id = self.collection_id().await?;
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/query",
                self.api_root(),
                collection_id
            ))
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let documents = parsed
            .pointer("/documents/0")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| entry.as_str().unwrap_or_default().to_string())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let metadatas = parsed
            .pointer("/metadatas/0")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(serde_json::from_value::<ChunkMetadata>)
            .collect::<Result<Vec<_>, _>>()?;

        let distances = parsed
            .pointer("/distances/0")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(Value::as_f64)
                    .map(|distance| distance as f32)
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        if documents.len() != metadatas.len() || documents.len() != distances.len() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: format!(
                    "mismatched result lengths: {} documents, {} metadatas, {} distances",
                    documents.len(),
                    metadatas.len(),
                    distances.len()
                ),
            });
        }

        Ok(QueryHits {
            documents,
            metadatas,
            distances,
        })
    }

    async fn count(&self) -> Result<u64, SearchError> {
        let collection_id = self.collection_id().await?;
        let response = self
            .client
            .get(format!(
                "{}/collections/{}/count",
                self.api_root(),
                collection_id
            ))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        Ok(response.json::<u64>().await?)
    }

    async fn sample(&self, limit: usize) -> Result<Vec<ChunkMetadata>, SearchError> {
        let collection_id = self.collection_id().await?;
        let response = self
            .client
            .post(format!(
                "{}/collections/{}/get",
                self.api_root(),
                collection_id
            ))
            .json(&json!({
                "limit": limit,
                "include": ["metadatas"],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        parsed
            .pointer("/metadatas")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|entry| serde_json::from_value::<ChunkMetadata>(entry).map_err(SearchError::from))
            .collect()
    }

    async fn reset(&self) -> Result<u64, SearchError> {
        let deleted = self.count().await?;

        let response = self
            .client
            .delete(format!(
                "{}/collections/{}",
                self.api_root(),
                self.collection
            ))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "chroma".to_string(),
                details: response.status().to_string(),
            });
        }

        // Recreate empty so later queries see a collection, not a 404.
        self.collection_id().await?;
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_endpoint_is_rejected() {
        let result = ChromaStore::new("not a url", "loa_2026", 768);
        assert!(matches!(result, Err(SearchError::Url(_))));
    }

    #[test]
    fn trailing_slash_is_normalized() {
        let store =
            ChromaStore::new("http://localhost:8000/", "loa_2026", 768).expect("valid endpoint");
        assert_eq!(store.api_root(), "http://localhost:8000/api/v1");
    }

    #[tokio::test]
    async fn query_rejects_wrong_dimensionality() {
        let store =
            ChromaStore::new("http://localhost:8000", "loa_2026", 768).expect("valid endpoint");
        let result = store.query(&[0.0; 3], 5, None).await;
        assert!(matches!(result, Err(SearchError::Request(_))));
    }

    #[tokio::test]
    async fn upsert_rejects_mismatched_batches() {
        let store =
            ChromaStore::new("http://localhost:8000", "loa_2026", 2).expect("valid endpoint");
        let result = store
            .upsert(
                &["a".to_string(), "b".to_string()],
                &[vec![0.0, 1.0]],
                &["texto".to_string()],
                &[],
            )
            .await;
        assert!(matches!(result, Err(SearchError::Request(_))));
    }
}
