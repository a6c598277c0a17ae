use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Chroma collection holding the indexed budget law.
pub const COLLECTION_NAME: &str = "loa_2026";

/// Source document label stored with every chunk.
pub const SOURCE_DOCUMENT: &str = "LOA-2026-numerado.pdf";

/// Coarse budget-document category detected from chunk text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Section {
    Receita,
    Despesa,
    Investimento,
    Anexo,
    #[default]
    Geral,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Section::Receita => "RECEITA",
            Section::Despesa => "DESPESA",
            Section::Investimento => "INVESTIMENTO",
            Section::Anexo => "ANEXO",
            Section::Geral => "GERAL",
        };
        f.write_str(label)
    }
}

impl FromStr for Section {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_uppercase().as_str() {
            "RECEITA" => Ok(Section::Receita),
            "DESPESA" => Ok(Section::Despesa),
            "INVESTIMENTO" => Ok(Section::Investimento),
            "ANEXO" => Ok(Section::Anexo),
            "GERAL" => Ok(Section::Geral),
            other => Err(format!("unknown section: {other}")),
        }
    }
}

/// Content classification assigned to every chunk, first matching rule wins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    Tabela,
    Projeto,
    Programa,
    Regional,
    #[default]
    Texto,
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ChunkType::Tabela => "tabela",
            ChunkType::Projeto => "projeto",
            ChunkType::Programa => "programa",
            ChunkType::Regional => "regional",
            ChunkType::Texto => "texto",
        };
        f.write_str(label)
    }
}

impl FromStr for ChunkType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().as_str() {
            "tabela" => Ok(ChunkType::Tabela),
            "projeto" => Ok(ChunkType::Projeto),
            "programa" => Ok(ChunkType::Programa),
            "regional" => Ok(ChunkType::Regional),
            "texto" => Ok(ChunkType::Texto),
            other => Err(format!("unknown chunk type: {other}")),
        }
    }
}

/// Identity and page context a chunk carries before enrichment.
///
/// `section` is only filled here when the caller already knows it; the
/// extractor never overrides a pre-assigned section.
#[derive(Debug, Clone)]
pub struct BaseMetadata {
    pub page: u32,
    pub chunk_index: u64,
    pub source: String,
    pub title: String,
    pub section: Option<Section>,
}

/// Full metadata stored alongside a chunk in the vector store.
///
/// `program_code`, `regional`, `values_brl`, and `total_value` are omitted
/// from the payload when absent, never serialized as null.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub page: u32,
    pub chunk_index: u64,
    pub source: String,
    pub title: String,
    #[serde(default)]
    pub section: Section,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regional: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values_brl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_value: Option<f64>,
    #[serde(default)]
    pub chunk_type: ChunkType,
}

/// Bounded unit of document text, the unit of storage and retrieval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoaChunk {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Chunker tuning. The target size is counted in characters.
#[derive(Debug, Clone)]
pub struct ChunkerOptions {
    pub chunk_size: usize,
    pub source: String,
}

impl Default for ChunkerOptions {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            source: SOURCE_DOCUMENT.to_string(),
        }
    }
}

/// Optional metadata restrictions applied to a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SearchFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_type: Option<ChunkType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regional: Option<String>,
}

impl SearchFilters {
    pub fn is_empty(&self) -> bool {
        self.section.is_none()
            && self.chunk_type.is_none()
            && self.page.is_none()
            && self.program_code.is_none()
            && self.regional.is_none()
    }

    /// Renders the filters as a Chroma `where` clause. Multiple fields are
    /// combined with `$and`; no fields yields `None`.
    pub fn to_where(&self) -> Option<Value> {
        let mut terms = Vec::new();
        if let Some(section) = self.section {
            terms.push(json!({ "section": section }));
        }
        if let Some(chunk_type) = self.chunk_type {
            terms.push(json!({ "chunk_type": chunk_type }));
        }
        if let Some(page) = self.page {
            terms.push(json!({ "page": page }));
        }
        if let Some(program_code) = &self.program_code {
            terms.push(json!({ "program_code": program_code }));
        }
        if let Some(regional) = &self.regional {
            terms.push(json!({ "regional": regional }));
        }

        match terms.len() {
            0 => None,
            1 => terms.pop(),
            _ => Some(json!({ "$and": terms })),
        }
    }
}

/// Parallel hit sequences returned by the vector store, ordered by
/// ascending distance.
#[derive(Debug, Clone, Default)]
pub struct QueryHits {
    pub documents: Vec<String>,
    pub metadatas: Vec<ChunkMetadata>,
    pub distances: Vec<f32>,
}

/// Single ranked search hit. `score` is `1 - distance` and may be negative.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub rank: usize,
    pub text: String,
    pub metadata: ChunkMetadata,
    pub score: f32,
    pub distance: f32,
}

/// Response envelope for one similarity query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub query: String,
    pub total_results: usize,
    pub results: Vec<SearchResult>,
}

/// Outcome of a full indexing run. `total_inserted` may be lower than
/// `total_chunks` when insertion batches fail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexReport {
    pub total_chunks: usize,
    pub total_inserted: usize,
    pub collection_name: String,
    pub embedding_model: String,
    pub degraded_embeddings: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_checksum: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_serializes_uppercase() {
        let value = serde_json::to_value(Section::Receita).expect("serialize");
        assert_eq!(value, json!("RECEITA"));
        let parsed: Section = serde_json::from_value(json!("DESPESA")).expect("deserialize");
        assert_eq!(parsed, Section::Despesa);
    }

    #[test]
    fn chunk_type_round_trips_lowercase() {
        let value = serde_json::to_value(ChunkType::Tabela).expect("serialize");
        assert_eq!(value, json!("tabela"));
        assert_eq!("projeto".parse::<ChunkType>(), Ok(ChunkType::Projeto));
    }

    #[test]
    fn absent_optional_metadata_keys_are_omitted() {
        let metadata = ChunkMetadata {
            page: 1,
            chunk_index: 0,
            source: SOURCE_DOCUMENT.to_string(),
            title: "Página 1 - Chunk 1".to_string(),
            section: Section::Geral,
            program_code: None,
            regional: None,
            values_brl: None,
            total_value: None,
            chunk_type: ChunkType::Texto,
        };

        let value = serde_json::to_value(&metadata).expect("serialize");
        let object = value.as_object().expect("object");
        assert!(!object.contains_key("program_code"));
        assert!(!object.contains_key("regional"));
        assert!(!object.contains_key("values_brl"));
        assert!(!object.contains_key("total_value"));
    }

    #[test]
    fn empty_filters_render_no_where_clause() {
        assert_eq!(SearchFilters::default().to_where(), None);
    }

    #[test]
    fn single_filter_renders_flat_clause() {
        let filters = SearchFilters {
            section: Some(Section::Despesa),
            ..Default::default()
        };
        assert_eq!(filters.to_where(), Some(json!({ "section": "DESPESA" })));
    }

    #[test]
    fn multiple_filters_combine_with_and() {
        let filters = SearchFilters {
            section: Some(Section::Despesa),
            chunk_type: Some(ChunkType::Tabela),
            page: Some(12),
            ..Default::default()
        };
        assert_eq!(
            filters.to_where(),
            Some(json!({
                "$and": [
                    { "section": "DESPESA" },
                    { "chunk_type": "tabela" },
                    { "page": 12 },
                ]
            }))
        );
    }
}
