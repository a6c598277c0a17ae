use crate::metadata::MetadataExtractor;
use crate::models::{BaseMetadata, ChunkerOptions, LoaChunk};

/// Splits one page of extracted text into bounded, enriched chunks.
///
/// Paragraphs are delimited by blank lines and accumulated until the target
/// size would be exceeded; paragraphs longer than the target size are first
/// broken into sentences. Chunk indices continue from `starting_index` so
/// they stay unique across the whole document.
pub fn split_page(
    page_text: &str,
    page_number: u32,
    starting_index: u64,
    extractor: &MetadataExtractor,
    options: &ChunkerOptions,
) -> Vec<LoaChunk> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut index = starting_index;

    for paragraph in page_text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }

        if char_len(paragraph) > options.chunk_size {
            for sentence in split_sentences(paragraph) {
                if char_len(&current) + char_len(&sentence) > options.chunk_size
                    && !current.is_empty()
                {
                    chunks.push(build_chunk(
                        current.trim(),
                        page_number,
                        index,
                        extractor,
                        options,
                    ));
                    index += 1;
                    current = sentence;
                } else if current.is_empty() {
                    current = sentence;
                } else {
                    current.push(' ');
                    current.push_str(&sentence);
                }
            }
        } else if char_len(&current) + char_len(paragraph) > options.chunk_size
            && !current.is_empty()
        {
            chunks.push(build_chunk(
                current.trim(),
                page_number,
                index,
                extractor,
                options,
            ));
            index += 1;
            current = paragraph.to_string();
        } else if current.is_empty() {
            current = paragraph.to_string();
        } else {
            current.push_str("\n\n");
            current.push_str(paragraph);
        }
    }

    if !current.trim().is_empty() {
        chunks.push(build_chunk(
            current.trim(),
            page_number,
            index,
            extractor,
            options,
        ));
    }

    chunks
}

fn build_chunk(
    text: &str,
    page: u32,
    index: u64,
    extractor: &MetadataExtractor,
    options: &ChunkerOptions,
) -> LoaChunk {
    let base = BaseMetadata {
        page,
        chunk_index: index,
        source: options.source.clone(),
        title: format!("Página {page} - Chunk {}", index + 1),
        section: None,
    };

    LoaChunk {
        id: format!("loa_page_{page}_chunk_{index}"),
        text: text.to_string(),
        metadata: extractor.enrich(base, text),
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Breaks a paragraph after `.`, `!`, or `?` followed by whitespace. The
/// punctuation stays with its sentence and the boundary whitespace is
/// consumed.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let chars: Vec<(usize, char)> = paragraph.char_indices().collect();
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut position = 0;

    while position < chars.len() {
        let (offset, ch) = chars[position];
        if matches!(ch, '.' | '!' | '?') {
            let mut next = position + 1;
            while next < chars.len() && chars[next].1.is_whitespace() {
                next += 1;
            }
            if next > position + 1 {
                sentences.push(paragraph[start..offset + ch.len_utf8()].to_string());
                start = chars
                    .get(next)
                    .map(|(resume, _)| *resume)
                    .unwrap_or(paragraph.len());
                position = next;
                continue;
            }
        }
        position += 1;
    }

    if start < paragraph.len() {
        sentences.push(paragraph[start..].to_string());
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkType;

    fn extractor() -> MetadataExtractor {
        MetadataExtractor::new().expect("patterns compile")
    }

    fn options(chunk_size: usize) -> ChunkerOptions {
        ChunkerOptions {
            chunk_size,
            ..Default::default()
        }
    }

    #[test]
    fn emitted_chunks_are_never_blank() {
        let text = "Primeiro parágrafo.\n\n   \n\nSegundo parágrafo.";
        let chunks = split_page(text, 1, 0, &extractor(), &options(30));
        assert!(!chunks.is_empty());
        assert!(chunks.iter().all(|chunk| !chunk.text.trim().is_empty()));
    }

    #[test]
    fn blank_page_yields_no_chunks() {
        let chunks = split_page("  \n\n \n\n", 4, 0, &extractor(), &options(800));
        assert!(chunks.is_empty());
    }

    #[test]
    fn small_paragraphs_accumulate_into_one_chunk() {
        let text = "Um.\n\nDois.\n\nTrês.";
        let chunks = split_page(text, 1, 0, &extractor(), &options(800));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Um.\n\nDois.\n\nTrês.");
    }

    #[test]
    fn oversized_accumulation_emits_prior_chunk_first() {
        // The second paragraph fits the target size on its own but forces
        // the accumulated first paragraph out as its own chunk.
        let first = "a".repeat(30);
        let second = "b".repeat(25);
        let text = format!("{first}\n\n{second}");
        let chunks = split_page(&text, 2, 0, &extractor(), &options(40));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, first);
        assert_eq!(chunks[1].text, second);
    }

    #[test]
    fn long_paragraph_is_split_at_sentence_boundaries() {
        let sentence = "Esta frase ocupa espaço considerável no parágrafo.";
        let paragraph = [sentence; 4].join(" ");
        assert!(paragraph.chars().count() > 100);

        let chunks = split_page(&paragraph, 1, 0, &extractor(), &options(100));
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 110);
        }
    }

    #[test]
    fn no_paragraph_content_is_dropped() {
        let paragraphs = [
            "Receitas previstas para o exercício.",
            "Despesas fixadas por órgão.",
            "Quadro de investimentos das regionais.",
        ];
        let text = paragraphs.join("\n\n");
        let chunks = split_page(&text, 1, 0, &extractor(), &options(50));

        let combined: String = chunks
            .iter()
            .map(|chunk| chunk.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        for paragraph in paragraphs {
            assert!(combined.contains(paragraph), "missing: {paragraph}");
        }
    }

    #[test]
    fn chunk_ids_and_titles_follow_page_and_index() {
        let first = "a".repeat(30);
        let second = "b".repeat(25);
        let text = format!("{first}\n\n{second}");
        let chunks = split_page(&text, 7, 3, &extractor(), &options(40));

        assert_eq!(chunks[0].id, "loa_page_7_chunk_3");
        assert_eq!(chunks[0].metadata.title, "Página 7 - Chunk 4");
        assert_eq!(chunks[1].id, "loa_page_7_chunk_4");
        assert_eq!(chunks[1].metadata.page, 7);
        assert_eq!(chunks[1].metadata.chunk_index, 4);
    }

    #[test]
    fn chunks_are_enriched_during_emission() {
        let text = "PROGRAMA Nº 21 da REGIONAL 5 com dotação de R$ 1.000,00";
        let chunks = split_page(text, 1, 0, &extractor(), &options(800));

        assert_eq!(chunks.len(), 1);
        let metadata = &chunks[0].metadata;
        assert_eq!(metadata.program_code.as_deref(), Some("21"));
        assert_eq!(metadata.regional.as_deref(), Some("Regional 5"));
        assert_eq!(metadata.chunk_type, ChunkType::Tabela);
    }

    #[test]
    fn sentences_split_after_terminal_punctuation() {
        let sentences = split_sentences("Primeira frase. Segunda frase! Terceira?");
        assert_eq!(
            sentences,
            vec!["Primeira frase.", "Segunda frase!", "Terceira?"]
        );
    }

    #[test]
    fn punctuation_without_whitespace_does_not_split() {
        let sentences = split_sentences("Valor de 1.234 unidades no total.");
        assert_eq!(sentences, vec!["Valor de 1.234 unidades no total."]);
    }
}
