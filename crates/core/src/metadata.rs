use crate::models::{BaseMetadata, ChunkMetadata, ChunkType, Section};
use regex::Regex;

const PROJECT_KEYWORDS: [&str; 4] = ["PROJETO", "OBRA", "CONSTRUÇÃO", "REFORMA"];

/// Regex-driven metadata extraction over raw chunk text.
///
/// All patterns are compiled once at construction; every method is pure and
/// deterministic.
pub struct MetadataExtractor {
    sections: Vec<(Section, Regex)>,
    program: Regex,
    regional: Regex,
    money: Regex,
    table_money: Regex,
    digit_run: Regex,
}

impl MetadataExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        // Priority order is load-bearing: first match wins.
        let sections = vec![
            (Section::Receita, Regex::new(r"RECEITA|RECEITAS")?),
            (Section::Despesa, Regex::new(r"DESPESA|DESPESAS")?),
            (Section::Investimento, Regex::new(r"INVESTIMENTO|INVESTIMENTOS")?),
            (Section::Anexo, Regex::new(r"ANEXO")?),
        ];

        Ok(Self {
            sections,
            program: Regex::new(r"(?i)PROGRAMA\s+N?[º°]?\s*(\d+)")?,
            regional: Regex::new(r"(?i)REGIONAL\s+(\d+)")?,
            money: Regex::new(r"R\$\s*([\d.]+),(\d{2})")?,
            table_money: Regex::new(r"R\$.*\d{3,}")?,
            digit_run: Regex::new(r"\d+")?,
        })
    }

    pub fn detect_section(&self, text: &str) -> Section {
        let upper = text.to_uppercase();
        for (section, pattern) in &self.sections {
            if pattern.is_match(&upper) {
                return *section;
            }
        }
        Section::Geral
    }

    pub fn program_code(&self, text: &str) -> Option<String> {
        self.program
            .captures(text)
            .and_then(|capture| capture.get(1))
            .map(|digits| digits.as_str().to_string())
    }

    pub fn regional(&self, text: &str) -> Option<String> {
        self.regional
            .captures(text)
            .and_then(|capture| capture.get(1))
            .map(|digits| format!("Regional {}", digits.as_str()))
    }

    /// Collects every parseable `R$ <thousands>,<cents>` amount in order of
    /// appearance. Thousands separators are stripped; unparseable matches
    /// are dropped.
    pub fn monetary_values(&self, text: &str) -> Vec<f64> {
        self.money
            .captures_iter(text)
            .filter_map(|capture| {
                let whole = capture.get(1)?.as_str().replace('.', "");
                let cents = capture.get(2)?.as_str();
                format!("{whole}.{cents}").parse::<f64>().ok()
            })
            .collect()
    }

    /// Ordered classification rules, first matching label wins.
    pub fn classify(&self, text: &str) -> ChunkType {
        let upper = text.to_uppercase();
        let digit_count: usize = self
            .digit_run
            .find_iter(text)
            .map(|run| run.as_str().len())
            .sum();
        let looks_tabular = self.table_money.is_match(text) && digit_count > 5;

        let rules = [
            (looks_tabular, ChunkType::Tabela),
            (
                PROJECT_KEYWORDS.iter().any(|keyword| upper.contains(keyword)),
                ChunkType::Projeto,
            ),
            (upper.contains("PROGRAMA"), ChunkType::Programa),
            (upper.contains("REGIONAL"), ChunkType::Regional),
        ];

        rules
            .iter()
            .find(|(matched, _)| *matched)
            .map(|(_, label)| *label)
            .unwrap_or(ChunkType::Texto)
    }

    pub fn enrich(&self, base: BaseMetadata, text: &str) -> ChunkMetadata {
        let section = base.section.unwrap_or_else(|| self.detect_section(text));
        let values = self.monetary_values(text);
        let (values_brl, total_value) = if values.is_empty() {
            (None, None)
        } else {
            (
                Some(format_values(&values)),
                Some(values.iter().sum::<f64>()),
            )
        };

        ChunkMetadata {
            page: base.page,
            chunk_index: base.chunk_index,
            source: base.source,
            title: base.title,
            section,
            program_code: self.program_code(text),
            regional: self.regional(text),
            values_brl,
            total_value,
            chunk_type: self.classify(text),
        }
    }
}

/// ChromaDB metadata values cannot hold lists, so amounts are stored as a
/// display string alongside their numeric sum.
fn format_values(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|value| value.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SOURCE_DOCUMENT;

    fn extractor() -> MetadataExtractor {
        MetadataExtractor::new().expect("patterns compile")
    }

    fn base(page: u32, index: u64) -> BaseMetadata {
        BaseMetadata {
            page,
            chunk_index: index,
            source: SOURCE_DOCUMENT.to_string(),
            title: format!("Página {page} - Chunk {}", index + 1),
            section: None,
        }
    }

    #[test]
    fn section_priority_receita_wins_over_despesa() {
        let extractor = extractor();
        let text = "Quadro geral de DESPESAS e RECEITAS do exercício";
        assert_eq!(extractor.detect_section(text), Section::Receita);
    }

    #[test]
    fn section_detection_is_case_insensitive() {
        let extractor = extractor();
        assert_eq!(
            extractor.detect_section("demonstrativo de investimentos"),
            Section::Investimento
        );
    }

    #[test]
    fn unmatched_text_falls_back_to_geral() {
        let extractor = extractor();
        assert_eq!(extractor.detect_section("Disposições finais"), Section::Geral);
    }

    #[test]
    fn preassigned_section_is_not_overridden() {
        let extractor = extractor();
        let mut seed = base(1, 0);
        seed.section = Some(Section::Anexo);
        let metadata = extractor.enrich(seed, "RECEITA corrente líquida");
        assert_eq!(metadata.section, Section::Anexo);
    }

    #[test]
    fn program_code_accepts_ordinal_markers() {
        let extractor = extractor();
        assert_eq!(
            extractor.program_code("PROGRAMA Nº 0042 - Saúde da Família"),
            Some("0042".to_string())
        );
        assert_eq!(
            extractor.program_code("programa n 7 de urbanização"),
            Some("7".to_string())
        );
        assert_eq!(extractor.program_code("sem referência"), None);
    }

    #[test]
    fn regional_is_formatted_with_prefix() {
        let extractor = extractor();
        assert_eq!(
            extractor.regional("obras da regional 6"),
            Some("Regional 6".to_string())
        );
        assert_eq!(extractor.regional("sem regional aqui"), None);
    }

    #[test]
    fn grouped_monetary_value_parses_with_dots_stripped() {
        let extractor = extractor();
        assert_eq!(extractor.monetary_values("valor de R$ 1.234,56"), vec![1234.56]);
    }

    #[test]
    fn two_values_produce_list_and_sum() {
        let extractor = extractor();
        let text = "repasse de R$ 1.234,56 e contrapartida de R$ 100,44";
        let metadata = extractor.enrich(base(3, 7), text);

        assert_eq!(metadata.values_brl, Some("[1234.56, 100.44]".to_string()));
        let total = metadata.total_value.expect("sum present");
        assert!((total - 1335.0).abs() < 1e-9);
    }

    #[test]
    fn no_values_omits_both_keys() {
        let extractor = extractor();
        let metadata = extractor.enrich(base(1, 0), "texto sem valores");
        assert_eq!(metadata.values_brl, None);
        assert_eq!(metadata.total_value, None);
    }

    #[test]
    fn tabular_classification_dominates_project_and_regional_keywords() {
        let extractor = extractor();
        let text = "Construção da Escola Regional 3, valor R$ 150.000,00";
        assert_eq!(extractor.classify(text), ChunkType::Tabela);
    }

    #[test]
    fn classification_order_after_tabela() {
        let extractor = extractor();
        assert_eq!(
            extractor.classify("Reforma da praça central"),
            ChunkType::Projeto
        );
        assert_eq!(
            extractor.classify("PROGRAMA de assistência"),
            ChunkType::Programa
        );
        assert_eq!(
            extractor.classify("atendimento na regional 2"),
            ChunkType::Regional
        );
        assert_eq!(extractor.classify("texto corrido comum"), ChunkType::Texto);
    }

    #[test]
    fn enrich_is_deterministic() {
        let extractor = extractor();
        let text = "PROGRAMA Nº 12 da REGIONAL 4, verba R$ 2.500,00";
        let first = extractor.enrich(base(2, 5), text);
        let second = extractor.enrich(base(2, 5), text);
        assert_eq!(first, second);
    }
}
