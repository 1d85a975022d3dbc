// src/insights.rs
//
// Best-effort scraping of generated report text. Nothing here is a contract:
// the model output is schema-less, so every field is optional and callers
// must cope with `None`.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::models::Prediction;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Insights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gene: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,
}

impl Insights {
    pub fn is_empty(&self) -> bool {
        self.gene.is_none() && self.classification.is_none()
    }
}

fn gene_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i:gene)\**\s*[:\s]\s*\**\s*([A-Z][A-Z0-9]+)\b",
            r"(?i:affecting)\s+\**([A-Z][A-Z0-9]+)\**\s+(?i:gene)",
            r"\b([A-Z]{2,}[0-9]*)\s+gene\b",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("valid gene pattern"))
        .collect()
    })
}

fn classification_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\b(likely pathogenic|pathogenic|likely benign|benign|uncertain significance|VUS)\b")
            .expect("valid classification pattern")
    })
}

/// Gene symbol mentioned in `text`, trying the most specific phrasing first.
pub fn extract_gene(text: &str) -> Option<String> {
    gene_patterns()
        .iter()
        .find_map(|pattern| pattern.captures(text).map(|c| c[1].to_string()))
}

/// First ACMG-style verdict mentioned in `text`, normalised to lowercase
/// (`VUS` becomes "uncertain significance").
pub fn extract_classification(text: &str) -> Option<String> {
    classification_pattern().captures(text).map(|c| {
        let label = c[1].to_ascii_lowercase();
        if label == "vus" {
            "uncertain significance".to_string()
        } else {
            label
        }
    })
}

pub fn extract(predictions: &[Prediction]) -> Insights {
    let text = predictions
        .first()
        .map(Prediction::text)
        .unwrap_or_default();
    Insights {
        gene: extract_gene(&text),
        classification: extract_classification(&text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_gene_after_a_label() {
        assert_eq!(extract_gene("Affected Gene: EP300 (E1A binding protein)"), Some("EP300".into()));
        assert_eq!(extract_gene("**Gene:** EP300"), Some("EP300".into()));
    }

    #[test]
    fn finds_gene_in_running_text() {
        assert_eq!(
            extract_gene("This variant is predicted to reduce expression of the BRCA1 gene in breast tissue."),
            Some("BRCA1".into())
        );
        assert_eq!(extract_gene("affecting TP53 gene function"), Some("TP53".into()));
    }

    #[test]
    fn ignores_lowercase_words_after_gene() {
        assert_eq!(extract_gene("gene expression is unchanged"), None);
    }

    #[test]
    fn classification_prefers_the_longer_phrase() {
        assert_eq!(
            extract_classification("Overall: Likely Pathogenic (quantile 0.97)"),
            Some("likely pathogenic".into())
        );
        assert_eq!(extract_classification("classified as a VUS"), Some("uncertain significance".into()));
        assert_eq!(extract_classification("no verdict here"), None);
    }

    #[test]
    fn extract_reads_the_first_prediction_only() {
        let predictions = vec![
            Prediction::from_text("Gene: EP300. Verdict: benign."),
            Prediction::from_text("Gene: KRAS. Verdict: pathogenic."),
        ];
        let insights = extract(&predictions);
        assert_eq!(insights.gene.as_deref(), Some("EP300"));
        assert_eq!(insights.classification.as_deref(), Some("benign"));
        assert!(extract(&[]).is_empty());
    }
}
