// src/models.rs

use std::fmt;
use std::sync::OnceLock;

use bio_seq::codec::dna::Dna;
use bio_seq::prelude::Seq;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AnalysisError;
use crate::insights::Insights;
use crate::intervals::MAX_COORDINATE;

/// Assay / signal categories a caller can ask the model about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutputType {
    Dnase,
    RnaSeq,
    Cage,
    Atac,
    ChipHistone,
    ChipTf,
    Procap,
    Polyadenylation,
    SpliceSites,
    SpliceJunctions,
}

impl OutputType {
    pub const ALL: [OutputType; 10] = [
        OutputType::Dnase,
        OutputType::RnaSeq,
        OutputType::Cage,
        OutputType::Atac,
        OutputType::ChipHistone,
        OutputType::ChipTf,
        OutputType::Procap,
        OutputType::Polyadenylation,
        OutputType::SpliceSites,
        OutputType::SpliceJunctions,
    ];

    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputType::Dnase => "DNASE",
            OutputType::RnaSeq => "RNA_SEQ",
            OutputType::Cage => "CAGE",
            OutputType::Atac => "ATAC",
            OutputType::ChipHistone => "CHIP_HISTONE",
            OutputType::ChipTf => "CHIP_TF",
            OutputType::Procap => "PROCAP",
            OutputType::Polyadenylation => "POLYADENYLATION",
            OutputType::SpliceSites => "SPLICE_SITES",
            OutputType::SpliceJunctions => "SPLICE_JUNCTIONS",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            OutputType::Dnase => "DNase-seq (DNA accessibility)",
            OutputType::RnaSeq => "RNA-seq (gene expression)",
            OutputType::Cage => "CAGE (transcription start sites)",
            OutputType::Atac => "ATAC-seq (open chromatin)",
            OutputType::ChipHistone => "ChIP-seq histone modifications",
            OutputType::ChipTf => "ChIP-seq transcription factor binding",
            OutputType::Procap => "PRO-cap (nascent transcription)",
            OutputType::Polyadenylation => "polyadenylation sites",
            OutputType::SpliceSites => "splice sites",
            OutputType::SpliceJunctions => "splice junctions",
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Organism {
    #[default]
    Human,
    Mouse,
}

impl Organism {
    pub fn as_str(&self) -> &'static str {
        match self {
            Organism::Human => "human",
            Organism::Mouse => "mouse",
        }
    }

    pub fn assembly(&self) -> &'static str {
        match self {
            Organism::Human => "hg38",
            Organism::Mouse => "mm10",
        }
    }

    pub fn autosomes(&self) -> u32 {
        match self {
            Organism::Human => 22,
            Organism::Mouse => 19,
        }
    }

    /// Accepts `chr1`..`chrN`, `chrX`, `chrY` and `chrM` for this organism.
    pub fn is_valid_chromosome(&self, name: &str) -> bool {
        let Some(rest) = name.strip_prefix("chr") else {
            return false;
        };
        match rest {
            "X" | "Y" | "M" => true,
            _ => {
                !rest.starts_with('0')
                    && rest
                        .parse::<u32>()
                        .map(|n| (1..=self.autosomes()).contains(&n))
                        .unwrap_or(false)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawInterval {
    chromosome: String,
    start: u64,
    end: u64,
}

/// A chromosome range; `start >= 1` and `start < end` always hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawInterval")]
pub struct GenomeInterval {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
}

impl GenomeInterval {
    pub fn new(chromosome: impl Into<String>, start: u64, end: u64) -> Result<Self, AnalysisError> {
        let chromosome = chromosome.into();
        if chromosome.trim().is_empty() {
            return Err(AnalysisError::invalid("interval chromosome must not be empty"));
        }
        if start < 1 {
            return Err(AnalysisError::invalid(format!(
                "interval start must be >= 1, got {}",
                start
            )));
        }
        if start >= end {
            return Err(AnalysisError::invalid(format!(
                "interval start ({}) must be less than end ({})",
                start, end
            )));
        }
        if end > MAX_COORDINATE {
            return Err(AnalysisError::invalid(format!(
                "interval end ({}) is beyond any chromosome (max {})",
                end, MAX_COORDINATE
            )));
        }
        Ok(Self {
            chromosome,
            start,
            end,
        })
    }

    pub fn width(&self) -> u64 {
        self.end - self.start
    }
}

impl TryFrom<RawInterval> for GenomeInterval {
    type Error = AnalysisError;

    fn try_from(raw: RawInterval) -> Result<Self, Self::Error> {
        GenomeInterval::new(raw.chromosome, raw.start, raw.end)
    }
}

impl fmt::Display for GenomeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.start, self.end)
    }
}

#[derive(Debug, Deserialize)]
struct RawVariant {
    chromosome: String,
    position: u64,
    reference_bases: String,
    alternate_bases: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawVariant")]
pub struct Variant {
    pub chromosome: String,
    pub position: u64,
    pub reference_bases: String,
    pub alternate_bases: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Variant {
    pub fn new(
        chromosome: impl Into<String>,
        position: u64,
        reference_bases: &str,
        alternate_bases: &str,
    ) -> Result<Self, AnalysisError> {
        let chromosome = chromosome.into();
        if chromosome.trim().is_empty() {
            return Err(AnalysisError::invalid("variant chromosome must not be empty"));
        }
        if position < 1 {
            return Err(AnalysisError::invalid("variant position must be >= 1"));
        }
        if position > MAX_COORDINATE {
            return Err(AnalysisError::invalid(format!(
                "variant position ({}) is beyond any chromosome (max {})",
                position, MAX_COORDINATE
            )));
        }
        let reference_bases = parse_allele("reference", reference_bases)?;
        let alternate_bases = parse_allele("alternate", alternate_bases)?;
        Ok(Self {
            chromosome,
            position,
            reference_bases,
            alternate_bases,
            name: None,
        })
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// `chrom:pos:REF>ALT`, the identifier the Python backend reports.
    pub fn id(&self) -> String {
        format!(
            "{}:{}:{}>{}",
            self.chromosome, self.position, self.reference_bases, self.alternate_bases
        )
    }
}

impl TryFrom<RawVariant> for Variant {
    type Error = AnalysisError;

    fn try_from(raw: RawVariant) -> Result<Self, Self::Error> {
        let variant = Variant::new(
            raw.chromosome,
            raw.position,
            &raw.reference_bases,
            &raw.alternate_bases,
        )?;
        Ok(match raw.name.filter(|n| !n.trim().is_empty()) {
            Some(name) => variant.with_name(name),
            None => variant,
        })
    }
}

fn parse_allele(which: &str, bases: &str) -> Result<String, AnalysisError> {
    let bases = bases.trim().to_ascii_uppercase();
    if bases.is_empty() {
        return Err(AnalysisError::invalid(format!("{} allele must not be empty", which)));
    }
    Seq::<Dna>::try_from(bases.as_str()).map_err(|_| {
        AnalysisError::invalid(format!(
            "{} allele '{}' may only contain A, C, G and T",
            which, bases
        ))
    })?;
    Ok(bases)
}

/// Strips FASTA headers and whitespace and upper-cases the remaining bases.
pub fn normalize_sequence(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with('>'))
        .flat_map(|line| line.chars())
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Parses the unambiguous bases of a normalised sequence; `N` is allowed
/// and skipped.
pub fn definite_bases(sequence: &str) -> Result<Seq<Dna>, AnalysisError> {
    let definite: String = sequence.chars().filter(|c| *c != 'N').collect();
    Seq::<Dna>::try_from(definite.as_str()).map_err(|_| {
        let bad = sequence
            .chars()
            .find(|c| !matches!(c, 'A' | 'C' | 'G' | 'T' | 'N'))
            .unwrap_or('?');
        AnalysisError::invalid(format!(
            "sequence contains '{}'; only A, C, G, T and N are allowed",
            bad
        ))
    })
}

fn curie_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*:[0-9]+$").expect("valid regex"))
}

/// Ontology terms are CURIEs such as `UBERON:0002048` or `EFO:0002067`.
pub fn validate_ontology_term(term: &str) -> Result<(), AnalysisError> {
    if curie_pattern().is_match(term) {
        Ok(())
    } else {
        Err(AnalysisError::invalid(format!(
            "ontology term '{}' is not a CURIE like UBERON:0002048",
            term
        )))
    }
}

/// Inbound JSON body of `POST /api/genome/analyze`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeBody {
    pub sequence: Option<String>,
    pub analysis_type: Option<String>,
    pub interval: Option<GenomeInterval>,
    pub variant: Option<Variant>,
    pub output_types: Option<Vec<OutputType>>,
    pub ontology_terms: Option<Vec<String>>,
    pub organism: Option<Organism>,
    pub api_key: Option<String>,
    pub use_scoring: Option<bool>,
}

/// Legacy single-purpose sequence analyses selected through `analysisType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceKind {
    General,
    Structure,
    Annotation,
    Promoter,
    Splice,
    Variation,
}

impl SequenceKind {
    pub fn from_analysis_type(analysis_type: Option<&str>) -> Self {
        match analysis_type.map(str::trim) {
            Some("structure") => SequenceKind::Structure,
            Some("annotation") => SequenceKind::Annotation,
            Some("promoter") => SequenceKind::Promoter,
            Some("splice") => SequenceKind::Splice,
            Some("variation") => SequenceKind::Variation,
            _ => SequenceKind::General,
        }
    }

    /// Output types requested when the caller did not pick any.
    pub fn preset(&self) -> &'static [OutputType] {
        match self {
            SequenceKind::General => &[],
            SequenceKind::Structure => &[
                OutputType::ChipHistone,
                OutputType::Dnase,
                OutputType::Atac,
            ],
            SequenceKind::Annotation => &[
                OutputType::RnaSeq,
                OutputType::Cage,
                OutputType::SpliceSites,
            ],
            SequenceKind::Promoter => &[OutputType::Cage, OutputType::Procap, OutputType::Dnase],
            SequenceKind::Splice => &[OutputType::SpliceSites],
            SequenceKind::Variation => &[OutputType::Dnase, OutputType::RnaSeq, OutputType::ChipTf],
        }
    }

    pub fn focus(&self) -> Option<&'static str> {
        match self {
            SequenceKind::General => None,
            SequenceKind::Structure => {
                Some("chromatin structure: nucleosome positioning, histone marks and accessibility")
            }
            SequenceKind::Annotation => {
                Some("functional annotation: genes, exons, transcripts and regulatory features")
            }
            SequenceKind::Promoter => {
                Some("promoter architecture: core promoter motifs, TSS usage and nascent transcription")
            }
            SequenceKind::Splice => {
                Some("splicing: donor/acceptor sites, branch points and exon/intron boundaries")
            }
            SequenceKind::Variation => {
                Some("sequence variation: positions where substitutions would most change regulatory signals")
            }
        }
    }
}

/// The analysis to run, decided once from the shape of the inbound body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisMode {
    Sequence { sequence: String, kind: SequenceKind },
    Interval { interval: GenomeInterval },
    VariantEffect { variant: Variant, interval: GenomeInterval },
    VariantScore { variant: Variant, interval: GenomeInterval },
    Ism { sequence: String },
}

impl AnalysisMode {
    /// Name used for `analysis_type` towards the Python backend and in logs.
    pub fn name(&self) -> &'static str {
        match self {
            AnalysisMode::Sequence { .. } => "sequence",
            AnalysisMode::Interval { .. } => "interval",
            AnalysisMode::VariantEffect { .. } => "variant",
            AnalysisMode::VariantScore { .. } => "score_variant",
            AnalysisMode::Ism { .. } => "ism",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub mode: AnalysisMode,
    pub output_types: Vec<OutputType>,
    pub ontology_terms: Vec<String>,
    pub organism: Organism,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// One generated candidate, shaped like the text-generation API's output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(default)]
    pub content: Content,
}

impl Prediction {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            content: Content {
                parts: vec![Part { text: text.into() }],
            },
        }
    }

    pub fn text(&self) -> String {
        self.content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Uniform envelope returned by the analyze route.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Vec<Prediction>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisResponse {
    pub fn success(data: Value, predictions: Vec<Prediction>) -> Self {
        Self {
            success: true,
            data: Some(data),
            predictions: Some(predictions),
            ..Self::default()
        }
    }

    pub fn failure(error: &AnalysisError) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }
}
