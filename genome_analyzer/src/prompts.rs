// src/prompts.rs
//
// Renders an analysis request into the instruction text sent to the
// text-generation model. Builders are pure: no clock, no randomness, and the
// caller's literal values are always interpolated.

use std::fmt::Write;

use crate::intervals::nearest_supported_length;
use crate::models::{AnalysisMode, AnalysisRequest, GenomeInterval, OutputType, SequenceKind, Variant};

const DEFAULT_SEQUENCE_OUTPUTS: &str = "DNase, RNA-seq, CAGE";
const DEFAULT_INTERVAL_OUTPUTS: &str = "RNA-seq";
const DEFAULT_ISM_OUTPUTS: &str = "DNase";

/// Base composition of a normalised sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequenceStats {
    pub length: usize,
    pub gc_count: usize,
    pub ambiguous: usize,
}

impl SequenceStats {
    pub fn of(sequence: &str) -> Self {
        let mut stats = SequenceStats {
            length: 0,
            gc_count: 0,
            ambiguous: 0,
        };
        for base in sequence.chars() {
            stats.length += 1;
            match base {
                'G' | 'C' => stats.gc_count += 1,
                'A' | 'T' => {}
                _ => stats.ambiguous += 1,
            }
        }
        stats
    }

    /// GC percentage over the unambiguous bases.
    pub fn gc_percent(&self) -> f64 {
        let definite = self.length - self.ambiguous;
        if definite == 0 {
            0.0
        } else {
            self.gc_count as f64 * 100.0 / definite as f64
        }
    }
}

pub fn build_prompt(request: &AnalysisRequest) -> String {
    match &request.mode {
        AnalysisMode::Sequence { sequence, kind } => sequence_prompt(request, sequence, *kind),
        AnalysisMode::Interval { interval } => interval_prompt(request, interval),
        AnalysisMode::VariantEffect { variant, interval } => variant_effect_prompt(request, variant, interval),
        AnalysisMode::VariantScore { variant, interval } => variant_score_prompt(request, variant, interval),
        AnalysisMode::Ism { sequence } => ism_prompt(request, sequence),
    }
}

fn join_outputs(outputs: &[OutputType], fallback: &str) -> String {
    if outputs.is_empty() {
        fallback.to_string()
    } else {
        outputs.iter().map(OutputType::as_str).collect::<Vec<_>>().join(", ")
    }
}

fn join_tissues(terms: &[String], fallback: &str) -> String {
    if terms.is_empty() {
        fallback.to_string()
    } else {
        terms.join(", ")
    }
}

/// Repeats the caller's values so the model does not drift to example data.
fn exact_values(pairs: &[(&str, String)]) -> String {
    let mut block = String::from("IMPORTANT - analyse exactly the input given above:\n");
    for (what, value) in pairs {
        let _ = writeln!(block, "- Use the EXACT {} {}, not example values.", what, value);
    }
    block.push_str("- Do not substitute a different or well-known example locus, gene or variant.\n");
    block
}

fn sequence_prompt(request: &AnalysisRequest, sequence: &str, kind: SequenceKind) -> String {
    let outputs = join_outputs(&request.output_types, DEFAULT_SEQUENCE_OUTPUTS);
    let tissues = join_tissues(&request.ontology_terms, "various tissues");
    let stats = SequenceStats::of(sequence);
    let focus = kind
        .focus()
        .map(|f| format!("Analysis focus: {}\n", f))
        .unwrap_or_default();

    format!(
        "You are an AlphaGenome AI model expert. Analyze this genomic sequence for {outputs} predictions.

Sequence: {sequence}
Sequence length: {length} bp
GC content: {gc:.2}%
Ambiguous (N) bases: {ambiguous}
Organism: {organism} ({assembly})
Model input window: {window} bp
Output types: {outputs}
Tissues/Cell types: {tissues}
{focus}
Provide detailed predictions including:
1. **Sequence Context**: Length, GC content, composition
2. **DNase Predictions**: DNA accessibility regions and scores
3. **RNA-seq Predictions**: Gene expression levels, transcription activity
4. **CAGE/ProCap**: Transcription start sites (TSS) identification
5. **ATAC-seq**: Open chromatin regions
6. **ChIP-seq**: Histone modifications and transcription factor binding
7. **Splicing**: Splice donor/acceptor sites (GT-AG rule)
8. **Tissue-specific Effects**: Differences across cell types

{exact}
Format the output with clear sections and scientific detail.",
        outputs = outputs,
        sequence = sequence,
        length = stats.length,
        gc = stats.gc_percent(),
        ambiguous = stats.ambiguous,
        organism = request.organism.as_str(),
        assembly = request.organism.assembly(),
        window = nearest_supported_length(stats.length as u64),
        tissues = tissues,
        focus = focus,
        exact = exact_values(&[
            ("sequence", sequence.to_string()),
            ("sequence length of", format!("{} bp", stats.length)),
            ("output types", outputs.clone()),
        ]),
    )
}

fn interval_prompt(request: &AnalysisRequest, interval: &GenomeInterval) -> String {
    let outputs = join_outputs(&request.output_types, DEFAULT_INTERVAL_OUTPUTS);
    let tissues = join_tissues(&request.ontology_terms, "multiple");
    let window = interval.model_window();

    format!(
        "You are an AlphaGenome genomic interval analysis expert.

Analyze genomic interval:
- Chromosome: {chrom}
- Region: {start} - {end}
- Length: {length} bp
- Organism: {organism} ({assembly})
- Model input window: {window} ({window_len} bp)
- Output types: {outputs}
- Tissues: {tissues}

Provide comprehensive analysis:
1. **Genomic Context**: What genes/features are in this region
2. **Gene Annotations**: Exons, introns, transcripts and regulatory elements
3. **Track Predictions**: Predicted values for {outputs}
4. **Tissue Specificity**: Expression patterns across the requested tissues
5. **Functional Elements**: Promoters, enhancers, insulators, binding sites
6. **Conservation**: Evolutionary conservation if applicable
7. **Clinical Relevance**: Known disease associations of genes in this region

{exact}
Use actual genomic databases knowledge (GENCODE, ENCODE) to inform predictions.",
        chrom = interval.chromosome,
        start = interval.start,
        end = interval.end,
        length = interval.width(),
        organism = request.organism.as_str(),
        assembly = request.organism.assembly(),
        window = window,
        window_len = window.width(),
        outputs = outputs,
        tissues = tissues,
        exact = exact_values(&[
            ("chromosome", interval.chromosome.clone()),
            ("coordinates", format!("{}-{}", interval.start, interval.end)),
        ]),
    )
}

fn variant_lines(variant: &Variant) -> String {
    format!(
        "- Position: {}:{}
- Reference allele (REF): {}
- Alternate allele (ALT): {}
- Variant ID: {}",
        variant.chromosome,
        variant.position,
        variant.reference_bases,
        variant.alternate_bases,
        variant.name.as_deref().unwrap_or("unnamed"),
    )
}

fn variant_exact(variant: &Variant, interval: &GenomeInterval) -> String {
    exact_values(&[
        ("chromosome", variant.chromosome.clone()),
        ("position", variant.position.to_string()),
        ("reference allele", variant.reference_bases.clone()),
        ("alternate allele", variant.alternate_bases.clone()),
        ("context interval", interval.to_string()),
    ])
}

fn variant_effect_prompt(request: &AnalysisRequest, variant: &Variant, interval: &GenomeInterval) -> String {
    let outputs = join_outputs(&request.output_types, "all available tracks");
    let tissues = join_tissues(&request.ontology_terms, "all relevant tissues");

    format!(
        "You are an AlphaGenome variant effect prediction expert.

Analyze genetic variant:
{variant}
- Context interval: {interval} ({length} bp)
- Organism: {organism} ({assembly})
- Output types: {outputs}
- Tissues: {tissues}

Predict variant effects:
1. **REF vs ALT Predictions**: Compare reference and alternate allele effects
2. **Gene Impact**: Which genes are affected and how
3. **Expression Changes**: Predicted change in RNA-seq signal
4. **Splicing Effects**: Does it affect splice sites or create new ones?
5. **Regulatory Impact**: Effects on DNase, ATAC, ChIP signals
6. **Tissue Specificity**: Which tissues show strongest effects
7. **Functional Consequence**: Missense, nonsense, regulatory, splicing
8. **Pathogenicity Classification**: Benign, likely benign, uncertain significance, likely pathogenic or pathogenic
9. **Quantitative Scores**: Delta predictions (ALT - REF)

{exact}
Provide specific numeric predictions where possible and explain the molecular mechanisms.",
        variant = variant_lines(variant),
        interval = interval,
        length = interval.width(),
        organism = request.organism.as_str(),
        assembly = request.organism.assembly(),
        outputs = outputs,
        tissues = tissues,
        exact = variant_exact(variant, interval),
    )
}

fn variant_score_prompt(request: &AnalysisRequest, variant: &Variant, interval: &GenomeInterval) -> String {
    let tissues = join_tissues(&request.ontology_terms, "all relevant tissues");

    format!(
        "You are an AlphaGenome variant scoring expert using multiple scoring strategies.

Score genetic variant:
- Variant: {chrom}:{pos} {reference}>{alternate}
{variant}
- Context interval: {interval} ({length} bp)
- Organism: {organism} ({assembly})
- Tissues: {tissues}

Apply these AlphaGenome scoring strategies:
1. **RNA-seq Gene Scorer**: Impact on gene expression
2. **CAGE TSS Scorer**: Effect on transcription start sites
3. **Splice Site Scorer**: Impact on GT-AG splice signals
4. **DNase Center Mask Scorer**: Accessibility changes in 500bp window
5. **ATAC Center Mask Scorer**: Open chromatin effects
6. **ChIP-seq TF Scorer**: Transcription factor binding changes

For each scorer provide:
- Raw score (quantitative effect size)
- Quantile score (0-1 scale, relative to common variants)
- Direction of effect (increase or decrease)
- Affected genes/regions
- Tissue-specific scores (provide top 5 tissues)
- Interpretation (benign, uncertain, likely pathogenic)

Finish with an **Aggregated Verdict**: one overall pathogenicity classification for the variant and the scorers that drive it.

{exact}
Format as structured scoring report with clear sections.",
        chrom = variant.chromosome,
        pos = variant.position,
        reference = variant.reference_bases,
        alternate = variant.alternate_bases,
        variant = variant_lines(variant),
        interval = interval,
        length = interval.width(),
        organism = request.organism.as_str(),
        assembly = request.organism.assembly(),
        tissues = tissues,
        exact = variant_exact(variant, interval),
    )
}

fn ism_prompt(request: &AnalysisRequest, sequence: &str) -> String {
    let outputs = join_outputs(&request.output_types, DEFAULT_ISM_OUTPUTS);
    let stats = SequenceStats::of(sequence);

    format!(
        "You are an AlphaGenome In Silico Mutagenesis (ISM) expert.

Perform ISM analysis on sequence: {sequence}
Sequence length: {length} bp
Organism: {organism} ({assembly})

ISM Analysis Process:
1. Systematically mutate each position to all other bases (3 mutations per position, {mutations} in total)
2. Score each mutation's effect on {outputs}
3. Identify critical positions with largest effect sizes
4. Discover sequence motifs important for function

Provide:
1. **Position-wise Importance**: Which positions are most critical (top 20)
2. **Motif Discovery**: Identified sequence motifs (e.g., TATA box, E-box)
3. **Contribution Scores**: Per-base contribution to predictions
4. **Transcription Factor Binding**: Likely TF binding sites disrupted
5. **Functional Elements**: Promoters, enhancers, silencers identified
6. **Sensitivity Tiers**: Group positions into high, medium and low mutation sensitivity

{exact}
Present as a systematic mutagenesis report with clear insights.",
        sequence = sequence,
        length = stats.length,
        mutations = stats.length * 3,
        organism = request.organism.as_str(),
        assembly = request.organism.assembly(),
        outputs = outputs,
        exact = exact_values(&[
            ("sequence", sequence.to_string()),
            ("sequence length of", format!("{} bp", stats.length)),
        ]),
    )
}
