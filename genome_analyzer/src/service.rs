// src/service.rs

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api_handler::{Sleeper, Transport};
use crate::backend::BackendClient;
use crate::config::{resolve_api_key, AppConfig, EngineKind};
use crate::errors::AnalysisError;
use crate::gemini::GeminiClient;
use crate::insights;
use crate::intervals::VARIANT_HALF_WINDOW;
use crate::models::{
    definite_bases, normalize_sequence, validate_ontology_term, AnalysisMode, AnalysisRequest, AnalysisResponse,
    AnalyzeBody, GenomeInterval, Organism, Prediction, SequenceKind,
};
use crate::prompts::build_prompt;

fn is_score_request(body: &AnalyzeBody) -> bool {
    body.use_scoring.unwrap_or(false)
        || matches!(
            body.analysis_type.as_deref().map(str::trim),
            Some("score_variant") | Some("score")
        )
}

fn check_chromosome(organism: Organism, chromosome: &str) -> Result<(), AnalysisError> {
    if organism.is_valid_chromosome(chromosome) {
        Ok(())
    } else {
        Err(AnalysisError::invalid(format!(
            "'{}' is not a {} chromosome (expected names like chr1..chr{}, chrX, chrY, chrM)",
            chromosome,
            organism.as_str(),
            organism.autosomes()
        )))
    }
}

fn checked_sequence(raw: Option<&str>) -> Result<Option<String>, AnalysisError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let sequence = normalize_sequence(raw);
    if sequence.is_empty() {
        return Ok(None);
    }
    definite_bases(&sequence)?;
    Ok(Some(sequence))
}

/// Decides the analysis mode from the inbound body. First match wins:
/// variant, interval, explicit ISM, sequence.
pub fn build_request(body: AnalyzeBody) -> Result<AnalysisRequest, AnalysisError> {
    let organism = body.organism.unwrap_or_default();
    let analysis_type = body.analysis_type.as_deref().map(str::trim);
    let scoring = is_score_request(&body);

    let mode = if let Some(variant) = body.variant {
        check_chromosome(organism, &variant.chromosome)?;
        let interval = match body.interval {
            Some(interval) => interval,
            None => {
                debug!("No interval given, centring one on {}", variant.id());
                GenomeInterval::centered_on(variant.chromosome.clone(), variant.position, VARIANT_HALF_WINDOW)
            }
        };
        check_chromosome(organism, &interval.chromosome)?;
        if interval.chromosome != variant.chromosome || !interval.contains(variant.position) {
            warn!("Variant {} lies outside its context interval {}", variant.id(), interval);
        }
        if scoring {
            AnalysisMode::VariantScore { variant, interval }
        } else {
            AnalysisMode::VariantEffect { variant, interval }
        }
    } else if let Some(interval) = body.interval {
        check_chromosome(organism, &interval.chromosome)?;
        AnalysisMode::Interval { interval }
    } else if analysis_type == Some("ism") {
        let sequence = checked_sequence(body.sequence.as_deref())?.ok_or(AnalysisError::MissingInput)?;
        AnalysisMode::Ism { sequence }
    } else if let Some(sequence) = checked_sequence(body.sequence.as_deref())? {
        AnalysisMode::Sequence {
            sequence,
            kind: SequenceKind::from_analysis_type(analysis_type),
        }
    } else {
        return Err(AnalysisError::MissingInput);
    };

    let ontology_terms = body.ontology_terms.unwrap_or_default();
    for term in &ontology_terms {
        validate_ontology_term(term)?;
    }

    let mut output_types = Vec::new();
    for output in body.output_types.unwrap_or_default() {
        if !output_types.contains(&output) {
            output_types.push(output);
        }
    }
    if output_types.is_empty() {
        if let AnalysisMode::Sequence { kind, .. } = &mode {
            output_types = kind.preset().to_vec();
        }
    }

    Ok(AnalysisRequest {
        mode,
        output_types,
        ontology_terms,
        organism,
        api_key: body.api_key.filter(|k| !k.trim().is_empty()),
    })
}

/// Where analyses are sent.
pub enum Engine {
    Gemini(GeminiClient),
    Backend {
        client: BackendClient,
        /// Key forwarded when the request carries none.
        default_api_key: Option<String>,
    },
}

pub struct AnalysisService {
    engine: Engine,
}

impl AnalysisService {
    pub fn new(engine: Engine) -> Self {
        Self { engine }
    }

    pub fn from_config(config: &AppConfig, transport: Arc<dyn Transport>, sleeper: Arc<dyn Sleeper>) -> Self {
        let engine = match config.engine {
            EngineKind::Gemini => Engine::Gemini(GeminiClient::new(config.gemini.clone(), transport, sleeper)),
            EngineKind::Backend => Engine::Backend {
                client: BackendClient::new(config.backend.clone(), transport),
                default_api_key: config.gemini.default_api_key.clone(),
            },
        };
        Self::new(engine)
    }

    pub fn engine_kind(&self) -> EngineKind {
        match self.engine {
            Engine::Gemini(_) => EngineKind::Gemini,
            Engine::Backend { .. } => EngineKind::Backend,
        }
    }

    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisResponse, AnalysisError> {
        info!(
            "Running {} analysis ({} engine, {} output types)",
            request.mode.name(),
            self.engine_kind().as_str(),
            request.output_types.len()
        );

        let mut response = match &self.engine {
            Engine::Gemini(client) => {
                let prompt = build_prompt(request);
                let data = client.generate(&prompt, request.api_key.as_deref()).await?;
                let predictions = candidates(&data);
                AnalysisResponse::success(data, predictions)
            }
            Engine::Backend {
                client,
                default_api_key,
            } => {
                let api_key = resolve_api_key(request.api_key.as_deref(), default_api_key.as_deref())?;
                let outcome = client.analyze(request, api_key).await?;
                let mut response = AnalysisResponse::success(outcome.data, outcome.predictions);
                response.message = outcome.message;
                response
            }
        };

        if matches!(
            request.mode,
            AnalysisMode::VariantEffect { .. } | AnalysisMode::VariantScore { .. }
        ) {
            let found = insights::extract(response.predictions.as_deref().unwrap_or_default());
            if !found.is_empty() {
                response.insights = Some(found);
            }
        }

        Ok(response)
    }
}

/// `candidates` of a generateContent body; missing or malformed entries
/// yield an empty list rather than an error.
fn candidates(data: &Value) -> Vec<Prediction> {
    data.get("candidates")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<Prediction>(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}
