// src/backend.rs

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info};

use crate::api_handler::Transport;
use crate::config::BackendConfig;
use crate::errors::{AnalysisError, TransportError};
use crate::models::{AnalysisMode, AnalysisRequest, GenomeInterval, OutputType, Prediction, Variant};

const DEFAULT_BACKEND_OUTPUTS: [OutputType; 1] = [OutputType::RnaSeq];
const DEFAULT_BACKEND_TISSUE: &str = "UBERON:0002048";

/// Snake-case body expected by the Python backend's `/api/analyze`.
#[derive(Debug, Clone, Serialize)]
pub struct BackendRequest<'a> {
    pub api_key: &'a str,
    pub analysis_type: &'static str,
    pub organism: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<&'a Variant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<&'a GenomeInterval>,
    pub output_types: Vec<OutputType>,
    pub ontology_terms: Vec<String>,
    pub use_scoring: bool,
}

impl<'a> BackendRequest<'a> {
    pub fn from_request(request: &'a AnalysisRequest, api_key: &'a str) -> Self {
        let (sequence, variant, interval) = match &request.mode {
            AnalysisMode::Sequence { sequence, .. } | AnalysisMode::Ism { sequence } => {
                (Some(sequence.as_str()), None, None)
            }
            AnalysisMode::Interval { interval } => (None, None, Some(interval)),
            AnalysisMode::VariantEffect { variant, interval }
            | AnalysisMode::VariantScore { variant, interval } => (None, Some(variant), Some(interval)),
        };

        let output_types = if request.output_types.is_empty() {
            DEFAULT_BACKEND_OUTPUTS.to_vec()
        } else {
            request.output_types.clone()
        };
        let ontology_terms = if request.ontology_terms.is_empty() {
            vec![DEFAULT_BACKEND_TISSUE.to_string()]
        } else {
            request.ontology_terms.clone()
        };

        Self {
            api_key,
            analysis_type: request.mode.name(),
            organism: request.organism.as_str(),
            sequence,
            variant,
            interval,
            output_types,
            ontology_terms,
            use_scoring: matches!(request.mode, AnalysisMode::VariantScore { .. }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BackendReply {
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
}

/// Result of a successful backend call, already shaped for the envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendOutcome {
    pub data: Value,
    pub message: Option<String>,
    pub predictions: Vec<Prediction>,
}

pub struct BackendClient {
    config: BackendConfig,
    transport: Arc<dyn Transport>,
}

impl BackendClient {
    pub fn new(config: BackendConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub async fn analyze(&self, request: &AnalysisRequest, api_key: &str) -> Result<BackendOutcome, AnalysisError> {
        let url = format!("{}/api/analyze", self.config.base_url.trim_end_matches('/'));
        let payload = BackendRequest::from_request(request, api_key);
        let body = serde_json::to_value(&payload).map_err(|e| AnalysisError::UpstreamError {
            message: format!("could not encode backend request: {}", e),
            status: None,
        })?;

        info!("Calling Python backend at {} ({})", url, payload.analysis_type);

        let reply = match self.transport.post_json(&url, &body, self.config.timeout).await {
            Ok(reply) => reply,
            Err(TransportError::Connect(reason)) => {
                error!("Python backend unreachable: {}", reason);
                return Err(AnalysisError::BackendUnavailable {
                    url: self.config.base_url.clone(),
                });
            }
            Err(e @ TransportError::Timeout(_)) => {
                return Err(AnalysisError::UpstreamError {
                    message: e.to_string(),
                    status: Some(504),
                })
            }
            Err(e) => {
                return Err(AnalysisError::UpstreamError {
                    message: e.to_string(),
                    status: None,
                })
            }
        };

        if !reply.is_success() {
            let detail = reply
                .json()
                .ok()
                .and_then(|v| v.get("detail").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| "Analysis failed".to_string());
            error!("Python backend error (HTTP {}): {}", reply.status, detail);
            return Err(AnalysisError::UpstreamError {
                message: detail,
                status: Some(reply.status),
            });
        }

        let parsed: BackendReply = serde_json::from_str(&reply.body).map_err(|e| AnalysisError::UpstreamError {
            message: format!("Python backend returned an unreadable body: {}", e),
            status: None,
        })?;

        let text = render_backend_text(&parsed.data, parsed.message.as_deref());
        Ok(BackendOutcome {
            data: parsed.data,
            message: parsed.message,
            predictions: vec![Prediction::from_text(text)],
        })
    }
}

/// Text wrapper the UI renders for backend results.
fn render_backend_text(data: &Value, message: Option<&str>) -> String {
    let field = |name: &str| {
        data.get(name)
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string()
    };
    let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());

    format!(
        "Real AlphaGenome Analysis Results:\n\nVariant: {}\nInterval: {}\n\n{}\n\n{}",
        field("variant"),
        field("interval"),
        pretty,
        message.unwrap_or_default()
    )
}
