// src/gemini.rs

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::api_handler::{HttpReply, Sleeper, Transport};
use crate::config::{resolve_api_key, GeminiConfig};
use crate::errors::{AnalysisError, TransportError};

/// Outcome of one attempt before the retry loop decides what to do.
#[derive(Debug)]
enum Attempt {
    Done(Value),
    Retryable { status: Option<u16>, message: String },
    Failed(AnalysisError),
}

/// Client for a `generateContent` text-generation endpoint.
pub struct GeminiClient {
    config: GeminiConfig,
    transport: Arc<dyn Transport>,
    sleeper: Arc<dyn Sleeper>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig, transport: Arc<dyn Transport>, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            config,
            transport,
            sleeper,
        }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    /// Per-request key first, then the configured default.
    pub fn resolve_api_key<'a>(&'a self, api_key: Option<&'a str>) -> Result<&'a str, AnalysisError> {
        resolve_api_key(api_key, self.config.default_api_key.as_deref())
    }

    fn endpoint(&self, api_key: &str) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
            api_key
        )
    }

    fn request_body(&self, prompt: &str) -> Value {
        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });
        if let Some(generation) = &self.config.generation {
            body["generationConfig"] = json!(generation);
        }
        body
    }

    /// Sends `prompt` and returns the decoded response body. Overload and
    /// quota failures are retried with exponential backoff; everything else
    /// fails on the first attempt.
    pub async fn generate(&self, prompt: &str, api_key: Option<&str>) -> Result<Value, AnalysisError> {
        let key = self.resolve_api_key(api_key)?;
        let url = self.endpoint(key);
        let body = self.request_body(prompt);
        let policy = self.config.retry;

        info!(
            "Calling {} ({} prompt chars)",
            self.config.model,
            prompt.chars().count()
        );

        let mut attempt = 0;
        loop {
            let outcome = match self.transport.post_json(&url, &body, self.config.timeout).await {
                Ok(reply) => interpret_reply(reply),
                Err(e) => interpret_transport_error(e),
            };

            match outcome {
                Attempt::Done(value) => {
                    debug!("Generation succeeded on attempt {}", attempt + 1);
                    return Ok(value);
                }
                Attempt::Failed(err) => {
                    warn!("Generation failed without retry: {}", err);
                    return Err(err);
                }
                Attempt::Retryable { status, message } => {
                    if attempt >= policy.max_retries {
                        warn!(
                            "Upstream still overloaded after {} attempts: {}",
                            attempt + 1,
                            message
                        );
                        return Err(AnalysisError::ServiceOverloaded {
                            attempts: attempt + 1,
                            status: status.filter(|s| *s >= 400).unwrap_or(503),
                        });
                    }
                    let delay = policy.delay_for(attempt);
                    warn!(
                        "Upstream overloaded ({}), retry {}/{} in {:?}",
                        message,
                        attempt + 1,
                        policy.max_retries,
                        delay
                    );
                    self.sleeper.sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

/// Pulls `error.message` out of an upstream error body, or falls back to
/// the raw text.
pub fn upstream_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

fn is_overload_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("overloaded") || lower.contains("quota") || lower.contains("rate limit")
}

fn is_blocked_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("blocked") || lower.contains("safety")
}

/// First matching rule wins: overload, bad key, blocked content, anything else.
fn classify_failure(status: Option<u16>, message: String) -> Attempt {
    if status == Some(429) || is_overload_message(&message) {
        return Attempt::Retryable { status, message };
    }
    if status == Some(400) && message.contains("API key") {
        return Attempt::Failed(AnalysisError::InvalidCredential { message });
    }
    if is_blocked_message(&message) {
        return Attempt::Failed(AnalysisError::ContentBlocked { reason: message });
    }
    let message = if message.is_empty() {
        format!("text generation failed with HTTP {}", status.unwrap_or(500))
    } else {
        message
    };
    Attempt::Failed(AnalysisError::UpstreamError { message, status })
}

fn interpret_reply(reply: HttpReply) -> Attempt {
    if !reply.is_success() {
        return classify_failure(Some(reply.status), upstream_message(&reply.body));
    }

    let value = match reply.json() {
        Ok(value) => value,
        Err(e) => {
            return Attempt::Failed(AnalysisError::UpstreamError {
                message: format!("text generation returned an unreadable body: {}", e),
                status: None,
            })
        }
    };

    let no_candidates = value
        .get("candidates")
        .and_then(Value::as_array)
        .map_or(true, |c| c.is_empty());
    if no_candidates {
        if let Some(reason) = value.pointer("/promptFeedback/blockReason").and_then(Value::as_str) {
            return Attempt::Failed(AnalysisError::ContentBlocked {
                reason: format!("prompt blocked: {}", reason),
            });
        }
    }
    Attempt::Done(value)
}

fn interpret_transport_error(error: TransportError) -> Attempt {
    match error {
        TransportError::Timeout(_) => Attempt::Failed(AnalysisError::UpstreamError {
            message: error.to_string(),
            status: Some(504),
        }),
        other => classify_failure(None, other.to_string()),
    }
}
