// src/config.rs

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::errors::AnalysisError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Which upstream answers analysis requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// Prompt a text-generation model directly.
    #[default]
    Gemini,
    /// Forward to the AlphaGenome Python backend.
    Backend,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Gemini => "gemini",
            EngineKind::Backend => "backend",
        }
    }
}

impl FromStr for EngineKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(EngineKind::Gemini),
            "backend" | "python" => Ok(EngineKind::Backend),
            other => Err(anyhow!("unknown analysis engine '{}', expected 'gemini' or 'backend'", other)),
        }
    }
}

/// Picks the per-request key, then the configured default. Blank keys
/// count as absent.
pub fn resolve_api_key<'a>(
    request_key: Option<&'a str>,
    default_key: Option<&'a str>,
) -> Result<&'a str, AnalysisError> {
    let present = |key: &'a str| Some(key.trim()).filter(|k| !k.is_empty());
    request_key
        .and_then(present)
        .or_else(|| default_key.and_then(present))
        .ok_or_else(|| AnalysisError::InvalidCredential {
            message: "no API key was supplied and no default key is configured".to_string(),
        })
}

/// Backoff schedule for overloaded / rate-limited upstream responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(2000),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt + 1`: `base_delay * 2^attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Sampling parameters sent as `generationConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_k: u32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.4,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 8192,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub base_url: String,
    pub model: String,
    /// Used when a request carries no key of its own.
    pub default_api_key: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub generation: Option<GenerationConfig>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
            default_api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            generation: Some(GenerationConfig::default()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BACKEND_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub engine: EngineKind,
    pub gemini: GeminiConfig,
    pub backend: BackendConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.parse().expect("valid default address"),
            engine: EngineKind::default(),
            gemini: GeminiConfig::default(),
            backend: BackendConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from a key lookup; unset or blank keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = AppConfig::default();

        if let Some(addr) = get("GENOME_ANALYZER_ADDR") {
            config.bind_addr = addr
                .parse()
                .with_context(|| format!("GENOME_ANALYZER_ADDR '{}' is not a socket address", addr))?;
        }
        if let Some(engine) = get("ANALYSIS_ENGINE") {
            config.engine = engine.parse()?;
        }
        if let Some(secs) = get("REQUEST_TIMEOUT_SECS") {
            let secs: u64 = secs
                .parse()
                .with_context(|| format!("REQUEST_TIMEOUT_SECS '{}' is not a number of seconds", secs))?;
            if secs == 0 {
                return Err(anyhow!("REQUEST_TIMEOUT_SECS must be at least 1 second"));
            }
            config.gemini.timeout = Duration::from_secs(secs);
            config.backend.timeout = Duration::from_secs(secs);
        }

        config.gemini.default_api_key = get("ALPHAGENOME_API_KEY");
        if let Some(url) = get("GEMINI_BASE_URL") {
            config.gemini.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(model) = get("GEMINI_MODEL") {
            config.gemini.model = model;
        }
        if let Some(url) = get("PYTHON_BACKEND_URL") {
            config.backend.base_url = url.trim_end_matches('/').to_string();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_the_documented_values() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.engine, EngineKind::Gemini);
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
        assert_eq!(config.gemini.timeout, Duration::from_secs(60));
        assert_eq!(config.gemini.default_api_key, None);
        assert_eq!(config.bind_addr.port(), 3000);
    }

    #[test]
    fn environment_overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup(&[
            ("ANALYSIS_ENGINE", "backend"),
            ("PYTHON_BACKEND_URL", "http://backend:9000/"),
            ("ALPHAGENOME_API_KEY", "  secret  "),
            ("REQUEST_TIMEOUT_SECS", "15"),
            ("GENOME_ANALYZER_ADDR", "0.0.0.0:8080"),
        ]))
        .unwrap();
        assert_eq!(config.engine, EngineKind::Backend);
        assert_eq!(config.backend.base_url, "http://backend:9000");
        assert_eq!(config.gemini.default_api_key.as_deref(), Some("secret"));
        assert_eq!(config.backend.timeout, Duration::from_secs(15));
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config = AppConfig::from_lookup(lookup(&[("ALPHAGENOME_API_KEY", "   ")])).unwrap();
        assert_eq!(config.gemini.default_api_key, None);
    }

    #[test]
    fn bad_values_are_reported() {
        assert!(AppConfig::from_lookup(lookup(&[("ANALYSIS_ENGINE", "llama")])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("REQUEST_TIMEOUT_SECS", "soon")])).is_err());
        let zero = AppConfig::from_lookup(lookup(&[("REQUEST_TIMEOUT_SECS", "0")])).unwrap_err();
        assert!(zero.to_string().contains("at least 1 second"));
    }

    #[test]
    fn request_key_wins_over_the_default() {
        assert_eq!(resolve_api_key(Some("mine"), Some("server")), Ok("mine"));
        assert_eq!(resolve_api_key(Some("  "), Some("server")), Ok("server"));
        assert_eq!(resolve_api_key(None, Some(" server ")), Ok("server"));
        assert!(matches!(
            resolve_api_key(None, None),
            Err(AnalysisError::InvalidCredential { .. })
        ));
    }

    #[test]
    fn backoff_doubles_from_two_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
    }
}
