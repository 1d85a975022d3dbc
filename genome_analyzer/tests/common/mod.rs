#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use genome_analyzer::api_handler::{HttpReply, Sleeper, Transport};
use genome_analyzer::config::{AppConfig, EngineKind};
use genome_analyzer::errors::TransportError;
use genome_analyzer::routes::AppState;
use genome_analyzer::service::AnalysisService;
use serde_json::{json, Value};

/// Transport answering from a fixed script and recording every call.
#[derive(Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Result<HttpReply, TransportError>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Result<HttpReply, TransportError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post_json(&self, url: &str, body: &Value, _timeout: Duration) -> Result<HttpReply, TransportError> {
        self.calls.lock().unwrap().push((url.to_string(), body.clone()));
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Other("script exhausted".into())))
    }
}

/// Sleeper that returns immediately and remembers the requested delays.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

pub fn reply(status: u16, body: Value) -> Result<HttpReply, TransportError> {
    Ok(HttpReply {
        status,
        body: body.to_string(),
    })
}

pub fn generated(text: &str) -> Result<HttpReply, TransportError> {
    reply(
        200,
        json!({
            "candidates": [{
                "content": {"parts": [{"text": text}], "role": "model"},
                "finishReason": "STOP"
            }]
        }),
    )
}

pub fn quota_exceeded() -> Result<HttpReply, TransportError> {
    reply(
        429,
        json!({"error": {"code": 429, "message": "Resource has been exhausted (e.g. check quota).", "status": "RESOURCE_EXHAUSTED"}}),
    )
}

pub fn config(engine: EngineKind, default_key: Option<&str>) -> AppConfig {
    let mut config = AppConfig::default();
    config.engine = engine;
    config.gemini.default_api_key = default_key.map(str::to_string);
    config
}

pub fn state(
    engine: EngineKind,
    default_key: Option<&str>,
    transport: Arc<ScriptedTransport>,
    sleeper: Arc<RecordingSleeper>,
) -> Arc<AppState> {
    let service = AnalysisService::from_config(&config(engine, default_key), transport, sleeper);
    Arc::new(AppState { service })
}
