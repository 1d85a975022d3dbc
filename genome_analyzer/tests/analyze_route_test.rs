mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::Json;
use common::{generated, quota_exceeded, reply, state, RecordingSleeper, ScriptedTransport};
use genome_analyzer::config::EngineKind;
use genome_analyzer::errors::TransportError;
use genome_analyzer::models::AnalyzeBody;
use genome_analyzer::routes::{analyze, router, ANALYZE_PATH};
use serde_json::{json, Value};
use tower::ServiceExt;

fn body(value: Value) -> AnalyzeBody {
    serde_json::from_value(value).unwrap()
}

fn score_variant_body() -> Value {
    json!({
        "variant": {"chromosome": "chr22", "position": 36201698, "reference_bases": "A", "alternate_bases": "C"},
        "interval": {"chromosome": "chr22", "start": 35701698, "end": 36701698},
        "analysisType": "score_variant",
        "apiKey": "user-key"
    })
}

#[tokio::test]
async fn gattaca_sequence_runs_end_to_end() {
    let transport = ScriptedTransport::new(vec![generated("GC content is 28.57% ...")]);
    let state = state(EngineKind::Gemini, Some("default-key"), transport.clone(), Arc::default());

    let (status, Json(response)) = analyze(
        State(state),
        Ok(Json(body(json!({
            "sequence": "GATTACA",
            "analysisType": "sequence",
            "outputTypes": ["DNASE", "RNA_SEQ"],
            "ontologyTerms": ["UBERON:0002048"],
            "organism": "human"
        })))),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(response.success);
    let predictions = response.predictions.unwrap();
    assert_eq!(predictions.len(), 1);
    assert_eq!(predictions[0].text(), "GC content is 28.57% ...");
    assert!(response.error.is_none());

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    let prompt = calls[0].1["contents"][0]["parts"][0]["text"].as_str().unwrap().to_string();
    assert!(prompt.contains("Sequence: GATTACA"));
    assert!(prompt.contains("Sequence length: 7 bp"));
    assert!(prompt.contains("DNASE, RNA_SEQ"));
    assert!(calls[0].0.ends_with("key=default-key"));
}

#[tokio::test]
async fn missing_input_is_a_400_without_upstream_calls() {
    let transport = ScriptedTransport::new(vec![]);
    let state = state(EngineKind::Gemini, Some("k"), transport.clone(), Arc::default());

    let (status, Json(response)) = analyze(State(state), Ok(Json(body(json!({"organism": "human"}))))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("sequence, interval, or variant is required"));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn same_variant_switches_prompt_on_scoring_mode() {
    let transport = ScriptedTransport::new(vec![generated("effect"), generated("score")]);
    let state = state(EngineKind::Gemini, Some("k"), transport.clone(), Arc::default());

    let mut effect = score_variant_body();
    effect["analysisType"] = json!("variant");
    analyze(State(state.clone()), Ok(Json(body(effect)))).await;
    analyze(State(state), Ok(Json(body(score_variant_body())))).await;

    let calls = transport.calls();
    let prompt = |i: usize| calls[i].1["contents"][0]["parts"][0]["text"].as_str().unwrap().to_string();
    assert!(prompt(0).contains("variant effect prediction expert"));
    assert!(prompt(1).contains("variant scoring expert"));
    assert!(calls[1].0.ends_with("key=user-key"));
}

#[tokio::test]
async fn variant_insights_are_attached_when_found() {
    let transport = ScriptedTransport::new(vec![generated(
        "**Gene:** EP300\nOverall classification: Likely Pathogenic",
    )]);
    let state = state(EngineKind::Gemini, Some("k"), transport, Arc::default());

    let (_, Json(response)) = analyze(State(state), Ok(Json(body(score_variant_body())))).await;

    let insights = response.insights.unwrap();
    assert_eq!(insights.gene.as_deref(), Some("EP300"));
    assert_eq!(insights.classification.as_deref(), Some("likely pathogenic"));
}

#[tokio::test]
async fn exhausted_retries_surface_as_overloaded() {
    let transport = ScriptedTransport::new(vec![
        quota_exceeded(),
        quota_exceeded(),
        quota_exceeded(),
        quota_exceeded(),
    ]);
    let sleeper = Arc::new(RecordingSleeper::default());
    let state = state(EngineKind::Gemini, Some("k"), transport.clone(), sleeper.clone());

    let (status, Json(response)) = analyze(State(state), Ok(Json(body(json!({"sequence": "ACGT"}))))).await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(response.error.unwrap().contains("try again"));
    assert_eq!(transport.call_count(), 4);
    assert_eq!(sleeper.delays().len(), 3);
}

#[tokio::test]
async fn backend_connection_refused_is_a_503_with_start_instructions() {
    let transport = ScriptedTransport::new(vec![Err(TransportError::Connect(
        "tcp connect error: Connection refused (os error 111)".into(),
    ))]);
    let state = state(EngineKind::Backend, None, transport.clone(), Arc::default());

    let (status, Json(response)) = analyze(State(state), Ok(Json(body(score_variant_body())))).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!response.success);
    let error = response.error.unwrap();
    assert!(error.contains("Python backend not running"));
    assert!(error.contains("cd python-backend && python main.py"));

    let calls = transport.calls();
    assert_eq!(calls[0].0, "http://localhost:8000/api/analyze");
    assert_eq!(calls[0].1["analysis_type"], "score_variant");
    assert_eq!(calls[0].1["api_key"], "user-key");
}

#[tokio::test]
async fn backend_success_is_wrapped_as_a_prediction() {
    let transport = ScriptedTransport::new(vec![reply(
        200,
        json!({
            "success": true,
            "data": {"variant": "chr22:36201698:A>C", "interval": "chr22:35677410-36725986", "interval_length": 1048576},
            "message": "Analysis completed using real AlphaGenome API"
        }),
    )]);
    let state = state(EngineKind::Backend, None, transport, Arc::default());

    let (status, Json(response)) = analyze(State(state), Ok(Json(body(score_variant_body())))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response.message.as_deref(), Some("Analysis completed using real AlphaGenome API"));
    assert_eq!(response.data.unwrap()["interval_length"], 1048576);
    let text = response.predictions.unwrap()[0].text();
    assert!(text.starts_with("Real AlphaGenome Analysis Results:"));
    assert!(text.contains("Variant: chr22:36201698:A>C"));
}

#[tokio::test]
async fn backend_error_detail_and_status_pass_through() {
    let transport = ScriptedTransport::new(vec![reply(
        500,
        json!({"detail": "AlphaGenome API error: invalid interval"}),
    )]);
    let state = state(EngineKind::Backend, None, transport, Arc::default());

    let (status, Json(response)) = analyze(State(state), Ok(Json(body(score_variant_body())))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.error.as_deref(), Some("AlphaGenome API error: invalid interval"));
}

#[tokio::test]
async fn router_rejects_unknown_output_types_as_bad_request() {
    let state = state(EngineKind::Gemini, Some("k"), ScriptedTransport::new(vec![]), Arc::default());
    let app = router(state);

    let request = Request::builder()
        .method("POST")
        .uri(ANALYZE_PATH)
        .header("content-type", "application/json")
        .body(Body::from(r#"{"sequence":"ACGT","outputTypes":["CONTACT_MAPS"]}"#))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let envelope: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(envelope["success"], false);
    assert!(envelope["error"].as_str().unwrap().contains("CONTACT_MAPS"));
}

#[tokio::test]
async fn router_reports_status_on_root() {
    let state = state(EngineKind::Backend, None, ScriptedTransport::new(vec![]), Arc::default());
    let app = router(state);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let status: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(status["status"], "running");
    assert_eq!(status["engine"], "backend");
}

#[tokio::test]
async fn backend_without_any_key_is_rejected_before_calling_out() {
    let transport = ScriptedTransport::new(vec![]);
    let state = state(EngineKind::Backend, None, transport.clone(), Arc::default());

    let mut payload = score_variant_body();
    payload.as_object_mut().unwrap().remove("apiKey");
    let (status, Json(response)) = analyze(State(state), Ok(Json(body(payload)))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!response.success);
    assert!(response.error.unwrap().contains("Invalid API key"));
    assert_eq!(transport.call_count(), 0);
}

#[tokio::test]
async fn variant_outside_its_interval_is_still_analyzed() {
    let transport = ScriptedTransport::new(vec![generated("effect")]);
    let state = state(EngineKind::Gemini, Some("k"), transport.clone(), Arc::default());

    let mut payload = score_variant_body();
    payload["analysisType"] = json!("variant");
    payload["interval"] = json!({"chromosome": "chr22", "start": 1000, "end": 3000});
    let (status, Json(response)) = analyze(State(state), Ok(Json(body(payload)))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(response.success);
    let calls = transport.calls();
    let prompt = calls[0].1["contents"][0]["parts"][0]["text"].as_str().unwrap();
    assert!(prompt.contains("chr22:1000-3000"));
}

#[tokio::test]
async fn router_rejects_coordinates_past_any_chromosome() {
    let transport = ScriptedTransport::new(vec![]);
    let state = state(EngineKind::Gemini, Some("k"), transport.clone(), Arc::default());
    let app = router(state);

    let request = Request::builder()
        .method("POST")
        .uri(ANALYZE_PATH)
        .header("content-type", "application/json")
        .body(Body::from(
            r#"{"interval":{"chromosome":"chr1","start":18446744073709551605,"end":18446744073709551615}}"#,
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let envelope: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(envelope["success"], false);
    assert!(envelope["error"].as_str().unwrap().contains("beyond any chromosome"));
    assert_eq!(transport.call_count(), 0);
}
