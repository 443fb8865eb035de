use std::sync::Arc;

use async_trait::async_trait;
use mentor_engine::connectivity::{ConnectivityState, RemoteAssist};
use mentor_engine::{
    AnalysisEngine, AnalysisStatus, AnalyzeRequest, CacheAction, Category, ClassifiedPattern,
    EngineSettings, PatternKind, SCHEMA_VERSION,
};

fn request(file: &str, language: &str, code: &str) -> AnalyzeRequest {
    AnalyzeRequest {
        schema_version: SCHEMA_VERSION,
        file: file.to_string(),
        language: language.to_string(),
        code: code.to_string(),
        workspace: None,
        changed_ranges: None,
        settings: None,
    }
}

fn long_function_source() -> String {
    let mut code = String::from("function accumulate(report) {\n");
    for i in 0..60 {
        code.push_str(&format!("  report.add(field_{i});\n"));
    }
    code.push_str("}\n");
    code
}

#[tokio::test]
async fn sixty_line_function_classifies_as_logic_clarity() {
    let engine = AnalysisEngine::new();
    let response = engine
        .analyze(request("long.ts", "typescript", &long_function_source()))
        .await
        .unwrap();

    assert_eq!(response.status, AnalysisStatus::Complete);
    assert!(!response.degraded);
    let long: Vec<_> = response
        .patterns
        .iter()
        .filter(|p| p.occurrence.kind == PatternKind::LongFunction)
        .collect();
    assert_eq!(long.len(), 1);
    assert_eq!(long[0].category, Category::LogicClarity);
}

#[tokio::test]
async fn malformed_input_never_errors_and_engine_stays_usable() {
    let engine = AnalysisEngine::new();
    let response = engine
        .analyze(request("broken.ts", "typescript", "function ((((\nlet x = ;\n"))
        .await
        .unwrap();
    assert_eq!(response.status, AnalysisStatus::Complete);

    // Subsequent calls still succeed.
    let response = engine
        .analyze(request(
            "fine.ts",
            "typescript",
            "function area(w) {\n  return w * 42;\n}\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.patterns.len(), 1);
}

#[tokio::test]
async fn unsupported_language_is_limited_support_not_an_error() {
    let engine = AnalysisEngine::new();
    let response = engine
        .analyze(request("main.go", "go", "func main() {}\n"))
        .await
        .unwrap();
    assert_eq!(response.status, AnalysisStatus::LimitedSupport);
    assert!(response.patterns.is_empty());
}

#[tokio::test]
async fn analyze_is_idempotent_for_the_same_revision() {
    let engine = AnalysisEngine::new();
    let code = "function area(w) {\n  return w * 42;\n}\n";
    let first = engine
        .analyze(request("idem.ts", "typescript", code))
        .await
        .unwrap();
    let second = engine
        .analyze(request("idem.ts", "typescript", code))
        .await
        .unwrap();
    assert_eq!(first.patterns.len(), 1);
    assert_eq!(second.patterns.len(), 1);
    assert_eq!(first.patterns[0].occurrence.id, second.patterns[0].occurrence.id);
}

#[tokio::test]
async fn shown_patterns_are_suppressed_on_the_next_pass() {
    let engine = AnalysisEngine::new();
    let code = "function area(w) {\n  return w * 42;\n}\n";
    let first = engine
        .analyze(request("seen.ts", "typescript", code))
        .await
        .unwrap();
    assert_eq!(first.patterns.len(), 1);
    let identity = first.patterns[0].occurrence.id.clone();

    // The presentation layer renders it and reports back.
    let was_suppressed = engine.check_and_record(&identity, CacheAction::Shown);
    assert!(!was_suppressed);
    assert!(engine.is_suppressed(&identity));

    let second = engine
        .analyze(request("seen.ts", "typescript", code))
        .await
        .unwrap();
    assert!(second.patterns.is_empty());
}

#[tokio::test]
async fn dismissal_suppresses_through_the_engine_boundary() {
    let engine = AnalysisEngine::new();
    let identity = "stable-identity";
    assert!(!engine.check_and_record(identity, CacheAction::Dismissed));
    assert!(engine.check_and_record(identity, CacheAction::Shown));
    assert!(engine.is_suppressed(identity));
}

#[tokio::test]
async fn disabled_categories_are_filtered_from_the_response() {
    let engine = AnalysisEngine::new();
    let mut req = request(
        "filtered.ts",
        "typescript",
        "function area(w) {\n  return w * 42;\n}\n",
    );
    req.settings = Some(EngineSettings {
        enabled_categories: vec![Category::Performance],
        ..EngineSettings::default()
    });
    let response = engine.analyze(req).await.unwrap();
    // The magic number classifies as Readability, which is disabled.
    assert!(response.patterns.is_empty());
}

struct FailingRemote;

#[async_trait]
impl RemoteAssist for FailingRemote {
    async fn refine(
        &self,
        _patterns: &[ClassifiedPattern],
    ) -> anyhow::Result<Vec<ClassifiedPattern>> {
        anyhow::bail!("remote unreachable")
    }
}

struct BoostingRemote;

#[async_trait]
impl RemoteAssist for BoostingRemote {
    async fn refine(
        &self,
        patterns: &[ClassifiedPattern],
    ) -> anyhow::Result<Vec<ClassifiedPattern>> {
        Ok(patterns
            .iter()
            .cloned()
            .map(|mut p| {
                p.confidence = 1.0;
                p
            })
            .collect())
    }
}

#[tokio::test]
async fn failing_remote_keeps_local_results_and_enters_retry() {
    let engine = AnalysisEngine::new().with_remote(Arc::new(FailingRemote));
    let response = engine
        .analyze(request(
            "remote.ts",
            "typescript",
            "function area(w) {\n  return w * 42;\n}\n",
        ))
        .await
        .unwrap();

    // Local detection survives the remote failure.
    assert_eq!(response.patterns.len(), 1);
    assert_eq!(engine.status().connectivity, ConnectivityState::Retrying);
    assert!(!response.degraded);
}

#[tokio::test]
async fn successful_remote_refines_classification() {
    let engine = AnalysisEngine::new().with_remote(Arc::new(BoostingRemote));
    let response = engine
        .analyze(request(
            "boost.ts",
            "typescript",
            "function area(w) {\n  return w * 42;\n}\n",
        ))
        .await
        .unwrap();
    assert_eq!(response.patterns.len(), 1);
    assert_eq!(response.patterns[0].confidence, 1.0);
    assert_eq!(engine.status().connectivity, ConnectivityState::Connected);
}

#[tokio::test]
async fn five_simultaneous_requests_for_one_workspace_all_complete() {
    let engine = Arc::new(AnalysisEngine::new());
    let mut handles = Vec::new();
    for i in 0..5 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let mut req = request(
                &format!("burst_{i}.py"),
                "python",
                "for a in xs:\n    for b in ys:\n        use(a, b)\n",
            );
            req.workspace = Some("burst".to_string());
            engine.analyze(req).await
        }));
    }
    for handle in handles {
        let response = handle.await.unwrap().unwrap();
        assert_eq!(response.status, AnalysisStatus::Complete);
        assert_eq!(response.patterns.len(), 1);
    }
}

#[tokio::test]
async fn status_reports_cache_counters() {
    let engine = AnalysisEngine::new();
    engine.check_and_record("status-entry", CacheAction::Shown);
    let status = engine.status();
    assert_eq!(status.schema_version, SCHEMA_VERSION);
    assert_eq!(status.cache_entries, 1);
    assert!(status.cache_bytes > 0);
}

#[tokio::test]
async fn responses_serialize_with_schema_version() {
    let engine = AnalysisEngine::new();
    let response = engine
        .analyze(request("ser.py", "python", "x = compute()\n"))
        .await
        .unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["schema_version"], SCHEMA_VERSION);
    assert!(json["patterns"].is_array());
}
