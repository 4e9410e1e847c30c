//! Behavior of the scripted backend used by the pipeline tests.

use std::sync::Arc;

use blueprint_llm::fakes::ScriptedBackend;
use blueprint_llm::{GenerationBackend, GenerationOptions, LlmError};

#[tokio::test]
async fn first_matching_rule_wins() {
    let backend = ScriptedBackend::new()
        .respond_when("overview", "first")
        .respond_when("overview of", "second")
        .with_default("fallback");

    let opts = GenerationOptions::default();
    assert_eq!(
        backend.generate("an overview of things", &opts).await.unwrap(),
        "first"
    );
    assert_eq!(backend.generate("unrelated", &opts).await.unwrap(), "fallback");
}

#[tokio::test]
async fn unmatched_prompt_without_default_is_empty_response() {
    let backend = ScriptedBackend::new();
    let err = backend
        .generate("anything", &GenerationOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, LlmError::EmptyResponse);
}

#[tokio::test]
async fn scripted_failures_are_returned() {
    let backend = ScriptedBackend::new()
        .fail_when("quota", LlmError::RateLimited("slow down".into()))
        .with_default_failure(LlmError::Timeout(3));

    let opts = GenerationOptions::default();
    assert!(matches!(
        backend.generate("quota please", &opts).await,
        Err(LlmError::RateLimited(_))
    ));
    assert_eq!(
        backend.generate("other", &opts).await.unwrap_err(),
        LlmError::Timeout(3)
    );
}

#[tokio::test]
async fn calls_are_recorded_with_grounding_and_temperature() {
    let backend = Arc::new(ScriptedBackend::new().with_default("ok"));
    let as_trait: Arc<dyn GenerationBackend> = backend.clone();

    as_trait
        .generate_with_grounding("grounded prompt", &GenerationOptions::with_temperature(0.2))
        .await
        .unwrap();
    as_trait
        .generate("plain prompt", &GenerationOptions::with_temperature(0.1))
        .await
        .unwrap();

    let calls = backend.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls[0].grounded);
    assert_eq!(calls[0].temperature, 0.2);
    assert!(!calls[1].grounded);
    assert_eq!(calls[1].temperature, 0.1);
    assert_eq!(backend.calls_matching("plain").len(), 1);
    assert_eq!(as_trait.name(), "scripted");
}
