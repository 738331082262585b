//! Tests for the individual pipeline stages, with scripted providers

use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

use use_case_generator::job::JobStore;
use use_case_generator::pipeline::types::{Citation, FinalDocument, ResearchQuery, ResearchResult};
use use_case_generator::render;
use use_case_generator::pipeline::{
    step1_questions, step2_research, step3_refine, step4_polish, step5_example, step6_visuals,
};
use use_case_generator::PipelineError;

use super::common::{
    config_with_steps, draft_for, draft_json, example_json, fast_retry, mismatched_draft_json,
    questions_json, sample_config, visuals_json, EchoProvider, MockProvider, Scripted,
};

fn store_in(dir: &tempfile::TempDir) -> JobStore {
    JobStore::create(dir.path(), &sample_config()).unwrap()
}

fn query(question: &str) -> ResearchQuery {
    ResearchQuery {
        question: question.to_string(),
        rationale: String::new(),
    }
}

fn research_ok(question: &str, content: &str, urls: &[&str]) -> ResearchResult {
    ResearchResult {
        query: query(question),
        content: content.to_string(),
        citations: urls
            .iter()
            .map(|url| Citation {
                url: url.to_string(),
                title: None,
                snippet: None,
                relevance_score: None,
            })
            .collect(),
        failed: false,
    }
}

// Stage 1

#[tokio::test]
async fn questions_parse_from_single_request() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let provider = MockProvider::new(vec![Scripted::Ok(questions_json(3))]);

    let questions = step1_questions::generate_research_questions(
        &provider,
        "test-model",
        &sample_config(),
        &store,
    )
    .await
    .unwrap();

    assert_eq!(questions.len(), 3);
    assert_eq!(provider.calls(), 1);
    assert!(store.dir().join("research_questions_raw.txt").is_file());
    assert!(store.dir().join("research_questions.json").is_file());
}

#[tokio::test]
async fn questions_accept_fenced_json() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let fenced = format!("```json\n{}\n```", questions_json(2));
    let provider = MockProvider::new(vec![Scripted::Ok(fenced)]);

    let questions = step1_questions::generate_research_questions(
        &provider,
        "test-model",
        &sample_config(),
        &store,
    )
    .await
    .unwrap();

    assert_eq!(questions.len(), 2);
}

#[tokio::test]
async fn surplus_questions_are_truncated_to_four() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let provider = MockProvider::new(vec![Scripted::Ok(questions_json(6))]);

    let questions = step1_questions::generate_research_questions(
        &provider,
        "test-model",
        &sample_config(),
        &store,
    )
    .await
    .unwrap();

    assert_eq!(questions.len(), step1_questions::MAX_QUESTIONS);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn short_response_triggers_one_reprompt() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let provider = MockProvider::new(vec![
        Scripted::Ok(questions_json(1)),
        Scripted::Ok(questions_json(2)),
    ]);

    let questions = step1_questions::generate_research_questions(
        &provider,
        "test-model",
        &sample_config(),
        &store,
    )
    .await
    .unwrap();

    assert_eq!(questions.len(), 2);
    assert_eq!(provider.calls(), 2);
    assert!(store.dir().join("research_questions_retry_raw.txt").is_file());
}

#[tokio::test]
async fn persistently_short_response_fails_the_stage() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let provider = MockProvider::new(vec![
        Scripted::Ok(questions_json(1)),
        Scripted::Ok(questions_json(1)),
    ]);

    let err = step1_questions::generate_research_questions(
        &provider,
        "test-model",
        &sample_config(),
        &store,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, PipelineError::Generation { .. }));
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn existing_questions_artifact_skips_the_provider() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let saved = vec![query("Saved question?"), query("Another saved question?")];
    store.write_artifact("research_questions", &saved).unwrap();
    let provider = MockProvider::new(Vec::new());

    let questions = step1_questions::generate_research_questions(
        &provider,
        "test-model",
        &sample_config(),
        &store,
    )
    .await
    .unwrap();

    assert_eq!(questions.len(), 2);
    assert_eq!(provider.calls(), 0);
}

// Stage 2

#[tokio::test]
async fn research_results_keep_query_order_under_concurrency() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    // The first query finishes last; output order must not follow completion
    let provider = Arc::new(EchoProvider::new(vec![
        Duration::from_millis(50),
        Duration::from_millis(1),
        Duration::from_millis(20),
    ]));
    let queries = vec![query("First?"), query("Second?"), query("Third?")];

    let results = step2_research::execute_research(
        provider,
        "test-model",
        &sample_config(),
        &queries,
        &store,
        3,
        fast_retry(),
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 3);
    assert!(results[0].content.contains("First?"));
    assert!(results[1].content.contains("Second?"));
    assert!(results[2].content.contains("Third?"));
    assert!(results.iter().all(|r| !r.failed));
    assert!(store.dir().join("deep_research.json").is_file());
}

#[tokio::test]
async fn transient_research_errors_are_retried() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let provider = Arc::new(MockProvider::new(vec![
        Scripted::Transient("rate limited".to_string()),
        Scripted::Transient("rate limited".to_string()),
        Scripted::Ok("recovered findings".to_string()),
    ]));
    let queries = vec![query("Only question?")];

    let results = step2_research::execute_research(
        Arc::clone(&provider) as Arc<dyn use_case_generator::provider::Provider>,
        "test-model",
        &sample_config(),
        &queries,
        &store,
        1,
        fast_retry(),
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 1);
    assert!(!results[0].failed);
    assert_eq!(results[0].content, "recovered findings");
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn exhausted_retry_budget_yields_failed_placeholders() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let provider = Arc::new(MockProvider::always_transient());
    let queries = vec![query("First?"), query("Second?")];

    let results = step2_research::execute_research(
        Arc::clone(&provider) as Arc<dyn use_case_generator::provider::Provider>,
        "test-model",
        &sample_config(),
        &queries,
        &store,
        2,
        fast_retry(),
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.failed));
    assert!(results.iter().all(|r| r.content.contains("review manually")));
    // 1 attempt + 2 retries per query
    assert_eq!(provider.calls(), 6);
}

#[tokio::test]
async fn fatal_research_error_skips_retries() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let provider = Arc::new(MockProvider::new(vec![Scripted::Fatal(
        "invalid api key".to_string(),
    )]));
    let queries = vec![query("Only question?")];

    let results = step2_research::execute_research(
        Arc::clone(&provider) as Arc<dyn use_case_generator::provider::Provider>,
        "test-model",
        &sample_config(),
        &queries,
        &store,
        1,
        fast_retry(),
    )
    .await
    .unwrap();

    assert!(results[0].failed);
    assert_eq!(provider.calls(), 1);
}

// Stage 3

#[tokio::test]
async fn refine_restores_config_fields_and_collects_citations() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let mut payload = draft_for(&config);
    payload.title = "A Title The Model Invented".to_string();
    payload.time_to_complete = "3 hours".to_string();
    let provider =
        MockProvider::new(vec![Scripted::Ok(serde_json::to_string(&payload).unwrap())]);

    let research = vec![
        research_ok("First?", "findings", &["https://a.example", "https://b.example"]),
        research_ok("Second?", "findings", &["https://b.example", "https://c.example"]),
    ];

    let draft = step3_refine::refine_use_case(&provider, "test-model", &config, &research, &store)
        .await
        .unwrap();

    assert_eq!(draft.title, config.title);
    assert_eq!(draft.time_to_complete, config.time_estimate);
    assert_eq!(draft.metadata.as_ref().unwrap().title, config.title);

    let urls: Vec<&str> = draft.citations.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://a.example", "https://b.example", "https://c.example"]
    );
}

#[tokio::test]
async fn refine_attaches_model_citation_metadata() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let mut payload = draft_for(&config);
    payload.citations = vec![
        Citation {
            url: "https://example.com/guide".to_string(),
            title: Some("Prompting Guide".to_string()),
            snippet: Some("Covers prompt structure basics.".to_string()),
            relevance_score: Some(0.9),
        },
        // A URL the model invented; it must not survive into the draft
        Citation {
            url: "https://invented.example".to_string(),
            title: Some("Phantom Source".to_string()),
            snippet: None,
            relevance_score: Some(1.0),
        },
    ];
    let provider =
        MockProvider::new(vec![Scripted::Ok(serde_json::to_string(&payload).unwrap())]);

    let research = vec![
        research_ok("First?", "findings", &["https://example.com/guide"]),
        research_ok("Second?", "findings", &["https://b.example"]),
    ];

    let draft = step3_refine::refine_use_case(&provider, "test-model", &config, &research, &store)
        .await
        .unwrap();

    assert_eq!(draft.citations.len(), 2);
    assert_eq!(draft.citations[0].url, "https://example.com/guide");
    assert_eq!(draft.citations[0].title.as_deref(), Some("Prompting Guide"));
    assert_eq!(draft.citations[0].relevance_score, Some(0.9));
    assert_eq!(
        draft.citations[0].snippet.as_deref(),
        Some("Covers prompt structure basics.")
    );
    // The model skipped this source; it stays carried but unscored
    assert_eq!(draft.citations[1].url, "https://b.example");
    assert!(draft.citations[1].title.is_none());
    assert!(draft.citations[1].relevance_score.is_none());

    let md = render::to_markdown(&FinalDocument {
        content: draft,
        example_solution: None,
        visual_suggestions: Vec::new(),
        stage_report: Vec::new(),
        config,
    });
    assert!(md.contains("* [Prompting Guide](https://example.com/guide)"));
    assert!(!md.contains("[Untitled](https://example.com/guide)"));
    assert!(!md.contains("https://invented.example"));
}

#[tokio::test]
async fn refine_rejects_step_count_mismatch() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = config_with_steps(&["One", "Two", "Three", "Four", "Five"]);
    let provider = MockProvider::new(vec![Scripted::Ok(mismatched_draft_json(&config, 4))]);

    let err = step3_refine::refine_use_case(&provider, "test-model", &config, &[], &store)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::ContentIntegrity(_)));
    // The raw response survives for inspection even though parsing succeeded
    assert!(store.dir().join("refined_draft_raw.txt").is_file());
    assert!(!store.dir().join("refined_draft.json").exists());
}

#[tokio::test]
async fn refine_provider_failure_is_fatal() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let provider = MockProvider::new(vec![Scripted::Fatal("model overloaded".to_string())]);

    let err = step3_refine::refine_use_case(&provider, "test-model", &config, &[], &store)
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Generation { .. }));
}

// Stage 4

#[tokio::test]
async fn polish_keeps_structure_and_protected_fields() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let draft = draft_for(&config);
    let mut reworded = draft.clone();
    reworded.description = "You will learn to write precise prompts.".to_string();
    reworded.title = "Polished Title".to_string();
    let provider =
        MockProvider::new(vec![Scripted::Ok(serde_json::to_string(&reworded).unwrap())]);

    let (polished, degraded) =
        step4_polish::polish_draft(&provider, "test-model", &draft, &store)
            .await
            .unwrap();

    assert!(!degraded);
    assert_eq!(polished.description, reworded.description);
    assert_eq!(polished.title, draft.title);
    assert_eq!(polished.time_to_complete, draft.time_to_complete);
}

#[tokio::test]
async fn unparseable_polish_falls_back_to_the_draft() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let draft = draft_for(&config);
    let provider = MockProvider::new(vec![Scripted::Ok("I made it better!".to_string())]);

    let (kept, degraded) = step4_polish::polish_draft(&provider, "test-model", &draft, &store)
        .await
        .unwrap();

    assert!(degraded);
    assert_eq!(kept.description, draft.description);
    // The fallback draft is still persisted as the stage artifact
    assert!(store.dir().join("final_use_case.json").is_file());
}

#[tokio::test]
async fn polish_that_alters_step_structure_is_discarded() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let draft = draft_for(&config);
    let provider = MockProvider::new(vec![Scripted::Ok(mismatched_draft_json(&config, 1))]);

    let (kept, degraded) = step4_polish::polish_draft(&provider, "test-model", &draft, &store)
        .await
        .unwrap();

    assert!(degraded);
    assert_eq!(kept.steps.len(), draft.steps.len());
}

#[tokio::test]
async fn polish_provider_failure_keeps_the_draft() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let draft = draft_for(&config);
    let provider = MockProvider::new(vec![Scripted::Fatal("model overloaded".to_string())]);

    let (kept, degraded) = step4_polish::polish_draft(&provider, "test-model", &draft, &store)
        .await
        .unwrap();

    assert!(degraded);
    assert_eq!(kept.description, draft.description);
    // The fallback draft is persisted, so a resume never repeats the request
    assert!(store.dir().join("final_use_case.json").is_file());
    let silent = MockProvider::new(Vec::new());
    let (resumed, _) = step4_polish::polish_draft(&silent, "test-model", &draft, &store)
        .await
        .unwrap();
    assert_eq!(silent.calls(), 0);
    assert_eq!(resumed.description, draft.description);
}

// Stage 5

#[tokio::test]
async fn example_solution_parses_on_first_attempt() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let draft = draft_for(&config);
    let provider = MockProvider::new(vec![Scripted::Ok(example_json(&config))]);

    let solution =
        step5_example::generate_example_solution(&provider, "test-model", &config, &draft, &store)
            .await
            .unwrap();

    let solution = solution.expect("solution parsed");
    assert_eq!(solution.steps.len(), draft.steps.len());
    assert_eq!(provider.calls(), 1);
    assert!(store.dir().join("example_solution.json").is_file());
}

#[tokio::test]
async fn unparseable_example_gets_one_repair_attempt() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let draft = draft_for(&config);
    let provider = MockProvider::new(vec![
        Scripted::Ok("here is your solution".to_string()),
        Scripted::Ok(example_json(&config)),
    ]);

    let solution =
        step5_example::generate_example_solution(&provider, "test-model", &config, &draft, &store)
            .await
            .unwrap();

    assert!(solution.is_some());
    assert_eq!(provider.calls(), 2);
    assert!(store.dir().join("example_solution_repair_raw.txt").is_file());
}

#[tokio::test]
async fn failed_repair_omits_the_example() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let draft = draft_for(&config);
    let provider = MockProvider::new(vec![
        Scripted::Ok("not json".to_string()),
        Scripted::Ok("still not json".to_string()),
    ]);

    let solution =
        step5_example::generate_example_solution(&provider, "test-model", &config, &draft, &store)
            .await
            .unwrap();

    assert!(solution.is_none());
    assert_eq!(provider.calls(), 2);
    assert!(!store.dir().join("example_solution.json").exists());
}

#[tokio::test]
async fn example_provider_failure_is_not_fatal() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let draft = draft_for(&config);
    let provider = MockProvider::new(vec![Scripted::Fatal("model overloaded".to_string())]);

    let solution =
        step5_example::generate_example_solution(&provider, "test-model", &config, &draft, &store)
            .await
            .unwrap();

    assert!(solution.is_none());
}

// Stage 6

#[tokio::test]
async fn visual_suggestions_parse_from_json_array() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let draft = draft_for(&config);
    let provider = MockProvider::new(vec![Scripted::Ok(visuals_json())]);

    let visuals =
        step6_visuals::suggest_visual_elements(&provider, "test-model", &draft, None, &store)
            .await
            .unwrap();

    assert_eq!(visuals.len(), 3);
    assert!(store.dir().join("visual_suggestions.json").is_file());
}

#[tokio::test]
async fn unparseable_visuals_leave_the_document_without_them() {
    let dir = tempdir().unwrap();
    let store = store_in(&dir);
    let config = sample_config();
    let draft = draft_for(&config);
    let provider = MockProvider::new(vec![Scripted::Ok("no visuals today".to_string())]);

    let visuals =
        step6_visuals::suggest_visual_elements(&provider, "test-model", &draft, None, &store)
            .await
            .unwrap();

    assert!(visuals.is_empty());
    assert!(!store.dir().join("visual_suggestions.json").exists());
}
