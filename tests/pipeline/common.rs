//! Shared fixtures and scripted providers for pipeline tests

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use use_case_generator::config::{RawUseCaseConfig, UseCaseConfig};
use use_case_generator::pipeline::types::{
    DemoStep, DraftContent, ExampleSolution, SubStep, UseCaseStep,
};
use use_case_generator::provider::{ChatMessage, Completion, Provider, ProviderError, RetryPolicy};

/// A scripted provider response
pub enum Scripted {
    Ok(String),
    Transient(String),
    Fatal(String),
}

/// Provider that replays a fixed script of responses in call order
pub struct MockProvider {
    responses: Mutex<VecDeque<Scripted>>,
    calls: AtomicUsize,
    /// Returned once the script is exhausted; `None` makes exhaustion a
    /// fatal error
    fallback: Option<String>,
}

impl MockProvider {
    pub fn new(responses: Vec<Scripted>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            fallback: None,
        }
    }

    pub fn with_fallback(responses: Vec<Scripted>, fallback: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
            fallback: Some(fallback.into()),
        }
    }

    /// Provider that answers every call with the same text
    pub fn constant(text: impl Into<String>) -> Self {
        Self::with_fallback(Vec::new(), text)
    }

    /// Provider whose every call fails with a transient error
    pub fn always_transient() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            fallback: None,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn generate(
        &self,
        _messages: &[ChatMessage],
        _model: &str,
    ) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.responses.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Ok(text)) => Ok(Completion {
                text,
                citations: Vec::new(),
            }),
            Some(Scripted::Transient(message)) => Err(ProviderError::Transient(message)),
            Some(Scripted::Fatal(message)) => Err(ProviderError::Fatal(message)),
            None => match &self.fallback {
                Some(text) => Ok(Completion {
                    text: text.clone(),
                    citations: Vec::new(),
                }),
                None => Err(ProviderError::Transient("script exhausted".to_string())),
            },
        }
    }
}

/// Provider that sleeps a scripted delay per call and echoes the last user
/// message, for asserting that completion order never reorders results
pub struct EchoProvider {
    delays: Mutex<VecDeque<Duration>>,
}

impl EchoProvider {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self {
            delays: Mutex::new(delays.into()),
        }
    }
}

#[async_trait]
impl Provider for EchoProvider {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        _model: &str,
    ) -> Result<Completion, ProviderError> {
        let delay = self.delays.lock().unwrap().pop_front().unwrap_or_default();
        tokio::time::sleep(delay).await;
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(Completion {
            text: format!("echo: {}", last),
            citations: Vec::new(),
        })
    }
}

/// Retry policy with millisecond backoff, so failure paths stay fast in tests
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        min_wait: Duration::from_millis(1),
        max_wait: Duration::from_millis(5),
    }
}

/// A valid two-step submission (Scenario A shape)
pub fn sample_raw() -> RawUseCaseConfig {
    serde_json::from_value(json!({
        "title": "Craft effective prompts",
        "family": "Core Skills",
        "ai_tool": "Coding Assistants",
        "objective": "Communicate programming intent to an AI assistant",
        "description": "Trains developers to write precise prompts.",
        "prerequisites": "Writing clear code comments, Basic algorithmic thinking",
        "time_estimate": "20 minutes",
        "steps": "Open the tool, Write a prompt"
    }))
    .expect("sample submission deserializes")
}

pub fn sample_config() -> UseCaseConfig {
    sample_raw().validate().expect("sample submission is valid")
}

/// A valid submission with the given steps
pub fn config_with_steps(steps: &[&str]) -> UseCaseConfig {
    let mut raw = sample_raw();
    raw.steps = Some(use_case_generator::config::StringOrList::List(
        steps.iter().map(|s| s.to_string()).collect(),
    ));
    raw.validate().expect("submission is valid")
}

/// Build a structurally valid draft whose steps mirror the config
pub fn draft_for(config: &UseCaseConfig) -> DraftContent {
    DraftContent {
        title: config.title.clone(),
        time_to_complete: config.time_estimate.clone(),
        description: "A short description of the use case.".to_string(),
        steps: config
            .steps
            .iter()
            .map(|step| UseCaseStep {
                step_title: step.clone(),
                step_instructions: format!("How to {}.", step.to_lowercase()),
                sub_steps: vec![SubStep {
                    title: "Get ready".to_string(),
                    description: Some("Open your editor.".to_string()),
                    bullets: vec!["Check your setup".to_string()],
                }],
                advice: None,
            })
            .collect(),
        resources: Vec::new(),
        metadata: None,
        citations: Vec::new(),
    }
}

pub fn draft_json(config: &UseCaseConfig) -> String {
    serde_json::to_string_pretty(&draft_for(config)).unwrap()
}

/// A draft with a step count that does not match the config (Scenario D)
pub fn mismatched_draft_json(config: &UseCaseConfig, steps: usize) -> String {
    let mut draft = draft_for(config);
    draft.steps.truncate(steps);
    while draft.steps.len() < steps {
        draft.steps.push(UseCaseStep {
            step_title: format!("Extra step {}", draft.steps.len() + 1),
            step_instructions: "Invented by the model.".to_string(),
            sub_steps: Vec::new(),
            advice: None,
        });
    }
    serde_json::to_string_pretty(&draft).unwrap()
}

pub fn example_for(config: &UseCaseConfig) -> ExampleSolution {
    ExampleSolution {
        title: "Demo".to_string(),
        setup_time: 5,
        demo_time: 3,
        prerequisites: vec!["An editor".to_string()],
        scenario: "A developer wants AI help.".to_string(),
        steps: config
            .steps
            .iter()
            .map(|step| DemoStep {
                action: step.clone(),
                code_or_prompt: format!("# {}", step),
            })
            .collect(),
        validation: vec!["Output compiles".to_string()],
        key_points: vec!["Be specific".to_string()],
        common_issues: vec!["Vague prompts".to_string()],
        variations: Vec::new(),
        demo_script: "Walk through each step on camera.".to_string(),
    }
}

pub fn example_json(config: &UseCaseConfig) -> String {
    serde_json::to_string_pretty(&example_for(config)).unwrap()
}

pub fn questions_json(count: usize) -> String {
    let entries: Vec<_> = (0..count)
        .map(|i| {
            json!({
                "question": format!("What are current best practices for topic {}?", i + 1),
                "rationale": "Covers the tool-specific angle"
            })
        })
        .collect();
    serde_json::to_string(&entries).unwrap()
}

pub fn visuals_json() -> String {
    json!([
        {
            "description": "Screenshot of the prompt box",
            "tooling": "Any browser",
            "rationale": "Shows learners where to type",
            "supports_step": "Open the tool",
            "format": "screenshot"
        },
        {
            "description": "GIF of the completion appearing",
            "tooling": "Screen recorder",
            "rationale": "Shows the feedback loop",
            "supports_step": "Write a prompt",
            "format": "gif"
        },
        {
            "description": "Diagram of the prompt-response cycle",
            "tooling": "Any diagramming tool",
            "rationale": "Explains the mental model",
            "supports_step": "Write a prompt",
            "format": "diagram"
        }
    ])
    .to_string()
}

/// The single job directory created under a work dir
pub fn only_job_dir(work_dir: &Path) -> PathBuf {
    let mut dirs: Vec<_> = std::fs::read_dir(work_dir)
        .expect("work dir exists")
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .map(|e| e.path())
        .collect();
    assert_eq!(dirs.len(), 1, "expected exactly one job directory");
    dirs.pop().unwrap()
}
