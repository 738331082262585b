//! Data structures flowing through the generation pipeline

use serde::{Deserialize, Serialize};

use crate::config::UseCaseConfig;
use crate::job::StageRecord;

/// A research question produced by the question generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchQuery {
    /// Self-contained question, with enough context for independent processing
    pub question: String,
    /// Why this question was asked
    #[serde(default)]
    pub rationale: String,
}

/// A citation attached to a research result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relevance_score: Option<f64>,
}

/// Outcome of researching one query. Never mutated after creation; a query
/// that exhausts its retry budget yields a placeholder with `failed` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchResult {
    pub query: ResearchQuery,
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub failed: bool,
}

impl ResearchResult {
    /// Placeholder for a query whose research could not be completed
    pub fn failed(query: ResearchQuery) -> Self {
        Self {
            query,
            content: "Research unavailable due to a provider error. Please review manually."
                .to_string(),
            citations: Vec::new(),
            failed: true,
        }
    }
}

/// A substep within a use case step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubStep {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bullets: Vec<String>,
}

/// One expanded step of the use case document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseCaseStep {
    pub step_title: String,
    pub step_instructions: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_steps: Vec<SubStep>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advice: Option<String>,
}

/// Kind of documentation a resource link points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Tool,
    Language,
    Mode,
}

/// An official documentation link surfaced by refinement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub url: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

/// The evolving use case document. Created by the refiner, re-worded in place
/// by the polisher, read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftContent {
    pub title: String,
    pub time_to_complete: String,
    pub description: String,
    pub steps: Vec<UseCaseStep>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<Resource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<UseCaseConfig>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,
}

/// One demo step of the example solution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoStep {
    pub action: String,
    pub code_or_prompt: String,
}

/// A complete, demonstrable example solution for the use case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleSolution {
    pub title: String,
    /// Setup time in minutes
    pub setup_time: u32,
    /// Demo time in minutes (2-3 minute target)
    pub demo_time: u32,
    pub prerequisites: Vec<String>,
    pub scenario: String,
    pub steps: Vec<DemoStep>,
    pub validation: Vec<String>,
    pub key_points: Vec<String>,
    pub common_issues: Vec<String>,
    #[serde(default)]
    pub variations: Vec<String>,
    /// Narrative script for the 2-3 minute walkthrough
    pub demo_script: String,
}

/// Recommended format for a visual asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualFormat {
    Screenshot,
    Gif,
    Diagram,
    Video,
}

impl std::fmt::Display for VisualFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            VisualFormat::Screenshot => "screenshot",
            VisualFormat::Gif => "GIF",
            VisualFormat::Diagram => "diagram",
            VisualFormat::Video => "video",
        };
        f.write_str(name)
    }
}

/// One recommended visual asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualSuggestion {
    /// What to capture
    pub description: String,
    /// Tools, versions, settings required to produce it
    pub tooling: String,
    /// Why it helps the learner
    pub rationale: String,
    /// Step or concept it supports
    pub supports_step: String,
    pub format: VisualFormat,
}

/// Everything `finalize` assembles into the JSON and Markdown outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalDocument {
    pub config: UseCaseConfig,
    pub content: DraftContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example_solution: Option<ExampleSolution>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub visual_suggestions: Vec<VisualSuggestion>,
    /// Per-stage completion report so a reviewer knows which sections
    /// require manual authoring
    pub stage_report: Vec<StageRecord>,
}
