//! Six-stage use case generation pipeline
//!
//! Research question generation, parallel deep research, content refinement,
//! final polish, example solution generation, and visual element suggestion.
//! [`workflow::run_pipeline`] is the entry point and drives the state machine
//! across all stages.

pub mod guidelines;
pub mod step1_questions;
pub mod step2_research;
pub mod step3_refine;
pub mod step4_polish;
pub mod step5_example;
pub mod step6_visuals;
pub mod types;
pub mod workflow;

pub use types::{
    Citation, DemoStep, DraftContent, ExampleSolution, FinalDocument, ResearchQuery,
    ResearchResult, Resource, ResourceKind, SubStep, UseCaseStep, VisualFormat, VisualSuggestion,
};
pub use workflow::{run_pipeline, JobOutcome, Models, PipelineOptions, Providers};

/// Extract JSON content from markdown code fences.
///
/// Models wrap structured output in ```json fences more often than not; when
/// no fence is present the raw text is returned trimmed.
pub fn extract_json(text: &str) -> String {
    let inner = if let Some(start) = text.find("```json") {
        let start = start + 7;
        let end = text[start..].rfind("```").map(|p| p + start).unwrap_or(text.len());
        &text[start..end]
    } else if let Some(start) = text.find("```") {
        let start = start + 3;
        let end = text[start..].rfind("```").map(|p| p + start).unwrap_or(text.len());
        &text[start..end]
    } else {
        text
    };
    inner.trim().to_string()
}
