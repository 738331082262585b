//! Stage 6: Visual element suggestions
//!
//! Proposes 3-5 illustrative assets (screenshots, GIFs, diagrams, video) for
//! the document, at least one per major step. Non-fatal: the job continues
//! without visuals if the request or parse fails.

use crate::error::Result;
use crate::job::{JobStore, Stage};
use crate::pipeline::extract_json;
use crate::pipeline::types::{DraftContent, ExampleSolution, VisualSuggestion};
use crate::provider::{ChatMessage, Provider};

const SYSTEM_PROMPT: &str = "\
You are an instructional designer creating visual element suggestions for a \
software development use case. Your goal is to propose specific visual aids \
that enhance understanding while maintaining technical accuracy.

VISUAL ELEMENT GUIDELINES:
1. Tool-Specific Visualization:
   - Focus on interface elements unique to the specified tools
   - Capture version-specific features when relevant
   - Show actual tool interactions and outputs

2. Technical Accuracy:
   - All code snippets must match the specified language and versions
   - Screenshots should reflect current tool interfaces
   - Diagrams must align with documented workflows

3. Educational Value:
   - Each visual must serve a clear learning purpose
   - Key steps should have supporting visuals, with at least one suggestion per major step

Respond with a JSON array of 3-5 objects, each with these fields:
  \"description\": what to capture,
  \"tooling\": technical requirements (tools, versions, settings),
  \"rationale\": the educational value,
  \"supports_step\": the step or concept it supports,
  \"format\": one of \"screenshot\", \"gif\", \"diagram\", \"video\"
No prose outside the JSON array.";

/// Suggest visual assets for the document. An empty vec means the stage
/// degraded and the document ships without visuals.
pub async fn suggest_visual_elements(
    provider: &dyn Provider,
    model: &str,
    draft: &DraftContent,
    example: Option<&ExampleSolution>,
    store: &JobStore,
) -> Result<Vec<VisualSuggestion>> {
    let stage = Stage::Visuals;
    if let Some(existing) = store.load_artifact::<Vec<VisualSuggestion>>(stage.artifact_name()) {
        tracing::info!("resuming from existing visual suggestions");
        return Ok(existing);
    }

    let mut user_prompt = format!(
        "Review the use case to suggest visual elements that enhance learning \
         and comprehension. Focus particularly on visualizing tool-specific \
         interactions and technical concepts.\n\nFinal use case JSON:\n{}",
        serde_json::to_string_pretty(draft).expect("draft content serializes")
    );
    if let Some(example) = example {
        user_prompt.push_str(&format!(
            "\n\nExample solution JSON:\n{}",
            serde_json::to_string_pretty(example).expect("example solution serializes")
        ));
    }

    let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_prompt)];

    let completion = match provider.generate(&messages, model).await {
        Ok(completion) => completion,
        Err(err) => {
            tracing::warn!(error = %err, "visual suggestions request failed, continuing without them");
            store.log(&format!("visual suggestions omitted: {}", err));
            return Ok(Vec::new());
        }
    };
    store.write_raw(stage.artifact_name(), &completion.text)?;

    let suggestions = match serde_json::from_str::<Vec<VisualSuggestion>>(&extract_json(
        &completion.text,
    )) {
        Ok(suggestions) => suggestions,
        Err(err) => {
            tracing::warn!(error = %err, "visual suggestions unparseable, continuing without them");
            store.log(&format!("visual suggestions omitted: {}", err));
            return Ok(Vec::new());
        }
    };

    store.write_artifact(stage.artifact_name(), &suggestions)?;
    Ok(suggestions)
}
