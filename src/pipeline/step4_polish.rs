//! Stage 4: Final polish
//!
//! One chat-provider request re-words the draft for reading level and voice.
//! Only prose changes are wanted; structure and technical content must
//! survive. That preservation is enforced by prompt instruction and cannot be
//! verified programmatically, so a polish response that fails to parse or
//! changes the step structure falls back to the refined draft and the stage
//! is recorded as degraded instead of failing the job.

use crate::error::Result;
use crate::job::{JobStore, Stage};
use crate::pipeline::extract_json;
use crate::pipeline::guidelines::{BRAND_LANGUAGE_GUIDELINES, USE_CASE_GUIDELINES};
use crate::pipeline::types::DraftContent;
use crate::provider::{ChatMessage, Provider};

const SYSTEM_PROMPT_HEADER: &str = "\
You are an AI writing assistant focused on improving prose clarity and \
readability while strictly preserving technical accuracy and meaning. You are \
given a valid JSON object describing a use case document.

CRITICAL PRESERVATION REQUIREMENTS:
1. Technical Fidelity:
   - Never alter technical specifications or requirements
   - Preserve all tool names, versions, and capabilities exactly
   - Keep all code snippets and technical steps intact

2. Structural Integrity:
   - Maintain exact step ordering and count
   - Keep all field names and JSON structure unchanged
   - Retain all technical prerequisites and requirements

PROSE IMPROVEMENT FOCUS:
   - Align with an 8th-grade reading level
   - Use active voice consistently
   - Address the reader as 'you'
   - Break down complex sentences without oversimplifying
   - Ensure clear transitions between steps

DO NOT:
   - Change technical requirements or specifications
   - Modify step ordering or dependencies
   - Remove or add technical content

Return valid JSON with the same structure; only prose and formatting changes \
are allowed.";

/// Polish the draft's prose. Returns the polished draft, or the original
/// draft unchanged when the polish output was unusable (`degraded` = true in
/// the second tuple slot).
pub async fn polish_draft(
    provider: &dyn Provider,
    model: &str,
    draft: &DraftContent,
    store: &JobStore,
) -> Result<(DraftContent, bool)> {
    let stage = Stage::Polish;
    if let Some(existing) = store.load_artifact::<DraftContent>(stage.artifact_name()) {
        tracing::info!("resuming from existing polished use case");
        return Ok((existing, false));
    }

    let system_prompt = format!(
        "{}\n\n{}\n\n{}",
        SYSTEM_PROMPT_HEADER, BRAND_LANGUAGE_GUIDELINES, USE_CASE_GUIDELINES
    );
    let draft_json =
        serde_json::to_string_pretty(draft).expect("draft content serializes");
    let messages = [
        ChatMessage::system(system_prompt),
        ChatMessage::user(format!(
            "Polish the prose and formatting of this use case while strictly \
             preserving all technical content, meaning, and configuration \
             details. Focus only on improving readability and clarity.\n\n{}",
            draft_json
        )),
    ];

    let completion = match provider.generate(&messages, model).await {
        Ok(completion) => completion,
        Err(err) => {
            tracing::warn!(error = %err, "polish request failed, keeping refined draft");
            store.log(&format!("polish failed, refined draft kept: {}", err));
            // The fallback is the stage artifact; a resume must not repeat
            // the request
            store.write_artifact(stage.artifact_name(), draft)?;
            return Ok((draft.clone(), true));
        }
    };
    store.write_raw(stage.artifact_name(), &completion.text)?;

    let body = extract_json(&completion.text);
    let polished = match serde_json::from_str::<DraftContent>(&body) {
        Ok(mut polished) if polished.steps.len() == draft.steps.len() => {
            // Fields the model must never alter come from the draft, which in
            // turn restored them from the configuration
            polished.title = draft.title.clone();
            polished.time_to_complete = draft.time_to_complete.clone();
            polished.metadata = draft.metadata.clone();
            polished.citations = draft.citations.clone();
            polished
        }
        Ok(polished) => {
            tracing::warn!(
                expected = draft.steps.len(),
                got = polished.steps.len(),
                "polish altered step structure, keeping refined draft"
            );
            store.log("polish altered step structure, refined draft kept");
            store.write_artifact(stage.artifact_name(), draft)?;
            return Ok((draft.clone(), true));
        }
        Err(err) => {
            tracing::warn!(error = %err, "polish output unparseable, keeping refined draft");
            store.log(&format!("polish output unparseable, refined draft kept: {}", err));
            store.write_artifact(stage.artifact_name(), draft)?;
            return Ok((draft.clone(), true));
        }
    };

    store.write_artifact(stage.artifact_name(), &polished)?;
    Ok((polished, false))
}
