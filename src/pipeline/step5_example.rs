//! Stage 5: Example solution generation
//!
//! Produces a concrete, demonstrable solution whose demo steps mirror the use
//! case's steps, plus a 2-3 minute narrative script. Non-fatal: if the model
//! output cannot be parsed after one repair attempt, the stage records the
//! omission and the job continues without an example.

use crate::config::UseCaseConfig;
use crate::error::Result;
use crate::job::{JobStore, Stage};
use crate::pipeline::extract_json;
use crate::pipeline::guidelines::BRAND_LANGUAGE_GUIDELINES;
use crate::pipeline::types::{DraftContent, ExampleSolution};
use crate::provider::{ChatMessage, Provider};

/// Generate the example solution. `None` means the stage degraded and the
/// document ships without a demo.
pub async fn generate_example_solution(
    provider: &dyn Provider,
    model: &str,
    config: &UseCaseConfig,
    draft: &DraftContent,
    store: &JobStore,
) -> Result<Option<ExampleSolution>> {
    let stage = Stage::Example;
    if let Some(existing) = store.load_artifact::<ExampleSolution>(stage.artifact_name()) {
        tracing::info!("resuming from existing example solution");
        return Ok(Some(existing));
    }

    let step_titles: Vec<&str> = draft.steps.iter().map(|s| s.step_title.as_str()).collect();
    let system_prompt = build_system_prompt(config, &step_titles);
    let user_prompt = format!(
        "Generate a complete example solution that rigorously follows the \
         configuration specifications.\n\nUSE CASE CONTENT:\n{}\n\n\
         SCHEMA REQUIREMENTS:\n\
         - Return valid JSON only, matching the schema in the system prompt\n\
         - Each step needs both 'action' and 'code_or_prompt' fields\n\
         - Demo steps must align one-to-one with the use case steps\n\
         - The demo script must be a clear 2-3 minute technical walkthrough",
        serde_json::to_string_pretty(draft).expect("draft content serializes")
    );

    let mut messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(user_prompt),
    ];

    let completion = match provider.generate(&messages, model).await {
        Ok(completion) => completion,
        Err(err) => {
            tracing::warn!(error = %err, "example solution request failed, continuing without one");
            store.log(&format!("example solution omitted: {}", err));
            return Ok(None);
        }
    };
    store.write_raw(stage.artifact_name(), &completion.text)?;

    let parsed = parse_solution(&completion.text);
    let solution = match parsed {
        Ok(solution) => solution,
        Err(parse_err) => {
            // One repair attempt: show the model its own output and the error
            tracing::warn!(error = %parse_err, "example solution unparseable, attempting repair");
            messages.push(ChatMessage::assistant(completion.text.clone()));
            messages.push(ChatMessage::user(format!(
                "That response could not be parsed into the required structure \
                 ({}). Return the same solution as valid JSON matching the \
                 schema exactly, with no prose outside the JSON object.",
                parse_err
            )));

            let repair = match provider.generate(&messages, model).await {
                Ok(repair) => repair,
                Err(err) => {
                    store.log(&format!("example solution omitted after repair failure: {}", err));
                    return Ok(None);
                }
            };
            store.write_raw("example_solution_repair", &repair.text)?;

            match parse_solution(&repair.text) {
                Ok(solution) => solution,
                Err(err) => {
                    tracing::warn!(error = %err, "example solution repair failed, continuing without one");
                    store.log(&format!("example solution omitted: {}", err));
                    return Ok(None);
                }
            }
        }
    };

    if solution.steps.len() != draft.steps.len() {
        tracing::warn!(
            expected = draft.steps.len(),
            got = solution.steps.len(),
            "example solution step count does not mirror the use case"
        );
        store.log(&format!(
            "example solution has {} demo steps, use case has {}",
            solution.steps.len(),
            draft.steps.len()
        ));
    }

    store.write_artifact(stage.artifact_name(), &solution)?;
    Ok(Some(solution))
}

fn parse_solution(text: &str) -> std::result::Result<ExampleSolution, serde_json::Error> {
    serde_json::from_str(&extract_json(text))
}

fn build_system_prompt(config: &UseCaseConfig, step_titles: &[&str]) -> String {
    let is_generic =
        config.coding_language.is_none() || config.role.is_empty() || config.mode.is_none();
    let specificity = if is_generic {
        "- Provide tool/language agnostic examples with clear alternatives"
    } else {
        "- Use the specified tool and language exclusively"
    };
    let steps_json =
        serde_json::to_string_pretty(step_titles).expect("step titles serialize");

    format!(
        "You are an expert AI instructor creating a practical example solution \
         for a software development use case. The solution will be \
         demonstrated in a 2-3 minute video by a subject matter expert.\n\n\
         CRITICAL CONFIGURATION DETAILS:\n\
         - Title: {title}\n\
         - Family: {family}\n\
         - Tool: {tool}\n\
         - Language: {language}\n\
         - Mode: {mode}\n\
         - Model: {model}\n\n\
         SOLUTION REQUIREMENTS:\n\n\
         1. TECHNICAL PRECISION:\n\
            - Use exact tool versions and models specified in the configuration\n\
            - Include all necessary setup and prerequisites\n\n\
         2. TIME AND SCOPE MANAGEMENT:\n\
            - The solution must be demonstrable in 2-3 minutes\n\
            - Setup time should be realistic and clearly stated\n\n\
         3. TOOL AND MODEL SPECIFICITY:\n\
            {specificity}\n\
            - Leverage unique features of the configured tools and models\n\n\
         4. VALIDATION AND QUALITY:\n\
            - Include explicit validation steps\n\
            - Address common pitfalls specific to the chosen tools\n\n\
         5. STEP ALIGNMENT:\n\
            - Each demo step must map directly, in order, to these use case steps:\n{steps}\n\
            - Where a step implies a tool invocation, include the literal prompt or code to use\n\n\
         OUTPUT SCHEMA (return valid JSON only):\n\
         {{\n\
           \"title\": \"string\",\n\
           \"setup_time\": minutes (integer),\n\
           \"demo_time\": minutes (integer),\n\
           \"prerequisites\": [\"strings\"],\n\
           \"scenario\": \"a real-world context for the example\",\n\
           \"steps\": [{{\"action\": \"string\", \"code_or_prompt\": \"string\"}}],\n\
           \"validation\": [\"how to verify the solution works\"],\n\
           \"key_points\": [\"teaching points to emphasize\"],\n\
           \"common_issues\": [\"potential problems to watch for\"],\n\
           \"variations\": [\"optional variations, may be empty\"],\n\
           \"demo_script\": \"natural-language script for the 2-3 minute demo\"\n\
         }}\n\n\
         BRAND GUIDELINES:\n{brand}",
        title = config.title,
        family = config.family,
        tool = config.ai_tool,
        language = config.coding_language.as_deref().unwrap_or("Any"),
        mode = config.mode.as_deref().unwrap_or("Any"),
        model = config.model.as_deref().unwrap_or("Not specified"),
        specificity = specificity,
        steps = steps_json,
        brand = BRAND_LANGUAGE_GUIDELINES,
    )
}
