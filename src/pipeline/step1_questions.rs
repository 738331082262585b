//! Stage 1: Research question generation
//!
//! A single reasoning-provider request turns the use case configuration into
//! 2-4 self-contained research questions. The raw response is persisted
//! before parsing so a parse failure never loses the call's output. If the
//! model returns too few questions the stage re-prompts exactly once before
//! failing; surplus questions are truncated to four.

use serde::Deserialize;

use crate::config::UseCaseConfig;
use crate::error::{PipelineError, Result};
use crate::job::{JobStore, Stage};
use crate::pipeline::extract_json;
use crate::pipeline::types::ResearchQuery;
use crate::provider::{ChatMessage, Provider};

pub const MIN_QUESTIONS: usize = 2;
pub const MAX_QUESTIONS: usize = 4;

const SYSTEM_PROMPT: &str = "\
You are an AI researcher tasked with generating research questions for a \
software development use case. Your questions will be processed independently \
by another AI system to gather comprehensive information.

CRITICAL REQUIREMENTS FOR QUESTION GENERATION:

1. CONTENT INTEGRATION:
   - Extract and incorporate key technical elements from the use case (tools, models, languages)
   - Include specific version numbers, frameworks, or technologies when mentioned
   - Reference any unique methodologies or approaches specified

2. QUESTION STRUCTURE:
   - Each question must be fully self-contained with sufficient context
   - Focus on distinct aspects or subtopics
   - Include relevant technical terms and industry standards

3. COVERAGE REQUIREMENTS:
   - At least one question must focus on tool-specific capabilities or features, if provided
   - At least one question must address best practices or common pitfalls
   - If specific models/versions are mentioned, include version-specific research

4. SCOPE AND SPECIFICITY:
   - Questions should be specific enough to yield actionable insights
   - Include temporal context (e.g. 'current best practices', 'latest features')
   - Reference any relevant prerequisites or dependencies

FORMAT REQUIREMENTS:
- Generate exactly 2-4 questions
- Respond with a JSON array, each element an object with a \"question\" field \
and a \"rationale\" field explaining why the question matters for this use case
- No prose outside the JSON array";

#[derive(Deserialize)]
struct QuestionEntry {
    question: String,
    #[serde(default)]
    rationale: String,
}

/// Generate 2-4 research queries from the configuration
pub async fn generate_research_questions(
    provider: &dyn Provider,
    model: &str,
    config: &UseCaseConfig,
    store: &JobStore,
) -> Result<Vec<ResearchQuery>> {
    let stage = Stage::Questions;
    if let Some(existing) = store.load_artifact::<Vec<ResearchQuery>>(stage.artifact_name()) {
        tracing::info!("resuming from existing research questions");
        return Ok(existing);
    }

    let mut messages = vec![
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "Generate research questions for this use case:\n\n{}",
            config.as_prompt_block()
        )),
    ];

    let completion = provider
        .generate(&messages, model)
        .await
        .map_err(|e| PipelineError::generation(stage, e.to_string()))?;
    store.write_raw(stage.artifact_name(), &completion.text)?;

    let mut questions = parse_questions(&completion.text);

    // One corrective re-prompt when the model came up short
    if questions.len() < MIN_QUESTIONS {
        tracing::warn!(
            count = questions.len(),
            "question count below minimum, re-prompting once"
        );
        messages.push(ChatMessage::assistant(completion.text.clone()));
        messages.push(ChatMessage::user(format!(
            "That response contained {} usable questions. Generate between {} \
             and {} distinct research questions as a JSON array of \
             {{\"question\", \"rationale\"}} objects, nothing else.",
            questions.len(),
            MIN_QUESTIONS,
            MAX_QUESTIONS
        )));

        let retry = provider
            .generate(&messages, model)
            .await
            .map_err(|e| PipelineError::generation(stage, e.to_string()))?;
        store.write_raw("research_questions_retry", &retry.text)?;
        questions = parse_questions(&retry.text);

        if questions.len() < MIN_QUESTIONS {
            return Err(PipelineError::generation(
                stage,
                format!(
                    "model returned {} research questions after re-prompt (need at least {})",
                    questions.len(),
                    MIN_QUESTIONS
                ),
            ));
        }
    }

    questions.truncate(MAX_QUESTIONS);
    store.write_artifact(stage.artifact_name(), &questions)?;
    Ok(questions)
}

/// Parse questions from a JSON array, with a line-per-question fallback for
/// models that ignore the format instruction
fn parse_questions(text: &str) -> Vec<ResearchQuery> {
    let body = extract_json(text);
    if let Ok(entries) = serde_json::from_str::<Vec<QuestionEntry>>(&body) {
        return entries
            .into_iter()
            .filter(|e| !e.question.trim().is_empty())
            .map(|e| ResearchQuery {
                question: e.question.trim().to_string(),
                rationale: e.rationale.trim().to_string(),
            })
            .collect();
    }

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && line.ends_with('?'))
        .map(|line| ResearchQuery {
            question: line.trim_start_matches(['-', '*', ' ']).to_string(),
            rationale: String::new(),
        })
        .collect()
}
