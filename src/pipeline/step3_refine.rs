//! Stage 3: Content refinement
//!
//! One reasoning-provider request merges the research findings into the
//! original use case design, producing a structured [`DraftContent`]. The
//! original configuration is never entrusted to the model: metadata is
//! reattached programmatically and title, family, and time estimate are
//! restored verbatim. A step-count mismatch against the configuration is a
//! hard `ContentIntegrityError`, never silently corrected. Research citations
//! are carried over programmatically; the same request assigns them titles,
//! snippets, and relevance scores.

use crate::config::UseCaseConfig;
use crate::error::{PipelineError, Result};
use crate::job::{JobStore, Stage};
use crate::pipeline::extract_json;
use crate::pipeline::guidelines::{BRAND_LANGUAGE_GUIDELINES, USE_CASE_GUIDELINES};
use crate::pipeline::types::{Citation, DraftContent, ResearchResult};
use crate::provider::{ChatMessage, Provider};

const SCHEMA_DESCRIPTION: &str = r#"{
  "title": "string",
  "time_to_complete": "string, e.g. '20 minutes'",
  "description": "2-3 sentences describing the primary objective",
  "steps": [
    {
      "step_title": "string",
      "step_instructions": "1-3 sentences of concise instructions",
      "sub_steps": [
        {"title": "string", "description": "optional string", "bullets": ["optional strings"]}
      ],
      "advice": "optional best practices or cautionary notes"
    }
  ],
  "resources": [
    {"url": "string", "title": "string", "type": "tool | language | mode", "section": "optional string"}
  ],
  "citations": [
    {"url": "string, one of the provided source URLs", "title": "human-readable page title", "snippet": "optional one-sentence summary", "relevance_score": "number between 0.0 and 1.0"}
  ]
}"#;

/// Merge research into the use case design, producing the structured draft
pub async fn refine_use_case(
    provider: &dyn Provider,
    model: &str,
    config: &UseCaseConfig,
    research: &[ResearchResult],
    store: &JobStore,
) -> Result<DraftContent> {
    let stage = Stage::Refine;
    if let Some(existing) = store.load_artifact::<DraftContent>(stage.artifact_name()) {
        tracing::info!("resuming from existing refined draft");
        return Ok(existing);
    }

    let system_prompt = format!(
        "You are an AI assistant tasked with creating a comprehensive, \
         structured use case by merging research findings with the original \
         use case design. The output must be valid JSON following the schema \
         below.\n\n\
         CRITICAL INTEGRATION REQUIREMENTS:\n\n\
         1. TECHNICAL ACCURACY:\n\
            - Preserve all specific tool versions, models, and technical details from the original config\n\
            - Maintain accuracy of any programming languages, frameworks, or platforms specified\n\
            - Ensure all technical prerequisites and dependencies are correctly represented\n\n\
         2. CONFIGURATION FIDELITY:\n\
            - Never alter the title, family, or time estimate\n\
            - Expand each original step one-to-one: the output must contain exactly one step per original step, in the same order, with no steps dropped or merged\n\
            - Maintain alignment with specified roles and departments\n\n\
         3. RESEARCH INTEGRATION:\n\
            - Incorporate relevant research findings while preserving config-specified constraints\n\
            - Treat any research marked as unavailable as a gap, not as license to invent facts\n\
            - Ensure best practices are compatible with the configured environment\n\n\
         4. CONTENT STRUCTURE:\n\
            - Each step must directly relate to the configured tools and environment\n\
            - Examples and code snippets must match the specified language and tool versions\n\
            - Include 2-4 official documentation links in resources, classified as tool, language, or mode documentation\n\n\
         OUTPUT SCHEMA:\n{}\n\n{}\n\n{}",
        SCHEMA_DESCRIPTION, BRAND_LANGUAGE_GUIDELINES, USE_CASE_GUIDELINES
    );

    let findings = research
        .iter()
        .enumerate()
        .map(|(i, r)| {
            if r.failed {
                format!(
                    "## Research {}: {}\n(unavailable: {})",
                    i + 1,
                    r.query.question,
                    r.content
                )
            } else {
                format!("## Research {}: {}\n{}", i + 1, r.query.question, r.content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    let carried = collect_citations(research);
    let sources_block = if carried.is_empty() {
        String::new()
    } else {
        format!(
            "\n\nRESEARCH SOURCES:\n{}\n\nFor each source URL above, include \
             one entry in the \"citations\" array with a human-readable title, \
             an optional one-sentence snippet of what the source covers, and a \
             relevance_score between 0.0 and 1.0 for this use case. Never \
             invent URLs that are not in the list.",
            carried
                .iter()
                .map(|c| format!("- {}", c.url))
                .collect::<Vec<_>>()
                .join("\n")
        )
    };

    let messages = [
        ChatMessage::system(system_prompt),
        ChatMessage::assistant(format!("Research Findings:\n{}", findings)),
        ChatMessage::user(format!(
            "Please combine the research findings with this use case design to \
             create an end-to-end, structured use case. The use case must \
             preserve all critical configuration details while incorporating \
             relevant research insights. Return valid JSON only.\n\n{}{}",
            config.as_prompt_block(),
            sources_block
        )),
    ];

    let completion = provider
        .generate(&messages, model)
        .await
        .map_err(|e| PipelineError::generation(stage, e.to_string()))?;
    store.write_raw(stage.artifact_name(), &completion.text)?;

    let body = extract_json(&completion.text);
    let mut draft: DraftContent = serde_json::from_str(&body).map_err(|e| {
        PipelineError::generation(stage, format!("refined draft is not valid JSON: {}", e))
    })?;

    // One-to-one step expansion is a hard invariant of refinement
    if draft.steps.len() != config.steps.len() {
        return Err(PipelineError::ContentIntegrity(format!(
            "refined draft has {} steps but the configuration specifies {}",
            draft.steps.len(),
            config.steps.len()
        )));
    }

    // Config fields the model must never alter are restored from the source
    // of truth rather than checked
    draft.title = config.title.clone();
    draft.time_to_complete = config.time_estimate.clone();
    draft.metadata = Some(config.clone());
    let scored = std::mem::take(&mut draft.citations);
    draft.citations = enrich_citations(carried, &scored);

    store.write_artifact(stage.artifact_name(), &draft)?;
    Ok(draft)
}

/// Carry research citations into the draft, deduplicated by URL with first
/// occurrence winning so ordering stays stable
fn collect_citations(research: &[ResearchResult]) -> Vec<Citation> {
    let mut seen = std::collections::HashSet::new();
    research
        .iter()
        .flat_map(|r| r.citations.iter())
        .filter(|c| seen.insert(c.url.clone()))
        .cloned()
        .collect()
}

/// Attach the titles, snippets, and relevance scores the model assigned to
/// the carried citations. URLs the model invented are dropped; carried order
/// is kept, and a citation the model skipped stays unscored.
fn enrich_citations(carried: Vec<Citation>, scored: &[Citation]) -> Vec<Citation> {
    carried
        .into_iter()
        .map(|mut citation| {
            if let Some(meta) = scored.iter().find(|s| s.url == citation.url) {
                citation.title = meta.title.clone().filter(|t| !t.trim().is_empty());
                citation.snippet = meta.snippet.clone();
                citation.relevance_score = meta.relevance_score;
            }
            citation
        })
        .collect()
}
