//! Stage 2: Parallel deep research
//!
//! Fans one request per research query out to the search-augmented provider
//! and fans back in before the pipeline proceeds. Each task writes into its
//! own indexed slot, so completion order never reorders the output sequence.
//! A query that exhausts its retry budget yields a failed placeholder instead
//! of aborting the stage; downstream stages tolerate partial coverage.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::config::UseCaseConfig;
use crate::error::Result;
use crate::job::{JobStore, Stage};
use crate::pipeline::types::{Citation, ResearchQuery, ResearchResult};
use crate::provider::{generate_with_retries, ChatMessage, Provider, ProviderError, RetryPolicy};

const SYSTEM_PROMPT: &str = "\
You are a specialized AI researcher providing comprehensive information for \
educational content creation. Your responses should be thorough, \
well-structured, and include relevant technical details, best practices, and \
real-world examples.";

/// Research every query concurrently, preserving input order in the output
pub async fn execute_research(
    provider: Arc<dyn Provider>,
    model: &str,
    config: &UseCaseConfig,
    queries: &[ResearchQuery],
    store: &JobStore,
    concurrency: usize,
    retry: RetryPolicy,
) -> Result<Vec<ResearchResult>> {
    let stage = Stage::Research;
    if let Some(existing) = store.load_artifact::<Vec<ResearchResult>>(stage.artifact_name()) {
        tracing::info!("resuming from existing research results");
        return Ok(existing);
    }

    let context_prefix = format!(
        "I'm researching for a use case titled '{}' in the category '{}'. \
         The objective is: '{}'. This is for creating developer educational \
         content about AI skills.",
        config.title, config.family, config.objective
    );

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = FuturesUnordered::new();

    for (index, query) in queries.iter().enumerate() {
        let provider = Arc::clone(&provider);
        let semaphore = Arc::clone(&semaphore);
        let query = query.clone();
        let model = model.to_string();
        let context_prefix = context_prefix.clone();

        tasks.push(async move {
            let outcome = match semaphore.acquire().await {
                Ok(_permit) => {
                    research_query(provider.as_ref(), &model, &context_prefix, &query, retry)
                        .await
                }
                Err(e) => Err(ProviderError::Fatal(format!(
                    "research concurrency limiter closed: {}",
                    e
                ))),
            };
            (index, query, outcome)
        });
    }

    // Each task owns one slot; order is restored here regardless of which
    // request finished first.
    let mut slots: Vec<Option<ResearchResult>> = (0..queries.len()).map(|_| None).collect();
    while let Some((index, query, outcome)) = tasks.next().await {
        let result = match outcome {
            Ok(result) => {
                store.write_raw(&format!("research_{}", index + 1), &result.content)?;
                result
            }
            Err(err) => {
                tracing::warn!(index, error = %err, "research query failed after retries");
                store.log(&format!(
                    "research query {} failed after retries: {}",
                    index + 1,
                    err
                ));
                ResearchResult::failed(query)
            }
        };
        slots[index] = Some(result);
    }

    let results: Vec<ResearchResult> = slots
        .into_iter()
        .map(|slot| slot.expect("every research slot filled"))
        .collect();

    store.write_artifact(stage.artifact_name(), &results)?;
    Ok(results)
}

async fn research_query(
    provider: &dyn Provider,
    model: &str,
    context_prefix: &str,
    query: &ResearchQuery,
    retry: RetryPolicy,
) -> std::result::Result<ResearchResult, ProviderError> {
    let user_prompt = format!(
        "{}\n\nPlease research and provide comprehensive information \
         addressing this question:\n- {}\n\nFormat your response to be \
         directly usable in educational materials about AI technologies and \
         software development practices. Include specific examples, code \
         samples when relevant, and cite recent sources.",
        context_prefix, query.question
    );
    let messages = [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(user_prompt),
    ];

    let completion = generate_with_retries(provider, &messages, model, retry).await?;

    let citations = completion
        .citations
        .into_iter()
        .map(|url| Citation {
            url,
            title: None,
            snippet: None,
            relevance_score: None,
        })
        .collect();

    Ok(ResearchResult {
        query: query.clone(),
        content: completion.text.trim().to_string(),
        citations,
        failed: false,
    })
}
