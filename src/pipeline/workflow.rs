//! Workflow orchestration for the generation pipeline
//!
//! Drives the job state machine across all six stages:
//! `Created -> QuestionsGenerated -> Researched -> Refined -> Polished ->
//! ExampleGenerated -> VisualsGenerated -> Finalized`, with `Failed(stage)`
//! reachable from any state on a fatal error. Question generation and
//! refinement failures are fatal; research, example, and visual failures
//! degrade gracefully and still advance the state machine. An overall job
//! timeout abandons in-flight requests and fails the current stage, leaving
//! partial artifacts in place for inspection.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::UseCaseConfig;
use crate::error::{PipelineError, Result};
use crate::job::{FinalOutputs, JobState, JobStore, Stage, StageRecord, StageStatus};
use crate::pipeline::types::FinalDocument;
use crate::pipeline::{
    step1_questions, step2_research, step3_refine, step4_polish, step5_example, step6_visuals,
};
use crate::provider::{Provider, RetryPolicy};

/// Model identifiers per capability
#[derive(Debug, Clone)]
pub struct Models {
    /// Reasoning model for question generation, refinement, and the example
    pub reasoning: String,
    /// Chat model for polish and visual suggestions
    pub chat: String,
    /// Search-augmented model for deep research
    pub research: String,
}

impl Default for Models {
    fn default() -> Self {
        Self {
            reasoning: "o3-mini-2025-01-31".to_string(),
            chat: "gpt-4o".to_string(),
            research: "sonar-pro".to_string(),
        }
    }
}

/// Provider handles for the two external capabilities
#[derive(Clone)]
pub struct Providers {
    /// Reasoning/chat provider
    pub reasoning: Arc<dyn Provider>,
    /// Search-augmented research provider
    pub research: Arc<dyn Provider>,
}

/// Options controlling one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Base directory for job directories
    pub work_dir: PathBuf,
    /// Concurrent research requests in stage 2
    pub concurrency: usize,
    /// Overall job deadline; `None` means no timeout
    pub timeout: Option<Duration>,
    pub models: Models,
    /// Retry budget for transient research errors
    pub retry: RetryPolicy,
    /// Existing job directory to resume instead of creating a fresh one
    pub resume: Option<PathBuf>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("partial_results"),
            concurrency: 4,
            timeout: None,
            models: Models::default(),
            retry: RetryPolicy::research(),
            resume: None,
        }
    }
}

/// Result of a completed (or partially completed) job
#[derive(Debug)]
pub struct JobOutcome {
    pub job_id: String,
    pub job_dir: PathBuf,
    pub state: JobState,
    pub stage_report: Vec<StageRecord>,
    pub outputs: FinalOutputs,
}

/// Run the complete pipeline for one validated use case submission.
///
/// The configuration must already be validated; no job directory is created
/// for an invalid submission.
pub async fn run_pipeline(
    config: UseCaseConfig,
    providers: Providers,
    options: PipelineOptions,
) -> Result<JobOutcome> {
    let store = match &options.resume {
        Some(dir) => JobStore::attach(dir)?,
        None => JobStore::create(&options.work_dir, &config)?,
    };
    let deadline = options.timeout.map(|t| Instant::now() + t);
    let mut report: Vec<StageRecord> = Vec::new();

    tracing::info!(job_id = store.job_id(), title = %config.title, "starting use case generation");

    // Stage 1: research questions (fatal)
    let questions = run_stage(Stage::Questions, deadline, async {
        step1_questions::generate_research_questions(
            providers.reasoning.as_ref(),
            &options.models.reasoning,
            &config,
            &store,
        )
        .await
    })
    .await
    .map_err(|e| fail(&store, Stage::Questions, e))?;
    record(&mut report, &store, Stage::Questions, StageStatus::Completed, None);
    store.set_state(JobState::QuestionsGenerated)?;
    tracing::info!(count = questions.len(), "research questions identified");

    // Stage 2: parallel research (degrades per query)
    let research = run_stage(Stage::Research, deadline, async {
        step2_research::execute_research(
            Arc::clone(&providers.research),
            &options.models.research,
            &config,
            &questions,
            &store,
            options.concurrency,
            options.retry,
        )
        .await
    })
    .await
    .map_err(|e| fail(&store, Stage::Research, e))?;
    let failed_queries = research.iter().filter(|r| r.failed).count();
    if failed_queries > 0 {
        record(
            &mut report,
            &store,
            Stage::Research,
            StageStatus::Degraded,
            Some(format!("{} of {} queries failed", failed_queries, research.len())),
        );
    } else {
        record(&mut report, &store, Stage::Research, StageStatus::Completed, None);
    }
    store.set_state(JobState::Researched)?;
    tracing::info!(
        total = research.len(),
        failed = failed_queries,
        "deep research completed"
    );

    // Stage 3: refinement (fatal, including the step-count integrity check)
    let draft = run_stage(Stage::Refine, deadline, async {
        step3_refine::refine_use_case(
            providers.reasoning.as_ref(),
            &options.models.reasoning,
            &config,
            &research,
            &store,
        )
        .await
    })
    .await
    .map_err(|e| fail(&store, Stage::Refine, e))?;
    record(&mut report, &store, Stage::Refine, StageStatus::Completed, None);
    store.set_state(JobState::Refined)?;

    // Stage 4: polish (best-effort, falls back to the refined draft)
    let (content, polish_degraded) = run_stage(Stage::Polish, deadline, async {
        step4_polish::polish_draft(
            providers.reasoning.as_ref(),
            &options.models.chat,
            &draft,
            &store,
        )
        .await
    })
    .await
    .map_err(|e| fail(&store, Stage::Polish, e))?;
    if polish_degraded {
        record(
            &mut report,
            &store,
            Stage::Polish,
            StageStatus::Degraded,
            Some("refined draft kept unpolished".to_string()),
        );
    } else {
        record(&mut report, &store, Stage::Polish, StageStatus::Completed, None);
    }
    store.set_state(JobState::Polished)?;

    // Stage 5: example solution (non-fatal)
    let example = run_stage(Stage::Example, deadline, async {
        step5_example::generate_example_solution(
            providers.reasoning.as_ref(),
            &options.models.reasoning,
            &config,
            &content,
            &store,
        )
        .await
    })
    .await
    .map_err(|e| fail(&store, Stage::Example, e))?;
    match &example {
        Some(_) => record(&mut report, &store, Stage::Example, StageStatus::Completed, None),
        None => record(
            &mut report,
            &store,
            Stage::Example,
            StageStatus::Missing,
            Some("example solution requires manual authoring".to_string()),
        ),
    }
    store.set_state(JobState::ExampleGenerated)?;

    // Stage 6: visual suggestions (non-fatal)
    let visuals = run_stage(Stage::Visuals, deadline, async {
        step6_visuals::suggest_visual_elements(
            providers.reasoning.as_ref(),
            &options.models.chat,
            &content,
            example.as_ref(),
            &store,
        )
        .await
    })
    .await
    .map_err(|e| fail(&store, Stage::Visuals, e))?;
    if visuals.is_empty() {
        record(
            &mut report,
            &store,
            Stage::Visuals,
            StageStatus::Missing,
            Some("visual suggestions require manual authoring".to_string()),
        );
    } else {
        record(&mut report, &store, Stage::Visuals, StageStatus::Completed, None);
    }
    store.set_state(JobState::VisualsGenerated)?;

    // Finalize: assemble the durable JSON and Markdown outputs
    let document = FinalDocument {
        config,
        content,
        example_solution: example,
        visual_suggestions: visuals,
        stage_report: report.clone(),
    };
    let outputs = store
        .finalize(&document)
        .map_err(|e| fail(&store, Stage::Finalize, e))?;
    store.set_state(JobState::Finalized)?;

    tracing::info!(
        json = %outputs.json_path.display(),
        markdown = %outputs.markdown_path.display(),
        "use case generation complete"
    );

    Ok(JobOutcome {
        job_id: store.job_id().to_string(),
        job_dir: store.dir().to_path_buf(),
        state: JobState::Finalized,
        stage_report: report,
        outputs,
    })
}

/// Run one stage under the remaining share of the overall job deadline
async fn run_stage<T, F>(stage: Stage, deadline: Option<Instant>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        None => fut.await,
        Some(deadline) => {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(PipelineError::Timeout(stage));
            }
            match tokio::time::timeout(remaining, fut).await {
                Ok(result) => result,
                // In-flight requests are dropped best-effort here
                Err(_) => Err(PipelineError::Timeout(stage)),
            }
        }
    }
}

/// Record a fatal failure in the state machine and hand the error back
fn fail(store: &JobStore, stage: Stage, error: PipelineError) -> PipelineError {
    store.log(&format!("stage '{}' failed: {}", stage, error));
    if let Err(e) = store.set_state(JobState::Failed(stage)) {
        tracing::error!(error = %e, "failed to record failure state");
    }
    error
}

fn record(
    report: &mut Vec<StageRecord>,
    store: &JobStore,
    stage: Stage,
    status: StageStatus,
    detail: Option<String>,
) {
    store.log(&format!(
        "stage '{}' {}",
        stage,
        match status {
            StageStatus::Completed => "completed".to_string(),
            StageStatus::Degraded => format!("degraded ({})", detail.as_deref().unwrap_or("")),
            StageStatus::Missing => "missing".to_string(),
        }
    ));
    report.push(StageRecord { stage, status, detail });
}
