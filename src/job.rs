//! Job store: per-job artifact directory, state tracking, execution log
//!
//! Every run of the pipeline gets a fresh timestamped directory under the
//! work dir. The store is the sole writer to that directory for the life of
//! the job: each stage persists its raw model response before parsing and its
//! parsed artifact after, so a crash mid-pipeline leaves forensic evidence of
//! the last completed stage. `finalize` assembles the durable JSON and
//! Markdown outputs and is idempotent under re-invocation.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::UseCaseConfig;
use crate::error::{PipelineError, Result};
use crate::pipeline::types::FinalDocument;
use crate::render;

/// One step of the generation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Questions,
    Research,
    Refine,
    Polish,
    Example,
    Visuals,
    Finalize,
}

impl Stage {
    /// Artifact base name for this stage, matching the files written to the
    /// job directory
    pub fn artifact_name(&self) -> &'static str {
        match self {
            Stage::Questions => "research_questions",
            Stage::Research => "deep_research",
            Stage::Refine => "refined_draft",
            Stage::Polish => "final_use_case",
            Stage::Example => "example_solution",
            Stage::Visuals => "visual_suggestions",
            Stage::Finalize => "use_case",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Questions => "questions",
            Stage::Research => "research",
            Stage::Refine => "refine",
            Stage::Polish => "polish",
            Stage::Example => "example",
            Stage::Visuals => "visuals",
            Stage::Finalize => "finalize",
        };
        f.write_str(name)
    }
}

/// Orchestration state machine for a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Created,
    QuestionsGenerated,
    Researched,
    Refined,
    Polished,
    ExampleGenerated,
    VisualsGenerated,
    Finalized,
    Failed(Stage),
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobState::Created => f.write_str("Created"),
            JobState::QuestionsGenerated => f.write_str("QuestionsGenerated"),
            JobState::Researched => f.write_str("Researched"),
            JobState::Refined => f.write_str("Refined"),
            JobState::Polished => f.write_str("Polished"),
            JobState::ExampleGenerated => f.write_str("ExampleGenerated"),
            JobState::VisualsGenerated => f.write_str("VisualsGenerated"),
            JobState::Finalized => f.write_str("Finalized"),
            JobState::Failed(stage) => write!(f, "Failed({})", stage),
        }
    }
}

/// Outcome of one stage, recorded in the final document so a reviewer knows
/// which sections need manual authoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Completed,
    /// Stage produced degraded or partial output but the job continued
    Degraded,
    /// Stage output is missing entirely
    Missing,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StageStatus::Completed => "completed",
            StageStatus::Degraded => "degraded",
            StageStatus::Missing => "missing",
        };
        f.write_str(name)
    }
}

/// Per-stage completion record, in pipeline order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Job metadata persisted as `job.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetadata {
    pub job_id: String,
    pub created_at: String,
    pub title: String,
    pub state: JobState,
}

/// Final output paths produced by [`JobStore::finalize`]
#[derive(Debug, Clone)]
pub struct FinalOutputs {
    pub json_path: PathBuf,
    pub markdown_path: PathBuf,
}

/// Owns the job directory and all writes into it
#[derive(Debug)]
pub struct JobStore {
    job_id: String,
    dir: PathBuf,
}

impl JobStore {
    /// Allocate a fresh timestamped job directory under `work_dir`.
    ///
    /// The identifier combines a slug of the title, a timestamp, and a short
    /// random suffix so concurrent jobs never share a directory.
    pub fn create(work_dir: &Path, config: &UseCaseConfig) -> Result<Self> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let suffix = Uuid::new_v4().simple().to_string();
        let job_id = format!("{}_{}_{}", slugify(&config.title), timestamp, &suffix[..8]);
        let dir = work_dir.join(&job_id);
        fs::create_dir_all(&dir).map_err(|e| PipelineError::storage(&dir, e))?;

        let store = Self { job_id, dir };
        store.write_metadata(&JobMetadata {
            job_id: store.job_id.clone(),
            created_at: Local::now().to_rfc3339(),
            title: config.title.clone(),
            state: JobState::Created,
        })?;
        store.log(&format!("job created for '{}'", config.title));
        Ok(store)
    }

    /// Attach to an existing job directory (resume)
    pub fn attach(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let metadata_path = dir.join("job.json");
        let content = fs::read_to_string(&metadata_path)
            .map_err(|e| PipelineError::storage(&metadata_path, e))?;
        let metadata: JobMetadata = serde_json::from_str(&content).map_err(|e| {
            PipelineError::storage(
                &metadata_path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        Ok(Self {
            job_id: metadata.job_id,
            dir,
        })
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Record a state transition in `job.json`
    pub fn set_state(&self, state: JobState) -> Result<()> {
        let path = self.dir.join("job.json");
        let content =
            fs::read_to_string(&path).map_err(|e| PipelineError::storage(&path, e))?;
        let mut metadata: JobMetadata = serde_json::from_str(&content).map_err(|e| {
            PipelineError::storage(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        metadata.state = state;
        self.write_metadata(&metadata)?;
        self.log(&format!("state -> {}", state));
        Ok(())
    }

    /// Read job metadata back
    pub fn metadata(&self) -> Result<JobMetadata> {
        let path = self.dir.join("job.json");
        let content =
            fs::read_to_string(&path).map_err(|e| PipelineError::storage(&path, e))?;
        serde_json::from_str(&content).map_err(|e| {
            PipelineError::storage(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    fn write_metadata(&self, metadata: &JobMetadata) -> Result<()> {
        let path = self.dir.join("job.json");
        let content = serde_json::to_string_pretty(metadata).expect("metadata serializes");
        durable_write(&path, content.as_bytes())
    }

    /// Persist a raw model response before any parsing, so a parse failure
    /// never loses the API call's output
    pub fn write_raw(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}_raw.txt", name));
        durable_write(&path, content.as_bytes())?;
        Ok(path)
    }

    /// Durable scoped write of a parsed stage artifact
    pub fn write_artifact<T: Serialize>(&self, name: &str, payload: &T) -> Result<PathBuf> {
        let path = self.dir.join(format!("{}.json", name));
        let content = serde_json::to_string_pretty(payload).map_err(|e| {
            PipelineError::storage(&path, std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })?;
        durable_write(&path, content.as_bytes())?;
        Ok(path)
    }

    /// Load a previously parsed artifact, if present and well-formed.
    /// Used to resume a job without repeating completed stages.
    pub fn load_artifact<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let path = self.dir.join(format!("{}.json", name));
        let content = fs::read_to_string(&path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Append a timestamped line to the job's chronological log.
    /// Logging is best-effort: a failed log write never fails the job.
    pub fn log(&self, message: &str) {
        let path = self.dir.join("execution.log");
        let line = format!("{} - {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), message);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| f.write_all(line.as_bytes()));
        if let Err(e) = result {
            tracing::warn!(path = %path.display(), error = %e, "failed to append execution log");
        }
    }

    /// Assemble all artifacts into the two final output formats.
    ///
    /// Overwrites on re-invocation: finalizing the same completed job twice
    /// produces byte-identical JSON both times.
    pub fn finalize(&self, document: &FinalDocument) -> Result<FinalOutputs> {
        let json_path = self.dir.join("use_case.json");
        let content = serde_json::to_string_pretty(document).map_err(|e| {
            PipelineError::storage(
                &json_path,
                std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            )
        })?;
        durable_write(&json_path, content.as_bytes())?;

        let markdown_path = self.dir.join("use_case.md");
        let markdown = render::to_markdown(document);
        durable_write(&markdown_path, markdown.as_bytes())?;

        self.log("final outputs written");
        Ok(FinalOutputs {
            json_path,
            markdown_path,
        })
    }
}

/// Write bytes and fsync before returning control to the orchestrator
fn durable_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut file = File::create(path).map_err(|e| PipelineError::storage(path, e))?;
    file.write_all(bytes)
        .map_err(|e| PipelineError::storage(path, e))?;
    file.sync_all().map_err(|e| PipelineError::storage(path, e))?;
    Ok(())
}

fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}
