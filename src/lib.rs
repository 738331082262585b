//! Use case generator
//!
//! Automates authoring of instructional use case documents through a
//! six-stage LLM pipeline: research question generation, parallel deep
//! research, content refinement, final polish, example solution generation,
//! and visual element suggestions. Every stage persists its raw and parsed
//! output into a timestamped job directory for resumability and debugging.
//!
//! The primary entry point is [`pipeline::run_pipeline`].

pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod provider;
pub mod render;

pub use config::{Family, RawUseCaseConfig, UseCaseConfig};
pub use error::{PipelineError, Result};
pub use job::{JobState, JobStore, Stage, StageStatus};
pub use pipeline::{run_pipeline, JobOutcome, Models, PipelineOptions, Providers};
pub use provider::{ChatMessage, Completion, HttpProvider, Provider, RetryPolicy};
