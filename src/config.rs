//! Use case configuration loading and validation
//!
//! A submission arrives either as a JSON payload or as individual CLI flags.
//! [`RawUseCaseConfig`] accepts both shapes (list fields may be JSON arrays or
//! comma-delimited strings) and [`RawUseCaseConfig::validate`] turns it into an
//! immutable [`UseCaseConfig`], collecting every violation into a single
//! `ConfigurationError` instead of stopping at the first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Fixed category set a use case must belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Family {
    #[serde(rename = "Core Skills")]
    CoreSkills,
    #[serde(rename = "Communication")]
    Communication,
    #[serde(rename = "Presentations")]
    Presentations,
    #[serde(rename = "Data & Analysis")]
    DataAnalysis,
    #[serde(rename = "Coding")]
    Coding,
}

impl Family {
    /// Canonical display name, as used in submissions and rendered output
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::CoreSkills => "Core Skills",
            Family::Communication => "Communication",
            Family::Presentations => "Presentations",
            Family::DataAnalysis => "Data & Analysis",
            Family::Coding => "Coding",
        }
    }

    /// All valid family names, for error messages
    pub fn all_names() -> [&'static str; 5] {
        [
            "Core Skills",
            "Communication",
            "Presentations",
            "Data & Analysis",
            "Coding",
        ]
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "Core Skills" => Ok(Family::CoreSkills),
            "Communication" => Ok(Family::Communication),
            "Presentations" => Ok(Family::Presentations),
            "Data & Analysis" => Ok(Family::DataAnalysis),
            "Coding" => Ok(Family::Coding),
            other => Err(format!(
                "unknown family '{}' (expected one of: {})",
                other,
                Family::all_names().join(", ")
            )),
        }
    }
}

/// A field that may arrive as a JSON array or as a comma-delimited string
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    List(Vec<String>),
    Text(String),
}

impl StringOrList {
    /// Normalize to an ordered sequence: split on commas, trim whitespace,
    /// drop empty segments. Order is preserved and duplicates are kept.
    pub fn into_items(self) -> Vec<String> {
        match self {
            StringOrList::List(items) => items
                .into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            StringOrList::Text(text) => text
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }
}

/// Unvalidated submission, straight from a JSON payload or CLI flags
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUseCaseConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub family: Option<String>,
    #[serde(default)]
    pub ai_tool: Option<String>,
    #[serde(default)]
    pub objective: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub prerequisites: Option<StringOrList>,
    #[serde(default)]
    pub time_estimate: Option<String>,
    #[serde(default)]
    pub steps: Option<StringOrList>,
    #[serde(default)]
    pub department: Option<StringOrList>,
    #[serde(default)]
    pub role: Option<StringOrList>,
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub coding_language: Option<String>,
}

impl RawUseCaseConfig {
    /// Validate the submission and produce an immutable [`UseCaseConfig`].
    ///
    /// All violations are collected and reported together in one
    /// `ConfigurationError`. A valid config is required before a job is
    /// created, so failure here means no job directory is ever allocated.
    pub fn validate(self) -> Result<UseCaseConfig> {
        let mut violations = Vec::new();

        let title = require_text("title", self.title, &mut violations);
        let objective = require_text("objective", self.objective, &mut violations);
        let description = require_text("description", self.description, &mut violations);
        let ai_tool = require_text("ai_tool", self.ai_tool, &mut violations);
        let time_estimate = require_text("time_estimate", self.time_estimate, &mut violations);

        let family = match self.family.as_deref().map(str::trim) {
            None | Some("") => {
                violations.push("family (missing)".to_string());
                None
            }
            Some(name) => match Family::from_str(name) {
                Ok(family) => Some(family),
                Err(err) => {
                    violations.push(format!("family ({})", err));
                    None
                }
            },
        };

        let prerequisites = require_list("prerequisites", self.prerequisites, &mut violations);
        let steps = require_list("steps", self.steps, &mut violations);

        if !violations.is_empty() {
            return Err(PipelineError::Configuration { fields: violations });
        }

        Ok(UseCaseConfig {
            id: self.id.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            title: title.unwrap(),
            family: family.unwrap(),
            ai_tool: ai_tool.unwrap(),
            objective: objective.unwrap(),
            description: description.unwrap(),
            prerequisites: prerequisites.unwrap(),
            time_estimate: time_estimate.unwrap(),
            steps: steps.unwrap(),
            department: self.department.map(StringOrList::into_items).unwrap_or_default(),
            role: self.role.map(StringOrList::into_items).unwrap_or_default(),
            mode: self.mode.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            model: self.model.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
            coding_language: self
                .coding_language
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        })
    }
}

fn require_text(
    field: &str,
    value: Option<String>,
    violations: &mut Vec<String>,
) -> Option<String> {
    match value.as_deref().map(str::trim) {
        None | Some("") => {
            violations.push(format!("{} (missing)", field));
            None
        }
        Some(text) => Some(text.to_string()),
    }
}

fn require_list(
    field: &str,
    value: Option<StringOrList>,
    violations: &mut Vec<String>,
) -> Option<Vec<String>> {
    let items = value.map(StringOrList::into_items).unwrap_or_default();
    if items.is_empty() {
        violations.push(format!("{} (missing)", field));
        None
    } else {
        Some(items)
    }
}

/// Validated, immutable input record consumed by every pipeline stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseCaseConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub family: Family,
    pub ai_tool: String,
    pub objective: String,
    pub description: String,
    pub prerequisites: Vec<String>,
    pub time_estimate: String,
    pub steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub department: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub role: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coding_language: Option<String>,
}

impl UseCaseConfig {
    /// Format the config as the structured block the prompts embed
    pub fn as_prompt_block(&self) -> String {
        let prerequisites = self
            .prerequisites
            .iter()
            .map(|p| format!("- {}", p))
            .collect::<Vec<_>>()
            .join("\n");
        let steps = self
            .steps
            .iter()
            .map(|s| format!("- {}", s))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "<Use_Case>{}</Use_Case>\n\
             <Family>{}</Family>\n\
             <AI_Tool>{}</AI_Tool>\n\
             <Objective>{}</Objective>\n\
             <Description>{}</Description>\n\
             <Prerequisites>\n{}\n</Prerequisites>\n\
             <Time_Estimate>{}</Time_Estimate>\n\
             <Steps>\n{}\n</Steps>\n\
             <Department>{}</Department>\n\
             <Role>{}</Role>\n\
             <Mode>{}</Mode>\n\
             <Model>{}</Model>\n\
             <Coding_Language>{}</Coding_Language>",
            self.title,
            self.family,
            self.ai_tool,
            self.objective,
            self.description,
            prerequisites,
            self.time_estimate,
            steps,
            self.department.join(", "),
            self.role.join(", "),
            self.mode.as_deref().unwrap_or(""),
            self.model.as_deref().unwrap_or(""),
            self.coding_language.as_deref().unwrap_or(""),
        )
    }
}
