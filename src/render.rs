//! Markdown rendering of the final use case document

use std::fmt::Write;

use crate::job::StageRecord;
use crate::pipeline::types::{FinalDocument, ResourceKind};

/// Render the complete document for human consumption
pub fn to_markdown(document: &FinalDocument) -> String {
    let content = &document.content;
    let mut md = String::new();

    let _ = writeln!(md, "# {}\n", content.title);
    let _ = writeln!(md, "**Time to Complete:** {}\n", content.time_to_complete);
    let _ = writeln!(md, "## Description\n{}\n", content.description);

    md.push_str("## Steps\n");
    for (i, step) in content.steps.iter().enumerate() {
        let _ = writeln!(md, "### Step {}: {}", i + 1, step.step_title);
        let _ = writeln!(md, "{}\n", step.step_instructions);

        for (j, sub) in step.sub_steps.iter().enumerate() {
            let _ = writeln!(md, "{}. **{}**", j + 1, sub.title);
            if let Some(description) = &sub.description {
                let _ = writeln!(md, "   {}", description);
            }
            for bullet in &sub.bullets {
                let _ = writeln!(md, "   - {}", bullet);
            }
            md.push('\n');
        }

        if let Some(advice) = &step.advice {
            let _ = writeln!(md, "{}\n", advice);
        }
    }

    if !content.resources.is_empty() {
        md.push_str("## Resources\n");
        // Grouped by kind in priority order: tool, then language, then mode
        let groups = [
            (ResourceKind::Tool, "Tool Documentation"),
            (ResourceKind::Language, "Language Documentation"),
            (ResourceKind::Mode, "Mode-specific Documentation"),
        ];
        for (kind, header) in groups {
            let matching: Vec<_> = content.resources.iter().filter(|r| r.kind == kind).collect();
            if matching.is_empty() {
                continue;
            }
            let _ = writeln!(md, "### {}", header);
            for resource in matching {
                let _ = write!(md, "* [{}]({})", resource.title, resource.url);
                if let Some(section) = &resource.section {
                    let _ = write!(md, " - {}", section);
                }
                md.push('\n');
            }
            md.push('\n');
        }
    }

    if !content.citations.is_empty() {
        md.push_str("## Additional References\n");
        // Highest relevance first; unscored citations sort last, original
        // order preserved among equals
        let mut citations: Vec<_> = content.citations.iter().collect();
        citations.sort_by(|a, b| {
            let score_a = a.relevance_score.unwrap_or(0.0);
            let score_b = b.relevance_score.unwrap_or(0.0);
            score_b.partial_cmp(&score_a).unwrap_or(std::cmp::Ordering::Equal)
        });
        for citation in citations {
            let _ = write!(
                md,
                "* [{}]({})",
                citation.title.as_deref().unwrap_or("Untitled"),
                citation.url
            );
            if let Some(snippet) = &citation.snippet {
                let _ = write!(md, "\n  > {}", snippet);
            }
            md.push('\n');
        }
        md.push('\n');
    }

    if let Some(solution) = &document.example_solution {
        let _ = writeln!(md, "## Example Solution: {}\n", solution.title);
        let _ = writeln!(md, "**Setup Time:** {} minutes  ", solution.setup_time);
        let _ = writeln!(md, "**Demo Time:** {} minutes\n", solution.demo_time);
        let _ = writeln!(md, "### Scenario\n{}\n", solution.scenario);

        md.push_str("### Prerequisites\n");
        for prereq in &solution.prerequisites {
            let _ = writeln!(md, "* {}", prereq);
        }

        md.push_str("\n### Demo Steps\n");
        for (i, step) in solution.steps.iter().enumerate() {
            let _ = writeln!(md, "{}. **{}**", i + 1, step.action);
            let _ = writeln!(md, "```\n{}\n```", step.code_or_prompt);
        }

        md.push_str("\n### Validation\n");
        for check in &solution.validation {
            let _ = writeln!(md, "* {}", check);
        }

        md.push_str("\n### Key Teaching Points\n");
        for point in &solution.key_points {
            let _ = writeln!(md, "* {}", point);
        }

        md.push_str("\n### Common Issues to Watch For\n");
        for issue in &solution.common_issues {
            let _ = writeln!(md, "* {}", issue);
        }

        if !solution.variations.is_empty() {
            md.push_str("\n### Variations\n");
            for variation in &solution.variations {
                let _ = writeln!(md, "* {}", variation);
            }
        }

        let _ = writeln!(md, "\n### Demo Script\n{}\n", solution.demo_script);
    }

    if !document.visual_suggestions.is_empty() {
        md.push_str("\n## Visual Elements\n");
        md.push_str(
            "The following visual elements are recommended to enhance this use case:\n\n",
        );
        for (i, visual) in document.visual_suggestions.iter().enumerate() {
            let _ = writeln!(
                md,
                "{}. **{}** ({})",
                i + 1,
                visual.description,
                visual.format
            );
            let _ = writeln!(md, "   - Supports: {}", visual.supports_step);
            let _ = writeln!(md, "   - Tooling: {}", visual.tooling);
            let _ = writeln!(md, "   - Why: {}", visual.rationale);
        }
        md.push('\n');
    }

    md.push_str("\n## Generation Report\n");
    for record in &document.stage_report {
        md.push_str(&stage_report_line(record));
    }

    md.push_str("\n## Metadata\n");
    let config = &document.config;
    if let Some(id) = &config.id {
        let _ = writeln!(md, "* **id:** {}", id);
    }
    let _ = writeln!(md, "* **family:** {}", config.family);
    let _ = writeln!(md, "* **ai_tool:** {}", config.ai_tool);
    let _ = writeln!(md, "* **time_estimate:** {}", config.time_estimate);
    if !config.department.is_empty() {
        let _ = writeln!(md, "* **department:** {}", config.department.join(", "));
    }
    if !config.role.is_empty() {
        let _ = writeln!(md, "* **role:** {}", config.role.join(", "));
    }
    if let Some(mode) = &config.mode {
        let _ = writeln!(md, "* **mode:** {}", mode);
    }
    if let Some(model) = &config.model {
        let _ = writeln!(md, "* **model:** {}", model);
    }
    if let Some(language) = &config.coding_language {
        let _ = writeln!(md, "* **coding_language:** {}", language);
    }

    md
}

fn stage_report_line(record: &StageRecord) -> String {
    match &record.detail {
        Some(detail) => format!("* **{}:** {} ({})\n", record.stage, record.status, detail),
        None => format!("* **{}:** {}\n", record.stage, record.status),
    }
}
