use crate::core::investigation::{
    ActOutcome, InvestigationReport, RetrievalOutcome, Step, Verdict,
};
use crate::core::tools::{ActionSpec, Outcome};
use crate::utils::text::truncate_with_ellipsis;
use console::style;

const DETAIL_MAX_CHARS: usize = 120;

fn verdict_label(verdict: Verdict) -> String {
    let label = verdict.to_string();
    match verdict {
        Verdict::Resolved => style(label).green().bold().to_string(),
        Verdict::Diagnosed => style(label).cyan().bold().to_string(),
        Verdict::Inconclusive | Verdict::Degraded | Verdict::Cancelled => {
            style(label).yellow().bold().to_string()
        }
        Verdict::Errored => style(label).red().bold().to_string(),
    }
}

fn render_step(step: &Step) -> String {
    match step {
        Step::Retrieve {
            query,
            outcome: RetrievalOutcome::Results { results },
        } => {
            let top = results
                .first()
                .map(|r| format!(", top {} ({:.2})", r.source, r.score))
                .unwrap_or_default();
            format!("retrieve  \"{query}\" -> {} result(s){top}", results.len())
        }
        Step::Retrieve {
            query,
            outcome: RetrievalOutcome::Unavailable { reason },
        } => format!("retrieve  \"{query}\" -> unavailable: {reason}"),
        Step::Act {
            action,
            capability,
            outcome,
            ..
        } => {
            let result = match outcome {
                ActOutcome::Executed {
                    outcome: Outcome::Success { data },
                } => format!("ok: {}", first_line(data)),
                ActOutcome::Executed {
                    outcome: Outcome::Failure { reason },
                } => format!("failed: {reason}"),
                ActOutcome::Executed {
                    outcome: Outcome::DryRun { preview },
                } => format!("dry run: {preview}"),
                ActOutcome::Blocked { reason } => format!("BLOCKED: {reason}"),
            };
            format!("act       {action} [{capability}] -> {result}")
        }
        Step::Terminate {
            verdict,
            cause,
            summary,
        } => format!("terminate {verdict} ({cause}): {summary}"),
    }
}

fn first_line(text: &str) -> &str {
    text.lines().find(|line| !line.trim().is_empty()).unwrap_or("")
}

pub fn render_report(report: &InvestigationReport) -> String {
    let mut lines = vec![
        format!(
            "◆ Incident {}: {}",
            style(&report.incident.id).bold(),
            report.incident.description
        ),
        format!("  Verdict:  {}", verdict_label(report.verdict)),
        format!("  Steps:    {}", report.total_steps),
    ];
    if let Some(error) = &report.error {
        lines.push(format!(
            "  Error:    {} ({})",
            style(&error.message).red(),
            error.kind
        ));
    }
    lines.push(String::new());
    for record in &report.steps {
        lines.push(format!(
            "  {:>2}. {}",
            record.index,
            truncate_with_ellipsis(&render_step(&record.step), DETAIL_MAX_CHARS)
        ));
    }
    lines.join("\n")
}

pub fn render_actions(specs: &[&ActionSpec]) -> String {
    specs
        .iter()
        .map(|spec| {
            let tag = if spec.capability.requires_approval() {
                style(spec.capability.to_string()).yellow()
            } else {
                style(spec.capability.to_string()).green()
            };
            format!("  {:<22} [{tag}] {}", spec.name, spec.description)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
