use crate::Config;
use crate::app::render::{render_actions, render_report};
use crate::cli::commands::{Cli, Commands};
use crate::core::investigation::{Incident, InvestigationReport, Orchestrator, ReportLog};
use crate::core::policy::RuleBasedPolicy;
use crate::core::retrieval::create_retriever;
use crate::core::tools::build_registry;
use crate::runtime::observability::{Observer, create_observer};
use crate::security::approval::{ApprovalGate, AutoDenyGate, create_gate};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

async fn build_orchestrator(
    config: &Config,
    auto_deny: bool,
    max_steps: Option<u32>,
) -> Result<Orchestrator> {
    let config = &with_step_budget(config, max_steps)?;
    let retriever = create_retriever(&config.retrieval).await?;
    let registry = Arc::new(build_registry(&config.actions));
    let gate: Arc<dyn ApprovalGate> = if auto_deny {
        Arc::new(AutoDenyGate::new("--auto-deny: write actions are never executed"))
    } else {
        create_gate(&config.approval)?
    };
    let observer: Arc<dyn Observer> = Arc::from(create_observer(&config.observability));
    let policy = Arc::new(RuleBasedPolicy::from_config(config));

    info!(
        retriever = retriever.name(),
        gate = gate.name(),
        actions = registry.names().len(),
        "orchestrator ready"
    );

    Ok(
        Orchestrator::new(policy, retriever, registry, gate, config.investigation.settings())
            .with_observer(observer),
    )
}

/// Applies a `--max-steps` override and re-validates, so an out-of-range
/// budget is an error instead of a silent clamp.
fn with_step_budget(config: &Config, max_steps: Option<u32>) -> Result<Config> {
    let mut config = config.clone();
    if let Some(max_steps) = max_steps {
        config.investigation.max_steps = max_steps;
    }
    config.validate().context("invalid --max-steps")?;
    Ok(config)
}

/// Cancels the token on Ctrl-C until the returned handle is aborted.
fn cancel_on_ctrl_c(token: CancellationToken) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current step");
            token.cancel();
        }
    })
}

async fn persist(config: &Config, reports: &[InvestigationReport]) {
    let log = ReportLog::new(config.reports_dir());
    for report in reports {
        match log.append(report).await {
            Ok(path) => info!(
                incident_id = %report.incident.id,
                path = %path.display(),
                "investigation report persisted"
            ),
            Err(e) => warn!(
                incident_id = %report.incident.id,
                dir = %log.dir().display(),
                error = %e,
                "failed to persist investigation report"
            ),
        }
    }
}

fn default_incident_id() -> String {
    format!("inc-{}", chrono::Utc::now().format("%Y%m%d%H%M%S"))
}

async fn load_incidents(file: &Path) -> Result<Vec<Incident>> {
    let raw = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read incident file {}", file.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} must hold a JSON array of incidents", file.display()))
}

fn print_reports(reports: &[InvestigationReport], json: bool) -> Result<()> {
    if json {
        let out = if let [report] = reports {
            serde_json::to_string_pretty(report)?
        } else {
            serde_json::to_string_pretty(reports)?
        };
        println!("{out}");
    } else {
        for report in reports {
            println!("{}", render_report(report));
            println!();
        }
    }
    Ok(())
}

pub async fn dispatch(cli: Cli, config: Arc<Config>) -> Result<()> {
    match cli.command {
        Commands::Investigate {
            description,
            id,
            labels,
            max_steps,
            auto_deny,
            json,
        } => {
            let orchestrator = build_orchestrator(&config, auto_deny, max_steps).await?;
            let incident = labels.into_iter().fold(
                Incident::new(id.unwrap_or_else(default_incident_id), description),
                |incident, (key, value)| incident.with_label(key, value),
            );

            let cancel = CancellationToken::new();
            let watcher = cancel_on_ctrl_c(cancel.clone());
            let report = orchestrator.investigate_with_cancel(incident, &cancel).await;
            watcher.abort();

            let reports = [report];
            persist(&config, &reports).await;
            print_reports(&reports, json)
        }
        Commands::Batch {
            file,
            auto_deny,
            json,
        } => {
            let incidents = load_incidents(&file).await?;
            if incidents.is_empty() {
                println!("No incidents in {}", file.display());
                return Ok(());
            }
            let orchestrator = build_orchestrator(&config, auto_deny, None).await?;

            let cancel = CancellationToken::new();
            let watcher = cancel_on_ctrl_c(cancel.clone());
            let reports = futures_util::future::join_all(
                incidents
                    .into_iter()
                    .map(|incident| orchestrator.investigate_with_cancel(incident, &cancel)),
            )
            .await;
            watcher.abort();

            persist(&config, &reports).await;
            print_reports(&reports, json)
        }
        Commands::Actions => {
            let registry = build_registry(&config.actions);
            println!("Registered actions ({}):", registry.names().len());
            println!("{}", render_actions(&registry.specs()));
            Ok(())
        }
        Commands::Config => {
            let rendered = toml::to_string_pretty(&config.redacted())
                .context("failed to serialize config")?;
            println!("# {}", config.config_path.display());
            print!("{rendered}");
            Ok(())
        }
    }
}
