use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// `NexusOps` - approval-gated incident investigation.
#[derive(Parser, Debug)]
#[command(name = "nexusops")]
#[command(version)]
#[command(
    about = "Investigate infrastructure incidents; write actions wait for a human.",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Investigate a single incident
    Investigate {
        /// Free-text incident description, e.g. "OOMKill in pod backend-api"
        description: String,

        /// Incident identifier (generated when omitted)
        #[arg(long)]
        id: Option<String>,

        /// Structured label, repeatable: --label namespace=prod --label pod=api-1
        #[arg(short, long = "label", value_parser = parse_label)]
        labels: Vec<(String, String)>,

        /// Override investigation.max_steps for this run
        #[arg(long)]
        max_steps: Option<u32>,

        /// Reject every write action without prompting
        #[arg(long)]
        auto_deny: bool,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Investigate every incident in a JSON file concurrently
    Batch {
        /// JSON array of {id, description, labels}
        file: PathBuf,

        /// Reject every write action without prompting
        #[arg(long)]
        auto_deny: bool,

        /// Print the reports as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// List registered actions and their capability tags
    Actions,

    /// Print the effective configuration with secrets redacted
    Config,
}

fn parse_label(raw: &str) -> Result<(String, String), String> {
    let Some((key, value)) = raw.split_once('=') else {
        return Err(format!("expected key=value, got '{raw}'"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("label key must not be empty in '{raw}'"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}
