#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

use anyhow::Result;
use clap::Parser;
use nexusops::Config;
use nexusops::app;
use nexusops::cli::Cli;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Install default crypto provider for Rustls TLS.
    // reqwest cannot pick one on its own when both ring and aws-lc-rs are linked.
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: Failed to install default crypto provider: {e:?}");
    }

    // Logs go to stderr so --json output on stdout stays parseable.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();
    let config = Arc::new(Config::load_or_init()?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(app::dispatch::dispatch(cli, config));
    // A terminal prompt abandoned after its approval timeout still holds a
    // blocking thread; exit without waiting for an answer.
    runtime.shutdown_timeout(Duration::from_millis(250));
    result
}
