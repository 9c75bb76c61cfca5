use super::types::InvestigationReport;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Append-only audit trail: one JSON line per finished investigation, in a
/// file per UTC day named after the report's finish date.
pub struct ReportLog {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl ReportLog {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, report: &InvestigationReport) -> PathBuf {
        self.dir
            .join(format!("{}.jsonl", report.finished_at.format("%Y-%m-%d")))
    }

    pub async fn append(&self, report: &InvestigationReport) -> Result<PathBuf> {
        let mut line = serde_json::to_vec(report).context("serialize investigation report")?;
        line.push(b'\n');
        let path = self.path_for(report);

        let _guard = self.write_lock.lock().await;
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("create report directory {}", self.dir.display()))?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .with_context(|| format!("open report log {}", path.display()))?;
        file.write_all(&line)
            .await
            .with_context(|| format!("append report to {}", path.display()))?;
        file.flush().await.context("flush report log")?;
        Ok(path)
    }
}
