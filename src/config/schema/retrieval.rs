use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// "keyword" | "http"
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Runbook directory for the keyword index. `~` is expanded.
    #[serde(default = "default_knowledge_dir")]
    pub knowledge_dir: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub index: Option<String>,
    /// Keyword passages scoring at or below this are dropped.
    #[serde(default)]
    pub floor: f64,
}

fn default_backend() -> String {
    "keyword".into()
}

fn default_knowledge_dir() -> String {
    "~/.nexusops/knowledge".into()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            knowledge_dir: default_knowledge_dir(),
            endpoint: None,
            api_key: None,
            index: None,
            floor: 0.0,
        }
    }
}

impl RetrievalConfig {
    pub fn knowledge_dir_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.knowledge_dir).into_owned())
    }
}
