use super::traits::{RetrievalResult, Retriever, top_k, validate_k};
use crate::error::RetrievalError;
use crate::utils::text::search_terms;
use anyhow::Context;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use tokio::fs;

const INDEXED_EXTENSIONS: [&str; 3] = ["md", "markdown", "txt"];

#[derive(Debug, Clone)]
struct Passage {
    source: String,
    text: String,
    terms: Vec<String>,
}

/// In-process lexical index over runbook documents.
///
/// Documents are split into blank-line separated paragraphs. A paragraph
/// scores the fraction of distinct query terms it contains; paragraphs at or
/// below `floor` are never returned.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    passages: Vec<Passage>,
    floor: f64,
}

impl KeywordIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_floor(mut self, floor: f64) -> Self {
        self.floor = floor.clamp(0.0, 1.0);
        self
    }

    /// Index one document under `source`.
    pub fn add_document(&mut self, source: &str, text: &str) {
        let paragraphs = text
            .split("\n\n")
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty());
        for (i, paragraph) in paragraphs.enumerate() {
            self.passages.push(Passage {
                source: format!("{source}#{i}"),
                text: paragraph.to_string(),
                terms: search_terms(paragraph),
            });
        }
    }

    /// Index every `.md`/`.markdown`/`.txt` file directly under `dir`. A
    /// missing directory yields an empty index.
    pub async fn load_dir(dir: &Path) -> anyhow::Result<Self> {
        let mut index = Self::new();
        if !dir.exists() {
            tracing::warn!(dir = %dir.display(), "knowledge directory missing, index is empty");
            return Ok(index);
        }

        let mut paths = Vec::new();
        let mut entries = fs::read_dir(dir)
            .await
            .with_context(|| format!("read knowledge directory {}", dir.display()))?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let indexed = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| INDEXED_EXTENSIONS.contains(&ext));
            if indexed {
                paths.push(path);
            }
        }
        // Directory iteration order is platform dependent.
        paths.sort();

        for path in paths {
            let content = fs::read_to_string(&path)
                .await
                .with_context(|| format!("read knowledge document {}", path.display()))?;
            let source = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("unknown");
            index.add_document(source, &content);
        }

        tracing::info!(
            dir = %dir.display(),
            passages = index.len(),
            "knowledge index loaded"
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    fn score(&self, query: &str) -> Vec<RetrievalResult> {
        let keywords = search_terms(query);
        if keywords.is_empty() {
            return Vec::new();
        }

        self.passages
            .iter()
            .filter_map(|passage| {
                let matched = keywords
                    .iter()
                    .filter(|kw| passage.terms.contains(kw))
                    .count();
                #[allow(clippy::cast_precision_loss)]
                let score = matched as f64 / keywords.len() as f64;
                (score > self.floor)
                    .then(|| RetrievalResult::new(&passage.text, &passage.source, score))
            })
            .collect()
    }
}

impl Retriever for KeywordIndex {
    fn name(&self) -> &str {
        "keyword"
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RetrievalResult>, RetrievalError>> + Send + 'a>>
    {
        Box::pin(async move {
            validate_k(k)?;
            Ok(top_k(self.score(query), k))
        })
    }
}
