pub mod http;
pub mod keyword;
pub mod traits;

pub use crate::error::RetrievalError;
pub use http::HttpRetriever;
pub use keyword::KeywordIndex;
pub use traits::{RetrievalResult, Retriever, rank_results, top_k};

use crate::config::RetrievalConfig;
use crate::error::{ConfigError, NexusError, Result};
use std::sync::Arc;

/// Factory: build the configured retriever once for the whole process.
///
/// A backend the config cannot describe is a [`NexusError::Config`]; a
/// knowledge directory that fails to load surfaces as [`NexusError::Other`].
pub async fn create_retriever(config: &RetrievalConfig) -> Result<Arc<dyn Retriever>> {
    match config.backend.as_str() {
        "keyword" => {
            let dir = config.knowledge_dir_path();
            let index = KeywordIndex::load_dir(&dir).await?.with_floor(config.floor);
            Ok(Arc::new(index))
        }
        "http" => {
            let Some(endpoint) = config.endpoint.as_deref().filter(|e| !e.is_empty()) else {
                return Err(misconfigured("retrieval backend 'http' requires retrieval.endpoint"));
            };
            let retriever = HttpRetriever::new(endpoint)
                .with_api_key(config.api_key.clone())
                .with_index(config.index.clone());
            Ok(Arc::new(retriever))
        }
        other => Err(misconfigured(format!("unknown retrieval backend '{other}'"))),
    }
}

fn misconfigured(message: impl Into<String>) -> NexusError {
    ConfigError::Validation(message.into()).into()
}
