use super::traits::{RetrievalResult, Retriever, top_k, validate_k};
use crate::error::RetrievalError;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Dense-retrieval client for a remote vector index.
///
/// Sends `POST {endpoint}/query` with `{query, top_k, index}` and expects
/// `{matches: [{id, score, metadata: {text, source}}]}` back. Embedding the
/// query is the service's job.
pub struct HttpRetriever {
    endpoint: String,
    api_key: Option<String>,
    index: Option<String>,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    score: f64,
    #[serde(default)]
    metadata: MatchMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct MatchMetadata {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

impl HttpRetriever {
    pub fn new(endpoint: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_key: None,
            index: None,
            client,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.is_empty());
        self
    }

    pub fn with_index(mut self, index: Option<String>) -> Self {
        self.index = index.filter(|name| !name.is_empty());
        self
    }

    fn query_url(&self) -> String {
        format!("{}/query", self.endpoint)
    }

    async fn query(&self, query: &str, k: usize) -> Result<QueryResponse, RetrievalError> {
        let mut request = self.client.post(self.query_url()).json(&serde_json::json!({
            "query": query,
            "top_k": k,
            "index": self.index,
        }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RetrievalError::Unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RetrievalError::Unavailable(format!(
                "{} returned HTTP {status}",
                self.endpoint
            )));
        }

        response
            .json::<QueryResponse>()
            .await
            .map_err(|e| RetrievalError::Unavailable(format!("malformed response: {e}")))
    }
}

impl Retriever for HttpRetriever {
    fn name(&self) -> &str {
        "http"
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RetrievalResult>, RetrievalError>> + Send + 'a>>
    {
        Box::pin(async move {
            validate_k(k)?;
            let body = self.query(query, k).await?;
            let results = body
                .matches
                .into_iter()
                .map(|m| {
                    let source = m.metadata.source.unwrap_or(m.id);
                    RetrievalResult::new(m.metadata.text.unwrap_or_default(), source, m.score)
                })
                .collect();
            Ok(top_k(results, k))
        })
    }
}
