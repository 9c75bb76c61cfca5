use crate::error::RetrievalError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// One ranked passage returned by a retriever.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub passage: String,
    /// Stable identifier of the document the passage came from.
    pub source: String,
    /// Relevance in `[0, 1]`.
    pub score: f64,
}

impl RetrievalResult {
    /// Builds a result, clamping the score into `[0, 1]`. A NaN score is
    /// treated as irrelevant.
    pub fn new(passage: impl Into<String>, source: impl Into<String>, score: f64) -> Self {
        let score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 1.0)
        };
        Self {
            passage: passage.into(),
            source: source.into(),
            score,
        }
    }
}

/// Orders results by descending score, breaking ties by source identifier.
pub fn rank_results(results: &mut [RetrievalResult]) {
    results.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.source.cmp(&b.source))
    });
}

/// Sorts, then keeps the top `k`.
pub fn top_k(mut results: Vec<RetrievalResult>, k: usize) -> Vec<RetrievalResult> {
    rank_results(&mut results);
    results.truncate(k);
    results
}

pub(crate) fn validate_k(k: usize) -> Result<(), RetrievalError> {
    if k == 0 {
        return Err(RetrievalError::InvalidK(k));
    }
    Ok(())
}

/// Knowledge retrieval port.
///
/// Implementations are built once per process and shared read-only across
/// concurrent investigations; any internal caching must tolerate concurrent
/// readers. Results come back ordered by [`rank_results`]. An empty vector
/// means nothing cleared the retriever's own relevance floor and is not an
/// error.
pub trait Retriever: Send + Sync {
    fn name(&self) -> &str;

    fn search<'a>(
        &'a self,
        query: &'a str,
        k: usize,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RetrievalResult>, RetrievalError>> + Send + 'a>>;
}
