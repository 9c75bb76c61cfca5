use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `NexusOps`.
///
/// Library seams return the subsystem errors below; the application layer
/// keeps using `anyhow::Result` for ad-hoc context chains.
#[derive(Debug, Error)]
pub enum NexusError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── Investigation (fatal to a run) ──────────────────────────────────
    #[error("investigation: {0}")]
    Investigation(#[from] InvestigationError),

    // ── Retrieval ───────────────────────────────────────────────────────
    #[error("retrieval: {0}")]
    Retrieval(#[from] RetrievalError),

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── Investigation errors ────────────────────────────────────────────────────

/// Conditions that abort a run. Everything else is recorded as a step and
/// handed back to the decision policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvestigationError {
    #[error("policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("action registry: {0}")]
    Action(#[from] ActionError),
}

impl InvestigationError {
    /// Stable label written to the report.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Policy(_) => "policy_error",
            Self::Action(_) => "unknown_action",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("policy selected unknown action '{name}'")]
    UnknownAction { name: String },

    #[error("invalid decision: {0}")]
    InvalidDecision(String),
}

// ─── Action registry errors ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("unknown action '{name}'")]
    UnknownAction { name: String },
}

// ─── Retrieval errors ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetrievalError {
    #[error("retriever unavailable: {0}")]
    Unavailable(String),

    #[error("k must be at least 1 (got {0})")]
    InvalidK(usize),
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, NexusError>;
