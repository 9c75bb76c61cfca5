pub mod schema;

pub use schema::{
    ActionsConfig, ApprovalConfig, Config, InvestigationConfig, ObservabilityConfig,
    RetrievalConfig,
};
