mod actions;
mod approval;
mod core;
mod investigation;
mod observability;
mod retrieval;

pub use actions::ActionsConfig;
pub use approval::ApprovalConfig;
pub use core::Config;
pub use investigation::InvestigationConfig;
pub use observability::ObservabilityConfig;
pub use retrieval::RetrievalConfig;
