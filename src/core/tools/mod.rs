pub mod draft_pr;
pub mod factory;
pub mod fetch_logs;
pub mod registry;
pub mod traits;

pub use draft_pr::{DRAFT_REMEDIATION_PR, DraftRemediationPrAction};
pub use factory::{build_registry, default_actions};
pub use fetch_logs::{FETCH_LOGS, FetchLogsAction};
pub use registry::{ActionRegistry, ActionRegistryBuilder};
pub use traits::{Action, ActionSpec, Capability, Outcome};
