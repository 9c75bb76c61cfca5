pub mod rules;
pub mod traits;

pub use crate::error::PolicyError;
pub use rules::RuleBasedPolicy;
pub use traits::{DecisionPolicy, NextAction};
