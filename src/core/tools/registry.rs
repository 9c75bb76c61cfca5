use super::traits::{Action, ActionSpec, Outcome};
use crate::error::ActionError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

struct Entry {
    spec: ActionSpec,
    action: Arc<dyn Action>,
}

/// Collects actions at startup. Call [`ActionRegistryBuilder::build`] to get
/// the immutable [`ActionRegistry`].
#[derive(Default)]
pub struct ActionRegistryBuilder {
    actions: BTreeMap<String, Arc<dyn Action>>,
}

impl ActionRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action. Replaces any existing action with the same name.
    pub fn register(&mut self, action: Box<dyn Action>) -> &mut Self {
        let action: Arc<dyn Action> = Arc::from(action);
        self.actions.insert(action.name().to_string(), action);
        self
    }

    pub fn build(self) -> ActionRegistry {
        let entries = self
            .actions
            .into_iter()
            .map(|(name, action)| {
                let spec = action.spec();
                (name, Entry { spec, action })
            })
            .collect();
        ActionRegistry { entries }
    }
}

/// Name → capability lookup, fixed for the lifetime of the process so an
/// approval decision can never be invalidated by a capability swap mid-run.
pub struct ActionRegistry {
    entries: BTreeMap<String, Entry>,
}

impl ActionRegistry {
    pub fn builder() -> ActionRegistryBuilder {
        ActionRegistryBuilder::new()
    }

    pub fn resolve(&self, name: &str) -> Result<&ActionSpec, ActionError> {
        self.entries
            .get(name)
            .map(|entry| &entry.spec)
            .ok_or_else(|| ActionError::UnknownAction {
                name: name.to_string(),
            })
    }

    /// Return sorted list of registered action names.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Specs in name order.
    pub fn specs(&self) -> Vec<&ActionSpec> {
        self.entries.values().map(|entry| &entry.spec).collect()
    }

    /// Invoke an action that the caller has already resolved and, for write
    /// actions, cleared through the approval gate.
    pub async fn invoke(&self, name: &str, params: &Value) -> Result<Outcome, ActionError> {
        let entry = self
            .entries
            .get(name)
            .ok_or_else(|| ActionError::UnknownAction {
                name: name.to_string(),
            })?;

        if let Some(reason) = check_required_params(&entry.spec.parameters, params) {
            tracing::warn!(action = %name, %reason, "action parameters rejected");
            return Ok(Outcome::failure(reason));
        }

        let started = Instant::now();
        let outcome = match entry.action.invoke(params).await {
            Ok(outcome) => outcome,
            Err(error) => Outcome::failure(format!("{error:#}")),
        };
        let ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::info!(
            action = %name,
            capability = %entry.spec.capability,
            success = outcome.is_success(),
            duration_ms = ms,
            "action.invoke"
        );
        Ok(outcome)
    }
}

/// Minimal schema check: object parameters and presence of `required` keys.
fn check_required_params(schema: &Value, params: &Value) -> Option<String> {
    let expects_object = schema.get("type").and_then(Value::as_str) == Some("object");
    if expects_object && !params.is_object() {
        return Some("parameters must be a JSON object".to_string());
    }

    let missing: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .filter(|key| params.get(*key).is_none_or(Value::is_null))
        .collect();

    if missing.is_empty() {
        None
    } else {
        Some(format!("missing required parameter(s): {}", missing.join(", ")))
    }
}
