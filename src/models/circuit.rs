// Circuit definitions - configured approval workflows

//! # Circuit Definitions
//!
//! A [`Circuit`] is a configured approval workflow. It is authored elsewhere
//! (the admin console's CRUD screens) and reaches the engine read-only. It
//! describes:
//! - the steps a document visits, each with an `order_index`
//! - whether the flow is **ordered** (next step = next order index) or
//!   **unordered** (next step = explicit target carried by the action)
//! - the actions offered on each step
//! - the checklist items defined on each step
//!
//! ## Flat definition lists
//!
//! Actions and checklist items are stored as flat lists that reference their
//! step by id, the same shape the definition store hands over. Lookups by step
//! are simple filters; circuits are small (a handful of steps) so there is no
//! index to keep in sync.
//!
//! ## Validation
//!
//! [`Circuit::validate`] performs static analysis before a circuit is accepted
//! by a repository: steps exist, ids/keys/order indexes are unique, and every
//! action and checklist item points at a real step.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::ids::{ActionId, CircuitId, RoleId, StatusItemId, StepId, StepKey};
use crate::{Result, WorkflowError};

/// A single stage in a circuit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,

    /// Human-facing key, unique within the circuit
    pub step_key: StepKey,

    /// Owning circuit, filled in when the step is added to a circuit
    pub circuit_id: CircuitId,

    /// Position in an ordered flow, unique within the circuit
    pub order_index: u32,

    /// Role allowed to act on this step; `None` means any user
    #[serde(default)]
    pub responsible_role_id: Option<RoleId>,

    /// A final step has no outgoing move-to-next transition
    #[serde(default)]
    pub is_final_step: bool,
}

impl Step {
    pub fn new<I: Into<StepId>, K: Into<StepKey>>(id: I, step_key: K, order_index: u32) -> Self {
        Step {
            id: id.into(),
            step_key: step_key.into(),
            circuit_id: CircuitId::new(""),
            order_index,
            responsible_role_id: None,
            is_final_step: false,
        }
    }

    /// Gate this step to a responsible role
    pub fn with_responsible_role<R: Into<RoleId>>(mut self, role_id: R) -> Self {
        self.responsible_role_id = Some(role_id.into());
        self
    }

    /// Mark this step as final
    pub fn final_step(mut self) -> Self {
        self.is_final_step = true;
        self
    }
}

/// A named trigger offered on a step
///
/// An action never encodes direction on its own. Whether it approves or
/// rejects is decided by the `is_approved` flag of the request that invokes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub title: String,

    /// Step this action is offered on
    pub step_id: StepId,

    /// Explicit approve target, used by unordered circuits
    #[serde(default)]
    pub target_step_id: Option<StepId>,
}

impl Action {
    pub fn new<I: Into<ActionId>, T: Into<String>, S: Into<StepId>>(
        id: I,
        title: T,
        step_id: S,
    ) -> Self {
        Action {
            id: id.into(),
            title: title.into(),
            step_id: step_id.into(),
            target_step_id: None,
        }
    }

    /// Set the explicit approve target
    pub fn targeting<S: Into<StepId>>(mut self, step_id: S) -> Self {
        self.target_step_id = Some(step_id.into());
        self
    }
}

/// Definition of a checklist entry on a step
///
/// The completion flag is per document and lives in the checklist store,
/// not here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusItem {
    pub id: StatusItemId,
    pub step_id: StepId,
    pub title: String,

    #[serde(default = "default_required")]
    pub is_required: bool,
}

fn default_required() -> bool {
    true
}

impl StatusItem {
    /// A required checklist item
    pub fn required<I: Into<StatusItemId>, S: Into<StepId>, T: Into<String>>(
        id: I,
        step_id: S,
        title: T,
    ) -> Self {
        StatusItem {
            id: id.into(),
            step_id: step_id.into(),
            title: title.into(),
            is_required: true,
        }
    }

    /// An optional checklist item, never blocks forward progress
    pub fn optional<I: Into<StatusItemId>, S: Into<StepId>, T: Into<String>>(
        id: I,
        step_id: S,
        title: T,
    ) -> Self {
        StatusItem {
            is_required: false,
            ..StatusItem::required(id, step_id, title)
        }
    }
}

/// A configured approval workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    pub id: CircuitId,
    pub title: String,

    /// Inactive circuits accept no transitions
    #[serde(default)]
    pub is_active: bool,

    /// Ordered flows advance by `order_index`; unordered ones by action target
    #[serde(default = "default_ordered")]
    pub has_ordered_flow: bool,

    pub steps: Vec<Step>,

    #[serde(default)]
    pub actions: Vec<Action>,

    #[serde(default)]
    pub status_items: Vec<StatusItem>,
}

fn default_ordered() -> bool {
    true
}

impl Circuit {
    /// Create an empty, inactive circuit
    pub fn new<I: Into<CircuitId>, T: Into<String>>(
        id: I,
        title: T,
        has_ordered_flow: bool,
    ) -> Self {
        Circuit {
            id: id.into(),
            title: title.into(),
            is_active: false,
            has_ordered_flow,
            steps: Vec::new(),
            actions: Vec::new(),
            status_items: Vec::new(),
        }
    }

    /// Add a step, binding it to this circuit
    pub fn with_step(mut self, mut step: Step) -> Self {
        step.circuit_id = self.id.clone();
        self.steps.push(step);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn with_status_item(mut self, item: StatusItem) -> Self {
        self.status_items.push(item);
        self
    }

    pub fn activated(mut self) -> Self {
        self.is_active = true;
        self
    }

    pub fn step(&self, step_id: &StepId) -> Option<&Step> {
        self.steps.iter().find(|s| &s.id == step_id)
    }

    /// Step with the lowest `order_index`, where new documents start
    pub fn first_step(&self) -> Option<&Step> {
        self.steps.iter().min_by_key(|s| s.order_index)
    }

    /// All steps sorted by `order_index`
    pub fn steps_in_order(&self) -> Vec<&Step> {
        let mut steps: Vec<&Step> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.order_index);
        steps
    }

    pub fn final_steps(&self) -> Vec<&Step> {
        self.steps.iter().filter(|s| s.is_final_step).collect()
    }

    pub fn action(&self, action_id: &ActionId) -> Option<&Action> {
        self.actions.iter().find(|a| &a.id == action_id)
    }

    /// Actions offered on a step, in definition order
    pub fn actions_for_step(&self, step_id: &StepId) -> Vec<&Action> {
        self.actions.iter().filter(|a| &a.step_id == step_id).collect()
    }

    pub fn status_item(&self, item_id: &StatusItemId) -> Option<&StatusItem> {
        self.status_items.iter().find(|i| &i.id == item_id)
    }

    /// Checklist items defined on a step, in definition order
    pub fn status_items_for_step(&self, step_id: &StepId) -> Vec<&StatusItem> {
        self.status_items.iter().filter(|i| &i.step_id == step_id).collect()
    }

    /// Static well-formedness check
    ///
    /// Multiple final steps are allowed; the only invariant on final steps is
    /// that move-to-next never leaves them, which the graph enforces at
    /// runtime.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(self.malformed("circuit has no steps"));
        }

        let mut step_ids = HashSet::new();
        let mut step_keys = HashSet::new();
        let mut order_indexes = HashSet::new();

        for step in &self.steps {
            if step.circuit_id != self.id {
                return Err(self.malformed(format!(
                    "step '{}' belongs to circuit '{}'",
                    step.id, step.circuit_id
                )));
            }
            if !step_ids.insert(&step.id) {
                return Err(self.malformed(format!("duplicate step id '{}'", step.id)));
            }
            if !step_keys.insert(&step.step_key) {
                return Err(self.malformed(format!("duplicate step key '{}'", step.step_key)));
            }
            if !order_indexes.insert(step.order_index) {
                return Err(self.malformed(format!("duplicate order index {}", step.order_index)));
            }
        }

        let mut action_ids = HashSet::new();
        for action in &self.actions {
            if !action_ids.insert(&action.id) {
                return Err(self.malformed(format!("duplicate action id '{}'", action.id)));
            }
            if !step_ids.contains(&action.step_id) {
                return Err(self.malformed(format!(
                    "action '{}' references unknown step '{}'",
                    action.id, action.step_id
                )));
            }
            if let Some(target) = &action.target_step_id {
                if !step_ids.contains(target) {
                    return Err(self.malformed(format!(
                        "action '{}' targets unknown step '{}'",
                        action.id, target
                    )));
                }
            }
        }

        let mut item_ids = HashSet::new();
        for item in &self.status_items {
            if !item_ids.insert(&item.id) {
                return Err(self.malformed(format!("duplicate status item id '{}'", item.id)));
            }
            if !step_ids.contains(&item.step_id) {
                return Err(self.malformed(format!(
                    "status item '{}' references unknown step '{}'",
                    item.id, item.step_id
                )));
            }
        }

        Ok(())
    }

    pub(crate) fn malformed<R: Into<String>>(&self, reason: R) -> WorkflowError {
        WorkflowError::MalformedCircuit {
            circuit_id: self.id.clone(),
            reason: reason.into(),
        }
    }
}
