// Circuit graph - step succession over an immutable circuit definition

//! # Circuit Graph
//!
//! [`CircuitGraph`] answers one question: *which step follows (or precedes)
//! step X?* It borrows a [`Circuit`] and never mutates it.
//!
//! ## Ordered vs unordered flows
//!
//! ```text
//! ordered:    [s0 (0)] ──> [s1 (1)] ──> [s3 (3), final]      next = smallest order_index > current
//!
//! unordered:  [intake] ──action "to_legal"──> [legal]        next = the action's explicit target
//!             [intake] ──action "to_archive"─> [archive]
//! ```
//!
//! In both modes a final step has no successor, and "previous" is always the
//! step with the largest `order_index` below the current one.

use tracing::debug;

use crate::models::{Action, Circuit, Step, StepId};
use crate::{Result, WorkflowError};

/// Read-only view of a circuit's step ordering
#[derive(Debug, Clone, Copy)]
pub struct CircuitGraph<'a> {
    circuit: &'a Circuit,
}

impl<'a> CircuitGraph<'a> {
    /// Build a graph over an active, non-empty circuit
    ///
    /// ## Errors
    /// - `CircuitInactive` if the circuit is not active
    /// - `MalformedCircuit` if the circuit has no steps
    pub fn new(circuit: &'a Circuit) -> Result<Self> {
        if !circuit.is_active {
            return Err(WorkflowError::CircuitInactive {
                circuit_id: circuit.id.clone(),
            });
        }
        if circuit.steps.is_empty() {
            return Err(circuit.malformed("circuit has no steps"));
        }

        Ok(CircuitGraph { circuit })
    }

    pub fn circuit(&self) -> &'a Circuit {
        self.circuit
    }

    /// Look up a step the document is known to be on
    ///
    /// A state pointing at a step the circuit no longer defines is a
    /// configuration problem, not a caller mistake.
    pub fn step(&self, step_id: &StepId) -> Result<&'a Step> {
        self.circuit
            .step(step_id)
            .ok_or_else(|| self.circuit.malformed(format!("unknown step '{}'", step_id)))
    }

    /// Entry step for newly assigned documents
    pub fn first_step(&self) -> Result<&'a Step> {
        self.circuit
            .first_step()
            .ok_or_else(|| self.circuit.malformed("circuit has no steps"))
    }

    /// Step following `current` by order index
    ///
    /// Returns `None` when `current` is final or nothing comes after it.
    pub fn next_step(&self, current: &Step) -> Option<&'a Step> {
        if current.is_final_step {
            return None;
        }

        self.circuit
            .steps
            .iter()
            .filter(|s| s.order_index > current.order_index)
            .min_by_key(|s| s.order_index)
    }

    /// Step preceding `current` by order index, `None` at the first step
    pub fn previous_step(&self, current: &Step) -> Option<&'a Step> {
        self.circuit
            .steps
            .iter()
            .filter(|s| s.order_index < current.order_index)
            .max_by_key(|s| s.order_index)
    }

    /// Resolve where an approval of `action` on `current` leads
    ///
    /// `Ok(None)` means the approval completes the workflow (current step is
    /// final). A non-final step without a successor is a malformed circuit.
    pub fn approve_target(&self, current: &Step, action: &Action) -> Result<Option<&'a Step>> {
        if current.is_final_step {
            return Ok(None);
        }

        let target = if self.circuit.has_ordered_flow {
            self.next_step(current)
        } else {
            match &action.target_step_id {
                Some(target_id) => Some(self.step(target_id)?),
                None => None,
            }
        };

        match target {
            Some(step) => {
                debug!(
                    circuit_id = %self.circuit.id,
                    from = %current.id,
                    to = %step.id,
                    ordered = self.circuit.has_ordered_flow,
                    "Resolved approve target"
                );
                Ok(Some(step))
            }
            None => Err(self.circuit.malformed(format!(
                "step '{}' is not final but has no successor for action '{}'",
                current.id, action.id
            ))),
        }
    }
}
