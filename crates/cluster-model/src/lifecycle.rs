//! Lifecycle state machine
//!
//! ```text
//! New -> Validating -> Provisioning(layer 1..N) -> Ready
//!             |               |-> RollingBack
//!             v               `-> Abandoned
//!          Rejected
//! New | Ready -> Destroying -> Destroyed
//! ```

use crate::error::ModelError;
use crate::layer::Layer;
use std::fmt;
use tracing::debug;

/// Phase of one workflow invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    /// Nothing done yet
    New,
    /// Preconditions, session and quota checks
    Validating,
    /// Terminal: a precondition failed before any remote state was touched
    Rejected,
    /// Ensuring the given layer
    Provisioning(Layer),
    /// Every layer is in place
    Ready,
    /// Terminal: tearing down what this invocation created
    RollingBack,
    /// Terminal: failure left resources in place for manual recovery
    Abandoned,
    /// Deleting cluster resources
    Destroying,
    /// Terminal: teardown finished
    Destroyed,
}

impl LifecyclePhase {
    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(self, next: LifecyclePhase) -> bool {
        use LifecyclePhase::*;
        match (self, next) {
            (New, Validating) | (New, Destroying) => true,
            (Validating, Rejected) | (Validating, Provisioning(_)) => true,
            (Provisioning(current), Provisioning(following)) => following > current,
            (Provisioning(_), Ready) | (Provisioning(_), RollingBack) => true,
            (Provisioning(_), Abandoned) => true,
            (Ready, Destroying) | (Destroying, Destroyed) => true,
            _ => false,
        }
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            LifecyclePhase::Rejected
                | LifecyclePhase::RollingBack
                | LifecyclePhase::Abandoned
                | LifecyclePhase::Destroyed
        )
    }
}

impl fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecyclePhase::Provisioning(layer) => write!(f, "Provisioning({layer})"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// Transient, in-memory state of one workflow invocation.
///
/// `created_resource_group` bounds the rollback scope: only what this
/// invocation created may be deleted automatically.
#[derive(Debug, Clone)]
pub struct LifecycleState {
    phase: LifecyclePhase,
    is_update: bool,
    created_resource_group: bool,
    history: Vec<LifecyclePhase>,
}

impl LifecycleState {
    /// Fresh state for a create (`is_update == false`) or update run
    pub fn new(is_update: bool) -> Self {
        Self {
            phase: LifecyclePhase::New,
            is_update,
            created_resource_group: false,
            history: vec![LifecyclePhase::New],
        }
    }

    /// Current phase
    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    /// Whether this run updates an existing cluster
    pub fn is_update(&self) -> bool {
        self.is_update
    }

    /// Whether this run created the resource group
    pub fn created_resource_group(&self) -> bool {
        self.created_resource_group
    }

    /// Record that the resource group was created by this run
    pub fn mark_resource_group_created(&mut self, created: bool) {
        self.created_resource_group = created;
    }

    /// Every phase visited, in order
    pub fn history(&self) -> &[LifecyclePhase] {
        &self.history
    }

    /// Move to `next`, rejecting illegal transitions.
    pub fn advance(&mut self, next: LifecyclePhase) -> Result<(), ModelError> {
        if !self.phase.can_transition_to(next) {
            return Err(ModelError::InvalidTransition {
                from: self.phase.to_string(),
                to: next.to_string(),
            });
        }
        debug!("Lifecycle transition {} -> {}", self.phase, next);
        self.phase = next;
        self.history.push(next);
        Ok(())
    }
}
