//! Audit trail entries and the acting identity.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Identity supplied by the authentication collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub label: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// The literal actor used when no identity is available.
    pub fn system() -> Self {
        Self::new("system", "sistema")
    }

    /// Resolves an optional identity, defaulting to [`Actor::system`].
    pub fn or_system(actor: Option<&Actor>) -> Self {
        actor.cloned().unwrap_or_else(Self::system)
    }
}

/// One append-only change-log entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChangeLogEntry {
    pub timestamp: Timestamp,
    pub actor_id: String,
    pub actor_label: String,
    pub action: String,
    pub detail: String,
}

impl ChangeLogEntry {
    pub fn new(
        timestamp: Timestamp,
        actor: &Actor,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            actor_id: actor.id.clone(),
            actor_label: actor.label.clone(),
            action: action.into(),
            detail: detail.into(),
        }
    }
}
