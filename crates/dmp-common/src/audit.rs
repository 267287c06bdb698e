//! Audit data models
//!
//! The sync core emits audit entries describing what it changed; the
//! surrounding application owns their persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Audit action types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    View,
    Export,
    AlertDispatch,
    ModelChange,
    ConfigChange,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::View => "view",
            Self::Export => "export",
            Self::AlertDispatch => "alert_dispatch",
            Self::ModelChange => "model_change",
            Self::ConfigChange => "config_change",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Unique identifier for the entry
    pub id: Uuid,
    /// Username or system identity that performed the action
    pub actor: String,
    /// Action performed
    pub action: AuditAction,
    /// Type of resource affected
    pub resource_type: String,
    /// ID of the affected resource
    pub resource_id: String,
    /// Human-readable description of the action
    pub description: String,
    /// Resource state before the action
    pub old_values: Option<JsonValue>,
    /// Resource state after the action
    pub new_values: Option<JsonValue>,
    /// Timestamp when the action occurred
    pub timestamp: DateTime<Utc>,
}

impl AuditEntry {
    /// Create a builder for constructing audit entries
    pub fn builder() -> AuditEntryBuilder {
        AuditEntryBuilder::default()
    }
}

/// Builder for creating audit entries
#[derive(Debug, Clone, Default)]
pub struct AuditEntryBuilder {
    actor: Option<String>,
    action: Option<AuditAction>,
    resource_type: Option<String>,
    resource_id: Option<String>,
    description: Option<String>,
    old_values: Option<JsonValue>,
    new_values: Option<JsonValue>,
}

impl AuditEntryBuilder {
    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    pub fn resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn old_values(mut self, old_values: JsonValue) -> Self {
        self.old_values = Some(old_values);
        self
    }

    pub fn new_values(mut self, new_values: JsonValue) -> Self {
        self.new_values = Some(new_values);
        self
    }

    /// Try to build the entry, returning an error if required fields are missing
    pub fn try_build(self) -> Result<AuditEntry, &'static str> {
        let actor = self.actor.ok_or("actor is required")?;
        let action = self.action.ok_or("action is required")?;
        let resource_type = self.resource_type.ok_or("resource_type is required")?;

        Ok(AuditEntry {
            id: Uuid::new_v4(),
            actor,
            action,
            resource_type,
            resource_id: self.resource_id.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            old_values: self.old_values,
            new_values: self.new_values,
            timestamp: Utc::now(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_action_as_str() {
        assert_eq!(AuditAction::Create.as_str(), "create");
        assert_eq!(AuditAction::ModelChange.as_str(), "model_change");
        assert_eq!(AuditAction::ConfigChange.as_str(), "config_change");
    }

    #[test]
    fn test_action_serialization() {
        let json = serde_json::to_string(&AuditAction::ModelChange).unwrap();
        assert_eq!(json, r#""model_change""#);

        let action: AuditAction = serde_json::from_str(r#""update""#).unwrap();
        assert_eq!(action, AuditAction::Update);
    }

    #[test]
    fn test_audit_entry_builder() {
        let entry = AuditEntry::builder()
            .actor("admin")
            .action(AuditAction::ModelChange)
            .resource_type("DataSync")
            .resource_id("b2c1")
            .description("Synced data source")
            .try_build()
            .unwrap();

        assert_eq!(entry.actor, "admin");
        assert_eq!(entry.action, AuditAction::ModelChange);
        assert_eq!(entry.resource_type, "DataSync");
    }

    #[test]
    fn test_audit_entry_builder_missing_action() {
        let result = AuditEntry::builder().actor("admin").try_build();
        assert!(result.is_err());
    }
}
