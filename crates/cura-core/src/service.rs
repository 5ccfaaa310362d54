//! Seams to the backend service and the identity provider.

use serde_json::Value;
use thiserror::Error;

use crate::models::EntityKind;
use crate::normalizer::{FieldTable, RawRecord, RecordReader};

/// Fields that carry the saved record in a commit response.
const RECORD_FIELDS: &[&str] = &["data", "record", "logged_data", "ok"];

/// Failures reported by the service boundary.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl ServiceError {
    /// Map a rejection message onto the error taxonomy.
    pub fn rejected(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_lowercase().contains("not found") {
            ServiceError::NotFound(message)
        } else {
            ServiceError::Validation(message)
        }
    }
}

/// The backend. Responses are untrusted JSON; normalize before use.
#[allow(async_fn_in_trait)]
pub trait ServiceBoundary {
    /// All records of a kind. `hint` selects a sub-listing (for example a
    /// category) where the backend offers one.
    async fn fetch_all(&self, kind: EntityKind, hint: Option<&str>) -> Result<Value, ServiceError>;

    async fn create(&self, kind: EntityKind, payload: &RawRecord) -> Result<Value, ServiceError>;

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        payload: &RawRecord,
    ) -> Result<Value, ServiceError>;

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<Value, ServiceError>;
}

/// Source of the signed-in principal.
pub trait IdentityProvider {
    /// `None` when nobody is signed in.
    fn current_principal(&self) -> Option<String>;
}

/// A fixed principal, or none.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticIdentity(pub Option<String>);

impl StaticIdentity {
    pub fn signed_in(principal: impl Into<String>) -> Self {
        StaticIdentity(Some(principal.into()))
    }

    pub fn anonymous() -> Self {
        StaticIdentity(None)
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_principal(&self) -> Option<String> {
        self.0.clone()
    }
}

/// Normalized reply to a create, update or delete.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommitResponse {
    pub success: bool,
    /// Authoritative id assigned or echoed by the service
    pub id: Option<String>,
    pub message: Option<String>,
    /// Saved record, when the service sends it back
    pub record: Option<RawRecord>,
}

impl CommitResponse {
    /// Read any of the reply shapes the backend produces:
    ///
    /// - `{"success": bool, "message": .., "id": .., "data": {..}}`
    /// - a result variant, `{"ok": ..}` or `{"err": ".."}`
    /// - a bare id string
    /// - nothing at all (`null`), taken as success
    ///
    /// `success` is only false when the reply says so explicitly.
    pub fn from_value(value: &Value, kind: EntityKind) -> Self {
        match value {
            Value::String(id) => CommitResponse {
                success: true,
                id: Some(id.clone()).filter(|id| !id.trim().is_empty()),
                ..Default::default()
            },
            Value::Object(map) => {
                if let Some(err) = map.get("err") {
                    return CommitResponse {
                        success: false,
                        message: Some(text(err).unwrap_or_else(|| err.to_string())),
                        ..Default::default()
                    };
                }

                let success = !matches!(map.get("success"), Some(Value::Bool(false)))
                    && !matches!(map.get("success"), Some(Value::String(s)) if s.eq_ignore_ascii_case("false"));
                let message = ["message", "error"]
                    .iter()
                    .find_map(|key| map.get(*key).and_then(text));
                let record = RECORD_FIELDS
                    .iter()
                    .find_map(|key| map.get(*key).and_then(Value::as_object))
                    .cloned();

                let table = FieldTable::for_kind(kind);
                let id = RecordReader::new(map, table)
                    .wire_id()
                    .or_else(|| match map.get("ok") {
                        Some(Value::String(id)) => Some(id.clone()),
                        _ => None,
                    })
                    .or_else(|| {
                        record
                            .as_ref()
                            .and_then(|r| RecordReader::new(r, table).wire_id())
                    });

                CommitResponse {
                    success,
                    id,
                    message,
                    record,
                }
            }
            _ => CommitResponse {
                success: true,
                ..Default::default()
            },
        }
    }

    /// Turn an explicit rejection into an error.
    pub fn into_result(self) -> Result<Self, ServiceError> {
        if self.success {
            Ok(self)
        } else {
            let message = self
                .message
                .unwrap_or_else(|| "The request was rejected".to_string());
            Err(ServiceError::rejected(message))
        }
    }
}

fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}
