//! Entity identity and kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Marker carried by synthesized ids once serialized.
const SYNTHESIZED_MARKER: &str = "local:";

/// The backend entity kinds this layer normalizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Doctor,
    Medicine,
    Appointment,
    Order,
    WellnessLog,
    MedicationReminder,
}

impl EntityKind {
    pub const ALL: [EntityKind; 6] = [
        EntityKind::Doctor,
        EntityKind::Medicine,
        EntityKind::Appointment,
        EntityKind::Order,
        EntityKind::WellnessLog,
        EntityKind::MedicationReminder,
    ];

    /// Stable lower-case name, also used as the cache namespace for mirrored
    /// collections.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Doctor => "doctor",
            EntityKind::Medicine => "medicine",
            EntityKind::Appointment => "appointment",
            EntityKind::Order => "order",
            EntityKind::WellnessLog => "wellness_log",
            EntityKind::MedicationReminder => "medication_reminder",
        }
    }

    /// Prefix for synthesized ids of this kind.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::Doctor => "doc",
            EntityKind::Medicine => "med",
            EntityKind::Appointment => "apt",
            EntityKind::Order => "ord",
            EntityKind::WellnessLog => "log",
            EntityKind::MedicationReminder => "rem",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a normalized entity.
///
/// Authoritative ids come from the backend. Synthesized ids are generated on
/// the client for list rendering and optimistic creates, and must never be
/// sent back to the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "StoredId", into = "StoredId")]
pub enum EntityId {
    Authoritative(String),
    Synthesized(String),
}

impl EntityId {
    pub fn authoritative(id: impl Into<String>) -> Self {
        EntityId::Authoritative(id.into())
    }

    /// Generate a fresh `<prefix>_<timestamp>_<random>` id.
    pub fn synthesize(kind: EntityKind) -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        let simple = uuid::Uuid::new_v4().simple().to_string();
        EntityId::Synthesized(format!("{}_{}_{}", kind.id_prefix(), millis, &simple[..8]))
    }

    pub fn is_synthesized(&self) -> bool {
        matches!(self, EntityId::Synthesized(_))
    }

    /// The raw id text, regardless of origin.
    pub fn as_str(&self) -> &str {
        match self {
            EntityId::Authoritative(id) | EntityId::Synthesized(id) => id,
        }
    }

    /// The id as the service knows it, `None` for synthesized ids.
    pub fn service_id(&self) -> Option<&str> {
        match self {
            EntityId::Authoritative(id) => Some(id),
            EntityId::Synthesized(_) => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored form of an [`EntityId`]. Only this path reads the synthesized
/// marker; ids off the wire are always authoritative.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
struct StoredId(String);

impl From<StoredId> for EntityId {
    fn from(stored: StoredId) -> Self {
        match stored.0.strip_prefix(SYNTHESIZED_MARKER) {
            Some(rest) => EntityId::Synthesized(rest.to_string()),
            None => EntityId::Authoritative(stored.0),
        }
    }
}

impl From<EntityId> for StoredId {
    fn from(id: EntityId) -> Self {
        match id {
            EntityId::Authoritative(id) => StoredId(id),
            EntityId::Synthesized(id) => StoredId(format!("{}{}", SYNTHESIZED_MARKER, id)),
        }
    }
}
