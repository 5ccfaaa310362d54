//! Domain models for the Cura view layer.

mod appointment;
mod cart;
mod chat;
mod doctor;
mod id;
mod medicine;
mod order;
mod reminder;
mod wellness;

pub use appointment::*;
pub use cart::*;
pub use chat::*;
pub use doctor::*;
pub use id::*;
pub use medicine::*;
pub use order::*;
pub use reminder::*;
pub use wellness::*;

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::normalizer::RecordReader;
use crate::projection::{SortField, SortValue};

/// A fully-typed, fully-defaulted view model built from one raw record.
pub trait Entity: Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned {
    const KIND: EntityKind;

    /// Build the entity from a raw record. Never fails.
    fn from_record(record: &RecordReader<'_>) -> Self;

    fn id(&self) -> &EntityId;

    fn set_id(&mut self, id: EntityId);

    /// Fields matched by free-text search.
    fn search_fields(&self) -> Vec<&str>;

    /// Category or specialty used by equality filters.
    fn category(&self) -> Option<&str> {
        None
    }

    fn status(&self) -> Option<&str> {
        None
    }

    /// Calendar date the entity is about (log day, appointment day).
    fn date(&self) -> Option<NaiveDate> {
        None
    }

    /// Creation or log timestamp used by "recent" sorts.
    fn timestamp(&self) -> DateTime<Utc>;

    fn in_stock(&self) -> bool {
        true
    }

    fn sort_value(&self, field: SortField) -> Option<SortValue>;
}

/// Any normalized entity, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedEntity {
    Doctor(Doctor),
    Medicine(Medicine),
    Appointment(Appointment),
    Order(Order),
    WellnessLog(WellnessLogEntry),
    MedicationReminder(MedicationReminder),
}

impl NormalizedEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            NormalizedEntity::Doctor(_) => EntityKind::Doctor,
            NormalizedEntity::Medicine(_) => EntityKind::Medicine,
            NormalizedEntity::Appointment(_) => EntityKind::Appointment,
            NormalizedEntity::Order(_) => EntityKind::Order,
            NormalizedEntity::WellnessLog(_) => EntityKind::WellnessLog,
            NormalizedEntity::MedicationReminder(_) => EntityKind::MedicationReminder,
        }
    }

    pub fn id(&self) -> &EntityId {
        match self {
            NormalizedEntity::Doctor(e) => e.id(),
            NormalizedEntity::Medicine(e) => e.id(),
            NormalizedEntity::Appointment(e) => e.id(),
            NormalizedEntity::Order(e) => e.id(),
            NormalizedEntity::WellnessLog(e) => e.id(),
            NormalizedEntity::MedicationReminder(e) => e.id(),
        }
    }

    pub(crate) fn read(kind: EntityKind, record: &RecordReader<'_>) -> Self {
        match kind {
            EntityKind::Doctor => NormalizedEntity::Doctor(Doctor::from_record(record)),
            EntityKind::Medicine => NormalizedEntity::Medicine(Medicine::from_record(record)),
            EntityKind::Appointment => {
                NormalizedEntity::Appointment(Appointment::from_record(record))
            }
            EntityKind::Order => NormalizedEntity::Order(Order::from_record(record)),
            EntityKind::WellnessLog => {
                NormalizedEntity::WellnessLog(WellnessLogEntry::from_record(record))
            }
            EntityKind::MedicationReminder => {
                NormalizedEntity::MedicationReminder(MedicationReminder::from_record(record))
            }
        }
    }
}

/// Case-insensitive category comparison where spaces and hyphens are
/// interchangeable ("Pain Relief" == "pain-relief").
pub fn category_slug(category: &str) -> String {
    category
        .split(|c: char| c.is_whitespace() || c == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_slug() {
        assert_eq!(category_slug("Pain Relief"), "pain-relief");
        assert_eq!(category_slug("pain-relief"), "pain-relief");
        assert_eq!(category_slug("  Mental   Health "), "mental-health");
        assert_eq!(category_slug(""), "");
    }
}
