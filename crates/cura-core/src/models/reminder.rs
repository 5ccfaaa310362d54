//! Medication reminder models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};
use crate::normalizer::RecordReader;
use crate::projection::{SortField, SortValue};

/// A recurring reminder to take a medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationReminder {
    pub id: EntityId,
    pub user_id: String,
    pub medicine: String,
    pub dosage: String,
    /// "HH:MM"
    pub time: String,
    pub frequency: String,
    pub active: bool,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for MedicationReminder {
    const KIND: EntityKind = EntityKind::MedicationReminder;

    fn from_record(r: &RecordReader<'_>) -> Self {
        Self {
            id: r.id(),
            user_id: r.text("user_id"),
            medicine: r.text("medicine"),
            dosage: r.text("dosage"),
            time: r.text("time"),
            frequency: r.text("frequency"),
            active: r.flag("active"),
            status: r.text("status"),
            created_at: r.timestamp("created_at"),
        }
    }

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.medicine.as_str(), self.dosage.as_str()]
    }

    fn status(&self) -> Option<&str> {
        Some(&self.status)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn sort_value(&self, field: SortField) -> Option<SortValue> {
        match field {
            SortField::Name => Some(SortValue::text(&self.medicine)),
            // "HH:MM" sorts lexically
            SortField::Date => Some(SortValue::text(&self.time)),
            SortField::Timestamp => Some(SortValue::Time(self.created_at)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use serde_json::json;

    #[test]
    fn test_active_defaults_true() {
        let raw = json!({ "medication": "Metformin", "dose": "500mg" });
        let reminder: MedicationReminder =
            Normalizer::new().normalize_as(raw.as_object().unwrap());

        assert_eq!(reminder.medicine, "Metformin");
        assert_eq!(reminder.dosage, "500mg");
        assert_eq!(reminder.time, "00:00");
        assert_eq!(reminder.frequency, "Daily");
        assert!(reminder.active);
    }

    #[test]
    fn test_created_at_in_millis_string() {
        let raw = json!({ "created_at": "1755772200000" });
        let reminder: MedicationReminder =
            Normalizer::new().normalize_as(raw.as_object().unwrap());
        assert_eq!(reminder.created_at.timestamp(), 1_755_772_200);
    }
}
