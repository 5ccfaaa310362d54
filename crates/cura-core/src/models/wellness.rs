//! Wellness tracking models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};
use crate::normalizer::RecordReader;
use crate::projection::{SortField, SortValue};

/// Placeholder mood when none was logged.
pub const UNKNOWN_MOOD: &str = "Unknown";
/// Placeholder exercise when none was logged.
pub const NO_EXERCISE: &str = "Not logged";

/// One day's wellness log.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WellnessLogEntry {
    pub id: EntityId,
    pub user_id: String,
    pub date: NaiveDate,
    /// Hours slept
    pub sleep: f64,
    pub steps: u32,
    /// Glasses of water
    pub water_intake: f64,
    pub mood: String,
    pub exercise: String,
    pub created_at: DateTime<Utc>,
}

impl WellnessLogEntry {
    pub fn has_exercise(&self) -> bool {
        !self.exercise.trim().is_empty() && self.exercise != NO_EXERCISE
    }

    pub fn has_mood(&self) -> bool {
        !self.mood.trim().is_empty() && self.mood != UNKNOWN_MOOD
    }

    /// Render the log as the sentence the health agent understands.
    pub fn to_chat_message(&self) -> String {
        let mut parts = Vec::new();
        if self.sleep > 0.0 {
            parts.push(format!("slept {} hours", self.sleep));
        }
        if self.steps > 0 {
            parts.push(format!("walked {} steps", self.steps));
        }
        if self.water_intake > 0.0 {
            parts.push(format!("drank {} glasses of water", self.water_intake));
        }
        if self.has_mood() {
            parts.push(format!("feeling {}", self.mood));
        }
        if self.has_exercise() {
            parts.push(format!("exercise: {}", self.exercise));
        }

        if parts.is_empty() {
            "Wellness data logged".to_string()
        } else {
            format!("Today I {}.", parts.join(", "))
        }
    }
}

impl Entity for WellnessLogEntry {
    const KIND: EntityKind = EntityKind::WellnessLog;

    fn from_record(r: &RecordReader<'_>) -> Self {
        Self {
            id: r.id(),
            user_id: r.text("user_id"),
            date: r.date("date"),
            sleep: r.number("sleep"),
            steps: r.count("steps"),
            water_intake: r.number("water_intake"),
            mood: r.text("mood"),
            exercise: r.text("exercise"),
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
        vec![self.mood.as_str(), self.exercise.as_str()]
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn sort_value(&self, field: SortField) -> Option<SortValue> {
        match field {
            SortField::Date => Some(SortValue::Slot(self.date, String::new())),
            SortField::Timestamp => Some(SortValue::Time(self.created_at)),
            _ => None,
        }
    }
}
