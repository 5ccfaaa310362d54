//! Doctor directory models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};
use crate::normalizer::RecordReader;
use crate::projection::{SortField, SortValue};

/// A bookable doctor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub id: EntityId,
    pub name: String,
    pub specialty: String,
    /// Average rating, 0-5
    pub rating: f64,
    pub reviews: u32,
    pub experience_years: u32,
    pub location: String,
    pub consultation_fee: f64,
    pub qualifications: String,
    pub bio: String,
    pub languages: Vec<String>,
    pub available_days: Vec<String>,
    /// "HH:MM" slot starts
    pub available_slots: Vec<String>,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl Doctor {
    /// Check if the doctor offers a slot on the given weekday at the given time.
    pub fn offers_slot(&self, day: &str, time: &str) -> bool {
        let day_ok = self.available_days.is_empty()
            || self
                .available_days
                .iter()
                .any(|d| d.eq_ignore_ascii_case(day));
        day_ok && self.available_slots.iter().any(|s| s == time)
    }
}

impl Entity for Doctor {
    const KIND: EntityKind = EntityKind::Doctor;

    fn from_record(r: &RecordReader<'_>) -> Self {
        Self {
            id: r.id(),
            name: r.text("name"),
            specialty: r.text("specialty"),
            rating: r.number("rating"),
            reviews: r.count("reviews"),
            experience_years: r.count("experience_years"),
            location: r.text("location"),
            consultation_fee: r.number("consultation_fee"),
            qualifications: r.text("qualifications"),
            bio: r.text("bio"),
            languages: r.list("languages"),
            available_days: r.list("available_days"),
            available_slots: r.list("available_slots"),
            image_url: r.text("image_url"),
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
        vec![
            self.name.as_str(),
            self.specialty.as_str(),
            self.location.as_str(),
        ]
    }

    fn category(&self) -> Option<&str> {
        Some(&self.specialty)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn sort_value(&self, field: SortField) -> Option<SortValue> {
        match field {
            SortField::Name => Some(SortValue::text(&self.name)),
            SortField::Price => Some(SortValue::Number(self.consultation_fee)),
            SortField::Rating => Some(SortValue::Number(self.rating)),
            SortField::Timestamp => Some(SortValue::Time(self.created_at)),
            SortField::Stock | SortField::Date => None,
        }
    }
}
