//! Appointment models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};
use crate::normalizer::RecordReader;
use crate::projection::{SortField, SortValue};

/// Booking status as reported by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    /// Parse a wire status; anything unrecognized is treated as pending.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "confirmed" | "booked" | "upcoming" => AppointmentStatus::Confirmed,
            "completed" | "done" => AppointmentStatus::Completed,
            "cancelled" | "canceled" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

/// A booked consultation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    pub id: EntityId,
    pub user_id: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub specialty: String,
    pub symptoms: String,
    pub date: NaiveDate,
    /// "HH:MM"
    pub time: String,
    pub location: String,
    pub status: AppointmentStatus,
    pub urgency: String,
    pub created_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether the appointment still needs to happen.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed
        )
    }
}

impl Entity for Appointment {
    const KIND: EntityKind = EntityKind::Appointment;

    fn from_record(r: &RecordReader<'_>) -> Self {
        Self {
            id: r.id(),
            user_id: r.text("user_id"),
            doctor_id: r.text("doctor_id"),
            doctor_name: r.text("doctor_name"),
            specialty: r.text("specialty"),
            symptoms: r.text("symptoms"),
            date: r.date("date"),
            time: r.text("time"),
            location: r.text("location"),
            status: AppointmentStatus::parse(&r.text("status")),
            urgency: r.text("urgency"),
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
            self.doctor_name.as_str(),
            self.specialty.as_str(),
            self.symptoms.as_str(),
            self.location.as_str(),
        ]
    }

    fn category(&self) -> Option<&str> {
        Some(&self.specialty)
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn sort_value(&self, field: SortField) -> Option<SortValue> {
        match field {
            SortField::Name => Some(SortValue::text(&self.doctor_name)),
            SortField::Date => Some(SortValue::Slot(self.date, self.time.clone())),
            SortField::Timestamp => Some(SortValue::Time(self.created_at)),
            SortField::Price | SortField::Rating | SortField::Stock => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use serde_json::json;

    #[test]
    fn test_backend_aliases() {
        let raw = json!({
            "appointment_id": "APT-20250821-ABC123",
            "doctor": "Dr. Bella Rodriguez",
            "doctor_specialty": "Dermatology",
            "patient_symptoms": "Skin rash, itching",
            "appointment_date": "2025-08-23",
            "appointment_time": "14:00",
            "status": "confirmed",
            "created_at": "2025-08-21T08:15:00Z"
        });
        let apt: Appointment = Normalizer::new().normalize_as(raw.as_object().unwrap());

        assert_eq!(apt.id.as_str(), "APT-20250821-ABC123");
        assert_eq!(apt.doctor_name, "Dr. Bella Rodriguez");
        assert_eq!(apt.specialty, "Dermatology");
        assert_eq!(apt.symptoms, "Skin rash, itching");
        assert_eq!(apt.date, NaiveDate::from_ymd_opt(2025, 8, 23).unwrap());
        assert_eq!(apt.time, "14:00");
        assert_eq!(apt.location, "TBD");
        assert_eq!(apt.status, AppointmentStatus::Confirmed);
        assert!(apt.is_open());
    }

    #[test]
    fn test_status_parse() {
        assert_eq!(AppointmentStatus::parse("Canceled"), AppointmentStatus::Cancelled);
        assert_eq!(AppointmentStatus::parse("completed"), AppointmentStatus::Completed);
        assert_eq!(AppointmentStatus::parse("whatever"), AppointmentStatus::Pending);
    }
}
