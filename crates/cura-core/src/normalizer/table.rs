//! Candidate-key table for every entity kind.
//!
//! This is the only place that knows which wire keys feed which view-model
//! field. Each semantic candidate implicitly covers its numeric hash keys
//! (see [`super::hash`]), so a backend schema change touches this table and
//! nothing else.

use super::hash::{hash_key_forms, is_numeric_key};
use crate::models::EntityKind;

/// Value used when no candidate key is present.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldDefault {
    Text(&'static str),
    /// Reuse another field's resolved text.
    SameAs(&'static str),
    Number(f64),
    Count(u32),
    Flag(bool),
    EmptyList,
    /// 1970-01-01 / Unix epoch.
    Epoch,
    /// Synthesize a client-side id.
    Synthesize,
}

/// One view-model field and where to find it on the wire.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// Semantic candidates in priority order.
    pub keys: &'static [&'static str],
    pub default: FieldDefault,
}

const fn field(
    name: &'static str,
    keys: &'static [&'static str],
    default: FieldDefault,
) -> FieldSpec {
    FieldSpec { name, keys, default }
}

/// All field specs of one entity kind.
#[derive(Debug)]
pub struct FieldTable {
    pub kind: EntityKind,
    pub fields: &'static [FieldSpec],
}

impl FieldTable {
    /// Table for an entity kind.
    pub fn for_kind(kind: EntityKind) -> &'static FieldTable {
        match kind {
            EntityKind::Doctor => &DOCTOR,
            EntityKind::Medicine => &MEDICINE,
            EntityKind::Appointment => &APPOINTMENT,
            EntityKind::Order => &ORDER,
            EntityKind::WellnessLog => &WELLNESS_LOG,
            EntityKind::MedicationReminder => &MEDICATION_REMINDER,
        }
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Field fed by a wire key, either a semantic candidate or one of its
    /// hash spellings.
    pub fn field_for_key(&self, key: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| {
            f.keys.iter().any(|candidate| {
                *candidate == key
                    || (!is_numeric_key(candidate)
                        && hash_key_forms(candidate).iter().any(|form| form == key))
            })
        })
    }

    pub fn id_field(&self) -> &'static FieldSpec {
        self.fields
            .iter()
            .find(|f| f.name == "id")
            .unwrap_or(&FALLBACK_ID)
    }
}

static FALLBACK_ID: FieldSpec = field("id", &["id"], FieldDefault::Synthesize);

use FieldDefault::*;

pub static DOCTOR: FieldTable = FieldTable {
    kind: EntityKind::Doctor,
    fields: &[
        field("id", &["doctor_id", "id"], Synthesize),
        field("name", &["name", "doctor_name"], Text("Unknown Doctor")),
        field("specialty", &["specialty"], Text("General")),
        field("rating", &["rating"], Number(0.0)),
        field("reviews", &["reviews", "review_count"], Count(0)),
        field("experience_years", &["experience_years", "experience"], Count(0)),
        field("location", &["location"], Text("")),
        field("consultation_fee", &["consultation_fee", "price"], Number(0.0)),
        field("qualifications", &["qualifications", "qualification"], Text("")),
        field("bio", &["bio"], Text("")),
        field("languages", &["languages"], EmptyList),
        field("available_days", &["available_days"], EmptyList),
        field("available_slots", &["available_slots", "availability"], EmptyList),
        field("image_url", &["image_url", "image"], Text("")),
        field("created_at", &["created_at"], Epoch),
    ],
};

pub static MEDICINE: FieldTable = FieldTable {
    kind: EntityKind::Medicine,
    fields: &[
        field("id", &["medicine_id", "id"], Synthesize),
        field("name", &["name"], Text("Unknown Medicine")),
        field("generic_name", &["generic_name"], SameAs("name")),
        field("category", &["category"], Text("general")),
        field("dosage", &["dosage"], Text("N/A")),
        field("price", &["price"], Number(0.0)),
        field("stock", &["stock"], Count(0)),
        field("manufacturer", &["manufacturer"], Text("Unknown")),
        // Permissive when missing; pending product-owner confirmation.
        field(
            "prescription_required",
            &["prescription_required", "requires_prescription"],
            Flag(false),
        ),
        field(
            "description",
            &["description"],
            Text("Medicine description not available."),
        ),
        field(
            "active_ingredients",
            &["active_ingredients", "active_ingredient"],
            EmptyList,
        ),
        field("image_url", &["image_url", "image"], Text("")),
        field("created_at", &["created_at"], Epoch),
    ],
};

pub static APPOINTMENT: FieldTable = FieldTable {
    kind: EntityKind::Appointment,
    fields: &[
        field("id", &["appointment_id", "id"], Synthesize),
        field("user_id", &["user_id"], Text("")),
        field("doctor_id", &["doctor_id"], Text("")),
        field("doctor_name", &["doctor_name", "doctor"], Text("Unknown Doctor")),
        field("specialty", &["specialty", "doctor_specialty"], Text("General")),
        field("symptoms", &["symptoms", "patient_symptoms"], Text("")),
        field("date", &["date", "appointment_date"], Epoch),
        field("time", &["time", "appointment_time"], Text("00:00")),
        field("location", &["location", "clinic_location"], Text("TBD")),
        field("status", &["status"], Text("pending")),
        field("urgency", &["urgency"], Text("normal")),
        field("created_at", &["created_at"], Epoch),
    ],
};

pub static ORDER: FieldTable = FieldTable {
    kind: EntityKind::Order,
    fields: &[
        field("id", &["order_id", "id"], Synthesize),
        field("user_id", &["user_id"], Text("")),
        field("medicine_id", &["medicine_id", "medicineId"], Text("")),
        field(
            "medicine_name",
            &["medicine_name", "medicineName"],
            Text("Unknown Medicine"),
        ),
        field("quantity", &["quantity", "qty"], Count(1)),
        field("total_price", &["total_price", "totalPrice", "price"], Number(0.0)),
        field("status", &["status"], Text("pending")),
        field("order_date", &["order_date", "orderDate", "created_at"], Epoch),
        field(
            "pharmacy_name",
            &["pharmacy_name", "pharmacyName"],
            Text("HealthPlus Pharmacy"),
        ),
        field("prescription_id", &["prescription_id"], Text("")),
    ],
};

pub static WELLNESS_LOG: FieldTable = FieldTable {
    kind: EntityKind::WellnessLog,
    fields: &[
        field("id", &["log_id", "id"], Synthesize),
        field("user_id", &["user_id"], Text("")),
        field("date", &["date"], Epoch),
        field("sleep", &["sleep", "sleep_hours"], Number(0.0)),
        field("steps", &["steps"], Count(0)),
        field("water_intake", &["water_intake", "water"], Number(0.0)),
        field("mood", &["mood"], Text("Unknown")),
        field("exercise", &["exercise"], Text("Not logged")),
        field("created_at", &["created_at", "timestamp"], Epoch),
    ],
};

pub static MEDICATION_REMINDER: FieldTable = FieldTable {
    kind: EntityKind::MedicationReminder,
    fields: &[
        field("id", &["reminder_id", "id"], Synthesize),
        field("user_id", &["user_id"], Text("")),
        field(
            "medicine",
            &["medicine", "medication", "medicine_name"],
            Text("Unknown Medication"),
        ),
        field("dosage", &["dosage", "dose"], Text("N/A")),
        field("time", &["time", "reminder_time"], Text("00:00")),
        field("frequency", &["frequency", "repeat_frequency"], Text("Daily")),
        field("active", &["active", "is_active"], Flag(true)),
        field("status", &["status"], Text("pending")),
        field("created_at", &["created_at"], Epoch),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_an_id_field() {
        for kind in EntityKind::ALL {
            let table = FieldTable::for_kind(kind);
            assert_eq!(table.kind, kind);
            let id = table.id_field();
            assert_eq!(id.name, "id");
            assert!(matches!(id.default, FieldDefault::Synthesize));
            assert!(id.keys.contains(&"id"));
        }
    }

    #[test]
    fn test_field_names_are_candidates() {
        // Serialized view models must normalize back onto themselves, so
        // every field name is itself a candidate key.
        for kind in EntityKind::ALL {
            for spec in FieldTable::for_kind(kind).fields {
                assert!(
                    spec.keys.contains(&spec.name),
                    "{}.{} is not listed among its own candidates",
                    kind,
                    spec.name
                );
            }
        }
    }

    #[test]
    fn test_field_for_key() {
        assert_eq!(DOCTOR.field_for_key("price").map(|f| f.name), Some("consultation_fee"));
        assert_eq!(MEDICINE.field_for_key("1_224_700_491").map(|f| f.name), Some("name"));
        assert_eq!(MEDICINE.field_for_key("_1224700491_").map(|f| f.name), Some("name"));
        assert!(MEDICINE.field_for_key("colour").is_none());
    }

    #[test]
    fn test_field_names_unique() {
        for kind in EntityKind::ALL {
            let fields = FieldTable::for_kind(kind).fields;
            for (i, a) in fields.iter().enumerate() {
                assert!(fields[i + 1..].iter().all(|b| b.name != a.name));
            }
        }
    }
}
