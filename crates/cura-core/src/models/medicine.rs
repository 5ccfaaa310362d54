//! Pharmacy catalog models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{category_slug, Entity, EntityId, EntityKind};
use crate::normalizer::RecordReader;
use crate::projection::{SortField, SortValue};

/// A medicine offered by the pharmacy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medicine {
    pub id: EntityId,
    pub name: String,
    /// Generic name; the brand name when the backend has none
    pub generic_name: String,
    /// Slug form, e.g. "pain-relief"
    pub category: String,
    pub dosage: String,
    pub price: f64,
    pub stock: u32,
    pub manufacturer: String,
    pub prescription_required: bool,
    pub description: String,
    pub active_ingredients: Vec<String>,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl Medicine {
    /// Whether an order of `quantity` can be served from current stock.
    pub fn can_fulfil(&self, quantity: u32) -> bool {
        quantity > 0 && quantity <= self.stock
    }
}

impl Entity for Medicine {
    const KIND: EntityKind = EntityKind::Medicine;

    fn from_record(r: &RecordReader<'_>) -> Self {
        Self {
            id: r.id(),
            name: r.text("name"),
            generic_name: r.text("generic_name"),
            category: category_slug(&r.text("category")),
            dosage: r.text("dosage"),
            price: r.number("price"),
            stock: r.count("stock"),
            manufacturer: r.text("manufacturer"),
            prescription_required: r.flag("prescription_required"),
            description: r.text("description"),
            active_ingredients: r.list("active_ingredients"),
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
            self.generic_name.as_str(),
            self.category.as_str(),
            self.manufacturer.as_str(),
        ]
    }

    fn category(&self) -> Option<&str> {
        Some(&self.category)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn in_stock(&self) -> bool {
        self.stock > 0
    }

    fn sort_value(&self, field: SortField) -> Option<SortValue> {
        match field {
            SortField::Name => Some(SortValue::text(&self.name)),
            SortField::Price => Some(SortValue::Number(self.price)),
            SortField::Stock => Some(SortValue::Number(f64::from(self.stock))),
            SortField::Timestamp => Some(SortValue::Time(self.created_at)),
            SortField::Rating | SortField::Date => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use serde_json::json;

    #[test]
    fn test_hash_keyed_record() {
        let raw = json!({
            "1_098_344_064": "med-001",
            "1_224_700_491": "Paracetamol",
            "1_026_369_715": "Acetaminophen",
            "2_909_547_262": "Pain Relief",
            "829_945_655": "500mg",
            "3_364_572_809": 5.99,
            "2_216_036_054": 150,
            "341_121_617": "HealthPlus",
            "3_699_773_643": false,
            "819_652_970": "Acetaminophen 500mg"
        });
        let med: Medicine = Normalizer::new().normalize_as(raw.as_object().unwrap());

        assert_eq!(med.id, EntityId::authoritative("med-001"));
        assert_eq!(med.name, "Paracetamol");
        assert_eq!(med.generic_name, "Acetaminophen");
        assert_eq!(med.category, "pain-relief");
        assert_eq!(med.price, 5.99);
        assert_eq!(med.stock, 150);
        assert!(!med.prescription_required);
        assert_eq!(med.active_ingredients, vec!["Acetaminophen 500mg"]);
        assert_eq!(med.description, "Medicine description not available.");
    }

    #[test]
    fn test_can_fulfil() {
        let mut med: Medicine = Normalizer::new().normalize_as(&Default::default());
        med.stock = 3;
        assert!(med.can_fulfil(3));
        assert!(!med.can_fulfil(4));
        assert!(!med.can_fulfil(0));
    }
}
