//! Pharmacy order models.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Entity, EntityId, EntityKind};
use crate::normalizer::RecordReader;
use crate::projection::{SortField, SortValue};

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Processing,
    Ready,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// Parse a wire status; anything unrecognized is treated as pending.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "processing" | "confirmed" => OrderStatus::Processing,
            "ready" => OrderStatus::Ready,
            "delivered" | "completed" => OrderStatus::Delivered,
            "cancelled" | "canceled" => OrderStatus::Cancelled,
            _ => OrderStatus::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Ready => "ready",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// A medicine order placed by the patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub id: EntityId,
    pub user_id: String,
    pub medicine_id: String,
    pub medicine_name: String,
    pub quantity: u32,
    pub total_price: f64,
    pub status: OrderStatus,
    pub order_date: NaiveDate,
    pub pharmacy_name: String,
    /// Empty when the medicine is over-the-counter
    pub prescription_id: String,
}

impl Entity for Order {
    const KIND: EntityKind = EntityKind::Order;

    fn from_record(r: &RecordReader<'_>) -> Self {
        Self {
            id: r.id(),
            user_id: r.text("user_id"),
            medicine_id: r.text("medicine_id"),
            medicine_name: r.text("medicine_name"),
            quantity: r.count("quantity"),
            total_price: r.number("total_price"),
            status: OrderStatus::parse(&r.text("status")),
            order_date: r.date("order_date"),
            pharmacy_name: r.text("pharmacy_name"),
            prescription_id: r.text("prescription_id"),
        }
    }

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_id(&mut self, id: EntityId) {
        self.id = id;
    }

    fn search_fields(&self) -> Vec<&str> {
        vec![self.medicine_name.as_str(), self.pharmacy_name.as_str()]
    }

    fn status(&self) -> Option<&str> {
        Some(self.status.as_str())
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.order_date)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.order_date.and_time(NaiveTime::MIN).and_utc()
    }

    fn sort_value(&self, field: SortField) -> Option<SortValue> {
        match field {
            SortField::Name => Some(SortValue::text(&self.medicine_name)),
            SortField::Price => Some(SortValue::Number(self.total_price)),
            SortField::Date | SortField::Timestamp => Some(SortValue::Time(self.timestamp())),
            SortField::Rating | SortField::Stock => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;
    use serde_json::json;

    #[test]
    fn test_camel_case_fallbacks() {
        let raw = json!({
            "id": "ord-9",
            "medicineId": "2",
            "medicineName": "Amoxicillin 250mg",
            "qty": 2,
            "totalPrice": "25.00",
            "status": "ready",
            "orderDate": "2025-08-20"
        });
        let order: Order = Normalizer::new().normalize_as(raw.as_object().unwrap());

        assert_eq!(order.medicine_id, "2");
        assert_eq!(order.quantity, 2);
        assert_eq!(order.total_price, 25.0);
        assert_eq!(order.status, OrderStatus::Ready);
        assert_eq!(order.order_date, NaiveDate::from_ymd_opt(2025, 8, 20).unwrap());
        assert_eq!(order.pharmacy_name, "HealthPlus Pharmacy");
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        let order: Order = Normalizer::new().normalize_as(&Default::default());
        assert_eq!(order.quantity, 1);
        assert_eq!(order.status, OrderStatus::Pending);
    }
}
