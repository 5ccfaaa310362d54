//! Shopping cart kept on the device until checkout.

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{EntityId, Medicine};
use crate::normalizer::RawRecord;

/// One cart line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub medicine: Medicine,
    pub quantity: u32,
}

impl CartItem {
    pub fn line_total(&self) -> f64 {
        self.medicine.price * f64::from(self.quantity)
    }
}

/// Cart contents, one line per medicine id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    pub items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a medicine, merging with an existing line for the same id.
    pub fn add(&mut self, medicine: Medicine, quantity: u32) {
        if quantity == 0 {
            return;
        }
        match self.items.iter_mut().find(|i| i.medicine.id == medicine.id) {
            Some(item) => item.quantity = item.quantity.saturating_add(quantity),
            None => self.items.push(CartItem { medicine, quantity }),
        }
    }

    /// Set a line's quantity; zero removes the line.
    pub fn set_quantity(&mut self, medicine_id: &EntityId, quantity: u32) {
        if quantity == 0 {
            self.remove(medicine_id);
            return;
        }
        if let Some(item) = self.items.iter_mut().find(|i| &i.medicine.id == medicine_id) {
            item.quantity = quantity;
        }
    }

    pub fn remove(&mut self, medicine_id: &EntityId) {
        self.items.retain(|i| &i.medicine.id != medicine_id);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn total_price(&self) -> f64 {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Lines whose quantity exceeds the medicine's known stock.
    pub fn over_stock(&self) -> Vec<&CartItem> {
        self.items
            .iter()
            .filter(|i| !i.medicine.can_fulfil(i.quantity))
            .collect()
    }

    /// One order-create payload per line. Lines for medicines that only
    /// have a synthesized id are skipped; the service cannot resolve them.
    pub fn order_payloads(&self, user_id: &str, pharmacy_name: &str) -> Vec<RawRecord> {
        self.items
            .iter()
            .filter_map(|item| {
                let medicine_id = item.medicine.id.service_id()?;
                let payload = json!({
                    "medicine_id": medicine_id,
                    "medicine_name": format!("{} {}", item.medicine.name, item.medicine.dosage),
                    "quantity": item.quantity,
                    "total_price": item.line_total(),
                    "user_id": user_id,
                    "pharmacy_name": pharmacy_name,
                    "prescription_id": null,
                });
                match payload {
                    serde_json::Value::Object(map) => Some(map),
                    _ => None,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::Normalizer;

    fn medicine(id: &str, price: f64, stock: u32) -> Medicine {
        let raw = json!({ "medicine_id": id, "name": id, "dosage": "10mg", "price": price, "stock": stock });
        Normalizer::new().normalize_as(raw.as_object().unwrap())
    }

    #[test]
    fn test_add_merges_lines() {
        let mut cart = Cart::new();
        cart.add(medicine("para", 5.99, 10), 1);
        cart.add(medicine("para", 5.99, 10), 2);
        cart.add(medicine("ibu", 3.0, 10), 1);

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.item_count(), 4);
        assert!((cart.total_price() - (5.99 * 3.0 + 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_set_quantity_zero_removes() {
        let mut cart = Cart::new();
        let para = medicine("para", 5.99, 10);
        let id = para.id.clone();
        cart.add(para, 1);

        cart.set_quantity(&id, 4);
        assert_eq!(cart.item_count(), 4);

        cart.set_quantity(&id, 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_over_stock() {
        let mut cart = Cart::new();
        cart.add(medicine("amox", 12.5, 1), 2);
        assert_eq!(cart.over_stock().len(), 1);
    }

    #[test]
    fn test_order_payloads_skip_synthesized() {
        let mut cart = Cart::new();
        cart.add(medicine("para", 5.99, 10), 2);
        let local: Medicine = Normalizer::new().normalize_as(&Default::default());
        cart.add(local, 1);

        let payloads = cart.order_payloads("user-1", "HealthPlus Pharmacy");
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0]["medicine_id"], "para");
        assert_eq!(payloads[0]["quantity"], 2);
        assert_eq!(payloads[0]["medicine_name"], "para 10mg");
        assert_eq!(payloads[0]["user_id"], "user-1");
        assert_eq!(payloads[0]["pharmacy_name"], "HealthPlus Pharmacy");
    }
}
