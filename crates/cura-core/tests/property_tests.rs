//! Property tests for normalization and projection.

use cura_core::models::{Entity, EntityId, EntityKind, Medicine, WellnessLogEntry};
use cura_core::normalizer::{hash_key_forms, RawRecord};
use cura_core::projection::Direction;
use cura_core::{project, Normalizer, Query, Sort, SortField};
use proptest::prelude::*;
use serde_json::{json, Value};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-1_000_000i64..1_000_000).prop_map(|n| json!(n)),
        (0u64..2_000_000_000).prop_map(|n| json!(n)),
        "[ -~]{0,12}".prop_map(Value::String),
        prop_oneof![
            Just("2024-03-04"),
            Just("2024-03-04T08:30:00Z"),
            Just("true"),
            Just("12"),
            Just("pain relief"),
        ]
        .prop_map(|s| Value::String(s.to_string())),
    ]
}

fn wire_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => scalar(),
        1 => prop::collection::vec(scalar(), 0..3).prop_map(Value::Array),
        1 => scalar().prop_map(|v| json!({ "inner": v })),
    ]
}

/// Keys real records use, in semantic and hash spellings, plus noise.
fn wire_key() -> impl Strategy<Value = String> {
    let names = prop::sample::select(vec![
        "id", "medicine_id", "log_id", "name", "category", "price", "stock", "dosage",
        "prescription_required", "active_ingredients", "created_at", "date", "sleep", "steps",
        "water_intake", "mood", "exercise", "timestamp",
    ]);
    prop_oneof![
        3 => names.clone().prop_map(String::from),
        2 => (names, 0usize..3).prop_map(|(name, form)| hash_key_forms(name)[form].clone()),
        1 => "[a-z_]{1,10}",
    ]
}

fn raw_record() -> impl Strategy<Value = RawRecord> {
    prop::collection::vec((wire_key(), wire_value()), 0..10)
        .prop_map(|pairs| pairs.into_iter().collect())
}

fn as_record(value: Value) -> RawRecord {
    match value {
        Value::Object(map) => map,
        _ => RawRecord::new(),
    }
}

/// Serialize and normalize again. A synthesized id comes back as plain
/// wire text, so it is carried over by hand.
fn fixpoint<T: Entity>(normalizer: &Normalizer, entity: &T) -> T {
    let value = serde_json::to_value(entity).unwrap();
    let mut again: T = normalizer.normalize_as(&as_record(value));
    if entity.id().is_synthesized() {
        again.set_id(entity.id().clone());
    }
    again
}

proptest! {
    #[test]
    fn prop_normalization_is_total(raw in raw_record()) {
        let normalizer = Normalizer::new();
        for kind in EntityKind::ALL {
            let entity = normalizer.normalize(&raw, kind);
            prop_assert_eq!(entity.kind(), kind);
        }
    }

    #[test]
    fn prop_normalized_medicine_is_a_fixpoint(raw in raw_record()) {
        let normalizer = Normalizer::new();
        let medicine: Medicine = normalizer.normalize_as(&raw);
        prop_assert_eq!(fixpoint(&normalizer, &medicine), medicine);
    }

    #[test]
    fn prop_normalized_wellness_log_is_a_fixpoint(raw in raw_record()) {
        let normalizer = Normalizer::new();
        let log: WellnessLogEntry = normalizer.normalize_as(&raw);
        prop_assert_eq!(fixpoint(&normalizer, &log), log);
    }

    #[test]
    fn prop_wire_ids_are_stable(id in "[a-z0-9_]{1,12}", raw in raw_record()) {
        let normalizer = Normalizer::new();
        let mut raw = raw;
        raw.retain(|key, _| !matches!(key.as_str(), "medicine_id" | "id")
            && !hash_key_forms("medicine_id").contains(key)
            && !hash_key_forms("id").contains(key));
        raw.insert("medicine_id".to_string(), json!(id.clone()));

        let first: Medicine = normalizer.normalize_as(&raw);
        let second: Medicine = normalizer.normalize_as(&raw);
        prop_assert_eq!(&first.id, &EntityId::authoritative(id));
        prop_assert_eq!(&first.id, &second.id);
    }
}

// =========================================================================
// Projection
// =========================================================================

fn medicines() -> impl Strategy<Value = Vec<Medicine>> {
    let one = (
        0u8..8,
        prop::sample::select(vec!["Paracetamol", "Ibuprofen", "Amoxicillin", "Cetirizine", "Omeprazole"]),
        prop::sample::select(vec!["pain-relief", "antibiotics", "allergy", "digestive"]),
        0u32..50,
        0u32..5,
    )
        .prop_map(|(id, name, category, price, stock)| {
            json!({
                "medicine_id": format!("med_{}", id),
                "name": name,
                "category": category,
                "price": price,
                "stock": stock,
            })
        });
    prop::collection::vec(one, 0..20)
        .prop_map(|records| Normalizer::new().normalize_batch_as(&Value::Array(records)))
}

fn query() -> impl Strategy<Value = Query> {
    (
        prop::option::of(prop::sample::select(vec!["para", "CIL", "o", "zzz"])),
        prop::option::of(prop::sample::select(vec!["Pain Relief", "antibiotics", "all"])),
        any::<bool>(),
        prop::option::of(prop::sample::select(vec![
            SortField::Name,
            SortField::Price,
            SortField::Stock,
            SortField::Date,
        ])),
        any::<bool>(),
    )
        .prop_map(|(search, category, in_stock, sort, descending)| {
            let mut query = Query::new();
            if let Some(search) = search {
                query = query.search(search);
            }
            if let Some(category) = category {
                query = query.category(category);
            }
            if in_stock {
                query = query.in_stock();
            }
            if let Some(field) = sort {
                query = query.sorted(Sort {
                    field,
                    direction: if descending {
                        Direction::Descending
                    } else {
                        Direction::Ascending
                    },
                });
            }
            query
        })
}

proptest! {
    #[test]
    fn prop_projection_is_idempotent(items in medicines(), query in query()) {
        let once = project(&items, &query);
        let twice = project(once.as_slice(), &query);
        prop_assert_eq!(&once, &twice);
    }

    #[test]
    fn prop_projection_yields_unique_matching_items(items in medicines(), query in query()) {
        let projected = project(&items, &query);
        let ids = projected.ids();
        for (i, id) in ids.iter().enumerate() {
            prop_assert!(!ids[i + 1..].contains(id), "duplicate id {}", id);
        }
        for item in projected.iter() {
            prop_assert!(query.matches(item));
            prop_assert!(items.contains(item));
        }
    }

    #[test]
    fn prop_sort_orders_by_key(items in medicines()) {
        let projected = project(&items, &Query::new().sorted(Sort::ascending(SortField::Price)));
        let prices: Vec<f64> = projected.iter().map(|m| m.price).collect();
        prop_assert!(prices.windows(2).all(|w| w[0] <= w[1]));
    }
}
