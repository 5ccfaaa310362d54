//! Wire record normalizer.
//!
//! Turns backend records into typed view models. Records arrive keyed by
//! semantic names, by numeric label hashes in one of several spellings, or
//! by a mix of both; each field is resolved through its kind's
//! [`FieldTable`] and defaulted when nothing usable is present.

mod hash;
mod record;
mod table;

pub use hash::{hash_key_forms, is_numeric_key, wire_hash};
pub use record::{RawRecord, RecordReader};
pub use table::{FieldDefault, FieldSpec, FieldTable};

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::models::{Entity, EntityKind, NormalizedEntity};

/// Fields under which list endpoints wrap their records.
const WRAPPER_FIELDS: &[&str] = &[
    "data",
    "items",
    "results",
    "records",
    "logs",
    "doctors",
    "medicines",
    "orders",
    "appointments",
    "reminders",
];

/// Normalized entity plus the fields that fell back to defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationReport<T> {
    pub entity: T,
    pub defaulted: Vec<&'static str>,
}

/// Record normalizer.
///
/// The static tables cover every known backend shape; `add_key` registers
/// extra wire keys for a field at runtime (tried after the table's own).
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    extra_keys: HashMap<EntityKind, Vec<(&'static str, String)>>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an extra wire key for `field` of `kind`.
    pub fn add_key(&mut self, kind: EntityKind, field: &'static str, key: &str) {
        self.extra_keys
            .entry(kind)
            .or_default()
            .push((field, key.to_string()));
    }

    fn extra_keys(&self, kind: EntityKind) -> &[(&'static str, String)] {
        self.extra_keys.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Normalize one record of a kind known only at runtime.
    pub fn normalize(&self, raw: &RawRecord, kind: EntityKind) -> NormalizedEntity {
        let reader =
            RecordReader::with_extra_keys(raw, FieldTable::for_kind(kind), self.extra_keys(kind));
        let entity = NormalizedEntity::read(kind, &reader);
        log_gaps(kind, &reader.into_gaps());
        entity
    }

    /// Normalize one record into a concrete entity type.
    pub fn normalize_as<T: Entity>(&self, raw: &RawRecord) -> T {
        self.normalize_with_report::<T>(raw).entity
    }

    /// Normalize and report which fields were defaulted.
    pub fn normalize_with_report<T: Entity>(&self, raw: &RawRecord) -> NormalizationReport<T> {
        let reader = RecordReader::with_extra_keys(
            raw,
            FieldTable::for_kind(T::KIND),
            self.extra_keys(T::KIND),
        );
        let entity = T::from_record(&reader);
        let defaulted = reader.into_gaps();
        log_gaps(T::KIND, &defaulted);
        NormalizationReport { entity, defaulted }
    }

    /// Entity with `patch` applied on top.
    ///
    /// Patch keys may use any spelling the wire uses; each is mapped to the
    /// field it feeds before merging. The id is never patched.
    pub fn apply_patch<T: Entity>(&self, entity: &T, patch: &RawRecord) -> T {
        let mut merged = match serde_json::to_value(entity) {
            Ok(Value::Object(map)) => map,
            _ => return entity.clone(),
        };
        merged.extend(self.wire_patch(T::KIND, patch));

        let mut patched: T = self.normalize_as(&merged);
        patched.set_id(entity.id().clone());
        patched
    }

    /// Patch keyed by field name, as sent to the service.
    ///
    /// Only the patched keys are carried. Unknown keys pass through as given
    /// and any id key is dropped.
    pub fn wire_patch(&self, kind: EntityKind, patch: &RawRecord) -> RawRecord {
        let mut out = RawRecord::new();
        for (key, value) in patch {
            match self.field_name(kind, key) {
                Some("id") => {}
                Some(field) => {
                    out.insert(field.to_string(), value.clone());
                }
                None => {
                    out.insert(key.clone(), value.clone());
                }
            }
        }
        out
    }

    fn field_name(&self, kind: EntityKind, key: &str) -> Option<&'static str> {
        FieldTable::for_kind(kind)
            .field_for_key(key)
            .map(|spec| spec.name)
            .or_else(|| {
                self.extra_keys(kind)
                    .iter()
                    .find(|(_, extra)| extra == key)
                    .map(|(field, _)| *field)
            })
    }

    /// Normalize a list response of a runtime kind.
    pub fn normalize_batch(&self, value: &Value, kind: EntityKind) -> Vec<NormalizedEntity> {
        records(value)
            .into_iter()
            .map(|raw| self.normalize(raw, kind))
            .collect()
    }

    /// Normalize a list response.
    ///
    /// Accepts a bare array, an object wrapping the array under one of the
    /// usual fields, or a single record. A bare status envelope
    /// (`{"success": .., "message": ..}`) yields nothing.
    pub fn normalize_batch_as<T: Entity>(&self, value: &Value) -> Vec<T> {
        records(value)
            .into_iter()
            .map(|raw| self.normalize_as(raw))
            .collect()
    }
}

/// Record objects inside a list response; non-object elements are skipped.
fn records(value: &Value) -> Vec<&RawRecord> {
    match value {
        Value::Array(items) => items.iter().filter_map(Value::as_object).collect(),
        Value::Object(map) => {
            let wrapped = WRAPPER_FIELDS
                .iter()
                .find_map(|field| map.get(*field).filter(|v| v.is_array()));
            match wrapped {
                Some(inner) => records(inner),
                None if is_status_envelope(map) => Vec::new(),
                None => vec![map],
            }
        }
        _ => Vec::new(),
    }
}

fn is_status_envelope(map: &RawRecord) -> bool {
    map.contains_key("success")
        && map
            .keys()
            .all(|key| matches!(key.as_str(), "success" | "message" | "error"))
}

fn log_gaps(kind: EntityKind, gaps: &[&'static str]) {
    if !gaps.is_empty() {
        debug!(kind = %kind, fields = ?gaps, "defaulted missing fields");
    }
}
