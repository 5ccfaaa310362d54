//! Typed, defaulting access to raw wire records.

use std::cell::RefCell;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use super::hash::{hash_key_forms, is_numeric_key};
use super::table::{FieldDefault, FieldSpec, FieldTable};
use crate::models::EntityId;

/// An untyped backend record.
pub type RawRecord = serde_json::Map<String, Value>;

/// Reads view-model fields out of a [`RawRecord`] through a [`FieldTable`].
///
/// Every accessor is total: absent keys and values that fail to coerce
/// resolve to the field's table default and are recorded as gaps.
pub struct RecordReader<'a> {
    raw: &'a RawRecord,
    table: &'static FieldTable,
    extra_keys: &'a [(&'static str, String)],
    gaps: RefCell<Vec<&'static str>>,
}

impl<'a> RecordReader<'a> {
    pub fn new(raw: &'a RawRecord, table: &'static FieldTable) -> Self {
        Self::with_extra_keys(raw, table, &[])
    }

    /// Reader that also consults runtime-registered `(field, key)` pairs.
    pub fn with_extra_keys(
        raw: &'a RawRecord,
        table: &'static FieldTable,
        extra_keys: &'a [(&'static str, String)],
    ) -> Self {
        Self {
            raw,
            table,
            extra_keys,
            gaps: RefCell::new(Vec::new()),
        }
    }

    /// Fields that fell back to their default so far.
    pub fn gaps(&self) -> Vec<&'static str> {
        self.gaps.borrow().clone()
    }

    pub fn into_gaps(self) -> Vec<&'static str> {
        self.gaps.into_inner()
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// First present candidate for `field`, scalar optionals unwrapped.
    fn lookup(&self, spec: &FieldSpec) -> Option<&'a Value> {
        self.candidates(spec)
            .find_map(|key| self.raw.get(&key).and_then(unwrap_optional))
    }

    /// First present candidate for a list field (an empty array counts).
    fn lookup_list(&self, spec: &FieldSpec) -> Option<&'a Value> {
        self.candidates(spec).find_map(|key| match self.raw.get(&key) {
            None | Some(Value::Null) => None,
            // opt vec arrives as [[...]]
            Some(Value::Array(items)) if items.len() == 1 && items[0].is_array() => {
                Some(&items[0])
            }
            Some(value) => Some(value),
        })
    }

    fn candidates(&self, spec: &FieldSpec) -> impl Iterator<Item = String> + '_ {
        let name = spec.name;
        let semantic = spec.keys.iter().flat_map(|key| {
            let mut forms = vec![(*key).to_string()];
            if !is_numeric_key(key) {
                forms.extend(hash_key_forms(key));
            }
            forms
        });
        let extra = self
            .extra_keys
            .iter()
            .filter(move |(field, _)| *field == name)
            .map(|(_, key)| key.clone());
        semantic.chain(extra)
    }

    fn spec(&self, field: &'static str) -> FieldSpec {
        self.table.field(field).copied().unwrap_or(FieldSpec {
            name: field,
            keys: &[],
            default: FieldDefault::Text(""),
        })
    }

    fn gap(&self, field: &'static str) {
        self.gaps.borrow_mut().push(field);
    }

    // =========================================================================
    // Typed accessors
    // =========================================================================

    pub fn text(&self, field: &'static str) -> String {
        let spec = self.spec(field);
        match self.lookup(&spec).and_then(coerce_text) {
            Some(text) => text,
            None => {
                self.gap(field);
                match spec.default {
                    FieldDefault::Text(text) => text.to_string(),
                    FieldDefault::SameAs(other) if other != field => self.text(other),
                    _ => String::new(),
                }
            }
        }
    }

    pub fn number(&self, field: &'static str) -> f64 {
        let spec = self.spec(field);
        match self.lookup(&spec).and_then(coerce_number) {
            Some(n) => n,
            None => {
                self.gap(field);
                match spec.default {
                    FieldDefault::Number(n) => n,
                    FieldDefault::Count(n) => f64::from(n),
                    _ => 0.0,
                }
            }
        }
    }

    pub fn count(&self, field: &'static str) -> u32 {
        let spec = self.spec(field);
        let parsed = self
            .lookup(&spec)
            .and_then(coerce_number)
            .filter(|n| *n >= 0.0)
            .map(|n| if n >= f64::from(u32::MAX) { u32::MAX } else { n.trunc() as u32 });
        match parsed {
            Some(n) => n,
            None => {
                self.gap(field);
                match spec.default {
                    FieldDefault::Count(n) => n,
                    _ => 0,
                }
            }
        }
    }

    pub fn flag(&self, field: &'static str) -> bool {
        let spec = self.spec(field);
        match self.lookup(&spec).and_then(coerce_flag) {
            Some(b) => b,
            None => {
                self.gap(field);
                matches!(spec.default, FieldDefault::Flag(true))
            }
        }
    }

    pub fn list(&self, field: &'static str) -> Vec<String> {
        let spec = self.spec(field);
        match self.lookup_list(&spec).and_then(coerce_list) {
            Some(items) => items,
            None => {
                self.gap(field);
                Vec::new()
            }
        }
    }

    pub fn date(&self, field: &'static str) -> NaiveDate {
        let spec = self.spec(field);
        match self.lookup(&spec).and_then(coerce_date) {
            Some(date) => date,
            None => {
                self.gap(field);
                epoch().date_naive()
            }
        }
    }

    pub fn timestamp(&self, field: &'static str) -> DateTime<Utc> {
        let spec = self.spec(field);
        match self.lookup(&spec).and_then(coerce_timestamp) {
            Some(ts) => ts,
            None => {
                self.gap(field);
                epoch()
            }
        }
    }

    /// Id as sent by the service, if any. Blank ids count as missing.
    pub fn wire_id(&self) -> Option<String> {
        self.lookup(self.table.id_field())
            .and_then(coerce_text)
            .filter(|id| !id.trim().is_empty())
    }

    /// Entity identity: first present id candidate, or a synthesized id.
    pub fn id(&self) -> EntityId {
        match self.wire_id() {
            Some(id) => EntityId::authoritative(id),
            None => {
                self.gap("id");
                EntityId::synthesize(self.table.kind)
            }
        }
    }
}

// =========================================================================
// Coercion
// =========================================================================

/// `null` and empty optionals are absent; `[v]` optionals unwrap to `v`.
fn unwrap_optional(value: &Value) -> Option<&Value> {
    match value {
        Value::Null => None,
        Value::Array(items) if items.is_empty() => None,
        Value::Array(items) if items.len() == 1 && !items[0].is_array() => {
            unwrap_optional(&items[0])
        }
        other => Some(other),
    }
}

fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn coerce_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coerce_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| unwrap_optional(item).and_then(coerce_text))
                .collect(),
        ),
        Value::String(s) => Some(
            s.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(String::from)
                .collect(),
        ),
        _ => None,
    }
}

fn coerce_date(value: &Value) -> Option<NaiveDate> {
    if let Value::String(s) = value {
        let s = s.trim();
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(date);
        }
    }
    coerce_timestamp(value).map(|ts| ts.date_naive())
}

fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Some(ts.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
            }
            s.parse::<f64>().ok().and_then(from_epoch)
        }
        _ => None,
    }
}

/// Epoch numbers: nanoseconds (canister `Time.now()`), milliseconds
/// (`Date.now()`) or seconds, told apart by magnitude. Anything past year
/// 9999 is garbage.
fn from_epoch(n: f64) -> Option<DateTime<Utc>> {
    if !n.is_finite() || n < 0.0 {
        return None;
    }
    let millis = if n >= 1e17 {
        n / 1e6
    } else if n >= 1e11 {
        n
    } else {
        n * 1e3
    };
    DateTime::from_timestamp_millis(millis.round() as i64).filter(|ts| ts.year() <= 9999)
}

fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::table::{MEDICINE, WELLNESS_LOG};
    use serde_json::json;

    fn record(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("test record must be an object"),
        }
    }

    #[test]
    fn test_semantic_key_wins_over_hash_key() {
        let raw = record(json!({ "name": "Paracetamol", "1_224_700_491": "Other" }));
        let reader = RecordReader::new(&raw, &MEDICINE);
        assert_eq!(reader.text("name"), "Paracetamol");
        assert!(reader.gaps().is_empty());
    }

    #[test]
    fn test_all_hash_spellings_resolve() {
        for key in ["1224700491", "1_224_700_491", "_1224700491_"] {
            let raw = record(json!({ key: "Ibuprofen" }));
            let reader = RecordReader::new(&raw, &MEDICINE);
            assert_eq!(reader.text("name"), "Ibuprofen", "key form {}", key);
        }
    }

    #[test]
    fn test_null_falls_through_to_next_candidate() {
        let raw = record(json!({ "medicine_id": null, "id": "m-7" }));
        let reader = RecordReader::new(&raw, &MEDICINE);
        assert_eq!(reader.id(), EntityId::authoritative("m-7"));
    }

    #[test]
    fn test_candid_optionals_unwrap() {
        let raw = record(json!({ "dosage": ["500mg"], "manufacturer": [] }));
        let reader = RecordReader::new(&raw, &MEDICINE);
        assert_eq!(reader.text("dosage"), "500mg");
        assert_eq!(reader.text("manufacturer"), "Unknown");
        assert_eq!(reader.gaps(), vec!["manufacturer"]);
    }

    #[test]
    fn test_numbers_parse_or_default() {
        let raw = record(json!({ "price": "12.50", "stock": "lots" }));
        let reader = RecordReader::new(&raw, &MEDICINE);
        assert_eq!(reader.number("price"), 12.5);
        assert_eq!(reader.count("stock"), 0);
    }

    #[test]
    fn test_negative_counts_default() {
        let raw = record(json!({ "steps": -40 }));
        let reader = RecordReader::new(&raw, &WELLNESS_LOG);
        assert_eq!(reader.count("steps"), 0);
    }

    #[test]
    fn test_same_as_default() {
        let raw = record(json!({ "name": "Amoxicillin" }));
        let reader = RecordReader::new(&raw, &MEDICINE);
        assert_eq!(reader.text("generic_name"), "Amoxicillin");
    }

    #[test]
    fn test_single_string_becomes_list() {
        let raw = record(json!({ "active_ingredient": "Acetaminophen 500mg" }));
        let reader = RecordReader::new(&raw, &MEDICINE);
        assert_eq!(reader.list("active_ingredients"), vec!["Acetaminophen 500mg"]);
    }

    #[test]
    fn test_epoch_magnitudes() {
        let expected = DateTime::parse_from_rfc3339("2025-08-21T10:30:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let secs = expected.timestamp();
        for value in [
            json!(secs),
            json!(secs * 1_000),
            json!(format!("{}", secs as i128 * 1_000_000_000)),
            json!("2025-08-21T10:30:00Z"),
        ] {
            assert_eq!(coerce_timestamp(&value), Some(expected), "value {}", value);
        }
    }

    #[test]
    fn test_dates() {
        let raw = record(json!({ "1_113_806_382": "2025-08-22" }));
        let reader = RecordReader::new(&raw, &WELLNESS_LOG);
        assert_eq!(
            reader.date("date"),
            NaiveDate::from_ymd_opt(2025, 8, 22).unwrap()
        );

        let raw = record(json!({ "date": "yesterday" }));
        let reader = RecordReader::new(&raw, &WELLNESS_LOG);
        assert_eq!(reader.date("date"), epoch().date_naive());
    }

    #[test]
    fn test_extra_keys() {
        let raw = record(json!({ "med_title": "Cetirizine" }));
        let extra = vec![("name", "med_title".to_string())];
        let reader = RecordReader::with_extra_keys(&raw, &MEDICINE, &extra);
        assert_eq!(reader.text("name"), "Cetirizine");
    }
}
