//! List projections: dedup, filter and stable sort.
//!
//! Projections are pure. The same items and query always give the same
//! result, and projecting a projection changes nothing.

mod collection;
mod summary;

pub use collection::ViewCollection;
pub use summary::*;

use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{category_slug, Entity};

/// Sortable fields. Kinds that lack a field sort those items last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Name,
    Price,
    Rating,
    Stock,
    Date,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: SortField,
    #[serde(default)]
    pub direction: Direction,
}

impl Sort {
    pub fn ascending(field: SortField) -> Self {
        Self { field, direction: Direction::Ascending }
    }

    pub fn descending(field: SortField) -> Self {
        Self { field, direction: Direction::Descending }
    }

    /// Newest first.
    pub fn recent() -> Self {
        Self::descending(SortField::Timestamp)
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::recent()
    }
}

/// A comparable field value.
#[derive(Debug, Clone)]
pub enum SortValue {
    /// Lower-cased text
    Text(String),
    Number(f64),
    Time(DateTime<Utc>),
    /// Date plus "HH:MM" time
    Slot(NaiveDate, String),
}

impl SortValue {
    pub fn text(s: &str) -> Self {
        SortValue::Text(s.to_lowercase())
    }

    fn rank(&self) -> u8 {
        match self {
            SortValue::Text(_) => 0,
            SortValue::Number(_) => 1,
            SortValue::Time(_) => 2,
            SortValue::Slot(..) => 3,
        }
    }
}

impl Ord for SortValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortValue::Text(a), SortValue::Text(b)) => a.cmp(b),
            (SortValue::Number(a), SortValue::Number(b)) => a.total_cmp(b),
            (SortValue::Time(a), SortValue::Time(b)) => a.cmp(b),
            (SortValue::Slot(da, ta), SortValue::Slot(db, tb)) => (da, ta).cmp(&(db, tb)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SortValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SortValue {}

/// One filter predicate. A query matches when all of its filters match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Filter {
    /// Case-insensitive substring over the kind's searchable fields.
    /// Blank matches everything.
    Search { text: String },
    /// Category or specialty, compared as slugs. Blank or "all" matches
    /// everything.
    Category { category: String },
    /// Status in the set (case-insensitive). An empty set matches everything.
    StatusIn { statuses: Vec<String> },
    /// Inclusive date range; open ends are unbounded.
    DateRange {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },
    /// Timestamp within `days` before `now`, inclusive.
    RecentWindow { now: DateTime<Utc>, days: u32 },
    InStock,
}

impl Filter {
    pub fn matches<T: Entity>(&self, item: &T) -> bool {
        match self {
            Filter::Search { text } => {
                let needle = text.trim().to_lowercase();
                needle.is_empty()
                    || item
                        .search_fields()
                        .iter()
                        .any(|field| field.to_lowercase().contains(&needle))
            }
            Filter::Category { category } => {
                let wanted = category_slug(category);
                wanted.is_empty()
                    || wanted == "all"
                    || item.category().is_some_and(|c| category_slug(c) == wanted)
            }
            Filter::StatusIn { statuses } => {
                statuses.is_empty()
                    || item
                        .status()
                        .is_some_and(|s| statuses.iter().any(|w| w.eq_ignore_ascii_case(s)))
            }
            Filter::DateRange { from, to } => {
                let date = item.date().unwrap_or_else(|| item.timestamp().date_naive());
                from.map_or(true, |from| date >= from) && to.map_or(true, |to| date <= to)
            }
            Filter::RecentWindow { now, days } => {
                let ts = item.timestamp();
                let start = now.checked_sub_signed(Duration::days(i64::from(*days)));
                ts <= *now && start.map_or(true, |start| ts >= start)
            }
            Filter::InStock => item.in_stock(),
        }
    }
}

/// Filters plus an optional sort. Without a sort, input order is kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub sort: Option<Sort>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.filters.push(Filter::Search { text: text.into() });
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.filters.push(Filter::Category { category: category.into() });
        self
    }

    pub fn status_in<S: Into<String>>(mut self, statuses: impl IntoIterator<Item = S>) -> Self {
        self.filters.push(Filter::StatusIn {
            statuses: statuses.into_iter().map(Into::into).collect(),
        });
        self
    }

    pub fn between(mut self, from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        self.filters.push(Filter::DateRange { from, to });
        self
    }

    pub fn within_days(mut self, now: DateTime<Utc>, days: u32) -> Self {
        self.filters.push(Filter::RecentWindow { now, days });
        self
    }

    pub fn in_stock(mut self) -> Self {
        self.filters.push(Filter::InStock);
        self
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn matches<T: Entity>(&self, item: &T) -> bool {
        self.filters.iter().all(|filter| filter.matches(item))
    }
}

/// Dedup by id (first wins), filter, then stable sort.
pub fn project<T: Entity>(items: &[T], query: &Query) -> ViewCollection<T> {
    let mut seen = HashSet::new();
    let mut kept: Vec<T> = items
        .iter()
        .filter(|item| seen.insert(item.id().clone()))
        .filter(|item| query.matches(*item))
        .cloned()
        .collect();

    if let Some(sort) = query.sort {
        kept.sort_by(|a, b| compare(a, b, sort));
    }

    ViewCollection::from_items(kept)
}

/// Missing values sort last in either direction.
fn compare<T: Entity>(a: &T, b: &T, sort: Sort) -> Ordering {
    match (a.sort_value(sort.field), b.sort_value(sort.field)) {
        (Some(a), Some(b)) => match sort.direction {
            Direction::Ascending => a.cmp(&b),
            Direction::Descending => b.cmp(&a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl<T: Entity> ViewCollection<T> {
    pub fn project(&self, query: &Query) -> ViewCollection<T> {
        project(self.as_slice(), query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Medicine, WellnessLogEntry};
    use crate::normalizer::Normalizer;
    use serde_json::{json, Value};

    fn medicines(values: Value) -> Vec<Medicine> {
        Normalizer::new().normalize_batch_as(&values)
    }

    fn catalog() -> Vec<Medicine> {
        medicines(json!([
            { "medicine_id": "1", "name": "Paracetamol", "category": "Pain Relief", "price": 5.99, "stock": 100 },
            { "medicine_id": "2", "name": "Amoxicillin", "category": "Antibiotics", "price": 12.5, "stock": 0 },
            { "medicine_id": "3", "name": "Ibuprofen", "category": "pain-relief", "price": 7.25, "stock": 40 },
            { "medicine_id": "4", "name": "Aspirin", "category": "Pain Relief", "price": 3.0, "stock": 0 }
        ]))
    }

    fn names(collection: &ViewCollection<Medicine>) -> Vec<&str> {
        collection.iter().map(|m| m.name.as_str()).collect()
    }

    #[test]
    fn test_category_and_stock() {
        let query = Query::new().category("pain relief").in_stock();
        assert_eq!(names(&project(&catalog(), &query)), vec!["Paracetamol", "Ibuprofen"]);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let query = Query::new().search("  AMOX ");
        assert_eq!(names(&project(&catalog(), &query)), vec!["Amoxicillin"]);

        let all = project(&catalog(), &Query::new().search(""));
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn test_sort_price_both_directions() {
        let asc = project(&catalog(), &Query::new().sorted(Sort::ascending(SortField::Price)));
        assert_eq!(names(&asc), vec!["Aspirin", "Paracetamol", "Ibuprofen", "Amoxicillin"]);

        let desc = project(&catalog(), &Query::new().sorted(Sort::descending(SortField::Price)));
        assert_eq!(names(&desc), vec!["Amoxicillin", "Ibuprofen", "Paracetamol", "Aspirin"]);
    }

    #[test]
    fn test_descending_sort_is_stable() {
        let items = medicines(json!([
            { "medicine_id": "a", "name": "Same", "stock": 5 },
            { "medicine_id": "b", "name": "Same", "stock": 5 },
            { "medicine_id": "c", "name": "Other", "stock": 9 }
        ]));
        let sorted = project(&items, &Query::new().sorted(Sort::descending(SortField::Stock)));
        let ids: Vec<_> = sorted.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_missing_sort_field_sorts_last() {
        let items = medicines(json!([{ "medicine_id": "1" }, { "medicine_id": "2" }]));
        let sorted = project(&items, &Query::new().sorted(Sort::descending(SortField::Rating)));
        assert_eq!(sorted.len(), 2);
        assert_eq!(sorted.as_slice()[0].id.as_str(), "1");
    }

    #[test]
    fn test_recent_window() {
        let now = DateTime::parse_from_rfc3339("2025-08-21T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let logs: Vec<WellnessLogEntry> = Normalizer::new().normalize_batch_as(&json!([
            { "log_id": "new", "created_at": "2025-08-20T08:00:00Z" },
            { "log_id": "old", "created_at": "2025-08-01T08:00:00Z" },
            { "log_id": "future", "created_at": "2025-08-22T08:00:00Z" }
        ]));
        let recent = project(&logs, &Query::new().within_days(now, 7));
        let ids: Vec<_> = recent.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["new"]);
    }

    #[test]
    fn test_date_range_inclusive() {
        let logs: Vec<WellnessLogEntry> = Normalizer::new().normalize_batch_as(&json!([
            { "log_id": "1", "date": "2025-08-18" },
            { "log_id": "2", "date": "2025-08-19" },
            { "log_id": "3", "date": "2025-08-21" }
        ]));
        let from = NaiveDate::from_ymd_opt(2025, 8, 19);
        let to = NaiveDate::from_ymd_opt(2025, 8, 21);
        assert_eq!(project(&logs, &Query::new().between(from, to)).len(), 2);
    }

    #[test]
    fn test_query_from_json() {
        let query: Query = serde_json::from_value(json!({
            "filters": [{ "type": "category", "category": "Pain-Relief" }, { "type": "in_stock" }],
            "sort": { "field": "name" }
        }))
        .unwrap();
        assert_eq!(names(&project(&catalog(), &query)), vec!["Ibuprofen", "Paracetamol"]);
    }

    #[test]
    fn test_sort_value_order() {
        assert!(SortValue::text("Apple") < SortValue::text("banana"));
        assert!(SortValue::Number(f64::NAN) == SortValue::Number(f64::NAN));
        let d = NaiveDate::from_ymd_opt(2025, 8, 21).unwrap();
        assert!(SortValue::Slot(d, "09:00".into()) < SortValue::Slot(d, "14:30".into()));
    }
}
