//! Cura Core Library
//!
//! Client-side record normalization and reconciliation for the Cura health
//! app: wire records in, stable typed view models out.
//!
//! # Architecture
//!
//! ```text
//!   Service boundary (fetch / create / update / delete)
//!          │                               ▲
//!          ▼                               │ commit
//!     Normalizer ──► ViewCollection ◄── Mutation Controller ◄── user actions
//!                      │      ▲              (optimistic apply,
//!             mirror   │      │ hydrate       rollback on failure)
//!                      ▼      │
//!                   Local Cache Store
//!                      │
//!                      ▼
//!              Projection (dedup → filter → stable sort) ──► rendered view
//! ```
//!
//! # Core Principle
//!
//! **The backend is authoritative.** The cache is advisory, client-side ids
//! are never sent to the service, and every failed commit is rolled back.
//!
//! # Modules
//!
//! - [`normalizer`]: Raw record → fully defaulted entity, semantic or hash keys
//! - [`models`]: Entity types (Doctor, Medicine, Appointment, Order, ...)
//! - [`cache`]: Per-identity local cache (SQLite or in-memory)
//! - [`mutation`]: Optimistic create/update/delete with rollback
//! - [`projection`]: Filters, sorts and dashboard summaries
//! - [`service`]: Backend and identity seams
//! - [`repository`]: Per-kind views wiring the above together
//! - [`config`]: Runtime configuration

pub mod cache;
pub mod config;
pub mod models;
pub mod mutation;
pub mod normalizer;
pub mod projection;
pub mod repository;
pub mod service;

// Re-export commonly used types
pub use cache::{CacheScope, LocalCache, Namespace};
pub use config::CuraConfig;
pub use models::{
    Appointment, Cart, ChatTranscript, Doctor, Entity, EntityId, EntityKind, Medicine,
    MedicationReminder, NormalizedEntity, Order, WellnessLogEntry,
};
pub use mutation::{Mutation, MutationController, MutationError, MutationOptions};
pub use normalizer::Normalizer;
pub use projection::{project, Query, Sort, SortField, ViewCollection};
pub use repository::EntityView;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, Utc};
use serde_json::Value;

use models::ChatRole;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CuraError {
    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl From<cache::CacheError> for CuraError {
    fn from(e: cache::CacheError) -> Self {
        CuraError::CacheError(e.to_string())
    }
}

impl From<serde_json::Error> for CuraError {
    fn from(e: serde_json::Error) -> Self {
        CuraError::SerializationError(e.to_string())
    }
}

impl From<config::ConfigError> for CuraError {
    fn from(e: config::ConfigError) -> Self {
        CuraError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CuraError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        CuraError::CacheError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a cache database at the given path.
#[uniffi::export]
pub fn open_cache(path: String) -> Result<Arc<CuraCore>, CuraError> {
    let cache = LocalCache::open(&path)?;
    Ok(CuraCore::build(cache, CuraConfig::default()))
}

/// Create an in-memory cache.
#[uniffi::export]
pub fn open_cache_in_memory() -> Result<Arc<CuraCore>, CuraError> {
    let cache = LocalCache::open_in_memory()?;
    Ok(CuraCore::build(cache, CuraConfig::default()))
}

/// Open with a JSON configuration (see [`CuraConfig`]).
#[uniffi::export]
pub fn open_with_config(config_json: String) -> Result<Arc<CuraCore>, CuraError> {
    let config = CuraConfig::from_json_str(&config_json)?;
    let cache = config.open_cache()?;
    Ok(CuraCore::build(cache, config))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe facade for FFI hosts. Records cross the boundary as JSON.
#[derive(uniffi::Object)]
pub struct CuraCore {
    cache: Arc<Mutex<LocalCache>>,
    normalizer: Normalizer,
    config: CuraConfig,
}

impl CuraCore {
    fn build(cache: LocalCache, config: CuraConfig) -> Arc<Self> {
        Arc::new(Self {
            cache: Arc::new(Mutex::new(cache)),
            normalizer: Normalizer::new(),
            config,
        })
    }
}

#[uniffi::export]
impl CuraCore {
    // =========================================================================
    // Normalization & Projection
    // =========================================================================

    /// Normalize a list response into a JSON array of entities.
    pub fn normalize_records(
        &self,
        kind: FfiEntityKind,
        records_json: String,
    ) -> Result<String, CuraError> {
        let value: Value = serde_json::from_str(&records_json)?;
        let entities = self.normalizer.normalize_batch(&value, kind.into());
        Ok(serde_json::to_string(&entities)?)
    }

    /// Normalize, filter and sort records; returns a JSON array.
    pub fn project_records(
        &self,
        kind: FfiEntityKind,
        records_json: String,
        query: FfiQuery,
    ) -> Result<String, CuraError> {
        let query = query.into_query(self.config.views.recent_window_days)?;
        self.project_records_with(kind, &records_json, &query)
    }

    /// Newest records by creation time, up to the configured limit.
    pub fn recently_added(
        &self,
        kind: FfiEntityKind,
        records_json: String,
    ) -> Result<String, CuraError> {
        let value: Value = serde_json::from_str(&records_json)?;
        match EntityKind::from(kind) {
            EntityKind::Doctor => self.recent_as::<Doctor>(&value),
            EntityKind::Medicine => self.recent_as::<Medicine>(&value),
            EntityKind::Appointment => self.recent_as::<Appointment>(&value),
            EntityKind::Order => self.recent_as::<Order>(&value),
            EntityKind::WellnessLog => self.recent_as::<WellnessLogEntry>(&value),
            EntityKind::MedicationReminder => self.recent_as::<MedicationReminder>(&value),
        }
    }

    /// Weekly wellness summary over a list of wellness logs.
    pub fn wellness_summary(&self, logs_json: String) -> Result<FfiWellnessSummary, CuraError> {
        let value: Value = serde_json::from_str(&logs_json)?;
        let logs: Vec<WellnessLogEntry> = self.normalizer.normalize_batch_as(&value);
        let streak = projection::logging_streak(&logs, Utc::now().date_naive());
        Ok(FfiWellnessSummary::new(projection::weekly_summary(&logs), streak))
    }

    // =========================================================================
    // Cache Operations
    // =========================================================================

    /// Cached JSON for a namespace, or `None` when absent, unreadable, or
    /// nobody is signed in.
    pub fn load_cache(
        &self,
        namespace: String,
        principal: Option<String>,
    ) -> Result<Option<String>, CuraError> {
        let cache = self.cache.lock()?;
        let scope = CacheScope::for_principal(principal.as_deref());
        let value: Option<Value> = cache.load(&Namespace::new(namespace), scope.as_ref());
        Ok(value.map(|v| v.to_string()))
    }

    /// Store JSON under a namespace. Returns false when skipped because
    /// nobody is signed in.
    pub fn save_cache(
        &self,
        namespace: String,
        principal: Option<String>,
        payload_json: String,
    ) -> Result<bool, CuraError> {
        let value: Value = serde_json::from_str(&payload_json)?;
        let cache = self.cache.lock()?;
        let scope = CacheScope::for_principal(principal.as_deref());
        Ok(cache.try_save(&Namespace::new(namespace), scope.as_ref(), &value)?)
    }

    pub fn clear_cache(&self, namespace: String, principal: Option<String>) -> Result<(), CuraError> {
        let cache = self.cache.lock()?;
        let scope = CacheScope::for_principal(principal.as_deref());
        cache.clear(&Namespace::new(namespace), scope.as_ref());
        Ok(())
    }

    /// Forget everything cached for a principal (sign-out).
    pub fn clear_principal(&self, principal: String) -> Result<(), CuraError> {
        let cache = self.cache.lock()?;
        if let Some(scope) = CacheScope::for_principal(Some(&principal)) {
            cache.clear_scope(&scope);
        }
        Ok(())
    }

    // =========================================================================
    // Cart & Chat
    // =========================================================================

    /// Add a medicine record to the cached cart; returns the cart as JSON.
    pub fn add_to_cart(
        &self,
        principal: Option<String>,
        medicine_json: String,
        quantity: u32,
    ) -> Result<String, CuraError> {
        let value: Value = serde_json::from_str(&medicine_json)?;
        let Value::Object(raw) = value else {
            return Err(CuraError::InvalidInput("medicine must be an object".into()));
        };
        let medicine: Medicine = self.normalizer.normalize_as(&raw);

        let cache = self.cache.lock()?;
        let scope = CacheScope::for_principal(principal.as_deref());
        let mut cart = cache.cart(scope.as_ref());
        cart.add(medicine, quantity);
        cache.save_cart(scope.as_ref(), &cart);
        Ok(serde_json::to_string(&cart)?)
    }

    /// Order-create payloads for the principal's cart, one per line, placed
    /// with the configured pharmacy.
    pub fn cart_order_payloads(&self, principal: String) -> Result<String, CuraError> {
        let cache = self.cache.lock()?;
        let scope = CacheScope::for_principal(Some(&principal));
        let cart = cache.cart(scope.as_ref());
        let payloads =
            cart.order_payloads(&principal, &self.config.pharmacy.default_pharmacy_name);
        Ok(serde_json::to_string(&payloads)?)
    }

    /// Cached chat transcript as JSON, capped at the configured length.
    pub fn chat_history(&self, principal: Option<String>) -> Result<String, CuraError> {
        let cache = self.cache.lock()?;
        let scope = CacheScope::for_principal(principal.as_deref());
        let transcript = cache.chat(scope.as_ref(), self.config.chat.max_messages);
        Ok(serde_json::to_string(&transcript)?)
    }

    /// Append a message to the cached transcript; returns it as JSON.
    pub fn add_chat_message(
        &self,
        principal: Option<String>,
        role: FfiChatRole,
        text: String,
    ) -> Result<String, CuraError> {
        let cache = self.cache.lock()?;
        let scope = CacheScope::for_principal(principal.as_deref());
        let mut transcript = cache.chat(scope.as_ref(), self.config.chat.max_messages);
        transcript.push(role.into(), text, Utc::now());
        cache.save_chat(scope.as_ref(), &transcript);
        Ok(serde_json::to_string(&transcript)?)
    }

    // =========================================================================
    // Display Name
    // =========================================================================

    pub fn display_name(&self, principal: Option<String>) -> Result<Option<String>, CuraError> {
        let cache = self.cache.lock()?;
        let scope = CacheScope::for_principal(principal.as_deref());
        Ok(cache.display_name(scope.as_ref()))
    }

    pub fn set_display_name(&self, principal: Option<String>, name: String) -> Result<(), CuraError> {
        let cache = self.cache.lock()?;
        let scope = CacheScope::for_principal(principal.as_deref());
        cache.set_display_name(scope.as_ref(), &name);
        Ok(())
    }
}

impl CuraCore {
    fn recent_as<T: Entity>(&self, value: &Value) -> Result<String, CuraError> {
        let items: Vec<T> = self.normalizer.normalize_batch_as(value);
        let unique = project(&items, &Query::new());
        let recent =
            projection::recently_added(unique.as_slice(), self.config.views.recently_added_limit);
        Ok(serde_json::to_string(&recent)?)
    }

    fn project_as<T: Entity>(&self, value: &Value, query: &Query) -> Result<String, CuraError> {
        let items: Vec<T> = self.normalizer.normalize_batch_as(value);
        Ok(serde_json::to_string(&project(&items, query))?)
    }

    fn project_records_with(
        &self,
        kind: FfiEntityKind,
        records_json: &str,
        query: &Query,
    ) -> Result<String, CuraError> {
        let value: Value = serde_json::from_str(records_json)?;
        match EntityKind::from(kind) {
            EntityKind::Doctor => self.project_as::<Doctor>(&value, query),
            EntityKind::Medicine => self.project_as::<Medicine>(&value, query),
            EntityKind::Appointment => self.project_as::<Appointment>(&value, query),
            EntityKind::Order => self.project_as::<Order>(&value, query),
            EntityKind::WellnessLog => self.project_as::<WellnessLogEntry>(&value, query),
            EntityKind::MedicationReminder => self.project_as::<MedicationReminder>(&value, query),
        }
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiEntityKind {
    Doctor,
    Medicine,
    Appointment,
    Order,
    WellnessLog,
    MedicationReminder,
}

impl From<FfiEntityKind> for EntityKind {
    fn from(kind: FfiEntityKind) -> Self {
        match kind {
            FfiEntityKind::Doctor => EntityKind::Doctor,
            FfiEntityKind::Medicine => EntityKind::Medicine,
            FfiEntityKind::Appointment => EntityKind::Appointment,
            FfiEntityKind::Order => EntityKind::Order,
            FfiEntityKind::WellnessLog => EntityKind::WellnessLog,
            FfiEntityKind::MedicationReminder => EntityKind::MedicationReminder,
        }
    }
}

/// FFI-safe sort field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiSortField {
    Name,
    Price,
    Rating,
    Stock,
    Date,
    Timestamp,
}

impl From<FfiSortField> for SortField {
    fn from(field: FfiSortField) -> Self {
        match field {
            FfiSortField::Name => SortField::Name,
            FfiSortField::Price => SortField::Price,
            FfiSortField::Rating => SortField::Rating,
            FfiSortField::Stock => SortField::Stock,
            FfiSortField::Date => SortField::Date,
            FfiSortField::Timestamp => SortField::Timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiChatRole {
    User,
    Agent,
}

impl From<FfiChatRole> for ChatRole {
    fn from(role: FfiChatRole) -> Self {
        match role {
            FfiChatRole::User => ChatRole::User,
            FfiChatRole::Agent => ChatRole::Agent,
        }
    }
}

/// FFI-safe list query. Dates are `YYYY-MM-DD`.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub statuses: Vec<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    /// Only items from the configured recent window
    pub recent_only: bool,
    pub in_stock_only: bool,
    pub sort_field: Option<FfiSortField>,
    pub descending: bool,
}

impl FfiQuery {
    fn into_query(self, recent_window_days: u32) -> Result<Query, CuraError> {
        let mut query = Query::new();
        if let Some(search) = self.search {
            query = query.search(search);
        }
        if let Some(category) = self.category {
            query = query.category(category);
        }
        if !self.statuses.is_empty() {
            query = query.status_in(self.statuses);
        }
        if self.date_from.is_some() || self.date_to.is_some() {
            query = query.between(
                parse_date(self.date_from.as_deref())?,
                parse_date(self.date_to.as_deref())?,
            );
        }
        if self.recent_only {
            query = query.within_days(Utc::now(), recent_window_days);
        }
        if self.in_stock_only {
            query = query.in_stock();
        }
        if let Some(field) = self.sort_field {
            query = query.sorted(if self.descending {
                Sort::descending(field.into())
            } else {
                Sort::ascending(field.into())
            });
        }
        Ok(query)
    }
}

fn parse_date(date: Option<&str>) -> Result<Option<NaiveDate>, CuraError> {
    date.map(|d| {
        NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")
            .map_err(|e| CuraError::InvalidInput(format!("bad date {:?}: {}", d, e)))
    })
    .transpose()
}

/// FFI-safe wellness summary.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiWellnessSummary {
    pub days_logged: u32,
    pub avg_sleep: f64,
    pub total_steps: u64,
    pub avg_water: f64,
    pub common_mood: String,
    pub exercise_days: u32,
    pub streak_days: u32,
}

impl FfiWellnessSummary {
    fn new(summary: projection::WellnessSummary, streak_days: u32) -> Self {
        Self {
            days_logged: summary.days_logged as u32,
            avg_sleep: summary.avg_sleep,
            total_steps: summary.total_steps,
            avg_water: summary.avg_water,
            common_mood: summary.common_mood,
            exercise_days: summary.exercise_days as u32,
            streak_days,
        }
    }
}
