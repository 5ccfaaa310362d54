//! Optimistic mutation controller.
//!
//! A mutation is applied to the local collection as soon as it is issued,
//! then committed to the service. When the commit fails the change is rolled
//! back: the whole collection is restored if nothing else touched it in the
//! meantime, otherwise only the affected entity is reverted. An entity that
//! was replaced by authoritative state in between is left as the service
//! sent it.
//!
//! The controller is single-threaded. State lives behind `RefCell`/`Cell`
//! and no borrow is held across an `.await`.

mod error;
mod pending;

pub use error::{MutationError, MutationResult};

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::models::{Entity, EntityId};
use crate::normalizer::{Normalizer, RawRecord};
use crate::projection::ViewCollection;
use crate::service::{CommitResponse, ServiceError};

use pending::{Applied, InFlight, InFlightGuard, PendingMutation};

/// A requested change to one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create { payload: RawRecord },
    /// Patch keys may use any wire spelling of a field.
    Update { id: EntityId, patch: RawRecord },
    Delete { id: EntityId },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationOptions {
    /// Ask the caller to reload the whole collection after a successful
    /// commit.
    pub force_reload: bool,
}

impl MutationOptions {
    pub fn reload() -> Self {
        Self { force_reload: true }
    }
}

/// What is sent to the service. Ids here are always authoritative.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitRequest {
    Create { payload: RawRecord },
    /// `payload` carries only the patched fields, keyed by field name.
    Update { id: String, payload: RawRecord },
    Delete { id: String },
}

/// Outcome of a committed mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationReceipt<T> {
    /// Final id; authoritative after a create unless the service sent none.
    pub id: EntityId,
    /// Entity as it now stands; `None` after a delete.
    pub entity: Option<T>,
    pub reload_requested: bool,
}

/// Owns one collection and every mutation against it.
pub struct MutationController<T> {
    collection: RefCell<ViewCollection<T>>,
    in_flight: InFlight,
    /// Bumped on every change to the collection.
    version: Cell<u64>,
    /// Version right after the last authoritative replace.
    replaced_at: Cell<u64>,
    detached: Cell<bool>,
    normalizer: Normalizer,
}

impl<T: Entity> Default for MutationController<T> {
    fn default() -> Self {
        Self::new(Normalizer::new())
    }
}

impl<T: Entity> MutationController<T> {
    pub fn new(normalizer: Normalizer) -> Self {
        Self::with_items(ViewCollection::new(), normalizer)
    }

    pub fn with_items(items: ViewCollection<T>, normalizer: Normalizer) -> Self {
        Self {
            collection: RefCell::new(items),
            in_flight: Rc::default(),
            version: Cell::new(0),
            replaced_at: Cell::new(0),
            detached: Cell::new(false),
            normalizer,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Copy of the current collection.
    pub fn items(&self) -> ViewCollection<T> {
        self.collection.borrow().clone()
    }

    pub fn with_items_ref<R>(&self, f: impl FnOnce(&ViewCollection<T>) -> R) -> R {
        f(&self.collection.borrow())
    }

    /// Replace the collection with authoritative state.
    ///
    /// Mutations begun before this no longer revert their entity on
    /// failure; the replaced state stands.
    pub fn replace_all(&self, items: ViewCollection<T>) {
        *self.collection.borrow_mut() = items;
        self.bump();
        self.replaced_at.set(self.version());
    }

    pub fn version(&self) -> u64 {
        self.version.get()
    }

    pub fn is_in_flight(&self, id: &EntityId) -> bool {
        self.in_flight.borrow().contains(id)
    }

    /// Mark the owning view as gone. Mutations still in flight settle as
    /// [`MutationError::Stale`] without touching the collection.
    pub fn detach(&self) {
        self.detached.set(true);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.get()
    }

    fn bump(&self) {
        self.version.set(self.version.get() + 1);
    }

    /// [`Self::mutate_with`] with default options.
    pub fn mutate<'a, F, Fut>(
        &'a self,
        mutation: Mutation,
        commit: F,
    ) -> impl Future<Output = MutationResult<MutationReceipt<T>>> + 'a
    where
        T: 'a,
        F: FnOnce(CommitRequest) -> Fut + 'a,
        Fut: Future<Output = Result<Value, ServiceError>> + 'a,
    {
        self.mutate_with(mutation, MutationOptions::default(), commit)
    }

    /// Apply `mutation` locally right away, then commit it with `commit`.
    ///
    /// The optimistic change, the in-flight slot and any local rejection
    /// (`Busy`, `Unsynced`, `NotFound`) all happen before this returns; the
    /// future only awaits the commit and settles. Dropping the future
    /// releases the slot.
    pub fn mutate_with<'a, F, Fut>(
        &'a self,
        mutation: Mutation,
        options: MutationOptions,
        commit: F,
    ) -> impl Future<Output = MutationResult<MutationReceipt<T>>> + 'a
    where
        T: 'a,
        F: FnOnce(CommitRequest) -> Fut + 'a,
        Fut: Future<Output = Result<Value, ServiceError>> + 'a,
    {
        let begun = self.begin(mutation, options);
        async move {
            let pending = begun?;
            let outcome = commit(pending.request.clone()).await;
            self.settle(pending, outcome)
        }
    }

    // =========================================================================
    // Begin
    // =========================================================================

    fn begin(
        &self,
        mutation: Mutation,
        options: MutationOptions,
    ) -> MutationResult<PendingMutation<T>> {
        if self.is_detached() {
            return Err(MutationError::Stale);
        }
        match mutation {
            Mutation::Create { payload } => self.begin_create(payload, options),
            Mutation::Update { id, patch } => self.begin_update(id, patch, options),
            Mutation::Delete { id } => self.begin_delete(id, options),
        }
    }

    fn begin_create(
        &self,
        payload: RawRecord,
        options: MutationOptions,
    ) -> MutationResult<PendingMutation<T>> {
        let mut entity: T = self.normalizer.normalize_as(&payload);
        if !entity.id().is_synthesized() {
            entity.set_id(EntityId::synthesize(T::KIND));
        }
        let id = entity.id().clone();
        let slot = self.acquire(&id)?;

        let snapshot = self.items();
        self.collection.borrow_mut().push(entity);
        self.bump();
        debug!(kind = %T::KIND, id = %id, "optimistic create");

        Ok(PendingMutation {
            request: CommitRequest::Create { payload },
            applied: Applied::Created,
            snapshot,
            version: self.version(),
            reload_requested: options.force_reload,
            slot,
        })
    }

    fn begin_update(
        &self,
        id: EntityId,
        patch: RawRecord,
        options: MutationOptions,
    ) -> MutationResult<PendingMutation<T>> {
        let slot = self.acquire(&id)?;
        let service_id = self.service_id(&id)?;
        let (_, previous) = self.locate(&id)?;

        let updated = self.normalizer.apply_patch(&previous, &patch);
        let payload = self.normalizer.wire_patch(T::KIND, &patch);

        let snapshot = self.items();
        self.collection.borrow_mut().upsert(updated);
        self.bump();
        debug!(kind = %T::KIND, id = %id, "optimistic update");

        Ok(PendingMutation {
            request: CommitRequest::Update {
                id: service_id,
                payload,
            },
            applied: Applied::Updated { previous },
            snapshot,
            version: self.version(),
            reload_requested: options.force_reload,
            slot,
        })
    }

    fn begin_delete(
        &self,
        id: EntityId,
        options: MutationOptions,
    ) -> MutationResult<PendingMutation<T>> {
        let slot = self.acquire(&id)?;
        let service_id = self.service_id(&id)?;
        let (index, previous) = self.locate(&id)?;

        let snapshot = self.items();
        self.collection.borrow_mut().remove(&id);
        self.bump();
        debug!(kind = %T::KIND, id = %id, "optimistic delete");

        Ok(PendingMutation {
            request: CommitRequest::Delete { id: service_id },
            applied: Applied::Deleted { previous, index },
            snapshot,
            version: self.version(),
            reload_requested: options.force_reload,
            slot,
        })
    }

    fn acquire(&self, id: &EntityId) -> MutationResult<InFlightGuard> {
        InFlightGuard::acquire(&self.in_flight, id.clone())
            .ok_or_else(|| MutationError::Busy(id.clone()))
    }

    fn service_id(&self, id: &EntityId) -> MutationResult<String> {
        id.service_id()
            .map(str::to_string)
            .ok_or_else(|| MutationError::Unsynced(id.clone()))
    }

    fn locate(&self, id: &EntityId) -> MutationResult<(usize, T)> {
        let collection = self.collection.borrow();
        collection
            .position(id)
            .and_then(|index| collection.get(id).map(|e| (index, e.clone())))
            .ok_or_else(|| MutationError::NotFound(id.to_string()))
    }

    // =========================================================================
    // Settle
    // =========================================================================

    fn settle(
        &self,
        pending: PendingMutation<T>,
        outcome: Result<Value, ServiceError>,
    ) -> MutationResult<MutationReceipt<T>> {
        if self.is_detached() {
            debug!(kind = %T::KIND, id = %pending.id(), "view detached, dropping settlement");
            return Err(MutationError::Stale);
        }

        let outcome =
            outcome.and_then(|value| CommitResponse::from_value(&value, T::KIND).into_result());
        match outcome {
            Ok(response) => Ok(self.commit(pending, response)),
            Err(e) => {
                self.rollback(pending, &e);
                Err(e.into())
            }
        }
    }

    fn commit(&self, pending: PendingMutation<T>, response: CommitResponse) -> MutationReceipt<T> {
        let mut id = pending.id().clone();

        if let Applied::Created = pending.applied {
            match response.id {
                Some(assigned) => {
                    let assigned = EntityId::authoritative(assigned);
                    self.collection.borrow_mut().rename(&id, assigned.clone());
                    self.bump();
                    id = assigned;
                }
                None => {
                    debug!(kind = %T::KIND, id = %id, "create committed without an id")
                }
            }
        }

        let entity = match pending.applied {
            Applied::Deleted { .. } => None,
            _ => self.collection.borrow().get(&id).cloned(),
        };
        info!(kind = %T::KIND, id = %id, "mutation committed");

        MutationReceipt {
            id,
            entity,
            reload_requested: pending.reload_requested,
        }
    }

    fn rollback(&self, pending: PendingMutation<T>, error: &ServiceError) {
        let id = pending.id().clone();
        let untouched = self.version() == pending.version;
        let replaced = self.replaced_at.get() > pending.version;
        {
            let mut collection = self.collection.borrow_mut();
            if untouched {
                *collection = pending.snapshot;
            } else {
                match pending.applied {
                    Applied::Created => {
                        collection.remove(&id);
                    }
                    Applied::Updated { previous, .. } => {
                        if !replaced && collection.contains(&id) {
                            collection.upsert(previous);
                        }
                    }
                    Applied::Deleted { previous, index } => {
                        if !replaced {
                            collection.insert_at(index, previous);
                        }
                    }
                }
            }

            if matches!(error, ServiceError::NotFound(_)) {
                collection.remove(&id);
            }
        }
        self.bump();
        warn!(
            kind = %T::KIND,
            id = %id,
            error = %error,
            exact = untouched,
            replaced,
            "mutation rolled back"
        );
    }
}
