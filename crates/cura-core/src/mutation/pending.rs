//! In-flight bookkeeping for a single mutation.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use crate::models::EntityId;
use crate::projection::ViewCollection;

use super::CommitRequest;

/// Ids with a mutation in flight.
pub(crate) type InFlight = Rc<RefCell<HashSet<EntityId>>>;

/// Holds an id's in-flight slot; releases it when dropped.
#[derive(Debug)]
pub(crate) struct InFlightGuard {
    in_flight: InFlight,
    id: EntityId,
}

impl InFlightGuard {
    /// Claim the slot for `id`, or `None` if it is taken.
    pub(crate) fn acquire(in_flight: &InFlight, id: EntityId) -> Option<Self> {
        if !in_flight.borrow_mut().insert(id.clone()) {
            return None;
        }
        Some(Self {
            in_flight: Rc::clone(in_flight),
            id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.borrow_mut().remove(&self.id);
    }
}

/// What the optimistic change did, so it can be undone on its own.
#[derive(Debug, Clone)]
pub(crate) enum Applied<T> {
    Created,
    Updated { previous: T },
    Deleted { previous: T, index: usize },
}

/// A mutation between its optimistic apply and its settlement.
pub(crate) struct PendingMutation<T> {
    pub(crate) request: CommitRequest,
    pub(crate) applied: Applied<T>,
    /// Collection as it was before the optimistic change.
    pub(crate) snapshot: ViewCollection<T>,
    /// Collection version right after the optimistic change.
    pub(crate) version: u64,
    pub(crate) reload_requested: bool,
    pub(crate) slot: InFlightGuard,
}

impl<T> PendingMutation<T> {
    /// Id the mutation holds the slot for.
    pub(crate) fn id(&self) -> &EntityId {
        &self.slot.id
    }
}
