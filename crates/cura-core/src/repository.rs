//! Per-kind entity views.
//!
//! An [`EntityView`] ties the pieces together for one entity kind: it
//! hydrates from the local cache, refreshes from the service, routes every
//! change through a [`MutationController`], and mirrors each authoritative
//! state back into the cache under the signed-in principal's scope.

use std::rc::Rc;

use futures::future::join_all;
use serde_json::Value;
use tracing::{info, warn};

use crate::cache::{CacheBackend, CacheScope, LocalCache, Namespace, SqliteBackend};
use crate::models::{Entity, EntityId};
use crate::mutation::{
    CommitRequest, Mutation, MutationController, MutationOptions, MutationReceipt,
    MutationResult,
};
use crate::normalizer::{Normalizer, RawRecord};
use crate::projection::{Query, ViewCollection};
use crate::service::{CommitResponse, IdentityProvider, ServiceBoundary, ServiceError};

/// Live, cached, mutable view of one entity kind.
pub struct EntityView<T, S, I, B = SqliteBackend> {
    controller: MutationController<T>,
    service: Rc<S>,
    identity: Rc<I>,
    cache: Rc<LocalCache<B>>,
}

impl<T, S, I, B> EntityView<T, S, I, B>
where
    T: Entity,
    S: ServiceBoundary,
    I: IdentityProvider,
    B: CacheBackend,
{
    pub fn new(service: Rc<S>, identity: Rc<I>, cache: Rc<LocalCache<B>>) -> Self {
        Self::with_normalizer(service, identity, cache, Normalizer::new())
    }

    pub fn with_normalizer(
        service: Rc<S>,
        identity: Rc<I>,
        cache: Rc<LocalCache<B>>,
        normalizer: Normalizer,
    ) -> Self {
        Self {
            controller: MutationController::new(normalizer),
            service,
            identity,
            cache,
        }
    }

    pub fn controller(&self) -> &MutationController<T> {
        &self.controller
    }

    fn scope(&self) -> Option<CacheScope> {
        CacheScope::for_principal(self.identity.current_principal().as_deref())
    }

    fn namespace() -> Namespace {
        Namespace::entities(T::KIND)
    }

    fn mirror(&self) {
        let scope = self.scope();
        self.controller
            .with_items_ref(|items| self.cache.save(&Self::namespace(), scope.as_ref(), items));
    }

    /// Load the cached collection, if any. Returns whether one was found.
    pub fn hydrate(&self) -> bool {
        let scope = self.scope();
        match self
            .cache
            .load::<ViewCollection<T>>(&Self::namespace(), scope.as_ref())
        {
            Some(items) => {
                self.controller.replace_all(items);
                true
            }
            None => false,
        }
    }

    /// Replace the collection with the service's listing.
    pub async fn refresh(&self, hint: Option<&str>) -> Result<usize, ServiceError> {
        let value = self.service.fetch_all(T::KIND, hint).await?;
        let items = self.listing(&value)?;
        Ok(self.install(ViewCollection::from_items(items)))
    }

    /// Fetch several listings concurrently and merge them in hint order.
    /// Any failed fetch fails the whole refresh and leaves state untouched.
    pub async fn refresh_many(&self, hints: &[&str]) -> Result<usize, ServiceError> {
        let fetches = hints
            .iter()
            .map(|hint| self.service.fetch_all(T::KIND, Some(*hint)));
        let responses = join_all(fetches).await;

        let mut merged = Vec::new();
        for response in responses {
            merged.extend(self.listing(&response?)?);
        }
        Ok(self.install(ViewCollection::from_items(merged)))
    }

    fn listing(&self, value: &Value) -> Result<Vec<T>, ServiceError> {
        CommitResponse::from_value(value, T::KIND).into_result()?;
        Ok(self.controller.normalizer().normalize_batch_as(value))
    }

    fn install(&self, items: ViewCollection<T>) -> usize {
        let count = items.len();
        if self.controller.is_detached() {
            return count;
        }
        self.controller.replace_all(items);
        self.mirror();
        info!(kind = %T::KIND, count, "refreshed collection");
        count
    }

    /// Create an entity. The signed-in principal is attached as `user_id`
    /// unless the payload already names one.
    pub async fn create(
        &self,
        mut payload: RawRecord,
        options: MutationOptions,
    ) -> MutationResult<MutationReceipt<T>> {
        if let Some(principal) = self.identity.current_principal() {
            payload
                .entry("user_id")
                .or_insert_with(|| Value::String(principal));
        }
        self.run(Mutation::Create { payload }, options).await
    }

    pub async fn update(
        &self,
        id: EntityId,
        patch: RawRecord,
        options: MutationOptions,
    ) -> MutationResult<MutationReceipt<T>> {
        self.run(Mutation::Update { id, patch }, options).await
    }

    pub async fn delete(
        &self,
        id: EntityId,
        options: MutationOptions,
    ) -> MutationResult<MutationReceipt<T>> {
        self.run(Mutation::Delete { id }, options).await
    }

    async fn run(
        &self,
        mutation: Mutation,
        options: MutationOptions,
    ) -> MutationResult<MutationReceipt<T>> {
        let receipt = self
            .controller
            .mutate_with(mutation, options, |request| self.commit(request))
            .await?;
        self.mirror();

        if receipt.reload_requested {
            if let Err(e) = self.refresh(None).await {
                warn!(kind = %T::KIND, error = %e, "reload after mutation failed");
            }
        }
        Ok(receipt)
    }

    async fn commit(&self, request: CommitRequest) -> Result<Value, ServiceError> {
        match request {
            CommitRequest::Create { payload } => self.service.create(T::KIND, &payload).await,
            CommitRequest::Update { id, payload } => {
                self.service.update(T::KIND, &id, &payload).await
            }
            CommitRequest::Delete { id } => self.service.delete(T::KIND, &id).await,
        }
    }

    pub fn items(&self) -> ViewCollection<T> {
        self.controller.items()
    }

    pub fn project(&self, query: &Query) -> ViewCollection<T> {
        self.controller.with_items_ref(|items| items.project(query))
    }

    /// The view is going away; pending mutations will settle as stale.
    pub fn detach(&self) {
        self.controller.detach();
    }
}
