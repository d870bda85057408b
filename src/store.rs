//! Reactive state containers.
//!
//! `Store<S>` holds a snapshot and pushes every new value to watch-channel
//! subscribers and to synchronous listeners. `EntityStore` layers the shared
//! load/get/create/update/delete lifecycle over one `MockApi` collection.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;

use crate::mock_api::{Entity, MockApi, Patch};
use crate::stores::StoreError;

// ═══════════════════════════════════════════════════════════
// Store<S>
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener<S> = Arc<dyn Fn(&S) + Send + Sync>;

pub struct Store<S> {
    tx: watch::Sender<S>,
    listeners: Mutex<Vec<(ListenerId, Listener<S>)>>,
    next_listener: AtomicU64,
}

impl<S: Clone + Send + Sync + 'static> Store<S> {
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            tx,
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Clone of the current snapshot.
    pub fn get(&self) -> S {
        self.tx.borrow().clone()
    }

    /// Reads the current snapshot without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn set(&self, value: S) {
        self.tx.send_replace(value);
        self.notify();
    }

    pub fn update(&self, f: impl FnOnce(&mut S)) {
        self.tx.send_modify(f);
        self.notify();
    }

    /// Async receiver that observes every later snapshot.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }

    /// Registers a synchronous listener. It runs once immediately with the
    /// current value, then after every change.
    pub fn listen(&self, f: impl Fn(&S) + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        let listener: Listener<S> = Arc::new(f);
        listener(&self.get());
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    /// Returns false when the id was not registered.
    pub fn unlisten(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(l, _)| *l != id);
        listeners.len() != before
    }

    fn notify(&self) {
        let listeners: Vec<Listener<S>> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        if listeners.is_empty() {
            return;
        }
        let snapshot = self.get();
        for listener in listeners {
            listener(&snapshot);
        }
    }
}

// ═══════════════════════════════════════════════════════════
// EntityState / EntityStore
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    Idle,
    Loading,
    Failed,
}

/// `{ data, is_loading, error, filters }` plus a free-text search query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityState<T, F> {
    pub data: Vec<T>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub filters: F,
    pub search_query: String,
}

impl<T, F: Default> EntityState<T, F> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data,
            is_loading: false,
            error: None,
            filters: F::default(),
            search_query: String::new(),
        }
    }
}

impl<T, F> EntityState<T, F> {
    pub fn status(&self) -> LoadStatus {
        if self.is_loading {
            LoadStatus::Loading
        } else if self.error.is_some() {
            LoadStatus::Failed
        } else {
            LoadStatus::Idle
        }
    }
}

/// Reactive mirror of one `MockApi` collection.
pub struct EntityStore<T: Entity, F> {
    api: Arc<MockApi<T>>,
    store: Store<EntityState<T, F>>,
}

impl<T, F> EntityStore<T, F>
where
    T: Entity,
    F: Clone + Default + Send + Sync + 'static,
{
    /// Starts from the collection's current contents.
    pub fn new(api: Arc<MockApi<T>>) -> Self {
        let store = Store::new(EntityState::new(api.snapshot()));
        Self { api, store }
    }

    pub fn api(&self) -> &Arc<MockApi<T>> {
        &self.api
    }

    pub fn store(&self) -> &Store<EntityState<T, F>> {
        &self.store
    }

    pub fn state(&self) -> EntityState<T, F> {
        self.store.get()
    }

    pub fn data(&self) -> Vec<T> {
        self.store.with(|s| s.data.clone())
    }

    pub fn subscribe(&self) -> watch::Receiver<EntityState<T, F>> {
        self.store.subscribe()
    }

    /// Runs one operation through `loading → (success | error) → idle`.
    ///
    /// On success `apply` folds the result into the state; on failure the
    /// error message is recorded. Either way `is_loading` ends false.
    pub async fn run<R, Fut>(
        &self,
        op: &'static str,
        fut: Fut,
        apply: impl FnOnce(&mut EntityState<T, F>, &R),
    ) -> Result<R, StoreError>
    where
        Fut: Future<Output = Result<R, StoreError>>,
    {
        self.store.update(|s| {
            s.is_loading = true;
            s.error = None;
        });
        match fut.await {
            Ok(value) => {
                self.store.update(|s| {
                    apply(s, &value);
                    s.is_loading = false;
                });
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(entity = T::KIND, op, error = %e, "store operation failed");
                let message = e.to_string();
                self.store.update(|s| {
                    s.error = Some(message);
                    s.is_loading = false;
                });
                Err(e)
            }
        }
    }

    // ── Generic lifecycle ───────────────────────────────────

    pub async fn load(&self) -> Result<Vec<T>, StoreError> {
        let api = Arc::clone(&self.api);
        self.run("load", async move { Ok(api.get_all().await) }, |s, data| {
            s.data = data.clone();
        })
        .await
    }

    /// Fetches one record from the collection without touching the lifecycle.
    pub async fn get(&self, id: &str) -> Result<T, StoreError> {
        Ok(self.api.get_by_id(id).await?)
    }

    /// Creates `item` and appends it to the mirrored list.
    pub async fn insert(&self, item: T) -> Result<T, StoreError> {
        let api = Arc::clone(&self.api);
        self.run("create", async move { Ok(api.create(item).await?) }, |s, created| {
            s.data.push(created.clone());
        })
        .await
    }

    /// Creates `item` and puts it at the head of the mirrored list.
    pub async fn insert_front(&self, item: T) -> Result<T, StoreError> {
        let api = Arc::clone(&self.api);
        self.run("create", async move { Ok(api.create(item).await?) }, |s, created| {
            s.data.insert(0, created.clone());
        })
        .await
    }

    pub async fn patch(&self, id: &str, patch: impl Patch<T>) -> Result<T, StoreError> {
        let api = Arc::clone(&self.api);
        self.run(
            "update",
            async move { Ok(api.update(id, patch).await?) },
            |s, updated| replace_in(&mut s.data, updated),
        )
        .await
    }

    pub async fn remove(&self, id: &str) -> Result<(), StoreError> {
        let api = Arc::clone(&self.api);
        let owned = id.to_string();
        self.run("delete", async move { Ok(api.delete(id).await?) }, move |s, _| {
            s.data.retain(|item| item.id() != owned);
        })
        .await
    }

    /// Applies a change made directly through the api to the mirrored list.
    pub fn apply_local(&self, updated: &T) {
        self.store.update(|s| replace_in(&mut s.data, updated));
    }

    /// Re-mirrors the collection without latency or lifecycle transitions.
    pub fn sync_from_api(&self) {
        let data = self.api.snapshot();
        self.store.update(|s| s.data = data);
    }

    // ── Filters ─────────────────────────────────────────────

    pub fn filters(&self) -> F {
        self.store.with(|s| s.filters.clone())
    }

    pub fn set_filters(&self, filters: F) {
        self.store.update(|s| s.filters = filters);
    }

    pub fn update_filters(&self, f: impl FnOnce(&mut F)) {
        self.store.update(|s| f(&mut s.filters));
    }

    /// Resets filters and the search query.
    pub fn clear_filters(&self) {
        self.store.update(|s| {
            s.filters = F::default();
            s.search_query.clear();
        });
    }

    pub fn set_search_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.store.update(|s| s.search_query = query);
    }
}

fn replace_in<T: Entity>(data: &mut [T], updated: &T) {
    if let Some(slot) = data.iter_mut().find(|item| item.id() == updated.id()) {
        *slot = updated.clone();
    }
}
