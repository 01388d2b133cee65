//! Reference-data caches (menu, tables) and the draft store
//!
//! Reference data is never fetched implicitly on first read; a screen must
//! call `refetch` once and every later mount reads the cache. The single
//! exception is a tenant mismatch: serving another restaurant's data is a
//! correctness violation, so the cache clears itself and refetches exactly
//! once before answering.

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use shared::models::{MenuProduct, OrderDraft};

use crate::error::ClientError;
use crate::store::kv::{read_record, write_record, CacheRecord, ScopedStore, KEY_DRAFT_ORDER};

/// Restaurant-scoped cache for slow-changing reference data
pub struct ReferenceCache<T> {
    key: &'static str,
    data: Option<T>,
    restaurant_id: Option<String>,
    last_updated_at: Option<u64>,
    store: Arc<dyn ScopedStore>,
}

impl<T> ReferenceCache<T>
where
    T: Clone + Serialize + DeserializeOwned,
{
    /// `key` is the persisted record name (`menuStore`, `tablesStore`)
    pub fn new(key: &'static str, store: Arc<dyn ScopedStore>) -> Self {
        Self {
            key,
            data: None,
            restaurant_id: None,
            last_updated_at: None,
            store,
        }
    }

    /// Load the persisted record, once at process start
    pub fn load_persisted(&mut self) {
        match read_record::<CacheRecord<T>>(self.store.as_ref(), self.key) {
            Ok(Some(record)) => {
                self.data = Some(record.data);
                self.restaurant_id = record.restaurant_id;
                self.last_updated_at = Some(record.last_updated_at);
                tracing::debug!(key = self.key, "Cache record loaded from disk");
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(key = self.key, error = %e, "Failed to load cache record"),
        }
    }

    /// Read for the given tenant.
    ///
    /// - tenant matches: cached data, no fetch;
    /// - never populated: `None`, no fetch (screens refetch explicitly);
    /// - tenant mismatch: clear, then `fetch` exactly once and serve the
    ///   fresh payload; the stale payload is never returned. When that
    ///   refetch fails the discarded data is reported as
    ///   [`ClientError::StaleTenant`].
    pub async fn read<F, Fut>(
        &mut self,
        current_restaurant_id: &str,
        fetch: F,
    ) -> Result<Option<&T>, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let stale = self
            .restaurant_id
            .as_deref()
            .is_some_and(|rid| rid != current_restaurant_id);
        if stale {
            tracing::info!(
                key = self.key,
                current = %current_restaurant_id,
                "Stale tenant in cache, clearing and refetching"
            );
            self.clear();
            if let Err(e) = self.populate(current_restaurant_id, fetch).await {
                tracing::warn!(key = self.key, error = %e, "Refetch after stale tenant failed");
                return Err(ClientError::StaleTenant);
            }
        }
        Ok(self.data.as_ref())
    }

    /// Explicit refetch, the normal population path
    pub async fn refetch<F, Fut>(
        &mut self,
        current_restaurant_id: &str,
        fetch: F,
    ) -> Result<(), ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        self.populate(current_restaurant_id, fetch).await
    }

    /// Drop the cached payload and its persisted record.
    /// Stale entries are replaced wholesale, never merged.
    pub fn clear(&mut self) {
        self.data = None;
        self.restaurant_id = None;
        self.last_updated_at = None;
        if let Err(e) = self.store.delete(self.key) {
            tracing::warn!(key = self.key, error = %e, "Failed to delete cache record");
        }
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    pub fn restaurant_id(&self) -> Option<&str> {
        self.restaurant_id.as_deref()
    }

    pub fn last_updated_at(&self) -> Option<u64> {
        self.last_updated_at
    }

    async fn populate<F, Fut>(
        &mut self,
        current_restaurant_id: &str,
        fetch: F,
    ) -> Result<(), ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let data = fetch().await?;
        let now = shared::util::now_millis();

        self.restaurant_id = Some(current_restaurant_id.to_string());
        self.last_updated_at = Some(now);

        // Persistence failure must not block the in-memory population
        let record = CacheRecord {
            data: data.clone(),
            restaurant_id: self.restaurant_id.clone(),
            last_updated_at: now,
        };
        if let Err(e) = write_record(self.store.as_ref(), self.key, &record) {
            tracing::warn!(key = self.key, error = %e, "Failed to persist cache record");
        }

        self.data = Some(data);
        Ok(())
    }
}

/// Restaurant-scoped transient UI state: the order being composed and the
/// product the waiter selected. Cleared on restaurant switch because it is
/// not re-derived automatically.
pub struct DraftStore {
    draft: Option<OrderDraft>,
    selected_product: Option<MenuProduct>,
    restaurant_id: Option<String>,
    store: Arc<dyn ScopedStore>,
}

impl DraftStore {
    pub fn new(store: Arc<dyn ScopedStore>) -> Self {
        Self {
            draft: None,
            selected_product: None,
            restaurant_id: None,
            store,
        }
    }

    pub fn load_persisted(&mut self) {
        match read_record::<CacheRecord<OrderDraft>>(self.store.as_ref(), KEY_DRAFT_ORDER) {
            Ok(Some(record)) => {
                self.draft = Some(record.data);
                self.restaurant_id = record.restaurant_id;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to load draft record"),
        }
    }

    pub fn set_draft(&mut self, draft: OrderDraft, restaurant_id: &str) {
        self.restaurant_id = Some(restaurant_id.to_string());
        let record = CacheRecord {
            data: draft.clone(),
            restaurant_id: self.restaurant_id.clone(),
            last_updated_at: shared::util::now_millis(),
        };
        if let Err(e) = write_record(self.store.as_ref(), KEY_DRAFT_ORDER, &record) {
            tracing::warn!(error = %e, "Failed to persist draft record");
        }
        self.draft = Some(draft);
    }

    pub fn set_selected_product(&mut self, product: MenuProduct) {
        self.selected_product = Some(product);
    }

    pub fn draft(&self) -> Option<&OrderDraft> {
        self.draft.as_ref()
    }

    pub fn selected_product(&self) -> Option<&MenuProduct> {
        self.selected_product.as_ref()
    }

    /// Drop draft, selection and the persisted record
    pub fn clear(&mut self) {
        self.draft = None;
        self.selected_product = None;
        self.restaurant_id = None;
        if let Err(e) = self.store.delete(KEY_DRAFT_ORDER) {
            tracing::warn!(error = %e, "Failed to delete draft record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::kv::{MemoryStore, KEY_MENU_STORE};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> ReferenceCache<Vec<String>> {
        ReferenceCache::new(KEY_MENU_STORE, Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_no_fetch_on_first_read() {
        let mut cache = cache();
        let fetches = Arc::new(AtomicUsize::new(0));

        let counter = fetches.clone();
        let result = cache
            .read("r1", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["menu".to_string()])
            })
            .await
            .unwrap();

        assert!(result.is_none());
        assert_eq!(fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refetch_populates_and_read_serves_cache() {
        let mut cache = cache();
        let fetches = Arc::new(AtomicUsize::new(0));

        let counter = fetches.clone();
        cache
            .refetch("r1", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["menu-r1".to_string()])
            })
            .await
            .unwrap();

        let counter = fetches.clone();
        let data = cache
            .read("r1", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["should-not-run".to_string()])
            })
            .await
            .unwrap();

        assert_eq!(data.unwrap()[0], "menu-r1");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cache.restaurant_id(), Some("r1"));
    }

    #[tokio::test]
    async fn test_tenant_mismatch_refetches_exactly_once() {
        // cache holds r1 data while the session has moved to r2
        let mut cache = cache();
        cache
            .refetch("r1", || async { Ok(vec!["menu-r1".to_string()]) })
            .await
            .unwrap();

        let fetches = Arc::new(AtomicUsize::new(0));
        let counter = fetches.clone();
        let data = cache
            .read("r2", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["menu-r2".to_string()])
            })
            .await
            .unwrap();

        // never the stale payload, exactly one automatic refetch
        assert_eq!(data.unwrap()[0], "menu-r2");
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cache.restaurant_id(), Some("r2"));

        // the next read is a plain cache hit
        let counter = fetches.clone();
        cache
            .read("r2", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(vec![])
            })
            .await
            .unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_auto_refetch_surfaces_and_keeps_cache_empty() {
        let mut cache = cache();
        cache
            .refetch("r1", || async { Ok(vec!["menu-r1".to_string()]) })
            .await
            .unwrap();

        let result = cache
            .read("r2", || async { Err(ClientError::NotConnected) })
            .await;

        // the discarded data is reported as a stale-tenant error and the
        // stale payload is gone even though the refetch failed
        assert!(matches!(result, Err(ClientError::StaleTenant)));
        assert!(cache.data().is_none());
    }

    #[tokio::test]
    async fn test_persisted_record_reloads() {
        let backing: Arc<dyn ScopedStore> = Arc::new(MemoryStore::new());

        let mut cache: ReferenceCache<Vec<String>> =
            ReferenceCache::new(KEY_MENU_STORE, backing.clone());
        cache
            .refetch("r1", || async { Ok(vec!["menu-r1".to_string()]) })
            .await
            .unwrap();

        let mut reloaded: ReferenceCache<Vec<String>> =
            ReferenceCache::new(KEY_MENU_STORE, backing);
        reloaded.load_persisted();

        assert_eq!(reloaded.restaurant_id(), Some("r1"));
        assert_eq!(reloaded.data().unwrap()[0], "menu-r1");
    }

    #[tokio::test]
    async fn test_clear_removes_memory_and_record() {
        let backing: Arc<dyn ScopedStore> = Arc::new(MemoryStore::new());
        let mut cache: ReferenceCache<Vec<String>> =
            ReferenceCache::new(KEY_MENU_STORE, backing.clone());
        cache
            .refetch("r1", || async { Ok(vec!["menu-r1".to_string()]) })
            .await
            .unwrap();

        cache.clear();
        assert!(cache.data().is_none());
        assert!(backing.get(KEY_MENU_STORE).unwrap().is_none());
    }

    #[test]
    fn test_draft_store_clear() {
        let mut draft = DraftStore::new(Arc::new(MemoryStore::new()));
        draft.set_draft(OrderDraft::default(), "r1");
        draft.set_selected_product(MenuProduct {
            id: "p1".to_string(),
            name: "Tortilla".to_string(),
            price: 8.0,
            description: None,
            available: true,
        });

        draft.clear();
        assert!(draft.draft().is_none());
        assert!(draft.selected_product().is_none());
    }
}
