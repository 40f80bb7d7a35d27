//! Async access to the promise store
//!
//! SQLite calls block, so every call here runs on tokio's blocking pool and
//! the caller just awaits the result. A single mutex around the store means
//! one mutation finishes (and commits) before the next begins.
//!
//! Each successful mutation publishes a fresh list of all promises on a
//! `watch` channel, giving front ends a live view without polling.

use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::warn;

use crate::models::{
    Category, CategoryId, NewPromise, Promise, PromiseId, Subtitle, SubtitleId, Title, TitleId,
};
use crate::storage::error::{StorageError, StorageResult};
use crate::storage::legacy::LegacyRow;
use crate::store::{ImportReport, Store};

pub type Snapshot = Arc<Vec<Promise>>;

#[derive(Clone)]
pub struct PromiseService {
    store: Arc<Mutex<Store>>,
    snapshot: Arc<watch::Sender<Snapshot>>,
}

impl PromiseService {
    pub fn new(store: Store) -> StorageResult<Self> {
        let initial = Arc::new(store.all_promises()?);
        let (sender, _) = watch::channel(initial);
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            snapshot: Arc::new(sender),
        })
    }

    /// Live stream of all promises, updated after every change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.subscribe()
    }

    async fn read<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&Store) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || {
            let store = store.lock().unwrap_or_else(|e| e.into_inner());
            f(&*store)
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }

    async fn write<T, F>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Store) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let snapshot = Arc::clone(&self.snapshot);
        tokio::task::spawn_blocking(move || {
            let mut store = store.lock().unwrap_or_else(|e| e.into_inner());
            let result = f(&mut *store);
            match &result {
                Ok(_) => match store.all_promises() {
                    Ok(all) => {
                        snapshot.send_replace(Arc::new(all));
                    }
                    Err(e) => warn!("Failed to refresh promise snapshot: {}", e),
                },
                Err(e) if e.is_validation() => {}
                Err(e) => warn!("Store update failed: {}", e),
            }
            result
        })
        .await
        .map_err(|e| StorageError::Task(e.to_string()))?
    }

    // ==================== Queries ====================

    pub async fn categories(&self) -> StorageResult<Vec<Category>> {
        self.read(|store| store.categories()).await
    }

    pub async fn titles(&self, category_id: CategoryId) -> StorageResult<Vec<Title>> {
        self.read(move |store| store.titles(category_id)).await
    }

    pub async fn subtitles(&self, title_id: TitleId) -> StorageResult<Vec<Subtitle>> {
        self.read(move |store| store.subtitles(title_id)).await
    }

    pub async fn promises(&self, subtitle_id: SubtitleId) -> StorageResult<Vec<Promise>> {
        self.read(move |store| store.promises(subtitle_id)).await
    }

    pub async fn search(&self, query: impl Into<String>) -> StorageResult<Vec<Promise>> {
        let query = query.into();
        self.read(move |store| store.search(&query)).await
    }

    pub async fn export_rows(&self) -> StorageResult<Vec<LegacyRow>> {
        self.read(|store| store.export_rows()).await
    }

    // ==================== Mutations ====================

    pub async fn create_category(&self, name: impl Into<String>) -> StorageResult<Category> {
        let name = name.into();
        self.write(move |store| store.create_category(&name)).await
    }

    pub async fn rename_category(
        &self,
        id: CategoryId,
        name: impl Into<String>,
    ) -> StorageResult<Category> {
        let name = name.into();
        self.write(move |store| store.rename_category(id, &name)).await
    }

    pub async fn delete_category(&self, id: CategoryId) -> StorageResult<usize> {
        self.write(move |store| store.delete_category(id)).await
    }

    pub async fn create_title(
        &self,
        category_id: CategoryId,
        name: impl Into<String>,
    ) -> StorageResult<Title> {
        let name = name.into();
        self.write(move |store| store.create_title(category_id, &name))
            .await
    }

    pub async fn rename_title(&self, id: TitleId, name: impl Into<String>) -> StorageResult<Title> {
        let name = name.into();
        self.write(move |store| store.rename_title(id, &name)).await
    }

    pub async fn delete_title(&self, id: TitleId) -> StorageResult<usize> {
        self.write(move |store| store.delete_title(id)).await
    }

    pub async fn create_subtitle(
        &self,
        title_id: TitleId,
        name: impl Into<String>,
    ) -> StorageResult<Subtitle> {
        let name = name.into();
        self.write(move |store| store.create_subtitle(title_id, &name))
            .await
    }

    pub async fn rename_subtitle(
        &self,
        id: SubtitleId,
        name: impl Into<String>,
    ) -> StorageResult<Subtitle> {
        let name = name.into();
        self.write(move |store| store.rename_subtitle(id, &name)).await
    }

    pub async fn delete_subtitle(&self, id: SubtitleId) -> StorageResult<usize> {
        self.write(move |store| store.delete_subtitle(id)).await
    }

    pub async fn create_promise(&self, promise: NewPromise) -> StorageResult<Promise> {
        self.write(move |store| store.create_promise(&promise)).await
    }

    pub async fn update_promise(&self, promise: Promise) -> StorageResult<()> {
        self.write(move |store| store.update_promise(&promise)).await
    }

    pub async fn move_promise(&self, id: PromiseId, subtitle_id: SubtitleId) -> StorageResult<()> {
        self.write(move |store| store.move_promise(id, subtitle_id))
            .await
    }

    pub async fn delete_promise(&self, id: PromiseId) -> StorageResult<()> {
        self.write(move |store| store.delete_promise(id)).await
    }

    pub async fn import_rows(&self, rows: Vec<LegacyRow>) -> StorageResult<ImportReport> {
        self.write(move |store| store.import_rows(&rows)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (PromiseService, SubtitleId) {
        let service = PromiseService::new(Store::open_in_memory().unwrap()).unwrap();
        let faith = service.create_category("Faith").await.unwrap();
        let strength = service.create_title(faith.id, "Strength").await.unwrap();
        let daily = service.create_subtitle(strength.id, "Daily").await.unwrap();
        (service, daily.id)
    }

    #[tokio::test]
    async fn test_subscription_sees_new_promises() {
        let (service, daily) = seeded().await;
        let mut rx = service.subscribe();
        assert!(rx.borrow_and_update().is_empty());

        service
            .create_promise(NewPromise::new(daily, "Fear not").with_reference("Isa 41:10"))
            .await
            .unwrap();

        rx.changed().await.unwrap();
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].reference, "Isa 41:10");
    }

    #[tokio::test]
    async fn test_validation_error_leaves_snapshot_alone() {
        let (service, _) = seeded().await;
        let mut rx = service.subscribe();
        rx.borrow_and_update();

        let err = service.create_category("faith").await.unwrap_err();
        assert!(err.is_validation());
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_delete_category_clears_snapshot() {
        let (service, daily) = seeded().await;
        service
            .create_promise(NewPromise::new(daily, "Fear not"))
            .await
            .unwrap();
        let rx = service.subscribe();
        assert_eq!(rx.borrow().len(), 1);

        let faith = service.categories().await.unwrap().remove(0);
        assert_eq!(service.delete_category(faith.id).await.unwrap(), 1);
        assert!(service.subscribe().borrow().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_renames_are_serialized() {
        let (service, _) = seeded().await;
        let faith = service.categories().await.unwrap().remove(0);

        let a = {
            let service = service.clone();
            tokio::spawn(async move { service.rename_category(faith.id, "Trust").await })
        };
        let b = {
            let service = service.clone();
            tokio::spawn(async move { service.rename_category(faith.id, "Belief").await })
        };
        a.await.unwrap().unwrap();
        b.await.unwrap().unwrap();

        // Whichever ran last wins; the node is never split
        let categories = service.categories().await.unwrap();
        assert_eq!(categories.len(), 1);
        assert!(["Trust", "Belief"].contains(&categories[0].name.as_str()));
        assert_eq!(service.titles(faith.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_search_and_export() {
        let (service, daily) = seeded().await;
        service
            .create_promise(NewPromise::new(daily, "The LORD is my shepherd"))
            .await
            .unwrap();

        assert_eq!(service.search("shepherd").await.unwrap().len(), 1);
        assert_eq!(service.export_rows().await.unwrap().len(), 1);
    }
}
