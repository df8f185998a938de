use async_trait::async_trait;
use sea_orm::DbErr;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::{ProductError, ProductResult};
use crate::models::{Product, ProductId};
use crate::timestamps::TimestampInterceptor;

/// Tracked state of a staged entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Added,
    Modified,
    Deleted,
}

/// One entity mutation recorded but not yet committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedChange {
    pub state: EntryState,
    pub product: Product,
}

/// Ordered batch of staged changes
///
/// [`ProductStore::commit`] takes the change set by value, so a batch can be
/// committed at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    changes: Vec<StagedChange>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a new entity for insertion
    pub fn add(&mut self, product: Product) -> &mut Self {
        self.stage(EntryState::Added, product)
    }

    /// Stage an existing entity whose fields were changed
    pub fn update(&mut self, product: Product) -> &mut Self {
        self.stage(EntryState::Modified, product)
    }

    /// Stage an existing entity for deletion
    pub fn remove(&mut self, product: Product) -> &mut Self {
        self.stage(EntryState::Deleted, product)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StagedChange> {
        self.changes.iter()
    }

    pub fn into_changes(self) -> Vec<StagedChange> {
        self.changes
    }

    fn stage(&mut self, state: EntryState, product: Product) -> &mut Self {
        self.changes.push(StagedChange { state, product });
        self
    }
}

/// Outcome of a successful commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReceipt {
    /// Rows inserted, updated or deleted
    pub affected: u64,
    /// Identities assigned to added entities, in staging order
    pub inserted_ids: Vec<ProductId>,
}

/// Query/mutate surface over persisted products
///
/// Reads go straight to storage. Writes are staged in a [`ChangeSet`] and
/// persisted all-or-nothing by [`commit`](ProductStore::commit), which runs
/// the [`TimestampInterceptor`] over the batch before anything is written.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Every product, in identity order
    async fn all(&self, cancel: &CancellationToken) -> ProductResult<Vec<Product>>;

    async fn find_by_id(
        &self,
        id: ProductId,
        cancel: &CancellationToken,
    ) -> ProductResult<Option<Product>>;

    /// Persist a batch atomically
    async fn commit(
        &self,
        changes: ChangeSet,
        cancel: &CancellationToken,
    ) -> ProductResult<CommitReceipt>;
}

#[derive(Debug, Default, Clone)]
struct Tables {
    rows: BTreeMap<ProductId, Product>,
    last_id: ProductId,
}

/// In-memory implementation of ProductStore (for development/testing)
#[derive(Debug, Default, Clone)]
pub struct InMemoryProductStore {
    tables: Arc<RwLock<Tables>>,
    interceptor: TimestampInterceptor,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_interceptor(interceptor: TimestampInterceptor) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            interceptor,
        }
    }

    /// Number of committed rows
    pub async fn len(&self) -> usize {
        self.tables.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn ensure_live(cancel: &CancellationToken) -> ProductResult<()> {
    if cancel.is_cancelled() {
        return Err(ProductError::Cancelled);
    }
    Ok(())
}

#[async_trait]
impl ProductStore for InMemoryProductStore {
    async fn all(&self, cancel: &CancellationToken) -> ProductResult<Vec<Product>> {
        ensure_live(cancel)?;
        let tables = self.tables.read().await;
        Ok(tables.rows.values().cloned().collect())
    }

    async fn find_by_id(
        &self,
        id: ProductId,
        cancel: &CancellationToken,
    ) -> ProductResult<Option<Product>> {
        ensure_live(cancel)?;
        let tables = self.tables.read().await;
        Ok(tables.rows.get(&id).cloned())
    }

    #[instrument(skip_all, fields(staged = changes.len()))]
    async fn commit(
        &self,
        changes: ChangeSet,
        cancel: &CancellationToken,
    ) -> ProductResult<CommitReceipt> {
        ensure_live(cancel)?;

        let mut changes = changes.into_changes();
        self.interceptor.apply(&mut changes);

        let mut tables = self.tables.write().await;

        // Apply to a copy so a failing change leaves the committed rows untouched
        let mut next = tables.clone();
        let mut receipt = CommitReceipt::default();

        for change in changes {
            let mut product = change.product;
            match change.state {
                EntryState::Added => {
                    next.last_id += 1;
                    product.id = next.last_id;
                    receipt.inserted_ids.push(product.id);
                    next.rows.insert(product.id, product);
                }
                EntryState::Modified => {
                    let row = next
                        .rows
                        .get_mut(&product.id)
                        .ok_or(DbErr::RecordNotUpdated)?;
                    row.name = product.name;
                    row.price = product.price;
                    row.updated_at = product.updated_at;
                }
                EntryState::Deleted => {
                    next.rows.remove(&product.id).ok_or_else(|| {
                        DbErr::RecordNotFound(format!("product {}", product.id))
                    })?;
                }
            }
            receipt.affected += 1;
        }

        ensure_live(cancel)?;
        *tables = next;

        tracing::debug!(affected = receipt.affected, "Committed changes");
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamps::SteppingClock;
    use chrono::{DateTime, TimeDelta, Utc};
    use rust_decimal::Decimal;

    fn stepping_store() -> InMemoryProductStore {
        let start = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        InMemoryProductStore::with_interceptor(TimestampInterceptor::new(Arc::new(
            SteppingClock::new(start, TimeDelta::seconds(1)),
        )))
    }

    async fn insert(store: &InMemoryProductStore, name: &str) -> ProductId {
        let mut changes = ChangeSet::new();
        changes.add(Product::new(name, Decimal::new(999, 2)));
        let receipt = store
            .commit(changes, &CancellationToken::new())
            .await
            .unwrap();
        receipt.inserted_ids[0]
    }

    #[test]
    fn test_change_set_keeps_staging_order() {
        let mut changes = ChangeSet::new();
        changes
            .add(Product::new("a", Decimal::ONE))
            .remove(Product::new("b", Decimal::ONE));

        let states: Vec<_> = changes.iter().map(|c| c.state).collect();

        assert_eq!(changes.len(), 2);
        assert_eq!(states, vec![EntryState::Added, EntryState::Deleted]);
    }

    #[tokio::test]
    async fn test_commit_assigns_ids_and_creation_time() {
        let store = stepping_store();
        let cancel = CancellationToken::new();
        let mut changes = ChangeSet::new();
        changes
            .add(Product::new("Widget", Decimal::new(999, 2)))
            .add(Product::new("Lamp", Decimal::new(2000, 2)));

        let receipt = store.commit(changes, &cancel).await.unwrap();

        assert_eq!(receipt.affected, 2);
        assert_eq!(receipt.inserted_ids, vec![1, 2]);
        let lamp = store.find_by_id(2, &cancel).await.unwrap().unwrap();
        assert_eq!(lamp.name, "Lamp");
        assert_ne!(lamp.created_at, DateTime::<Utc>::default());
        assert!(lamp.updated_at.is_none());
    }

    #[tokio::test]
    async fn test_ids_are_never_reused_after_delete() {
        let store = InMemoryProductStore::new();
        let cancel = CancellationToken::new();
        let first = insert(&store, "Widget").await;

        let product = store.find_by_id(first, &cancel).await.unwrap().unwrap();
        let mut changes = ChangeSet::new();
        changes.remove(product);
        store.commit(changes, &cancel).await.unwrap();

        let second = insert(&store, "Gadget").await;
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_modified_commit_keeps_creation_time() {
        let store = stepping_store();
        let cancel = CancellationToken::new();
        let id = insert(&store, "Widget").await;
        let mut product = store.find_by_id(id, &cancel).await.unwrap().unwrap();
        let created_at = product.created_at;

        product.apply_update("Widget Pro".to_string(), Decimal::new(1499, 2));
        product.created_at = created_at + TimeDelta::days(3);
        let mut changes = ChangeSet::new();
        changes.update(product);
        store.commit(changes, &cancel).await.unwrap();

        let stored = store.find_by_id(id, &cancel).await.unwrap().unwrap();
        assert_eq!(stored.name, "Widget Pro");
        assert_eq!(stored.created_at, created_at);
        assert!(stored.updated_at.unwrap() > created_at);
    }

    #[tokio::test]
    async fn test_failed_commit_is_all_or_nothing() {
        let store = InMemoryProductStore::new();
        let cancel = CancellationToken::new();
        let mut ghost = Product::new("Ghost", Decimal::ONE);
        ghost.id = 42;
        let mut changes = ChangeSet::new();
        changes
            .add(Product::new("Widget", Decimal::new(999, 2)))
            .update(ghost);

        let result = store.commit(changes, &cancel).await;

        assert!(matches!(
            result,
            Err(ProductError::Store(DbErr::RecordNotUpdated))
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_cancelled_commit_persists_nothing() {
        let store = InMemoryProductStore::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut changes = ChangeSet::new();
        changes.add(Product::new("Widget", Decimal::new(999, 2)));

        let result = store.commit(changes, &cancel).await;

        assert!(matches!(result, Err(ProductError::Cancelled)));
        assert!(store.is_empty().await);
        assert!(matches!(
            store.all(&cancel).await,
            Err(ProductError::Cancelled)
        ));
    }
}
