//! Relational implementation of [`ProductStore`] backed by Sea-ORM

use async_trait::async_trait;
use sea_orm::{
    DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryOrder, TransactionTrait,
};
use std::future::Future;
use tokio_util::sync::CancellationToken;
use tracing::{instrument, warn};

use crate::entity;
use crate::error::{ProductError, ProductResult};
use crate::models::{Product, ProductId};
use crate::store::{ChangeSet, CommitReceipt, EntryState, ProductStore, StagedChange};
use crate::timestamps::TimestampInterceptor;

/// Race a database future against cancellation
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> ProductResult<T>
where
    F: Future<Output = Result<T, DbErr>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProductError::Cancelled),
        result = fut => result.map_err(ProductError::from),
    }
}

#[derive(Debug, Clone)]
pub struct SqlProductStore {
    db: DatabaseConnection,
    interceptor: TimestampInterceptor,
}

impl SqlProductStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self::with_interceptor(db, TimestampInterceptor::default())
    }

    pub fn with_interceptor(db: DatabaseConnection, interceptor: TimestampInterceptor) -> Self {
        Self { db, interceptor }
    }

    async fn write(
        txn: &DatabaseTransaction,
        changes: Vec<StagedChange>,
        cancel: &CancellationToken,
    ) -> ProductResult<CommitReceipt> {
        let mut receipt = CommitReceipt::default();

        for change in changes {
            let product = change.product;
            match change.state {
                EntryState::Added => {
                    let inserted = cancellable(
                        cancel,
                        entity::Entity::insert(entity::ActiveModel::for_insert(product)).exec(txn),
                    )
                    .await?;
                    receipt.inserted_ids.push(inserted.last_insert_id);
                }
                EntryState::Modified => {
                    cancellable(
                        cancel,
                        entity::Entity::update(entity::ActiveModel::for_update(product)).exec(txn),
                    )
                    .await?;
                }
                EntryState::Deleted => {
                    let deleted =
                        cancellable(cancel, entity::Entity::delete_by_id(product.id).exec(txn))
                            .await?;
                    if deleted.rows_affected == 0 {
                        return Err(
                            DbErr::RecordNotFound(format!("product {}", product.id)).into()
                        );
                    }
                }
            }
            receipt.affected += 1;
        }

        Ok(receipt)
    }
}

#[async_trait]
impl ProductStore for SqlProductStore {
    #[instrument(skip_all)]
    async fn all(&self, cancel: &CancellationToken) -> ProductResult<Vec<Product>> {
        let models = cancellable(
            cancel,
            entity::Entity::find()
                .order_by_asc(entity::Column::Id)
                .all(&self.db),
        )
        .await?;

        Ok(models.into_iter().map(Product::from).collect())
    }

    #[instrument(skip(self, cancel))]
    async fn find_by_id(
        &self,
        id: ProductId,
        cancel: &CancellationToken,
    ) -> ProductResult<Option<Product>> {
        let model = cancellable(cancel, entity::Entity::find_by_id(id).one(&self.db)).await?;
        Ok(model.map(Product::from))
    }

    #[instrument(skip_all, fields(staged = changes.len()))]
    async fn commit(
        &self,
        changes: ChangeSet,
        cancel: &CancellationToken,
    ) -> ProductResult<CommitReceipt> {
        if cancel.is_cancelled() {
            return Err(ProductError::Cancelled);
        }

        let mut changes = changes.into_changes();
        self.interceptor.apply(&mut changes);

        let txn = cancellable(cancel, self.db.begin()).await?;

        match Self::write(&txn, changes, cancel).await {
            Ok(receipt) => {
                txn.commit().await?;
                tracing::debug!(affected = receipt.affected, "Committed changes");
                Ok(receipt)
            }
            Err(err) => {
                if let Err(rollback) = txn.rollback().await {
                    warn!(error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }
}
