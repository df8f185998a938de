//! Request handlers - one per request type, each owning a handle to the store

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::error::{ProductError, ProductResult};
use crate::mediator::RequestHandler;
use crate::models::{Product, ProductDto, ProductId};
use crate::requests::{CreateProduct, DeleteProduct, GetProductById, GetProducts, UpdateProduct};
use crate::store::{ChangeSet, ProductStore};

pub struct CreateProductHandler<S: ProductStore> {
    store: Arc<S>,
}

impl<S: ProductStore> CreateProductHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: ProductStore> RequestHandler<CreateProduct> for CreateProductHandler<S> {
    #[instrument(skip(self, request, cancel), fields(product_name = %request.name))]
    async fn handle(
        &self,
        request: CreateProduct,
        cancel: &CancellationToken,
    ) -> ProductResult<ProductId> {
        let mut changes = ChangeSet::new();
        changes.add(Product::new(request.name, request.price));

        let receipt = self.store.commit(changes, cancel).await?;
        let id = receipt
            .inserted_ids
            .first()
            .copied()
            .ok_or_else(|| ProductError::Internal("commit assigned no identity".to_string()))?;

        info!(product_id = id, "Product created");
        Ok(id)
    }
}

pub struct GetProductsHandler<S: ProductStore> {
    store: Arc<S>,
}

impl<S: ProductStore> GetProductsHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: ProductStore> RequestHandler<GetProducts> for GetProductsHandler<S> {
    #[instrument(skip_all)]
    async fn handle(
        &self,
        _request: GetProducts,
        cancel: &CancellationToken,
    ) -> ProductResult<Vec<ProductDto>> {
        let products = self.store.all(cancel).await?;
        debug!(count = products.len(), "Listed products");
        Ok(products.into_iter().map(ProductDto::from).collect())
    }
}

pub struct GetProductByIdHandler<S: ProductStore> {
    store: Arc<S>,
}

impl<S: ProductStore> GetProductByIdHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: ProductStore> RequestHandler<GetProductById> for GetProductByIdHandler<S> {
    /// Unknown ids are an absent result, not an error
    #[instrument(skip(self, cancel))]
    async fn handle(
        &self,
        request: GetProductById,
        cancel: &CancellationToken,
    ) -> ProductResult<Option<ProductDto>> {
        let product = self.store.find_by_id(request.id, cancel).await?;
        debug!(found = product.is_some(), "Looked up product");
        Ok(product.map(ProductDto::from))
    }
}

pub struct UpdateProductHandler<S: ProductStore> {
    store: Arc<S>,
}

impl<S: ProductStore> UpdateProductHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: ProductStore> RequestHandler<UpdateProduct> for UpdateProductHandler<S> {
    #[instrument(skip(self, request, cancel), fields(product_id = request.id))]
    async fn handle(&self, request: UpdateProduct, cancel: &CancellationToken) -> ProductResult<()> {
        let mut product = self
            .store
            .find_by_id(request.id, cancel)
            .await?
            .ok_or(ProductError::NotFound(request.id))?;

        product.apply_update(request.name, request.price);

        let mut changes = ChangeSet::new();
        changes.update(product);
        self.store.commit(changes, cancel).await?;

        info!("Product updated");
        Ok(())
    }
}

pub struct DeleteProductHandler<S: ProductStore> {
    store: Arc<S>,
}

impl<S: ProductStore> DeleteProductHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: ProductStore> RequestHandler<DeleteProduct> for DeleteProductHandler<S> {
    #[instrument(skip(self, cancel))]
    async fn handle(&self, request: DeleteProduct, cancel: &CancellationToken) -> ProductResult<()> {
        let product = self
            .store
            .find_by_id(request.id, cancel)
            .await?
            .ok_or(ProductError::NotFound(request.id))?;

        let mut changes = ChangeSet::new();
        changes.remove(product);
        self.store.commit(changes, cancel).await?;

        info!(product_id = request.id, "Product deleted");
        Ok(())
    }
}
