//! Products Domain
//!
//! Catalog core built around a request dispatcher: every use case is a
//! request type with exactly one handler, and cross-cutting concerns run as
//! pipeline behaviors around the handler call.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Mediator   │  ← send(request), registry keyed by RequestKind
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  Behaviors  │  ← ValidationBehavior, short-circuits invalid input
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │  Handlers   │  ← one per request, stage changes
//! └──────┬──────┘
//!        │
//! ┌──────▼──────┐
//! │    Store    │  ← ChangeSet + atomic commit, timestamps stamped here
//! └─────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use domain_products::{product_mediator, CreateProduct, InMemoryProductStore};
//! use rust_decimal::Decimal;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mediator = product_mediator(InMemoryProductStore::new());
//! mediator.verify()?;
//!
//! let cancel = CancellationToken::new();
//! let id = mediator
//!     .send(
//!         CreateProduct {
//!             name: "Widget".to_string(),
//!             price: Decimal::new(999, 2),
//!         },
//!         &cancel,
//!     )
//!     .await?;
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

pub mod entity;
pub mod error;
pub mod handlers;
pub mod mediator;
pub mod models;
pub mod requests;
pub mod sql;
pub mod store;
pub mod timestamps;
pub mod validation;

use std::sync::Arc;

// Re-export commonly used types
pub use error::{ProductError, ProductResult};
pub use mediator::{Mediator, MediatorBuilder, Next, PipelineBehavior, RequestHandler};
pub use models::{Product, ProductDto, ProductId};
pub use requests::{
    CreateProduct, DeleteProduct, GetProductById, GetProducts, Request, RequestKind,
    UpdateProduct,
};
pub use sql::SqlProductStore;
pub use store::{ChangeSet, CommitReceipt, EntryState, InMemoryProductStore, ProductStore};
pub use timestamps::{Clock, SteppingClock, SystemClock, TimestampInterceptor};
pub use validation::ValidationBehavior;

use handlers::{
    CreateProductHandler, DeleteProductHandler, GetProductByIdHandler, GetProductsHandler,
    UpdateProductHandler,
};
use validation::{CreateProductValidator, DeleteProductValidator, UpdateProductValidator};

/// Wire the standard catalog pipeline over a store
///
/// Registers the validation behavior with every validator and one handler per
/// request kind, so [`Mediator::verify`] succeeds on the result.
pub fn product_mediator<S>(store: S) -> Mediator
where
    S: ProductStore + 'static,
{
    let store = Arc::new(store);

    let validation = ValidationBehavior::new()
        .with_validator::<CreateProduct, _>(CreateProductValidator)
        .with_validator::<UpdateProduct, _>(UpdateProductValidator)
        .with_validator::<DeleteProduct, _>(DeleteProductValidator);

    Mediator::builder()
        .behavior(validation)
        .handler::<CreateProduct, _>(CreateProductHandler::new(Arc::clone(&store)))
        .handler::<GetProducts, _>(GetProductsHandler::new(Arc::clone(&store)))
        .handler::<GetProductById, _>(GetProductByIdHandler::new(Arc::clone(&store)))
        .handler::<UpdateProduct, _>(UpdateProductHandler::new(Arc::clone(&store)))
        .handler::<DeleteProduct, _>(DeleteProductHandler::new(store))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockProductStore;
    use rust_decimal::Decimal;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_standard_pipeline_has_one_handler_per_kind() {
        let mediator = product_mediator(MockProductStore::new());

        assert!(mediator.verify().is_ok());
    }

    #[tokio::test]
    async fn test_invalid_request_never_touches_store() {
        let mut store = MockProductStore::new();
        store.expect_commit().never();
        store.expect_find_by_id().never();
        let mediator = product_mediator(store);

        let result = mediator
            .send(
                UpdateProduct {
                    id: 1,
                    name: String::new(),
                    price: Decimal::new(500, 2),
                },
                &CancellationToken::new(),
            )
            .await;

        match result {
            Err(ProductError::ValidationFailed(messages)) => {
                assert_eq!(messages, vec!["Name is required."]);
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
    }
}
