//! Subcommands and their mapping onto dispatcher requests

use clap::Subcommand;
use domain_products::{
    CreateProduct, DeleteProduct, GetProductById, GetProducts, Mediator, ProductError, ProductId,
    ProductResult, UpdateProduct,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Add a product and print its id
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: Decimal,
    },
    /// Print every product
    List,
    /// Print one product
    Get { id: ProductId },
    /// Replace name and price of a product
    Update {
        id: ProductId,
        #[arg(long)]
        name: String,
        #[arg(long)]
        price: Decimal,
    },
    /// Remove a product
    Delete { id: ProductId },
    /// Only bring the schema up to date
    Migrate,
}

fn to_json<T: serde::Serialize>(value: T) -> ProductResult<Value> {
    serde_json::to_value(value).map_err(|e| ProductError::Internal(e.to_string()))
}

/// Send the request behind `command` and render the answer as JSON
///
/// The schema is migrated before any command runs, so `migrate` has nothing
/// left to do here.
pub async fn run(
    mediator: &Mediator,
    command: Command,
    cancel: &CancellationToken,
) -> ProductResult<Value> {
    match command {
        Command::Create { name, price } => {
            let id = mediator.send(CreateProduct { name, price }, cancel).await?;
            Ok(json!({ "id": id }))
        }
        Command::List => to_json(mediator.send(GetProducts, cancel).await?),
        Command::Get { id } => match mediator.send(GetProductById { id }, cancel).await? {
            Some(product) => to_json(product),
            None => Err(ProductError::NotFound(id)),
        },
        Command::Update { id, name, price } => {
            mediator
                .send(UpdateProduct { id, name, price }, cancel)
                .await?;
            Ok(json!({ "updated": id }))
        }
        Command::Delete { id } => {
            mediator.send(DeleteProduct { id }, cancel).await?;
            Ok(json!({ "deleted": id }))
        }
        Command::Migrate => Ok(json!({ "migrated": true })),
    }
}

/// Readable message for a failure the caller can fix
pub fn describe(err: &ProductError) -> String {
    match err.violations() {
        Some(messages) => {
            let mut text = String::from("Invalid input:");
            for message in messages {
                text.push_str("\n  - ");
                text.push_str(message);
            }
            text
        }
        None => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_products::{product_mediator, InMemoryProductStore};

    #[tokio::test]
    async fn test_create_then_get_renders_json() {
        let mediator = product_mediator(InMemoryProductStore::new());
        let cancel = CancellationToken::new();

        let created = run(
            &mediator,
            Command::Create {
                name: "Widget".to_string(),
                price: Decimal::new(999, 2),
            },
            &cancel,
        )
        .await
        .unwrap();
        let fetched = run(&mediator, Command::Get { id: 1 }, &cancel)
            .await
            .unwrap();

        assert_eq!(created, json!({ "id": 1 }));
        assert_eq!(fetched["name"], "Widget");
        assert_eq!(fetched["price"], "9.99");
    }

    #[tokio::test]
    async fn test_get_of_unknown_id_is_not_found() {
        let mediator = product_mediator(InMemoryProductStore::new());

        let result = run(&mediator, Command::Get { id: 3 }, &CancellationToken::new()).await;

        assert!(matches!(result, Err(ProductError::NotFound(3))));
    }

    #[test]
    fn test_describe_lists_violations() {
        let err = ProductError::ValidationFailed(vec![
            "Name is required.".to_string(),
            "Price must be greater than 0.".to_string(),
        ]);

        assert_eq!(
            describe(&err),
            "Invalid input:\n  - Name is required.\n  - Price must be greater than 0."
        );
        assert_eq!(describe(&ProductError::NotFound(4)), "Product not found: 4");
    }
}
