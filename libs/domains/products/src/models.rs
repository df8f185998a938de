use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Store-assigned product identity
pub type ProductId = i32;

/// Number of decimal places prices are kept at
pub const PRICE_SCALE: u32 = 2;

/// Product entity - the single catalog record tracked by a [`ProductStore`]
///
/// `id` and `created_at` are meaningless until the product has been committed:
/// the store assigns the identity and the timestamp interceptor stamps the
/// creation time.
///
/// [`ProductStore`]: crate::store::ProductStore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    /// Unique identifier, never reused
    pub id: ProductId,
    /// Display name, 1 to 200 characters
    pub name: String,
    /// Unit price, strictly positive
    pub price: Decimal,
    /// Set once on the first commit
    pub created_at: DateTime<Utc>,
    /// Absent until the first modification after creation
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Create an unsaved product
    pub fn new(name: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: 0,
            name: name.into(),
            price: normalize_price(price),
            created_at: DateTime::<Utc>::default(),
            updated_at: None,
        }
    }

    /// Overwrite the mutable fields; identity and creation time stay untouched
    pub fn apply_update(&mut self, name: String, price: Decimal) {
        self.name = name;
        self.price = normalize_price(price);
    }
}

/// Read-only projection of a [`Product`] handed out to callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDto {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Product> for ProductDto {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            name: product.name,
            price: normalize_price(product.price),
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Pad a price to the fixed-point storage scale
///
/// Expects an amount with at most two significant decimal places, as
/// validation guarantees; trailing zeros beyond that are dropped.
pub fn normalize_price(price: Decimal) -> Decimal {
    let mut price = price.normalize();
    price.rescale(PRICE_SCALE);
    price
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_product_is_unsaved() {
        let product = Product::new("Widget", Decimal::new(999, 2));

        assert_eq!(product.id, 0);
        assert_eq!(product.name, "Widget");
        assert!(product.updated_at.is_none());
    }

    #[test]
    fn test_apply_update_keeps_identity_and_creation_time() {
        let mut product = Product::new("Widget", Decimal::new(999, 2));
        product.id = 7;
        product.created_at = Utc::now();
        let created_at = product.created_at;

        product.apply_update("Widget Pro".to_string(), Decimal::new(1499, 2));

        assert_eq!(product.id, 7);
        assert_eq!(product.created_at, created_at);
        assert_eq!(product.name, "Widget Pro");
        assert_eq!(product.price, Decimal::new(1499, 2));
    }

    #[test]
    fn test_normalize_price_pads_to_two_places() {
        assert_eq!(normalize_price(Decimal::new(5, 0)).to_string(), "5.00");
        assert_eq!(normalize_price(Decimal::new(12_500, 3)).to_string(), "12.50");
        assert_eq!(normalize_price(Decimal::new(1499, 2)).to_string(), "14.99");
    }

    #[test]
    fn test_dto_serializes_price_as_string_and_skips_missing_update() {
        let mut product = Product::new("Widget", Decimal::new(999, 2));
        product.id = 1;

        let json = serde_json::to_value(ProductDto::from(product)).unwrap();

        assert_eq!(json["id"], 1);
        assert_eq!(json["price"], "9.99");
        assert!(json.get("updated_at").is_none());
    }
}
