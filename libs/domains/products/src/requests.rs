//! Request types routed by the [`Mediator`](crate::mediator::Mediator)
//!
//! Every request struct is bound to a [`RequestKind`] and a response type
//! through the [`Request`] trait. Inside the pipeline requests travel as a
//! [`RequestEnvelope`] and come back as a [`ResponseEnvelope`], so behaviors
//! can inspect any request without generics.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::models::{ProductDto, ProductId};

/// Create a product, returns the assigned identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    pub price: Decimal,
}

/// List every product
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetProducts;

/// Fetch one product, absent when the id is unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetProductById {
    pub id: ProductId,
}

/// Overwrite name and price of an existing product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
}

/// Remove an existing product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteProduct {
    pub id: ProductId,
}

/// Binds a request struct to its discriminator and response type
pub trait Request: Send + Sync + Sized + 'static {
    const KIND: RequestKind;

    type Response: Send + 'static;

    fn into_envelope(self) -> RequestEnvelope;

    fn from_envelope(envelope: RequestEnvelope) -> Option<Self>;

    /// Borrow the request out of an envelope of the matching kind
    fn peek(envelope: &RequestEnvelope) -> Option<&Self>;

    fn wrap_response(response: Self::Response) -> ResponseEnvelope;

    fn unwrap_response(envelope: ResponseEnvelope) -> Option<Self::Response>;
}

macro_rules! requests {
    ($($kind:ident => $response:ty),* $(,)?) => {
        /// Type discriminator used to key the handler registry
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
        pub enum RequestKind {
            $($kind,)*
        }

        /// Type-erased request as it flows through pipeline behaviors
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum RequestEnvelope {
            $($kind($kind),)*
        }

        /// Type-erased handler output
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum ResponseEnvelope {
            $($kind($response),)*
        }

        impl RequestEnvelope {
            pub fn kind(&self) -> RequestKind {
                match self {
                    $(Self::$kind(_) => RequestKind::$kind,)*
                }
            }
        }

        impl ResponseEnvelope {
            pub fn kind(&self) -> RequestKind {
                match self {
                    $(Self::$kind(_) => RequestKind::$kind,)*
                }
            }
        }

        $(
            impl Request for $kind {
                const KIND: RequestKind = RequestKind::$kind;

                type Response = $response;

                fn into_envelope(self) -> RequestEnvelope {
                    RequestEnvelope::$kind(self)
                }

                fn from_envelope(envelope: RequestEnvelope) -> Option<Self> {
                    match envelope {
                        RequestEnvelope::$kind(request) => Some(request),
                        _ => None,
                    }
                }

                fn peek(envelope: &RequestEnvelope) -> Option<&Self> {
                    match envelope {
                        RequestEnvelope::$kind(request) => Some(request),
                        _ => None,
                    }
                }

                fn wrap_response(response: Self::Response) -> ResponseEnvelope {
                    ResponseEnvelope::$kind(response)
                }

                fn unwrap_response(envelope: ResponseEnvelope) -> Option<Self::Response> {
                    match envelope {
                        ResponseEnvelope::$kind(response) => Some(response),
                        _ => None,
                    }
                }
            }
        )*
    };
}

requests! {
    CreateProduct => ProductId,
    GetProducts => Vec<ProductDto>,
    GetProductById => Option<ProductDto>,
    UpdateProduct => (),
    DeleteProduct => (),
}

impl RequestKind {
    /// Commands mutate state, queries only read it
    pub fn is_command(self) -> bool {
        matches!(
            self,
            Self::CreateProduct | Self::UpdateProduct | Self::DeleteProduct
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_envelope_round_trip_keeps_kind() {
        let request = UpdateProduct {
            id: 3,
            name: "Lamp".to_string(),
            price: Decimal::new(1250, 2),
        };

        let envelope = request.clone().into_envelope();

        assert_eq!(envelope.kind(), RequestKind::UpdateProduct);
        assert_eq!(UpdateProduct::peek(&envelope), Some(&request));
        assert_eq!(DeleteProduct::peek(&envelope), None);
        assert_eq!(UpdateProduct::from_envelope(envelope), Some(request));
    }

    #[test]
    fn test_unwrap_response_rejects_other_kind() {
        let response = CreateProduct::wrap_response(4);

        assert_eq!(response.kind(), RequestKind::CreateProduct);
        assert_eq!(GetProductById::unwrap_response(response.clone()), None);
        assert_eq!(CreateProduct::unwrap_response(response), Some(4));
    }

    #[test]
    fn test_command_query_split() {
        let commands: Vec<_> = RequestKind::iter().filter(|k| k.is_command()).collect();

        assert_eq!(
            commands,
            vec![
                RequestKind::CreateProduct,
                RequestKind::UpdateProduct,
                RequestKind::DeleteProduct
            ]
        );
        assert_eq!(RequestKind::GetProducts.to_string(), "GetProducts");
    }

    #[test]
    fn test_requests_deserialize_from_json() {
        let request: CreateProduct =
            serde_json::from_str(r#"{"name":"Widget","price":"9.99"}"#).unwrap();

        assert_eq!(request.name, "Widget");
        assert_eq!(request.price, Decimal::new(999, 2));
    }
}
