//! Field validators and the validation pipeline behavior

use futures::future::BoxFuture;
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use strum::IntoEnumIterator;
use tracing::warn;
use validator::{ValidateLength, ValidationError};

use crate::error::{ProductError, ProductResult};
use crate::mediator::{Next, PipelineBehavior};
use crate::models::{ProductId, PRICE_SCALE};
use crate::requests::{
    CreateProduct, DeleteProduct, Request, RequestEnvelope, RequestKind, ResponseEnvelope,
    UpdateProduct,
};

pub const NAME_MAX_CHARS: usize = 200;

/// Upper price bound, 999,999.99
pub fn max_price() -> Decimal {
    Decimal::new(99_999_999, 2)
}

fn violation(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if !name.trim().validate_length(Some(1), None, None) {
        return Err(violation("name_required", "Name is required."));
    }
    if !name.validate_length(None, Some(NAME_MAX_CHARS as u64), None) {
        return Err(violation(
            "name_too_long",
            "Name must not exceed 200 characters.",
        ));
    }
    Ok(())
}

/// Bounds apply to the amount as given; sub-cent amounts are rejected, never rounded
pub fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if *price <= Decimal::ZERO {
        return Err(violation(
            "price_not_positive",
            "Price must be greater than 0.",
        ));
    }
    if *price > max_price() {
        return Err(violation(
            "price_too_high",
            "Price must not exceed 999,999.99.",
        ));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(violation(
            "price_too_precise",
            "Price must have at most 2 decimal places.",
        ));
    }
    Ok(())
}

pub fn validate_id(id: ProductId) -> Result<(), ValidationError> {
    if id <= 0 {
        return Err(violation("id_not_positive", "Id must be greater than 0."));
    }
    Ok(())
}

/// Pure check of a request's fields
pub trait Validator<R>: Send + Sync {
    /// Every broken rule, in rule order
    fn validate(&self, request: &R) -> Vec<ValidationError>;
}

fn failures<const N: usize>(results: [Result<(), ValidationError>; N]) -> Vec<ValidationError> {
    results.into_iter().filter_map(Result::err).collect()
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CreateProductValidator;

impl Validator<CreateProduct> for CreateProductValidator {
    fn validate(&self, request: &CreateProduct) -> Vec<ValidationError> {
        failures([validate_name(&request.name), validate_price(&request.price)])
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UpdateProductValidator;

impl Validator<UpdateProduct> for UpdateProductValidator {
    fn validate(&self, request: &UpdateProduct) -> Vec<ValidationError> {
        failures([
            validate_id(request.id),
            validate_name(&request.name),
            validate_price(&request.price),
        ])
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DeleteProductValidator;

impl Validator<DeleteProduct> for DeleteProductValidator {
    fn validate(&self, request: &DeleteProduct) -> Vec<ValidationError> {
        failures([validate_id(request.id)])
    }
}

/// Human-readable text of a violation
pub fn message_of(error: &ValidationError) -> String {
    error
        .message
        .as_deref()
        .map(str::to_owned)
        .unwrap_or_else(|| error.code.to_string())
}

type ErasedValidator = Box<dyn Fn(&RequestEnvelope) -> Vec<ValidationError> + Send + Sync>;

/// Runs every validator registered for the request's kind before the handler
///
/// Violations from all validators are collected in registration order. Any
/// violation short-circuits the pipeline with
/// [`ProductError::ValidationFailed`]; otherwise the request is passed on.
#[derive(Default)]
pub struct ValidationBehavior {
    validators: HashMap<RequestKind, Vec<ErasedValidator>>,
}

impl ValidationBehavior {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator<R, V>(mut self, validator: V) -> Self
    where
        R: Request,
        V: Validator<R> + 'static,
    {
        let erased: ErasedValidator = Box::new(move |envelope: &RequestEnvelope| {
            R::peek(envelope)
                .map(|request| validator.validate(request))
                .unwrap_or_default()
        });
        self.validators.entry(R::KIND).or_default().push(erased);
        self
    }

    /// Violation messages for a request, empty when it is valid
    pub fn violations(&self, request: &RequestEnvelope) -> Vec<String> {
        self.validators
            .get(&request.kind())
            .into_iter()
            .flatten()
            .flat_map(|validator| validator(request))
            .map(|error| message_of(&error))
            .collect()
    }

    pub fn validator_count(&self, kind: RequestKind) -> usize {
        self.validators.get(&kind).map_or(0, Vec::len)
    }
}

impl fmt::Debug for ValidationBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for kind in RequestKind::iter() {
            let count = self.validator_count(kind);
            if count > 0 {
                map.entry(&kind, &count);
            }
        }
        map.finish()
    }
}

impl PipelineBehavior for ValidationBehavior {
    fn handle<'a>(
        &'a self,
        request: RequestEnvelope,
        next: Next<'a>,
    ) -> BoxFuture<'a, ProductResult<ResponseEnvelope>> {
        Box::pin(async move {
            let violations = self.violations(&request);
            if !violations.is_empty() {
                warn!(
                    kind = %request.kind(),
                    violations = violations.len(),
                    "Request rejected by validation"
                );
                return Err(ProductError::ValidationFailed(violations));
            }
            next(request).await
        })
    }
}
