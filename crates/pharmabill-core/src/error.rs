use std::fmt;

use rust_decimal::Decimal;
use thiserror::Error;

/// Input field named in a [`ValidationError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    ProductName,
    Quantity,
    FreeQuantity,
    Rate,
    Mrp,
    DiscountPercent,
    GstPercent,
    CustomerName,
    OtherCharges,
    DeliveryCharges,
    Amount,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::ProductName => "product_name",
            Field::Quantity => "quantity",
            Field::FreeQuantity => "free_quantity",
            Field::Rate => "rate",
            Field::Mrp => "mrp",
            Field::DiscountPercent => "discount_percent",
            Field::GstPercent => "gst_percent",
            Field::CustomerName => "customer_name",
            Field::OtherCharges => "other_charges",
            Field::DeliveryCharges => "delivery_charges",
            Field::Amount => "amount",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(Field),
    #[error("{field} is not a valid number: {value:?}")]
    NotANumber { field: Field, value: String },
    #[error("{0} must not be negative")]
    Negative(Field),
    #[error("{field} must not exceed {max}")]
    TooLarge { field: Field, max: Decimal },
    #[error("{0} must be between 0 and 100")]
    PercentOutOfRange(Field),
    #[error("rate {rate} exceeds MRP {mrp}")]
    RateAboveMrp { rate: Decimal, mrp: Decimal },
    #[error("invalid state code: {0}")]
    InvalidStateCode(String),
    #[error("invalid GSTIN: {0}")]
    InvalidGstin(String),
    #[error("document must contain at least one line item")]
    EmptyDocument,
    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

impl ValidationError {
    /// The field at fault, looking through line wrappers.
    pub fn field(&self) -> Option<Field> {
        match self {
            ValidationError::Missing(field)
            | ValidationError::Negative(field)
            | ValidationError::PercentOutOfRange(field)
            | ValidationError::NotANumber { field, .. }
            | ValidationError::TooLarge { field, .. } => Some(*field),
            ValidationError::RateAboveMrp { .. } => Some(Field::Rate),
            ValidationError::Line { source, .. } => source.field(),
            _ => None,
        }
    }

    pub(crate) fn at_line(self, line: usize) -> Self {
        ValidationError::Line {
            line,
            source: Box::new(self),
        }
    }
}
