//! Parsing of raw form input into typed billing values.
//!
//! Entry screens submit numbers either as JSON numbers or as the text typed
//! into a field. Nothing here coerces a bad value to zero: every rejection
//! names the field (and the 1-based line for line items).

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Field, ValidationError};
use crate::models::{BillTo, GstRate, LineItem};
use crate::state::{Gstin, StateCode};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;

/// Largest quantity accepted on a line.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(10_000_000, 0, 0, false, 0);
/// Largest rate, MRP, charge or payment accepted. With [`MAX_QUANTITY`] this
/// keeps line and document arithmetic far inside `Decimal` range.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// A numeric field as submitted: `12.5` or `"12.5"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Number(serde_json::Number),
    Text(String),
}

impl From<Decimal> for NumericInput {
    fn from(value: Decimal) -> Self {
        NumericInput::Text(value.to_string())
    }
}

impl From<&str> for NumericInput {
    fn from(value: &str) -> Self {
        NumericInput::Text(value.to_string())
    }
}

impl NumericInput {
    /// `Ok(None)` for blank text, an error for anything that is not a number.
    fn parse(&self, field: Field) -> Result<Option<Decimal>, ValidationError> {
        let raw = match self {
            NumericInput::Number(number) => number.to_string(),
            NumericInput::Text(text) => text.trim().to_string(),
        };
        if raw.is_empty() {
            return Ok(None);
        }

        Decimal::from_str(&raw)
            .or_else(|_| Decimal::from_scientific(&raw))
            .map(Some)
            .map_err(|_| ValidationError::NotANumber { field, value: raw })
    }
}

fn required(value: Option<&NumericInput>, field: Field) -> Result<Decimal, ValidationError> {
    match value {
        Some(input) => input.parse(field)?.ok_or(ValidationError::Missing(field)),
        None => Err(ValidationError::Missing(field)),
    }
}

fn optional(value: Option<&NumericInput>, field: Field) -> Result<Option<Decimal>, ValidationError> {
    match value {
        Some(input) => input.parse(field),
        None => Ok(None),
    }
}

fn non_negative(value: Decimal, field: Field) -> Result<Decimal, ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::Negative(field));
    }
    Ok(value)
}

fn bounded(value: Decimal, field: Field, max: Decimal) -> Result<Decimal, ValidationError> {
    let value = non_negative(value, field)?;
    if value > max {
        return Err(ValidationError::TooLarge { field, max });
    }
    Ok(value)
}

fn percent(value: Decimal, field: Field) -> Result<Decimal, ValidationError> {
    if value < Decimal::ZERO || value > HUNDRED {
        return Err(ValidationError::PercentOutOfRange(field));
    }
    Ok(value)
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Document-level amount such as other or delivery charges. Absent or blank
/// means zero; anything else must be a non-negative number.
pub fn parse_charge(value: Option<&NumericInput>, field: Field) -> Result<Decimal, ValidationError> {
    let amount = optional(value, field)?.unwrap_or(Decimal::ZERO);
    bounded(amount, field, MAX_AMOUNT)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineItemInput {
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    pub hsn_code: Option<String>,
    pub batch_no: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub quantity: Option<NumericInput>,
    pub free_quantity: Option<NumericInput>,
    pub rate: Option<NumericInput>,
    pub mrp: Option<NumericInput>,
    pub discount_percent: Option<NumericInput>,
    pub gst_percent: Option<NumericInput>,
}

impl LineItemInput {
    pub fn validate(&self) -> Result<LineItem, ValidationError> {
        let product_name = non_blank(self.product_name.as_deref())
            .ok_or(ValidationError::Missing(Field::ProductName))?;

        let quantity = bounded(
            required(self.quantity.as_ref(), Field::Quantity)?,
            Field::Quantity,
            MAX_QUANTITY,
        )?;
        let free_quantity = bounded(
            optional(self.free_quantity.as_ref(), Field::FreeQuantity)?.unwrap_or(Decimal::ZERO),
            Field::FreeQuantity,
            MAX_QUANTITY,
        )?;
        let rate = bounded(required(self.rate.as_ref(), Field::Rate)?, Field::Rate, MAX_AMOUNT)?;
        let mrp = optional(self.mrp.as_ref(), Field::Mrp)?
            .map(|mrp| bounded(mrp, Field::Mrp, MAX_AMOUNT))
            .transpose()?;
        let discount_percent = percent(
            optional(self.discount_percent.as_ref(), Field::DiscountPercent)?
                .unwrap_or(Decimal::ZERO),
            Field::DiscountPercent,
        )?;
        let gst_percent = percent(
            required(self.gst_percent.as_ref(), Field::GstPercent)?,
            Field::GstPercent,
        )?;

        if let Some(mrp) = mrp {
            if mrp > Decimal::ZERO && rate > mrp {
                return Err(ValidationError::RateAboveMrp { rate, mrp });
            }
        }

        Ok(LineItem {
            product_id: self.product_id,
            product_name,
            hsn_code: non_blank(self.hsn_code.as_deref()),
            batch_no: non_blank(self.batch_no.as_deref()),
            expiry: self.expiry,
            quantity,
            free_quantity,
            rate,
            mrp,
            discount_percent,
            gst_percent: GstRate::new(gst_percent),
        })
    }
}

/// Validates every line; the first failure is reported with its 1-based line
/// number.
pub fn validate_lines(inputs: &[LineItemInput]) -> Result<Vec<LineItem>, ValidationError> {
    if inputs.is_empty() {
        return Err(ValidationError::EmptyDocument);
    }

    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| input.validate().map_err(|err| err.at_line(index + 1)))
        .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillToInput {
    pub customer_id: Option<Uuid>,
    pub name: Option<String>,
    pub gstin: Option<String>,
    pub state_code: Option<String>,
}

impl BillToInput {
    pub fn validate(&self) -> Result<BillTo, ValidationError> {
        let name = non_blank(self.name.as_deref())
            .ok_or(ValidationError::Missing(Field::CustomerName))?;
        let gstin = non_blank(self.gstin.as_deref())
            .map(|raw| Gstin::parse(&raw))
            .transpose()?;
        let state = non_blank(self.state_code.as_deref())
            .map(|raw| StateCode::parse(&raw))
            .transpose()?;

        Ok(BillTo {
            customer_id: self.customer_id,
            name,
            gstin,
            state,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn line() -> LineItemInput {
        LineItemInput {
            product_name: Some("Paracetamol 500mg Strip".to_string()),
            hsn_code: Some("3004".to_string()),
            quantity: Some(NumericInput::from("10")),
            rate: Some(NumericInput::from("100")),
            mrp: Some(NumericInput::from("125.50")),
            gst_percent: Some(NumericInput::from("12")),
            ..Default::default()
        }
    }

    #[test]
    fn accepts_numbers_and_numeric_text() {
        let input: LineItemInput = serde_json::from_value(serde_json::json!({
            "product_name": "Amoxicillin 250mg",
            "quantity": 5,
            "free_quantity": "1",
            "rate": 42.75,
            "discount_percent": " 2.5 ",
            "gst_percent": "12.00"
        }))
        .unwrap();

        let item = input.validate().unwrap();
        assert_eq!(item.quantity, dec!(5));
        assert_eq!(item.free_quantity, dec!(1));
        assert_eq!(item.rate, dec!(42.75));
        assert_eq!(item.discount_percent, dec!(2.5));
        assert_eq!(item.gst_percent.to_string(), "12");
        assert_eq!(item.mrp, None);
    }

    #[test]
    fn absent_optional_fields_default_to_zero() {
        let item = line().validate().unwrap();
        assert_eq!(item.free_quantity, Decimal::ZERO);
        assert_eq!(item.discount_percent, Decimal::ZERO);
        assert_eq!(item.hsn_code.as_deref(), Some("3004"));
    }

    #[test]
    fn malformed_number_names_the_field_instead_of_becoming_zero() {
        let mut input = line();
        input.discount_percent = Some(NumericInput::from("5%"));

        assert_eq!(
            input.validate(),
            Err(ValidationError::NotANumber {
                field: Field::DiscountPercent,
                value: "5%".to_string(),
            })
        );
    }

    #[test]
    fn required_fields_must_be_present_and_not_blank() {
        let mut input = line();
        input.rate = Some(NumericInput::from("  "));
        assert_eq!(input.validate(), Err(ValidationError::Missing(Field::Rate)));

        let mut input = line();
        input.gst_percent = None;
        assert_eq!(
            input.validate(),
            Err(ValidationError::Missing(Field::GstPercent))
        );

        let mut input = line();
        input.product_name = Some(" ".to_string());
        assert_eq!(
            input.validate(),
            Err(ValidationError::Missing(Field::ProductName))
        );
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let mut input = line();
        input.quantity = Some(NumericInput::from("-1"));
        assert_eq!(
            input.validate(),
            Err(ValidationError::Negative(Field::Quantity))
        );

        let mut input = line();
        input.gst_percent = Some(NumericInput::from("118"));
        assert_eq!(
            input.validate(),
            Err(ValidationError::PercentOutOfRange(Field::GstPercent))
        );

        let mut input = line();
        input.discount_percent = Some(NumericInput::from("-0.5"));
        assert_eq!(
            input.validate(),
            Err(ValidationError::PercentOutOfRange(Field::DiscountPercent))
        );
    }

    #[test]
    fn magnitudes_beyond_the_limits_are_rejected() {
        let mut input = line();
        input.quantity = Some(NumericInput::from("100000000000000"));
        input.rate = Some(NumericInput::from("100000000000000000"));
        input.mrp = None;
        let err = input.validate().unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLarge {
                field: Field::Quantity,
                max: MAX_QUANTITY,
            }
        );
        assert_eq!(err.to_string(), "quantity must not exceed 10000000");

        let mut input = line();
        input.rate = Some(NumericInput::from("1000000000.01"));
        input.mrp = None;
        assert_eq!(input.validate().unwrap_err().field(), Some(Field::Rate));

        let mut input = line();
        input.mrp = Some(NumericInput::from("5e12"));
        assert_eq!(input.validate().unwrap_err().field(), Some(Field::Mrp));

        assert_eq!(
            parse_charge(Some(&NumericInput::from("1e10")), Field::DeliveryCharges)
                .unwrap_err()
                .field(),
            Some(Field::DeliveryCharges)
        );

        let mut input = line();
        input.quantity = Some(MAX_QUANTITY.into());
        input.rate = Some(MAX_AMOUNT.into());
        input.mrp = None;
        assert!(input.validate().is_ok());
    }

    #[test]
    fn zero_quantity_is_allowed_for_free_goods_lines() {
        let mut input = line();
        input.quantity = Some(NumericInput::from("0"));
        input.free_quantity = Some(NumericInput::from("2"));
        let item = input.validate().unwrap();
        assert_eq!(item.quantity, Decimal::ZERO);
        assert_eq!(item.free_quantity, dec!(2));
    }

    #[test]
    fn rate_may_not_exceed_mrp() {
        let mut input = line();
        input.rate = Some(NumericInput::from("130"));
        assert_eq!(
            input.validate(),
            Err(ValidationError::RateAboveMrp {
                rate: dec!(130),
                mrp: dec!(125.50),
            })
        );
    }

    #[test]
    fn line_errors_carry_their_line_number() {
        let mut bad = line();
        bad.quantity = Some(NumericInput::from("ten"));

        let err = validate_lines(&[line(), bad]).unwrap_err();
        assert_eq!(err.field(), Some(Field::Quantity));
        assert_eq!(
            err.to_string(),
            "line 2: quantity is not a valid number: \"ten\""
        );
        assert_eq!(validate_lines(&[]), Err(ValidationError::EmptyDocument));
    }

    #[test]
    fn charges_default_to_zero_but_reject_negatives() {
        assert_eq!(parse_charge(None, Field::OtherCharges), Ok(Decimal::ZERO));
        assert_eq!(
            parse_charge(Some(&NumericInput::from("45.5")), Field::DeliveryCharges),
            Ok(dec!(45.5))
        );
        assert_eq!(
            parse_charge(Some(&NumericInput::from("-10")), Field::OtherCharges),
            Err(ValidationError::Negative(Field::OtherCharges))
        );
    }

    #[test]
    fn bill_to_validates_gstin_and_state_code() {
        let bill_to = BillToInput {
            name: Some("City Medicos".to_string()),
            gstin: Some("29AAGCB7383J1Z4".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(bill_to.effective_state().map(|s| s.code()), Some(29));

        let err = BillToInput {
            name: Some("Walk-in".to_string()),
            state_code: Some("77".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidStateCode("77".to_string()));

        assert_eq!(
            BillToInput::default().validate().unwrap_err(),
            ValidationError::Missing(Field::CustomerName)
        );
    }
}
