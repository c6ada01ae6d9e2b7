use std::fmt;

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::state::{Gstin, StateCode, SupplyType};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentKind {
    TaxInvoice,
    DeliveryChallan,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::TaxInvoice => "TAX_INVOICE",
            DocumentKind::DeliveryChallan => "DELIVERY_CHALLAN",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TAX_INVOICE" => Some(DocumentKind::TaxInvoice),
            "DELIVERY_CHALLAN" => Some(DocumentKind::DeliveryChallan),
            _ => None,
        }
    }

    pub fn number_prefix(&self) -> &'static str {
        match self {
            DocumentKind::TaxInvoice => "INV",
            DocumentKind::DeliveryChallan => "DC",
        }
    }

    /// `INV/2026-27/000042`: prefix, financial year, zero-padded sequence.
    pub fn document_number(&self, issued_on: NaiveDate, sequence: i64) -> String {
        format!(
            "{}/{}/{:06}",
            self.number_prefix(),
            financial_year_label(issued_on),
            sequence
        )
    }
}

/// Indian financial year (April to March) containing `date`, e.g. `2026-27`.
pub fn financial_year_label(date: NaiveDate) -> String {
    let start = if date.month() >= 4 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}-{:02}", start, (start + 1).rem_euclid(100))
}

/// GST percentage applied to a line. Normalised so that `12`, `12.0` and
/// `12.00` are the same rate and render as `"12"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GstRate(Decimal);

impl GstRate {
    pub fn new(percent: Decimal) -> Self {
        Self(percent.normalize())
    }

    pub fn percent(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for GstRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for GstRate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for GstRate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer).map(GstRate::new)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub product_id: Option<Uuid>,
    pub product_name: String,
    pub hsn_code: Option<String>,
    pub batch_no: Option<String>,
    pub expiry: Option<NaiveDate>,
    pub quantity: Decimal,
    pub free_quantity: Decimal,
    pub rate: Decimal,
    pub mrp: Option<Decimal>,
    pub discount_percent: Decimal,
    pub gst_percent: GstRate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_number: String,
    pub ifsc: String,
    pub branch: Option<String>,
}

/// Seller identity and settings resolved once at startup and handed to every
/// document computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationProfile {
    pub name: String,
    pub gstin: Option<Gstin>,
    pub state: StateCode,
    pub address: Option<String>,
    pub bank: Option<BankDetails>,
}

impl OrganizationProfile {
    pub fn supply_for(&self, bill_to: &BillTo) -> SupplyType {
        SupplyType::classify(self.state, bill_to.effective_state())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillTo {
    pub customer_id: Option<Uuid>,
    pub name: String,
    pub gstin: Option<Gstin>,
    pub state: Option<StateCode>,
}

impl BillTo {
    /// Explicit state first, then the GSTIN prefix.
    pub fn effective_state(&self) -> Option<StateCode> {
        self.state
            .or_else(|| self.gstin.as_ref().map(Gstin::state))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSummary {
    pub id: Uuid,
    pub name: String,
    pub gstin: Option<String>,
    pub state_code: Option<i16>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub hsn_code: Option<String>,
    pub gst_percent: GstRate,
    pub mrp: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Unpaid,
    Partial,
    Paid,
}

impl PaymentStatus {
    pub fn from_amounts(net_amount: Decimal, amount_paid: Decimal) -> Self {
        if amount_paid <= Decimal::ZERO {
            PaymentStatus::Unpaid
        } else if amount_paid < net_amount {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Paid
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Unpaid => "UNPAID",
            PaymentStatus::Partial => "PARTIAL",
            PaymentStatus::Paid => "PAID",
        }
    }
}
