use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use pharmabill_core::{
    BillTo, BillToInput, CustomerSummary, DocumentKind, Field, GstRate, LineItem, LineItemInput,
    NumericInput, OrganizationProfile, PaymentStatus, ProductSummary, StateCode, SupplyType,
    ValidationError, parse_charge, validate_lines,
};
use pharmabill_tax::{
    DocumentCharges, DocumentTotals, HsnRow, HsnSummary, PricedLine, RateBreakup,
    compute_document_totals,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_SEARCH_LIMIT: i64 = 10;
const MAX_SEARCH_LIMIT: i64 = 50;

/// A sales document as keyed in on the entry screen. Used for previews,
/// quick-sale invoices and delivery challans alike.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentDraftRequest {
    #[serde(default)]
    pub bill_to: BillToInput,
    #[serde(default)]
    pub items: Vec<LineItemInput>,
    pub other_charges: Option<NumericInput>,
    pub delivery_charges: Option<NumericInput>,
    pub notes: Option<String>,
    /// Defaults to today.
    pub issued_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDraft {
    pub bill_to: BillTo,
    pub items: Vec<LineItem>,
    pub charges: DocumentCharges,
    pub notes: Option<String>,
}

impl DocumentDraftRequest {
    pub fn validate(&self) -> Result<ValidatedDraft, ValidationError> {
        let bill_to = self.bill_to.validate()?;
        let items = validate_lines(&self.items)?;
        let charges = DocumentCharges {
            other_charges: parse_charge(self.other_charges.as_ref(), Field::OtherCharges)?,
            delivery_charges: parse_charge(self.delivery_charges.as_ref(), Field::DeliveryCharges)?,
        };
        let notes = self
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| !notes.is_empty())
            .map(str::to_string);

        Ok(ValidatedDraft {
            bill_to,
            items,
            charges,
            notes,
        })
    }
}

impl ValidatedDraft {
    pub fn supply_type(&self, organization: &OrganizationProfile) -> SupplyType {
        organization.supply_for(&self.bill_to)
    }

    pub fn totals(&self, organization: &OrganizationProfile) -> DocumentTotals {
        compute_document_totals(&self.items, self.supply_type(organization), self.charges)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentPreviewResponse {
    pub place_of_supply: Option<StateCode>,
    pub totals: DocumentTotals,
    pub hsn_summary: Vec<HsnRow>,
}

impl DocumentPreviewResponse {
    pub fn new(draft: &ValidatedDraft, totals: DocumentTotals) -> Self {
        let hsn_summary = HsnSummary::from_lines(&totals.lines).into_rows();
        Self {
            place_of_supply: draft.bill_to.effective_state(),
            totals,
            hsn_summary,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueDocumentResponse {
    pub document_id: Uuid,
    pub document_number: String,
    pub kind: DocumentKind,
    pub issued_on: NaiveDate,
    pub net_amount: Decimal,
    pub round_off: Decimal,
    pub payment_status: PaymentStatus,
    pub totals: DocumentTotals,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentRequest {
    pub amount: NumericInput,
    pub mode: Option<String>,
    pub reference: Option<String>,
    pub paid_on: Option<NaiveDate>,
}

impl RecordPaymentRequest {
    /// The amount must be a positive number.
    pub fn validated_amount(&self) -> Result<Decimal, ValidationError> {
        let amount = parse_charge(Some(&self.amount), Field::Amount)?;
        if amount.is_zero() {
            return Err(ValidationError::Missing(Field::Amount));
        }
        Ok(amount)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordPaymentResponse {
    pub payment_id: Uuid,
    pub document_id: Uuid,
    pub amount: Decimal,
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<i64>,
}

impl SearchQuery {
    pub fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_SEARCH_LIMIT)
            .clamp(1, MAX_SEARCH_LIMIT) as usize
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerSearchResponse {
    pub hits: Vec<CustomerSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSearchResponse {
    pub hits: Vec<ProductSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GstReportQuery {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

/// Outward supplies over a period, tax invoices only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GstReportResponse {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub invoice_count: i64,
    pub taxable: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub gst: Decimal,
    pub net_amount: Decimal,
    pub breakup_by_rate: BTreeMap<GstRate, RateBreakup>,
    pub hsn_summary: Vec<HsnRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentView {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub document_number: String,
    pub issued_on: NaiveDate,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub customer_gstin: Option<String>,
    pub customer_state_code: Option<i16>,
    pub supply_type: SupplyType,
    pub notes: Option<String>,
    pub taxable: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub other_charges: Decimal,
    pub delivery_charges: Decimal,
    pub round_off: Decimal,
    pub net_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance: Decimal,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<PricedLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentIssuedPayload {
    pub document_id: Uuid,
    pub document_number: String,
    pub kind: DocumentKind,
    pub net_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRecordedPayload {
    pub payment_id: Uuid,
    pub document_id: Uuid,
    pub document_number: String,
    pub amount: Decimal,
}
