use pharmabill_core::{LineItem, SupplyType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::DocumentAggregate;
use crate::journal::PostingAmounts;
use crate::line::{LineTax, line_tax};

/// Rounds to the nearest integer with halves going toward +infinity, so the
/// correction it implies always lies in (-0.5, 0.5].
pub fn round_half_up(value: Decimal) -> Decimal {
    (value + Decimal::new(5, 1)).floor()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentCharges {
    pub other_charges: Decimal,
    pub delivery_charges: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalTotals {
    pub pre_round: Decimal,
    pub round_off: Decimal,
    pub net_amount: Decimal,
}

pub fn finalize_totals(
    aggregate: &DocumentAggregate,
    other_charges: Decimal,
    delivery_charges: Decimal,
) -> FinalTotals {
    let pre_round = aggregate.total + other_charges + delivery_charges;
    let net_amount = round_half_up(pre_round);

    FinalTotals {
        pre_round,
        round_off: net_amount - pre_round,
        net_amount,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedLine {
    #[serde(flatten)]
    pub item: LineItem,
    pub tax: LineTax,
}

/// Everything an entry screen or a printed bill needs, recomputed from the
/// current line list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTotals {
    pub supply_type: SupplyType,
    pub lines: Vec<PricedLine>,
    pub summary: DocumentAggregate,
    pub charges: DocumentCharges,
    pub round_off: Decimal,
    pub net_amount: Decimal,
    pub mrp_savings: Decimal,
}

impl DocumentTotals {
    pub fn posting_amounts(&self) -> PostingAmounts {
        PostingAmounts {
            taxable: self.summary.taxable,
            cgst: self.summary.cgst,
            sgst: self.summary.sgst,
            igst: self.summary.igst,
            other_charges: self.charges.other_charges + self.charges.delivery_charges,
            round_off: self.round_off,
            net_amount: self.net_amount,
        }
    }
}

pub fn compute_document_totals(
    items: &[LineItem],
    supply: SupplyType,
    charges: DocumentCharges,
) -> DocumentTotals {
    let mut summary = DocumentAggregate::default();
    let mut lines = Vec::with_capacity(items.len());

    for item in items {
        let tax = line_tax(item, supply);
        summary.add_line(item, &tax);
        lines.push(PricedLine {
            item: item.clone(),
            tax,
        });
    }

    let finalized = finalize_totals(&summary, charges.other_charges, charges.delivery_charges);
    let mrp_savings = summary.mrp_savings();

    DocumentTotals {
        supply_type: supply,
        lines,
        summary,
        charges,
        round_off: finalized.round_off,
        net_amount: finalized.net_amount,
        mrp_savings,
    }
}
