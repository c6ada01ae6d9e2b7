use pharmabill_core::{LineItem, SupplyType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const HUNDRED: Decimal = Decimal::ONE_HUNDRED;
const TWO: Decimal = Decimal::TWO;

/// Tax split of a single line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTax {
    pub amount: Decimal,
    pub discount: Decimal,
    pub taxable: Decimal,
    pub gst: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total: Decimal,
}

/// Splits GST for one line. Intra-state supply halves the tax into CGST and
/// SGST; inter-state supply charges it all as IGST.
pub fn compute_line_tax(
    rate: Decimal,
    quantity: Decimal,
    discount_percent: Decimal,
    gst_percent: Decimal,
    supply: SupplyType,
) -> LineTax {
    let amount = rate * quantity;
    let discount = amount * discount_percent / HUNDRED;
    let taxable = amount - discount;
    let gst = taxable * gst_percent / HUNDRED;

    let (cgst, sgst, igst) = match supply {
        SupplyType::InterState => (Decimal::ZERO, Decimal::ZERO, gst),
        SupplyType::IntraState => {
            let half = gst / TWO;
            (half, half, Decimal::ZERO)
        }
    };

    LineTax {
        amount,
        discount,
        taxable,
        gst,
        cgst,
        sgst,
        igst,
        total: taxable + gst,
    }
}

/// Free quantity carries no value; only billed quantity is taxed.
pub fn line_tax(item: &LineItem, supply: SupplyType) -> LineTax {
    compute_line_tax(
        item.rate,
        item.quantity,
        item.discount_percent,
        item.gst_percent.percent(),
        supply,
    )
}
