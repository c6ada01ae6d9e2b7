use std::collections::BTreeMap;

use pharmabill_core::{GstRate, LineItem, SupplyType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::line::{LineTax, line_tax};

/// One row of the tax-rate breakup table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBreakup {
    pub taxable: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub gst: Decimal,
    pub total: Decimal,
}

impl RateBreakup {
    pub fn add(&mut self, tax: &LineTax) {
        self.taxable += tax.taxable;
        self.cgst += tax.cgst;
        self.sgst += tax.sgst;
        self.igst += tax.igst;
        self.gst += tax.gst;
        self.total += tax.total;
    }

    pub fn merge(&mut self, other: &RateBreakup) {
        self.taxable += other.taxable;
        self.cgst += other.cgst;
        self.sgst += other.sgst;
        self.igst += other.igst;
        self.gst += other.gst;
        self.total += other.total;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentAggregate {
    pub line_count: usize,
    pub quantity: Decimal,
    pub free_quantity: Decimal,
    pub gross: Decimal,
    pub discount: Decimal,
    pub taxable: Decimal,
    pub gst: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total: Decimal,
    /// MRP value of goods supplied (billed plus free), over lines with an MRP.
    pub mrp_value: Decimal,
    /// Billed total of the lines counted in `mrp_value`.
    pub mrp_lines_total: Decimal,
    /// Keyed by normalised GST percentage, serialised as `"12"`, `"18"`, ...
    pub breakup_by_rate: BTreeMap<GstRate, RateBreakup>,
}

impl DocumentAggregate {
    pub fn add_line(&mut self, item: &LineItem, tax: &LineTax) {
        self.line_count += 1;
        self.quantity += item.quantity;
        self.free_quantity += item.free_quantity;
        self.gross += tax.amount;
        self.discount += tax.discount;
        self.taxable += tax.taxable;
        self.gst += tax.gst;
        self.cgst += tax.cgst;
        self.sgst += tax.sgst;
        self.igst += tax.igst;
        self.total += tax.total;

        if let Some(mrp) = item.mrp.filter(|mrp| *mrp > Decimal::ZERO) {
            self.mrp_value += mrp * (item.quantity + item.free_quantity);
            self.mrp_lines_total += tax.total;
        }

        self.breakup_by_rate
            .entry(item.gst_percent)
            .or_default()
            .add(tax);
    }

    /// What the customer saves against printed MRP; never negative.
    pub fn mrp_savings(&self) -> Decimal {
        (self.mrp_value - self.mrp_lines_total).max(Decimal::ZERO)
    }
}

/// Sums every line of a document. Order of `items` does not matter.
pub fn aggregate<'a, I>(items: I, supply: SupplyType) -> DocumentAggregate
where
    I: IntoIterator<Item = &'a LineItem>,
{
    let mut aggregate = DocumentAggregate::default();
    for item in items {
        let tax = line_tax(item, supply);
        aggregate.add_line(item, &tax);
    }
    aggregate
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;

    fn item(rate: Decimal, quantity: Decimal, gst: Decimal) -> LineItem {
        LineItem {
            product_id: None,
            product_name: "Cetirizine 10mg".to_string(),
            hsn_code: Some("3004".to_string()),
            batch_no: Some("B2291".to_string()),
            expiry: None,
            quantity,
            free_quantity: Decimal::ZERO,
            rate,
            mrp: None,
            discount_percent: Decimal::ZERO,
            gst_percent: GstRate::new(gst),
        }
    }

    #[test]
    fn breakup_keeps_each_rate_separate() {
        let items = vec![
            item(dec!(50), dec!(10), dec!(12)),
            item(dec!(100), dec!(10), dec!(18)),
            item(dec!(25), dec!(4), dec!(12.00)),
        ];

        let summary = aggregate(&items, SupplyType::IntraState);

        assert_eq!(summary.breakup_by_rate.len(), 2);
        let twelve = summary.breakup_by_rate[&GstRate::new(dec!(12))];
        let eighteen = summary.breakup_by_rate[&GstRate::new(dec!(18))];
        assert_eq!(twelve.taxable, dec!(600));
        assert_eq!(twelve.gst, dec!(72));
        assert_eq!(twelve.cgst, dec!(36));
        assert_eq!(eighteen.taxable, dec!(1000));
        assert_eq!(eighteen.gst, dec!(180));
        assert_eq!(summary.gst, twelve.gst + eighteen.gst);
        assert_eq!(summary.total, dec!(1852));
        assert_eq!(summary.line_count, 3);
    }

    #[test]
    fn breakup_serialises_with_rate_strings_as_keys() {
        let items = vec![
            item(dec!(50), dec!(10), dec!(12)),
            item(dec!(100), dec!(10), dec!(18)),
        ];
        let summary = aggregate(&items, SupplyType::InterState);

        let json = serde_json::to_value(&summary).unwrap();
        let breakup = json["breakup_by_rate"].as_object().unwrap();
        let mut keys: Vec<&str> = breakup.keys().map(String::as_str).collect();
        keys.sort();
        assert_eq!(keys, vec!["12", "18"]);
        let igst: Decimal = breakup["18"]["igst"].as_str().unwrap().parse().unwrap();
        assert_eq!(igst, dec!(180));
    }

    #[test]
    fn mrp_savings_count_free_goods() {
        let mut line = item(dec!(80), dec!(10), dec!(12));
        line.free_quantity = dec!(2);
        line.mrp = Some(dec!(100));

        let summary = aggregate(&[line], SupplyType::IntraState);

        assert_eq!(summary.mrp_value, dec!(1200));
        assert_eq!(summary.total, dec!(896));
        assert_eq!(summary.mrp_savings(), dec!(304));
        assert_eq!(summary.free_quantity, dec!(2));
    }

    #[test]
    fn empty_document_aggregates_to_zero() {
        let summary = aggregate(&Vec::<LineItem>::new(), SupplyType::IntraState);
        assert_eq!(summary, DocumentAggregate::default());
    }

    fn arb_item() -> impl Strategy<Value = LineItem> {
        (
            1i64..500_000,
            0i64..200,
            0i64..=3_000,
            prop::sample::select(vec![0i64, 5, 12, 18, 28]),
        )
            .prop_map(|(paise, qty, discount_bp, gst)| {
                let mut line = item(Decimal::new(paise, 2), Decimal::from(qty), Decimal::from(gst));
                line.discount_percent = Decimal::new(discount_bp, 2);
                line
            })
    }

    proptest! {
        #[test]
        fn aggregation_is_order_independent(
            items in prop::collection::vec(arb_item(), 0..12),
            seed in any::<u64>(),
            inter in any::<bool>(),
        ) {
            let supply = if inter { SupplyType::InterState } else { SupplyType::IntraState };
            let mut shuffled = items.clone();
            if !shuffled.is_empty() {
                let len = shuffled.len();
                shuffled.rotate_left((seed as usize) % len);
                shuffled.reverse();
            }

            prop_assert_eq!(aggregate(&items, supply), aggregate(&shuffled, supply));
        }

        #[test]
        fn breakup_sums_to_document_totals(items in prop::collection::vec(arb_item(), 0..12)) {
            let summary = aggregate(&items, SupplyType::IntraState);
            let mut combined = RateBreakup::default();
            for bucket in summary.breakup_by_rate.values() {
                combined.merge(bucket);
            }

            prop_assert_eq!(combined.taxable, summary.taxable);
            prop_assert_eq!(combined.gst, summary.gst);
            prop_assert_eq!(combined.total, summary.total);
        }
    }
}
