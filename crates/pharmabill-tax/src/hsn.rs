use std::collections::BTreeMap;

use pharmabill_core::GstRate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::line::LineTax;
use crate::totals::PricedLine;

pub const UNSPECIFIED_HSN: &str = "UNSPECIFIED";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsnRow {
    pub hsn_code: String,
    pub gst_percent: GstRate,
    pub quantity: Decimal,
    pub taxable: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total: Decimal,
}

/// HSN-wise summary of outward supplies, one row per (HSN code, GST rate).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HsnSummary {
    rows: BTreeMap<(String, GstRate), HsnRow>,
}

impl HsnSummary {
    pub fn from_lines(lines: &[PricedLine]) -> Self {
        let mut summary = Self::default();
        for line in lines {
            summary.add(
                line.item.hsn_code.as_deref(),
                line.item.gst_percent,
                line.item.quantity + line.item.free_quantity,
                &line.tax,
            );
        }
        summary
    }

    /// `quantity` is the quantity supplied, free goods included.
    pub fn add(
        &mut self,
        hsn_code: Option<&str>,
        gst_percent: GstRate,
        quantity: Decimal,
        tax: &LineTax,
    ) {
        let code = hsn_code
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .unwrap_or(UNSPECIFIED_HSN)
            .to_string();

        let row = self
            .rows
            .entry((code.clone(), gst_percent))
            .or_insert_with(|| HsnRow {
                hsn_code: code,
                gst_percent,
                quantity: Decimal::ZERO,
                taxable: Decimal::ZERO,
                cgst: Decimal::ZERO,
                sgst: Decimal::ZERO,
                igst: Decimal::ZERO,
                total: Decimal::ZERO,
            });

        row.quantity += quantity;
        row.taxable += tax.taxable;
        row.cgst += tax.cgst;
        row.sgst += tax.sgst;
        row.igst += tax.igst;
        row.total += tax.total;
    }

    pub fn merge(&mut self, other: HsnSummary) {
        for (key, incoming) in other.rows {
            match self.rows.get_mut(&key) {
                Some(row) => {
                    row.quantity += incoming.quantity;
                    row.taxable += incoming.taxable;
                    row.cgst += incoming.cgst;
                    row.sgst += incoming.sgst;
                    row.igst += incoming.igst;
                    row.total += incoming.total;
                }
                None => {
                    self.rows.insert(key, incoming);
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &HsnRow> {
        self.rows.values()
    }

    pub fn into_rows(self) -> Vec<HsnRow> {
        self.rows.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use pharmabill_core::{LineItem, SupplyType};
    use rust_decimal_macros::dec;

    use super::*;
    use crate::totals::{DocumentCharges, compute_document_totals};

    fn item(hsn: Option<&str>, rate: Decimal, quantity: Decimal, gst: Decimal) -> LineItem {
        LineItem {
            product_id: None,
            product_name: "Metformin 500mg".to_string(),
            hsn_code: hsn.map(str::to_string),
            batch_no: None,
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
    fn groups_by_hsn_and_rate() {
        let items = vec![
            item(Some("3004"), dec!(10), dec!(5), dec!(12)),
            item(Some("3004"), dec!(20), dec!(2), dec!(12)),
            item(Some("3004"), dec!(100), dec!(1), dec!(18)),
            item(None, dec!(50), dec!(1), dec!(5)),
        ];
        let totals = compute_document_totals(&items, SupplyType::IntraState, DocumentCharges::default());

        let rows = HsnSummary::from_lines(&totals.lines).into_rows();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].hsn_code, "3004");
        assert_eq!(rows[0].gst_percent.to_string(), "12");
        assert_eq!(rows[0].quantity, dec!(7));
        assert_eq!(rows[0].taxable, dec!(90));
        assert_eq!(rows[0].cgst, dec!(5.4));
        assert_eq!(rows[1].gst_percent.to_string(), "18");
        assert_eq!(rows[2].hsn_code, UNSPECIFIED_HSN);
    }

    #[test]
    fn merging_documents_accumulates_matching_rows() {
        let first = compute_document_totals(
            &[item(Some("3004"), dec!(10), dec!(5), dec!(12))],
            SupplyType::IntraState,
            DocumentCharges::default(),
        );
        let second = compute_document_totals(
            &[
                item(Some("3004"), dec!(10), dec!(3), dec!(12)),
                item(Some("3006"), dec!(40), dec!(1), dec!(12)),
            ],
            SupplyType::InterState,
            DocumentCharges::default(),
        );

        let mut summary = HsnSummary::from_lines(&first.lines);
        summary.merge(HsnSummary::from_lines(&second.lines));
        let rows: Vec<&HsnRow> = summary.rows().collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].quantity, dec!(8));
        assert_eq!(rows[0].taxable, dec!(80));
        assert_eq!(rows[0].cgst, dec!(3));
        assert_eq!(rows[0].igst, dec!(3.6));
        assert_eq!(rows[1].hsn_code, "3006");
    }
}
