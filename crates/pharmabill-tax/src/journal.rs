use pharmabill_core::{ChartOfAccounts, IndianGstProfile, StandardsProfile};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JournalLine {
    pub account: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: Uuid,
    pub memo: String,
    pub lines: Vec<JournalLine>,
}

impl JournalEntry {
    pub fn total_debit(&self) -> Decimal {
        self.lines.iter().map(|line| line.debit).sum()
    }

    pub fn total_credit(&self) -> Decimal {
        self.lines.iter().map(|line| line.credit).sum()
    }

    pub fn is_balanced(&self) -> bool {
        self.total_debit() == self.total_credit()
    }
}

/// Amounts of an issued invoice that reach the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingAmounts {
    pub taxable: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub other_charges: Decimal,
    pub round_off: Decimal,
    pub net_amount: Decimal,
}

fn debit(account: &str, amount: Decimal) -> JournalLine {
    JournalLine {
        account: account.to_string(),
        debit: amount,
        credit: Decimal::ZERO,
    }
}

fn credit(account: &str, amount: Decimal) -> JournalLine {
    JournalLine {
        account: account.to_string(),
        debit: Decimal::ZERO,
        credit: amount,
    }
}

/// Receivable against sales, output tax, charges and round-off. Zero lines
/// are left out; a negative round-off is a debit.
pub fn sales_journal(document_number: &str, amounts: &PostingAmounts) -> JournalEntry {
    let coa: ChartOfAccounts = IndianGstProfile.chart_of_accounts();

    let mut lines = vec![
        debit(&coa.accounts_receivable, amounts.net_amount),
        credit(&coa.sales, amounts.taxable),
    ];
    for (account, amount) in [
        (&coa.output_cgst, amounts.cgst),
        (&coa.output_sgst, amounts.sgst),
        (&coa.output_igst, amounts.igst),
        (&coa.other_income, amounts.other_charges),
    ] {
        if !amount.is_zero() {
            lines.push(credit(account, amount));
        }
    }
    if amounts.round_off > Decimal::ZERO {
        lines.push(credit(&coa.round_off, amounts.round_off));
    } else if amounts.round_off < Decimal::ZERO {
        lines.push(debit(&coa.round_off, -amounts.round_off));
    }

    JournalEntry {
        id: Uuid::new_v4(),
        memo: format!("Sales invoice {document_number}"),
        lines,
    }
}

pub fn payment_journal(document_number: &str, amount: Decimal) -> JournalEntry {
    let coa = IndianGstProfile.chart_of_accounts();

    JournalEntry {
        id: Uuid::new_v4(),
        memo: format!("Payment against {document_number}"),
        lines: vec![
            debit(&coa.cash, amount),
            credit(&coa.accounts_receivable, amount),
        ],
    }
}

#[cfg(test)]
mod tests {
    use pharmabill_core::{GstRate, LineItem, SupplyType};
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::totals::{DocumentCharges, compute_document_totals};

    #[test]
    fn intra_state_invoice_posts_cgst_and_sgst() {
        let amounts = PostingAmounts {
            taxable: dec!(1000),
            cgst: dec!(90),
            sgst: dec!(90),
            igst: dec!(0),
            other_charges: dec!(0),
            round_off: dec!(0),
            net_amount: dec!(1180),
        };

        let entry = sales_journal("INV/2026-27/000001", &amounts);

        assert!(entry.is_balanced());
        assert_eq!(entry.total_debit(), dec!(1180));
        let accounts: Vec<&str> = entry.lines.iter().map(|l| l.account.as_str()).collect();
        assert_eq!(accounts, vec!["1100", "4000", "2310", "2320"]);
        assert_eq!(entry.memo, "Sales invoice INV/2026-27/000001");
    }

    #[test]
    fn negative_round_off_is_debited() {
        let amounts = PostingAmounts {
            taxable: dec!(100.40),
            cgst: dec!(0),
            sgst: dec!(0),
            igst: dec!(0),
            other_charges: dec!(0),
            round_off: dec!(-0.40),
            net_amount: dec!(100),
        };

        let entry = sales_journal("INV/2026-27/000002", &amounts);

        assert!(entry.is_balanced());
        assert_eq!(
            entry.lines.last(),
            Some(&JournalLine {
                account: "4900".to_string(),
                debit: dec!(0.40),
                credit: Decimal::ZERO,
            })
        );
    }

    #[test]
    fn payment_moves_receivable_to_cash() {
        let entry = payment_journal("INV/2026-27/000003", dec!(500));
        assert!(entry.is_balanced());
        assert_eq!(entry.lines[0].account, "1000");
        assert_eq!(entry.lines[1].account, "1100");
    }

    proptest! {
        #[test]
        fn computed_invoices_always_balance(
            lines in prop::collection::vec((1i64..200_000, 0i64..50, prop::sample::select(vec![0i64, 5, 12, 18])), 1..8),
            delivery in 0i64..50_000,
            inter in any::<bool>(),
        ) {
            let items: Vec<LineItem> = lines
                .into_iter()
                .map(|(paise, qty, gst)| LineItem {
                    product_id: None,
                    product_name: "Azithromycin 500mg".to_string(),
                    hsn_code: None,
                    batch_no: None,
                    expiry: None,
                    quantity: Decimal::from(qty),
                    free_quantity: Decimal::ZERO,
                    rate: Decimal::new(paise, 2),
                    mrp: None,
                    discount_percent: Decimal::ZERO,
                    gst_percent: GstRate::new(Decimal::from(gst)),
                })
                .collect();
            let supply = if inter { SupplyType::InterState } else { SupplyType::IntraState };
            let charges = DocumentCharges {
                other_charges: Decimal::ZERO,
                delivery_charges: Decimal::new(delivery, 2),
            };

            let totals = compute_document_totals(&items, supply, charges);
            let entry = sales_journal("INV/2026-27/000099", &totals.posting_amounts());

            prop_assert!(entry.is_balanced());
        }
    }
}
