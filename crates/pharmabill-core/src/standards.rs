use serde::{Deserialize, Serialize};

/// Ledger accounts a billing document posts to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartOfAccounts {
    pub cash: String,
    pub accounts_receivable: String,
    pub sales: String,
    pub output_cgst: String,
    pub output_sgst: String,
    pub output_igst: String,
    pub other_income: String,
    pub round_off: String,
}

pub trait StandardsProfile {
    fn name(&self) -> &'static str;
    fn chart_of_accounts(&self) -> ChartOfAccounts;
}

#[derive(Debug, Clone, Default)]
pub struct IndianGstProfile;

impl StandardsProfile for IndianGstProfile {
    fn name(&self) -> &'static str {
        "IND-GST"
    }

    fn chart_of_accounts(&self) -> ChartOfAccounts {
        ChartOfAccounts {
            cash: "1000".to_string(),
            accounts_receivable: "1100".to_string(),
            sales: "4000".to_string(),
            output_cgst: "2310".to_string(),
            output_sgst: "2320".to_string(),
            output_igst: "2330".to_string(),
            other_income: "4100".to_string(),
            round_off: "4900".to_string(),
        }
    }
}
