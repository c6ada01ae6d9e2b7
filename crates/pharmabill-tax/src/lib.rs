//! GST arithmetic for sales documents: per-line tax split, document
//! aggregation with a per-rate breakup, round-off, HSN summaries and the
//! journal entries an issued invoice posts.

pub mod aggregate;
pub mod draft;
pub mod hsn;
pub mod journal;
pub mod line;
pub mod totals;

pub use aggregate::{DocumentAggregate, RateBreakup, aggregate};
pub use draft::SaleDraft;
pub use hsn::{HsnRow, HsnSummary, UNSPECIFIED_HSN};
pub use journal::{JournalEntry, JournalLine, PostingAmounts, payment_journal, sales_journal};
pub use line::{LineTax, compute_line_tax, line_tax};
pub use totals::{
    DocumentCharges, DocumentTotals, FinalTotals, PricedLine, compute_document_totals,
    finalize_totals, round_half_up,
};
