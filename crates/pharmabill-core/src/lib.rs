pub mod error;
pub mod events;
pub mod models;
pub mod standards;
pub mod state;
pub mod validation;

pub use error::{Field, ValidationError};
pub use events::{DomainEvent, DomainEventKind};
pub use models::{
    BankDetails, BillTo, CustomerSummary, DocumentKind, GstRate, LineItem, OrganizationProfile,
    PaymentStatus, ProductSummary, financial_year_label,
};
pub use standards::{ChartOfAccounts, IndianGstProfile, StandardsProfile};
pub use state::{Gstin, StateCode, SupplyType};
pub use validation::{
    BillToInput, LineItemInput, MAX_AMOUNT, MAX_QUANTITY, NumericInput, parse_charge,
    validate_lines,
};
