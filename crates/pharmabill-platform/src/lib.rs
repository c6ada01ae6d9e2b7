pub mod catalog;
pub mod config;
pub mod contracts;
pub mod db;
pub mod redis_bus;

pub use catalog::PgCatalog;
pub use config::{ServiceConfig, organization_from_env};
pub use contracts::{
    CustomerSearchResponse, DocumentDraftRequest, DocumentIssuedPayload, DocumentPreviewResponse,
    DocumentView, GstReportQuery, GstReportResponse, IssueDocumentResponse,
    PaymentRecordedPayload, ProductSearchResponse, RecordPaymentRequest, RecordPaymentResponse,
    SearchQuery, ValidatedDraft,
};
pub use db::{apply_schema, connect_database};
pub use redis_bus::{DOCUMENT_EVENTS_CHANNEL, RedisBus};
