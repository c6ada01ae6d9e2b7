use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::DocumentKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DomainEventKind {
    InvoiceIssued,
    ChallanIssued,
    PaymentRecorded,
}

impl DomainEventKind {
    pub fn issued(kind: DocumentKind) -> Self {
        match kind {
            DocumentKind::TaxInvoice => DomainEventKind::InvoiceIssued,
            DocumentKind::DeliveryChallan => DomainEventKind::ChallanIssued,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: Uuid,
    pub aggregate_id: Uuid,
    pub kind: DomainEventKind,
    pub occurred_at: DateTime<Utc>,
    pub payload: serde_json::Value,
}

impl DomainEvent {
    pub fn new(kind: DomainEventKind, aggregate_id: Uuid, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            aggregate_id,
            kind,
            occurred_at: Utc::now(),
            payload,
        }
    }
}
