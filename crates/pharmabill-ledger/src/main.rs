use anyhow::{Context, Result};
use chrono::Utc;
use futures_util::StreamExt;
use pharmabill_core::{DomainEvent, DomainEventKind};
use pharmabill_platform::{
    DOCUMENT_EVENTS_CHANNEL, DocumentIssuedPayload, PaymentRecordedPayload, RedisBus,
    ServiceConfig, apply_schema, connect_database,
};
use pharmabill_tax::{JournalEntry, JournalLine, PostingAmounts, payment_journal, sales_journal};
use redis::Msg;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use tracing::{debug, error, info};
use uuid::Uuid;

/// What an event asks the ledger to post.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Posting {
    Sale {
        document_id: Uuid,
    },
    Payment {
        document_id: Uuid,
        document_number: String,
        amount: Decimal,
    },
}

impl Posting {
    fn document_id(&self) -> Uuid {
        match self {
            Posting::Sale { document_id } | Posting::Payment { document_id, .. } => *document_id,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "pharmabill_ledger=info".to_string()),
        )
        .init();

    let config = ServiceConfig::worker_from_env()?;
    let pool = connect_database(&config.database_url).await?;
    apply_schema(&pool).await?;
    let redis = RedisBus::connect(&config.redis_url)?;

    let mut pubsub = redis.client().get_async_pubsub().await?;
    pubsub.subscribe(DOCUMENT_EVENTS_CHANNEL).await?;
    let mut messages = pubsub.on_message();

    info!("ledger worker subscribed to {}", DOCUMENT_EVENTS_CHANNEL);

    loop {
        let msg = messages
            .next()
            .await
            .context("documents.events stream ended unexpectedly")?;
        if let Err(err) = handle_message(&pool, msg).await {
            error!("failed to post event: {err:#}");
        }
    }
}

async fn handle_message(pool: &PgPool, msg: Msg) -> Result<()> {
    let payload: String = msg.get_payload()?;
    let event: DomainEvent = serde_json::from_str(&payload)?;

    match plan_posting(&event)? {
        Some(posting) => post_event(pool, &event, posting).await,
        None => {
            debug!("{:?} {} has no ledger effect", event.kind, event.id);
            Ok(())
        }
    }
}

/// Challans move goods without a sale, so they post nothing.
fn plan_posting(event: &DomainEvent) -> Result<Option<Posting>> {
    match event.kind {
        DomainEventKind::InvoiceIssued => {
            let payload: DocumentIssuedPayload = serde_json::from_value(event.payload.clone())
                .context("malformed InvoiceIssued payload")?;
            Ok(Some(Posting::Sale {
                document_id: payload.document_id,
            }))
        }
        DomainEventKind::PaymentRecorded => {
            let payload: PaymentRecordedPayload = serde_json::from_value(event.payload.clone())
                .context("malformed PaymentRecorded payload")?;
            Ok(Some(Posting::Payment {
                document_id: payload.document_id,
                document_number: payload.document_number,
                amount: payload.amount,
            }))
        }
        DomainEventKind::ChallanIssued => Ok(None),
    }
}

async fn post_event(pool: &PgPool, event: &DomainEvent, posting: Posting) -> Result<()> {
    let mut tx = pool.begin().await?;
    let document_id = posting.document_id();

    let entry = match posting {
        Posting::Sale { document_id } => {
            let (document_number, amounts) = load_posting_amounts(&mut tx, document_id).await?;
            sales_journal(&document_number, &amounts)
        }
        Posting::Payment {
            document_number,
            amount,
            ..
        } => payment_journal(&document_number, amount),
    };

    if !entry.is_balanced() {
        anyhow::bail!(
            "journal for {} does not balance: debit {} credit {}",
            entry.memo,
            entry.total_debit(),
            entry.total_credit()
        );
    }

    let claimed = sqlx::query(
        r#"
        INSERT INTO ledger_postings (event_id, event_kind, document_id, entry_id, posted_at)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (event_id) DO NOTHING
        "#,
    )
    .bind(event.id)
    .bind(format!("{:?}", event.kind))
    .bind(document_id)
    .bind(entry.id)
    .bind(Utc::now())
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if claimed == 0 {
        info!("event {} already posted, skipping", event.id);
        return Ok(());
    }

    insert_entry(&mut tx, document_id, &entry).await?;
    tx.commit().await?;

    info!("posted {} ({})", entry.memo, entry.total_debit());
    Ok(())
}

async fn load_posting_amounts(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    document_id: Uuid,
) -> Result<(String, PostingAmounts)> {
    let row = sqlx::query(
        r#"
        SELECT document_number, taxable, cgst, sgst, igst, other_charges, delivery_charges,
               round_off, net_amount
        FROM documents
        WHERE id = $1
        "#,
    )
    .bind(document_id)
    .fetch_optional(&mut **tx)
    .await?
    .context("document not found")?;

    let other_charges: Decimal = row.try_get("other_charges")?;
    let delivery_charges: Decimal = row.try_get("delivery_charges")?;

    Ok((
        row.try_get("document_number")?,
        PostingAmounts {
            taxable: row.try_get("taxable")?,
            cgst: row.try_get("cgst")?,
            sgst: row.try_get("sgst")?,
            igst: row.try_get("igst")?,
            other_charges: other_charges + delivery_charges,
            round_off: row.try_get("round_off")?,
            net_amount: row.try_get("net_amount")?,
        },
    ))
}

async fn insert_entry(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    document_id: Uuid,
    entry: &JournalEntry,
) -> Result<()> {
    for line in &entry.lines {
        insert_journal(tx, entry.id, document_id, line, &entry.memo).await?;
    }

    Ok(())
}

async fn insert_journal(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    entry_id: Uuid,
    document_id: Uuid,
    line: &JournalLine,
    memo: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO journals (id, entry_id, document_id, account, debit, credit, memo, posted_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry_id)
    .bind(document_id)
    .bind(&line.account)
    .bind(line.debit)
    .bind(line.credit)
    .bind(memo)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;

    Ok(())
}
