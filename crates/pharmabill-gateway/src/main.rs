use std::{collections::BTreeMap, net::SocketAddr, sync::Arc};

use anyhow::Result as AnyResult;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use pharmabill_core::{
    DocumentKind, DomainEvent, DomainEventKind, GstRate, LineItem, OrganizationProfile,
    PaymentStatus, SupplyType,
};
use pharmabill_platform::{
    CustomerSearchResponse, DocumentDraftRequest, DocumentIssuedPayload, DocumentPreviewResponse,
    DocumentView, GstReportQuery, GstReportResponse, IssueDocumentResponse,
    PaymentRecordedPayload, PgCatalog, ProductSearchResponse, RecordPaymentRequest,
    RecordPaymentResponse, RedisBus, SearchQuery, ServiceConfig, apply_schema, connect_database,
    organization_from_env,
};
use pharmabill_search::{CatalogSource, SearchSettings};
use pharmabill_tax::{HsnSummary, LineTax, PricedLine, RateBreakup};
use rust_decimal::Decimal;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::{error, info};
use uuid::Uuid;

const DEFAULT_LOG_FILTER: &str = "pharmabill_gateway=info";

#[derive(Clone)]
struct AppState {
    pool: PgPool,
    redis: RedisBus,
    catalog: PgCatalog,
    organization: Arc<OrganizationProfile>,
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string()),
        )
        .init();

    let config = ServiceConfig::from_env("0.0.0.0:8080")?;
    let organization = organization_from_env()?;
    let pool = connect_database(&config.database_url).await?;
    apply_schema(&pool).await?;
    let redis = RedisBus::connect(&config.redis_url)?;

    info!(
        "billing for {} (state {} {})",
        organization.name,
        organization.state,
        organization.state.name()
    );

    let state = AppState {
        catalog: PgCatalog::new(pool.clone()),
        pool,
        redis,
        organization: Arc::new(organization),
    };
    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/customers/search", get(search_customers))
        .route("/products/search", get(search_products))
        .route("/documents/preview", post(preview_document))
        .route("/quick-sale", post(create_quick_sale))
        .route("/challans", post(create_challan))
        .route("/documents/{document_id}", get(get_document))
        .route("/documents/{document_id}/payments", post(record_payment))
        .route("/reports/gst", get(gst_report))
        .with_state(state);

    let addr: SocketAddr = config.http_addr.parse()?;
    info!("gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

async fn search_customers(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<CustomerSearchResponse>, (StatusCode, String)> {
    if is_short_query(&query.q) {
        return Ok(Json(CustomerSearchResponse { hits: Vec::new() }));
    }

    let hits = state
        .catalog
        .search_customers(query.q.trim(), query.effective_limit())
        .await
        .map_err(internal_error)?;

    Ok(Json(CustomerSearchResponse { hits }))
}

async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ProductSearchResponse>, (StatusCode, String)> {
    if is_short_query(&query.q) {
        return Ok(Json(ProductSearchResponse { hits: Vec::new() }));
    }

    let hits = state
        .catalog
        .search_products(query.q.trim(), query.effective_limit())
        .await
        .map_err(internal_error)?;

    Ok(Json(ProductSearchResponse { hits }))
}

async fn preview_document(
    State(state): State<AppState>,
    Json(payload): Json<DocumentDraftRequest>,
) -> Result<Json<DocumentPreviewResponse>, (StatusCode, String)> {
    let draft = payload
        .validate()
        .map_err(|err| invalid_request(err.into()))?;
    let totals = draft.totals(&state.organization);

    Ok(Json(DocumentPreviewResponse::new(&draft, totals)))
}

async fn create_quick_sale(
    State(state): State<AppState>,
    Json(payload): Json<DocumentDraftRequest>,
) -> Result<(StatusCode, Json<IssueDocumentResponse>), (StatusCode, String)> {
    issue_document(&state, payload, DocumentKind::TaxInvoice).await
}

async fn create_challan(
    State(state): State<AppState>,
    Json(payload): Json<DocumentDraftRequest>,
) -> Result<(StatusCode, Json<IssueDocumentResponse>), (StatusCode, String)> {
    issue_document(&state, payload, DocumentKind::DeliveryChallan).await
}

async fn issue_document(
    state: &AppState,
    payload: DocumentDraftRequest,
    kind: DocumentKind,
) -> Result<(StatusCode, Json<IssueDocumentResponse>), (StatusCode, String)> {
    let draft = payload
        .validate()
        .map_err(|err| invalid_request(err.into()))?;
    if let Some(customer_id) = draft.bill_to.customer_id {
        ensure_customer_exists(&state.pool, customer_id).await?;
    }

    let totals = draft.totals(&state.organization);
    let issued_on = payload.issued_on.unwrap_or_else(|| Utc::now().date_naive());
    let document_id = Uuid::new_v4();
    let now = Utc::now();
    let payment_status = PaymentStatus::from_amounts(totals.net_amount, Decimal::ZERO);

    let mut tx = state.pool.begin().await.map_err(internal_error)?;

    let sequence = next_document_sequence(&mut tx, kind, issued_on)
        .await
        .map_err(internal_error)?;
    let document_number = kind.document_number(issued_on, sequence);

    sqlx::query(
        r#"
        INSERT INTO documents (
            id, kind, document_number, issued_on, customer_id, customer_name, customer_gstin,
            customer_state_code, supply_type, notes, taxable, cgst, sgst, igst, other_charges,
            delivery_charges, round_off, net_amount, amount_paid, payment_status, created_at,
            updated_at
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
            0, $19, $20, $20
        )
        "#,
    )
    .bind(document_id)
    .bind(kind.as_str())
    .bind(&document_number)
    .bind(issued_on)
    .bind(draft.bill_to.customer_id)
    .bind(&draft.bill_to.name)
    .bind(draft.bill_to.gstin.as_ref().map(|gstin| gstin.as_str().to_string()))
    .bind(draft.bill_to.effective_state().map(|state| i16::from(state.code())))
    .bind(totals.supply_type.as_str())
    .bind(draft.notes.as_deref())
    .bind(totals.summary.taxable)
    .bind(totals.summary.cgst)
    .bind(totals.summary.sgst)
    .bind(totals.summary.igst)
    .bind(totals.charges.other_charges)
    .bind(totals.charges.delivery_charges)
    .bind(totals.round_off)
    .bind(totals.net_amount)
    .bind(payment_status.as_str())
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;

    for (index, line) in totals.lines.iter().enumerate() {
        insert_document_line(&mut tx, document_id, index as i32 + 1, line)
            .await
            .map_err(internal_error)?;
    }

    tx.commit().await.map_err(internal_error)?;
    info!(
        "{} {} issued for {}: net {}",
        kind.as_str(),
        document_number,
        draft.bill_to.name,
        totals.net_amount
    );

    let event_payload = serde_json::to_value(DocumentIssuedPayload {
        document_id,
        document_number: document_number.clone(),
        kind,
        net_amount: totals.net_amount,
    })
    .map_err(internal_error)?;
    dispatch_event(
        state,
        DomainEvent::new(DomainEventKind::issued(kind), document_id, event_payload),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(IssueDocumentResponse {
            document_id,
            document_number,
            kind,
            issued_on,
            net_amount: totals.net_amount,
            round_off: totals.round_off,
            payment_status,
            totals,
        }),
    ))
}

async fn get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentView>, (StatusCode, String)> {
    let row = sqlx::query(
        r#"
        SELECT id, kind, document_number, issued_on, customer_id, customer_name, customer_gstin,
               customer_state_code, supply_type, notes, taxable, cgst, sgst, igst, other_charges,
               delivery_charges, round_off, net_amount, amount_paid, created_at
        FROM documents
        WHERE id = $1
        "#,
    )
    .bind(document_id)
    .fetch_optional(&state.pool)
    .await
    .map_err(internal_error)?
    .ok_or_else(|| (StatusCode::NOT_FOUND, "document not found".to_string()))?;

    let line_rows = sqlx::query(
        r#"
        SELECT product_id, product_name, hsn_code, batch_no, expiry, quantity, free_quantity,
               rate, mrp, discount_percent, gst_percent, amount, discount, taxable, gst, cgst,
               sgst, igst, total
        FROM document_lines
        WHERE document_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(document_id)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let lines = line_rows
        .iter()
        .map(priced_line_from_row)
        .collect::<AnyResult<Vec<_>>>()
        .map_err(internal_error)?;

    let kind_raw: String = row.try_get("kind").map_err(internal_error)?;
    let supply_raw: String = row.try_get("supply_type").map_err(internal_error)?;
    let net_amount: Decimal = row.try_get("net_amount").map_err(internal_error)?;
    let amount_paid: Decimal = row.try_get("amount_paid").map_err(internal_error)?;

    Ok(Json(DocumentView {
        id: row.try_get("id").map_err(internal_error)?,
        kind: parse_document_kind(&kind_raw).map_err(internal_error)?,
        document_number: row.try_get("document_number").map_err(internal_error)?,
        issued_on: row.try_get("issued_on").map_err(internal_error)?,
        customer_id: row.try_get("customer_id").map_err(internal_error)?,
        customer_name: row.try_get("customer_name").map_err(internal_error)?,
        customer_gstin: row.try_get("customer_gstin").map_err(internal_error)?,
        customer_state_code: row.try_get("customer_state_code").map_err(internal_error)?,
        supply_type: parse_supply_type(&supply_raw).map_err(internal_error)?,
        notes: row.try_get("notes").map_err(internal_error)?,
        taxable: row.try_get("taxable").map_err(internal_error)?,
        cgst: row.try_get("cgst").map_err(internal_error)?,
        sgst: row.try_get("sgst").map_err(internal_error)?,
        igst: row.try_get("igst").map_err(internal_error)?,
        other_charges: row.try_get("other_charges").map_err(internal_error)?,
        delivery_charges: row.try_get("delivery_charges").map_err(internal_error)?,
        round_off: row.try_get("round_off").map_err(internal_error)?,
        net_amount,
        amount_paid,
        balance: net_amount - amount_paid,
        payment_status: PaymentStatus::from_amounts(net_amount, amount_paid),
        created_at: row.try_get("created_at").map_err(internal_error)?,
        lines,
    }))
}

async fn record_payment(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<(StatusCode, Json<RecordPaymentResponse>), (StatusCode, String)> {
    let amount = payload
        .validated_amount()
        .map_err(|err| invalid_request(err.into()))?;
    let paid_on = payload.paid_on.unwrap_or_else(|| Utc::now().date_naive());

    let mut tx = state.pool.begin().await.map_err(internal_error)?;

    let row = sqlx::query(
        "SELECT kind, document_number, net_amount, amount_paid FROM documents WHERE id = $1 FOR UPDATE",
    )
    .bind(document_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(internal_error)?
    .ok_or_else(|| (StatusCode::NOT_FOUND, "document not found".to_string()))?;

    let kind_raw: String = row.try_get("kind").map_err(internal_error)?;
    let document_number: String = row.try_get("document_number").map_err(internal_error)?;
    let net_amount: Decimal = row.try_get("net_amount").map_err(internal_error)?;
    let already_paid: Decimal = row.try_get("amount_paid").map_err(internal_error)?;

    if parse_document_kind(&kind_raw).map_err(internal_error)? != DocumentKind::TaxInvoice {
        return Err((
            StatusCode::BAD_REQUEST,
            "payments can only be recorded against tax invoices".to_string(),
        ));
    }

    let (amount_paid, payment_status) =
        apply_payment(net_amount, already_paid, amount).map_err(invalid_request)?;
    let payment_id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO payments (id, document_id, amount, mode, reference, paid_on, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(payment_id)
    .bind(document_id)
    .bind(amount)
    .bind(payload.mode.as_deref().map(str::trim))
    .bind(payload.reference.as_deref().map(str::trim))
    .bind(paid_on)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;

    sqlx::query(
        "UPDATE documents SET amount_paid = $2, payment_status = $3, updated_at = $4 WHERE id = $1",
    )
    .bind(document_id)
    .bind(amount_paid)
    .bind(payment_status.as_str())
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(internal_error)?;

    tx.commit().await.map_err(internal_error)?;
    info!("payment of {} recorded against {}", amount, document_number);

    let event_payload = serde_json::to_value(PaymentRecordedPayload {
        payment_id,
        document_id,
        document_number,
        amount,
    })
    .map_err(internal_error)?;
    dispatch_event(
        &state,
        DomainEvent::new(DomainEventKind::PaymentRecorded, document_id, event_payload),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RecordPaymentResponse {
            payment_id,
            document_id,
            amount,
            amount_paid,
            balance: net_amount - amount_paid,
            payment_status,
        }),
    ))
}

async fn gst_report(
    State(state): State<AppState>,
    Query(query): Query<GstReportQuery>,
) -> Result<Json<GstReportResponse>, (StatusCode, String)> {
    validate_period_range(query.period_start, query.period_end).map_err(invalid_request)?;

    let totals_row = sqlx::query(
        r#"
        SELECT
            COUNT(*)::BIGINT AS invoice_count,
            COALESCE(SUM(taxable), 0) AS taxable,
            COALESCE(SUM(cgst), 0) AS cgst,
            COALESCE(SUM(sgst), 0) AS sgst,
            COALESCE(SUM(igst), 0) AS igst,
            COALESCE(SUM(net_amount), 0) AS net_amount
        FROM documents
        WHERE kind = $1 AND issued_on BETWEEN $2 AND $3
        "#,
    )
    .bind(DocumentKind::TaxInvoice.as_str())
    .bind(query.period_start)
    .bind(query.period_end)
    .fetch_one(&state.pool)
    .await
    .map_err(internal_error)?;

    let line_rows = sqlx::query(
        r#"
        SELECT l.product_id, l.product_name, l.hsn_code, l.batch_no, l.expiry, l.quantity,
               l.free_quantity, l.rate, l.mrp, l.discount_percent, l.gst_percent, l.amount,
               l.discount, l.taxable, l.gst, l.cgst, l.sgst, l.igst, l.total
        FROM document_lines l
        JOIN documents d ON d.id = l.document_id
        WHERE d.kind = $1 AND d.issued_on BETWEEN $2 AND $3
        ORDER BY d.issued_on, d.document_number, l.line_no
        "#,
    )
    .bind(DocumentKind::TaxInvoice.as_str())
    .bind(query.period_start)
    .bind(query.period_end)
    .fetch_all(&state.pool)
    .await
    .map_err(internal_error)?;

    let lines = line_rows
        .iter()
        .map(priced_line_from_row)
        .collect::<AnyResult<Vec<_>>>()
        .map_err(internal_error)?;
    let (breakup_by_rate, hsn_summary) = summarize_lines(&lines);

    let cgst: Decimal = totals_row.try_get("cgst").map_err(internal_error)?;
    let sgst: Decimal = totals_row.try_get("sgst").map_err(internal_error)?;
    let igst: Decimal = totals_row.try_get("igst").map_err(internal_error)?;

    Ok(Json(GstReportResponse {
        period_start: query.period_start,
        period_end: query.period_end,
        invoice_count: totals_row.try_get("invoice_count").map_err(internal_error)?,
        taxable: totals_row.try_get("taxable").map_err(internal_error)?,
        cgst,
        sgst,
        igst,
        gst: cgst + sgst + igst,
        net_amount: totals_row.try_get("net_amount").map_err(internal_error)?,
        breakup_by_rate,
        hsn_summary: hsn_summary.into_rows(),
    }))
}

async fn ensure_customer_exists(
    pool: &PgPool,
    customer_id: Uuid,
) -> Result<(), (StatusCode, String)> {
    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM customers WHERE id = $1)")
            .bind(customer_id)
            .fetch_one(pool)
            .await
            .map_err(internal_error)?;

    if !exists {
        return Err((StatusCode::NOT_FOUND, "customer not found".to_string()));
    }

    Ok(())
}

/// Next number in the per-kind, per-financial-year series.
async fn next_document_sequence(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    kind: DocumentKind,
    issued_on: NaiveDate,
) -> AnyResult<i64> {
    let sequence = sqlx::query_scalar::<_, i64>(
        r#"
        INSERT INTO document_sequences (kind, financial_year, last_value)
        VALUES ($1, $2, 1)
        ON CONFLICT (kind, financial_year)
        DO UPDATE SET last_value = document_sequences.last_value + 1
        RETURNING last_value
        "#,
    )
    .bind(kind.as_str())
    .bind(pharmabill_core::financial_year_label(issued_on))
    .fetch_one(&mut **tx)
    .await?;

    Ok(sequence)
}

async fn insert_document_line(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    document_id: Uuid,
    line_no: i32,
    line: &PricedLine,
) -> AnyResult<()> {
    let item = &line.item;
    let tax = &line.tax;

    sqlx::query(
        r#"
        INSERT INTO document_lines (
            id, document_id, line_no, product_id, product_name, hsn_code, batch_no, expiry,
            quantity, free_quantity, rate, mrp, discount_percent, gst_percent, amount, discount,
            taxable, gst, cgst, sgst, igst, total
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18,
            $19, $20, $21, $22
        )
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(document_id)
    .bind(line_no)
    .bind(item.product_id)
    .bind(&item.product_name)
    .bind(item.hsn_code.as_deref())
    .bind(item.batch_no.as_deref())
    .bind(item.expiry)
    .bind(item.quantity)
    .bind(item.free_quantity)
    .bind(item.rate)
    .bind(item.mrp)
    .bind(item.discount_percent)
    .bind(item.gst_percent.percent())
    .bind(tax.amount)
    .bind(tax.discount)
    .bind(tax.taxable)
    .bind(tax.gst)
    .bind(tax.cgst)
    .bind(tax.sgst)
    .bind(tax.igst)
    .bind(tax.total)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn dispatch_event(state: &AppState, event: DomainEvent) -> Result<(), (StatusCode, String)> {
    if let Err(err) = state.redis.publish_event(&event).await {
        error!(
            "failed to publish {:?} event {} for {}: {err:#}",
            event.kind, event.id, event.aggregate_id
        );
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            "failed to dispatch document event".to_string(),
        ));
    }

    Ok(())
}

/// Stored lines carry the tax split computed at issue time; it is read back
/// as-is, never recomputed.
fn priced_line_from_row(row: &PgRow) -> AnyResult<PricedLine> {
    let item = LineItem {
        product_id: row.try_get("product_id")?,
        product_name: row.try_get("product_name")?,
        hsn_code: row.try_get("hsn_code")?,
        batch_no: row.try_get("batch_no")?,
        expiry: row.try_get("expiry")?,
        quantity: row.try_get("quantity")?,
        free_quantity: row.try_get("free_quantity")?,
        rate: row.try_get("rate")?,
        mrp: row.try_get("mrp")?,
        discount_percent: row.try_get("discount_percent")?,
        gst_percent: GstRate::new(row.try_get("gst_percent")?),
    };
    let tax = LineTax {
        amount: row.try_get("amount")?,
        discount: row.try_get("discount")?,
        taxable: row.try_get("taxable")?,
        gst: row.try_get("gst")?,
        cgst: row.try_get("cgst")?,
        sgst: row.try_get("sgst")?,
        igst: row.try_get("igst")?,
        total: row.try_get("total")?,
    };

    Ok(PricedLine { item, tax })
}

fn summarize_lines(lines: &[PricedLine]) -> (BTreeMap<GstRate, RateBreakup>, HsnSummary) {
    let mut breakup: BTreeMap<GstRate, RateBreakup> = BTreeMap::new();
    for line in lines {
        breakup
            .entry(line.item.gst_percent)
            .or_default()
            .add(&line.tax);
    }

    (breakup, HsnSummary::from_lines(lines))
}

/// Returns the new amount paid and status. Paying more than the balance is
/// refused.
fn apply_payment(
    net_amount: Decimal,
    already_paid: Decimal,
    amount: Decimal,
) -> AnyResult<(Decimal, PaymentStatus)> {
    let balance = net_amount - already_paid;
    if amount > balance {
        anyhow::bail!("payment of {amount} exceeds the outstanding balance of {balance}");
    }

    let amount_paid = already_paid + amount;
    Ok((amount_paid, PaymentStatus::from_amounts(net_amount, amount_paid)))
}

fn parse_document_kind(value: &str) -> AnyResult<DocumentKind> {
    DocumentKind::parse(value).ok_or_else(|| anyhow::anyhow!("unknown document kind: {value}"))
}

fn parse_supply_type(value: &str) -> AnyResult<SupplyType> {
    SupplyType::parse(value).ok_or_else(|| anyhow::anyhow!("unknown supply type: {value}"))
}

fn is_short_query(query: &str) -> bool {
    SearchSettings::default().is_too_short(query)
}

fn validate_period_range(period_start: NaiveDate, period_end: NaiveDate) -> AnyResult<()> {
    if period_end < period_start {
        anyhow::bail!("period_end must be greater than or equal to period_start");
    }

    Ok(())
}

fn invalid_request(err: anyhow::Error) -> (StatusCode, String) {
    (StatusCode::BAD_REQUEST, err.to_string())
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    error!("request failed: {err}");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
