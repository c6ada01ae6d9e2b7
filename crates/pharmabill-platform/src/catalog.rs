use async_trait::async_trait;
use pharmabill_core::{CustomerSummary, GstRate, ProductSummary};
use pharmabill_search::CatalogSource;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

/// Prefix search over the customer and product masters.
#[derive(Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogSource for PgCatalog {
    async fn search_customers(
        &self,
        query: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<CustomerSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, gstin, state_code, phone
            FROM customers
            WHERE name ILIKE $1 OR gstin ILIKE $1 OR phone LIKE $1
            ORDER BY name
            LIMIT $2
            "#,
        )
        .bind(like_prefix(query))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> anyhow::Result<CustomerSummary> {
                Ok(CustomerSummary {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    gstin: row.try_get("gstin")?,
                    state_code: row.try_get("state_code")?,
                    phone: row.try_get("phone")?,
                })
            })
            .collect()
    }

    async fn search_products(
        &self,
        query: &str,
        limit: usize,
    ) -> anyhow::Result<Vec<ProductSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, hsn_code, gst_percent, mrp, rate
            FROM products
            WHERE active = TRUE AND (name ILIKE $1 OR hsn_code LIKE $1)
            ORDER BY name
            LIMIT $2
            "#,
        )
        .bind(like_prefix(query))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> anyhow::Result<ProductSummary> {
                Ok(ProductSummary {
                    id: row.try_get("id")?,
                    name: row.try_get("name")?,
                    hsn_code: row.try_get("hsn_code")?,
                    gst_percent: GstRate::new(row.try_get::<Decimal, _>("gst_percent")?),
                    mrp: row.try_get("mrp")?,
                    rate: row.try_get("rate")?,
                })
            })
            .collect()
    }
}

/// `LIKE` pattern matching values that start with `query` literally.
fn like_prefix(query: &str) -> String {
    let mut pattern = String::with_capacity(query.len() + 1);
    for ch in query.trim().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
