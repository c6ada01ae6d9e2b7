use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};
use tracing::{debug, info};

const SCHEMA: &str = include_str!("schema.sql");

pub async fn connect_database(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    debug!("database pool ready");
    Ok(pool)
}

/// Creates missing tables. Every statement is idempotent.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .context("failed to apply database schema")?;

    info!("database schema applied ({} statements)", schema_statements().count());
    Ok(())
}

fn schema_statements() -> impl Iterator<Item = &'static str> {
    SCHEMA
        .split(';')
        .map(str::trim)
        .filter(|statement| !statement.is_empty())
}

#[cfg(test)]
mod tests {
    use super::schema_statements;

    #[test]
    fn every_schema_statement_can_be_rerun() {
        let statements: Vec<_> = schema_statements().collect();
        assert_eq!(statements.len(), 11);
        for statement in statements {
            assert!(
                statement.starts_with("CREATE TABLE IF NOT EXISTS")
                    || statement.starts_with("CREATE INDEX IF NOT EXISTS"),
                "not idempotent: {statement}"
            );
        }
    }
}
