//! PostgreSQL implementation of [`ProductStore`].
//!
//! Expects the shop schema: a `products` table with `product_code` (primary
//! key), `product_model`, and one `{stage}_employee` / `{stage}_time` text
//! column pair per stage; an `exempt_models` table keyed by `product_model`;
//! `model_series` and `series_processes` catalog tables; and a `month_range`
//! table holding the configured reporting window.
//!
//! Time columns are text on purpose: legacy rows carry several date formats
//! and the stored values are preserved verbatim. Queries bind at runtime so
//! the crate builds without a live database.

use anyhow::anyhow;
use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::error::{Result, WorklineError};
use crate::process::{ModelSeries, ProcessFields, SeriesProcess};
use crate::product::{ProductRecord, RawTimestamp};
use crate::store::{resolve_slots, ProcessWrite, ProductStore};

/// Column list every product query selects, in record order.
const PRODUCT_COLUMNS: &str = "product_code, product_model, \
     winding_employee, winding_time, \
     embedding_employee, embedding_time, \
     wire_connection_employee, wire_connection_time, \
     pressing_employee, pressing_time, \
     stopper_turning_employee, stopper_turning_time, \
     immersion_employee, immersion_time";

/// PostgreSQL-backed [`ProductStore`].
///
/// The caller supplies a connected pool; this type does not manage the
/// connection lifecycle.
///
/// # Example
/// ```ignore
/// use workline::{PostgresProductStore, ProcessTracker};
/// use sqlx::postgres::PgPool;
///
/// let pool = PgPool::connect("postgresql://localhost/workline").await?;
/// let tracker = ProcessTracker::new(PostgresProductStore::new(pool));
/// ```
pub struct PostgresProductStore {
    pool: PgPool,
}

impl PostgresProductStore {
    /// Create a store on an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Raw product row as it comes off the wire; every process column is text.
#[derive(sqlx::FromRow)]
struct ProductRow {
    product_code: String,
    product_model: Option<String>,
    winding_employee: Option<String>,
    winding_time: Option<String>,
    embedding_employee: Option<String>,
    embedding_time: Option<String>,
    wire_connection_employee: Option<String>,
    wire_connection_time: Option<String>,
    pressing_employee: Option<String>,
    pressing_time: Option<String>,
    stopper_turning_employee: Option<String>,
    stopper_turning_time: Option<String>,
    immersion_employee: Option<String>,
    immersion_time: Option<String>,
}

impl From<ProductRow> for ProductRecord {
    fn from(row: ProductRow) -> Self {
        ProductRecord {
            product_code: row.product_code,
            product_model: row.product_model,
            winding_employee: row.winding_employee,
            winding_time: row.winding_time.map(RawTimestamp::Text),
            embedding_employee: row.embedding_employee,
            embedding_time: row.embedding_time.map(RawTimestamp::Text),
            wire_connection_employee: row.wire_connection_employee,
            wire_connection_time: row.wire_connection_time.map(RawTimestamp::Text),
            pressing_employee: row.pressing_employee,
            pressing_time: row.pressing_time.map(RawTimestamp::Text),
            stopper_turning_employee: row.stopper_turning_employee,
            stopper_turning_time: row.stopper_turning_time.map(RawTimestamp::Text),
            immersion_employee: row.immersion_employee,
            immersion_time: row.immersion_time.map(RawTimestamp::Text),
        }
    }
}

#[derive(sqlx::FromRow)]
struct MonthRangeRow {
    start_date: Option<String>,
    end_date: Option<String>,
}

/// Map write field names onto whitelisted column names.
///
/// Field names come from the permissive catalog and may be anything the
/// caller sent; only names that resolve to real stages reach SQL.
fn resolve_columns(fields: &ProcessFields) -> Result<(&'static str, Option<&'static str>)> {
    let (time_slot, employee_slot) = resolve_slots(fields)?;
    Ok((
        time_slot.time_field(),
        employee_slot.map(|slot| slot.employee_field()),
    ))
}

#[async_trait]
impl ProductStore for PostgresProductStore {
    async fn fetch_product(&self, code: &str) -> Result<Option<ProductRecord>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE product_code = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| WorklineError::Other(anyhow!("Failed to fetch product: {}", e)))?;
        Ok(row.map(ProductRecord::from))
    }

    async fn product_model(&self, code: &str) -> Result<Option<String>> {
        let model = sqlx::query_scalar::<_, Option<String>>(
            "SELECT product_model FROM products WHERE product_code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WorklineError::Other(anyhow!("Failed to fetch product model: {}", e)))?;
        Ok(model.flatten())
    }

    async fn is_exempt_model(&self, model: &str) -> Result<bool> {
        let hit = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM exempt_models WHERE product_model = $1 LIMIT 1",
        )
        .bind(model)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WorklineError::Other(anyhow!("Failed to check exempt models: {}", e)))?;
        Ok(hit.is_some())
    }

    async fn latest_winding_time(&self, employee: &str) -> Result<Option<RawTimestamp>> {
        let time = sqlx::query_scalar::<_, String>(
            "SELECT winding_time FROM products \
             WHERE winding_employee = $1 AND winding_time IS NOT NULL \
             ORDER BY winding_time DESC LIMIT 1",
        )
        .bind(employee)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WorklineError::Other(anyhow!("Failed to fetch latest winding time: {}", e)))?;
        Ok(time.map(RawTimestamp::Text))
    }

    #[tracing::instrument(skip(self, write), fields(product_code = %code))]
    async fn insert_product(&self, code: &str, write: &ProcessWrite) -> Result<()> {
        let (time_col, employee_col) = resolve_columns(&write.fields)?;
        let result = match employee_col {
            Some(employee_col) => {
                let sql = format!(
                    "INSERT INTO products (product_code, {time_col}, {employee_col}) \
                     VALUES ($1, $2, $3)"
                );
                sqlx::query(&sql)
                    .bind(code)
                    .bind(write.time.storage_text())
                    .bind(&write.employee)
                    .execute(&self.pool)
                    .await
            }
            None => {
                let sql =
                    format!("INSERT INTO products (product_code, {time_col}) VALUES ($1, $2)");
                sqlx::query(&sql)
                    .bind(code)
                    .bind(write.time.storage_text())
                    .execute(&self.pool)
                    .await
            }
        };
        result.map_err(|e| WorklineError::Other(anyhow!("Failed to insert product: {}", e)))?;
        tracing::debug!(column = time_col, "Inserted product with first process entry");
        Ok(())
    }

    #[tracing::instrument(skip(self, write), fields(product_code = %code))]
    async fn record_if_unset(&self, code: &str, write: &ProcessWrite) -> Result<bool> {
        let (time_col, employee_col) = resolve_columns(&write.fields)?;
        let result = match employee_col {
            Some(employee_col) => {
                let sql = format!(
                    "UPDATE products SET {time_col} = $1, {employee_col} = $2 \
                     WHERE product_code = $3 AND {time_col} IS NULL"
                );
                sqlx::query(&sql)
                    .bind(write.time.storage_text())
                    .bind(&write.employee)
                    .bind(code)
                    .execute(&self.pool)
                    .await
            }
            None => {
                let sql = format!(
                    "UPDATE products SET {time_col} = $1 \
                     WHERE product_code = $2 AND {time_col} IS NULL"
                );
                sqlx::query(&sql)
                    .bind(write.time.storage_text())
                    .bind(code)
                    .execute(&self.pool)
                    .await
            }
        };
        let outcome = result
            .map_err(|e| WorklineError::Other(anyhow!("Failed to record process: {}", e)))?;
        Ok(outcome.rows_affected() > 0)
    }

    #[tracing::instrument(skip(self), fields(product_code = %code))]
    async fn clear_process(&self, code: &str, fields: &ProcessFields) -> Result<()> {
        let (time_col, employee_col) = resolve_columns(fields)?;
        let sql = match employee_col {
            Some(employee_col) => format!(
                "UPDATE products SET {time_col} = NULL, {employee_col} = NULL \
                 WHERE product_code = $1"
            ),
            None => format!("UPDATE products SET {time_col} = NULL WHERE product_code = $1"),
        };
        sqlx::query(&sql)
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(|e| WorklineError::Other(anyhow!("Failed to clear process: {}", e)))?;
        tracing::debug!(column = time_col, "Cleared process fields");
        Ok(())
    }

    async fn search_by_employee(&self, name: &str) -> Result<Vec<ProductRecord>> {
        let pattern = format!("%{}%", name.trim());
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE winding_employee LIKE $1 \
                OR embedding_employee LIKE $1 \
                OR wire_connection_employee LIKE $1 \
                OR pressing_employee LIKE $1 \
                OR stopper_turning_employee LIKE $1 \
                OR immersion_employee LIKE $1 \
             ORDER BY product_code"
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&pattern)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WorklineError::Other(anyhow!("Failed to search by employee: {}", e)))?;
        Ok(rows.into_iter().map(ProductRecord::from).collect())
    }

    async fn model_series(&self) -> Result<Vec<ModelSeries>> {
        sqlx::query_as::<_, ModelSeries>("SELECT product_model, series FROM model_series")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| WorklineError::Other(anyhow!("Failed to fetch model series: {}", e)))
    }

    async fn series_processes(&self) -> Result<Vec<SeriesProcess>> {
        sqlx::query_as::<_, SeriesProcess>(
            "SELECT series, sequence, process FROM series_processes ORDER BY series, sequence",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| WorklineError::Other(anyhow!("Failed to fetch series processes: {}", e)))
    }

    async fn month_range(&self) -> Result<Option<(RawTimestamp, RawTimestamp)>> {
        let row = sqlx::query_as::<_, MonthRangeRow>(
            "SELECT start_date, end_date FROM month_range ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| WorklineError::Other(anyhow!("Failed to fetch month range: {}", e)))?;
        Ok(row.and_then(|r| match (r.start_date, r.end_date) {
            (Some(start), Some(end)) => Some((RawTimestamp::Text(start), RawTimestamp::Text(end))),
            _ => None,
        }))
    }
}
