//! Lendings repository for database operations

use rust_decimal::Decimal;
use sqlx::{types::Json, PgConnection, Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    error::{AppError, AppResult},
    models::{
        enums::LendingStatus,
        lending::{LendingQuery, LendingRecord, LendingRow},
    },
};

/// SQL rendition of `LendingRecord::status_at(NOW())`
pub(crate) const STATUS_SQL: &str = "CASE \
    WHEN quantity_returned_total >= quantity_issued_total THEN 'returned' \
    WHEN quantity_returned_total > 0 THEN 'partially_returned' \
    WHEN due_date < NOW() THEN 'overdue' \
    ELSE 'active' END";

const OVERDUE_SQL: &str =
    "(quantity_returned_total < quantity_issued_total AND due_date < NOW())";

/// Fine and status totals for one tenant
#[derive(Debug, Clone, Default)]
pub struct LendingTotals {
    pub by_status: Vec<(LendingStatus, i64)>,
    pub overdue: i64,
    pub total_fines: Decimal,
    pub paid_fines: Decimal,
}

#[derive(Clone)]
pub struct LendingsRepository {
    pool: Pool<Postgres>,
}

impl LendingsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get lending by ID within a tenant
    pub async fn get_by_id(&self, tenant_id: Uuid, id: Uuid) -> AppResult<LendingRecord> {
        sqlx::query_as::<_, LendingRow>("SELECT * FROM lendings WHERE tenant_id = $1 AND id = $2")
            .bind(tenant_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(LendingRecord::from)
            .ok_or_else(|| AppError::NotFound(format!("Lending {} not found", id)))
    }

    /// Load a lending and hold its row lock until the surrounding transaction ends
    pub async fn lock(
        &self,
        conn: &mut PgConnection,
        tenant_id: Uuid,
        id: Uuid,
    ) -> AppResult<LendingRecord> {
        sqlx::query_as::<_, LendingRow>(
            "SELECT * FROM lendings WHERE tenant_id = $1 AND id = $2 FOR UPDATE",
        )
        .bind(tenant_id)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .map(LendingRecord::from)
        .ok_or_else(|| AppError::NotFound(format!("Lending {} not found", id)))
    }

    /// Insert a newly issued lending
    pub async fn insert(&self, conn: &mut PgConnection, record: &LendingRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lendings (
                id, tenant_id, borrower_id, site_id, issued_by,
                issued_date, due_date, items, renewal_count, renewal_history,
                fines, total_fines, paid_fines,
                quantity_issued_total, quantity_returned_total,
                notes, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(record.id)
        .bind(record.tenant_id)
        .bind(record.borrower_id)
        .bind(record.site_id)
        .bind(record.issued_by)
        .bind(record.issued_date)
        .bind(record.due_date)
        .bind(Json(&record.items))
        .bind(record.renewal_count)
        .bind(Json(&record.renewal_history))
        .bind(Json(&record.fines))
        .bind(record.total_fines)
        .bind(record.paid_fines())
        .bind(record.quantity_issued_total())
        .bind(record.quantity_returned_total())
        .bind(&record.notes)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Write back the mutable parts of a lending
    pub async fn save(&self, conn: &mut PgConnection, record: &LendingRecord) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE lendings SET
                due_date = $3,
                items = $4,
                renewal_count = $5,
                renewal_history = $6,
                fines = $7,
                total_fines = $8,
                paid_fines = $9,
                quantity_returned_total = $10,
                updated_at = $11
            WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(record.tenant_id)
        .bind(record.id)
        .bind(record.due_date)
        .bind(Json(&record.items))
        .bind(record.renewal_count)
        .bind(Json(&record.renewal_history))
        .bind(Json(&record.fines))
        .bind(record.total_fines)
        .bind(record.paid_fines())
        .bind(record.quantity_returned_total())
        .bind(record.updated_at)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Lending {} not found", record.id)));
        }

        Ok(())
    }

    /// List lendings with filters and pagination, newest first
    pub async fn list(
        &self,
        tenant_id: Uuid,
        query: &LendingQuery,
        per_page: i64,
    ) -> AppResult<(Vec<LendingRecord>, i64)> {
        let offset = AppConfig::page_offset(query.page, per_page);

        let mut conditions = vec!["tenant_id = $1".to_string()];
        let mut idx = 2;

        if query.borrower_id.is_some() {
            conditions.push(format!("borrower_id = ${}", idx));
            idx += 1;
        }
        if query.site_id.is_some() {
            conditions.push(format!("site_id = ${}", idx));
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!("({}) = ${}", STATUS_SQL, idx));
        }
        match query.overdue {
            Some(true) => conditions.push(OVERDUE_SQL.to_string()),
            Some(false) => conditions.push(format!("NOT {}", OVERDUE_SQL)),
            None => {}
        }

        let where_clause = conditions.join(" AND ");

        let count_q = format!("SELECT COUNT(*) FROM lendings WHERE {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_q).bind(tenant_id);
        if let Some(borrower_id) = query.borrower_id { count_builder = count_builder.bind(borrower_id); }
        if let Some(site_id) = query.site_id { count_builder = count_builder.bind(site_id); }
        if let Some(status) = query.status { count_builder = count_builder.bind(status); }
        let total = count_builder.fetch_one(&self.pool).await?;

        let select_q = format!(
            "SELECT * FROM lendings WHERE {} ORDER BY issued_date DESC, id LIMIT {} OFFSET {}",
            where_clause, per_page, offset
        );
        let mut builder = sqlx::query_as::<_, LendingRow>(&select_q).bind(tenant_id);
        if let Some(borrower_id) = query.borrower_id { builder = builder.bind(borrower_id); }
        if let Some(site_id) = query.site_id { builder = builder.bind(site_id); }
        if let Some(status) = query.status { builder = builder.bind(status); }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok((rows.into_iter().map(LendingRecord::from).collect(), total))
    }

    /// All lendings of one borrower, open ones first
    pub async fn list_by_borrower(
        &self,
        tenant_id: Uuid,
        borrower_id: Uuid,
    ) -> AppResult<Vec<LendingRecord>> {
        let rows = sqlx::query_as::<_, LendingRow>(
            r#"
            SELECT * FROM lendings
            WHERE tenant_id = $1 AND borrower_id = $2
            ORDER BY (quantity_returned_total >= quantity_issued_total), due_date
            "#,
        )
        .bind(tenant_id)
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LendingRecord::from).collect())
    }

    /// Status counts and fine sums for a tenant
    pub async fn totals(&self, tenant_id: Uuid) -> AppResult<LendingTotals> {
        let status_q = format!(
            "SELECT {} AS status, COUNT(*) AS count FROM lendings WHERE tenant_id = $1 GROUP BY 1",
            STATUS_SQL
        );
        let by_status = sqlx::query(&status_q)
            .bind(tenant_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| {
                let status: LendingStatus = row.try_get("status")?;
                let count: i64 = row.try_get("count")?;
                Ok((status, count))
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        let overdue_q = format!(
            "SELECT COUNT(*) FROM lendings WHERE tenant_id = $1 AND {}",
            OVERDUE_SQL
        );
        let overdue: i64 = sqlx::query_scalar(&overdue_q)
            .bind(tenant_id)
            .fetch_one(&self.pool)
            .await?;

        let fines_row = sqlx::query(
            r#"
            SELECT COALESCE(SUM(total_fines), 0) AS total_fines,
                   COALESCE(SUM(paid_fines), 0) AS paid_fines
            FROM lendings
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(LendingTotals {
            by_status,
            overdue,
            total_fines: fines_row.try_get("total_fines")?,
            paid_fines: fines_row.try_get("paid_fines")?,
        })
    }
}
