//! Lending activity repository

use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgConnection, Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        activity::{ActivityEntry, Interval, NewActivity},
        enums::ActivityAction,
    },
};

#[derive(Clone)]
pub struct ActivityRepository {
    pool: Pool<Postgres>,
}

impl ActivityRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Append an entry as part of the caller's transaction
    pub async fn insert(&self, conn: &mut PgConnection, entry: &NewActivity) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lending_activity (id, tenant_id, lending_id, actor_id, action, details)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.tenant_id)
        .bind(entry.lending_id)
        .bind(entry.actor_id)
        .bind(entry.action)
        .bind(Json(&entry.details))
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Entries of one lending, oldest first
    pub async fn list_for_lending(
        &self,
        tenant_id: Uuid,
        lending_id: Uuid,
    ) -> AppResult<Vec<ActivityEntry>> {
        let entries = sqlx::query_as::<_, ActivityEntry>(
            r#"
            SELECT id, lending_id, actor_id, action, details, created_at
            FROM lending_activity
            WHERE tenant_id = $1 AND lending_id = $2
            ORDER BY created_at, id
            "#,
        )
        .bind(tenant_id)
        .bind(lending_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Entry counts per period in `[start, end]`
    pub async fn count_by_period(
        &self,
        tenant_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: Interval,
    ) -> AppResult<Vec<(String, i64)>> {
        let date_trunc = format!("DATE_TRUNC('{}', created_at)", interval.date_trunc_unit());
        let query = format!(
            r#"
            SELECT TO_CHAR({}, '{}') AS period, COUNT(*) AS count
            FROM lending_activity
            WHERE tenant_id = $1 AND created_at >= $2 AND created_at <= $3
            GROUP BY {}
            ORDER BY {}
            "#,
            date_trunc,
            interval.period_format(),
            date_trunc,
            date_trunc
        );

        let rows = sqlx::query(&query)
            .bind(tenant_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        let mut series = Vec::with_capacity(rows.len());
        for row in rows {
            series.push((row.try_get("period")?, row.try_get("count")?));
        }
        Ok(series)
    }

    /// Entry counts per action in `[start, end]`
    pub async fn count_by_action(
        &self,
        tenant_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> AppResult<Vec<(ActivityAction, i64)>> {
        let rows = sqlx::query(
            r#"
            SELECT action, COUNT(*) AS count
            FROM lending_activity
            WHERE tenant_id = $1 AND created_at >= $2 AND created_at <= $3
            GROUP BY action
            ORDER BY action
            "#,
        )
        .bind(tenant_id)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = Vec::with_capacity(rows.len());
        for row in rows {
            counts.push((row.try_get("action")?, row.try_get("count")?));
        }
        Ok(counts)
    }
}
