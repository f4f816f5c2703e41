//! Statistics endpoints

use axum::{
    extract::State,
    Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::activity::{ActivityStatsQuery, Interval},
    AppState,
};

use super::{AppQuery, AuthenticatedUser};

#[derive(Serialize, ToSchema)]
pub struct StatEntry {
    /// Label
    pub label: String,
    /// Value
    pub value: i64,
}

/// Lending summary for the caller's school
#[derive(Serialize, ToSchema)]
pub struct LendingStatsResponse {
    /// Total number of lending records
    pub total: i64,
    /// Records per derived status
    pub by_status: Vec<StatEntry>,
    /// Records past due and not fully returned (any status)
    pub overdue: i64,
    #[schema(value_type = String)]
    pub total_fines: Decimal,
    #[schema(value_type = String)]
    pub paid_fines: Decimal,
    #[schema(value_type = String)]
    pub outstanding_fines: Decimal,
}

/// Time series entry for activity statistics
#[derive(Serialize, ToSchema)]
pub struct TimeSeriesEntry {
    /// Period label (e.g., "2024-01-15" for day, "2024-W03" for week)
    pub period: String,
    /// Number of activity entries in this period
    pub count: i64,
}

/// Activity statistics response
#[derive(Serialize, ToSchema)]
pub struct ActivityStatsResponse {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub interval: Interval,
    /// Total entries in the period
    pub total: i64,
    /// Entries per action
    pub by_action: Vec<StatEntry>,
    /// Entries grouped by interval
    pub time_series: Vec<TimeSeriesEntry>,
}

/// Lending summary statistics
#[utoipa::path(
    get,
    path = "/stats/lendings",
    tag = "stats",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Lending statistics", body = LendingStatsResponse)
    )
)]
pub async fn get_lending_stats(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<LendingStatsResponse>> {
    claims.require_read_stats()?;
    let stats = state.services.stats.lending_stats(&claims).await?;
    Ok(Json(stats))
}

/// Activity log statistics with time series
#[utoipa::path(
    get,
    path = "/stats/activity",
    tag = "stats",
    security(("bearer_auth" = [])),
    params(ActivityStatsQuery),
    responses(
        (status = 200, description = "Activity statistics", body = ActivityStatsResponse),
        (status = 400, description = "Invalid date range")
    )
)]
pub async fn get_activity_stats(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppQuery(query): AppQuery<ActivityStatsQuery>,
) -> AppResult<Json<ActivityStatsResponse>> {
    claims.require_read_stats()?;
    let stats = state.services.stats.activity_stats(&claims, &query).await?;
    Ok(Json(stats))
}
