//! Circulation statistics service

use chrono::{Duration, Utc};

use crate::{
    api::stats::{ActivityStatsResponse, LendingStatsResponse, StatEntry, TimeSeriesEntry},
    error::{AppError, AppResult},
    models::{activity::ActivityStatsQuery, claims::UserClaims, enums::LendingStatus},
    repository::Repository,
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Status counts and fine totals for the caller's tenant
    pub async fn lending_stats(&self, caller: &UserClaims) -> AppResult<LendingStatsResponse> {
        let totals = self.repository.lendings.totals(caller.tenant_id).await?;

        // Report every status, including those with no records
        let by_status: Vec<StatEntry> = LendingStatus::ALL
            .iter()
            .map(|status| StatEntry {
                label: status.to_string(),
                value: totals
                    .by_status
                    .iter()
                    .find(|(s, _)| s == status)
                    .map(|(_, count)| *count)
                    .unwrap_or(0),
            })
            .collect();

        Ok(LendingStatsResponse {
            total: by_status.iter().map(|e| e.value).sum(),
            by_status,
            overdue: totals.overdue,
            total_fines: totals.total_fines,
            paid_fines: totals.paid_fines,
            outstanding_fines: totals.total_fines - totals.paid_fines,
        })
    }

    /// Activity time series, last 30 days by day unless specified
    pub async fn activity_stats(
        &self,
        caller: &UserClaims,
        query: &ActivityStatsQuery,
    ) -> AppResult<ActivityStatsResponse> {
        let end = query.end_date.unwrap_or_else(Utc::now);
        let start = query.start_date.unwrap_or_else(|| end - Duration::days(30));
        if start > end {
            return Err(AppError::Validation(
                "start_date must not be after end_date".to_string(),
            ));
        }
        let interval = query.interval.unwrap_or_default();

        let time_series: Vec<TimeSeriesEntry> = self
            .repository
            .activity
            .count_by_period(caller.tenant_id, start, end, interval)
            .await?
            .into_iter()
            .map(|(period, count)| TimeSeriesEntry { period, count })
            .collect();

        let by_action: Vec<StatEntry> = self
            .repository
            .activity
            .count_by_action(caller.tenant_id, start, end)
            .await?
            .into_iter()
            .map(|(action, count)| StatEntry {
                label: action.to_string(),
                value: count,
            })
            .collect();

        Ok(ActivityStatsResponse {
            start_date: start,
            end_date: end,
            interval,
            total: by_action.iter().map(|e| e.value).sum(),
            by_action,
            time_series,
        })
    }
}
