//! Lending activity log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use super::enums::ActivityAction;

/// One audited transition
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct ActivityEntry {
    pub id: Uuid,
    pub lending_id: Uuid,
    /// Caller who performed the transition
    pub actor_id: Uuid,
    pub action: ActivityAction,
    /// Action-specific payload (item index, quantities, amounts...)
    #[schema(value_type = Object)]
    pub details: Json<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

/// Activity entry to append
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub tenant_id: Uuid,
    pub lending_id: Uuid,
    pub actor_id: Uuid,
    pub action: ActivityAction,
    pub details: serde_json::Value,
}

/// Time interval for grouping statistics
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Interval {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

impl Interval {
    pub fn date_trunc_unit(&self) -> &'static str {
        match self {
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
            Interval::Year => "year",
        }
    }

    pub fn period_format(&self) -> &'static str {
        match self {
            Interval::Day => "YYYY-MM-DD",
            Interval::Week => "IYYY-\"W\"IW",
            Interval::Month => "YYYY-MM",
            Interval::Year => "YYYY",
        }
    }
}

/// Activity statistics query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct ActivityStatsQuery {
    /// Start date (ISO 8601), defaults to 30 days ago
    pub start_date: Option<DateTime<Utc>>,
    /// End date (ISO 8601), defaults to now
    pub end_date: Option<DateTime<Utc>>,
    /// Grouping interval (day, week, month, year)
    pub interval: Option<Interval>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_parses_from_query_value() {
        let interval: Interval = serde_json::from_str("\"month\"").unwrap();
        assert_eq!(interval.date_trunc_unit(), "month");
        assert_eq!(interval.period_format(), "YYYY-MM");
        assert_eq!(Interval::default().date_trunc_unit(), "day");
    }
}
