//! Shared circulation enums

use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, Postgres};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// LendingStatus
// ---------------------------------------------------------------------------

/// Derived completion/overdue label of a lending record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LendingStatus {
    Active,
    Overdue,
    PartiallyReturned,
    Returned,
}

impl LendingStatus {
    pub const ALL: [LendingStatus; 4] = [
        LendingStatus::Active,
        LendingStatus::Overdue,
        LendingStatus::PartiallyReturned,
        LendingStatus::Returned,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LendingStatus::Active => "active",
            LendingStatus::Overdue => "overdue",
            LendingStatus::PartiallyReturned => "partially_returned",
            LendingStatus::Returned => "returned",
        }
    }
}

impl std::fmt::Display for LendingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LendingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(LendingStatus::Active),
            "overdue" => Ok(LendingStatus::Overdue),
            "partially_returned" => Ok(LendingStatus::PartiallyReturned),
            "returned" => Ok(LendingStatus::Returned),
            _ => Err(format!("Invalid lending status: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for LendingStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for LendingStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LendingStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

// ---------------------------------------------------------------------------
// ItemCondition
// ---------------------------------------------------------------------------

/// Physical condition of a lent item, recorded on return
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ItemCondition {
    #[default]
    Good,
    Fair,
    Damaged,
    Lost,
}

impl std::fmt::Display for ItemCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ItemCondition::Good => "good",
            ItemCondition::Fair => "fair",
            ItemCondition::Damaged => "damaged",
            ItemCondition::Lost => "lost",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// FineReason
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum FineReason {
    Overdue,
    Damage,
    Loss,
    Other,
}

impl std::fmt::Display for FineReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FineReason::Overdue => "overdue",
            FineReason::Damage => "damage",
            FineReason::Loss => "loss",
            FineReason::Other => "other",
        };
        write!(f, "{}", label)
    }
}

// ---------------------------------------------------------------------------
// ActivityAction
// ---------------------------------------------------------------------------

/// Kind of transition recorded in the activity log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Issued,
    ItemReturned,
    Renewed,
    FineAdded,
    FinePaid,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::Issued => "issued",
            ActivityAction::ItemReturned => "item_returned",
            ActivityAction::Renewed => "renewed",
            ActivityAction::FineAdded => "fine_added",
            ActivityAction::FinePaid => "fine_paid",
        }
    }
}

impl std::fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ActivityAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "issued" => Ok(ActivityAction::Issued),
            "item_returned" => Ok(ActivityAction::ItemReturned),
            "renewed" => Ok(ActivityAction::Renewed),
            "fine_added" => Ok(ActivityAction::FineAdded),
            "fine_paid" => Ok(ActivityAction::FinePaid),
            _ => Err(format!("Invalid activity action: {}", s)),
        }
    }
}

impl sqlx::Type<Postgres> for ActivityAction {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

impl<'r> Decode<'r, Postgres> for ActivityAction {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for ActivityAction {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}
