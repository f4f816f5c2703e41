//! Lending record model and its transitions
//!
//! A [`LendingRecord`] is one circulation transaction: one or more books issued
//! to one borrower at one site. Every mutation goes through a method on the
//! record so the quantity and fine invariants hold no matter which endpoint
//! drove it. The status label is never stored as authoritative state; it is
//! derived from item quantities and the due date at read time.

use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use super::enums::{FineReason, ItemCondition, LendingStatus};
use crate::error::{AppError, AppResult, BusinessRule};

/// Largest quantity of one book on a single item line
pub const MAX_ITEM_QUANTITY: i32 = 10_000;

/// Largest number of item lines on one lending record
pub const MAX_ITEM_LINES: usize = 100;

/// Largest value a `NUMERIC(12, 2)` fine column holds
pub fn max_fine_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

fn fine_amount_problem(amount: &Decimal) -> Option<&'static str> {
    if *amount <= Decimal::ZERO {
        Some("Fine amount must be greater than zero")
    } else if amount.scale() > 2 {
        Some("Fine amount must have at most 2 decimal places")
    } else if *amount > max_fine_amount() {
        Some("Fine amount is too large")
    } else {
        None
    }
}

/// Request-level check for fine amounts
pub fn validate_fine_amount(amount: &Decimal) -> Result<(), ValidationError> {
    match fine_amount_problem(amount) {
        Some(message) => {
            let mut error = ValidationError::new("fine_amount");
            error.message = Some(message.into());
            Err(error)
        }
        None => Ok(()),
    }
}

/// One lent book line within a lending record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LendingItem {
    pub book_id: Uuid,
    pub quantity_issued: i32,
    pub quantity_returned: i32,
    /// Set once the whole issued quantity is back
    pub date_returned: Option<DateTime<Utc>>,
    pub condition: ItemCondition,
    pub return_notes: Option<String>,
}

impl LendingItem {
    pub fn remaining(&self) -> i32 {
        self.quantity_issued - self.quantity_returned
    }

    pub fn is_fully_returned(&self) -> bool {
        self.quantity_returned >= self.quantity_issued
    }
}

/// Renewal history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Renewal {
    pub previous_due_date: DateTime<Utc>,
    pub new_due_date: DateTime<Utc>,
    pub renewed_at: DateTime<Utc>,
    pub renewed_by: Uuid,
}

/// Monetary penalty attached to a lending record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Fine {
    pub reason: FineReason,
    #[schema(value_type = String, example = "2.50")]
    pub amount: Decimal,
    pub notes: Option<String>,
    pub is_paid: bool,
    pub paid_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Lending record as persisted
///
/// Timestamps are kept at microsecond precision so an in-memory record
/// serializes the same as one read back from the database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LendingRecord {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub borrower_id: Uuid,
    pub site_id: Uuid,
    pub issued_by: Uuid,
    pub issued_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub items: Vec<LendingItem>,
    pub renewal_count: i32,
    pub renewal_history: Vec<Renewal>,
    pub fines: Vec<Fine>,
    pub total_fines: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database row for `lendings`
#[derive(Debug, FromRow)]
pub struct LendingRow {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub borrower_id: Uuid,
    pub site_id: Uuid,
    pub issued_by: Uuid,
    pub issued_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub items: Json<Vec<LendingItem>>,
    pub renewal_count: i32,
    pub renewal_history: Json<Vec<Renewal>>,
    pub fines: Json<Vec<Fine>>,
    pub total_fines: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LendingRow> for LendingRecord {
    fn from(row: LendingRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            borrower_id: row.borrower_id,
            site_id: row.site_id,
            issued_by: row.issued_by,
            issued_date: row.issued_date,
            due_date: row.due_date,
            items: row.items.0,
            renewal_count: row.renewal_count,
            renewal_history: row.renewal_history.0,
            fines: row.fines.0,
            total_fines: row.total_fines,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Issue request line
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct NewLendingItem {
    pub book_id: Uuid,
    #[validate(range(min = 1, max = 10_000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i32,
}

/// Issue request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct NewLending {
    pub borrower_id: Uuid,
    pub site_id: Uuid,
    pub due_date: DateTime<Utc>,
    #[validate(
        length(min = 1, max = 100, message = "Between 1 and 100 items are required"),
        nested
    )]
    pub items: Vec<NewLendingItem>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Return request for one item line
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ReturnItem {
    /// Position of the item in the record's `items` list
    pub item_index: usize,
    #[validate(range(min = 1, max = 10_000, message = "Quantity must be between 1 and 10000"))]
    pub quantity: i32,
    #[serde(default)]
    pub condition: ItemCondition,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Renewal request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct RenewLending {
    pub new_due_date: DateTime<Utc>,
}

/// Add-fine request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AddFine {
    pub reason: FineReason,
    #[schema(value_type = String, example = "2.50")]
    #[validate(custom(function = "validate_fine_amount"))]
    pub amount: Decimal,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Query parameters for listing lendings
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
pub struct LendingQuery {
    pub borrower_id: Option<Uuid>,
    pub site_id: Option<Uuid>,
    /// Derived status to filter on
    pub status: Option<LendingStatus>,
    /// Only records past their due date and not fully returned
    pub overdue: Option<bool>,
    /// Page number (1-based)
    pub page: Option<i64>,
    /// Items per page
    pub per_page: Option<i64>,
}

impl LendingRecord {
    /// Build a fresh record for an issue request.
    pub fn issue(
        tenant_id: Uuid,
        issued_by: Uuid,
        data: &NewLending,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let due_date = data.due_date.trunc_subsecs(6);
        if due_date <= now {
            return Err(AppError::Validation(
                "Due date must be after the issue date".to_string(),
            ));
        }
        if data.items.is_empty() || data.items.len() > MAX_ITEM_LINES {
            return Err(AppError::Validation(format!(
                "Between 1 and {} items are required",
                MAX_ITEM_LINES
            )));
        }
        if let Some(line) = data
            .items
            .iter()
            .find(|line| line.quantity <= 0 || line.quantity > MAX_ITEM_QUANTITY)
        {
            return Err(AppError::Validation(format!(
                "Quantity for book {} must be between 1 and {}",
                line.book_id, MAX_ITEM_QUANTITY
            )));
        }
        // Bounded above, so the record-level totals always fit in i32
        data.items
            .iter()
            .try_fold(0i32, |total, line| total.checked_add(line.quantity))
            .ok_or_else(|| AppError::Validation("Total quantity is too large".to_string()))?;

        let items = data
            .items
            .iter()
            .map(|line| LendingItem {
                book_id: line.book_id,
                quantity_issued: line.quantity,
                quantity_returned: 0,
                date_returned: None,
                condition: ItemCondition::Good,
                return_notes: None,
            })
            .collect();

        Ok(Self {
            id: Uuid::new_v4(),
            tenant_id,
            borrower_id: data.borrower_id,
            site_id: data.site_id,
            issued_by,
            issued_date: now,
            due_date,
            items,
            renewal_count: 0,
            renewal_history: Vec::new(),
            fines: Vec::new(),
            total_fines: Decimal::ZERO,
            notes: data.notes.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn quantity_issued_total(&self) -> i32 {
        self.items.iter().map(|i| i.quantity_issued).sum()
    }

    pub fn quantity_returned_total(&self) -> i32 {
        self.items.iter().map(|i| i.quantity_returned).sum()
    }

    pub fn is_fully_returned(&self) -> bool {
        self.items.iter().all(LendingItem::is_fully_returned)
    }

    /// Status label as of `now`
    pub fn status_at(&self, now: DateTime<Utc>) -> LendingStatus {
        if self.is_fully_returned() {
            LendingStatus::Returned
        } else if self.quantity_returned_total() > 0 {
            LendingStatus::PartiallyReturned
        } else if now > self.due_date {
            LendingStatus::Overdue
        } else {
            LendingStatus::Active
        }
    }

    pub fn is_overdue_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_fully_returned() && now > self.due_date
    }

    /// Whole days past the due date, 0 when not overdue
    pub fn days_overdue_at(&self, now: DateTime<Utc>) -> i64 {
        if self.is_overdue_at(now) {
            (now - self.due_date).num_days()
        } else {
            0
        }
    }

    pub fn paid_fines(&self) -> Decimal {
        self.fines.iter().filter(|f| f.is_paid).map(|f| f.amount).sum()
    }

    pub fn outstanding_fines(&self) -> Decimal {
        self.fines.iter().filter(|f| !f.is_paid).map(|f| f.amount).sum()
    }

    /// Return part or all of one item line.
    pub fn return_item(&mut self, data: &ReturnItem, now: DateTime<Utc>) -> AppResult<&LendingItem> {
        if data.quantity <= 0 {
            return Err(AppError::Validation(
                "Quantity must be greater than zero".to_string(),
            ));
        }

        let lending_id = self.id;
        let item = self.items.get_mut(data.item_index).ok_or_else(|| {
            AppError::NotFound(format!(
                "Item {} not found on lending {}",
                data.item_index, lending_id
            ))
        })?;

        let remaining = item.remaining();
        if data.quantity > remaining {
            return Err(BusinessRule::QuantityExceedsRemaining {
                requested: data.quantity,
                remaining,
            }
            .into());
        }

        item.quantity_returned += data.quantity;
        item.condition = data.condition;
        if data.notes.is_some() {
            item.return_notes = data.notes.clone();
        }
        if item.is_fully_returned() {
            item.date_returned = Some(now);
        }

        self.updated_at = now;
        Ok(&self.items[data.item_index])
    }

    /// Move the due date forward and log the renewal.
    pub fn renew(
        &mut self,
        new_due_date: DateTime<Utc>,
        renewed_by: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<&Renewal> {
        if self.is_fully_returned() {
            return Err(BusinessRule::LendingClosed.into());
        }
        let new_due_date = new_due_date.trunc_subsecs(6);
        if new_due_date < self.due_date {
            return Err(AppError::Validation(format!(
                "New due date must not be before the current due date ({})",
                self.due_date.to_rfc3339()
            )));
        }

        self.renewal_history.push(Renewal {
            previous_due_date: self.due_date,
            new_due_date,
            renewed_at: now,
            renewed_by,
        });
        self.renewal_count += 1;
        self.due_date = new_due_date;
        self.updated_at = now;

        Ok(&self.renewal_history[self.renewal_history.len() - 1])
    }

    /// Append an unpaid fine and return its index.
    pub fn add_fine(&mut self, data: &AddFine, now: DateTime<Utc>) -> AppResult<usize> {
        if let Some(problem) = fine_amount_problem(&data.amount) {
            return Err(AppError::Validation(problem.to_string()));
        }
        let limit = max_fine_amount();
        match self.total_fines.checked_add(data.amount) {
            Some(total) if total <= limit => {}
            _ => {
                return Err(BusinessRule::FineTotalExceedsLimit {
                    total: self.total_fines,
                    limit,
                }
                .into())
            }
        }

        self.fines.push(Fine {
            reason: data.reason,
            amount: data.amount,
            notes: data.notes.clone(),
            is_paid: false,
            paid_date: None,
            created_at: now,
        });
        self.recompute_total_fines();
        self.updated_at = now;

        Ok(self.fines.len() - 1)
    }

    pub fn pay_fine(&mut self, index: usize, now: DateTime<Utc>) -> AppResult<&Fine> {
        let lending_id = self.id;
        let fine = self.fines.get_mut(index).ok_or_else(|| {
            AppError::NotFound(format!("Fine {} not found on lending {}", index, lending_id))
        })?;

        if fine.is_paid {
            return Err(BusinessRule::FineAlreadyPaid(index).into());
        }

        fine.is_paid = true;
        fine.paid_date = Some(now);
        self.updated_at = now;

        Ok(&self.fines[index])
    }

    fn recompute_total_fines(&mut self) {
        self.total_fines = self.fines.iter().map(|f| f.amount).sum();
    }
}

/// Lending record with its derived fields, as returned by the API
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LendingDetails {
    pub id: Uuid,
    pub borrower_id: Uuid,
    pub site_id: Uuid,
    pub issued_by: Uuid,
    pub issued_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub status: LendingStatus,
    pub is_overdue: bool,
    pub days_overdue: i64,
    pub items: Vec<LendingItem>,
    pub renewal_count: i32,
    pub renewal_history: Vec<Renewal>,
    pub fines: Vec<Fine>,
    #[schema(value_type = String, example = "5.00")]
    pub total_fines: Decimal,
    #[schema(value_type = String, example = "2.50")]
    pub outstanding_fines: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LendingDetails {
    pub fn at(record: LendingRecord, now: DateTime<Utc>) -> Self {
        Self {
            status: record.status_at(now),
            is_overdue: record.is_overdue_at(now),
            days_overdue: record.days_overdue_at(now),
            outstanding_fines: record.outstanding_fines(),
            id: record.id,
            borrower_id: record.borrower_id,
            site_id: record.site_id,
            issued_by: record.issued_by,
            issued_date: record.issued_date,
            due_date: record.due_date,
            items: record.items,
            renewal_count: record.renewal_count,
            renewal_history: record.renewal_history,
            fines: record.fines,
            total_fines: record.total_fines,
            notes: record.notes,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
