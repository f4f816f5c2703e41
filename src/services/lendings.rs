//! Lending lifecycle service
//!
//! Each transition runs in one transaction: lock the row, apply the domain
//! method on [`LendingRecord`], write the record back, append the activity
//! entry, commit. Concurrent returns against the same record serialize on the
//! row lock, so the remaining-quantity check always sees committed state.

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        activity::{ActivityEntry, NewActivity},
        claims::UserClaims,
        enums::ActivityAction,
        lending::{AddFine, LendingDetails, LendingQuery, LendingRecord, NewLending, RenewLending, ReturnItem},
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct LendingsService {
    repository: Repository,
}

impl LendingsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Issue books to a borrower
    pub async fn issue(&self, caller: &UserClaims, data: &NewLending) -> AppResult<LendingDetails> {
        let now = now();
        let record = LendingRecord::issue(caller.tenant_id, caller.user_id, data, now)?;

        let mut tx = self.repository.pool.begin().await?;
        self.repository.lendings.insert(&mut tx, &record).await?;
        self.repository
            .activity
            .insert(
                &mut tx,
                &activity_entry(caller, record.id, ActivityAction::Issued, json!({
                    "borrower_id": record.borrower_id,
                    "site_id": record.site_id,
                    "due_date": record.due_date,
                    "quantity": record.quantity_issued_total(),
                })),
            )
            .await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %caller.tenant_id,
            lending_id = %record.id,
            actor_id = %caller.user_id,
            items = record.items.len(),
            "Lending issued"
        );

        Ok(LendingDetails::at(record, now))
    }

    pub async fn get(&self, caller: &UserClaims, id: Uuid) -> AppResult<LendingDetails> {
        let record = self.repository.lendings.get_by_id(caller.tenant_id, id).await?;
        Ok(LendingDetails::at(record, now()))
    }

    /// List lendings; `per_page` is already clamped by the caller
    pub async fn list(
        &self,
        caller: &UserClaims,
        query: &LendingQuery,
        per_page: i64,
    ) -> AppResult<(Vec<LendingDetails>, i64)> {
        let (records, total) = self
            .repository
            .lendings
            .list(caller.tenant_id, query, per_page)
            .await?;
        let now = now();
        Ok((records.into_iter().map(|r| LendingDetails::at(r, now)).collect(), total))
    }

    pub async fn list_by_borrower(
        &self,
        caller: &UserClaims,
        borrower_id: Uuid,
    ) -> AppResult<Vec<LendingDetails>> {
        let records = self
            .repository
            .lendings
            .list_by_borrower(caller.tenant_id, borrower_id)
            .await?;
        let now = now();
        Ok(records.into_iter().map(|r| LendingDetails::at(r, now)).collect())
    }

    /// Return some or all of one item line
    pub async fn return_item(
        &self,
        caller: &UserClaims,
        id: Uuid,
        data: &ReturnItem,
    ) -> AppResult<LendingDetails> {
        let now = now();
        let mut tx = self.repository.pool.begin().await?;
        let mut record = self.repository.lendings.lock(&mut tx, caller.tenant_id, id).await?;

        let item = record.return_item(data, now)?;
        let details = json!({
            "item_index": data.item_index,
            "book_id": item.book_id,
            "quantity": data.quantity,
            "quantity_returned": item.quantity_returned,
            "condition": item.condition,
        });

        self.repository.lendings.save(&mut tx, &record).await?;
        self.repository
            .activity
            .insert(&mut tx, &activity_entry(caller, id, ActivityAction::ItemReturned, details))
            .await?;
        tx.commit().await?;

        let status = record.status_at(now);
        tracing::info!(
            tenant_id = %caller.tenant_id,
            lending_id = %id,
            actor_id = %caller.user_id,
            item_index = data.item_index,
            quantity = data.quantity,
            condition = %data.condition,
            %status,
            "Lending item returned"
        );

        Ok(LendingDetails::at(record, now))
    }

    pub async fn renew(
        &self,
        caller: &UserClaims,
        id: Uuid,
        data: &RenewLending,
    ) -> AppResult<LendingDetails> {
        let now = now();
        let mut tx = self.repository.pool.begin().await?;
        let mut record = self.repository.lendings.lock(&mut tx, caller.tenant_id, id).await?;

        let renewal = record.renew(data.new_due_date, caller.user_id, now)?;
        let details = json!({
            "previous_due_date": renewal.previous_due_date,
            "new_due_date": renewal.new_due_date,
        });

        self.repository.lendings.save(&mut tx, &record).await?;
        self.repository
            .activity
            .insert(&mut tx, &activity_entry(caller, id, ActivityAction::Renewed, details))
            .await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %caller.tenant_id,
            lending_id = %id,
            actor_id = %caller.user_id,
            renewal_count = record.renewal_count,
            "Lending renewed"
        );

        Ok(LendingDetails::at(record, now))
    }

    pub async fn add_fine(
        &self,
        caller: &UserClaims,
        id: Uuid,
        data: &AddFine,
    ) -> AppResult<LendingDetails> {
        let now = now();
        let mut tx = self.repository.pool.begin().await?;
        let mut record = self.repository.lendings.lock(&mut tx, caller.tenant_id, id).await?;

        let index = record.add_fine(data, now)?;
        let details = json!({
            "fine_index": index,
            "reason": data.reason,
            "amount": data.amount,
        });

        self.repository.lendings.save(&mut tx, &record).await?;
        self.repository
            .activity
            .insert(&mut tx, &activity_entry(caller, id, ActivityAction::FineAdded, details))
            .await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %caller.tenant_id,
            lending_id = %id,
            actor_id = %caller.user_id,
            reason = %data.reason,
            amount = %data.amount,
            total_fines = %record.total_fines,
            "Fine added"
        );

        Ok(LendingDetails::at(record, now))
    }

    pub async fn pay_fine(
        &self,
        caller: &UserClaims,
        id: Uuid,
        index: usize,
    ) -> AppResult<LendingDetails> {
        let now = now();
        let mut tx = self.repository.pool.begin().await?;
        let mut record = self.repository.lendings.lock(&mut tx, caller.tenant_id, id).await?;

        let fine = record.pay_fine(index, now)?;
        let details = json!({
            "fine_index": index,
            "amount": fine.amount,
        });

        self.repository.lendings.save(&mut tx, &record).await?;
        self.repository
            .activity
            .insert(&mut tx, &activity_entry(caller, id, ActivityAction::FinePaid, details))
            .await?;
        tx.commit().await?;

        tracing::info!(
            tenant_id = %caller.tenant_id,
            lending_id = %id,
            actor_id = %caller.user_id,
            fine_index = index,
            "Fine paid"
        );

        Ok(LendingDetails::at(record, now))
    }

    /// Activity entries of one lending
    pub async fn activity(&self, caller: &UserClaims, id: Uuid) -> AppResult<Vec<ActivityEntry>> {
        // 404 for records outside the caller's tenant
        self.repository.lendings.get_by_id(caller.tenant_id, id).await?;
        self.repository.activity.list_for_lending(caller.tenant_id, id).await
    }
}

fn activity_entry(
    caller: &UserClaims,
    lending_id: Uuid,
    action: ActivityAction,
    details: serde_json::Value,
) -> NewActivity {
    NewActivity {
        tenant_id: caller.tenant_id,
        lending_id,
        actor_id: caller.user_id,
        action,
        details,
    }
}

/// Current time at the precision Postgres stores
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
