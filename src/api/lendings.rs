//! Lending endpoints

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppResult,
    models::{
        activity::ActivityEntry,
        lending::{AddFine, LendingDetails, LendingQuery, NewLending, RenewLending, ReturnItem},
    },
    AppState,
};

use super::{AppJson, AppPath, AppQuery, AuthenticatedUser};

/// Paginated lendings response
#[derive(Serialize, ToSchema)]
pub struct LendingsListResponse {
    pub lendings: Vec<LendingDetails>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
}

/// List lendings with filters and pagination
#[utoipa::path(
    get,
    path = "/lendings",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(LendingQuery),
    responses(
        (status = 200, description = "Lendings list", body = LendingsListResponse)
    )
)]
pub async fn list_lendings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppQuery(query): AppQuery<LendingQuery>,
) -> AppResult<Json<LendingsListResponse>> {
    claims.require_read_lendings()?;

    let per_page = state.config.page_size(query.per_page);
    let (lendings, total) = state.services.lendings.list(&claims, &query, per_page).await?;

    Ok(Json(LendingsListResponse {
        lendings,
        total,
        page: query.page.unwrap_or(1).max(1),
        per_page,
    }))
}

/// Get lending by ID
#[utoipa::path(
    get,
    path = "/lendings/{id}",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Lending ID")),
    responses(
        (status = 200, description = "Lending details", body = LendingDetails),
        (status = 404, description = "Lending not found")
    )
)]
pub async fn get_lending(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<LendingDetails>> {
    claims.require_read_lendings()?;
    let lending = state.services.lendings.get(&claims, id).await?;
    Ok(Json(lending))
}

/// Issue books to a borrower
#[utoipa::path(
    post,
    path = "/lendings",
    tag = "lendings",
    security(("bearer_auth" = [])),
    request_body = NewLending,
    responses(
        (status = 201, description = "Lending created", body = LendingDetails),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn create_lending(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppJson(request): AppJson<NewLending>,
) -> AppResult<(StatusCode, Json<LendingDetails>)> {
    claims.require_write_lendings()?;
    request.validate()?;

    let lending = state.services.lendings.issue(&claims, &request).await?;
    Ok((StatusCode::CREATED, Json(lending)))
}

/// Return some or all of one item line
#[utoipa::path(
    post,
    path = "/lendings/{id}/return",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Lending ID")),
    request_body = ReturnItem,
    responses(
        (status = 200, description = "Item returned", body = LendingDetails),
        (status = 404, description = "Lending or item not found"),
        (status = 422, description = "Quantity exceeds remaining")
    )
)]
pub async fn return_item(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<ReturnItem>,
) -> AppResult<Json<LendingDetails>> {
    claims.require_write_lendings()?;
    request.validate()?;

    let lending = state.services.lendings.return_item(&claims, id, &request).await?;
    Ok(Json(lending))
}

/// Renew a lending
#[utoipa::path(
    post,
    path = "/lendings/{id}/renew",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Lending ID")),
    request_body = RenewLending,
    responses(
        (status = 200, description = "Lending renewed", body = LendingDetails),
        (status = 400, description = "New due date before current due date"),
        (status = 404, description = "Lending not found"),
        (status = 422, description = "Lending already returned")
    )
)]
pub async fn renew_lending(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<RenewLending>,
) -> AppResult<Json<LendingDetails>> {
    claims.require_write_lendings()?;
    request.validate()?;

    let lending = state.services.lendings.renew(&claims, id, &request).await?;
    Ok(Json(lending))
}

/// Add a fine to a lending
#[utoipa::path(
    post,
    path = "/lendings/{id}/fines",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Lending ID")),
    request_body = AddFine,
    responses(
        (status = 201, description = "Fine added", body = LendingDetails),
        (status = 400, description = "Invalid amount"),
        (status = 404, description = "Lending not found")
    )
)]
pub async fn add_fine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<AddFine>,
) -> AppResult<(StatusCode, Json<LendingDetails>)> {
    claims.require_write_lendings()?;
    request.validate()?;

    let lending = state.services.lendings.add_fine(&claims, id, &request).await?;
    Ok((StatusCode::CREATED, Json(lending)))
}

/// Mark a fine as paid
#[utoipa::path(
    post,
    path = "/lendings/{id}/fines/{index}/pay",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Lending ID"),
        ("index" = usize, Path, description = "Fine position in the lending's fines list")
    ),
    responses(
        (status = 200, description = "Fine paid", body = LendingDetails),
        (status = 404, description = "Lending or fine not found"),
        (status = 422, description = "Fine already paid")
    )
)]
pub async fn pay_fine(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath((id, index)): AppPath<(Uuid, usize)>,
) -> AppResult<Json<LendingDetails>> {
    claims.require_write_lendings()?;
    let lending = state.services.lendings.pay_fine(&claims, id, index).await?;
    Ok(Json(lending))
}

/// Activity log of a lending
#[utoipa::path(
    get,
    path = "/lendings/{id}/activity",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Lending ID")),
    responses(
        (status = 200, description = "Activity entries, oldest first", body = Vec<ActivityEntry>),
        (status = 404, description = "Lending not found")
    )
)]
pub async fn get_lending_activity(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<Vec<ActivityEntry>>> {
    claims.require_read_lendings()?;
    let entries = state.services.lendings.activity(&claims, id).await?;
    Ok(Json(entries))
}

/// Lendings of one borrower
#[utoipa::path(
    get,
    path = "/borrowers/{id}/lendings",
    tag = "lendings",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Borrower ID")),
    responses(
        (status = 200, description = "Borrower's lendings, open ones first", body = Vec<LendingDetails>)
    )
)]
pub async fn get_borrower_lendings(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    AppPath(borrower_id): AppPath<Uuid>,
) -> AppResult<Json<Vec<LendingDetails>>> {
    claims.require_read_lendings()?;
    let lendings = state.services.lendings.list_by_borrower(&claims, borrower_id).await?;
    Ok(Json(lendings))
}
