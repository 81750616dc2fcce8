//! Borrow record (loan) endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde::Deserialize;

use crate::db::query::{Page, DEFAULT_LIMIT};
use crate::db::{BorrowRecord, IssueCopy};
use crate::error::Result;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecordsParams {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub search_column: String,
    #[serde(default)]
    pub only_debts: bool,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub sort: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByPersonParams {
    #[serde(default)]
    pub only_active: bool,
    #[serde(default)]
    pub only_debts: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnRequest {
    pub accepted_by_user_id: i32,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Issue a copy to a reader
async fn issue_copy(
    State(state): State<AppState>,
    Json(body): Json<IssueCopy>,
) -> Result<(StatusCode, Json<BorrowRecord>)> {
    let record = state.db.borrow_records().issue(body).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// Accept a copy back, closing the record
async fn return_copy(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<ReturnRequest>,
) -> Result<Json<BorrowRecord>> {
    Ok(Json(
        state
            .db
            .borrow_records()
            .return_record(id, body.accepted_by_user_id)
            .await?,
    ))
}

async fn list_records(State(state): State<AppState>) -> Result<Json<Vec<BorrowRecord>>> {
    Ok(Json(state.db.borrow_records().find_all().await?))
}

/// Paginated ledger listing with search, sort, and overdue filter
async fn list_paginated(
    State(state): State<AppState>,
    Query(params): Query<ListRecordsParams>,
) -> Result<Json<Page<BorrowRecord>>> {
    let page = state
        .db
        .borrow_records()
        .find_paginated(
            &params.search,
            &params.search_column,
            params.only_debts,
            params.page,
            params.limit,
            &params.sort,
        )
        .await?;
    Ok(Json(page))
}

/// One reader's loan history, optionally narrowed to open or overdue loans
async fn list_by_person(
    State(state): State<AppState>,
    Path(person_id): Path<i32>,
    Query(params): Query<ByPersonParams>,
) -> Result<Json<Vec<BorrowRecord>>> {
    Ok(Json(
        state
            .db
            .borrow_records()
            .find_by_person(person_id, params.only_active, params.only_debts)
            .await?,
    ))
}

async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<BorrowRecord>> {
    Ok(Json(state.db.borrow_records().find_one(id).await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/borrow-records", get(list_records).post(issue_copy))
        .route("/borrow-records/paginated", get(list_paginated))
        .route("/borrow-records/person/{personId}", get(list_by_person))
        .route("/borrow-records/{id}", get(get_record))
        .route("/borrow-records/{id}/return", patch(return_copy))
}
