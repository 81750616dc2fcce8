//! Book copy endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::query::{Page, DEFAULT_LIMIT};
use crate::db::{BookCopy, CreateCopy, UpdateCopy};
use crate::error::Result;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListCopiesParams {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub search_column: String,
    #[serde(default)]
    pub only_available: bool,
    #[serde(default)]
    pub only_issued: bool,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub sort: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByBookParams {
    #[serde(default)]
    pub only_free: bool,
}

#[derive(Debug, Deserialize)]
pub struct ByInventoryParams {
    pub number: String,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Paginated copy listing with search, sort, and status filters
async fn list_copies(
    State(state): State<AppState>,
    Query(params): Query<ListCopiesParams>,
) -> Result<Json<Page<BookCopy>>> {
    let page = state
        .db
        .copies()
        .find_paginated(
            &params.search,
            &params.search_column,
            params.only_available,
            params.only_issued,
            params.page,
            params.limit,
            &params.sort,
        )
        .await?;
    Ok(Json(page))
}

async fn list_all_copies(State(state): State<AppState>) -> Result<Json<Vec<BookCopy>>> {
    Ok(Json(state.db.copies().find_all().await?))
}

async fn get_copy(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<BookCopy>> {
    Ok(Json(state.db.copies().find_one(id).await?))
}

/// Look a copy up by its unique inventory number
async fn get_by_inventory(
    State(state): State<AppState>,
    Query(params): Query<ByInventoryParams>,
) -> Result<Json<BookCopy>> {
    Ok(Json(state.db.copies().find_by_inventory(&params.number).await?))
}

/// All copies of one book, optionally only those free to lend
async fn get_by_book(
    State(state): State<AppState>,
    Path(book_id): Path<i32>,
    Query(params): Query<ByBookParams>,
) -> Result<Json<Vec<BookCopy>>> {
    Ok(Json(
        state.db.copies().find_by_book(book_id, params.only_free).await?,
    ))
}

async fn create_copy(
    State(state): State<AppState>,
    Json(body): Json<CreateCopy>,
) -> Result<(StatusCode, Json<BookCopy>)> {
    let copy = state.db.copies().create(body).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

async fn update_copy(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateCopy>,
) -> Result<Json<BookCopy>> {
    Ok(Json(state.db.copies().update(id, body).await?))
}

async fn delete_copy(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    state.db.copies().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/book-copies/paginated", get(list_copies))
        .route("/book-copies", get(list_all_copies).post(create_copy))
        .route("/book-copies/find/by-inventory", get(get_by_inventory))
        .route("/book-copies/by-book/{bookId}", get(get_by_book))
        .route(
            "/book-copies/{id}",
            get(get_copy).put(update_copy).delete(delete_copy),
        )
}
