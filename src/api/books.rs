//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::query::{Page, DEFAULT_LIMIT};
use crate::db::{Book, CreateBook, UpdateBook};
use crate::error::Result;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListBooksParams {
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

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// Paginated catalog listing with search, sort, and availability filters
async fn list_books(
    State(state): State<AppState>,
    Query(params): Query<ListBooksParams>,
) -> Result<Json<Page<Book>>> {
    let page = state
        .db
        .books()
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

/// Get a single book with all relations hydrated
async fn get_book(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Book>> {
    Ok(Json(state.db.books().find_one(id).await?))
}

/// Create a book with its relations in one transaction
async fn create_book(
    State(state): State<AppState>,
    Json(body): Json<CreateBook>,
) -> Result<(StatusCode, Json<Book>)> {
    let book = state.db.books().create(body).await?;
    Ok((StatusCode::CREATED, Json(book)))
}

/// Partially update a book; present relation lists replace wholesale
async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<UpdateBook>,
) -> Result<Json<Book>> {
    Ok(Json(state.db.books().update(id, body).await?))
}

async fn delete_book(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    state.db.books().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/books/paginated", get(list_books))
        .route("/books", axum::routing::post(create_book))
        .route(
            "/books/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
}
