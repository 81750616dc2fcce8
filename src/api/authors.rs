//! Author directory endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::{Author, AuthorInput};
use crate::error::Result;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub search_field: String,
}

/// Substring search across the author directory
async fn list_authors(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Author>>> {
    Ok(Json(
        state
            .db
            .authors()
            .search(&params.search, &params.search_field)
            .await?,
    ))
}

async fn create_author(
    State(state): State<AppState>,
    Json(body): Json<AuthorInput>,
) -> Result<(StatusCode, Json<Author>)> {
    let author = state.db.authors().create(body).await?;
    Ok((StatusCode::CREATED, Json(author)))
}

async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<AuthorInput>,
) -> Result<Json<Author>> {
    Ok(Json(state.db.authors().update(id, body).await?))
}

async fn delete_author(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    state.db.authors().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/authors", get(list_authors).post(create_author))
        .route("/authors/{id}", axum::routing::put(update_author).delete(delete_author))
}
