//! Reader (person) directory endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::{Person, PersonInput};
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

/// Substring search across the reader directory
async fn list_persons(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Person>>> {
    Ok(Json(
        state
            .db
            .persons()
            .search(&params.search, &params.search_field)
            .await?,
    ))
}

async fn get_person(State(state): State<AppState>, Path(id): Path<i32>) -> Result<Json<Person>> {
    Ok(Json(state.db.persons().find_one(id).await?))
}

async fn create_person(
    State(state): State<AppState>,
    Json(body): Json<PersonInput>,
) -> Result<(StatusCode, Json<Person>)> {
    let person = state.db.persons().create(body).await?;
    Ok((StatusCode::CREATED, Json(person)))
}

async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<PersonInput>,
) -> Result<Json<Person>> {
    Ok(Json(state.db.persons().update(id, body).await?))
}

async fn delete_person(State(state): State<AppState>, Path(id): Path<i32>) -> Result<StatusCode> {
    state.db.persons().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/persons", get(list_persons).post(create_person))
        .route(
            "/persons/{id}",
            get(get_person).put(update_person).delete(delete_person),
        )
}
