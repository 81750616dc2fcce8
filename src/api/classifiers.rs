//! Classifier directory endpoints (BBK, UDC, GRNTI, publishers)
//!
//! The three code directories share one handler shape, so their routers are
//! stamped out by a macro. Publishers differ only in their input type.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::{CodeInput, Publisher, PublisherInput};
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

macro_rules! classifier_router {
    ($router_fn:ident, $entity:ty, $repo:ident, $path:literal) => {
        pub fn $router_fn() -> Router<AppState> {
            async fn list(
                State(state): State<AppState>,
                Query(params): Query<SearchParams>,
            ) -> Result<Json<Vec<$entity>>> {
                Ok(Json(
                    state
                        .db
                        .$repo()
                        .search(&params.search, &params.search_field)
                        .await?,
                ))
            }

            async fn create(
                State(state): State<AppState>,
                Json(body): Json<CodeInput>,
            ) -> Result<(StatusCode, Json<$entity>)> {
                let row = state.db.$repo().create(body).await?;
                Ok((StatusCode::CREATED, Json(row)))
            }

            async fn update(
                State(state): State<AppState>,
                Path(id): Path<i32>,
                Json(body): Json<CodeInput>,
            ) -> Result<Json<$entity>> {
                Ok(Json(state.db.$repo().update(id, body).await?))
            }

            async fn delete(
                State(state): State<AppState>,
                Path(id): Path<i32>,
            ) -> Result<StatusCode> {
                state.db.$repo().delete(id).await?;
                Ok(StatusCode::NO_CONTENT)
            }

            Router::new()
                .route($path, get(list).post(create))
                .route(
                    concat!($path, "/{id}"),
                    axum::routing::put(update).delete(delete),
                )
        }
    };
}

classifier_router!(bbk_router, crate::db::Bbk, bbks, "/bbk");
classifier_router!(udc_router, crate::db::Udc, udcs, "/udc");
classifier_router!(grnti_router, crate::db::Grnti, grntis, "/grnti");

async fn list_publishers(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Publisher>>> {
    Ok(Json(state.db.publishers().search(&params.search).await?))
}

async fn create_publisher(
    State(state): State<AppState>,
    Json(body): Json<PublisherInput>,
) -> Result<(StatusCode, Json<Publisher>)> {
    let publisher = state.db.publishers().create(body).await?;
    Ok((StatusCode::CREATED, Json(publisher)))
}

async fn update_publisher(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(body): Json<PublisherInput>,
) -> Result<Json<Publisher>> {
    Ok(Json(state.db.publishers().update(id, body).await?))
}

async fn delete_publisher(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    state.db.publishers().delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn publishers_router() -> Router<AppState> {
    Router::new()
        .route("/publishers", get(list_publishers).post(create_publisher))
        .route(
            "/publishers/{id}",
            axum::routing::put(update_publisher).delete(delete_publisher),
        )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(bbk_router())
        .merge(udc_router())
        .merge(grnti_router())
        .merge(publishers_router())
}
