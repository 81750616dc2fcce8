//! Reporting endpoints

use axum::{extract::State, routing::get, Json, Router};

use crate::db::{BorrowRecord, NoCopiesReport, UdcProvision};
use crate::error::Result;
use crate::AppState;

/// Loans not yet accepted back by any staff user, oldest first
async fn unreturned(State(state): State<AppState>) -> Result<Json<Vec<BorrowRecord>>> {
    Ok(Json(state.db.borrow_records().unreturned().await?))
}

/// Books with no copies left to lend and why
async fn no_copies(State(state): State<AppState>) -> Result<Json<Vec<NoCopiesReport>>> {
    Ok(Json(state.db.reports().no_copies().await?))
}

/// Stock provision per UDC classifier
async fn udc_provision(State(state): State<AppState>) -> Result<Json<Vec<UdcProvision>>> {
    Ok(Json(state.db.reports().udc_provision().await?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/reports/unreturned", get(unreturned))
        .route("/reports/no-copies", get(no_copies))
        .route("/reports/udc-provision", get(udc_provision))
}
