//! API route definitions
//!
//! Every resource contributes its own router; they are merged under /api by
//! the application builder.

use axum::Router;

use crate::AppState;

pub mod authors;
pub mod books;
pub mod borrow_records;
pub mod classifiers;
pub mod copies;
pub mod health;
pub mod persons;
pub mod reports;

/// Merge every resource router into the /api surface.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(books::router())
        .merge(copies::router())
        .merge(borrow_records::router())
        .merge(authors::router())
        .merge(classifiers::router())
        .merge(persons::router())
        .merge(reports::router())
}
