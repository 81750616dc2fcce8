//! Shared paginated list-query layer
//!
//! Every listing endpoint (books, copies, borrow records) runs the same
//! two-phase pipeline:
//!
//! 1. resolve: one grouped, filtered, sorted query returns the page of root
//!    ids plus the unpaginated total — grouping by the root id keeps join
//!    fan-out from duplicating or dropping rows;
//! 2. hydrate: the repository re-fetches exactly those ids with their display
//!    relations via unordered `ANY($1)` queries and restores the resolved
//!    order with [`order_by_ids`], since an id-membership fetch does not
//!    preserve ordering.

pub mod builder;
pub mod page;
pub mod registry;
pub mod status;

use std::collections::HashMap;

use sqlx::PgPool;

use crate::error::{Error, Result};

pub use builder::ListQuery;
pub use page::{clamp_paging, Page, DEFAULT_LIMIT};
pub use registry::{ColumnDef, ColumnType, ListSpec, BOOK_LIST, BORROW_LIST, COPY_LIST};

/// Availability flags are mutually exclusive; reject the combination before
/// any SQL is built.
pub fn check_exclusive_flags(only_available: bool, only_issued: bool) -> Result<()> {
    if only_available && only_issued {
        return Err(Error::InvalidFilterCombination(
            "onlyAvailable and onlyIssued cannot both be true".to_string(),
        ));
    }
    Ok(())
}

/// Phase one: run the count and page-of-ids queries for a built [`ListQuery`].
/// `page` and `limit` must already be clamped.
pub async fn resolve_page(
    pool: &PgPool,
    query: &ListQuery,
    page: i64,
    limit: i64,
) -> Result<(Vec<i32>, i64)> {
    let pattern = query.search_term().map(|t| format!("%{t}%"));

    let count_sql = query.count_sql();
    let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
    if let Some(ref pattern) = pattern {
        count = count.bind(pattern);
    }
    let total = count.fetch_one(pool).await?;

    let page_sql = query.page_sql();
    let mut ids = sqlx::query_scalar::<_, i32>(&page_sql);
    if let Some(ref pattern) = pattern {
        ids = ids.bind(pattern);
    }
    let ids = ids
        .bind(limit)
        .bind((page - 1) * limit)
        .fetch_all(pool)
        .await?;

    Ok((ids, total))
}

/// Phase two ordering: re-sequence hydrated entities into the id order the
/// resolution query produced. Ids the hydration did not return are skipped.
pub fn order_by_ids<T>(items: Vec<T>, ids: &[i32], id_of: impl Fn(&T) -> i32) -> Vec<T> {
    let mut by_id: HashMap<i32, T> = items.into_iter().map(|item| (id_of(&item), item)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn exclusive_flags_rejected_together() {
        assert_matches!(
            check_exclusive_flags(true, true),
            Err(Error::InvalidFilterCombination(_))
        );
        assert!(check_exclusive_flags(true, false).is_ok());
        assert!(check_exclusive_flags(false, true).is_ok());
        assert!(check_exclusive_flags(false, false).is_ok());
    }

    #[test]
    fn order_by_ids_restores_resolved_order() {
        let items = vec![(3, "c"), (1, "a"), (2, "b")];
        let ordered = order_by_ids(items, &[2, 3, 1], |item| item.0);
        assert_eq!(ordered, vec![(2, "b"), (3, "c"), (1, "a")]);
    }

    #[test]
    fn order_by_ids_skips_unhydrated_ids_and_never_duplicates() {
        let items = vec![(1, "a"), (2, "b")];
        let ordered = order_by_ids(items, &[2, 9, 1, 2], |item| item.0);
        assert_eq!(ordered, vec![(2, "b"), (1, "a")]);
    }
}
