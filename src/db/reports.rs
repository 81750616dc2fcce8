//! Reporting queries
//!
//! Read-only aggregates over the catalog and loan ledger. Each report is a
//! single grouped query; no report mutates anything.

use serde::Serialize;
use sqlx::PgPool;

use crate::error::Result;

/// Why a book currently has nothing to lend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoCopiesReason {
    /// The book has no copies on record at all.
    WrittenOff,
    /// Every copy is out on loan.
    AllIssued,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoCopiesReport {
    pub id: i32,
    pub title: String,
    pub copies_count: i64,
    pub borrowed_now: i64,
    pub reason: NoCopiesReason,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UdcProvision {
    pub udc_abb: String,
    pub description: Option<String>,
    pub books_count: i64,
    pub copies_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct NoCopiesRow {
    id: i32,
    title: String,
    copies_count: i64,
    borrowed_now: i64,
}

const ISSUED_COPY: &str = "EXISTS (SELECT 1 FROM borrow_record br2 \
     WHERE br2.book_copy_id = bc.id AND br2.return_date IS NULL)";

pub struct ReportRepository {
    pool: PgPool,
}

impl ReportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Books with nothing left to lend: either no copies on record, or every
    /// copy out on an open loan.
    pub async fn no_copies(&self) -> Result<Vec<NoCopiesReport>> {
        let sql = format!(
            "SELECT book.id, book.title, \
                    COUNT(DISTINCT bc.id) AS copies_count, \
                    COUNT(DISTINCT bc.id) FILTER (WHERE {ISSUED_COPY}) AS borrowed_now \
             FROM book \
             LEFT JOIN book_copy bc ON bc.book_id = book.id \
             GROUP BY book.id, book.title \
             HAVING COUNT(DISTINCT bc.id) = 0 \
                 OR COUNT(DISTINCT bc.id) = COUNT(DISTINCT bc.id) FILTER (WHERE {ISSUED_COPY}) \
             ORDER BY book.title, book.id",
        );
        let rows = sqlx::query_as::<_, NoCopiesRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| NoCopiesReport {
                reason: reason_for(row.copies_count),
                id: row.id,
                title: row.title,
                copies_count: row.copies_count,
                borrowed_now: row.borrowed_now,
            })
            .collect())
    }

    /// Stock provision per UDC classifier: how many distinct books carry the
    /// code and how many physical copies back them.
    pub async fn udc_provision(&self) -> Result<Vec<UdcProvision>> {
        let rows = sqlx::query_as::<_, UdcProvision>(
            "SELECT udc.udc_abb, udc.description, \
                    COUNT(DISTINCT bu.book_id) AS books_count, \
                    COUNT(DISTINCT bc.id) AS copies_count \
             FROM udc \
             LEFT JOIN book_udc bu ON bu.udc_id = udc.id \
             LEFT JOIN book_copy bc ON bc.book_id = bu.book_id \
             GROUP BY udc.id, udc.udc_abb, udc.description \
             ORDER BY udc.udc_abb",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

fn reason_for(copies_count: i64) -> NoCopiesReason {
    if copies_count == 0 {
        NoCopiesReason::WrittenOff
    } else {
        NoCopiesReason::AllIssued
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_copies_means_written_off() {
        assert_eq!(reason_for(0), NoCopiesReason::WrittenOff);
        assert_eq!(reason_for(3), NoCopiesReason::AllIssued);
    }

    #[test]
    fn reason_serializes_in_snake_case() {
        assert_eq!(
            serde_json::to_string(&NoCopiesReason::WrittenOff).unwrap(),
            "\"written_off\""
        );
        assert_eq!(
            serde_json::to_string(&NoCopiesReason::AllIssued).unwrap(),
            "\"all_issued\""
        );
    }
}
