//! Book copy (physical item) repository

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::authors::Author;
use crate::db::books::{self, PublicationPlace};
use crate::db::borrow_records::{self, Loan};
use crate::db::query::{self, clamp_paging, status, ListQuery, Page, COPY_LIST};
use crate::error::{Error, Result};

/// Flat copy row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CopyRow {
    pub id: i32,
    pub book_id: i32,
    pub inventory_no: String,
    pub receipt_date: Option<NaiveDate>,
    pub storage_place: Option<String>,
    pub price: Option<Decimal>,
}

/// Derived lend status, always consistent with the borrow-record ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CopyStatus {
    Available,
    Issued,
}

/// Copy as returned by the API: its book, that book's display relations, and
/// the full loan history.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookCopy {
    pub id: i32,
    pub inventory_no: String,
    pub receipt_date: Option<NaiveDate>,
    pub storage_place: Option<String>,
    pub price: Option<Decimal>,
    pub status: CopyStatus,
    pub book: CopyBook,
    pub borrow_records: Vec<Loan>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyBook {
    pub id: i32,
    pub title: String,
    pub authors: Vec<Author>,
    pub publication_places: Vec<PublicationPlace>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCopy {
    pub book_id: i32,
    pub inventory_no: String,
    #[serde(default)]
    pub receipt_date: Option<NaiveDate>,
    #[serde(default)]
    pub storage_place: Option<String>,
    #[serde(default)]
    pub price: Option<Decimal>,
}

/// Partial update; absent fields keep their current values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCopy {
    pub book_id: Option<i32>,
    pub inventory_no: Option<String>,
    pub receipt_date: Option<NaiveDate>,
    pub storage_place: Option<String>,
    pub price: Option<Decimal>,
}

const COLUMNS: &str = "id, book_id, inventory_no, receipt_date, storage_place, price";

pub struct CopyRepository {
    pool: PgPool,
}

impl CopyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Paginated listing over the shared two-phase query pipeline.
    pub async fn find_paginated(
        &self,
        search: &str,
        search_column: &str,
        only_available: bool,
        only_issued: bool,
        page: i64,
        limit: i64,
        sort: &str,
    ) -> Result<Page<BookCopy>> {
        query::check_exclusive_flags(only_available, only_issued)?;
        let (page, limit) = clamp_paging(page, limit);

        let mut list = ListQuery::new(&COPY_LIST);
        list.search(search, search_column);
        if only_issued {
            list.filter(status::copy_issued("copy.id"));
        }
        if only_available {
            list.filter(status::copy_available("copy.id"));
        }
        list.sort(sort);

        let (ids, total) = query::resolve_page(&self.pool, &list, page, limit).await?;
        if ids.is_empty() {
            return Ok(Page {
                data: Vec::new(),
                total,
                page,
                limit,
            });
        }

        let copies = self.hydrate(&ids).await?;
        let data = query::order_by_ids(copies, &ids, |copy| copy.id);
        Ok(Page {
            data,
            total,
            page,
            limit,
        })
    }

    pub async fn find_all(&self) -> Result<Vec<BookCopy>> {
        let ids = sqlx::query_scalar::<_, i32>("SELECT id FROM book_copy ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        self.hydrate(&ids).await
    }

    pub async fn find_one(&self, id: i32) -> Result<BookCopy> {
        let copies = self.hydrate(&[id]).await?;
        copies
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("copy {id} not found")))
    }

    pub async fn find_by_inventory(&self, inventory_no: &str) -> Result<BookCopy> {
        let id = sqlx::query_scalar::<_, i32>("SELECT id FROM book_copy WHERE inventory_no = $1")
            .bind(inventory_no)
            .fetch_optional(&self.pool)
            .await?;
        match id {
            Some(id) => self.find_one(id).await,
            None => Err(Error::NotFound(format!(
                "copy with inventory number '{inventory_no}' not found"
            ))),
        }
    }

    /// All (or only free) copies of one book, in id order.
    pub async fn find_by_book(&self, book_id: i32, only_free: bool) -> Result<Vec<BookCopy>> {
        let mut sql = String::from("SELECT copy.id FROM book_copy copy WHERE copy.book_id = $1");
        if only_free {
            sql.push_str(&format!(" AND {}", status::copy_available("copy.id")));
        }
        sql.push_str(" ORDER BY copy.id");

        let ids = sqlx::query_scalar::<_, i32>(&sql)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let copies = self.hydrate(&ids).await?;
        Ok(query::order_by_ids(copies, &ids, |copy| copy.id))
    }

    pub async fn create(&self, input: CreateCopy) -> Result<BookCopy> {
        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO book_copy (book_id, inventory_no, receipt_date, storage_place, price) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(input.book_id)
        .bind(&input.inventory_no)
        .bind(input.receipt_date)
        .bind(&input.storage_place)
        .bind(input.price)
        .fetch_one(&self.pool)
        .await?;

        self.find_one(id).await
    }

    pub async fn update(&self, id: i32, input: UpdateCopy) -> Result<BookCopy> {
        let updated = sqlx::query_scalar::<_, i32>(
            "UPDATE book_copy SET \
                 book_id = COALESCE($2, book_id), \
                 inventory_no = COALESCE($3, inventory_no), \
                 receipt_date = COALESCE($4, receipt_date), \
                 storage_place = COALESCE($5, storage_place), \
                 price = COALESCE($6, price) \
             WHERE id = $1 RETURNING id",
        )
        .bind(id)
        .bind(input.book_id)
        .bind(&input.inventory_no)
        .bind(input.receipt_date)
        .bind(&input.storage_place)
        .bind(input.price)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(id) => self.find_one(id).await,
            None => Err(Error::NotFound(format!("copy {id} not found"))),
        }
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        let result = sqlx::query("DELETE FROM book_copy WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("copy {id} not found")));
        }
        Ok(())
    }

    /// Fetch copies with their book, its display relations, and loan history.
    async fn hydrate(&self, ids: &[i32]) -> Result<Vec<BookCopy>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, CopyRow>(&format!(
            "SELECT {COLUMNS} FROM book_copy WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let book_ids: Vec<i32> = {
            let mut ids: Vec<i32> = rows.iter().map(|row| row.book_id).collect();
            ids.sort_unstable();
            ids.dedup();
            ids
        };

        let books: Vec<(i32, String)> =
            sqlx::query_as("SELECT id, title FROM book WHERE id = ANY($1)")
                .bind(&book_ids)
                .fetch_all(&self.pool)
                .await?;
        let mut authors = books::authors_by_book(&self.pool, &book_ids).await?;
        let mut places = books::pub_places_by_book(&self.pool, &book_ids).await?;
        let mut loans = borrow_records::loans_by_copy(&self.pool, ids).await?;

        let mut book_by_id = std::collections::HashMap::new();
        for (id, title) in books {
            book_by_id.insert(
                id,
                CopyBook {
                    id,
                    title,
                    authors: authors.remove(&id).unwrap_or_default(),
                    publication_places: places.remove(&id).unwrap_or_default(),
                },
            );
        }

        let mut copies = Vec::with_capacity(rows.len());
        for row in rows {
            let book = book_by_id
                .get(&row.book_id)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("book {} not found", row.book_id)))?;
            let borrow_records = loans.remove(&row.id).unwrap_or_default();
            let copy_status = if status::is_on_loan(borrow_records.iter().map(|l| &l.return_date)) {
                CopyStatus::Issued
            } else {
                CopyStatus::Available
            };
            copies.push(BookCopy {
                id: row.id,
                inventory_no: row.inventory_no,
                receipt_date: row.receipt_date,
                storage_place: row.storage_place,
                price: row.price,
                status: copy_status,
                book,
                borrow_records,
            });
        }
        Ok(copies)
    }
}
