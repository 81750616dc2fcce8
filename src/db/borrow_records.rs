//! Borrow record repository: loan issue/return lifecycle and listings
//!
//! Records are append-only history: issuing creates a row, returning stamps
//! `return_date` and the accepting staff user. Rows are never deleted.

use chrono::{Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::persons::Person;
use crate::db::query::{self, clamp_paging, status, ListQuery, Page, BORROW_LIST};
use crate::error::{Error, Result};

/// Flat borrow record row, embedded under books and copies.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    pub id: i32,
    pub book_copy_id: i32,
    pub person_id: i32,
    pub issued_by_user_id: i32,
    pub accepted_by_user_id: Option<i32>,
    pub borrow_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub expected_return_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
}

/// Staff user reference (issuing/accepting librarian).
#[derive(Debug, Clone, Serialize)]
pub struct StaffUser {
    pub id: i32,
    pub username: String,
}

/// Fully hydrated borrow record as returned by the API.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRecord {
    pub id: i32,
    pub borrow_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub expected_return_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub book_copy: BorrowedCopy,
    pub person: Person,
    pub issued_by_user: StaffUser,
    pub accepted_by_user: Option<StaffUser>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowedCopy {
    pub id: i32,
    pub inventory_no: String,
    pub book: BorrowedBook,
}

#[derive(Debug, Clone, Serialize)]
pub struct BorrowedBook {
    pub id: i32,
    pub title: String,
}

/// Input for issuing a copy.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCopy {
    pub book_copy_id: i32,
    pub person_id: i32,
    pub issued_by_user_id: i32,
    pub due_date: NaiveDate,
}

/// One joined row of the hydration query.
#[derive(Debug, sqlx::FromRow)]
struct BorrowDetailRow {
    id: i32,
    borrow_date: NaiveDate,
    due_date: Option<NaiveDate>,
    expected_return_date: Option<NaiveDate>,
    return_date: Option<NaiveDate>,
    copy_id: i32,
    inventory_no: String,
    book_id: i32,
    title: String,
    person_id: i32,
    person_last_name: String,
    person_first_name: String,
    person_patronymic: Option<String>,
    person_sex: String,
    person_birthday: NaiveDate,
    person_inn: Option<i64>,
    person_snils: Option<String>,
    person_email: Option<String>,
    issued_by_id: i32,
    issued_by_username: String,
    accepted_by_id: Option<i32>,
    accepted_by_username: Option<String>,
}

impl From<BorrowDetailRow> for BorrowRecord {
    fn from(row: BorrowDetailRow) -> Self {
        BorrowRecord {
            id: row.id,
            borrow_date: row.borrow_date,
            due_date: row.due_date,
            expected_return_date: row.expected_return_date,
            return_date: row.return_date,
            book_copy: BorrowedCopy {
                id: row.copy_id,
                inventory_no: row.inventory_no,
                book: BorrowedBook {
                    id: row.book_id,
                    title: row.title,
                },
            },
            person: Person {
                id: row.person_id,
                last_name: row.person_last_name,
                first_name: row.person_first_name,
                patronymic: row.person_patronymic,
                sex: row.person_sex,
                birthday: row.person_birthday,
                inn: row.person_inn,
                snils: row.person_snils,
                email: row.person_email,
            },
            issued_by_user: StaffUser {
                id: row.issued_by_id,
                username: row.issued_by_username,
            },
            accepted_by_user: match (row.accepted_by_id, row.accepted_by_username) {
                (Some(id), Some(username)) => Some(StaffUser { id, username }),
                _ => None,
            },
        }
    }
}

fn detail_sql(condition: Option<&str>, order: &str) -> String {
    let mut sql = String::from(
        "SELECT record.id, record.borrow_date, record.due_date, record.expected_return_date, \
                record.return_date, \
                copy.id AS copy_id, copy.inventory_no, \
                book.id AS book_id, book.title, \
                p.id AS person_id, p.last_name AS person_last_name, \
                p.first_name AS person_first_name, p.patronymic AS person_patronymic, \
                p.sex AS person_sex, p.birthday AS person_birthday, p.inn AS person_inn, \
                p.snils AS person_snils, p.email AS person_email, \
                iu.id AS issued_by_id, iu.username AS issued_by_username, \
                au.id AS accepted_by_id, au.username AS accepted_by_username \
         FROM borrow_record record \
         JOIN book_copy copy ON copy.id = record.book_copy_id \
         JOIN book ON book.id = copy.book_id \
         JOIN person p ON p.id = record.person_id \
         JOIN app_user iu ON iu.id = record.issued_by_user_id \
         LEFT JOIN app_user au ON au.id = record.accepted_by_user_id",
    );
    if let Some(condition) = condition {
        sql.push_str(" WHERE ");
        sql.push_str(condition);
    }
    sql.push_str(" ORDER BY ");
    sql.push_str(order);
    sql
}

/// Loan history grouped by copy id, in borrow order. Shared by the book and
/// copy hydration paths, which embed loans under each copy.
pub(crate) async fn loans_by_copy(
    pool: &PgPool,
    copy_ids: &[i32],
) -> Result<std::collections::HashMap<i32, Vec<Loan>>> {
    let mut by_copy: std::collections::HashMap<i32, Vec<Loan>> = std::collections::HashMap::new();
    if copy_ids.is_empty() {
        return Ok(by_copy);
    }
    let loans = sqlx::query_as::<_, Loan>(
        "SELECT id, book_copy_id, person_id, issued_by_user_id, accepted_by_user_id, \
                borrow_date, due_date, expected_return_date, return_date \
         FROM borrow_record WHERE book_copy_id = ANY($1) ORDER BY borrow_date, id",
    )
    .bind(copy_ids)
    .fetch_all(pool)
    .await?;
    for loan in loans {
        by_copy.entry(loan.book_copy_id).or_default().push(loan);
    }
    Ok(by_copy)
}

pub struct BorrowRecordRepository {
    pool: PgPool,
}

impl BorrowRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Issue a copy: borrow date is today, the expected return a year out,
    /// the due date comes from the caller. Availability is the caller's
    /// responsibility to check beforehand.
    pub async fn issue(&self, input: IssueCopy) -> Result<BorrowRecord> {
        let today = Utc::now().date_naive();
        let expected_return = today
            .with_year(today.year() + 1)
            .unwrap_or_else(|| today + Days::new(365));

        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO borrow_record \
             (book_copy_id, person_id, issued_by_user_id, borrow_date, due_date, expected_return_date) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(input.book_copy_id)
        .bind(input.person_id)
        .bind(input.issued_by_user_id)
        .bind(today)
        .bind(input.due_date)
        .bind(expected_return)
        .fetch_one(&self.pool)
        .await?;

        self.find_one(id).await
    }

    /// Return a copy: stamp today's date and the accepting user on the
    /// specific active record. Returning an already-closed record is an error.
    pub async fn return_record(&self, id: i32, accepted_by_user_id: i32) -> Result<BorrowRecord> {
        let return_date =
            sqlx::query_scalar::<_, Option<NaiveDate>>(
                "SELECT return_date FROM borrow_record WHERE id = $1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match return_date {
            None => return Err(Error::NotFound(format!("borrow record {id} not found"))),
            Some(Some(_)) => {
                return Err(Error::Validation(format!(
                    "borrow record {id} is already returned"
                )))
            }
            Some(None) => {}
        }

        sqlx::query(
            "UPDATE borrow_record SET return_date = CURRENT_DATE, accepted_by_user_id = $2 \
             WHERE id = $1",
        )
        .bind(id)
        .bind(accepted_by_user_id)
        .execute(&self.pool)
        .await?;

        self.find_one(id).await
    }

    pub async fn find_one(&self, id: i32) -> Result<BorrowRecord> {
        let sql = detail_sql(Some("record.id = $1"), "record.id");
        let row = sqlx::query_as::<_, BorrowDetailRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(BorrowRecord::from)
            .ok_or_else(|| Error::NotFound(format!("borrow record {id} not found")))
    }

    pub async fn find_all(&self) -> Result<Vec<BorrowRecord>> {
        let sql = detail_sql(None, "record.id");
        let rows = sqlx::query_as::<_, BorrowDetailRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(BorrowRecord::from).collect())
    }

    /// One reader's loan history, optionally narrowed to open or overdue
    /// records, in borrow order.
    pub async fn find_by_person(
        &self,
        person_id: i32,
        only_active: bool,
        only_debts: bool,
    ) -> Result<Vec<BorrowRecord>> {
        let mut condition = String::from("p.id = $1");
        if only_active {
            condition.push_str(&format!(" AND {}", status::on_loan("record")));
        }
        if only_debts {
            condition.push_str(&format!(" AND {}", status::overdue("record")));
        }

        let sql = detail_sql(Some(&condition), "record.borrow_date, record.id");
        let rows = sqlx::query_as::<_, BorrowDetailRow>(&sql)
            .bind(person_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(BorrowRecord::from).collect())
    }

    /// Records not yet accepted back by any staff user, oldest first.
    pub async fn unreturned(&self) -> Result<Vec<BorrowRecord>> {
        let sql = detail_sql(
            Some("record.accepted_by_user_id IS NULL"),
            "record.borrow_date, record.id",
        );
        let rows = sqlx::query_as::<_, BorrowDetailRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(BorrowRecord::from).collect())
    }

    /// Paginated listing over the shared two-phase query pipeline.
    pub async fn find_paginated(
        &self,
        search: &str,
        search_column: &str,
        only_debts: bool,
        page: i64,
        limit: i64,
        sort: &str,
    ) -> Result<Page<BorrowRecord>> {
        let (page, limit) = clamp_paging(page, limit);

        let mut list = ListQuery::new(&BORROW_LIST);
        list.search(search, search_column);
        if only_debts {
            list.filter(status::overdue("record"));
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

        let records = self.hydrate(&ids).await?;
        let data = query::order_by_ids(records, &ids, |record| record.id);
        Ok(Page {
            data,
            total,
            page,
            limit,
        })
    }

    async fn hydrate(&self, ids: &[i32]) -> Result<Vec<BorrowRecord>> {
        let sql = detail_sql(Some("record.id = ANY($1)"), "record.id");
        let rows = sqlx::query_as::<_, BorrowDetailRow>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(BorrowRecord::from).collect())
    }
}
