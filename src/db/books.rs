//! Book catalog repository
//!
//! Books carry three families of relations: linked authors, classifier codes
//! (BBK/UDC/GRNTI, both linked rows and free-form "raw" codes kept verbatim
//! from import), and publication places pointing at publishers. Mutations
//! replace whole relation sets inside one transaction; the paginated listing
//! goes through the shared two-phase query pipeline.

use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};

use crate::db::authors::Author;
use crate::db::borrow_records::{self, Loan};
use crate::db::classifiers::{Bbk, Grnti, Publisher, Udc};
use crate::db::copies::{CopyRow, CopyStatus};
use crate::db::query::{self, clamp_paging, status, ListQuery, Page, BOOK_LIST};
use crate::error::{Error, Result};

/// Flat book row.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BookRow {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub book_type: Option<String>,
    pub edit: Option<String>,
    pub edition_statement: Option<String>,
    pub series: Option<String>,
    pub phys_desc: Option<String>,
}

/// Publication place: an optional city/year pair tied to a publisher.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationPlace {
    pub id: i32,
    pub city: Option<String>,
    pub pub_year: Option<i32>,
    pub publisher: Option<Publisher>,
}

/// Copy embedded under its book, with loan history and derived status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CopySummary {
    pub id: i32,
    pub inventory_no: String,
    pub receipt_date: Option<chrono::NaiveDate>,
    pub storage_place: Option<String>,
    pub price: Option<rust_decimal::Decimal>,
    pub status: CopyStatus,
    pub borrow_records: Vec<Loan>,
}

/// Book as returned by the API, with every relation hydrated.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub book_type: Option<String>,
    pub edit: Option<String>,
    pub edition_statement: Option<String>,
    pub series: Option<String>,
    pub phys_desc: Option<String>,
    pub authors: Vec<Author>,
    pub bbks: Vec<Bbk>,
    pub udcs: Vec<Udc>,
    pub grntis: Vec<Grnti>,
    pub bbk_raws: Vec<String>,
    pub udc_raws: Vec<String>,
    pub grnti_raws: Vec<String>,
    pub publication_places: Vec<PublicationPlace>,
    pub book_copies: Vec<CopySummary>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PubPlaceInput {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub publisher_name: Option<String>,
    #[serde(default)]
    pub pub_year: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBook {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub book_type: Option<String>,
    #[serde(default)]
    pub edit: Option<String>,
    #[serde(default)]
    pub edition_statement: Option<String>,
    #[serde(default)]
    pub series: Option<String>,
    #[serde(default)]
    pub phys_desc: Option<String>,
    #[serde(default)]
    pub authors_ids: Vec<i32>,
    #[serde(default)]
    pub bbk_abbs: Vec<String>,
    #[serde(default)]
    pub udc_abbs: Vec<String>,
    #[serde(default)]
    pub grnti_codes: Vec<String>,
    #[serde(default)]
    pub bbk_raw_codes: Vec<String>,
    #[serde(default)]
    pub udc_raw_codes: Vec<String>,
    #[serde(default)]
    pub grnti_raw_codes: Vec<String>,
    #[serde(default)]
    pub publication_places: Vec<PubPlaceInput>,
}

/// Partial update. Absent scalars keep their values; absent relation lists
/// leave the relation untouched, present lists replace it wholesale.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    pub title: Option<String>,
    pub description: Option<String>,
    pub book_type: Option<String>,
    pub edit: Option<String>,
    pub edition_statement: Option<String>,
    pub series: Option<String>,
    pub phys_desc: Option<String>,
    pub authors_ids: Option<Vec<i32>>,
    pub bbk_abbs: Option<Vec<String>>,
    pub udc_abbs: Option<Vec<String>>,
    pub grnti_codes: Option<Vec<String>>,
    pub bbk_raw_codes: Option<Vec<String>>,
    pub udc_raw_codes: Option<Vec<String>>,
    pub grnti_raw_codes: Option<Vec<String>>,
    pub publication_places: Option<Vec<PubPlaceInput>>,
}

const COLUMNS: &str =
    "id, title, description, type AS book_type, edit, edition_statement, series, phys_desc";

fn group<K: Eq + Hash, V>(pairs: Vec<(K, V)>) -> HashMap<K, Vec<V>> {
    let mut map: HashMap<K, Vec<V>> = HashMap::new();
    for (key, value) in pairs {
        map.entry(key).or_default().push(value);
    }
    map
}

/// Linked authors grouped by book id, ordered by name.
pub(crate) async fn authors_by_book(
    pool: &PgPool,
    book_ids: &[i32],
) -> Result<HashMap<i32, Vec<Author>>> {
    if book_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, i32, String, String, Option<String>, Option<i32>)> = sqlx::query_as(
        "SELECT ba.book_id, a.id, a.last_name, a.first_name, a.patronymic, a.birth_year \
         FROM book_author ba JOIN author a ON a.id = ba.author_id \
         WHERE ba.book_id = ANY($1) ORDER BY a.last_name, a.first_name",
    )
    .bind(book_ids)
    .fetch_all(pool)
    .await?;
    Ok(group(
        rows.into_iter()
            .map(|(book_id, id, last_name, first_name, patronymic, birth_year)| {
                (
                    book_id,
                    Author {
                        id,
                        last_name,
                        first_name,
                        patronymic,
                        birth_year,
                    },
                )
            })
            .collect(),
    ))
}

/// Publication places grouped by book id, with their publisher when set.
pub(crate) async fn pub_places_by_book(
    pool: &PgPool,
    book_ids: &[i32],
) -> Result<HashMap<i32, Vec<PublicationPlace>>> {
    if book_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(i32, i32, Option<String>, Option<i32>, Option<i32>, Option<String>)> =
        sqlx::query_as(
            "SELECT pp.book_id, pp.id, pp.city, pp.pub_year, pub.id, pub.name \
             FROM book_pub_place pp LEFT JOIN publisher pub ON pub.id = pp.publisher_id \
             WHERE pp.book_id = ANY($1) ORDER BY pp.id",
        )
        .bind(book_ids)
        .fetch_all(pool)
        .await?;
    Ok(group(
        rows.into_iter()
            .map(|(book_id, id, city, pub_year, publisher_id, publisher_name)| {
                let publisher = match (publisher_id, publisher_name) {
                    (Some(id), Some(name)) => Some(Publisher { id, name }),
                    _ => None,
                };
                (
                    book_id,
                    PublicationPlace {
                        id,
                        city,
                        pub_year,
                        publisher,
                    },
                )
            })
            .collect(),
    ))
}

pub struct BookRepository {
    pool: PgPool,
}

impl BookRepository {
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
    ) -> Result<Page<Book>> {
        query::check_exclusive_flags(only_available, only_issued)?;
        let (page, limit) = clamp_paging(page, limit);

        let mut list = ListQuery::new(&BOOK_LIST);
        list.search(search, search_column);
        if only_issued {
            list.filter(status::book_issued("book.id"));
        }
        if only_available {
            list.filter(status::book_available("book.id"));
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

        let books = self.hydrate(&ids).await?;
        let data = query::order_by_ids(books, &ids, |book| book.id);
        Ok(Page {
            data,
            total,
            page,
            limit,
        })
    }

    pub async fn find_one(&self, id: i32) -> Result<Book> {
        let books = self.hydrate(&[id]).await?;
        books
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("book {id} not found")))
    }

    pub async fn create(&self, input: CreateBook) -> Result<Book> {
        let mut tx = self.pool.begin().await?;

        let id = sqlx::query_scalar::<_, i32>(
            "INSERT INTO book (title, description, type, edit, edition_statement, series, phys_desc) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(&input.title)
        .bind(&input.description)
        .bind(&input.book_type)
        .bind(&input.edit)
        .bind(&input.edition_statement)
        .bind(&input.series)
        .bind(&input.phys_desc)
        .fetch_one(&mut *tx)
        .await?;

        replace_authors(&mut tx, id, &input.authors_ids).await?;
        replace_codes(&mut tx, id, "bbk", "bbk_abb", "book_bbk", "bbk_id", &input.bbk_abbs).await?;
        replace_codes(&mut tx, id, "udc", "udc_abb", "book_udc", "udc_id", &input.udc_abbs).await?;
        replace_codes(&mut tx, id, "grnti", "grnti_code", "book_grnti", "grnti_id", &input.grnti_codes)
            .await?;
        replace_raw_codes(&mut tx, id, "book_bbk_raw", "bbk_code", &input.bbk_raw_codes).await?;
        replace_raw_codes(&mut tx, id, "book_udc_raw", "udc_code", &input.udc_raw_codes).await?;
        replace_raw_codes(&mut tx, id, "book_grnti_raw", "grnti_code", &input.grnti_raw_codes)
            .await?;
        replace_pub_places(&mut tx, id, &input.publication_places).await?;

        tx.commit().await?;
        self.find_one(id).await
    }

    /// Full replace semantics per relation family, all under a row lock so
    /// concurrent updates to the same book serialize.
    pub async fn update(&self, id: i32, input: UpdateBook) -> Result<Book> {
        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query_scalar::<_, i32>("SELECT id FROM book WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if locked.is_none() {
            return Err(Error::NotFound(format!("book {id} not found")));
        }

        let scalar_patches = [
            ("title", &input.title),
            ("description", &input.description),
            ("type", &input.book_type),
            ("edit", &input.edit),
            ("edition_statement", &input.edition_statement),
            ("series", &input.series),
            ("phys_desc", &input.phys_desc),
        ];
        let mut sets = Vec::new();
        let mut binds = Vec::new();
        for (column, value) in scalar_patches {
            if let Some(value) = value {
                sets.push(format!("{column} = ${}", binds.len() + 2));
                binds.push(value.clone());
            }
        }
        if !sets.is_empty() {
            let sql = format!("UPDATE book SET {} WHERE id = $1", sets.join(", "));
            let mut update = sqlx::query(&sql).bind(id);
            for value in binds {
                update = update.bind(value);
            }
            update.execute(&mut *tx).await?;
        }

        if let Some(authors_ids) = &input.authors_ids {
            sqlx::query("DELETE FROM book_author WHERE book_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            replace_authors(&mut tx, id, authors_ids).await?;
        }
        if let Some(codes) = &input.bbk_abbs {
            clear_links(&mut tx, id, "book_bbk").await?;
            replace_codes(&mut tx, id, "bbk", "bbk_abb", "book_bbk", "bbk_id", codes).await?;
        }
        if let Some(codes) = &input.udc_abbs {
            clear_links(&mut tx, id, "book_udc").await?;
            replace_codes(&mut tx, id, "udc", "udc_abb", "book_udc", "udc_id", codes).await?;
        }
        if let Some(codes) = &input.grnti_codes {
            clear_links(&mut tx, id, "book_grnti").await?;
            replace_codes(&mut tx, id, "grnti", "grnti_code", "book_grnti", "grnti_id", codes)
                .await?;
        }
        if let Some(codes) = &input.bbk_raw_codes {
            clear_links(&mut tx, id, "book_bbk_raw").await?;
            replace_raw_codes(&mut tx, id, "book_bbk_raw", "bbk_code", codes).await?;
        }
        if let Some(codes) = &input.udc_raw_codes {
            clear_links(&mut tx, id, "book_udc_raw").await?;
            replace_raw_codes(&mut tx, id, "book_udc_raw", "udc_code", codes).await?;
        }
        if let Some(codes) = &input.grnti_raw_codes {
            clear_links(&mut tx, id, "book_grnti_raw").await?;
            replace_raw_codes(&mut tx, id, "book_grnti_raw", "grnti_code", codes).await?;
        }
        if let Some(places) = &input.publication_places {
            clear_links(&mut tx, id, "book_pub_place").await?;
            replace_pub_places(&mut tx, id, places).await?;
        }

        tx.commit().await?;
        self.find_one(id).await
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        let result = sqlx::query("DELETE FROM book WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("book {id} not found")));
        }
        Ok(())
    }

    /// Fetch books with every relation, batched per relation family.
    async fn hydrate(&self, ids: &[i32]) -> Result<Vec<Book>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, BookRow>(&format!(
            "SELECT {COLUMNS} FROM book WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        let mut authors = authors_by_book(&self.pool, ids).await?;
        let mut places = pub_places_by_book(&self.pool, ids).await?;
        let mut bbks = self.classifiers::<Bbk>(ids, "book_bbk", "bbk_id", "bbk", "bbk_abb").await?;
        let mut udcs = self.classifiers::<Udc>(ids, "book_udc", "udc_id", "udc", "udc_abb").await?;
        let mut grntis = self
            .classifiers::<Grnti>(ids, "book_grnti", "grnti_id", "grnti", "grnti_code")
            .await?;
        let mut bbk_raws = self.raw_codes(ids, "book_bbk_raw", "bbk_code").await?;
        let mut udc_raws = self.raw_codes(ids, "book_udc_raw", "udc_code").await?;
        let mut grnti_raws = self.raw_codes(ids, "book_grnti_raw", "grnti_code").await?;

        let copy_rows = sqlx::query_as::<_, CopyRow>(
            "SELECT id, book_id, inventory_no, receipt_date, storage_place, price \
             FROM book_copy WHERE book_id = ANY($1) ORDER BY id",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        let copy_ids: Vec<i32> = copy_rows.iter().map(|c| c.id).collect();
        let mut loans = borrow_records::loans_by_copy(&self.pool, &copy_ids).await?;

        let mut copies_by_book: HashMap<i32, Vec<CopySummary>> = HashMap::new();
        for row in copy_rows {
            let borrow_records = loans.remove(&row.id).unwrap_or_default();
            let copy_status = if status::is_on_loan(borrow_records.iter().map(|l| &l.return_date)) {
                CopyStatus::Issued
            } else {
                CopyStatus::Available
            };
            copies_by_book.entry(row.book_id).or_default().push(CopySummary {
                id: row.id,
                inventory_no: row.inventory_no,
                receipt_date: row.receipt_date,
                storage_place: row.storage_place,
                price: row.price,
                status: copy_status,
                borrow_records,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| Book {
                id: row.id,
                title: row.title,
                description: row.description,
                book_type: row.book_type,
                edit: row.edit,
                edition_statement: row.edition_statement,
                series: row.series,
                phys_desc: row.phys_desc,
                authors: authors.remove(&row.id).unwrap_or_default(),
                bbks: bbks.remove(&row.id).unwrap_or_default(),
                udcs: udcs.remove(&row.id).unwrap_or_default(),
                grntis: grntis.remove(&row.id).unwrap_or_default(),
                bbk_raws: bbk_raws.remove(&row.id).unwrap_or_default(),
                udc_raws: udc_raws.remove(&row.id).unwrap_or_default(),
                grnti_raws: grnti_raws.remove(&row.id).unwrap_or_default(),
                publication_places: places.remove(&row.id).unwrap_or_default(),
                book_copies: copies_by_book.remove(&row.id).unwrap_or_default(),
            })
            .collect())
    }

    async fn classifiers<T>(
        &self,
        book_ids: &[i32],
        link_table: &str,
        link_col: &str,
        table: &str,
        code_col: &str,
    ) -> Result<HashMap<i32, Vec<T>>>
    where
        T: From<(i32, String, Option<String>)>,
    {
        let rows: Vec<(i32, i32, String, Option<String>)> = sqlx::query_as(&format!(
            "SELECT link.book_id, c.id, c.{code_col}, c.description \
             FROM {link_table} link JOIN {table} c ON c.id = link.{link_col} \
             WHERE link.book_id = ANY($1) ORDER BY c.{code_col}",
        ))
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(group(
            rows.into_iter()
                .map(|(book_id, id, code, description)| (book_id, T::from((id, code, description))))
                .collect(),
        ))
    }

    async fn raw_codes(
        &self,
        book_ids: &[i32],
        table: &str,
        code_col: &str,
    ) -> Result<HashMap<i32, Vec<String>>> {
        let rows: Vec<(i32, String)> = sqlx::query_as(&format!(
            "SELECT book_id, {code_col} FROM {table} WHERE book_id = ANY($1) ORDER BY {code_col}",
        ))
        .bind(book_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(group(rows))
    }
}

impl From<(i32, String, Option<String>)> for Bbk {
    fn from((id, bbk_abb, description): (i32, String, Option<String>)) -> Self {
        Bbk { id, bbk_abb, description }
    }
}

impl From<(i32, String, Option<String>)> for Udc {
    fn from((id, udc_abb, description): (i32, String, Option<String>)) -> Self {
        Udc { id, udc_abb, description }
    }
}

impl From<(i32, String, Option<String>)> for Grnti {
    fn from((id, code, description): (i32, String, Option<String>)) -> Self {
        Grnti { id, code, description }
    }
}

/// Insert author links, validating every referenced id exists first.
async fn replace_authors(
    tx: &mut Transaction<'_, Postgres>,
    book_id: i32,
    authors_ids: &[i32],
) -> Result<()> {
    if authors_ids.is_empty() {
        return Ok(());
    }
    let mut unique: Vec<i32> = authors_ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let found = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM author WHERE id = ANY($1)")
        .bind(&unique)
        .fetch_one(&mut **tx)
        .await?;
    if found != unique.len() as i64 {
        return Err(Error::Validation("one or more author ids do not exist".into()));
    }

    sqlx::query("INSERT INTO book_author (book_id, author_id) SELECT $1, unnest($2::int[])")
        .bind(book_id)
        .bind(&unique)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Link classifier codes, creating missing classifier rows on the fly.
async fn replace_codes(
    tx: &mut Transaction<'_, Postgres>,
    book_id: i32,
    table: &str,
    code_col: &str,
    link_table: &str,
    link_col: &str,
    codes: &[String],
) -> Result<()> {
    if codes.is_empty() {
        return Ok(());
    }
    sqlx::query(&format!(
        "INSERT INTO {table} ({code_col}) SELECT DISTINCT unnest($1::text[]) \
         ON CONFLICT ({code_col}) DO NOTHING",
    ))
    .bind(codes)
    .execute(&mut **tx)
    .await?;

    sqlx::query(&format!(
        "INSERT INTO {link_table} (book_id, {link_col}) \
         SELECT $1, id FROM {table} WHERE {code_col} = ANY($2)",
    ))
    .bind(book_id)
    .bind(codes)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn replace_raw_codes(
    tx: &mut Transaction<'_, Postgres>,
    book_id: i32,
    table: &str,
    code_col: &str,
    codes: &[String],
) -> Result<()> {
    if codes.is_empty() {
        return Ok(());
    }
    sqlx::query(&format!(
        "INSERT INTO {table} (book_id, {code_col}) SELECT $1, unnest($2::text[])",
    ))
    .bind(book_id)
    .bind(codes)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Insert publication places, finding or creating each named publisher.
async fn replace_pub_places(
    tx: &mut Transaction<'_, Postgres>,
    book_id: i32,
    places: &[PubPlaceInput],
) -> Result<()> {
    for place in places {
        let publisher_id = match place.publisher_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => {
                let existing =
                    sqlx::query_scalar::<_, i32>("SELECT id FROM publisher WHERE name = $1")
                        .bind(name)
                        .fetch_optional(&mut **tx)
                        .await?;
                match existing {
                    Some(id) => Some(id),
                    None => Some(
                        sqlx::query_scalar::<_, i32>(
                            "INSERT INTO publisher (name) VALUES ($1) RETURNING id",
                        )
                        .bind(name)
                        .fetch_one(&mut **tx)
                        .await?,
                    ),
                }
            }
            _ => None,
        };

        sqlx::query(
            "INSERT INTO book_pub_place (book_id, city, pub_year, publisher_id) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(book_id)
        .bind(&place.city)
        .bind(place.pub_year)
        .bind(publisher_id)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Wipe one book-scoped relation table before a full replace.
async fn clear_links(tx: &mut Transaction<'_, Postgres>, book_id: i32, table: &str) -> Result<()> {
    sqlx::query(&format!("DELETE FROM {table} WHERE book_id = $1"))
        .bind(book_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_preserves_per_key_insertion_order() {
        let grouped = group(vec![(1, "a"), (2, "b"), (1, "c"), (1, "d")]);
        assert_eq!(grouped[&1], vec!["a", "c", "d"]);
        assert_eq!(grouped[&2], vec!["b"]);
    }
}
