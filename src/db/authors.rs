//! Author directory repository

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub id: i32,
    pub last_name: String,
    pub first_name: String,
    pub patronymic: Option<String>,
    pub birth_year: Option<i32>,
}

/// Input for creating or updating an author.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorInput {
    pub last_name: String,
    pub first_name: String,
    #[serde(default)]
    pub patronymic: Option<String>,
    #[serde(default)]
    pub birth_year: Option<i32>,
}

const COLUMNS: &str = "id, last_name, first_name, patronymic, birth_year";

pub struct AuthorRepository {
    pool: PgPool,
}

impl AuthorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Substring search, optionally scoped to one field; an empty term lists
    /// everything. Always ordered by last then first name.
    pub async fn search(&self, search: &str, search_field: &str) -> Result<Vec<Author>> {
        let term = search.trim();

        let condition = match search_field {
            "lastName" => "last_name ILIKE $1",
            "firstName" => "first_name ILIKE $1",
            "patronymic" => "patronymic ILIKE $1",
            "birthYear" => "CAST(birth_year AS TEXT) LIKE $1",
            _ => {
                "(last_name ILIKE $1 OR first_name ILIKE $1 \
                 OR patronymic ILIKE $1 OR CAST(birth_year AS TEXT) LIKE $1)"
            }
        };

        let sql = if term.is_empty() {
            format!("SELECT {COLUMNS} FROM author ORDER BY last_name, first_name")
        } else {
            format!(
                "SELECT {COLUMNS} FROM author WHERE {condition} ORDER BY last_name, first_name"
            )
        };

        let mut query = sqlx::query_as::<_, Author>(&sql);
        if !term.is_empty() {
            query = query.bind(format!("%{term}%"));
        }

        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Author>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let authors = sqlx::query_as::<_, Author>(&format!(
            "SELECT {COLUMNS} FROM author WHERE id = ANY($1) ORDER BY last_name, first_name"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(authors)
    }

    pub async fn create(&self, input: AuthorInput) -> Result<Author> {
        let author = sqlx::query_as::<_, Author>(&format!(
            "INSERT INTO author (last_name, first_name, patronymic, birth_year) \
             VALUES ($1, $2, $3, $4) RETURNING {COLUMNS}"
        ))
        .bind(&input.last_name)
        .bind(&input.first_name)
        .bind(&input.patronymic)
        .bind(input.birth_year)
        .fetch_one(&self.pool)
        .await?;
        Ok(author)
    }

    pub async fn update(&self, id: i32, input: AuthorInput) -> Result<Author> {
        let author = sqlx::query_as::<_, Author>(&format!(
            "UPDATE author SET last_name = $2, first_name = $3, patronymic = $4, \
             birth_year = $5 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&input.last_name)
        .bind(&input.first_name)
        .bind(&input.patronymic)
        .bind(input.birth_year)
        .fetch_optional(&self.pool)
        .await?;

        author.ok_or_else(|| Error::NotFound(format!("author {id} not found")))
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        let result = sqlx::query("DELETE FROM author WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("author {id} not found")));
        }
        Ok(())
    }
}
