//! Bibliographic classifier repositories (BBK, UDC, GRNTI, publishers)
//!
//! All four are small code/name directories with the same surface: substring
//! search ordered by their natural key, plus create/update/delete.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bbk {
    pub id: i32,
    pub bbk_abb: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Udc {
    pub id: i32,
    pub udc_abb: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Grnti {
    pub id: i32,
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Publisher {
    pub id: i32,
    pub name: String,
}

/// Input for a code-plus-description classifier row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeInput {
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublisherInput {
    pub name: String,
}

/// Shared search helper: ILIKE on the scoped column, or OR across both.
fn search_sql(
    table: &str,
    columns: &str,
    code_col: &str,
    term: &str,
    field_condition: Option<&str>,
) -> String {
    if term.is_empty() {
        return format!("SELECT {columns} FROM {table} ORDER BY {code_col}");
    }
    let condition = field_condition
        .map(str::to_string)
        .unwrap_or_else(|| format!("({code_col} ILIKE $1 OR description ILIKE $1)"));
    format!("SELECT {columns} FROM {table} WHERE {condition} ORDER BY {code_col}")
}

macro_rules! classifier_repo {
    ($repo:ident, $entity:ident, $table:literal, $code_col:literal, $code_key:literal, $columns:expr) => {
        pub struct $repo {
            pool: PgPool,
        }

        impl $repo {
            pub fn new(pool: PgPool) -> Self {
                Self { pool }
            }

            pub async fn search(&self, search: &str, search_field: &str) -> Result<Vec<$entity>> {
                let term = search.trim();
                let field_condition = match search_field {
                    f if f == $code_key => Some(concat!($code_col, " ILIKE $1")),
                    "description" => Some("description ILIKE $1"),
                    _ => None,
                };
                let sql = search_sql($table, $columns, $code_col, term, field_condition);

                let mut query = sqlx::query_as::<_, $entity>(&sql);
                if !term.is_empty() {
                    query = query.bind(format!("%{term}%"));
                }
                Ok(query.fetch_all(&self.pool).await?)
            }

            pub async fn create(&self, input: CodeInput) -> Result<$entity> {
                let sql = format!(
                    "INSERT INTO {} ({}, description) VALUES ($1, $2) RETURNING {}",
                    $table, $code_col, $columns
                );
                let row = sqlx::query_as::<_, $entity>(&sql)
                    .bind(&input.code)
                    .bind(&input.description)
                    .fetch_one(&self.pool)
                    .await?;
                Ok(row)
            }

            pub async fn update(&self, id: i32, input: CodeInput) -> Result<$entity> {
                let sql = format!(
                    "UPDATE {} SET {} = $2, description = $3 WHERE id = $1 RETURNING {}",
                    $table, $code_col, $columns
                );
                let row = sqlx::query_as::<_, $entity>(&sql)
                    .bind(id)
                    .bind(&input.code)
                    .bind(&input.description)
                    .fetch_optional(&self.pool)
                    .await?;
                row.ok_or_else(|| Error::NotFound(format!("{} {id} not found", $table)))
            }

            pub async fn delete(&self, id: i32) -> Result<()> {
                let sql = format!("DELETE FROM {} WHERE id = $1", $table);
                let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
                if result.rows_affected() == 0 {
                    return Err(Error::NotFound(format!("{} {id} not found", $table)));
                }
                Ok(())
            }
        }
    };
}

classifier_repo!(BbkRepository, Bbk, "bbk", "bbk_abb", "bbkAbb", "id, bbk_abb, description");
classifier_repo!(UdcRepository, Udc, "udc", "udc_abb", "udcAbb", "id, udc_abb, description");
classifier_repo!(
    GrntiRepository,
    Grnti,
    "grnti",
    "grnti_code",
    "code",
    "id, grnti_code AS code, description"
);

pub struct PublisherRepository {
    pool: PgPool,
}

impl PublisherRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn search(&self, search: &str) -> Result<Vec<Publisher>> {
        let term = search.trim();
        let sql = if term.is_empty() {
            "SELECT id, name FROM publisher ORDER BY name"
        } else {
            "SELECT id, name FROM publisher WHERE name ILIKE $1 ORDER BY name"
        };

        let mut query = sqlx::query_as::<_, Publisher>(sql);
        if !term.is_empty() {
            query = query.bind(format!("%{term}%"));
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn create(&self, input: PublisherInput) -> Result<Publisher> {
        let publisher = sqlx::query_as::<_, Publisher>(
            "INSERT INTO publisher (name) VALUES ($1) RETURNING id, name",
        )
        .bind(&input.name)
        .fetch_one(&self.pool)
        .await?;
        Ok(publisher)
    }

    pub async fn update(&self, id: i32, input: PublisherInput) -> Result<Publisher> {
        let publisher = sqlx::query_as::<_, Publisher>(
            "UPDATE publisher SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(&input.name)
        .fetch_optional(&self.pool)
        .await?;
        publisher.ok_or_else(|| Error::NotFound(format!("publisher {id} not found")))
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        let result = sqlx::query("DELETE FROM publisher WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("publisher {id} not found")));
        }
        Ok(())
    }
}
