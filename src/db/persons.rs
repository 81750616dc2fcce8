//! Borrower (reader) directory repository

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub id: i32,
    pub last_name: String,
    pub first_name: String,
    pub patronymic: Option<String>,
    pub sex: String,
    pub birthday: NaiveDate,
    pub inn: Option<i64>,
    pub snils: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonInput {
    pub last_name: String,
    pub first_name: String,
    #[serde(default)]
    pub patronymic: Option<String>,
    pub sex: String,
    pub birthday: NaiveDate,
    #[serde(default)]
    pub inn: Option<i64>,
    #[serde(default)]
    pub snils: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

const COLUMNS: &str = "id, last_name, first_name, patronymic, sex, birthday, inn, snils, email";

pub struct PersonRepository {
    pool: PgPool,
}

impl PersonRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn search(&self, search: &str, search_field: &str) -> Result<Vec<Person>> {
        let term = search.trim();

        let condition = match search_field {
            "lastName" => "last_name ILIKE $1",
            "firstName" => "first_name ILIKE $1",
            "patronymic" => "patronymic ILIKE $1",
            "email" => "email ILIKE $1",
            "snils" => "snils ILIKE $1",
            _ => {
                "(last_name ILIKE $1 OR first_name ILIKE $1 OR patronymic ILIKE $1 \
                 OR email ILIKE $1)"
            }
        };

        let sql = if term.is_empty() {
            format!("SELECT {COLUMNS} FROM person ORDER BY last_name, first_name")
        } else {
            format!("SELECT {COLUMNS} FROM person WHERE {condition} ORDER BY last_name, first_name")
        };

        let mut query = sqlx::query_as::<_, Person>(&sql);
        if !term.is_empty() {
            query = query.bind(format!("%{term}%"));
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    pub async fn find_one(&self, id: i32) -> Result<Person> {
        let person =
            sqlx::query_as::<_, Person>(&format!("SELECT {COLUMNS} FROM person WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        person.ok_or_else(|| Error::NotFound(format!("person {id} not found")))
    }

    pub async fn create(&self, input: PersonInput) -> Result<Person> {
        let person = sqlx::query_as::<_, Person>(&format!(
            "INSERT INTO person (last_name, first_name, patronymic, sex, birthday, inn, snils, email) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {COLUMNS}"
        ))
        .bind(&input.last_name)
        .bind(&input.first_name)
        .bind(&input.patronymic)
        .bind(&input.sex)
        .bind(input.birthday)
        .bind(input.inn)
        .bind(&input.snils)
        .bind(&input.email)
        .fetch_one(&self.pool)
        .await?;
        Ok(person)
    }

    pub async fn update(&self, id: i32, input: PersonInput) -> Result<Person> {
        let person = sqlx::query_as::<_, Person>(&format!(
            "UPDATE person SET last_name = $2, first_name = $3, patronymic = $4, sex = $5, \
             birthday = $6, inn = $7, snils = $8, email = $9 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(&input.last_name)
        .bind(&input.first_name)
        .bind(&input.patronymic)
        .bind(&input.sex)
        .bind(input.birthday)
        .bind(input.inn)
        .bind(&input.snils)
        .bind(&input.email)
        .fetch_optional(&self.pool)
        .await?;
        person.ok_or_else(|| Error::NotFound(format!("person {id} not found")))
    }

    pub async fn delete(&self, id: i32) -> Result<()> {
        let result = sqlx::query("DELETE FROM person WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("person {id} not found")));
        }
        Ok(())
    }
}
