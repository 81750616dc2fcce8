//! Database connection and operations
//!
//! Re-exports are provided for convenience, even if not all are used within the crate.

#![allow(unused_imports)]

pub mod authors;
pub mod books;
pub mod borrow_records;
pub mod classifiers;
pub mod copies;
pub mod persons;
pub mod query;
pub mod reports;

use anyhow::Result;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use authors::{Author, AuthorInput, AuthorRepository};
pub use books::{
    Book, BookRepository, BookRow, CopySummary, CreateBook, PubPlaceInput, PublicationPlace,
    UpdateBook,
};
pub use borrow_records::{
    BorrowRecord, BorrowRecordRepository, BorrowedBook, BorrowedCopy, IssueCopy, Loan, StaffUser,
};
pub use classifiers::{
    Bbk, BbkRepository, CodeInput, Grnti, GrntiRepository, Publisher, PublisherInput,
    PublisherRepository, Udc, UdcRepository,
};
pub use copies::{BookCopy, CopyBook, CopyRepository, CopyRow, CopyStatus, CreateCopy, UpdateCopy};
pub use persons::{Person, PersonInput, PersonRepository};
pub use query::{Page, DEFAULT_LIMIT};
pub use reports::{NoCopiesReason, NoCopiesReport, ReportRepository, UdcProvision};

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the maximum connection pool size from environment or default
    fn get_max_connections() -> u32 {
        std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10)
    }

    /// Create a new database connection pool
    pub async fn connect(url: &str) -> Result<Self> {
        let max_connections = Self::get_max_connections();
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Get a book repository
    pub fn books(&self) -> BookRepository {
        BookRepository::new(self.pool.clone())
    }

    /// Get a book copy repository
    pub fn copies(&self) -> CopyRepository {
        CopyRepository::new(self.pool.clone())
    }

    /// Get a borrow record repository
    pub fn borrow_records(&self) -> BorrowRecordRepository {
        BorrowRecordRepository::new(self.pool.clone())
    }

    /// Get an author repository
    pub fn authors(&self) -> AuthorRepository {
        AuthorRepository::new(self.pool.clone())
    }

    /// Get a BBK classifier repository
    pub fn bbks(&self) -> BbkRepository {
        BbkRepository::new(self.pool.clone())
    }

    /// Get a UDC classifier repository
    pub fn udcs(&self) -> UdcRepository {
        UdcRepository::new(self.pool.clone())
    }

    /// Get a GRNTI classifier repository
    pub fn grntis(&self) -> GrntiRepository {
        GrntiRepository::new(self.pool.clone())
    }

    /// Get a publisher repository
    pub fn publishers(&self) -> PublisherRepository {
        PublisherRepository::new(self.pool.clone())
    }

    /// Get a person (reader) repository
    pub fn persons(&self) -> PersonRepository {
        PersonRepository::new(self.pool.clone())
    }

    /// Get a reports repository
    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone())
    }
}
