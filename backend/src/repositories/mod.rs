//! Data access layer
//!
//! Each aggregate has a store trait with a PostgreSQL implementation and an
//! in-memory one (see [`memory`]) that backs router tests and local runs
//! without a database.

pub mod audit;
pub mod document;
pub mod memory;
pub mod tag;
pub mod user;

use thiserror::Error;

pub use audit::{AuditRecord, AuditStore, NewAuditRecord, PgAuditStore};
pub use document::{Document, DocumentStore, NewDocument, PgDocumentStore, ReplacedFile};
pub use memory::MemoryStore;
pub use tag::{PgTagStore, TagStore};
pub use user::{NewUser, PgUserStore, ProfileChanges, UserRecord, UserStore};

/// Postgres SQLSTATE for unique constraint violations
const UNIQUE_VIOLATION: &str = "23505";

/// Repository error type
#[derive(Error, Debug)]
pub enum StoreError {
    /// Email uniqueness was violated by an insert
    #[error("email already registered")]
    DuplicateEmail,

    #[error("{0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Whether `err` is a unique violation on the named constraint
pub(crate) fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some(UNIQUE_VIOLATION) && db.constraint() == Some(constraint)
        }
        _ => false,
    }
}
