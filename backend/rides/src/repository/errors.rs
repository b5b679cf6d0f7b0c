use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Corrupt row: {0}")]
    CorruptRow(String),
    #[error("Not found")]
    NotFound,
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        RepositoryError::DatabaseError(e.to_string())
    }
}
