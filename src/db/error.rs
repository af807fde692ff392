use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Record not found")]
    NotFound,

    #[error("Conditional update affected no rows")]
    Conflict,

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
