//! Query-local error type
//!
//! Every failure that belongs to a single query surfaces as a [`QueryError`]:
//! the REPL prints its one-line message to stderr and returns to the prompt.
//! Catalog loading at startup uses [`crate::catalog::CatalogError`] directly
//! and is fatal there; the same error during lazy column loading is wrapped
//! here and stays query-local.

use crate::catalog::CatalogError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    /// An operator run or stray character the lexer does not recognize.
    #[error("Unrecognized token {0:?}")]
    InvalidToken(String),

    /// A token that is valid on its own but wrong for the current parse state.
    /// Carries the token description (e.g. `OPERATOR`, `FROM`, `;`).
    #[error("Unexpected token {0}")]
    UnexpectedToken(String),

    #[error("Expected right parenthesis")]
    MissingRightParen,

    #[error("Expected table name after FROM")]
    ExpectedTableName,

    /// WHERE takes exactly one expression; a comma there is its own error.
    #[error("Unexpected comma in WHERE")]
    CommaInWhere,

    #[error("Unrecognized table {0}")]
    UnknownTable(String),

    #[error("Unrecognized column name {0}")]
    UnknownColumn(String),

    /// Column buffer load failure during resolution.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The IR verifier rejected a generated kernel.
    #[error("kernel verification failed: {0}")]
    Verify(String),

    /// Declaring, defining or linking a kernel failed.
    #[error("kernel compilation failed: {0}")]
    Codegen(String),
}
