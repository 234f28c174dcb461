//! rembrandb: a read-only analytical query engine over a fixed columnar store
//!
//! This library provides the full query pipeline: a small SQL dialect
//! (`SELECT <exprs> FROM <table> [WHERE <expr>]`) is lexed and parsed into an
//! expression tree, column references are bound against an in-memory catalog,
//! each expression is compiled to a native vector-loop kernel with Cranelift,
//! and the kernels are executed once over the referenced column buffers to
//! materialize a result table.

pub mod catalog;
pub mod codegen;
pub mod config;
pub mod engine;
pub mod error;
pub mod jit;
pub mod output;
pub mod parser;
pub mod resolver;

// Re-export commonly used types
pub use catalog::{Catalog, Column, ColumnData, ColumnType, Table};
pub use config::Config;
pub use engine::{Engine, EngineOptions, QueryOutcome, ResultColumn, ResultTable};
pub use error::QueryError;
pub use parser::{BinaryOp, Expr, QueryAst, SelectList};
pub use resolver::{BoundExpr, BoundQuery};
