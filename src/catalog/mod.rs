//! Column-store catalog
//!
//! Tables are described by text manifests (`<dir>/<table>.tbl`, one
//! `name type length` line per column) and backed by raw little-endian
//! column files (`<dir>/<table>/<column>.col`). The catalog is built once at
//! startup and never mutated; column buffers are decoded lazily, at most
//! once, and stay resident for the process lifetime.

pub mod loader;
pub mod types;

pub use loader::{CatalogError, load};
pub use types::{Catalog, Column, ColumnData, ColumnType, Table};
