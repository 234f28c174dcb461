//! Catalog types
//!
//! A [`Catalog`] is an ordered list of [`Table`]s; a table is an ordered list
//! of [`Column`]s sharing a common row count. Columns are shared as
//! `Arc<Column>` so expression trees can reference them without owning them:
//! the catalog's lifetime subsumes every query's lifetime.

use crate::catalog::loader;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use strum_macros::{Display, EnumString};

/// The four primitive column types. Manifest spelling is the lowercase
/// abbreviation (`int`, `lng`, `flt`, `dbl`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum ColumnType {
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "lng")]
    Lng,
    #[strum(serialize = "flt")]
    Flt,
    #[strum(serialize = "dbl")]
    Dbl,
}

impl ColumnType {
    /// On-disk (and in-buffer) size of one element, in bytes.
    pub fn element_size(self) -> usize {
        match self {
            ColumnType::Int | ColumnType::Flt => 4,
            ColumnType::Lng | ColumnType::Dbl => 8,
        }
    }
}

/// A decoded column buffer. Decoding from the raw little-endian file into a
/// typed vector keeps every kernel load naturally aligned.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Int(Vec<i32>),
    Lng(Vec<i64>),
    Flt(Vec<f32>),
    Dbl(Vec<f64>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int(v) => v.len(),
            ColumnData::Lng(v) => v.len(),
            ColumnData::Flt(v) => v.len(),
            ColumnData::Dbl(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn column_type(&self) -> ColumnType {
        match self {
            ColumnData::Int(_) => ColumnType::Int,
            ColumnData::Lng(_) => ColumnType::Lng,
            ColumnData::Flt(_) => ColumnType::Flt,
            ColumnData::Dbl(_) => ColumnType::Dbl,
        }
    }

    /// Base pointer of the typed buffer, as handed to compiled kernels.
    pub fn as_ptr(&self) -> *const u8 {
        match self {
            ColumnData::Int(v) => v.as_ptr() as *const u8,
            ColumnData::Lng(v) => v.as_ptr() as *const u8,
            ColumnData::Flt(v) => v.as_ptr() as *const u8,
            ColumnData::Dbl(v) => v.as_ptr() as *const u8,
        }
    }

    /// Element at `index`, widened to f64 with the same rules the kernels
    /// use: signed int-to-float for integers, FP extension for f32.
    pub fn value_as_f64(&self, index: usize) -> f64 {
        match self {
            ColumnData::Int(v) => v[index] as f64,
            ColumnData::Lng(v) => v[index] as f64,
            ColumnData::Flt(v) => v[index] as f64,
            ColumnData::Dbl(v) => v[index],
        }
    }
}

/// A named, typed, fixed-length column. The buffer starts absent and is
/// decoded from `data_path` on first use; once present it is never reloaded.
#[derive(Debug)]
pub struct Column {
    pub name: String,
    pub ty: ColumnType,
    pub row_count: usize,
    pub data_path: PathBuf,
    data: OnceLock<ColumnData>,
}

impl Column {
    pub fn new(name: String, ty: ColumnType, row_count: usize, data_path: PathBuf) -> Self {
        Self {
            name,
            ty,
            row_count,
            data_path,
            data: OnceLock::new(),
        }
    }

    /// Build a column whose buffer is already resident. Used by in-memory
    /// catalogs in tests; no file backs the data.
    pub fn with_data(name: String, data: ColumnData) -> Self {
        let column = Self {
            name,
            ty: data.column_type(),
            row_count: data.len(),
            data_path: PathBuf::new(),
            data: OnceLock::new(),
        };
        let _ = column.data.set(data);
        column
    }

    pub fn element_size(&self) -> usize {
        self.ty.element_size()
    }

    /// The decoded buffer, if it has been loaded.
    pub fn data(&self) -> Option<&ColumnData> {
        self.data.get()
    }

    /// Return the decoded buffer, reading and decoding the column file first
    /// if it is not yet resident. Loads happen at most once.
    pub fn ensure_loaded(&self) -> Result<&ColumnData, loader::CatalogError> {
        if let Some(data) = self.data.get() {
            return Ok(data);
        }
        let loaded = loader::read_column_data(&self.data_path, self.ty, self.row_count)?;
        Ok(self.data.get_or_init(|| loaded))
    }
}

/// A named, ordered collection of columns with a common row count.
#[derive(Debug)]
pub struct Table {
    pub name: String,
    columns: Vec<Arc<Column>>,
}

impl Table {
    pub fn new(name: String, columns: Vec<Arc<Column>>) -> Self {
        Self { name, columns }
    }

    pub fn column(&self, name: &str) -> Option<&Arc<Column>> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.row_count).unwrap_or(0)
    }
}

/// All tables known to the engine, in registration order.
#[derive(Debug, Default)]
pub struct Catalog {
    tables: Vec<Table>,
}

impl Catalog {
    pub fn new(tables: Vec<Table>) -> Self {
        Self { tables }
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }
}
