//! Manifest parsing and column-file decoding
//!
//! A `.tbl` manifest holds one whitespace-separated `name type length` line
//! per column. The matching `.col` file is a raw little-endian array of
//! exactly `length * element_size` bytes. Manifests are read eagerly at
//! startup; column files are read on first reference.

use crate::catalog::types::{Catalog, Column, ColumnData, ColumnType, Table};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unable to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed manifest line {line} in {path}: {message}")]
    Manifest {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("unable to open file {0}")]
    MissingColumnFile(PathBuf),

    #[error("read incorrect number of bytes from {path}, expected {expected} but read {actual}")]
    ShortRead {
        path: PathBuf,
        expected: usize,
        actual: usize,
    },

    #[error("invalid table {table}: {message}")]
    Validation { table: String, message: String },
}

/// Load a catalog from `dir`. Required tables must load; optional tables
/// with no manifest are skipped, any other failure still propagates.
pub fn load(dir: &Path, required: &[String], optional: &[String]) -> Result<Catalog, CatalogError> {
    let mut tables = Vec::new();
    for name in required {
        tables.push(read_table(dir, name)?);
    }
    for name in optional {
        if !dir.join(format!("{name}.tbl")).is_file() {
            log::debug!("optional table {name} not present, skipping");
            continue;
        }
        tables.push(read_table(dir, name)?);
    }
    Ok(Catalog::new(tables))
}

/// Parse one table manifest and verify that every column file exists.
/// Column data itself is not read here.
pub fn read_table(dir: &Path, table_name: &str) -> Result<Table, CatalogError> {
    let manifest_path = dir.join(format!("{table_name}.tbl"));
    let manifest = fs::read_to_string(&manifest_path).map_err(|source| CatalogError::Io {
        path: manifest_path.clone(),
        source,
    })?;

    let mut columns: Vec<Arc<Column>> = Vec::new();
    for (idx, raw_line) in manifest.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let &[name, type_text, length_text] = fields.as_slice() else {
            return Err(CatalogError::Manifest {
                path: manifest_path.clone(),
                line: line_no,
                message: format!("expected `name type length`, got {} fields", fields.len()),
            });
        };
        let ty: ColumnType = type_text.parse().map_err(|_| CatalogError::Manifest {
            path: manifest_path.clone(),
            line: line_no,
            message: format!("unknown column type {type_text:?}"),
        })?;
        let row_count: usize = length_text.parse().map_err(|_| CatalogError::Manifest {
            path: manifest_path.clone(),
            line: line_no,
            message: format!("invalid length {length_text:?}"),
        })?;

        let data_path = dir.join(table_name).join(format!("{name}.col"));
        if !data_path.is_file() {
            return Err(CatalogError::MissingColumnFile(data_path));
        }
        columns.push(Arc::new(Column::new(
            name.to_string(),
            ty,
            row_count,
            data_path,
        )));
    }

    if let Some(first) = columns.first()
        && let Some(bad) = columns.iter().find(|c| c.row_count != first.row_count)
    {
        return Err(CatalogError::Validation {
            table: table_name.to_string(),
            message: format!(
                "column {} has {} rows but {} has {}",
                bad.name, bad.row_count, first.name, first.row_count
            ),
        });
    }

    Ok(Table::new(table_name.to_string(), columns))
}

/// Read and decode one column file. The byte length must match the declared
/// row count exactly.
pub(crate) fn read_column_data(
    path: &Path,
    ty: ColumnType,
    row_count: usize,
) -> Result<ColumnData, CatalogError> {
    let bytes = fs::read(path).map_err(|source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let expected = row_count * ty.element_size();
    if bytes.len() != expected {
        return Err(CatalogError::ShortRead {
            path: path.to_path_buf(),
            expected,
            actual: bytes.len(),
        });
    }
    Ok(decode(&bytes, ty))
}

fn decode(bytes: &[u8], ty: ColumnType) -> ColumnData {
    match ty {
        ColumnType::Int => ColumnData::Int(
            bytes
                .chunks_exact(4)
                .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        ColumnType::Lng => ColumnData::Lng(
            bytes
                .chunks_exact(8)
                .map(|c| i64::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        ColumnType::Flt => ColumnData::Flt(
            bytes
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
        ColumnType::Dbl => ColumnData::Dbl(
            bytes
                .chunks_exact(8)
                .map(|c| f64::from_le_bytes(c.try_into().unwrap()))
                .collect(),
        ),
    }
}
