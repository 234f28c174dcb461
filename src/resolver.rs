//! Column-reference resolution
//!
//! Walks each expression tree depth-first, left to right, binding every
//! column reference to the FROM-clause table and recording each distinct
//! column on first encounter. Binding triggers the column's (at most once)
//! buffer load. The per-expression list fixes the packing order of the
//! kernel's `inputs` argument; the query-wide list is the union of the
//! SELECT lists in order followed by the filter's list.

use crate::catalog::{Column, Table};
use crate::error::QueryError;
use crate::parser::{Expr, QueryAst, SelectList};
use std::sync::Arc;

/// One expression together with its ordered, deduplicated used-column list.
#[derive(Debug)]
pub struct BoundExpr {
    pub expr: Expr,
    pub inputs: Vec<Arc<Column>>,
}

/// A fully resolved query, ready for code generation.
#[derive(Debug)]
pub struct BoundQuery {
    pub table: String,
    pub select: Vec<BoundExpr>,
    pub filter: Option<BoundExpr>,
    /// Query-wide used-column union in first-visit order.
    pub used_columns: Vec<Arc<Column>>,
    pub row_count: usize,
}

/// Resolve a parsed query against its FROM-clause table.
///
/// `SELECT *` expands to one column reference per table column, in table
/// order. Resolution is idempotent: re-binding writes the same `Arc` and
/// buffers load at most once.
pub fn resolve(ast: QueryAst, table: &Table) -> Result<BoundQuery, QueryError> {
    let exprs = match ast.select {
        SelectList::Star => table
            .columns()
            .iter()
            .map(|c| Expr::Column {
                name: c.name.clone(),
                column: None,
            })
            .collect(),
        SelectList::Exprs(exprs) => exprs,
    };

    let mut used_columns: Vec<Arc<Column>> = Vec::new();
    let mut select = Vec::with_capacity(exprs.len());
    for mut expr in exprs {
        let mut inputs = Vec::new();
        bind(&mut expr, table, &mut inputs)?;
        merge(&mut used_columns, &inputs);
        select.push(BoundExpr { expr, inputs });
    }

    let filter = match ast.filter {
        Some(mut expr) => {
            let mut inputs = Vec::new();
            bind(&mut expr, table, &mut inputs)?;
            merge(&mut used_columns, &inputs);
            Some(BoundExpr { expr, inputs })
        }
        None => None,
    };

    Ok(BoundQuery {
        table: ast.table,
        select,
        filter,
        used_columns,
        row_count: table.row_count(),
    })
}

fn bind(expr: &mut Expr, table: &Table, inputs: &mut Vec<Arc<Column>>) -> Result<(), QueryError> {
    match expr {
        Expr::Constant(_) => Ok(()),
        Expr::Column { name, column } => {
            let found = table
                .column(name)
                .ok_or_else(|| QueryError::UnknownColumn(name.clone()))?;
            found.ensure_loaded()?;
            *column = Some(Arc::clone(found));
            if !inputs.iter().any(|c| Arc::ptr_eq(c, found)) {
                inputs.push(Arc::clone(found));
            }
            Ok(())
        }
        Expr::Binary { lhs, rhs, .. } => {
            bind(lhs, table, inputs)?;
            bind(rhs, table, inputs)
        }
    }
}

fn merge(union: &mut Vec<Arc<Column>>, inputs: &[Arc<Column>]) {
    for column in inputs {
        if !union.iter().any(|c| Arc::ptr_eq(c, column)) {
            union.push(Arc::clone(column));
        }
    }
}
