//! Query engine
//!
//! [`Engine`] gathers the state the pipeline needs — the catalog, the native
//! target description, and the execution options — into one value created at
//! startup and passed explicitly to each query. `execute` drives a statement
//! through the whole pipeline: parse → resolve → per-expression kernel
//! compilation in a fresh JIT module → mask run → select runs → result
//! assembly. Everything per-query (AST, module, result buffers) is released
//! when the call returns; column buffers stay with the catalog.

use crate::catalog::Catalog;
use crate::error::QueryError;
use crate::jit::KernelJit;
use crate::parser;
use crate::resolver;
use cranelift::codegen::isa::OwnedTargetIsa;
use cranelift::prelude::{Configurable, settings};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Failures constructing the engine itself. Query-local failures are
/// [`QueryError`] instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("host target not supported: {0}")]
    HostTarget(String),

    #[error("invalid codegen settings: {0}")]
    Settings(#[from] settings::SetError),

    #[error("failed to construct target ISA: {0}")]
    Isa(#[from] cranelift::codegen::CodegenError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    /// Run the optimizing pipeline on generated kernels.
    pub optimize: bool,
    /// Print each kernel's IR during compilation.
    pub dump_ir: bool,
}

/// One materialized output column; kernels always produce f64.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultColumn {
    pub name: String,
    pub values: Vec<f64>,
}

/// A freshly owned result table, same shape for every query.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub name: String,
    pub columns: Vec<ResultColumn>,
}

impl ResultTable {
    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.values.len()).unwrap_or(0)
    }
}

/// A completed query: the result table plus wall-clock phase timings.
#[derive(Debug)]
pub struct QueryOutcome {
    pub table: ResultTable,
    pub compile_time: Duration,
    pub run_time: Duration,
}

pub struct Engine {
    catalog: Catalog,
    isa: OwnedTargetIsa,
    options: EngineOptions,
}

impl Engine {
    pub fn new(catalog: Catalog, options: EngineOptions) -> Result<Self, EngineError> {
        let isa = host_isa(options.optimize)?;
        Ok(Self {
            catalog,
            isa,
            options,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Run one statement to completion.
    ///
    /// The WHERE predicate compiles as its own kernel whose output is a
    /// 0.0/1.0 mask; each SELECT kernel runs over all rows and its output is
    /// compacted by the mask, so the result holds exactly the qualifying
    /// rows in original row order.
    pub fn execute(&self, statement: &str) -> Result<QueryOutcome, QueryError> {
        let compile_start = Instant::now();
        let ast = parser::parse(statement)?;
        let table = self
            .catalog
            .table(&ast.table)
            .ok_or_else(|| QueryError::UnknownTable(ast.table.clone()))?;
        let bound = resolver::resolve(ast, table)?;

        let mut jit = KernelJit::new(self.isa.clone(), self.options.dump_ir);
        let mut select_ids = Vec::with_capacity(bound.select.len());
        for (i, select) in bound.select.iter().enumerate() {
            select_ids.push(jit.compile(&format!("select_{i}"), &select.expr, &select.inputs)?);
        }
        let filter_id = match &bound.filter {
            Some(filter) => Some(jit.compile("filter", &filter.expr, &filter.inputs)?),
            None => None,
        };
        jit.finalize()?;
        let compile_time = compile_start.elapsed();

        let run_start = Instant::now();
        let rows = bound.row_count;
        let mask = bound
            .filter
            .as_ref()
            .zip(filter_id)
            .map(|(filter, id)| jit.kernel(id).run(rows, &filter.inputs));

        let mut columns = Vec::with_capacity(bound.select.len());
        for (select, id) in bound.select.iter().zip(select_ids) {
            let values = jit.kernel(id).run(rows, &select.inputs);
            let values = match &mask {
                Some(mask) => filter_rows(values, mask),
                None => values,
            };
            columns.push(ResultColumn {
                name: select.expr.to_string(),
                values,
            });
        }
        let run_time = run_start.elapsed();
        log::debug!(
            "query over {}: {} kernel(s) compiled in {compile_time:?}, ran in {run_time:?}",
            bound.table,
            columns.len() + usize::from(mask.is_some()),
        );

        Ok(QueryOutcome {
            table: ResultTable {
                name: "Result Table".to_string(),
                columns,
            },
            compile_time,
            run_time,
        })
    }
}

/// Keep the rows whose mask entry is non-zero, preserving input order.
fn filter_rows(values: Vec<f64>, mask: &[f64]) -> Vec<f64> {
    values
        .into_iter()
        .zip(mask)
        .filter_map(|(value, m)| (*m != 0.0).then_some(value))
        .collect()
}

/// Build the native target description. The optimization toggle is baked
/// into the ISA flags, so it is fixed at engine construction.
pub(crate) fn host_isa(optimize: bool) -> Result<OwnedTargetIsa, EngineError> {
    let mut flags = settings::builder();
    flags.set("use_colocated_libcalls", "false")?;
    flags.set("is_pic", "false")?;
    flags.set("enable_verifier", "true")?;
    flags.set("opt_level", if optimize { "speed" } else { "none" })?;
    let isa_builder =
        cranelift_native::builder().map_err(|msg| EngineError::HostTarget(msg.to_string()))?;
    Ok(isa_builder.finish(settings::Flags::new(flags))?)
}
