//! JIT host
//!
//! [`KernelJit`] owns one query's module lifecycle: a fresh `JITModule` and
//! codegen context per query, so kernel names can never collide across
//! queries. `compile` lowers one expression, runs the IR verifier, and
//! defines the function; `finalize` links everything into the resident
//! image; `kernel` looks up a finished function as a [`Kernel`] handle that
//! borrows the jit, so compiled code cannot outlive its module. Executable
//! memory is released when the `KernelJit` drops.
//!
//! `Kernel::run` is the single unsafe boundary of the crate: it packs the
//! column base pointers in kernel input order, allocates the f64 result
//! buffer, and calls the native function.

use crate::catalog::Column;
use crate::codegen::emit_kernel;
use crate::error::QueryError;
use crate::parser::Expr;
use cranelift::codegen::isa::OwnedTargetIsa;
use cranelift::codegen::verifier::verify_function;
use cranelift::codegen::{CodegenError, Context};
use cranelift::prelude::*;
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{FuncId, Linkage, Module, ModuleError, default_libcall_names};
use std::marker::PhantomData;
use std::sync::Arc;

/// Native signature shared by every compiled kernel: the kernel reads
/// `inputs[k]` as a typed column base pointer, computes its expression for
/// rows `0..row_count`, and writes f64 outputs densely into `result`.
type KernelFn = unsafe extern "C" fn(*mut f64, i64, *const *const u8);

pub struct KernelJit {
    // Taken in drop so executable memory can be freed.
    module: Option<JITModule>,
    ctx: Context,
    builder_ctx: FunctionBuilderContext,
    dump_ir: bool,
}

impl KernelJit {
    pub fn new(isa: OwnedTargetIsa, dump_ir: bool) -> Self {
        let module = JITModule::new(JITBuilder::with_isa(isa, default_libcall_names()));
        let ctx = module.make_context();
        Self {
            module: Some(module),
            ctx,
            builder_ctx: FunctionBuilderContext::new(),
            dump_ir,
        }
    }

    fn module(&self) -> &JITModule {
        self.module.as_ref().expect("module present until drop")
    }

    /// Lower `expr` into a kernel named `name` and define it in the module.
    /// `inputs` fixes the packing order the caller must use at invocation.
    pub fn compile(
        &mut self,
        name: &str,
        expr: &Expr,
        inputs: &[Arc<Column>],
    ) -> Result<FuncId, QueryError> {
        let ptr_type = self.module().target_config().pointer_type();
        let mut signature = self.module().make_signature();
        signature.params.push(AbiParam::new(ptr_type)); // result buffer
        signature.params.push(AbiParam::new(types::I64)); // row count
        signature.params.push(AbiParam::new(ptr_type)); // packed input pointers

        self.ctx.clear();
        self.ctx.func.signature = signature;
        {
            let mut builder = FunctionBuilder::new(&mut self.ctx.func, &mut self.builder_ctx);
            emit_kernel(&mut builder, ptr_type, expr, inputs);
            builder.finalize();
        }

        let module = self.module.as_mut().expect("module present until drop");
        verify_function(&self.ctx.func, module.isa())
            .map_err(|errors| QueryError::Verify(errors.to_string()))?;
        if self.dump_ir {
            println!("{}", self.ctx.func.display());
        }

        let id = module
            .declare_function(name, Linkage::Export, &self.ctx.func.signature)
            .map_err(compile_error)?;
        module.define_function(id, &mut self.ctx).map_err(compile_error)?;
        log::debug!("defined kernel {name} over {} input column(s)", inputs.len());
        Ok(id)
    }

    /// Link every defined kernel into the executable image.
    pub fn finalize(&mut self) -> Result<(), QueryError> {
        self.module
            .as_mut()
            .expect("module present until drop")
            .finalize_definitions()
            .map_err(compile_error)
    }

    /// Look up a finalized kernel. Calling this before [`finalize`] is a
    /// programmer error.
    ///
    /// [`finalize`]: KernelJit::finalize
    pub fn kernel(&self, id: FuncId) -> Kernel<'_> {
        Kernel {
            entry: self.module().get_finalized_function(id),
            _jit: PhantomData,
        }
    }
}

impl Drop for KernelJit {
    fn drop(&mut self) {
        if let Some(module) = self.module.take() {
            // Safety: `Kernel` handles borrow this jit, so none can still
            // reference the module's code once drop runs.
            unsafe { module.free_memory() };
        }
    }
}

fn compile_error(err: ModuleError) -> QueryError {
    match err {
        ModuleError::Compilation(CodegenError::Verifier(errors)) => {
            QueryError::Verify(errors.to_string())
        }
        other => QueryError::Codegen(other.to_string()),
    }
}

/// A finalized kernel, valid as long as its owning [`KernelJit`].
pub struct Kernel<'jit> {
    entry: *const u8,
    _jit: PhantomData<&'jit KernelJit>,
}

impl Kernel<'_> {
    /// Invoke the kernel over `row_count` rows. `inputs` must be the same
    /// columns, in the same order, that the kernel was compiled with, and
    /// every buffer must already be resident (the resolver guarantees both).
    pub fn run(&self, row_count: usize, inputs: &[Arc<Column>]) -> Vec<f64> {
        let input_ptrs: Vec<*const u8> = inputs
            .iter()
            .map(|column| {
                let data = column
                    .data()
                    .expect("column buffer loaded during resolution");
                assert!(
                    data.len() >= row_count,
                    "column {} holds {} rows, kernel needs {row_count}",
                    column.name,
                    data.len()
                );
                data.as_ptr()
            })
            .collect();

        let mut result = vec![0.0f64; row_count];
        // Safety: the kernel was compiled against exactly this signature;
        // `result` has `row_count` slots and each input pointer addresses at
        // least `row_count` elements of the type the kernel loads.
        unsafe {
            let kernel: KernelFn = std::mem::transmute(self.entry);
            kernel(result.as_mut_ptr(), row_count as i64, input_ptrs.as_ptr());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnData;
    use crate::engine::host_isa;
    use crate::parser::BinaryOp;

    fn jit() -> KernelJit {
        KernelJit::new(host_isa(false).expect("host isa"), false)
    }

    fn column_expr(name: &str, data: ColumnData) -> (Expr, Arc<Column>) {
        let column = Arc::new(Column::with_data(name.into(), data));
        let expr = Expr::Column {
            name: name.into(),
            column: Some(Arc::clone(&column)),
        };
        (expr, column)
    }

    fn binary(op_text: &str, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op: BinaryOp::from_text(op_text).unwrap(),
            op_text: op_text.into(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    fn compile_and_run(expr: &Expr, inputs: &[Arc<Column>], rows: usize) -> Vec<f64> {
        let mut jit = jit();
        let id = jit.compile("kernel", expr, inputs).unwrap();
        jit.finalize().unwrap();
        jit.kernel(id).run(rows, inputs)
    }

    #[test]
    fn constant_kernel_fills_every_row() {
        let out = compile_and_run(&Expr::Constant(2.5), &[], 4);
        assert_eq!(out, vec![2.5; 4]);
    }

    #[test]
    fn integer_columns_widen_with_signed_semantics() {
        let (expr, column) = column_expr("i", ColumnData::Int(vec![-3, 0, 7]));
        let out = compile_and_run(&expr, &[Arc::clone(&column)], 3);
        assert_eq!(out, vec![-3.0, 0.0, 7.0]);

        let (expr, column) = column_expr("l", ColumnData::Lng(vec![-(1 << 40), 5]));
        let out = compile_and_run(&expr, &[Arc::clone(&column)], 2);
        assert_eq!(out, vec![-(1i64 << 40) as f64, 5.0]);
    }

    #[test]
    fn float_column_promotes_to_double() {
        let (expr, column) = column_expr("f", ColumnData::Flt(vec![1.5, -2.25]));
        let out = compile_and_run(&expr, &[Arc::clone(&column)], 2);
        assert_eq!(out, vec![1.5, -2.25]);
    }

    #[test]
    fn arithmetic_runs_in_f64() {
        let (x, col_x) = column_expr("x", ColumnData::Dbl(vec![1.0, 2.0, 3.0]));
        let (y, col_y) = column_expr("y", ColumnData::Dbl(vec![10.0, 20.0, 30.0]));
        let expr = binary("*", binary("+", x, y), Expr::Constant(2.0));
        let out = compile_and_run(&expr, &[col_x, col_y], 3);
        assert_eq!(out, vec![22.0, 44.0, 66.0]);
    }

    #[test]
    fn comparison_kernel_produces_zero_one_mask() {
        let (y, column) = column_expr("y", ColumnData::Dbl(vec![10.0, 30.0, 50.0]));
        let expr = binary(">", y, Expr::Constant(25.0));
        let out = compile_and_run(&expr, &[column], 3);
        assert_eq!(out, vec![0.0, 1.0, 1.0]);
    }

    #[test]
    fn logical_operators_combine_masks() {
        let (x, col_x) = column_expr("x", ColumnData::Dbl(vec![1.0, 2.0, 3.0, 4.0]));
        let (y, col_y) = column_expr("y", ColumnData::Dbl(vec![10.0, 20.0, 30.0, 40.0]));
        let expr = binary(
            "AND",
            binary(">=", x, Expr::Constant(2.0)),
            binary("<=", y, Expr::Constant(30.0)),
        );
        let out = compile_and_run(&expr, &[col_x, col_y], 4);
        assert_eq!(out, vec![0.0, 1.0, 1.0, 0.0]);
    }

    #[test]
    fn logical_operands_coerce_through_nonzero() {
        // `x AND 1` treats the raw column as a truth value.
        let (x, column) = column_expr("x", ColumnData::Dbl(vec![0.0, 3.0]));
        let expr = binary("AND", x, Expr::Constant(1.0));
        let out = compile_and_run(&expr, &[column], 2);
        assert_eq!(out, vec![0.0, 1.0]);
    }

    #[test]
    fn flag_feeding_arithmetic_widens_to_f64() {
        // `(x > 1) + 1` is 1.0 or 2.0 per row.
        let (x, column) = column_expr("x", ColumnData::Dbl(vec![0.0, 2.0]));
        let expr = binary("+", binary(">", x, Expr::Constant(1.0)), Expr::Constant(1.0));
        let out = compile_and_run(&expr, &[column], 2);
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn zero_rows_runs_without_touching_buffers() {
        let (expr, column) = column_expr("x", ColumnData::Dbl(vec![]));
        let out = compile_and_run(&expr, &[column], 0);
        assert!(out.is_empty());
    }

    #[test]
    fn kernels_share_a_module_per_query() {
        let (x, col_x) = column_expr("x", ColumnData::Dbl(vec![1.0, 2.0]));
        let mut jit = jit();
        let first = jit.compile("select_0", &x, &[Arc::clone(&col_x)]).unwrap();
        let second = jit
            .compile(
                "select_1",
                &binary("+", x, Expr::Constant(1.0)),
                &[Arc::clone(&col_x)],
            )
            .unwrap();
        jit.finalize().unwrap();
        assert_eq!(jit.kernel(first).run(2, &[Arc::clone(&col_x)]), vec![1.0, 2.0]);
        assert_eq!(jit.kernel(second).run(2, &[col_x]), vec![2.0, 3.0]);
    }
}
