//! Expression-to-IR lowering
//!
//! Every kernel is one function with the signature
//! `(result: *mut f64, row_count: i64, inputs: *const *const u8)` containing a
//! canonical counted loop. The block layout is fixed:
//! `entry → header → body → inc → header … → exit`, with the loop index
//! carried as a block parameter. The entry block loads one base pointer per
//! used column from the `inputs` array; the body evaluates the expression for
//! row `i` and stores an f64 densely into `result[i]`.
//!
//! All arithmetic happens in f64; narrower column loads widen on read
//! (FP-extend for f32, signed int-to-float for integers). Comparisons produce
//! boolean flags; logical operators combine flags bitwise, coercing any
//! arithmetic operand through `!= 0.0` first, and a flag that reaches the
//! result store widens back to 0.0/1.0.

use crate::catalog::{Column, ColumnType};
use crate::parser::{BinaryOp, Expr};
use cranelift::prelude::*;
use std::sync::Arc;

/// A lowered expression value: an f64 scalar or an i8 boolean flag.
enum EmittedValue {
    Scalar(Value),
    Flag(Value),
}

/// Emit the full kernel body for `expr` into `builder`. `inputs` fixes the
/// packing order of the kernel's third argument; every column reference in
/// `expr` must be bound to one of its entries.
pub fn emit_kernel(
    builder: &mut FunctionBuilder,
    ptr_type: Type,
    expr: &Expr,
    inputs: &[Arc<Column>],
) {
    let entry = builder.create_block();
    let header = builder.create_block();
    let body = builder.create_block();
    let inc = builder.create_block();
    let exit = builder.create_block();

    builder.append_block_params_for_function_params(entry);
    builder.append_block_param(header, types::I64);
    builder.append_block_param(body, types::I64);
    builder.append_block_param(inc, types::I64);

    builder.switch_to_block(entry);
    let result_ptr = builder.block_params(entry)[0];
    let row_count = builder.block_params(entry)[1];
    let input_ptrs = builder.block_params(entry)[2];
    let bases: Vec<Value> = (0..inputs.len())
        .map(|k| {
            builder.ins().load(
                ptr_type,
                MemFlags::trusted(),
                input_ptrs,
                (k * ptr_type.bytes() as usize) as i32,
            )
        })
        .collect();
    let zero = builder.ins().iconst(types::I64, 0);
    builder.ins().jump(header, &[zero]);
    builder.seal_block(entry);

    builder.switch_to_block(header);
    let index = builder.block_params(header)[0];
    let in_bounds = builder
        .ins()
        .icmp(IntCC::SignedLessThan, index, row_count);
    builder.ins().brif(in_bounds, body, &[index], exit, &[]);

    builder.switch_to_block(body);
    let index = builder.block_params(body)[0];
    let value = emit_expr(builder, expr, inputs, &bases, index);
    let value = as_scalar(builder, value);
    let offset = builder.ins().imul_imm(index, 8);
    let slot = builder.ins().iadd(result_ptr, offset);
    builder.ins().store(MemFlags::trusted(), value, slot, 0);
    builder.ins().jump(inc, &[index]);
    builder.seal_block(body);

    builder.switch_to_block(inc);
    let index = builder.block_params(inc)[0];
    let next = builder.ins().iadd_imm(index, 1);
    builder.ins().jump(header, &[next]);
    builder.seal_block(inc);
    builder.seal_block(header);

    builder.switch_to_block(exit);
    builder.ins().return_(&[]);
    builder.seal_block(exit);
}

fn emit_expr(
    builder: &mut FunctionBuilder,
    expr: &Expr,
    inputs: &[Arc<Column>],
    bases: &[Value],
    index: Value,
) -> EmittedValue {
    match expr {
        Expr::Constant(value) => EmittedValue::Scalar(builder.ins().f64const(*value)),
        Expr::Column { column, .. } => {
            let column = column
                .as_ref()
                .expect("column reference bound before code generation");
            let slot = inputs
                .iter()
                .position(|c| Arc::ptr_eq(c, column))
                .expect("bound column present in kernel inputs");
            let offset = builder
                .ins()
                .imul_imm(index, column.element_size() as i64);
            let addr = builder.ins().iadd(bases[slot], offset);
            let value = match column.ty {
                ColumnType::Int => {
                    let raw = builder.ins().load(types::I32, MemFlags::trusted(), addr, 0);
                    builder.ins().fcvt_from_sint(types::F64, raw)
                }
                ColumnType::Lng => {
                    let raw = builder.ins().load(types::I64, MemFlags::trusted(), addr, 0);
                    builder.ins().fcvt_from_sint(types::F64, raw)
                }
                ColumnType::Flt => {
                    let raw = builder.ins().load(types::F32, MemFlags::trusted(), addr, 0);
                    builder.ins().fpromote(types::F64, raw)
                }
                ColumnType::Dbl => builder.ins().load(types::F64, MemFlags::trusted(), addr, 0),
            };
            EmittedValue::Scalar(value)
        }
        Expr::Binary { op, lhs, rhs, .. } => {
            let lhs = emit_expr(builder, lhs, inputs, bases, index);
            let rhs = emit_expr(builder, rhs, inputs, bases, index);
            match op {
                BinaryOp::Mul => {
                    let (l, r) = scalar_pair(builder, lhs, rhs);
                    EmittedValue::Scalar(builder.ins().fmul(l, r))
                }
                BinaryOp::Div => {
                    let (l, r) = scalar_pair(builder, lhs, rhs);
                    EmittedValue::Scalar(builder.ins().fdiv(l, r))
                }
                BinaryOp::Add => {
                    let (l, r) = scalar_pair(builder, lhs, rhs);
                    EmittedValue::Scalar(builder.ins().fadd(l, r))
                }
                BinaryOp::Sub => {
                    let (l, r) = scalar_pair(builder, lhs, rhs);
                    EmittedValue::Scalar(builder.ins().fsub(l, r))
                }
                BinaryOp::Lt => emit_compare(builder, FloatCC::LessThan, lhs, rhs),
                BinaryOp::Le => emit_compare(builder, FloatCC::LessThanOrEqual, lhs, rhs),
                BinaryOp::Eq => emit_compare(builder, FloatCC::Equal, lhs, rhs),
                BinaryOp::Ne => emit_compare(builder, FloatCC::OrderedNotEqual, lhs, rhs),
                BinaryOp::Gt => emit_compare(builder, FloatCC::GreaterThan, lhs, rhs),
                BinaryOp::Ge => emit_compare(builder, FloatCC::GreaterThanOrEqual, lhs, rhs),
                BinaryOp::And => {
                    let l = as_flag(builder, lhs);
                    let r = as_flag(builder, rhs);
                    EmittedValue::Flag(builder.ins().band(l, r))
                }
                BinaryOp::Or => {
                    let l = as_flag(builder, lhs);
                    let r = as_flag(builder, rhs);
                    EmittedValue::Flag(builder.ins().bor(l, r))
                }
            }
        }
    }
}

fn emit_compare(
    builder: &mut FunctionBuilder,
    cc: FloatCC,
    lhs: EmittedValue,
    rhs: EmittedValue,
) -> EmittedValue {
    let (l, r) = scalar_pair(builder, lhs, rhs);
    EmittedValue::Flag(builder.ins().fcmp(cc, l, r))
}

fn scalar_pair(
    builder: &mut FunctionBuilder,
    lhs: EmittedValue,
    rhs: EmittedValue,
) -> (Value, Value) {
    let l = as_scalar(builder, lhs);
    let r = as_scalar(builder, rhs);
    (l, r)
}

/// Widen a boolean flag to f64 0.0/1.0; scalars pass through.
fn as_scalar(builder: &mut FunctionBuilder, value: EmittedValue) -> Value {
    match value {
        EmittedValue::Scalar(v) => v,
        EmittedValue::Flag(v) => {
            let wide = builder.ins().uextend(types::I32, v);
            builder.ins().fcvt_from_uint(types::F64, wide)
        }
    }
}

/// Coerce a scalar to a boolean flag via `!= 0.0`; flags pass through.
fn as_flag(builder: &mut FunctionBuilder, value: EmittedValue) -> Value {
    match value {
        EmittedValue::Flag(v) => v,
        EmittedValue::Scalar(v) => {
            let zero = builder.ins().f64const(0.0);
            builder.ins().fcmp(FloatCC::NotEqual, v, zero)
        }
    }
}
