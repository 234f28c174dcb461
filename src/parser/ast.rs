//! Expression trees and the parsed query skeleton
//!
//! The tree has three variants: constants, column references, and binary
//! operations. Column references carry an optional binding to a catalog
//! column, filled in by the resolver; equality is syntactic and ignores the
//! binding.

use crate::catalog::Column;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Add,
    Sub,
    Lt,
    Le,
    Eq,
    Ne,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    /// Map a recognized operator lexeme to its kind. `<>` is a spelling of `!=`.
    pub fn from_text(op: &str) -> Option<Self> {
        let kind = match op {
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            "==" => BinaryOp::Eq,
            "!=" | "<>" => BinaryOp::Ne,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            "&&" | "AND" => BinaryOp::And,
            "||" | "OR" => BinaryOp::Or,
            _ => return None,
        };
        Some(kind)
    }

    /// Comparisons produce a boolean flag rather than an f64 scalar.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Constant(f64),
    /// A column reference. `column` is absent until resolution binds it to
    /// the FROM-clause table.
    Column {
        name: String,
        column: Option<Arc<Column>>,
    },
    Binary {
        op: BinaryOp,
        /// Original operator spelling, kept for display (`<>` vs `!=`).
        op_text: String,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Expr::Constant(a), Expr::Constant(b)) => a == b,
            (Expr::Column { name: a, .. }, Expr::Column { name: b, .. }) => a == b,
            (
                Expr::Binary {
                    op: op_a,
                    op_text: text_a,
                    lhs: lhs_a,
                    rhs: rhs_a,
                },
                Expr::Binary {
                    op: op_b,
                    op_text: text_b,
                    lhs: lhs_b,
                    rhs: rhs_b,
                },
            ) => op_a == op_b && text_a == text_b && lhs_a == lhs_b && rhs_a == rhs_b,
            _ => false,
        }
    }
}

impl fmt::Display for Expr {
    /// Fully parenthesized rendering; used for synthesized result column
    /// names and for re-parseable debug output.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(value) => write!(f, "{value}"),
            Expr::Column { name, .. } => write!(f, "{name}"),
            Expr::Binary {
                op_text, lhs, rhs, ..
            } => write!(f, "({lhs} {op_text} {rhs})"),
        }
    }
}

/// The SELECT clause: either a bare `*` or a list of expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectList {
    Star,
    Exprs(Vec<Expr>),
}

/// A parsed query before resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryAst {
    pub select: SelectList,
    pub table: String,
    pub filter: Option<Expr>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str) -> Expr {
        Expr::Column {
            name: name.into(),
            column: None,
        }
    }

    fn binary(op_text: &str, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op: BinaryOp::from_text(op_text).unwrap(),
            op_text: op_text.into(),
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    #[test]
    fn display_is_fully_parenthesized() {
        let expr = binary("*", binary("+", column("x"), column("y")), Expr::Constant(2.0));
        assert_eq!(expr.to_string(), "((x + y) * 2)");
    }

    #[test]
    fn ne_spellings_share_a_kind() {
        assert_eq!(BinaryOp::from_text("!="), Some(BinaryOp::Ne));
        assert_eq!(BinaryOp::from_text("<>"), Some(BinaryOp::Ne));
    }

    #[test]
    fn equality_ignores_resolution_state() {
        let unresolved = column("x");
        let resolved = Expr::Column {
            name: "x".into(),
            column: Some(std::sync::Arc::new(crate::catalog::Column::with_data(
                "x".into(),
                crate::catalog::ColumnData::Dbl(vec![1.0]),
            ))),
        };
        assert_eq!(unresolved, resolved);
    }
}
