//! Query parsing
//!
//! Recursive descent over the token stream with precedence climbing for
//! expressions. The grammar is
//!
//! ```text
//! query       := 'SELECT' select_list 'FROM' IDENT ('WHERE' expr)? EOF
//! select_list := '*' | expr (',' expr)*
//! expr        := primary rhs(0)
//! primary     := CONST | IDENT | '(' expr ')'
//! ```
//!
//! All operators are left-associative; WHERE permits exactly one expression.

pub mod ast;
pub mod lexer;

pub use ast::{BinaryOp, Expr, QueryAst, SelectList};
pub use lexer::{Lexer, Token, precedence};

use crate::error::QueryError;

/// Parse one statement into a [`QueryAst`].
pub fn parse(input: &str) -> Result<QueryAst, QueryError> {
    Parser {
        lexer: Lexer::new(input),
    }
    .parse_query()
}

struct Parser {
    lexer: Lexer,
}

impl Parser {
    fn parse_query(&mut self) -> Result<QueryAst, QueryError> {
        match self.lexer.next() {
            Token::Select => {}
            token => return Err(unexpected(token)),
        }
        let select = self.parse_select_list()?;

        match self.lexer.next() {
            Token::From => {}
            token => return Err(unexpected(token)),
        }
        let table = match self.lexer.next() {
            Token::Identifier(name) => name,
            _ => return Err(QueryError::ExpectedTableName),
        };

        let filter = if self.lexer.peek() == Token::Where {
            self.lexer.next();
            let expr = self.parse_expr()?;
            if self.lexer.peek() == Token::Comma {
                return Err(QueryError::CommaInWhere);
            }
            Some(expr)
        } else {
            None
        };

        match self.lexer.next() {
            Token::Eof => {}
            token => return Err(unexpected(token)),
        }

        Ok(QueryAst {
            select,
            table,
            filter,
        })
    }

    fn parse_select_list(&mut self) -> Result<SelectList, QueryError> {
        // A bare `*` right after SELECT means all columns; it arrives as an
        // operator token.
        if let Token::Operator(op) = self.lexer.peek()
            && op.starts_with('*')
        {
            self.lexer.next();
            return Ok(SelectList::Star);
        }

        let mut exprs = vec![self.parse_expr()?];
        while self.lexer.peek() == Token::Comma {
            self.lexer.next();
            exprs.push(self.parse_expr()?);
        }
        Ok(SelectList::Exprs(exprs))
    }

    fn parse_expr(&mut self) -> Result<Expr, QueryError> {
        let lhs = self.parse_primary()?;
        self.parse_rhs(0, lhs)
    }

    fn parse_primary(&mut self) -> Result<Expr, QueryError> {
        match self.lexer.next() {
            Token::Constant(value) => Ok(Expr::Constant(value)),
            Token::Identifier(name) => Ok(Expr::Column { name, column: None }),
            Token::LeftParen => {
                let expr = self.parse_expr()?;
                match self.lexer.next() {
                    Token::RightParen => Ok(expr),
                    _ => Err(QueryError::MissingRightParen),
                }
            }
            token => Err(unexpected(token)),
        }
    }

    /// Precedence climbing: consume operators binding at least as tightly as
    /// `min_prec`, recursing for right-hand sides that bind tighter.
    fn parse_rhs(&mut self, min_prec: u32, mut lhs: Expr) -> Result<Expr, QueryError> {
        loop {
            let Token::Operator(op) = self.lexer.peek() else {
                return Ok(lhs);
            };
            let Some(prec) = precedence(&op) else {
                return Err(QueryError::InvalidToken(op));
            };
            if prec < min_prec {
                return Ok(lhs);
            }
            self.lexer.next();

            let mut rhs = self.parse_primary()?;

            // A tighter-binding operator after the RHS claims it first.
            if let Token::Operator(next_op) = self.lexer.peek()
                && precedence(&next_op).is_some_and(|p| p > prec)
            {
                rhs = self.parse_rhs(prec + 1, rhs)?;
            }

            let Some(kind) = BinaryOp::from_text(&op) else {
                return Err(QueryError::InvalidToken(op));
            };
            lhs = Expr::Binary {
                op: kind,
                op_text: op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            };
        }
    }
}

fn unexpected(token: Token) -> QueryError {
    match token {
        Token::Invalid(text) => QueryError::InvalidToken(text),
        other => QueryError::UnexpectedToken(other.describe().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_single_select(input: &str) -> Expr {
        let ast = parse(input).unwrap();
        match ast.select {
            SelectList::Exprs(mut exprs) => {
                assert_eq!(exprs.len(), 1);
                exprs.remove(0)
            }
            SelectList::Star => panic!("expected expression list"),
        }
    }

    #[test]
    fn parses_the_query_skeleton() {
        let ast = parse("SELECT x, y FROM demo WHERE x > 1;").unwrap();
        assert_eq!(ast.table, "demo");
        assert!(matches!(ast.select, SelectList::Exprs(ref e) if e.len() == 2));
        assert!(ast.filter.is_some());
    }

    #[test]
    fn star_parses_as_all_columns() {
        let ast = parse("SELECT * FROM demo;").unwrap();
        assert_eq!(ast.select, SelectList::Star);
        assert_eq!(ast.filter, None);
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse_single_select("SELECT a + b * c FROM t;");
        assert_eq!(expr.to_string(), "(a + (b * c))");
    }

    #[test]
    fn subtraction_is_left_associative() {
        let expr = parse_single_select("SELECT a - b - c FROM t;");
        assert_eq!(expr.to_string(), "((a - b) - c)");
    }

    #[test]
    fn comparisons_bind_tighter_than_logicals() {
        let expr = parse_single_select("SELECT x >= 2 AND y <= 40 FROM t;");
        assert_eq!(expr.to_string(), "((x >= 2) AND (y <= 40))");
    }

    #[test]
    fn or_binds_loosest() {
        let expr = parse_single_select("SELECT x == 2 OR x == 4 AND y == 1 FROM t;");
        assert_eq!(expr.to_string(), "((x == 2) OR ((x == 4) AND (y == 1)))");
    }

    #[test]
    fn parentheses_override_precedence() {
        let expr = parse_single_select("SELECT (x + y) * 2 FROM t;");
        assert_eq!(expr.to_string(), "((x + y) * 2)");
    }

    #[test]
    fn missing_right_paren_is_an_error() {
        let err = parse("SELECT (x + y FROM t;").unwrap_err();
        assert!(matches!(err, QueryError::MissingRightParen));
    }

    #[test]
    fn missing_table_name_is_an_error() {
        let err = parse("SELECT x FROM 5;").unwrap_err();
        assert!(matches!(err, QueryError::ExpectedTableName));
        let err = parse("SELECT x FROM;").unwrap_err();
        assert!(matches!(err, QueryError::ExpectedTableName));
    }

    #[test]
    fn comma_in_where_is_its_own_error() {
        let err = parse("SELECT x FROM demo WHERE y > 25, x < 4;").unwrap_err();
        assert!(matches!(err, QueryError::CommaInWhere));
        assert_eq!(err.to_string(), "Unexpected comma in WHERE");
    }

    #[test]
    fn keyword_in_wrong_state_is_rejected() {
        let err = parse("FROM demo;").unwrap_err();
        assert!(matches!(err, QueryError::UnexpectedToken(ref t) if t == "FROM"));
        let err = parse("SELECT x WHERE y FROM demo;").unwrap_err();
        assert!(matches!(err, QueryError::UnexpectedToken(ref t) if t == "WHERE"));
    }

    #[test]
    fn invalid_operator_surfaces_as_lex_error() {
        let err = parse("SELECT x >>> 2 FROM demo;").unwrap_err();
        assert!(matches!(err, QueryError::InvalidToken(ref t) if t == ">>>"));
    }

    #[test]
    fn trailing_tokens_after_where_are_rejected() {
        let err = parse("SELECT x FROM demo WHERE x > 1 y;").unwrap_err();
        assert!(matches!(err, QueryError::UnexpectedToken(ref t) if t == "IDENTIFIER"));
    }

    #[test]
    fn ne_spellings_parse_identically_up_to_text() {
        let bang = parse_single_select("SELECT x != 2 FROM t;");
        let angle = parse_single_select("SELECT x <> 2 FROM t;");
        match (&bang, &angle) {
            (Expr::Binary { op: a, .. }, Expr::Binary { op: b, .. }) => {
                assert_eq!(*a, BinaryOp::Ne);
                assert_eq!(*b, BinaryOp::Ne);
            }
            _ => panic!("expected binary expressions"),
        }
    }
}
