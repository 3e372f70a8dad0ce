// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Recursive-descent parser for console input lines.
// Author: Lukas Bower

use crate::error::EvalError;

use super::ast::{BinOp, CmpOp, Expr, Stmt, UnaryOp};
use super::lexer::{tokenize, Tok, Token};

/// Deepest expression nesting a line may use, counting brackets, unary
/// operators and chained operations.
pub const MAX_NESTING: usize = 100;

/// Parse one input line into a statement.
pub(crate) fn parse_line(line: &str) -> Result<Stmt, EvalError> {
    let tokens = tokenize(line)?;
    let end_column = line.chars().count() + 1;
    let mut parser = Parser {
        tokens,
        pos: 0,
        end_column,
        depth: 0,
    };
    let stmt = parser.statement()?;
    if let Some(token) = parser.peek_token() {
        return Err(EvalError::syntax(token.column, "unexpected trailing input"));
    }
    Ok(stmt)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    end_column: usize,
    /// Open recursive productions.
    depth: usize,
}

impl Parser {
    fn peek_token(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek(&self) -> Option<&Tok> {
        self.peek_token().map(|token| &token.tok)
    }

    fn peek_at(&self, offset: usize) -> Option<&Tok> {
        self.tokens.get(self.pos + offset).map(|token| &token.tok)
    }

    fn column(&self) -> usize {
        self.peek_token()
            .map_or(self.end_column, |token| token.column)
    }

    fn advance(&mut self) -> Option<Tok> {
        let token = self.tokens.get(self.pos).map(|token| token.tok.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Tok) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Tok, what: &str) -> Result<(), EvalError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(EvalError::syntax(self.column(), format!("expected {what}")))
        }
    }

    fn too_deep(&self) -> EvalError {
        EvalError::syntax(self.column(), "expression nested too deeply")
    }

    /// Run a recursive production, refusing to go past [`MAX_NESTING`].
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        if self.depth >= MAX_NESTING {
            return Err(self.too_deep());
        }
        self.depth += 1;
        let parsed = parse(self);
        self.depth -= 1;
        parsed
    }

    /// Accept a freshly built node whose tree stays within [`MAX_NESTING`].
    fn bounded(&self, expr: Expr) -> Result<Expr, EvalError> {
        if expr.depth() > MAX_NESTING {
            return Err(self.too_deep());
        }
        Ok(expr)
    }

    fn statement(&mut self) -> Result<Stmt, EvalError> {
        if self.tokens.is_empty() {
            return Ok(Stmt::Empty);
        }
        if let Some(Tok::Ident(name)) = self.peek() {
            let name = name.clone();
            match self.peek_at(1) {
                Some(Tok::Assign) => {
                    check_assignable(&name, self.column())?;
                    self.pos += 2;
                    let value = self.expression()?;
                    return Ok(Stmt::Assign { name, value });
                }
                Some(Tok::AugAssign(op)) => {
                    let op = *op;
                    check_assignable(&name, self.column())?;
                    self.pos += 2;
                    let value = self.expression()?;
                    return Ok(Stmt::AugAssign { name, op, value });
                }
                _ => {}
            }
        }
        let expr = self.expression()?;
        if matches!(self.peek(), Some(Tok::Assign | Tok::AugAssign(_))) {
            return Err(EvalError::syntax(
                self.column(),
                "only plain names can be assigned",
            ));
        }
        Ok(Stmt::Expr(expr))
    }

    fn expression(&mut self) -> Result<Expr, EvalError> {
        self.nested(Self::comparison)
    }

    fn comparison(&mut self) -> Result<Expr, EvalError> {
        let lhs = self.bit_or()?;
        let Some(op) = self.peek().and_then(cmp_op) else {
            return Ok(lhs);
        };
        self.pos += 1;
        let rhs = self.bit_or()?;
        if self.peek().and_then(cmp_op).is_some() {
            return Err(EvalError::syntax(
                self.column(),
                "chained comparisons are not supported",
            ));
        }
        self.bounded(Expr::Compare {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn binary_level(
        &mut self,
        ops: &[(Tok, BinOp)],
        next: fn(&mut Self) -> Result<Expr, EvalError>,
    ) -> Result<Expr, EvalError> {
        let mut lhs = next(self)?;
        'outer: loop {
            for (tok, op) in ops {
                if self.eat(tok) {
                    let rhs = next(self)?;
                    lhs = self.bounded(Expr::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                    })?;
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn bit_or(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[(Tok::Pipe, BinOp::Or)], Self::bit_xor)
    }

    fn bit_xor(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[(Tok::Caret, BinOp::Xor)], Self::bit_and)
    }

    fn bit_and(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[(Tok::Amp, BinOp::And)], Self::shift)
    }

    fn shift(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            &[(Tok::Shl, BinOp::Shl), (Tok::Shr, BinOp::Shr)],
            Self::sum,
        )
    }

    fn sum(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            &[(Tok::Plus, BinOp::Add), (Tok::Minus, BinOp::Sub)],
            Self::term,
        )
    }

    fn term(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            &[
                (Tok::Star, BinOp::Mul),
                (Tok::SlashSlash, BinOp::FloorDiv),
                (Tok::Slash, BinOp::Div),
                (Tok::Percent, BinOp::Mod),
            ],
            Self::unary,
        )
    }

    fn unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Some(Tok::Minus) => UnaryOp::Neg,
            Some(Tok::Plus) => UnaryOp::Pos,
            Some(Tok::Tilde) => UnaryOp::Invert,
            Some(Tok::Ident(word)) if word == "not" => UnaryOp::Not,
            _ => return self.postfix(),
        };
        self.pos += 1;
        let operand = self.nested(Self::unary)?;
        self.bounded(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self) -> Result<Expr, EvalError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Tok::LParen) {
                let args = self.sequence(&Tok::RParen, "')'")?;
                expr = self.bounded(Expr::Call {
                    callee: Box::new(expr),
                    args,
                })?;
            } else if self.eat(&Tok::Dot) {
                let column = self.column();
                let Some(Tok::Ident(name)) = self.advance() else {
                    return Err(EvalError::syntax(column, "expected attribute name"));
                };
                expr = self.bounded(Expr::Attr {
                    object: Box::new(expr),
                    name,
                })?;
            } else if self.eat(&Tok::LBracket) {
                let index = self.expression()?;
                self.expect(&Tok::RBracket, "']'")?;
                expr = self.bounded(Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                })?;
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, EvalError> {
        let column = self.column();
        match self.advance() {
            Some(Tok::Int(value)) => Ok(Expr::Int(value)),
            Some(Tok::Str(text)) => {
                let mut text = text;
                while let Some(Tok::Str(next)) = self.peek() {
                    text.push_str(next);
                    self.pos += 1;
                }
                Ok(Expr::Str(text))
            }
            Some(Tok::Ident(name)) => Ok(match name.as_str() {
                "True" => Expr::Bool(true),
                "False" => Expr::Bool(false),
                "None" => Expr::None,
                "not" => return Err(EvalError::syntax(column, "unexpected 'not'")),
                _ => Expr::Name(name),
            }),
            Some(Tok::LParen) => {
                let inner = self.expression()?;
                self.expect(&Tok::RParen, "')'")?;
                Ok(inner)
            }
            Some(Tok::LBracket) => {
                let items = self.sequence(&Tok::RBracket, "']'")?;
                self.bounded(Expr::List(items))
            }
            Some(_) => Err(EvalError::syntax(column, "unexpected token")),
            None => Err(EvalError::syntax(column, "unexpected end of input")),
        }
    }

    /// Comma separated expressions up to `close`; a trailing comma is allowed.
    fn sequence(&mut self, close: &Tok, what: &str) -> Result<Vec<Expr>, EvalError> {
        let mut items = Vec::new();
        loop {
            if self.eat(close) {
                return Ok(items);
            }
            items.push(self.expression()?);
            if !self.eat(&Tok::Comma) {
                self.expect(close, what)?;
                return Ok(items);
            }
        }
    }
}

fn cmp_op(tok: &Tok) -> Option<CmpOp> {
    match tok {
        Tok::EqEq => Some(CmpOp::Eq),
        Tok::NotEq => Some(CmpOp::Ne),
        Tok::Lt => Some(CmpOp::Lt),
        Tok::Le => Some(CmpOp::Le),
        Tok::Gt => Some(CmpOp::Gt),
        Tok::Ge => Some(CmpOp::Ge),
        _ => None,
    }
}

fn check_assignable(name: &str, column: usize) -> Result<(), EvalError> {
    if matches!(name, "True" | "False" | "None" | "not") {
        return Err(EvalError::syntax(column, format!("cannot assign to {name}")));
    }
    Ok(())
}
