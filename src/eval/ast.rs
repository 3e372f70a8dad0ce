// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Syntax tree for console input lines.
// Author: Lukas Bower

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl BinOp {
    pub(crate) fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnaryOp {
    Neg,
    Pos,
    Invert,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Expr {
    Int(i128),
    Str(String),
    Bool(bool),
    None,
    Name(String),
    List(Vec<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Attr {
        object: Box<Expr>,
        name: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
}

impl Expr {
    /// Height of the tree; literals and names count as one.
    pub(crate) fn depth(&self) -> usize {
        1 + match self {
            Self::Int(_) | Self::Str(_) | Self::Bool(_) | Self::None | Self::Name(_) => 0,
            Self::List(items) => items.iter().map(Self::depth).max().unwrap_or(0),
            Self::Unary { operand, .. } => operand.depth(),
            Self::Binary { lhs, rhs, .. } | Self::Compare { lhs, rhs, .. } => {
                lhs.depth().max(rhs.depth())
            }
            Self::Call { callee, args } => args
                .iter()
                .map(Self::depth)
                .fold(callee.depth(), usize::max),
            Self::Attr { object, .. } => object.depth(),
            Self::Index { object, index } => object.depth().max(index.depth()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Stmt {
    /// Blank or comment-only line.
    Empty,
    Expr(Expr),
    Assign {
        name: String,
        value: Expr,
    },
    AugAssign {
        name: String,
        op: BinOp,
        value: Expr,
    },
}
