// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Evaluation fault taxonomy for the proxy console.
// Author: Lukas Bower

//! Evaluation fault taxonomy for the proxy console.

use thiserror::Error;

/// Faults raised by the expression evaluator and built-in commands.
///
/// Collaborator commands may fail with arbitrary [`anyhow::Error`] values; those
/// travel next to these variants inside [`crate::Unwind::Fault`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    /// The input line could not be parsed.
    #[error("syntax error at column {column}: {message}")]
    Syntax {
        /// One-based column of the offending token.
        column: usize,
        /// Human readable description.
        message: String,
    },
    /// A bare identifier resolved to neither a scope binding nor a builtin.
    #[error("name '{0}' is not defined")]
    UndefinedName(String),
    /// Attribute lookup on a value failed.
    #[error("'{owner}' has no attribute '{name}'")]
    NoAttribute {
        /// Type name of the value being inspected.
        owner: String,
        /// Requested attribute.
        name: String,
    },
    /// Operand types do not support the requested operation.
    #[error("{0}")]
    Type(String),
    /// A command was called with the wrong number of arguments.
    #[error("{name}() takes {expected} argument(s) but {given} were given")]
    Arity {
        /// Command name.
        name: String,
        /// Accepted argument count, e.g. `2` or `0 or 1`.
        expected: String,
        /// Number of arguments supplied.
        given: usize,
    },
    /// Integer division or modulo by zero.
    #[error("integer division or modulo by zero")]
    ZeroDivision,
    /// Result outside the signed 128-bit range.
    #[error("integer overflow")]
    Overflow,
    /// Shift by a negative count.
    #[error("negative shift count")]
    NegativeShift,
    /// Concatenation or repetition would build an oversized string or list.
    #[error("resulting sequence would be longer than {limit} items")]
    SequenceTooLong {
        /// Longest sequence that may be built.
        limit: usize,
    },
    /// Sequence index outside the sequence.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: i128,
        /// Length of the indexed sequence.
        len: usize,
    },
}

impl EvalError {
    pub(crate) fn syntax(column: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            column,
            message: message.into(),
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }
}
