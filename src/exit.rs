// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Controlled-exit outcome propagated from evaluated code to the console loop.
// Author: Lukas Bower

//! Controlled-exit outcome propagated from evaluated code to the console loop.
//!
//! Evaluation returns [`EvalResult`]. The error side is either a genuine fault or an
//! [`ExitRequest`]; the console loop is the only place that turns the latter into a
//! normal return value.

use std::fmt;
use std::io;

use crate::error::EvalError;
use crate::value::Value;

/// Request to end the console session, optionally carrying a result value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExitRequest {
    payload: Option<Value>,
}

impl ExitRequest {
    /// Exit without a return value.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Exit returning `payload` to the harness caller.
    #[must_use]
    pub fn with_payload(payload: Value) -> Self {
        Self {
            payload: Some(payload),
        }
    }

    /// Build a request from the positional arguments of an exit command.
    pub fn from_args(name: &str, args: &[Value]) -> Result<Self, EvalError> {
        match args {
            [] => Ok(Self::new()),
            [payload] => Ok(Self::with_payload(payload.clone())),
            _ => Err(EvalError::Arity {
                name: name.to_owned(),
                expected: "0 or 1".to_owned(),
                given: args.len(),
            }),
        }
    }

    /// Borrow the payload, if any.
    #[must_use]
    pub fn payload(&self) -> Option<&Value> {
        self.payload.as_ref()
    }

    /// Consume the request and return its payload.
    #[must_use]
    pub fn into_payload(self) -> Option<Value> {
        self.payload
    }
}

/// Non-local outcome of evaluating a unit of input.
#[derive(Debug)]
pub enum Unwind {
    /// Evaluated code asked the console to stop.
    Exit(ExitRequest),
    /// Evaluation failed; the console reports it and keeps going.
    Fault(anyhow::Error),
}

impl Unwind {
    /// Return `true` when this outcome is a controlled exit.
    #[must_use]
    pub fn is_exit(&self) -> bool {
        matches!(self, Self::Exit(_))
    }
}

impl fmt::Display for Unwind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exit(request) => match request.payload() {
                Some(payload) => write!(f, "exit requested with {payload}"),
                None => write!(f, "exit requested"),
            },
            Self::Fault(err) => write!(f, "{err}"),
        }
    }
}

impl From<ExitRequest> for Unwind {
    fn from(value: ExitRequest) -> Self {
        Self::Exit(value)
    }
}

impl From<EvalError> for Unwind {
    fn from(value: EvalError) -> Self {
        Self::Fault(anyhow::Error::new(value))
    }
}

impl From<anyhow::Error> for Unwind {
    fn from(value: anyhow::Error) -> Self {
        Self::Fault(value)
    }
}

impl From<io::Error> for Unwind {
    fn from(value: io::Error) -> Self {
        Self::Fault(anyhow::Error::new(value))
    }
}

/// Result type threaded through evaluation, rendering and command calls.
pub type EvalResult<T> = Result<T, Unwind>;

/// Attach trace frames to faults while letting exit requests pass untouched.
pub trait FrameContext<T> {
    /// Wrap a fault with the frame produced by `frame`.
    fn frame<C, F>(self, frame: F) -> EvalResult<T>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C;
}

impl<T> FrameContext<T> for EvalResult<T> {
    fn frame<C, F>(self, frame: F) -> EvalResult<T>
    where
        C: fmt::Display + Send + Sync + 'static,
        F: FnOnce() -> C,
    {
        match self {
            Err(Unwind::Fault(err)) => Err(Unwind::Fault(err.context(frame()))),
            other => other,
        }
    }
}
