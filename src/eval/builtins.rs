// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Built-in commands resolved after the session scope.
// Author: Lukas Bower

use std::io::Write;

use crate::error::EvalError;
use crate::exit::{EvalResult, ExitRequest};
use crate::value::{expect_args, format_hex, Command, Value};

/// Names resolved when a bare identifier is not bound in scope.
pub const BUILTIN_NAMES: [&str; 6] = ["dir", "exit", "hex", "len", "print", "quit"];

thread_local! {
    static BUILTINS: Vec<Command> = vec![
        Command::new("dir", dir),
        Command::new("exit", |_, args| exit_with("exit", args)),
        Command::new("hex", hex),
        Command::new("len", len),
        Command::new("print", print),
        Command::new("quit", |_, args| exit_with("quit", args)),
    ];
}

/// Resolve a builtin by name. Repeated lookups return the same command.
#[must_use]
pub fn builtin(name: &str) -> Option<Command> {
    BUILTINS.with(|builtins| {
        builtins
            .iter()
            .find(|command| command.name() == name)
            .cloned()
    })
}

/// The hexadecimal formatting command.
#[must_use]
pub fn hex_command() -> Command {
    BUILTINS.with(|builtins| builtins[2].clone())
}

fn exit_with(name: &str, args: &[Value]) -> EvalResult<Value> {
    Err(ExitRequest::from_args(name, args)?.into())
}

fn hex(_out: &mut dyn Write, args: &[Value]) -> EvalResult<Value> {
    let [value] = expect_args::<1>("hex", args)?;
    Ok(Value::Str(format_hex(value.expect_int("hex() argument")?)))
}

fn len(_out: &mut dyn Write, args: &[Value]) -> EvalResult<Value> {
    let [value] = expect_args::<1>("len", args)?;
    let count = match value {
        Value::Str(text) => text.chars().count(),
        Value::List(items) => items.len(),
        Value::Namespace(ns) => ns.entries().len(),
        other => {
            return Err(EvalError::type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            ))
            .into())
        }
    };
    Ok(Value::Int(count as i128))
}

fn dir(_out: &mut dyn Write, args: &[Value]) -> EvalResult<Value> {
    let [value] = expect_args::<1>("dir", args)?;
    let Value::Namespace(ns) = value else {
        return Err(EvalError::type_error(format!(
            "dir() expects a namespace, not '{}'",
            value.type_name()
        ))
        .into());
    };
    let mut names: Vec<String> = ns.entries().into_iter().map(|(name, _)| name).collect();
    names.sort();
    Ok(Value::List(names.into_iter().map(Value::Str).collect()))
}

fn print(out: &mut dyn Write, args: &[Value]) -> EvalResult<Value> {
    let line = args
        .iter()
        .map(|value| match value {
            Value::Str(text) => text.clone(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(out, "{line}")?;
    Ok(Value::None)
}
