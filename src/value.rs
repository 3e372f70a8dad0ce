// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Dynamic values, commands and namespace providers seen by the console.
// Author: Lukas Bower

//! Dynamic values, commands and namespace providers seen by the console.

use std::fmt;
use std::io::Write;
use std::rc::Rc;

use crate::error::EvalError;
use crate::exit::{EvalResult, FrameContext};

/// Signature shared by every console command.
///
/// `out` is the session writer; anything a command prints goes there.
pub type CommandFn = dyn Fn(&mut dyn Write, &[Value]) -> EvalResult<Value>;

/// Named callable exposed to the console.
#[derive(Clone)]
pub struct Command {
    name: Rc<str>,
    func: Rc<CommandFn>,
}

impl Command {
    /// Wrap `func` as a command called `name`.
    pub fn new<F>(name: &str, func: F) -> Self
    where
        F: Fn(&mut dyn Write, &[Value]) -> EvalResult<Value> + 'static,
    {
        Self {
            name: Rc::from(name),
            func: Rc::new(func),
        }
    }

    /// Command name used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Invoke the command, recording a trace frame when it faults.
    pub fn call(&self, out: &mut dyn Write, args: &[Value]) -> EvalResult<Value> {
        (self.func)(out, args).frame(|| format!("in call to {}()", self.name))
    }

    /// Return `true` if both handles refer to the same underlying callable.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.func), Rc::as_ptr(&other.func))
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<command {}>", self.name)
    }
}

/// Collaborator object whose attributes can be enumerated.
///
/// Proxy, utility and register-table collaborators implement this so that the
/// bootstrapper can merge their attributes into the session scope.
pub trait Namespace {
    /// Short type label used in diagnostics and `repr` output.
    fn type_name(&self) -> &str;

    /// Every attribute as `(name, value)`, in a stable order.
    fn entries(&self) -> Vec<(String, Value)>;

    /// Look up a single attribute.
    fn attr(&self, name: &str) -> Option<Value> {
        self.entries()
            .into_iter()
            .find_map(|(key, value)| (key == name).then_some(value))
    }
}

/// Namespace backed by a fixed attribute list.
#[derive(Debug, Clone, Default)]
pub struct SimpleNamespace {
    type_name: String,
    entries: Vec<(String, Value)>,
}

impl SimpleNamespace {
    /// Create an empty namespace labelled `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            entries: Vec::new(),
        }
    }

    /// Add or replace an attribute.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Add a command attribute named after the command itself.
    #[must_use]
    pub fn with_command<F>(self, name: &str, func: F) -> Self
    where
        F: Fn(&mut dyn Write, &[Value]) -> EvalResult<Value> + 'static,
    {
        self.with(name, Command::new(name, func))
    }

    /// Add or replace an attribute in place.
    pub fn insert(&mut self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((name.to_owned(), value)),
        }
    }

    /// Wrap the namespace as a console value.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Namespace(Rc::new(self))
    }
}

impl Namespace for SimpleNamespace {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn entries(&self) -> Vec<(String, Value)> {
        self.entries.clone()
    }
}

/// Value produced by evaluation or bound in the session scope.
#[derive(Clone)]
pub enum Value {
    /// Absence of a value; never rendered.
    None,
    /// Boolean.
    Bool(bool),
    /// Signed integer wide enough for any 64-bit address or register value.
    Int(i128),
    /// Text.
    Str(String),
    /// Ordered list.
    List(Vec<Value>),
    /// Callable command.
    Command(Command),
    /// Collaborator object with attributes.
    Namespace(Rc<dyn Namespace>),
}

impl Value {
    /// Type label used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Command(_) => "command",
            Self::Namespace(ns) => ns.type_name(),
        }
    }

    /// Return `true` for values that can be invoked.
    #[must_use]
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Command(_))
    }

    /// Truth value used by `not`.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(flag) => *flag,
            Self::Int(value) => *value != 0,
            Self::Str(text) => !text.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Command(_) | Self::Namespace(_) => true,
        }
    }

    /// Integer view of the value; booleans count as 0 and 1.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            Self::Int(value) => Some(*value),
            Self::Bool(flag) => Some(i128::from(*flag)),
            _ => None,
        }
    }

    /// Integer argument for `what`, or a type fault.
    pub fn expect_int(&self, what: &str) -> Result<i128, EvalError> {
        self.as_int().ok_or_else(|| {
            EvalError::type_error(format!(
                "{what} must be an integer, not '{}'",
                self.type_name()
            ))
        })
    }

    /// Unsigned 64-bit argument for `what`, e.g. an address or register value.
    pub fn expect_u64(&self, what: &str) -> Result<u64, EvalError> {
        let value = self.expect_int(what)?;
        u64::try_from(value).map_err(|_| {
            EvalError::type_error(format!("{what} {} does not fit in 64 bits", format_hex(value)))
        })
    }
}

/// Check that `args` has exactly `N` entries and return them as an array.
pub fn expect_args<'a, const N: usize>(
    name: &str,
    args: &'a [Value],
) -> Result<&'a [Value; N], EvalError> {
    args.try_into().map_err(|_| EvalError::Arity {
        name: name.to_owned(),
        expected: N.to_string(),
        given: args.len(),
    })
}

/// Format an integer the way the console shows it: lower-case, `0x`-prefixed.
#[must_use]
pub fn format_hex(value: i128) -> String {
    if value < 0 {
        format!("-{:#x}", value.unsigned_abs())
    } else {
        format!("{value:#x}")
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::None, Self::None) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            (Self::Command(a), Self::Command(b)) => a.same_as(b),
            (Self::Namespace(a), Self::Namespace(b)) => {
                std::ptr::addr_eq(Rc::as_ptr(a), Rc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    /// Writes the `repr` form used by the default renderer.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Str(text) => write_quoted(f, text),
            Self::List(items) => {
                write!(f, "[")?;
                for (index, item) in items.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Command(command) => write!(f, "<command {}>", command.name()),
            Self::Namespace(ns) => write!(f, "<{} namespace>", ns.type_name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, text: &str) -> fmt::Result {
    let quote = if text.contains('\'') && !text.contains('"') {
        '"'
    } else {
        '\''
    };
    write!(f, "{quote}")?;
    for ch in text.chars() {
        match ch {
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            c if c == quote => write!(f, "\\{c}")?,
            c if c.is_control() => write!(f, "\\x{:02x}", u32::from(c))?,
            c => write!(f, "{c}")?,
        }
    }
    write!(f, "{quote}")
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i128> for Value {
    fn from(value: i128) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Int(i128::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Int(i128::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<Command> for Value {
    fn from(value: Command) -> Self {
        Self::Command(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Self::List(value)
    }
}
