// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Tree-walking evaluation of console statements against the session scope.
// Author: Lukas Bower

use std::cmp::Ordering;
use std::io::Write;

use crate::error::EvalError;
use crate::exit::EvalResult;
use crate::scope::Scope;
use crate::value::Value;

use super::ast::{BinOp, CmpOp, Expr, Stmt, UnaryOp};
use super::builtins::builtin;

/// Longest string or list that concatenation and repetition may build.
pub(crate) const MAX_SEQUENCE_LEN: usize = 1 << 24;

/// Execute a statement. Assignments and empty lines yield [`Value::None`].
///
/// Commands invoked along the way print to `out`.
pub(crate) fn exec(stmt: &Stmt, scope: &mut Scope, out: &mut dyn Write) -> EvalResult<Value> {
    match stmt {
        Stmt::Empty => Ok(Value::None),
        Stmt::Expr(expr) => eval(expr, scope, out),
        Stmt::Assign { name, value } => {
            let value = eval(value, scope, out)?;
            scope.insert(name.as_str(), value);
            Ok(Value::None)
        }
        Stmt::AugAssign { name, op, value } => {
            let current = lookup(name, scope)?;
            let rhs = eval(value, scope, out)?;
            let updated = binary(*op, &current, &rhs)?;
            scope.insert(name.as_str(), updated);
            Ok(Value::None)
        }
    }
}

pub(crate) fn eval(expr: &Expr, scope: &Scope, out: &mut dyn Write) -> EvalResult<Value> {
    match expr {
        Expr::Int(value) => Ok(Value::Int(*value)),
        Expr::Str(text) => Ok(Value::Str(text.clone())),
        Expr::Bool(flag) => Ok(Value::Bool(*flag)),
        Expr::None => Ok(Value::None),
        Expr::Name(name) => lookup(name, scope),
        Expr::List(items) => items
            .iter()
            .map(|item| eval(item, scope, out))
            .collect::<EvalResult<Vec<_>>>()
            .map(Value::List),
        Expr::Unary { op, operand } => {
            let operand = eval(operand, scope, out)?;
            Ok(unary(*op, &operand)?)
        }
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval(lhs, scope, out)?;
            let rhs = eval(rhs, scope, out)?;
            Ok(binary(*op, &lhs, &rhs)?)
        }
        Expr::Compare { op, lhs, rhs } => {
            let lhs = eval(lhs, scope, out)?;
            let rhs = eval(rhs, scope, out)?;
            Ok(Value::Bool(compare(*op, &lhs, &rhs)?))
        }
        Expr::Call { callee, args } => {
            let callee = eval(callee, scope, out)?;
            let args = args
                .iter()
                .map(|arg| eval(arg, scope, out))
                .collect::<EvalResult<Vec<_>>>()?;
            match callee {
                Value::Command(command) => command.call(out, &args),
                other => Err(EvalError::type_error(format!(
                    "'{}' object is not callable",
                    other.type_name()
                ))
                .into()),
            }
        }
        Expr::Attr { object, name } => {
            let object = eval(object, scope, out)?;
            let found = match &object {
                Value::Namespace(ns) => ns.attr(name),
                _ => None,
            };
            found.ok_or_else(|| {
                EvalError::NoAttribute {
                    owner: object.type_name().to_owned(),
                    name: name.clone(),
                }
                .into()
            })
        }
        Expr::Index { object, index } => {
            let object = eval(object, scope, out)?;
            let index = eval(index, scope, out)?.expect_int("index")?;
            Ok(subscript(&object, index)?)
        }
    }
}

fn lookup(name: &str, scope: &Scope) -> EvalResult<Value> {
    if let Some(value) = scope.get(name) {
        return Ok(value.clone());
    }
    builtin(name)
        .map(Value::Command)
        .ok_or_else(|| EvalError::UndefinedName(name.to_owned()).into())
}

fn unary(op: UnaryOp, operand: &Value) -> Result<Value, EvalError> {
    if op == UnaryOp::Not {
        return Ok(Value::Bool(!operand.truthy()));
    }
    let Some(value) = operand.as_int() else {
        let symbol = match op {
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
            UnaryOp::Invert | UnaryOp::Not => "~",
        };
        return Err(EvalError::type_error(format!(
            "bad operand type for unary {symbol}: '{}'",
            operand.type_name()
        )));
    };
    let result = match op {
        UnaryOp::Neg => value.checked_neg().ok_or(EvalError::Overflow)?,
        UnaryOp::Pos => value,
        UnaryOp::Invert | UnaryOp::Not => !value,
    };
    Ok(Value::Int(result))
}

pub(crate) fn binary(op: BinOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    if let (Some(a), Some(b)) = (lhs.as_int(), rhs.as_int()) {
        return int_binary(op, a, b).map(Value::Int);
    }
    match (op, lhs, rhs) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            check_sequence_len(a.len(), 1, b.len())?;
            Ok(Value::Str(format!("{a}{b}")))
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            check_sequence_len(a.len(), 1, b.len())?;
            Ok(Value::List(a.iter().chain(b.iter()).cloned().collect()))
        }
        (BinOp::Mul, Value::Str(text), count) | (BinOp::Mul, count, Value::Str(text))
            if count.as_int().is_some() =>
        {
            let times = repeat_count(count)?;
            check_sequence_len(text.len(), times, 0)?;
            Ok(Value::Str(text.repeat(times)))
        }
        (BinOp::Mul, Value::List(items), count) | (BinOp::Mul, count, Value::List(items))
            if count.as_int().is_some() =>
        {
            let times = repeat_count(count)?;
            let total = check_sequence_len(items.len(), times, 0)?;
            let mut repeated = Vec::with_capacity(total);
            for _ in 0..times {
                repeated.extend(items.iter().cloned());
            }
            Ok(Value::List(repeated))
        }
        _ => Err(EvalError::type_error(format!(
            "unsupported operand types for {}: '{}' and '{}'",
            op.symbol(),
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn repeat_count(count: &Value) -> Result<usize, EvalError> {
    let count = count.as_int().unwrap_or(0).max(0);
    usize::try_from(count).map_err(|_| EvalError::SequenceTooLong {
        limit: MAX_SEQUENCE_LEN,
    })
}

/// Length of `len * times + extra`, provided it stays within [`MAX_SEQUENCE_LEN`].
fn check_sequence_len(len: usize, times: usize, extra: usize) -> Result<usize, EvalError> {
    len.checked_mul(times)
        .and_then(|total| total.checked_add(extra))
        .filter(|total| *total <= MAX_SEQUENCE_LEN)
        .ok_or(EvalError::SequenceTooLong {
            limit: MAX_SEQUENCE_LEN,
        })
}

fn int_binary(op: BinOp, a: i128, b: i128) -> Result<i128, EvalError> {
    match op {
        BinOp::Add => a.checked_add(b).ok_or(EvalError::Overflow),
        BinOp::Sub => a.checked_sub(b).ok_or(EvalError::Overflow),
        BinOp::Mul => a.checked_mul(b).ok_or(EvalError::Overflow),
        BinOp::Div | BinOp::FloorDiv => floor_div(a, b),
        BinOp::Mod => floor_mod(a, b),
        BinOp::And => Ok(a & b),
        BinOp::Or => Ok(a | b),
        BinOp::Xor => Ok(a ^ b),
        BinOp::Shl => shift_left(a, b),
        BinOp::Shr => shift_right(a, b),
    }
}

fn floor_div(a: i128, b: i128) -> Result<i128, EvalError> {
    if b == 0 {
        return Err(EvalError::ZeroDivision);
    }
    let quotient = a.checked_div(b).ok_or(EvalError::Overflow)?;
    if a % b != 0 && ((a < 0) != (b < 0)) {
        Ok(quotient - 1)
    } else {
        Ok(quotient)
    }
}

fn floor_mod(a: i128, b: i128) -> Result<i128, EvalError> {
    if b == 0 {
        return Err(EvalError::ZeroDivision);
    }
    let remainder = a.checked_rem(b).unwrap_or(0);
    if remainder != 0 && ((remainder < 0) != (b < 0)) {
        Ok(remainder + b)
    } else {
        Ok(remainder)
    }
}

fn shift_left(value: i128, count: i128) -> Result<i128, EvalError> {
    if count < 0 {
        return Err(EvalError::NegativeShift);
    }
    if value == 0 {
        return Ok(0);
    }
    let count = u32::try_from(count)
        .ok()
        .filter(|count| *count < i128::BITS)
        .ok_or(EvalError::Overflow)?;
    let shifted = value << count;
    if shifted >> count == value {
        Ok(shifted)
    } else {
        Err(EvalError::Overflow)
    }
}

fn shift_right(value: i128, count: i128) -> Result<i128, EvalError> {
    if count < 0 {
        return Err(EvalError::NegativeShift);
    }
    match u32::try_from(count) {
        Ok(count) if count < i128::BITS => Ok(value >> count),
        _ => Ok(if value < 0 { -1 } else { 0 }),
    }
}

fn compare(op: CmpOp, lhs: &Value, rhs: &Value) -> Result<bool, EvalError> {
    let ordering = match (lhs, rhs) {
        (a, b) if a.as_int().is_some() && b.as_int().is_some() => a.as_int().cmp(&b.as_int()),
        (Value::Str(a), Value::Str(b)) => a.cmp(b),
        _ => {
            return match op {
                CmpOp::Eq => Ok(lhs == rhs),
                CmpOp::Ne => Ok(lhs != rhs),
                _ => Err(EvalError::type_error(format!(
                    "ordering not supported between '{}' and '{}'",
                    lhs.type_name(),
                    rhs.type_name()
                ))),
            }
        }
    };
    Ok(match op {
        CmpOp::Eq => ordering == Ordering::Equal,
        CmpOp::Ne => ordering != Ordering::Equal,
        CmpOp::Lt => ordering == Ordering::Less,
        CmpOp::Le => ordering != Ordering::Greater,
        CmpOp::Gt => ordering == Ordering::Greater,
        CmpOp::Ge => ordering != Ordering::Less,
    })
}

fn subscript(object: &Value, index: i128) -> Result<Value, EvalError> {
    let len = match object {
        Value::List(items) => items.len(),
        Value::Str(text) => text.chars().count(),
        other => {
            return Err(EvalError::type_error(format!(
                "'{}' object is not subscriptable",
                other.type_name()
            )))
        }
    };
    let resolved = if index < 0 {
        index + len as i128
    } else {
        index
    };
    let position = usize::try_from(resolved)
        .ok()
        .filter(|position| *position < len)
        .ok_or(EvalError::IndexOutOfRange { index, len })?;
    Ok(match object {
        Value::List(items) => items[position].clone(),
        Value::Str(text) => text
            .chars()
            .nth(position)
            .map(|ch| Value::Str(ch.to_string()))
            .unwrap_or(Value::None),
        _ => Value::None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::parser::parse_line;

    fn run(line: &str, scope: &mut Scope) -> EvalResult<Value> {
        exec(
            &parse_line(line).map_err(crate::exit::Unwind::from)?,
            scope,
            &mut std::io::sink(),
        )
    }

    fn value(line: &str) -> Value {
        run(line, &mut Scope::new()).unwrap()
    }

    fn fault(line: &str) -> String {
        match run(line, &mut Scope::new()) {
            Err(crate::exit::Unwind::Fault(err)) => err.root_cause().to_string(),
            other => panic!("expected fault for {line}, got {other:?}"),
        }
    }

    #[test]
    fn integer_arithmetic_floors_like_python() {
        assert_eq!(value("7 // 2"), Value::Int(3));
        assert_eq!(value("-7 // 2"), Value::Int(-4));
        assert_eq!(value("-7 % 3"), Value::Int(2));
        assert_eq!(value("7 % -3"), Value::Int(-2));
        assert_eq!(value("7 / 2"), Value::Int(3));
        assert_eq!(value("~0"), Value::Int(-1));
        assert_eq!(value("1 << 63"), Value::Int(1 << 63));
        assert_eq!(value("-1 >> 200"), Value::Int(-1));
        assert_eq!(value("0xf0 & 0x3c | 1 ^ 3"), Value::Int(0x30 | 2));
        assert_eq!(value("True + True"), Value::Int(2));
    }

    #[test]
    fn arithmetic_faults() {
        assert_eq!(fault("1 / 0"), "integer division or modulo by zero");
        assert_eq!(fault("1 % 0"), "integer division or modulo by zero");
        assert_eq!(fault("1 << -1"), "negative shift count");
        assert_eq!(fault("1 << 127"), "integer overflow");
        assert!(fault("'a' - 1").contains("unsupported operand types for -"));
    }

    #[test]
    fn sequences_concatenate_and_repeat() {
        assert_eq!(value("'ab' + 'cd'"), Value::from("abcd"));
        assert_eq!(value("'ab' * 2"), Value::from("abab"));
        assert_eq!(
            value("[1] + [2] * 2"),
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(2)])
        );
        assert_eq!(value("[1, 2, 3][-1]"), Value::Int(3));
        assert_eq!(value("'xyz'[1]"), Value::from("y"));
        assert!(fault("[1][5]").contains("out of range"));
    }

    #[test]
    fn oversized_sequences_fault_instead_of_allocating() {
        let too_long = format!("longer than {MAX_SEQUENCE_LEN} items");
        assert!(fault("'ab' * 0xffffffffffffffff").contains(&too_long));
        assert!(fault("0xffffffffffffffff * [0]").contains(&too_long));
        assert!(fault("[0, 1] * (1 << 63)").contains(&too_long));
        assert!(fault("'x' * (1 << 100)").contains(&too_long));
        assert_eq!(value("'ab' * -3"), Value::from(""));

        let mut scope = Scope::new();
        run("block = 'x' * (1 << 23)", &mut scope).unwrap();
        run("block = block + block", &mut scope).unwrap();
        let Err(crate::exit::Unwind::Fault(err)) = run("block + 'x'", &mut scope) else {
            panic!("expected concatenation to fault");
        };
        assert!(err.root_cause().to_string().contains(&too_long));
    }

    #[test]
    fn comparisons_yield_booleans() {
        assert_eq!(value("1 == True"), Value::Bool(true));
        assert_eq!(value("'a' < 'b'"), Value::Bool(true));
        assert_eq!(value("None == None"), Value::Bool(true));
        assert_eq!(value("not 0"), Value::Bool(true));
        assert!(fault("None < 1").contains("ordering not supported"));
    }

    #[test]
    fn assignment_updates_scope() {
        let mut scope = Scope::new();
        assert_eq!(run("base = 0x100", &mut scope).unwrap(), Value::None);
        run("base += 0x10", &mut scope).unwrap();
        run("base <<= 4", &mut scope).unwrap();
        assert_eq!(scope.get("base"), Some(&Value::Int(0x1100)));
        assert!(run("missing += 1", &mut scope).is_err());
    }

    #[test]
    fn names_resolve_scope_before_builtins() {
        let mut scope = Scope::new();
        run("hex = 5", &mut scope).unwrap();
        assert_eq!(run("hex", &mut scope).unwrap(), Value::Int(5));
        assert!(matches!(value("len"), Value::Command(_)));
        assert_eq!(fault("nothing_here"), "name 'nothing_here' is not defined");
    }

    #[test]
    fn called_commands_print_to_the_session_writer() {
        let stmt = parse_line("print('mmio', 0x10)").unwrap();
        let mut out = Vec::new();
        let result = exec(&stmt, &mut Scope::new(), &mut out).unwrap();
        assert_eq!(result, Value::None);
        assert_eq!(String::from_utf8(out).unwrap(), "mmio 16\n");
    }

    #[test]
    fn calling_non_callables_faults() {
        assert!(fault("5(1)").contains("not callable"));
        assert!(fault("(1).real").contains("has no attribute"));
    }
}
