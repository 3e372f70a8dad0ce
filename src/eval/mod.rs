// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Expression evaluator for console input.
// Author: Lukas Bower

//! Expression evaluator for console input.
//!
//! A line is one unit: an assignment, an augmented assignment or an expression.
//! Integers are signed 128-bit; division floors; names resolve against the session
//! scope before the builtins in [`builtins::BUILTIN_NAMES`].

mod ast;
/// Commands resolved when a name is not bound in scope.
pub mod builtins;
mod interp;
mod lexer;
mod parser;

use std::io::Write;

use crate::exit::{EvalResult, FrameContext};
use crate::scope::Scope;
use crate::value::Value;

pub use parser::MAX_NESTING;

/// Parse and evaluate one input line against `scope`.
///
/// Expression statements return their value; assignments and blank lines return
/// [`Value::None`]. Output from commands the line calls goes to `out`. Faults carry
/// a frame naming the line.
pub fn eval_line(line: &str, scope: &mut Scope, out: &mut dyn Write) -> EvalResult<Value> {
    let stmt = parser::parse_line(line)?;
    interp::exec(&stmt, scope, out).frame(|| format!("while evaluating `{}`", line.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::Unwind;
    use crate::value::Command;

    #[test]
    fn faults_carry_a_frame_for_the_line() {
        let mut scope = Scope::new();
        scope.insert(
            "boom",
            Command::new("boom", |_, _| Err(anyhow::anyhow!("device not responding").into())),
        );
        let Err(Unwind::Fault(err)) = eval_line("boom()", &mut scope, &mut std::io::sink()) else {
            panic!("expected a fault");
        };
        let frames: Vec<String> = err.chain().map(ToString::to_string).collect();
        assert_eq!(
            frames,
            [
                "while evaluating `boom()`",
                "in call to boom()",
                "device not responding"
            ]
        );
    }

    #[test]
    fn exit_requests_pass_through() {
        let mut scope = Scope::new();
        let outcome = eval_line("exit(0x2a)", &mut scope, &mut std::io::sink());
        let Err(Unwind::Exit(request)) = outcome else {
            panic!("expected an exit request");
        };
        assert_eq!(request.into_payload(), Some(Value::Int(42)));
    }
}
