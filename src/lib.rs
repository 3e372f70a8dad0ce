// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Interactive debugging console harness for hardware proxy sessions.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Interactive debugging console harness for hardware proxy sessions.
//!
//! [`run_shell`] merges collaborator namespaces into a session scope, installs the
//! console display policy and runs a read-evaluate-render loop until end-of-input
//! or a controlled exit. Command history persists across sessions through
//! [`HistoryStore`].

use std::io::Write;
use std::rc::Rc;

use anyhow::Result;
use log::info;

pub mod bootstrap;
pub mod console;
pub mod display;
pub mod editor;
pub mod error;
pub mod eval;
pub mod exit;
/// Command history persisted between sessions.
pub mod history;
pub mod mock;
/// Session bindings shared by the evaluator and the renderer.
pub mod scope;
pub mod value;

pub use bootstrap::{bootstrap, BootstrapSummary};
pub use console::{Console, ConsoleState, PROMPT};
pub use display::{DisplayGuard, DisplayHook, DisplayPolicy, Monitor, Render, ReprRenderer};
pub use editor::{LineEditor, ReadOutcome, RustylineEditor, ScriptEditor};
pub use error::EvalError;
pub use eval::eval_line;
pub use exit::{EvalResult, ExitRequest, FrameContext, Unwind};
pub use history::{HistoryStore, DEFAULT_HISTORY_LEN};
pub use scope::{Scope, LAST_RESULT};
pub use value::{Command, Namespace, SimpleNamespace, Value};

/// Banner printed when a session starts without an explicit one.
pub const DEFAULT_BANNER: &str = "Have fun!";

/// Session configuration for [`run_shell`].
#[derive(Default)]
pub struct ShellOptions {
    /// Printed once before the first prompt.
    pub banner: Option<String>,
    /// Printed when input runs out.
    pub exit_banner: Option<String>,
    /// Register table bound as `sysreg` and merged last.
    pub registers: Option<Rc<dyn Namespace>>,
    /// Polled before each rendered result.
    pub monitor: Option<Rc<dyn Monitor>>,
    /// Where history is loaded from and saved to; `None` keeps it in memory.
    pub history: Option<HistoryStore>,
}

/// Bootstrap `scope` and run a console session over it.
///
/// Returns the payload of a controlled exit, or `None` when the session ended
/// without one. Evaluation faults never end the session; editor, output and
/// history write failures are returned as errors.
pub fn run_shell<E, W>(
    scope: &mut Scope,
    editor: E,
    writer: W,
    display: &DisplayHook,
    options: ShellOptions,
) -> Result<Option<Value>>
where
    E: LineEditor,
    W: Write,
{
    let summary = bootstrap(scope, options.registers.as_ref());
    info!(
        "starting console with {} bindings ({} commands flattened)",
        scope.len(),
        summary.flattened
    );
    let mut console = Console::new(editor, writer, scope, display)
        .with_history(options.history)
        .with_monitor(options.monitor);
    console.interact(options.banner.as_deref(), options.exit_banner.as_deref())
}
