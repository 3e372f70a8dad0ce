// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Read-evaluate-render loop for the proxy debugging console.
// Author: Lukas Bower

//! Read-evaluate-render loop for the proxy debugging console.

use std::any::Any;
use std::io::Write;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use anyhow::{anyhow, Result};
use log::{debug, warn};

use crate::display::{DisplayHook, DisplayPolicy, Monitor};
use crate::editor::{LineEditor, ReadOutcome};
use crate::eval::builtins::BUILTIN_NAMES;
use crate::eval::eval_line;
use crate::exit::{EvalResult, Unwind};
use crate::history::HistoryStore;
use crate::scope::Scope;
use crate::value::Value;

/// Prompt shown before each interactive line.
pub const PROMPT: &str = ">>> ";

/// Lifecycle of a console session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    /// History loaded, renderer not yet installed.
    Starting,
    /// Reading and evaluating lines.
    Interacting,
    /// Persisting history and restoring the renderer.
    Finishing,
    /// Session over.
    Terminated,
}

/// Interactive console bound to a session scope.
pub struct Console<'a, E: LineEditor, W: Write> {
    editor: E,
    writer: W,
    scope: &'a mut Scope,
    display: &'a DisplayHook,
    history: Option<HistoryStore>,
    monitor: Option<Rc<dyn Monitor>>,
    prompt: String,
    state: ConsoleState,
}

impl<'a, E: LineEditor, W: Write> Console<'a, E, W> {
    /// Create a console reading from `editor` and rendering to `writer`.
    pub fn new(editor: E, writer: W, scope: &'a mut Scope, display: &'a DisplayHook) -> Self {
        Self {
            editor,
            writer,
            scope,
            display,
            history: None,
            monitor: None,
            prompt: PROMPT.to_owned(),
            state: ConsoleState::Starting,
        }
    }

    /// Load history from and persist it to `store`.
    #[must_use]
    pub fn with_history(mut self, store: Option<HistoryStore>) -> Self {
        self.history = store;
        self
    }

    /// Poll `monitor` before each rendered result.
    #[must_use]
    pub fn with_monitor(mut self, monitor: Option<Rc<dyn Monitor>>) -> Self {
        self.monitor = monitor;
        self
    }

    /// Replace the default prompt.
    #[must_use]
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConsoleState {
        self.state
    }

    /// Run the session until end-of-input or a controlled exit.
    ///
    /// Returns the exit payload, or `None` when the session ended without one.
    /// History is persisted exactly once before this returns, whichever way the
    /// session ended; the renderer active on entry is restored afterwards. A panic
    /// escaping the editor or writer is re-raised once both are done.
    pub fn interact(
        &mut self,
        banner: Option<&str>,
        exit_banner: Option<&str>,
    ) -> Result<Option<Value>> {
        self.state = ConsoleState::Starting;
        self.load_history();

        let display = self.display;
        let monitor = self.monitor.clone();
        let guard = display.install(|prior| Rc::new(DisplayPolicy::new(prior, monitor)));

        self.state = ConsoleState::Interacting;
        debug!("console interacting");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.greet(banner).and_then(|()| self.run_loop(exit_banner))
        }));

        self.state = ConsoleState::Finishing;
        let saved = self.save_history();
        drop(guard);
        self.state = ConsoleState::Terminated;
        debug!("console terminated");

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(payload) => {
                if let Err(err) = &saved {
                    warn!("history not saved: {err:#}");
                }
                panic::resume_unwind(payload);
            }
        };

        match (outcome, saved) {
            (Err(err), Err(save_err)) => {
                warn!("history not saved: {save_err:#}");
                Err(err)
            }
            (Err(err), Ok(())) | (Ok(_), Err(err)) => Err(err),
            (Ok(payload), Ok(())) => Ok(payload),
        }
    }

    /// Consume the console and return the editor and writer.
    pub fn into_parts(self) -> (E, W) {
        (self.editor, self.writer)
    }

    fn greet(&mut self, banner: Option<&str>) -> Result<()> {
        if let Some(banner) = banner {
            writeln!(self.writer, "{banner}")?;
        }
        Ok(())
    }

    fn load_history(&mut self) {
        let Some(store) = &self.history else {
            return;
        };
        if let Err(err) = self.editor.load_history(store) {
            warn!("starting with empty history: {err:#}");
        }
    }

    fn save_history(&mut self) -> Result<()> {
        match &self.history {
            Some(store) => self.editor.save_history(store),
            None => Ok(()),
        }
    }

    fn run_loop(&mut self, exit_banner: Option<&str>) -> Result<Option<Value>> {
        loop {
            let names = self.completion_names();
            self.editor.set_completions(names);
            let line = match self.editor.read_line(&self.prompt)? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Interrupted => {
                    writeln!(self.writer, "interrupted")?;
                    continue;
                }
                ReadOutcome::Eof => {
                    if let Some(exit_banner) = exit_banner {
                        writeln!(self.writer, "{exit_banner}")?;
                    }
                    debug!("end of input");
                    return Ok(None);
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            self.editor.add_history(&line);

            match self.run_unit(&line) {
                Ok(()) => {}
                Err(Unwind::Exit(request)) => {
                    debug!("exit requested: {:?}", request.payload());
                    return Ok(request.into_payload());
                }
                Err(Unwind::Fault(err)) => self.report_fault(&err)?,
            }
            self.writer.flush()?;
        }
    }

    /// Evaluate and render one line. A panic inside a command becomes a fault.
    fn run_unit(&mut self, line: &str) -> EvalResult<()> {
        let scope = &mut *self.scope;
        let writer = &mut self.writer;
        let display = self.display;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let value = eval_line(line, scope, writer)?;
            if matches!(value, Value::None) {
                return Ok(());
            }
            display.current().render(&value, scope, writer)
        }));
        outcome.unwrap_or_else(|payload| {
            let message = panic_message(payload.as_ref());
            warn!("recovered from panic: {message}");
            Err(Unwind::Fault(
                anyhow!("panic: {message}").context(format!("while evaluating `{}`", line.trim())),
            ))
        })
    }

    fn report_fault(&mut self, err: &anyhow::Error) -> Result<()> {
        debug!("recovered from fault: {err:#}");
        writeln!(self.writer, "error: {err}")?;
        let mut causes = err.chain().skip(1).peekable();
        if causes.peek().is_some() {
            writeln!(self.writer, "Caused by:")?;
            for cause in causes {
                writeln!(self.writer, "    {cause}")?;
            }
        }
        Ok(())
    }

    fn completion_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scope.names().map(str::to_owned).collect();
        names.extend(BUILTIN_NAMES.iter().map(|name| (*name).to_owned()));
        names.sort_unstable();
        names.dedup();
        names
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::ScriptEditor;
    use crate::scope::LAST_RESULT;
    use std::io::Cursor;

    fn session(script: &str, scope: &mut Scope) -> (Result<Option<Value>>, String) {
        let display = DisplayHook::default();
        let mut console = Console::new(
            ScriptEditor::new(Cursor::new(script.to_owned())),
            Vec::new(),
            scope,
            &display,
        );
        let outcome = console.interact(None, Some("bye"));
        assert_eq!(console.state(), ConsoleState::Terminated);
        let (_editor, output) = console.into_parts();
        (outcome, String::from_utf8(output).unwrap())
    }

    #[test]
    fn integers_render_as_hex() {
        let mut scope = Scope::new();
        let (outcome, output) = session("x = 255\nx\n_ + 1\n", &mut scope);
        assert_eq!(outcome.unwrap(), None);
        assert_eq!(output, "0xff\n0x100\nbye\n");
        assert_eq!(scope.get(LAST_RESULT), Some(&Value::Int(256)));
    }

    #[test]
    fn faults_are_reported_and_the_session_continues() {
        let mut scope = Scope::new();
        let (outcome, output) = session("1 / 0\n2\n", &mut scope);
        assert_eq!(outcome.unwrap(), None);
        assert_eq!(
            output,
            "error: while evaluating `1 / 0`\n\
             Caused by:\n    integer division or modulo by zero\n\
             0x2\nbye\n"
        );
    }

    #[test]
    fn exit_payload_becomes_the_return_value() {
        let mut scope = Scope::new();
        let (outcome, output) = session("exit(42)\n7\n", &mut scope);
        assert_eq!(outcome.unwrap(), Some(Value::Int(42)));
        assert_eq!(output, "");
    }

    #[test]
    fn exit_without_payload_returns_nothing() {
        let mut scope = Scope::new();
        let (outcome, _) = session("quit\n", &mut scope);
        assert_eq!(outcome.unwrap(), None);
        let (outcome, _) = session("exit(None)\n", &mut scope);
        assert_eq!(outcome.unwrap(), Some(Value::None));
    }

    #[test]
    fn blank_lines_stay_out_of_history() {
        let mut scope = Scope::new();
        let display = DisplayHook::default();
        let mut console = Console::new(
            ScriptEditor::new(Cursor::new("\n  \na = 1\n")),
            Vec::new(),
            &mut scope,
            &display,
        );
        console.interact(None, None).unwrap();
        let (editor, _) = console.into_parts();
        assert_eq!(editor.history(), ["a = 1"]);
    }

    #[test]
    fn renderer_is_restored_after_exit() {
        let mut scope = Scope::new();
        let display = DisplayHook::default();
        let original = display.current();
        let mut console = Console::new(
            ScriptEditor::new(Cursor::new("exit()\n")),
            Vec::new(),
            &mut scope,
            &display,
        );
        console.interact(Some("hello"), None).unwrap();
        assert!(display.is_active(&original));
        let (_, output) = console.into_parts();
        assert_eq!(output, b"hello\n");
    }

    #[test]
    fn completions_cover_scope_and_builtins() {
        let mut scope = Scope::new();
        scope.insert("read32", 0u64);
        scope.insert("exit", 1u64);
        let display = DisplayHook::default();
        let console = Console::new(
            ScriptEditor::new(Cursor::new("")),
            Vec::new(),
            &mut scope,
            &display,
        );
        let names = console.completion_names();
        assert!(names.contains(&"read32".to_owned()));
        assert_eq!(names.iter().filter(|name| *name == "exit").count(), 1);
    }
}
