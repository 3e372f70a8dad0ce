// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Verify history carries over between consecutive console sessions.
// Author: Lukas Bower

use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use proxysh::value::Command;
use proxysh::{
    run_shell, DisplayHook, HistoryStore, LineEditor, ReadOutcome, Scope, ScriptEditor,
    ShellOptions, Value,
};

/// Scripted editor that remembers the history it was seeded with.
struct RecordingEditor {
    inner: ScriptEditor<Cursor<String>>,
    seeded: Vec<String>,
}

impl RecordingEditor {
    fn new(script: &str) -> Self {
        Self {
            inner: ScriptEditor::new(Cursor::new(script.to_owned())),
            seeded: Vec::new(),
        }
    }
}

impl LineEditor for &mut RecordingEditor {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<ReadOutcome> {
        self.inner.read_line(prompt)
    }

    fn add_history(&mut self, line: &str) {
        self.inner.add_history(line);
    }

    fn history(&self) -> Vec<String> {
        self.inner.history()
    }

    fn load_history(&mut self, store: &HistoryStore) -> anyhow::Result<()> {
        self.inner.load_history(store)?;
        self.seeded = self.inner.history();
        Ok(())
    }

    fn save_history(&mut self, store: &HistoryStore) -> anyhow::Result<()> {
        self.inner.save_history(store)
    }
}

/// Scripted editor whose input device fails hard once the script runs out.
struct WedgedEditor(ScriptEditor<Cursor<String>>);

impl LineEditor for WedgedEditor {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<ReadOutcome> {
        match self.0.read_line(prompt)? {
            ReadOutcome::Eof => panic!("terminal went away"),
            outcome => Ok(outcome),
        }
    }

    fn add_history(&mut self, line: &str) {
        self.0.add_history(line);
    }

    fn history(&self) -> Vec<String> {
        self.0.history()
    }

    fn load_history(&mut self, store: &HistoryStore) -> anyhow::Result<()> {
        self.0.load_history(store)
    }

    fn save_history(&mut self, store: &HistoryStore) -> anyhow::Result<()> {
        self.0.save_history(store)
    }
}

fn session(path: &Path, max_len: usize, script: &str) -> (Option<Value>, Vec<String>) {
    let mut editor = RecordingEditor::new(script);
    let options = ShellOptions {
        history: Some(HistoryStore::new(path).with_max_len(max_len)),
        ..ShellOptions::default()
    };
    let payload = run_shell(
        &mut Scope::new(),
        &mut editor,
        Vec::new(),
        &DisplayHook::default(),
        options,
    )
    .expect("session");
    (payload, editor.seeded)
}

#[test]
fn missing_history_file_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let (payload, seeded) = session(&dir.path().join("history"), 10_000, "1\n");
    assert_eq!(payload, None);
    assert!(seeded.is_empty());
}

#[test]
fn next_session_loads_what_the_last_one_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history");
    session(&path, 10_000, "x = 1\nx + 1\n");
    let (payload, seeded) = session(&path, 10_000, "exit(1)\n");
    assert_eq!(payload, Some(Value::Int(1)));
    assert_eq!(seeded, ["x = 1", "x + 1"]);

    let (_, seeded) = session(&path, 10_000, "");
    assert_eq!(seeded, ["x = 1", "x + 1", "exit(1)"]);
}

#[test]
fn history_is_capped_to_the_most_recent_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history");
    let script: String = (0..10_005).map(|n| format!("{n}\n")).collect();
    session(&path, 10_000, &script);

    let stored = HistoryStore::new(&path).load().unwrap();
    assert_eq!(stored.len(), 10_000);
    assert_eq!(stored.first().map(String::as_str), Some("5"));
    assert_eq!(stored.last().map(String::as_str), Some("10004"));

    let (_, seeded) = session(&path, 10_000, "");
    assert_eq!(seeded, stored);
}

#[test]
fn faulting_sessions_still_save_history() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history");
    session(&path, 10_000, "1 / 0\nundefined_name\n");
    assert_eq!(
        HistoryStore::new(&path).load().unwrap(),
        ["1 / 0", "undefined_name"]
    );
}

#[test]
fn unwritable_history_is_reported_after_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "not a directory").unwrap();
    let options = ShellOptions {
        history: Some(HistoryStore::new(blocker.join("history"))),
        ..ShellOptions::default()
    };
    let display = DisplayHook::default();
    let original = display.current();
    let err = run_shell(
        &mut Scope::new(),
        ScriptEditor::new(Cursor::new("exit(1)\n")),
        Vec::new(),
        &display,
        options,
    )
    .expect_err("history write should fail");
    assert!(format!("{err:#}").contains("failed to create"));
    assert!(display.is_active(&original));
}

#[test]
fn runaway_input_faults_and_history_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history");
    let deep = format!("{}1", "-".repeat(200_000));
    let script = format!("[0] * 0xffffffffffffffff\n'ab' * 0xffffffffffffffff\n{deep}\nexit(5)\n");
    let (payload, _) = session(&path, 10_000, &script);
    assert_eq!(payload, Some(Value::Int(5)));
    let stored = HistoryStore::new(&path).load().unwrap();
    assert_eq!(stored.len(), 4);
    assert_eq!(stored[0], "[0] * 0xffffffffffffffff");
    assert_eq!(stored[3], "exit(5)");
}

#[test]
fn panicking_command_is_reported_and_history_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history");
    let mut scope = Scope::new();
    scope.insert(
        "wedge",
        Command::new("wedge", |_, _| panic!("bus wedged")),
    );
    let mut output = Vec::new();
    let options = ShellOptions {
        history: Some(HistoryStore::new(&path)),
        ..ShellOptions::default()
    };
    let payload = run_shell(
        &mut scope,
        ScriptEditor::new(Cursor::new("wedge()\n1\n")),
        &mut output,
        &DisplayHook::default(),
        options,
    )
    .expect("session survives the panic");
    assert_eq!(payload, None);
    assert_eq!(
        String::from_utf8(output).unwrap(),
        "error: while evaluating `wedge()`\nCaused by:\n    panic: bus wedged\n0x1\n"
    );
    assert_eq!(HistoryStore::new(&path).load().unwrap(), ["wedge()", "1"]);
}

#[test]
fn panicking_editor_saves_history_before_unwinding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history");
    let display = DisplayHook::default();
    let original = display.current();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let options = ShellOptions {
            history: Some(HistoryStore::new(&path)),
            ..ShellOptions::default()
        };
        run_shell(
            &mut Scope::new(),
            WedgedEditor(ScriptEditor::new(Cursor::new("x = 1\n".to_owned()))),
            Vec::new(),
            &display,
            options,
        )
    }));
    assert!(outcome.is_err(), "editor panic should propagate");
    assert!(display.is_active(&original));
    assert_eq!(HistoryStore::new(&path).load().unwrap(), ["x = 1"]);
}
