// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Line editors feeding the console loop.
// Author: Lukas Bower

//! Line editors feeding the console loop.
//!
//! [`RustylineEditor`] drives interactive terminals; [`ScriptEditor`] replays lines
//! from any buffered reader so scripts and tests run through the same loop. Both
//! keep their history in rustyline's history type and persist it through a
//! [`HistoryStore`].

use std::io::BufRead;

use anyhow::{Context as _, Result};
use log::warn;
use rustyline::completion::Completer;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::{DefaultHistory, FileHistory, History};
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, Editor, Helper};

use crate::history::{session_history, HistoryStore, DEFAULT_HISTORY_LEN};

/// Result of asking the editor for the next line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete line, without its terminator.
    Line(String),
    /// The user pressed Ctrl-C; the partial line is discarded.
    Interrupted,
    /// Input is exhausted.
    Eof,
}

/// Source of console input lines with an in-memory history.
pub trait LineEditor {
    /// Prompt for and read the next line.
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome>;

    /// Append an entry to the session history.
    fn add_history(&mut self, line: &str);

    /// Session history, oldest first.
    fn history(&self) -> Vec<String>;

    /// Seed the session history from `store`.
    fn load_history(&mut self, store: &HistoryStore) -> Result<()>;

    /// Persist the session history to `store`.
    fn save_history(&mut self, store: &HistoryStore) -> Result<()>;

    /// Names offered for tab completion.
    fn set_completions(&mut self, _names: Vec<String>) {}
}

/// Completes identifiers from the current scope and builtins.
#[derive(Debug, Default)]
pub struct NameCompleter {
    names: Vec<String>,
}

impl NameCompleter {
    fn candidates(&self, line: &str, pos: usize) -> (usize, Vec<String>) {
        let head = &line[..pos];
        let start = head
            .char_indices()
            .rev()
            .find(|(_, ch)| !(ch.is_alphanumeric() || *ch == '_'))
            .map_or(0, |(index, ch)| index + ch.len_utf8());
        let word = &head[start..];
        if word.is_empty() || head[..start].ends_with('.') {
            return (start, Vec::new());
        }
        let matches = self
            .names
            .iter()
            .filter(|name| name.starts_with(word))
            .cloned()
            .collect();
        (start, matches)
    }
}

impl Completer for NameCompleter {
    type Candidate = String;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<String>)> {
        Ok(self.candidates(line, pos))
    }
}

impl Hinter for NameCompleter {
    type Hint = String;
}

impl Highlighter for NameCompleter {}

impl Validator for NameCompleter {}

impl Helper for NameCompleter {}

/// Interactive editor backed by rustyline.
pub struct RustylineEditor {
    editor: Editor<NameCompleter, DefaultHistory>,
}

impl RustylineEditor {
    /// Create an editor whose in-memory history holds `max_history` entries.
    pub fn new(max_history: usize) -> Result<Self> {
        let config = Config::builder()
            .max_history_size(max_history.max(1))
            .context("invalid history size")?
            .auto_add_history(false)
            .completion_type(CompletionType::List)
            .build();
        let mut editor = Editor::with_config(config).context("failed to initialise line editor")?;
        editor.set_helper(Some(NameCompleter::default()));
        Ok(Self { editor })
    }
}

impl LineEditor for RustylineEditor {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(err) => Err(err).context("failed to read console input"),
        }
    }

    fn add_history(&mut self, line: &str) {
        if let Err(err) = self.editor.add_history_entry(line) {
            warn!("failed to record history entry: {err}");
        }
    }

    fn history(&self) -> Vec<String> {
        self.editor.history().iter().cloned().collect()
    }

    fn load_history(&mut self, store: &HistoryStore) -> Result<()> {
        store.load_into(self.editor.history_mut())
    }

    fn save_history(&mut self, store: &HistoryStore) -> Result<()> {
        store.save_from(self.editor.history_mut())
    }

    fn set_completions(&mut self, names: Vec<String>) {
        if let Some(helper) = self.editor.helper_mut() {
            helper.names = names;
        }
    }
}

/// Non-interactive editor that replays lines from a reader.
pub struct ScriptEditor<R: BufRead> {
    reader: R,
    history: FileHistory,
}

impl<R: BufRead> ScriptEditor<R> {
    /// Replay lines from `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            history: session_history(DEFAULT_HISTORY_LEN),
        }
    }
}

impl<R: BufRead> LineEditor for ScriptEditor<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome> {
        let mut line = String::new();
        let bytes = self
            .reader
            .read_line(&mut line)
            .context("failed to read script input")?;
        if bytes == 0 {
            return Ok(ReadOutcome::Eof);
        }
        Ok(ReadOutcome::Line(
            line.trim_end_matches(['\r', '\n']).to_owned(),
        ))
    }

    fn add_history(&mut self, line: &str) {
        if let Err(err) = self.history.add(line) {
            warn!("failed to record history entry: {err}");
        }
    }

    fn history(&self) -> Vec<String> {
        self.history.iter().cloned().collect()
    }

    fn load_history(&mut self, store: &HistoryStore) -> Result<()> {
        store.load_into(&mut self.history)
    }

    fn save_history(&mut self, store: &HistoryStore) -> Result<()> {
        store.save_from(&mut self.history)
    }
}
