// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: CLI entry point for the proxysh debugging console.
// Author: Lukas Bower
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! CLI entry point for the proxysh debugging console.

use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use env_logger::Env;
use log::{warn, LevelFilter};

use proxysh::mock::{session_scope, MemoryMonitor, MockProxy, RegisterTable};
use proxysh::{
    run_shell, DisplayHook, HistoryStore, Monitor, Namespace, RustylineEditor, ScriptEditor,
    ShellOptions, Value, DEFAULT_BANNER, DEFAULT_HISTORY_LEN,
};

/// proxysh command-line arguments.
#[derive(Debug, Parser)]
#[command(author = "Lukas Bower", version, about = "Interactive proxy debugging console", long_about = None)]
struct Cli {
    /// History file (defaults to $PROXYSH_HISTORY, then ~/.proxysh-history).
    #[arg(long, value_name = "FILE", conflicts_with = "no_history")]
    history: Option<PathBuf>,

    /// Keep history in memory only.
    #[arg(long, default_value_t = false)]
    no_history: bool,

    /// Number of history entries retained (defaults to $PROXYSH_HISTORY_SIZE, then 10000).
    #[arg(long, value_name = "N")]
    history_size: Option<usize>,

    /// Evaluate lines from a file instead of starting an interactive console.
    #[arg(long, value_name = "FILE")]
    script: Option<PathBuf>,

    /// Banner printed before the first prompt.
    #[arg(long, value_name = "TEXT")]
    banner: Option<String>,

    /// Banner printed when input runs out.
    #[arg(long, value_name = "TEXT")]
    exit_banner: Option<String>,

    /// Do not poll the memory monitor before rendering results.
    #[arg(long, default_value_t = false)]
    no_monitor: bool,

    /// Enable debug logging.
    #[arg(short = 'v', long, default_value_t = false)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let mut builder =
        env_logger::Builder::from_env(Env::default().default_filter_or(default_level.as_str()));
    builder.format_timestamp_millis();
    let _ = builder.try_init();
}

fn parse_env_number<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                trimmed
                    .parse::<T>()
                    .map(Some)
                    .map_err(|err| anyhow!("invalid {key} value '{trimmed}': {err}"))
            }
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(err) => Err(anyhow!("failed to read {key}: {err}")),
    }
}

fn env_override<T>(cli_value: Option<T>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    if cli_value.is_some() {
        return Ok(cli_value);
    }
    parse_env_number(key)
}

fn resolve_history_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path);
    }
    if let Ok(value) = env::var("PROXYSH_HISTORY") {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    HistoryStore::default_path()
}

fn exit_code(payload: Option<Value>) -> ExitCode {
    match payload {
        None => ExitCode::SUCCESS,
        Some(Value::Int(code)) => ExitCode::from((code & 0xff) as u8),
        Some(other) => {
            println!("{other}");
            ExitCode::SUCCESS
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let history_size =
        env_override(cli.history_size, "PROXYSH_HISTORY_SIZE")?.unwrap_or(DEFAULT_HISTORY_LEN);

    let proxy = MockProxy::new();
    let monitor = (!cli.no_monitor).then(|| Rc::new(MemoryMonitor::new(proxy.clone())));
    let mut scope = session_scope(&proxy, monitor.as_ref());
    let registers: Rc<dyn Namespace> = Rc::new(RegisterTable::new());
    let mut options = ShellOptions {
        banner: cli.banner.clone(),
        exit_banner: cli.exit_banner.clone(),
        registers: Some(registers),
        monitor: monitor.map(|monitor| monitor as Rc<dyn Monitor>),
        history: None,
    };
    let display = DisplayHook::default();

    let payload = if let Some(script_path) = cli.script {
        let file = File::open(&script_path)
            .with_context(|| format!("failed to open script {}", script_path.display()))?;
        let editor = ScriptEditor::new(BufReader::new(file));
        run_shell(&mut scope, editor, io::stdout(), &display, options)?
    } else {
        if !cli.no_history {
            match resolve_history_path(cli.history) {
                Some(path) => {
                    options.history = Some(HistoryStore::new(path).with_max_len(history_size));
                }
                None => warn!("no home directory; history will not be saved"),
            }
        }
        options.banner = options.banner.or_else(|| Some(DEFAULT_BANNER.to_owned()));
        let editor = RustylineEditor::new(history_size)?;
        run_shell(&mut scope, editor, io::stdout(), &display, options)?
    };

    Ok(exit_code(payload))
}
