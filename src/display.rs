// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Result rendering policy and the scoped renderer hook.
// Author: Lukas Bower

//! Result rendering for top-level console expressions.
//!
//! A [`DisplayHook`] owns the active renderer. [`DisplayHook::install`] swaps a new
//! renderer in and hands back a [`DisplayGuard`]; dropping the guard restores the
//! previous renderer on every exit path, including unwinding.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

use anyhow::Context;
use log::trace;

use crate::exit::EvalResult;
use crate::scope::{Scope, LAST_RESULT};
use crate::value::{format_hex, Value};

/// Renders a non-`None` top-level result.
pub trait Render {
    /// Render `value`, possibly updating `scope`, writing to `out`.
    fn render(&self, value: &Value, scope: &mut Scope, out: &mut dyn Write) -> EvalResult<()>;
}

/// Optional monitoring hook polled before each result is rendered.
pub trait Monitor {
    /// Report any pending events to `out`.
    fn poll(&self, out: &mut dyn Write) -> anyhow::Result<()>;
}

/// Default renderer: binds `_` and prints the `repr` form.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReprRenderer;

impl Render for ReprRenderer {
    fn render(&self, value: &Value, scope: &mut Scope, out: &mut dyn Write) -> EvalResult<()> {
        scope.insert(LAST_RESULT, value.clone());
        writeln!(out, "{value}")?;
        Ok(())
    }
}

/// Console result policy: integers (booleans included) in hex, callables invoked,
/// the rest delegated.
pub struct DisplayPolicy {
    fallback: Rc<dyn Render>,
    monitor: Option<Rc<dyn Monitor>>,
}

impl DisplayPolicy {
    /// Create a policy that delegates unhandled values to `fallback`.
    pub fn new(fallback: Rc<dyn Render>, monitor: Option<Rc<dyn Monitor>>) -> Self {
        Self { fallback, monitor }
    }
}

impl Render for DisplayPolicy {
    fn render(&self, value: &Value, scope: &mut Scope, out: &mut dyn Write) -> EvalResult<()> {
        if let Some(monitor) = &self.monitor {
            monitor.poll(out).context("monitor poll failed")?;
        }
        match value {
            Value::Int(_) | Value::Bool(_) => {
                scope.insert(LAST_RESULT, value.clone());
                writeln!(out, "{}", format_hex(value.as_int().unwrap_or_default()))?;
                Ok(())
            }
            Value::Command(command) => {
                trace!("invoking bare command {}", command.name());
                command.call(out, &[]).map(drop)
            }
            other => self.fallback.render(other, scope, out),
        }
    }
}

/// Holder of the active renderer.
pub struct DisplayHook {
    current: RefCell<Rc<dyn Render>>,
}

impl DisplayHook {
    /// Create a hook whose active renderer is `renderer`.
    pub fn new(renderer: Rc<dyn Render>) -> Self {
        Self {
            current: RefCell::new(renderer),
        }
    }

    /// The renderer currently in effect.
    #[must_use]
    pub fn current(&self) -> Rc<dyn Render> {
        Rc::clone(&self.current.borrow())
    }

    /// Replace the active renderer with the one built by `make`, which receives
    /// the renderer being replaced. The replacement is undone when the returned
    /// guard is dropped.
    pub fn install<F>(&self, make: F) -> DisplayGuard<'_>
    where
        F: FnOnce(Rc<dyn Render>) -> Rc<dyn Render>,
    {
        let saved = self.current();
        let installed = make(Rc::clone(&saved));
        *self.current.borrow_mut() = installed;
        DisplayGuard {
            hook: self,
            saved: Some(saved),
        }
    }

    /// Return `true` if `renderer` is the active renderer.
    #[must_use]
    pub fn is_active(&self, renderer: &Rc<dyn Render>) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.current.borrow()), Rc::as_ptr(renderer))
    }
}

impl Default for DisplayHook {
    fn default() -> Self {
        Self::new(Rc::new(ReprRenderer))
    }
}

/// Restores the renderer that was active before [`DisplayHook::install`].
#[must_use = "dropping the guard immediately restores the previous renderer"]
pub struct DisplayGuard<'a> {
    hook: &'a DisplayHook,
    saved: Option<Rc<dyn Render>>,
}

impl Drop for DisplayGuard<'_> {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            *self.hook.current.borrow_mut() = saved;
            trace!("display renderer restored");
        }
    }
}
