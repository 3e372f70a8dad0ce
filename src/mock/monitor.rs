// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Watch proxy memory words and report changes between results.
// Author: Lukas Bower

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::Write;
use std::rc::Rc;

use anyhow::Result;
use log::debug;

use super::proxy::MockProxy;
use crate::display::Monitor;
use crate::value::{expect_args, Command, Namespace, Value};

struct Watches {
    proxy: MockProxy,
    words: RefCell<BTreeMap<u64, u64>>,
}

impl Watches {
    fn add(&self, addr: u64) -> Result<()> {
        let value = self.proxy.read(addr, 32)?;
        self.words.borrow_mut().insert(addr, value);
        debug!("monitoring {addr:#x}");
        Ok(())
    }
}

/// Reports watched 32-bit words whose value changed since the previous poll.
///
/// Bound in scope as `mon` with `add(addr)` and `clear()`.
#[derive(Clone)]
pub struct MemoryMonitor {
    watches: Rc<Watches>,
    entries: Rc<Vec<(String, Value)>>,
}

impl MemoryMonitor {
    /// Create a monitor with nothing watched.
    pub fn new(proxy: MockProxy) -> Self {
        let watches = Rc::new(Watches {
            proxy,
            words: RefCell::new(BTreeMap::new()),
        });

        let shared = Rc::clone(&watches);
        let add = Command::new("add", move |_, args| {
            let [addr] = expect_args::<1>("add", args)?;
            shared.add(addr.expect_u64("address")?)?;
            Ok(Value::None)
        });
        let shared = Rc::clone(&watches);
        let clear = Command::new("clear", move |_, args| {
            expect_args::<0>("clear", args)?;
            shared.words.borrow_mut().clear();
            Ok(Value::None)
        });

        Self {
            watches,
            entries: Rc::new(vec![
                ("add".to_owned(), add.into()),
                ("clear".to_owned(), clear.into()),
            ]),
        }
    }

    /// Start watching the word at `addr`.
    pub fn add(&self, addr: u64) -> Result<()> {
        self.watches.add(addr)
    }

    /// Watched addresses, ascending.
    #[must_use]
    pub fn watched(&self) -> Vec<u64> {
        self.watches.words.borrow().keys().copied().collect()
    }
}

impl Monitor for MemoryMonitor {
    fn poll(&self, out: &mut dyn Write) -> Result<()> {
        let mut words = self.watches.words.borrow_mut();
        for (addr, last) in words.iter_mut() {
            let current = self.watches.proxy.read(*addr, 32)?;
            if current != *last {
                writeln!(out, "[mon] {addr:#x}: {last:#010x} -> {current:#010x}")?;
                *last = current;
            }
        }
        Ok(())
    }
}

impl Namespace for MemoryMonitor {
    fn type_name(&self) -> &str {
        "monitor"
    }

    fn entries(&self) -> Vec<(String, Value)> {
        self.entries.as_ref().clone()
    }
}
