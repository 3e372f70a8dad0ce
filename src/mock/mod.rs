// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Software collaborators standing in for a live proxy connection.
// Author: Lukas Bower

//! Software collaborators standing in for a live proxy connection.

mod monitor;
mod proxy;
pub mod sysreg;
mod utils;

use std::rc::Rc;

pub use monitor::MemoryMonitor;
pub use proxy::{MockProxy, ACCESS_WIDTHS, DEFAULT_BASE};
pub use sysreg::RegisterTable;
pub use utils::{align_down, align_up, write_hexdump, write_regdump, MockUtils, MAX_DUMP_LEN};

use crate::scope::Scope;
use crate::value::Value;

/// Build the initial bindings for a mock session: `proxy`, `utils` and, when
/// supplied, `mon`.
pub fn session_scope(proxy: &MockProxy, monitor: Option<&Rc<MemoryMonitor>>) -> Scope {
    let mut scope = Scope::new();
    scope.insert("proxy", Value::Namespace(Rc::new(proxy.clone())));
    scope.insert("utils", Value::Namespace(Rc::new(MockUtils::new(proxy))));
    if let Some(monitor) = monitor {
        let monitor: Rc<MemoryMonitor> = Rc::clone(monitor);
        scope.insert("mon", Value::Namespace(monitor));
    }
    scope
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::bootstrap;
    use crate::value::Namespace;

    #[test]
    fn bootstrapped_mock_scope_exposes_bare_commands() {
        let proxy = MockProxy::new();
        let monitor = Rc::new(MemoryMonitor::new(proxy.clone()));
        let mut scope = session_scope(&proxy, Some(&monitor));
        let registers: Rc<dyn Namespace> = Rc::new(RegisterTable::new());
        bootstrap(&mut scope, Some(&registers));
        for name in ["p", "u", "mon", "read32", "hexdump", "align_up", "MIDR_EL1", "sysreg_name"] {
            assert!(scope.contains(name), "missing {name}");
        }
        assert!(!scope.contains("base"));
        assert!(!scope.contains("add"), "mon is not flattened");
    }
}
