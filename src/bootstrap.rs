// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Populate the console scope from collaborator namespaces.
// Author: Lukas Bower

//! Populate the console scope from collaborator namespaces.
//!
//! Merge order:
//!
//! 1. `h` is bound to the hex formatter and `sysreg` to the register table.
//! 2. `proxy` and `utils` gain the short aliases `p` and `u` unless those are taken.
//! 3. Callable attributes of `iface`, `p` and `u` (in that order) are bound by bare
//!    name when the name is still free, so user bindings and earlier collaborators win.
//! 4. Every register-table attribute is bound last and overwrites whatever was there.

use std::rc::Rc;

use log::debug;

use crate::eval::builtins::hex_command;
use crate::scope::Scope;
use crate::value::{Namespace, Value};

/// Name bound to the hexadecimal formatter.
pub const HEX_ALIAS: &str = "h";

/// Name bound to the register table itself.
pub const REGISTER_TABLE: &str = "sysreg";

/// Long-form collaborator bindings and the short alias each receives.
pub const ALIASES: [(&str, &str); 2] = [("proxy", "p"), ("utils", "u")];

/// Bindings whose callable attributes are flattened, highest priority first.
pub const FLATTEN_ORDER: [&str; 3] = ["iface", "p", "u"];

/// Counts of bindings added by [`bootstrap`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapSummary {
    /// Collaborator commands bound by bare name.
    pub flattened: usize,
    /// Register-table attributes bound.
    pub registers: usize,
}

/// Merge convenience bindings and collaborator attributes into `scope`.
pub fn bootstrap(scope: &mut Scope, registers: Option<&Rc<dyn Namespace>>) -> BootstrapSummary {
    scope.insert(HEX_ALIAS, hex_command());
    if let Some(table) = registers {
        scope.insert(REGISTER_TABLE, Value::Namespace(Rc::clone(table)));
    }

    alias_collaborators(scope);
    let summary = BootstrapSummary {
        flattened: flatten_commands(scope),
        registers: registers.map_or(0, |table| import_registers(scope, table.as_ref())),
    };
    debug!(
        "scope bootstrapped: {} commands flattened, {} registers imported, {} bindings",
        summary.flattened,
        summary.registers,
        scope.len()
    );
    summary
}

fn alias_collaborators(scope: &mut Scope) {
    for (long, short) in ALIASES {
        if scope.contains(short) {
            continue;
        }
        if let Some(value) = scope.get(long).cloned() {
            scope.insert(short, value);
        }
    }
}

fn flatten_commands(scope: &mut Scope) -> usize {
    let mut flattened = 0;
    for owner in FLATTEN_ORDER {
        let Some(Value::Namespace(ns)) = scope.get(owner).cloned() else {
            continue;
        };
        for (name, value) in ns.entries() {
            if value.is_callable() && scope.insert_if_absent(&name, value) {
                flattened += 1;
            }
        }
    }
    flattened
}

fn import_registers(scope: &mut Scope, table: &dyn Namespace) -> usize {
    let entries = table.entries();
    let count = entries.len();
    for (name, value) in entries {
        scope.insert(name, value);
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SimpleNamespace;

    fn command_ns(type_name: &str, names: &[&str]) -> Value {
        names
            .iter()
            .fold(SimpleNamespace::new(type_name), |ns, name| {
                ns.with_command(name, |_, _| Ok(Value::None))
            })
            .into_value()
    }

    fn attr(ns: &Value, name: &str) -> Value {
        let Value::Namespace(ns) = ns else {
            panic!("not a namespace");
        };
        ns.attr(name).expect("attribute")
    }

    #[test]
    fn hex_alias_is_always_bound() {
        let mut scope = Scope::new();
        bootstrap(&mut scope, None);
        assert_eq!(scope.get(HEX_ALIAS), Some(&Value::Command(hex_command())));
        assert_eq!(scope.len(), 1);
    }

    #[test]
    fn aliases_respect_existing_bindings() {
        let proxy = command_ns("proxy", &["read32"]);
        let mut scope = Scope::new();
        scope.insert("proxy", proxy.clone());
        scope.insert("u", 5u64);
        scope.insert("utils", command_ns("utils", &["hexdump"]));
        bootstrap(&mut scope, None);
        assert_eq!(scope.get("p"), Some(&proxy));
        assert_eq!(scope.get("u"), Some(&Value::Int(5)));
        assert!(scope.contains("read32"));
        assert!(!scope.contains("hexdump"), "u is not a namespace, nothing flattened");
    }

    #[test]
    fn only_callables_are_flattened() {
        let proxy = SimpleNamespace::new("proxy")
            .with("base", 0x8000_0000u64)
            .with_command("nop", |_, _| Ok(Value::None))
            .into_value();
        let mut scope = Scope::new();
        scope.insert("proxy", proxy);
        let summary = bootstrap(&mut scope, None);
        assert_eq!(summary.flattened, 1);
        assert!(scope.contains("nop"));
        assert!(!scope.contains("base"));
    }

    #[test]
    fn earlier_collaborators_win() {
        let iface = command_ns("iface", &["nop"]);
        let proxy = command_ns("proxy", &["nop", "read32"]);
        let mut scope = Scope::new();
        scope.insert("iface", iface.clone());
        scope.insert("proxy", proxy.clone());
        scope.insert("read32", 1u64);
        bootstrap(&mut scope, None);
        assert_eq!(scope.get("nop"), Some(&attr(&iface, "nop")));
        assert_eq!(scope.get("read32"), Some(&Value::Int(1)));
    }

    #[test]
    fn registers_overwrite_everything() {
        let table: Rc<dyn Namespace> = Rc::new(
            SimpleNamespace::new("sysreg")
                .with("MIDR_EL1", 0x18_0000u64)
                .with("nop", 7u64),
        );
        let mut scope = Scope::new();
        scope.insert("proxy", command_ns("proxy", &["nop"]));
        scope.insert("MIDR_EL1", 1u64);
        let summary = bootstrap(&mut scope, Some(&table));
        assert_eq!(summary.registers, 2);
        assert_eq!(scope.get("MIDR_EL1"), Some(&Value::Int(0x18_0000)));
        assert_eq!(scope.get("nop"), Some(&Value::Int(7)));
        assert!(matches!(scope.get(REGISTER_TABLE), Some(Value::Namespace(_))));
    }

    #[test]
    fn bootstrapping_is_idempotent() {
        let table: Rc<dyn Namespace> =
            Rc::new(SimpleNamespace::new("sysreg").with("SCTLR_EL1", 0x18_1000u64));
        let mut scope = Scope::new();
        scope.insert("proxy", command_ns("proxy", &["read32", "write32"]));
        scope.insert("utils", command_ns("utils", &["hexdump"]));
        bootstrap(&mut scope, Some(&table));
        let first = scope.clone();
        bootstrap(&mut scope, Some(&table));
        assert_eq!(scope, first);
    }
}
