// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Session scope shared by the bootstrapper, console loop and evaluated input.
// Author: Lukas Bower

use std::collections::BTreeMap;

use crate::value::Value;

/// Name bound to the most recent integer result.
pub const LAST_RESULT: &str = "_";

/// Mutable identifier-to-value mapping visible to evaluated input.
///
/// Iteration is ordered by name so that bootstrapping and completion are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    bindings: BTreeMap<String, Value>,
}

impl Scope {
    /// Create an empty scope.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a binding.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Return `true` if `name` is bound.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Bind `name`, replacing and returning any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.bindings.insert(name.into(), value.into())
    }

    /// Bind `name` only if it is unbound; returns whether the binding was added.
    pub fn insert_if_absent(&mut self, name: &str, value: impl Into<Value>) -> bool {
        if self.bindings.contains_key(name) {
            return false;
        }
        self.bindings.insert(name.to_owned(), value.into());
        true
    }

    /// Remove a binding.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.bindings.remove(name)
    }

    /// Bound names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.bindings.keys().map(String::as_str)
    }

    /// Bindings in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.bindings.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Return `true` when nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Scope {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            bindings: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_if_absent_keeps_first_writer() {
        let mut scope = Scope::new();
        assert!(scope.insert_if_absent("x", 1u64));
        assert!(!scope.insert_if_absent("x", 2u64));
        assert_eq!(scope.get("x"), Some(&Value::Int(1)));
        assert_eq!(scope.insert("x", 3u64), Some(Value::Int(1)));
    }

    #[test]
    fn names_are_sorted() {
        let scope: Scope = [("b", 1u64), ("a", 2u64), ("c", 3u64)].into_iter().collect();
        assert_eq!(scope.names().collect::<Vec<_>>(), ["a", "b", "c"]);
    }
}
