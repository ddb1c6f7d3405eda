//! Scope stack for lexical name binding
//!
//! Tracks nested `{ ... }` blocks during graph building. Names are unique
//! within one scope; an inner scope may shadow an outer one.

use rustc_hash::FxHashMap;

/// Stack of lexical scopes, innermost last
#[derive(Debug, Clone)]
pub struct ScopeStack<T> {
    scopes: Vec<FxHashMap<String, T>>,
}

impl<T> ScopeStack<T> {
    /// Create a stack holding only the global scope
    pub fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    /// Push a new scope
    pub fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    /// Pop the current scope. The global scope is never popped.
    pub fn pop(&mut self) -> Option<FxHashMap<String, T>> {
        if self.scopes.len() > 1 {
            self.scopes.pop()
        } else {
            None
        }
    }

    /// Current depth (1 = global)
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_global(&self) -> bool {
        self.scopes.len() == 1
    }

    /// Bind `name` in the current scope. Returns false if it is already
    /// bound there.
    pub fn declare(&mut self, name: impl Into<String>, value: T) -> bool {
        let name = name.into();
        match self.scopes.last_mut() {
            Some(scope) if !scope.contains_key(&name) => {
                scope.insert(name, value);
                true
            }
            _ => false,
        }
    }

    /// Innermost binding of `name`
    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.scopes.iter().rev().find_map(|s| s.get(name))
    }

    pub fn is_declared_here(&self, name: &str) -> bool {
        self.scopes.last().is_some_and(|s| s.contains_key(name))
    }
}

impl<T> Default for ScopeStack<T> {
    fn default() -> Self {
        Self::new()
    }
}
