//! Attribute hooks
//!
//! Maps attribute keys to callbacks that run at fixed points of the
//! pipeline:
//!
//! - `validate` while the graph is built
//! - `prepare` once before type inference
//! - `retain` during reachability
//!
//! Keys without a registered hook are carried through to the output as
//! opaque metadata.

use rustc_hash::FxHashMap;

use crate::errors::{CompileError, Result};
use crate::shared::models::{Attribute, Graph, Vertex};

pub trait AttributeHook: Send + Sync {
    fn key(&self) -> &'static str;

    /// Check the attribute's arguments
    fn validate(&self, _attr: &Attribute) -> std::result::Result<(), String> {
        Ok(())
    }

    /// Adjust the vertex before inference runs
    fn prepare(&self, _attr: &Attribute, _vertex: &mut Vertex) {}

    /// Keep the vertex even when it is unreachable
    fn retain(&self) -> bool {
        false
    }
}

/// `#[no_remove]`: pin the vertex through dead-vertex elimination
pub struct NoRemoveHook;

impl AttributeHook for NoRemoveHook {
    fn key(&self) -> &'static str {
        "no_remove"
    }

    fn validate(&self, attr: &Attribute) -> std::result::Result<(), String> {
        if attr.args.is_empty() {
            Ok(())
        } else {
            Err("`no_remove` takes no arguments".to_string())
        }
    }

    fn prepare(&self, _attr: &Attribute, vertex: &mut Vertex) {
        vertex.pinned = true;
    }

    fn retain(&self) -> bool {
        true
    }
}

/// `#[nullable]`: object-reference inputs of the vertex accept `null`
pub struct NullableHook;

impl AttributeHook for NullableHook {
    fn key(&self) -> &'static str {
        "nullable"
    }

    fn validate(&self, attr: &Attribute) -> std::result::Result<(), String> {
        if attr.args.is_empty() {
            Ok(())
        } else {
            Err("`nullable` takes no arguments".to_string())
        }
    }

    fn prepare(&self, _attr: &Attribute, vertex: &mut Vertex) {
        vertex.nullable = true;
    }
}

pub struct AttributeRegistry {
    hooks: FxHashMap<&'static str, Box<dyn AttributeHook>>,
}

impl AttributeRegistry {
    /// Registry without any hooks
    pub fn empty() -> Self {
        Self {
            hooks: FxHashMap::default(),
        }
    }

    /// Registry with the built-in `no_remove` and `nullable` hooks
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(NoRemoveHook));
        registry.register(Box::new(NullableHook));
        registry
    }

    pub fn register(&mut self, hook: Box<dyn AttributeHook>) {
        self.hooks.insert(hook.key(), hook);
    }

    pub fn is_registered(&self, key: &str) -> bool {
        self.hooks.contains_key(key)
    }

    pub fn validate(&self, attr: &Attribute) -> Result<()> {
        match self.hooks.get(attr.key.as_str()) {
            Some(hook) => hook
                .validate(attr)
                .map_err(|message| CompileError::syntax(attr.span, message)),
            None => Ok(()),
        }
    }

    /// Run every `prepare` hook over the graph
    pub fn prepare(&self, graph: &mut Graph) {
        for id in graph.vertex_ids() {
            let Some(vertex) = graph.vertex_mut(id) else {
                continue;
            };
            let attributes = vertex.attributes.clone();
            for attr in &attributes {
                if let Some(hook) = self.hooks.get(attr.key.as_str()) {
                    hook.prepare(attr, vertex);
                }
            }
        }
    }

    pub fn retains(&self, vertex: &Vertex) -> bool {
        vertex.pinned
            || vertex
                .attributes
                .iter()
                .any(|a| self.hooks.get(a.key.as_str()).is_some_and(|h| h.retain()))
    }
}

impl Default for AttributeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
