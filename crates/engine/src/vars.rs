// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Variable Resolver (§4.E): namespace-scoped key/value lookup with
//! `{{name}}` template interpolation.

use std::collections::HashMap;

use async_trait::async_trait;
use linkflow_core::NamespaceId;
use parking_lot::Mutex;

/// Backing store for variable values, kept separate from the resolver so the
/// resolver's caching logic doesn't depend on how values are actually
/// persisted (§4.E only specifies the cache/lookup contract, not storage).
#[async_trait]
pub trait VariableSource: Send + Sync {
    async fn get(&self, namespace: &NamespaceId, name: &str) -> Option<String>;

    async fn get_all(&self, namespace: &NamespaceId) -> HashMap<String, String>;
}

/// In-memory [`VariableSource`], suitable for tests and local DAG execution.
#[derive(Default)]
pub struct InMemoryVariableStore {
    namespaces: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl InMemoryVariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, namespace: &NamespaceId, name: impl Into<String>, value: impl Into<String>) {
        self.namespaces.lock().entry(namespace.to_string()).or_default().insert(name.into(), value.into());
    }

    pub fn unset(&self, namespace: &NamespaceId, name: &str) {
        if let Some(vars) = self.namespaces.lock().get_mut(namespace.as_str()) {
            vars.remove(name);
        }
    }
}

#[async_trait]
impl VariableSource for InMemoryVariableStore {
    async fn get(&self, namespace: &NamespaceId, name: &str) -> Option<String> {
        self.namespaces.lock().get(namespace.as_str()).and_then(|vars| vars.get(name).cloned())
    }

    async fn get_all(&self, namespace: &NamespaceId) -> HashMap<String, String> {
        self.namespaces.lock().get(namespace.as_str()).cloned().unwrap_or_default()
    }
}

/// Caches lookups against a [`VariableSource`]: a single-entry cache for
/// [`VariableResolver::resolve`] and a whole-namespace cache for
/// [`VariableResolver::resolve_all`]/[`VariableResolver::interpolate`] (§4.E).
pub struct VariableResolver<V> {
    source: V,
    entries: Mutex<HashMap<(String, String), String>>,
    namespaces: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl<V: VariableSource> VariableResolver<V> {
    pub fn new(source: V) -> Self {
        Self { source, entries: Mutex::new(HashMap::new()), namespaces: Mutex::new(HashMap::new()) }
    }

    pub async fn resolve(&self, namespace: &NamespaceId, name: &str) -> Option<String> {
        let cache_key = (namespace.to_string(), name.to_string());
        if let Some(cached) = self.entries.lock().get(&cache_key).cloned() {
            return Some(cached);
        }

        let value = self.source.get(namespace, name).await?;
        self.entries.lock().insert(cache_key, value.clone());
        Some(value)
    }

    /// Returns a defensive copy of the whole namespace (§4.E).
    pub async fn resolve_all(&self, namespace: &NamespaceId) -> HashMap<String, String> {
        if let Some(cached) = self.namespaces.lock().get(namespace.as_str()).cloned() {
            return cached;
        }

        let all = self.source.get_all(namespace).await;
        self.namespaces.lock().insert(namespace.to_string(), all.clone());
        all
    }

    /// Replaces literal `{{name}}` occurrences via [`Self::resolve_all`].
    /// Unreferenced placeholders (no matching variable) are left intact; no
    /// nesting or expression evaluation is performed (§4.E).
    pub async fn interpolate(&self, namespace: &NamespaceId, template: &str) -> String {
        let vars = self.resolve_all(namespace).await;
        interpolate_with(template, &vars)
    }

    /// Called by the control plane on writes (§4.E).
    pub fn invalidate_cache(&self, namespace: &NamespaceId) {
        self.entries.lock().retain(|(ns, _), _| ns != namespace.as_str());
        self.namespaces.lock().remove(namespace.as_str());
    }
}

fn interpolate_with(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        let Some(end) = rest[start..].find("}}") else {
            out.push_str(rest);
            return out;
        };
        let end = start + end;

        out.push_str(&rest[..start]);
        let name = rest[start + 2..end].trim();
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[start..end + 2]),
        }
        rest = &rest[end + 2..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
#[path = "vars_tests.rs"]
mod tests;
