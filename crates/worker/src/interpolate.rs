// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recursively applies `VariableResolver::interpolate` to every string leaf
//! of a node config, since §4.E only specifies template substitution over a
//! single string and node configs are arbitrary JSON.

use linkflow_core::NamespaceId;
use linkflow_engine::VariableSource;
use linkflow_engine::VariableResolver;
use serde_json::Value;

pub async fn interpolate_json<V: VariableSource>(
    resolver: &VariableResolver<V>,
    namespace: &NamespaceId,
    value: &Value,
) -> Value {
    match value {
        Value::String(s) => Value::String(resolver.interpolate(namespace, s).await),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(Box::pin(interpolate_json(resolver, namespace, item)).await);
            }
            Value::Array(out)
        }
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (k, v) in map {
                out.insert(k.clone(), Box::pin(interpolate_json(resolver, namespace, v)).await);
            }
            Value::Object(out)
        }
        other => other.clone(),
    }
}

#[cfg(test)]
#[path = "interpolate_tests.rs"]
mod tests;
