//! Rule parameters and bindings
//!
//! Conditions and actions may be parameterized: they name parameters they
//! need resolved at evaluation time. Each rule carries a [`ParameterStore`]
//! mapping parameter names to definitions. A parameter without an explicit
//! binding is auto-bound during finalization to the same-named property of
//! the shared [`EvaluationContext`](crate::context::EvaluationContext).

use crate::context::EvaluationContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// How a parameter obtains its value at evaluation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Binding {
    /// Reads and writes the same-named property on the evaluation context
    ContextProperty { property: String },

    /// Fixed value supplied at configuration time
    Literal { value: Value },
}

impl Binding {
    /// Default binding for an otherwise unbound parameter
    pub fn context_property(property: impl Into<String>) -> Self {
        Binding::ContextProperty {
            property: property.into(),
        }
    }

    /// Resolve the bound value
    pub fn resolve(&self, ctx: &EvaluationContext) -> Option<Value> {
        match self {
            Binding::ContextProperty { property } => ctx.property(property).cloned(),
            Binding::Literal { value } => Some(value.clone()),
        }
    }

    /// Write a value through the binding
    ///
    /// Returns false for bindings that have no writable backing (literals).
    pub fn store(&self, ctx: &mut EvaluationContext, value: Value) -> bool {
        match self {
            Binding::ContextProperty { property } => {
                ctx.set_property(property.clone(), value);
                true
            }
            Binding::Literal { .. } => false,
        }
    }
}

/// A single parameter definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name, unique within its store
    pub name: String,

    /// Optional human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// How the parameter resolves; None until bound
    #[serde(default)]
    pub binding: Option<Binding>,
}

impl Parameter {
    /// Create an unbound parameter
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            binding: None,
        }
    }

    /// Set the binding
    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Whether the parameter has a binding
    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }
}

/// Name-keyed parameter map with deterministic iteration order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParameterStore {
    parameters: BTreeMap<String, Parameter>,
}

impl ParameterStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a parameter by name
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.parameters.get(name)
    }

    /// Get a parameter, inserting an unbound definition if absent
    pub fn get_or_insert(&mut self, name: &str) -> &mut Parameter {
        self.parameters
            .entry(name.to_string())
            .or_insert_with(|| Parameter::new(name))
    }

    /// Insert or replace a parameter
    pub fn insert(&mut self, parameter: Parameter) {
        self.parameters.insert(parameter.name.clone(), parameter);
    }

    /// Resolve a parameter's value through its binding
    pub fn resolve(&self, name: &str, ctx: &EvaluationContext) -> Option<Value> {
        self.parameters
            .get(name)
            .and_then(|p| p.binding.as_ref())
            .and_then(|b| b.resolve(ctx))
    }

    /// Write a value through a parameter's binding
    pub fn store(&self, name: &str, ctx: &mut EvaluationContext, value: Value) -> bool {
        match self.parameters.get(name).and_then(|p| p.binding.as_ref()) {
            Some(binding) => binding.store(ctx, value),
            None => false,
        }
    }

    /// Iterate parameters in name order
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.values()
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}
