//! Load-time and evaluation-time context objects
//!
//! A [`LoadContext`] carries everything the caller wants the loader and the
//! providers to see during a single load: an optional provider filter and a
//! bag of opaque configuration properties. An [`EvaluationContext`] is the
//! shared state rules read and write when the execution engine runs them;
//! auto-bound parameters resolve against its properties.

use crate::provider::RuleProvider;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};

/// Predicate deciding whether a provider participates in rule extraction
pub type ProviderFilter = dyn Fn(&dyn RuleProvider) -> bool + Send + Sync;

/// Context for a single load run
///
/// One `LoadContext` corresponds to one call of
/// [`RuleLoader::load`](crate::loader::RuleLoader::load). Override providers
/// are harvested without any context; everything else sees this one.
#[derive(Default)]
pub struct LoadContext {
    /// Optional provider accept/reject filter
    filter: Option<Box<ProviderFilter>>,

    /// Environment/configuration values opaque to the engine
    properties: HashMap<String, Value>,
}

impl LoadContext {
    /// Create an empty load context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider filter
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&dyn RuleProvider) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Add a configuration property
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Get the provider filter, if any
    pub fn filter(&self) -> Option<&ProviderFilter> {
        self.filter.as_deref()
    }

    /// Get a configuration property
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }
}

impl std::fmt::Debug for LoadContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadContext")
            .field("filter", &self.filter.is_some())
            .field("properties", &self.properties)
            .finish()
    }
}

/// Shared state rules evaluate against
///
/// Holds the property map that default parameter bindings read and write,
/// plus the tag set built-in classification actions append to.
#[derive(Debug, Clone, Default)]
pub struct EvaluationContext {
    properties: HashMap<String, Value>,
    tags: BTreeSet<String>,
}

impl EvaluationContext {
    /// Create an empty evaluation context
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property value
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Set a property value
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Record a classification tag
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.insert(tag.into());
    }

    /// Check whether a tag has been recorded
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// All recorded tags, in sorted order
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| t.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_context_properties() {
        let mut ctx = EvaluationContext::new();
        assert!(ctx.property("className").is_none());

        ctx.set_property("className", "com.example.Foo");
        assert_eq!(
            ctx.property("className"),
            Some(&Value::String("com.example.Foo".to_string()))
        );
    }

    #[test]
    fn test_evaluation_context_tags() {
        let mut ctx = EvaluationContext::new();
        ctx.add_tag("maven");
        ctx.add_tag("java-ee");
        ctx.add_tag("maven");

        assert!(ctx.has_tag("maven"));
        assert!(!ctx.has_tag("gradle"));
        assert_eq!(ctx.tags().collect::<Vec<_>>(), vec!["java-ee", "maven"]);
    }

    #[test]
    fn test_load_context_properties() {
        let ctx = LoadContext::new()
            .with_property("input", "/srv/app")
            .with_property("online", false);

        assert_eq!(ctx.property("input"), Some(&Value::String("/srv/app".to_string())));
        assert_eq!(ctx.property("online"), Some(&Value::Bool(false)));
        assert!(ctx.property("missing").is_none());
        assert!(ctx.filter().is_none());
    }
}
