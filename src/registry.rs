//! Load results
//!
//! The registry is the immutable outcome of a successful load: the sorted
//! provider list, the per-provider rule lists, and the flat executable
//! [`Configuration`]. Rules are shared via `Arc` between the per-provider
//! view and the flat sequence.

use crate::provider::{ProviderId, RuleProvider};
use crate::rule::Rule;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The flat, fully ordered rule sequence produced by a load
#[derive(Debug, Default)]
pub struct Configuration {
    rules: Vec<Arc<Rule>>,
}

impl Configuration {
    pub(crate) fn new(rules: Vec<Arc<Rule>>) -> Self {
        Self { rules }
    }

    /// All rules in execution order
    pub fn rules(&self) -> &[Arc<Rule>] {
        &self.rules
    }

    /// Iterate the rules in execution order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Rule>> {
        self.rules.iter()
    }

    /// Look up a rule by its (possibly generated) id
    pub fn rule(&self, id: &str) -> Option<&Arc<Rule>> {
        self.rules.iter().find(|r| r.id() == Some(id))
    }

    /// Number of rules in the sequence
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the sequence holds no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Immutable result of a load
pub struct RuleProviderRegistry {
    providers: Vec<Arc<dyn RuleProvider>>,
    rules_by_provider: HashMap<ProviderId, Vec<Arc<Rule>>>,
    configuration: Configuration,
}

impl RuleProviderRegistry {
    pub(crate) fn new(
        providers: Vec<Arc<dyn RuleProvider>>,
        rules_by_provider: HashMap<ProviderId, Vec<Arc<Rule>>>,
        configuration: Configuration,
    ) -> Self {
        Self {
            providers,
            rules_by_provider,
            configuration,
        }
    }

    /// Every discovered provider in execution order, including phases and
    /// providers that contributed no rules
    pub fn providers(&self) -> &[Arc<dyn RuleProvider>] {
        &self.providers
    }

    /// Look up a provider by id
    pub fn provider(&self, id: &str) -> Option<&Arc<dyn RuleProvider>> {
        self.providers
            .iter()
            .find(|p| p.metadata().id.as_str() == id)
    }

    /// The finalized rules a provider contributed, in declaration order
    ///
    /// `None` for providers that were filtered out or never included
    /// (override providers among them).
    pub fn rules_for(&self, provider: impl Into<ProviderId>) -> Option<&Vec<Arc<Rule>>> {
        self.rules_by_provider.get(&provider.into())
    }

    /// The flat executable rule sequence
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }
}

impl fmt::Debug for RuleProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleProviderRegistry")
            .field("providers", &self.providers.len())
            .field("contributing_providers", &self.rules_by_provider.len())
            .field("rules", &self.configuration.len())
            .finish()
    }
}
