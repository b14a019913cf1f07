//! Rule loading
//!
//! [`RuleLoader`] drives a single load: collect providers from every
//! registered source, validate identities, sort, harvest override rules,
//! filter, substitute, finalize, and assemble the immutable
//! [`RuleProviderRegistry`]. A load either completes or fails as a whole;
//! a partial registry is never observable.

use crate::context::LoadContext;
use crate::param::Binding;
use crate::phase::{standard_phases, Phase};
use crate::provider::{ProviderError, ProviderId, ProviderSource, RuleProvider};
use crate::registry::{Configuration, RuleProviderRegistry};
use crate::rule::{Rule, RuleKey};
use crate::sorter::{self, SortError};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Fatal load failure; no registry is produced
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("found two providers with the same id '{id}' ({first_origin} and {second_origin})")]
    DuplicateProvider {
        id: ProviderId,
        first_origin: String,
        second_origin: String,
    },

    #[error(transparent)]
    Sort(#[from] SortError),

    #[error("provider '{id}' failed to build its rules: {source}")]
    Provider {
        id: ProviderId,
        #[source]
        source: ProviderError,
    },

    #[error("provider source failed: {0}")]
    Source(#[source] ProviderError),
}

/// Assembles providers from registered sources into a rule registry
///
/// A loader holds no per-load state: every [`load`](Self::load) call is an
/// independent run over freshly collected providers.
pub struct RuleLoader {
    sources: Vec<Box<dyn ProviderSource>>,
    phases: Vec<Arc<dyn RuleProvider>>,
}

impl Default for RuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleLoader {
    /// Create a loader with the standard phase chain
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
            phases: standard_phases()
                .into_iter()
                .map(|p| Arc::new(p) as Arc<dyn RuleProvider>)
                .collect(),
        }
    }

    /// Create a loader with a custom phase chain
    pub fn with_phases(phases: Vec<Phase>) -> Self {
        Self {
            sources: Vec::new(),
            phases: phases
                .into_iter()
                .map(|p| Arc::new(p) as Arc<dyn RuleProvider>)
                .collect(),
        }
    }

    /// Register a provider source
    pub fn add_source(&mut self, source: impl ProviderSource + 'static) {
        self.sources.push(Box::new(source));
    }

    /// Builder form of [`add_source`](Self::add_source)
    pub fn with_source(mut self, source: impl ProviderSource + 'static) -> Self {
        self.add_source(source);
        self
    }

    /// Run a full load and return the immutable registry
    pub fn load(&self, ctx: &LoadContext) -> Result<RuleProviderRegistry, LoadError> {
        let providers = self.collect(ctx)?;
        check_duplicates(&providers)?;
        log_phase_order(&providers)?;

        let sorted = sorter::sort(providers)?;
        for provider in &sorted {
            debug!("loaded provider: {}", provider.metadata().id);
        }

        let overrides = harvest_overrides(&sorted, ctx)?;
        self.build(sorted, overrides, ctx)
    }

    /// Concatenate every source's providers, then the phase pseudo-providers
    fn collect(&self, ctx: &LoadContext) -> Result<Vec<Arc<dyn RuleProvider>>, LoadError> {
        let mut providers = Vec::new();
        for source in &self.sources {
            providers.extend(source.providers(ctx).map_err(LoadError::Source)?);
        }
        providers.extend(self.phases.iter().cloned());
        Ok(providers)
    }

    fn build(
        &self,
        sorted: Vec<Arc<dyn RuleProvider>>,
        mut overrides: HashMap<RuleKey, Rule>,
        ctx: &LoadContext,
    ) -> Result<RuleProviderRegistry, LoadError> {
        let mut rules_by_provider: HashMap<ProviderId, Vec<Arc<Rule>>> = HashMap::new();
        let mut all_rules: Vec<Arc<Rule>> = Vec::new();

        for provider in &sorted {
            let meta = provider.metadata();

            if let Some(filter) = ctx.filter() {
                let accepted = filter(provider.as_ref());
                info!(
                    "{}: provider '{}' by filter",
                    if accepted { "accepted" } else { "skipped" },
                    meta.id
                );
                if !accepted {
                    continue;
                }
            }

            // override providers only replace others' rules
            if meta.override_provider {
                continue;
            }

            let rules = match provider.rules(Some(ctx)) {
                Ok(rules) => rules,
                Err(source) => {
                    if meta.halt_on_error {
                        return Err(LoadError::Provider {
                            id: meta.id.clone(),
                            source,
                        });
                    }
                    warn!(
                        "provider '{}' failed to build its rules and was skipped: {}",
                        meta.id, source
                    );
                    continue;
                }
            };

            let mut finalized = Vec::with_capacity(rules.len());
            for (index, rule) in rules.into_iter().enumerate() {
                let position = index + 1;
                let rule = finalize_rule(rule, meta.id.clone(), position, &mut overrides);
                let rule = Arc::new(rule);
                all_rules.push(Arc::clone(&rule));
                finalized.push(rule);
            }

            rules_by_provider.insert(meta.id.clone(), finalized);
        }

        if !overrides.is_empty() {
            for key in overrides.keys() {
                debug!("override rule '{}' matched no loaded rule; unused", key);
            }
        }

        Ok(RuleProviderRegistry::new(
            sorted,
            rules_by_provider,
            Configuration::new(all_rules),
        ))
    }
}

/// Substitute, attach provenance, assign a deterministic id, and bind
/// required parameters
fn finalize_rule(
    mut rule: Rule,
    provider: ProviderId,
    position: usize,
    overrides: &mut HashMap<RuleKey, Rule>,
) -> Rule {
    // override substitution preserves the original position
    if let Some(id) = rule.id().map(str::to_string) {
        let key = RuleKey::new(provider.clone(), id.as_str());
        if let Some(replacement) = overrides.remove(&key) {
            info!("replacing rule '{}' of provider '{}' with an override", id, provider);
            rule = replacement;
        }
    }

    rule.set_provider(provider.clone());

    if rule.id().is_none() {
        rule.set_generated_id(format!("{}_{}", provider, position));
    }

    // auto-bind: every required parameter anywhere in the rule without an
    // explicit binding reads the same-named evaluation context property
    let required = rule.required_parameters();
    let store = rule.parameters_mut();
    for name in required {
        let parameter = store.get_or_insert(&name);
        if parameter.binding.is_none() {
            parameter.binding = Some(Binding::context_property(&name));
        }
    }

    rule
}

/// Fail on the second occurrence of any active provider identity
///
/// Override providers are exempt: sharing the target provider's identity is
/// exactly how they address its rule slots.
fn check_duplicates(providers: &[Arc<dyn RuleProvider>]) -> Result<(), LoadError> {
    let mut seen: HashMap<&ProviderId, &Arc<dyn RuleProvider>> = HashMap::new();
    for provider in providers {
        let meta = provider.metadata();
        if meta.override_provider {
            continue;
        }
        if let Some(previous) = seen.insert(&meta.id, provider) {
            return Err(LoadError::DuplicateProvider {
                id: meta.id.clone(),
                first_origin: previous.metadata().origin.clone(),
                second_origin: meta.origin.clone(),
            });
        }
    }
    Ok(())
}

/// Log the phase-only ordering before the full sort is attempted
///
/// Phases must be totally orderable on their own; a user-introduced cycle
/// among regular providers must not prevent this diagnostic.
fn log_phase_order(providers: &[Arc<dyn RuleProvider>]) -> Result<(), LoadError> {
    let phases = sorter::sort_phases(providers)?;
    let names: Vec<String> = phases
        .iter()
        .map(|p| p.metadata().id.to_string())
        .collect();
    info!("rule phases: [{}]", names.join(", "));
    Ok(())
}

/// Harvest pass: collect replacement rules from override providers
///
/// Override providers are queried with no context; their rules are keyed by
/// their own identity plus the rule id. Rules without an explicit id cannot
/// address a slot and are dropped with a warning.
fn harvest_overrides(
    sorted: &[Arc<dyn RuleProvider>],
    ctx: &LoadContext,
) -> Result<HashMap<RuleKey, Rule>, LoadError> {
    let mut overrides = HashMap::new();

    for provider in sorted {
        let meta = provider.metadata();
        if !meta.override_provider {
            continue;
        }

        if let Some(filter) = ctx.filter() {
            if !filter(provider.as_ref()) {
                debug!("override provider '{}' rejected by filter", meta.id);
                continue;
            }
        }

        let rules = match provider.rules(None) {
            Ok(rules) => rules,
            Err(source) => {
                if meta.halt_on_error {
                    return Err(LoadError::Provider {
                        id: meta.id.clone(),
                        source,
                    });
                }
                warn!(
                    "override provider '{}' failed to build its rules and was skipped: {}",
                    meta.id, source
                );
                continue;
            }
        };

        for rule in rules {
            match rule.id() {
                Some(id) => {
                    overrides.insert(RuleKey::new(meta.id.clone(), id), rule);
                }
                None => warn!(
                    "override provider '{}' produced a rule without an id; it cannot replace anything",
                    meta.id
                ),
            }
        }
    }

    Ok(overrides)
}
