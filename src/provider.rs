//! Rule providers and provider sources
//!
//! A provider is a self-contained unit contributing rules to the overall
//! configuration. Providers are supplied by [`ProviderSource`] collaborators
//! and carry [`ProviderMetadata`] describing their identity, phase, ordering
//! constraints, and failure policy.

use crate::context::LoadContext;
use crate::rule::Rule;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Stable provider identity
///
/// Equality and hashing are defined over the identifier string only, never
/// over object identity, so regenerated or wrapped provider instances
/// compare equal as long as they declare the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Create an id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProviderId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Target of an explicit ordering constraint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OrderingRef {
    /// A specific provider
    Provider(ProviderId),

    /// A whole phase (every provider assigned to it)
    Phase(ProviderId),
}

/// Per-provider identity, ordering, and failure policy
#[derive(Debug, Clone)]
pub struct ProviderMetadata {
    /// Stable identity; at most one active provider per id in a load
    pub id: ProviderId,

    /// Human-readable origin descriptor (e.g., a source location)
    pub origin: String,

    /// Phase this provider executes in
    pub phase: ProviderId,

    /// Whether this is an ordering-only phase pseudo-provider
    pub is_phase: bool,

    /// Override providers only donate replacement rules; they are never
    /// included directly
    pub override_provider: bool,

    /// Whether a failure building this provider's rules aborts the load
    pub halt_on_error: bool,

    /// Providers/phases that must run before this provider
    pub executes_after: Vec<OrderingRef>,

    /// Providers/phases that must run after this provider
    pub executes_before: Vec<OrderingRef>,
}

impl ProviderMetadata {
    /// Create metadata with the default phase
    pub fn new(id: impl Into<ProviderId>) -> Self {
        Self {
            id: id.into(),
            origin: "unspecified".to_string(),
            phase: ProviderId::new(crate::phase::ANALYSIS),
            is_phase: false,
            override_provider: false,
            halt_on_error: false,
            executes_after: Vec::new(),
            executes_before: Vec::new(),
        }
    }

    /// Set the origin descriptor
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Set the execution phase
    pub fn with_phase(mut self, phase: impl Into<ProviderId>) -> Self {
        self.phase = phase.into();
        self
    }

    /// Mark this provider as override-only
    pub fn override_provider(mut self) -> Self {
        self.override_provider = true;
        self
    }

    /// Abort the whole load if this provider fails to build its rules
    pub fn halt_on_error(mut self) -> Self {
        self.halt_on_error = true;
        self
    }

    /// Run after the given provider
    pub fn after(mut self, provider: impl Into<ProviderId>) -> Self {
        self.executes_after.push(OrderingRef::Provider(provider.into()));
        self
    }

    /// Run before the given provider
    pub fn before(mut self, provider: impl Into<ProviderId>) -> Self {
        self.executes_before.push(OrderingRef::Provider(provider.into()));
        self
    }

    /// Run after every provider of the given phase
    pub fn after_phase(mut self, phase: impl Into<ProviderId>) -> Self {
        self.executes_after.push(OrderingRef::Phase(phase.into()));
        self
    }

    /// Run before every provider of the given phase
    pub fn before_phase(mut self, phase: impl Into<ProviderId>) -> Self {
        self.executes_before.push(OrderingRef::Phase(phase.into()));
        self
    }
}

/// Error raised while a provider builds its rule configuration
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid rule configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A unit contributing rules to the merged configuration
///
/// Queried exactly once for its rules during a load; override providers are
/// instead queried once with no context during the harvest pass and then
/// skipped for normal inclusion. Instances must not be mutated for the
/// duration of a load.
pub trait RuleProvider: Send + Sync {
    /// Provider metadata
    fn metadata(&self) -> &ProviderMetadata;

    /// Build this provider's ordered rule list
    ///
    /// `ctx` is `None` while override rules are harvested; the provider
    /// must then build its rules from static configuration only.
    fn rules(&self, ctx: Option<&LoadContext>) -> Result<Vec<Rule>, ProviderError>;
}

impl fmt::Debug for dyn RuleProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleProvider")
            .field("id", &self.metadata().id)
            .field("origin", &self.metadata().origin)
            .finish()
    }
}

/// Collaborator supplying provider instances for a load
pub trait ProviderSource: Send + Sync {
    /// Produce this source's providers
    ///
    /// May perform blocking IO. A failure here is fatal to the load.
    fn providers(&self, ctx: &LoadContext) -> Result<Vec<Arc<dyn RuleProvider>>, ProviderError>;
}
