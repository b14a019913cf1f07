//! Rulekit - Rule Provider Loading & Ordering Engine
//!
//! A loading pipeline for rule-based analysis systems: providers contribute
//! ordered rule lists, the loader validates identities, sorts providers by
//! phase and explicit constraints, applies override substitutions, and
//! produces an immutable registry with a flat executable rule sequence.
//!
//! # Architecture
//!
//! ```text
//! RuleLoader -> ProviderSource -> RuleProvider -> Rule
//!      |                                           |
//!      +-> sort -> harvest -> filter -> finalize --+-> RuleProviderRegistry
//! ```
//!
//! The loader collects providers from every registered source, rejects
//! duplicate identities, topologically sorts providers (phases are
//! ordering-only pseudo-providers in the same graph), harvests replacement
//! rules from override providers, and finalizes each included rule with
//! provenance, a deterministic id, and auto-bound parameters.
//!
//! # Defining Providers in Manifests
//!
//! Providers can be declared in YAML/JSON manifest files:
//!
//! ```yaml
//! provider:
//!   id: java-ee-descriptors
//!   phase: discovery
//!   after: [core-descriptors]
//!
//! rules:
//!   - id: find-web-xml
//!     when:
//!       - property-matches:
//!           property: fileName
//!           pattern: '^web\.xml$'
//!     then:
//!       - add-tag:
//!           tag: java-ee
//! ```

pub mod action;
pub mod condition;
pub mod context;
pub mod loader;
pub mod manifest;
pub mod param;
pub mod phase;
pub mod provider;
pub mod registry;
pub mod rule;
pub mod sorter;

// Re-export main types
pub use action::{Action, DataAction};
pub use condition::{Condition, DataCondition};
pub use context::{EvaluationContext, LoadContext, ProviderFilter};
pub use loader::{LoadError, RuleLoader};
pub use manifest::{
    ManifestError, ManifestProvider, ManifestProviderSource, ProviderManifest, ProviderSection,
    RuleDefinition,
};
pub use param::{Binding, Parameter, ParameterStore};
pub use phase::{standard_phases, Phase};
pub use provider::{
    OrderingRef, ProviderError, ProviderId, ProviderMetadata, ProviderSource, RuleProvider,
};
pub use registry::{Configuration, RuleProviderRegistry};
pub use rule::{Rule, RuleKey};
pub use sorter::SortError;
