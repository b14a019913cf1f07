//! Execution phases
//!
//! A phase is an ordering-only pseudo-provider: it contributes no rules but
//! participates in the same ordering graph as regular providers, so the one
//! sorter handles both. Phases chain to each other via `executes_after`
//! constraints and must always be totally orderable on their own; the loader
//! logs the phase-only order before attempting the full provider sort.

use crate::context::LoadContext;
use crate::provider::{ProviderError, ProviderMetadata, RuleProvider};
use crate::rule::Rule;

/// Standard phase: locate and model the target's structure
pub const DISCOVERY: &str = "discovery";

/// Standard phase: classify and tag discovered artifacts
pub const CLASSIFICATION: &str = "classification";

/// Standard phase: run the main analysis rules
pub const ANALYSIS: &str = "analysis";

/// Standard phase: produce reports from analysis results
pub const REPORTING: &str = "reporting";

/// An ordering-only pseudo-provider representing an execution stage
pub struct Phase {
    metadata: ProviderMetadata,
}

impl Phase {
    /// Create a phase; its own phase field refers to itself
    pub fn new(id: &str) -> Self {
        let mut metadata = ProviderMetadata::new(id)
            .with_origin("built-in phase")
            .with_phase(id);
        metadata.is_phase = true;
        Self { metadata }
    }

    /// Chain this phase after another
    pub fn after(self, previous: &str) -> Self {
        Self {
            metadata: self.metadata.after_phase(previous),
        }
    }

    /// The phase id
    pub fn id(&self) -> &str {
        self.metadata.id.as_str()
    }
}

impl RuleProvider for Phase {
    fn metadata(&self) -> &ProviderMetadata {
        &self.metadata
    }

    fn rules(&self, _ctx: Option<&LoadContext>) -> Result<Vec<Rule>, ProviderError> {
        Ok(Vec::new())
    }
}

/// The standard phase chain: discovery -> classification -> analysis -> reporting
pub fn standard_phases() -> Vec<Phase> {
    vec![
        Phase::new(DISCOVERY),
        Phase::new(CLASSIFICATION).after(DISCOVERY),
        Phase::new(ANALYSIS).after(CLASSIFICATION),
        Phase::new(REPORTING).after(ANALYSIS),
    ]
}
