//! Rule definition
//!
//! A rule is a condition -> action unit. During a load the finalizer
//! attaches provenance (the owning provider's id), generates missing ids
//! deterministically, and auto-binds unbound required parameters; after
//! that the rule is immutable and shared between the per-provider lists
//! and the flat executable sequence.

use crate::action::Action;
use crate::condition::Condition;
use crate::context::EvaluationContext;
use crate::param::{Parameter, ParameterStore};
use crate::provider::ProviderId;
use std::collections::BTreeSet;
use std::fmt;

/// Compound key addressing a replaceable rule slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleKey {
    /// Identity of the provider owning the slot
    pub provider: ProviderId,

    /// Rule identifier within that provider
    pub rule: String,
}

impl RuleKey {
    /// Create a key
    pub fn new(provider: impl Into<ProviderId>, rule: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            rule: rule.into(),
        }
    }
}

impl fmt::Display for RuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.rule)
    }
}

/// A condition -> action unit
#[derive(Default)]
pub struct Rule {
    id: Option<String>,
    provider: Option<ProviderId>,
    conditions: Vec<Box<dyn Condition>>,
    actions: Vec<Box<dyn Action>>,
    parameters: ParameterStore,
}

impl Rule {
    /// Create an anonymous rule; finalization will generate its id
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rule with an explicit id
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Add a condition
    pub fn when(mut self, condition: impl Condition + 'static) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }

    /// Add an action
    pub fn perform(mut self, action: impl Action + 'static) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    /// Add an explicit parameter definition
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.insert(parameter);
        self
    }

    /// The rule id, if assigned
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// The owning provider, set during finalization
    pub fn provider(&self) -> Option<&ProviderId> {
        self.provider.as_ref()
    }

    /// The rule's parameter store
    pub fn parameters(&self) -> &ParameterStore {
        &self.parameters
    }

    /// Every parameter name required anywhere in the condition and action
    /// trees, deduplicated
    pub fn required_parameters(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for condition in &self.conditions {
            names.extend(condition.required_parameters());
        }
        for action in &self.actions {
            names.extend(action.required_parameters());
        }
        names
    }

    /// Evaluate every condition; vacuously true for a rule with none
    pub fn evaluate(&self, ctx: &EvaluationContext) -> bool {
        self.conditions
            .iter()
            .all(|c| c.evaluate(&self.parameters, ctx))
    }

    /// Apply every action unconditionally
    pub fn apply(&self, ctx: &mut EvaluationContext) {
        for action in &self.actions {
            action.apply(&self.parameters, ctx);
        }
    }

    /// Evaluate, then apply actions if the conditions held
    ///
    /// Returns whether the rule fired.
    pub fn execute(&self, ctx: &mut EvaluationContext) -> bool {
        if self.evaluate(ctx) {
            self.apply(ctx);
            true
        } else {
            false
        }
    }

    pub(crate) fn set_provider(&mut self, provider: ProviderId) {
        self.provider = Some(provider);
    }

    pub(crate) fn set_generated_id(&mut self, id: String) {
        self.id = Some(id);
    }

    pub(crate) fn parameters_mut(&mut self) -> &mut ParameterStore {
        &mut self.parameters
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("conditions", &self.conditions.len())
            .field("actions", &self.actions.len())
            .field("parameters", &self.parameters.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::DataAction;
    use crate::condition::DataCondition;
    use crate::param::Binding;
    use serde_json::Value;

    #[test]
    fn test_rule_key_equality() {
        let a = RuleKey::new("p1", "r1");
        let b = RuleKey::new("p1", "r1");
        let c = RuleKey::new("p2", "r1");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "p1:r1");
    }

    #[test]
    fn test_rule_without_conditions_fires() {
        let rule = Rule::with_id("tag-all").perform(DataAction::AddTag {
            tag: "seen".to_string(),
        });

        let mut ctx = EvaluationContext::new();
        assert!(rule.execute(&mut ctx));
        assert!(ctx.has_tag("seen"));
    }

    #[test]
    fn test_rule_conditions_gate_actions() {
        let rule = Rule::with_id("gated")
            .when(DataCondition::Never)
            .perform(DataAction::AddTag {
                tag: "never".to_string(),
            });

        let mut ctx = EvaluationContext::new();
        assert!(!rule.execute(&mut ctx));
        assert!(!ctx.has_tag("never"));
    }

    #[test]
    fn test_required_parameters_span_conditions_and_actions() {
        let rule = Rule::new()
            .when(DataCondition::ParameterEquals {
                parameter: "className".to_string(),
                value: Value::Null,
            })
            .perform(DataAction::StoreParameter {
                parameter: "result".to_string(),
                value: Value::Null,
            });

        let names: Vec<_> = rule.required_parameters().into_iter().collect();
        assert_eq!(names, vec!["className".to_string(), "result".to_string()]);
    }

    #[test]
    fn test_explicit_parameter_binding_used_in_evaluation() {
        let rule = Rule::with_id("match-class")
            .with_parameter(
                Parameter::new("className").with_binding(Binding::Literal {
                    value: Value::String("com.example.Foo".to_string()),
                }),
            )
            .when(DataCondition::ParameterEquals {
                parameter: "className".to_string(),
                value: Value::String("com.example.Foo".to_string()),
            });

        let ctx = EvaluationContext::new();
        assert!(rule.evaluate(&ctx));
    }
}
