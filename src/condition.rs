//! Rule conditions
//!
//! A condition decides whether a rule's actions run. Custom engines
//! implement [`Condition`] directly; manifest-defined providers use the
//! [`DataCondition`] forms, which cover the common property and parameter
//! checks and compose with `all`/`any`/`not`.

use crate::context::EvaluationContext;
use crate::param::ParameterStore;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A condition evaluated against the shared context
pub trait Condition: Send + Sync {
    /// Evaluate the condition
    ///
    /// `store` is the owning rule's parameter store; parameterized
    /// conditions resolve their inputs through it.
    fn evaluate(&self, store: &ParameterStore, ctx: &EvaluationContext) -> bool;

    /// Parameter names this condition needs bound before evaluation
    ///
    /// Composite conditions must aggregate the names of every nested
    /// condition so finalization can bind the whole tree.
    fn required_parameters(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Data-driven condition forms for manifest-defined rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataCondition {
    /// Always true
    Always,

    /// Always false
    Never,

    /// True if the named context property is set
    PropertyPresent { property: String },

    /// True if the named context property matches the regex pattern
    PropertyMatches { property: String, pattern: String },

    /// True if the named parameter resolves to the given value
    ParameterEquals { parameter: String, value: Value },

    /// True if every nested condition is true
    All { conditions: Vec<DataCondition> },

    /// True if at least one nested condition is true
    Any { conditions: Vec<DataCondition> },

    /// Negation of the nested condition
    Not { condition: Box<DataCondition> },
}

impl Condition for DataCondition {
    fn evaluate(&self, store: &ParameterStore, ctx: &EvaluationContext) -> bool {
        match self {
            DataCondition::Always => true,
            DataCondition::Never => false,
            DataCondition::PropertyPresent { property } => ctx.property(property).is_some(),
            DataCondition::PropertyMatches { property, pattern } => {
                let text = match ctx.property(property) {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => return false,
                };
                match regex::Regex::new(pattern) {
                    Ok(re) => re.is_match(&text),
                    Err(e) => {
                        warn!("invalid pattern '{}' in condition: {}", pattern, e);
                        false
                    }
                }
            }
            DataCondition::ParameterEquals { parameter, value } => {
                store.resolve(parameter, ctx).as_ref() == Some(value)
            }
            DataCondition::All { conditions } => {
                conditions.iter().all(|c| c.evaluate(store, ctx))
            }
            DataCondition::Any { conditions } => {
                conditions.iter().any(|c| c.evaluate(store, ctx))
            }
            DataCondition::Not { condition } => !condition.evaluate(store, ctx),
        }
    }

    fn required_parameters(&self) -> Vec<String> {
        match self {
            DataCondition::ParameterEquals { parameter, .. } => vec![parameter.clone()],
            DataCondition::All { conditions } | DataCondition::Any { conditions } => conditions
                .iter()
                .flat_map(|c| c.required_parameters())
                .collect(),
            DataCondition::Not { condition } => condition.required_parameters(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{Binding, Parameter};

    fn ctx_with(name: &str, value: &str) -> EvaluationContext {
        let mut ctx = EvaluationContext::new();
        ctx.set_property(name, value);
        ctx
    }

    #[test]
    fn test_always_never() {
        let store = ParameterStore::new();
        let ctx = EvaluationContext::new();
        assert!(DataCondition::Always.evaluate(&store, &ctx));
        assert!(!DataCondition::Never.evaluate(&store, &ctx));
    }

    #[test]
    fn test_property_present() {
        let store = ParameterStore::new();
        let cond = DataCondition::PropertyPresent {
            property: "descriptor".to_string(),
        };

        assert!(!cond.evaluate(&store, &EvaluationContext::new()));
        assert!(cond.evaluate(&store, &ctx_with("descriptor", "pom.xml")));
    }

    #[test]
    fn test_property_matches() {
        let store = ParameterStore::new();
        let cond = DataCondition::PropertyMatches {
            property: "fileName".to_string(),
            pattern: r"^pom\.xml$".to_string(),
        };

        assert!(cond.evaluate(&store, &ctx_with("fileName", "pom.xml")));
        assert!(!cond.evaluate(&store, &ctx_with("fileName", "build.gradle")));
        assert!(!cond.evaluate(&store, &EvaluationContext::new()));
    }

    #[test]
    fn test_property_matches_invalid_pattern() {
        let store = ParameterStore::new();
        let cond = DataCondition::PropertyMatches {
            property: "fileName".to_string(),
            pattern: "(unclosed".to_string(),
        };
        assert!(!cond.evaluate(&store, &ctx_with("fileName", "pom.xml")));
    }

    #[test]
    fn test_parameter_equals_through_binding() {
        let mut store = ParameterStore::new();
        store.insert(
            Parameter::new("className").with_binding(Binding::context_property("className")),
        );

        let cond = DataCondition::ParameterEquals {
            parameter: "className".to_string(),
            value: Value::String("com.example.Foo".to_string()),
        };

        assert!(cond.evaluate(&store, &ctx_with("className", "com.example.Foo")));
        assert!(!cond.evaluate(&store, &ctx_with("className", "com.example.Bar")));
        // unbound store never matches
        assert!(!cond.evaluate(&ParameterStore::new(), &ctx_with("className", "com.example.Foo")));
    }

    #[test]
    fn test_composite_evaluation() {
        let store = ParameterStore::new();
        let ctx = ctx_with("fileName", "pom.xml");

        let cond = DataCondition::All {
            conditions: vec![
                DataCondition::PropertyPresent {
                    property: "fileName".to_string(),
                },
                DataCondition::Not {
                    condition: Box::new(DataCondition::Never),
                },
            ],
        };
        assert!(cond.evaluate(&store, &ctx));

        let cond = DataCondition::Any {
            conditions: vec![DataCondition::Never, DataCondition::Never],
        };
        assert!(!cond.evaluate(&store, &ctx));
    }

    #[test]
    fn test_required_parameters_reach_nested_conditions() {
        let cond = DataCondition::Not {
            condition: Box::new(DataCondition::All {
                conditions: vec![
                    DataCondition::ParameterEquals {
                        parameter: "className".to_string(),
                        value: Value::Null,
                    },
                    DataCondition::Any {
                        conditions: vec![DataCondition::ParameterEquals {
                            parameter: "packageName".to_string(),
                            value: Value::Null,
                        }],
                    },
                ],
            }),
        };

        let mut names = cond.required_parameters();
        names.sort();
        assert_eq!(names, vec!["className", "packageName"]);
    }
}
