//! Rule actions
//!
//! Actions run when a rule's conditions hold. Like conditions, they may be
//! parameterized; finalization binds any parameter an action names that the
//! rule does not bind explicitly.

use crate::context::EvaluationContext;
use crate::param::ParameterStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An action applied to the shared context
pub trait Action: Send + Sync {
    /// Apply the action
    fn apply(&self, store: &ParameterStore, ctx: &mut EvaluationContext);

    /// Parameter names this action needs bound before evaluation
    ///
    /// Composite actions must aggregate the names of every nested action.
    fn required_parameters(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Data-driven action forms for manifest-defined rules
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataAction {
    /// Set a context property
    SetProperty { property: String, value: Value },

    /// Record a classification tag
    AddTag { tag: String },

    /// Write a value through the named parameter's binding
    StoreParameter { parameter: String, value: Value },

    /// Apply every nested action in order
    All { actions: Vec<DataAction> },
}

impl Action for DataAction {
    fn apply(&self, store: &ParameterStore, ctx: &mut EvaluationContext) {
        match self {
            DataAction::SetProperty { property, value } => {
                ctx.set_property(property.clone(), value.clone());
            }
            DataAction::AddTag { tag } => {
                ctx.add_tag(tag.clone());
            }
            DataAction::StoreParameter { parameter, value } => {
                store.store(parameter, ctx, value.clone());
            }
            DataAction::All { actions } => {
                for action in actions {
                    action.apply(store, ctx);
                }
            }
        }
    }

    fn required_parameters(&self) -> Vec<String> {
        match self {
            DataAction::StoreParameter { parameter, .. } => vec![parameter.clone()],
            DataAction::All { actions } => actions
                .iter()
                .flat_map(|a| a.required_parameters())
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::{Binding, Parameter};

    #[test]
    fn test_set_property() {
        let store = ParameterStore::new();
        let mut ctx = EvaluationContext::new();

        DataAction::SetProperty {
            property: "projectType".to_string(),
            value: Value::String("maven".to_string()),
        }
        .apply(&store, &mut ctx);

        assert_eq!(
            ctx.property("projectType"),
            Some(&Value::String("maven".to_string()))
        );
    }

    #[test]
    fn test_add_tag() {
        let store = ParameterStore::new();
        let mut ctx = EvaluationContext::new();

        DataAction::AddTag {
            tag: "maven-pom".to_string(),
        }
        .apply(&store, &mut ctx);

        assert!(ctx.has_tag("maven-pom"));
    }

    #[test]
    fn test_store_parameter_writes_through_binding() {
        let mut store = ParameterStore::new();
        store.insert(
            Parameter::new("className").with_binding(Binding::context_property("className")),
        );

        let mut ctx = EvaluationContext::new();
        DataAction::StoreParameter {
            parameter: "className".to_string(),
            value: Value::String("com.example.Foo".to_string()),
        }
        .apply(&store, &mut ctx);

        assert_eq!(
            ctx.property("className"),
            Some(&Value::String("com.example.Foo".to_string()))
        );
    }

    #[test]
    fn test_required_parameters_reach_nested_actions() {
        let action = DataAction::All {
            actions: vec![
                DataAction::AddTag {
                    tag: "x".to_string(),
                },
                DataAction::All {
                    actions: vec![DataAction::StoreParameter {
                        parameter: "className".to_string(),
                        value: Value::Null,
                    }],
                },
            ],
        };
        assert_eq!(action.required_parameters(), vec!["className"]);
    }
}
