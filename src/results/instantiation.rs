//! Dynamic instantiation targets (`select new OrderSummary(o.id, o.total)`).
//!
//! Targets declare their constructor signatures and injectable properties up
//! front in an [`InstantiatorRegistry`]. The strategy for a selection is
//! resolved once when the result graph is built; rows only apply it.

use std::collections::{HashMap, HashSet};

use crate::error::{TranslationError, TranslationResult};
use crate::value::{DomainValue, DynamicObject, ValueType};

/// A declared constructor: named, typed parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorSignature {
    pub parameters: Vec<(String, ValueType)>,
}

impl ConstructorSignature {
    fn accepts(&self, arguments: &[ValueType]) -> bool {
        self.parameters.len() == arguments.len()
            && self
                .parameters
                .iter()
                .zip(arguments)
                .all(|((_, slot), arg)| slot.is_assignable_from(arg))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstantiationTarget {
    pub name: String,
    pub constructors: Vec<ConstructorSignature>,
    pub properties: Vec<(String, ValueType)>,
}

impl InstantiationTarget {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constructors: Vec::new(),
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn constructor(mut self, parameters: Vec<(&str, ValueType)>) -> Self {
        self.constructors.push(ConstructorSignature {
            parameters: parameters
                .into_iter()
                .map(|(n, t)| (n.to_string(), t))
                .collect(),
        });
        self
    }

    #[must_use]
    pub fn property(mut self, name: &str, value_type: ValueType) -> Self {
        self.properties.push((name.to_string(), value_type));
        self
    }

    fn property_type(&self, name: &str) -> Option<&ValueType> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, t)| t)
    }
}

#[derive(Debug, Clone, Default)]
pub struct InstantiatorRegistry {
    targets: HashMap<String, InstantiationTarget>,
}

/// What a dynamic instantiation builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstantiationKind {
    Class(String),
    List,
    Map,
}

/// The strategy chosen for a dynamic instantiation.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedInstantiation {
    Constructor {
        target: String,
        parameter_names: Vec<String>,
    },
    /// Default construction then injection of each aliased argument.
    Injection {
        target: String,
        properties: Vec<String>,
    },
    List,
    Map { keys: Vec<String> },
}

impl ResolvedInstantiation {
    pub fn result_type(&self) -> ValueType {
        match self {
            ResolvedInstantiation::Constructor { target, .. }
            | ResolvedInstantiation::Injection { target, .. } => ValueType::Object(target.clone()),
            ResolvedInstantiation::List => ValueType::List,
            ResolvedInstantiation::Map { .. } => ValueType::Map,
        }
    }

    /// Build the value from argument values in declaration order.
    pub fn instantiate(&self, values: Vec<DomainValue>) -> DomainValue {
        match self {
            ResolvedInstantiation::Constructor {
                target,
                parameter_names: names,
            }
            | ResolvedInstantiation::Injection {
                target,
                properties: names,
            } => DomainValue::Object(DynamicObject {
                type_name: target.clone(),
                fields: names.iter().cloned().zip(values).collect(),
            }),
            ResolvedInstantiation::List => DomainValue::List(values),
            ResolvedInstantiation::Map { keys } => {
                DomainValue::Map(keys.iter().cloned().zip(values).collect())
            }
        }
    }
}

impl InstantiatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_target(mut self, target: InstantiationTarget) -> Self {
        self.register(target);
        self
    }

    pub fn register(&mut self, target: InstantiationTarget) {
        self.targets.insert(target.name.clone(), target);
    }

    pub fn find(&self, name: &str) -> Option<&InstantiationTarget> {
        self.targets.get(name)
    }

    /// Choose the instantiation strategy for arguments given as
    /// `(alias, type)` pairs.
    pub fn resolve(
        &self,
        kind: &InstantiationKind,
        arguments: &[(Option<String>, ValueType)],
    ) -> TranslationResult<ResolvedInstantiation> {
        match kind {
            InstantiationKind::List => Ok(ResolvedInstantiation::List),
            InstantiationKind::Map => {
                let keys = unique_aliases("map", arguments)?;
                Ok(ResolvedInstantiation::Map { keys })
            }
            InstantiationKind::Class(name) => {
                let target = self
                    .find(name)
                    .ok_or_else(|| TranslationError::UnknownInstantiationTarget(name.clone()))?;
                let types: Vec<ValueType> = arguments.iter().map(|(_, t)| t.clone()).collect();

                if let Some(constructor) = target.constructors.iter().find(|c| c.accepts(&types)) {
                    return Ok(ResolvedInstantiation::Constructor {
                        target: target.name.clone(),
                        parameter_names: constructor
                            .parameters
                            .iter()
                            .map(|(n, _)| n.clone())
                            .collect(),
                    });
                }

                let no_match = || TranslationError::NoMatchingConstructor {
                    target: target.name.clone(),
                    arguments: types
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                };
                if arguments.iter().any(|(alias, _)| alias.is_none()) {
                    return Err(no_match());
                }
                let properties = unique_aliases(&target.name, arguments)?;
                let injectable = properties.iter().zip(&types).all(|(p, t)| {
                    target
                        .property_type(p)
                        .is_some_and(|slot| slot.is_assignable_from(t))
                });
                if !injectable {
                    return Err(no_match());
                }
                Ok(ResolvedInstantiation::Injection {
                    target: target.name.clone(),
                    properties,
                })
            }
        }
    }
}

fn unique_aliases(target: &str, arguments: &[(Option<String>, ValueType)]) -> TranslationResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut aliases = Vec::with_capacity(arguments.len());
    for (position, (alias, _)) in arguments.iter().enumerate() {
        let alias = alias
            .clone()
            .ok_or_else(|| TranslationError::MissingInstantiationAlias {
                target: target.to_string(),
                position,
            })?;
        if !seen.insert(alias.clone()) {
            return Err(TranslationError::DuplicateInstantiationAlias {
                target: target.to_string(),
                alias,
            });
        }
        aliases.push(alias);
    }
    Ok(aliases)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::JdbcType;

    fn registry() -> InstantiatorRegistry {
        InstantiatorRegistry::new().with_target(
            InstantiationTarget::new("OrderSummary")
                .constructor(vec![
                    ("id", ValueType::Scalar(JdbcType::Integer)),
                    ("total", ValueType::Scalar(JdbcType::Double)),
                ])
                .property("id", ValueType::Scalar(JdbcType::Integer))
                .property("customerName", ValueType::Scalar(JdbcType::Varchar)),
        )
    }

    fn arg(alias: Option<&str>, jdbc_type: JdbcType) -> (Option<String>, ValueType) {
        (alias.map(String::from), ValueType::Scalar(jdbc_type))
    }

    #[test]
    fn test_constructor_with_widening() {
        let resolved = registry()
            .resolve(
                &InstantiationKind::Class("OrderSummary".into()),
                &[arg(None, JdbcType::Integer), arg(None, JdbcType::Integer)],
            )
            .unwrap();
        assert_eq!(
            resolved,
            ResolvedInstantiation::Constructor {
                target: "OrderSummary".into(),
                parameter_names: vec!["id".into(), "total".into()],
            }
        );
    }

    #[test]
    fn test_injection_fallback() {
        let resolved = registry()
            .resolve(
                &InstantiationKind::Class("OrderSummary".into()),
                &[
                    arg(Some("customerName"), JdbcType::Varchar),
                    arg(Some("id"), JdbcType::Integer),
                ],
            )
            .unwrap();
        assert!(matches!(resolved, ResolvedInstantiation::Injection { properties, .. }
            if properties == vec!["customerName".to_string(), "id".to_string()]));
    }

    #[test]
    fn test_no_matching_constructor() {
        let err = registry()
            .resolve(
                &InstantiationKind::Class("OrderSummary".into()),
                &[arg(None, JdbcType::Varchar)],
            )
            .unwrap_err();
        assert_eq!(
            err,
            TranslationError::NoMatchingConstructor {
                target: "OrderSummary".into(),
                arguments: "varchar".into(),
            }
        );
    }

    #[test]
    fn test_unknown_target() {
        assert!(matches!(
            registry().resolve(&InstantiationKind::Class("Missing".into()), &[]),
            Err(TranslationError::UnknownInstantiationTarget(_))
        ));
    }

    #[test]
    fn test_map_requires_unique_aliases() {
        let missing = registry()
            .resolve(
                &InstantiationKind::Map,
                &[arg(Some("a"), JdbcType::Integer), arg(None, JdbcType::Integer)],
            )
            .unwrap_err();
        assert_eq!(
            missing,
            TranslationError::MissingInstantiationAlias {
                target: "map".into(),
                position: 1,
            }
        );

        let duplicate = registry()
            .resolve(
                &InstantiationKind::Map,
                &[arg(Some("a"), JdbcType::Integer), arg(Some("a"), JdbcType::Varchar)],
            )
            .unwrap_err();
        assert!(matches!(duplicate, TranslationError::DuplicateInstantiationAlias { .. }));
    }

    #[test]
    fn test_instantiate_map_and_list() {
        let map = ResolvedInstantiation::Map {
            keys: vec!["id".into()],
        };
        assert_eq!(
            map.instantiate(vec![DomainValue::Null]),
            DomainValue::Map(vec![("id".into(), DomainValue::Null)])
        );
        assert_eq!(
            ResolvedInstantiation::List.instantiate(vec![DomainValue::Null]),
            DomainValue::List(vec![DomainValue::Null])
        );
    }
}
