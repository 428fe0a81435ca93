//! Conceptual→physical conversion
//!
//! Each concept becomes one view; data properties are backed by a
//! synthesized container named after the owning concept; object properties
//! become direct relations or edges depending on cardinality. Output is
//! deterministic: concepts and properties are processed in model order and
//! synthesized sets are sorted before emission.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::entities::{ContainerEntity, ValueType};
use crate::models::physical::{
    Connection, PhysicalContainer, PhysicalDataModel, PhysicalProperty, PhysicalValueType,
    PhysicalView,
};
use crate::models::{ConceptualDataModel, PhysicalMetadata};
use crate::validation::{Issue, IssueCode};

use super::{ConversionError, ConversionOptions, ConversionOutcome, MultiValueMode, UnknownMode};

/// Convert a conceptual data model into a physical one.
///
/// The input is cloned and stamped with neatIds first, so the returned
/// model can be paired back to the caller's model via
/// [`ConceptualDataModel::sync_with_physical_data_model`] after the caller
/// stamps its own copy.
pub fn to_physical(
    model: &ConceptualDataModel,
    options: &ConversionOptions,
) -> Result<ConversionOutcome<PhysicalDataModel>, ConversionError> {
    let mut source = model.clone();
    source.set_neat_ids();

    let prefix = source.metadata.prefix.clone();
    let version = source.metadata.version.clone();
    let mut physical = PhysicalDataModel::new(metadata_of(&source));
    let mut warnings = Vec::new();

    let defined = source.defined_concepts();
    let defined: BTreeSet<_> = defined.into_iter().cloned().collect();

    for concept in &source.concepts {
        let mut view = PhysicalView::new(concept.concept.to_view());
        view.name = concept.name.clone();
        view.description = concept.description.clone();
        view.neat_id = concept.neat_id;
        for parent in &concept.implements {
            view.implements.push(parent.to_view());
        }
        physical.views.push(view);
    }

    // Containers are synthesized on demand, one per concept that stores at
    // least one data value.
    let mut containers: BTreeMap<ContainerEntity, PhysicalContainer> = BTreeMap::new();

    for property in source.properties.iter().filter(|p| !p.inherited) {
        if !defined.contains(&property.concept) {
            return Err(ConversionError::UndefinedConcept {
                concept: property.concept.to_string(),
                property: property.property.clone(),
            });
        }

        let view = property.concept.to_view();
        let mut out = match &property.value_type {
            ValueType::Data(data_type) => {
                let container = property.concept.to_container();
                containers
                    .entry(container.clone())
                    .or_insert_with(|| PhysicalContainer::new(container.clone()));
                let mut out = PhysicalProperty::new(
                    view,
                    &property.property,
                    PhysicalValueType::Data(*data_type),
                );
                out.container = Some(container);
                out.container_property = Some(property.property.clone());
                out
            }
            ValueType::Concept(target) => {
                let direct = property
                    .max_count
                    .is_some_and(|max| max <= options.direct_relation_limit);
                let mut out = PhysicalProperty::new(
                    view,
                    &property.property,
                    PhysicalValueType::View(target.to_view()),
                );
                if direct {
                    // Direct relations are stored values; edges are not.
                    let container = property.concept.to_container();
                    containers
                        .entry(container.clone())
                        .or_insert_with(|| PhysicalContainer::new(container.clone()));
                    out.connection = Some(Connection::Direct);
                    out.container = Some(container);
                    out.container_property = Some(property.property.clone());
                } else {
                    out.connection = Some(Connection::Edge {
                        edge_type: None,
                        direction: None,
                    });
                }
                out
            }
            ValueType::Multi(info) => match options.multi_value {
                MultiValueMode::Reject => {
                    return Err(ConversionError::MultiValueType {
                        concept: property.concept.to_string(),
                        property: property.property.clone(),
                        value_type: info.dump(Some(prefix.as_str()), Some(version.as_str())),
                    });
                }
                MultiValueMode::DropWithWarning => {
                    warn!(
                        concept = %property.concept,
                        property = %property.property,
                        "dropping multi-value property during physical conversion"
                    );
                    let dumped = info.dump(Some(prefix.as_str()), Some(version.as_str()));
                    warnings.push(
                        Issue::warning(
                            IssueCode::MultiValueTypeDropped,
                            format!(
                                "property '{}' of concept '{}' was dropped: multi-value type '{dumped}'",
                                property.property, property.concept,
                            ),
                        )
                        .with_values([dumped]),
                    );
                    continue;
                }
            },
            ValueType::Unknown => match options.unknown {
                UnknownMode::Placeholder => {
                    warn!(
                        concept = %property.concept,
                        property = %property.property,
                        "converting property with unknown value type to placeholder"
                    );
                    warnings.push(Issue::warning(
                        IssueCode::UnknownValueType,
                        format!(
                            "property '{}' of concept '{}' has an unknown value type; \
                             converted with a placeholder",
                            property.property, property.concept,
                        ),
                    ));
                    PhysicalProperty::new(view, &property.property, PhysicalValueType::Unknown)
                }
                UnknownMode::Drop => {
                    warn!(
                        concept = %property.concept,
                        property = %property.property,
                        "dropping property with unknown value type"
                    );
                    warnings.push(Issue::warning(
                        IssueCode::UnknownValueType,
                        format!(
                            "property '{}' of concept '{}' was dropped: unknown value type",
                            property.property, property.concept,
                        ),
                    ));
                    continue;
                }
            },
        };
        out.name = property.name.clone();
        out.description = property.description.clone();
        out.min_count = property.min_count;
        out.max_count = property.max_count;
        out.default = property.default.clone();
        out.neat_id = property.neat_id;
        physical.properties.push(out);
    }

    physical.containers = containers.into_values().collect();
    synthesize_requires_constraints(&mut physical);
    physical.track_imports();
    physical.set_neat_ids();

    debug!(
        model = %physical.metadata.model_id(),
        views = physical.views.len(),
        containers = physical.containers.len(),
        properties = physical.properties.len(),
        warnings = warnings.len(),
        "converted conceptual data model to physical"
    );

    Ok(ConversionOutcome {
        model: physical,
        warnings,
    })
}

fn metadata_of(source: &ConceptualDataModel) -> PhysicalMetadata {
    let mut metadata = PhysicalMetadata::new(
        &source.metadata.prefix,
        &source.metadata.external_id,
        &source.metadata.version,
    );
    metadata.creator = source.metadata.creator.clone();
    metadata.name = source.metadata.name.clone();
    metadata.description = source.metadata.description.clone();
    metadata.created = source.metadata.created;
    metadata.updated = source.metadata.updated;
    metadata
}

/// A container backing a child view must require the containers backing its
/// parent views, so that instances readable through the child always carry
/// the parent data. Same-container inheritance needs no constraint.
fn synthesize_requires_constraints(physical: &mut PhysicalDataModel) {
    let mut required: BTreeMap<ContainerEntity, BTreeSet<ContainerEntity>> = BTreeMap::new();
    for view in &physical.views {
        let own: BTreeSet<ContainerEntity> = physical
            .containers_of(&view.view)
            .into_iter()
            .cloned()
            .collect();
        let mut parents: BTreeSet<ContainerEntity> = BTreeSet::new();
        for ancestor in physical.ancestors(&view.view) {
            parents.extend(physical.containers_of(ancestor).into_iter().cloned());
        }
        for container in &own {
            for parent in &parents {
                if parent != container {
                    required
                        .entry(container.clone())
                        .or_default()
                        .insert(parent.clone());
                }
            }
        }
    }
    for container in &mut physical.containers {
        if let Some(parents) = required.get(&container.container) {
            for parent in parents {
                let tag = format!("requires:{}", parent.dump(None, None));
                if !container.constraint.contains(&tag) {
                    container.constraint.push(tag);
                }
            }
            container.constraint.sort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::DataType;
    use crate::models::unverified::UnverifiedConceptualModel;

    fn load(yaml: &str) -> ConceptualDataModel {
        ConceptualDataModel::load(UnverifiedConceptualModel::from_yaml(yaml).unwrap()).unwrap()
    }

    #[test]
    fn test_single_data_property_synthesizes_one_container() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: GeneratingUnit
Properties:
  - {Concept: GeneratingUnit, Property: ratedPower, Value Type: float64, Max Count: 1}
"#,
        );
        let outcome = to_physical(&model, &ConversionOptions::default()).unwrap();
        let physical = outcome.model;
        assert_eq!(physical.views.len(), 1);
        assert_eq!(physical.containers.len(), 1);
        assert_eq!(physical.containers[0].container.suffix(), "GeneratingUnit");
        let property = &physical.properties[0];
        assert_eq!(
            property.value_type,
            PhysicalValueType::Data(DataType::Float64)
        );
        assert_eq!(property.container_property.as_deref(), Some("ratedPower"));
        assert!(property.nullable());
    }

    #[test]
    fn test_object_property_cardinality_picks_connection() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: GeneratingUnit
  - Concept: Substation
Properties:
  - {Concept: GeneratingUnit, Property: substation, Value Type: Substation, Max Count: 1}
  - {Concept: Substation, Property: units, Value Type: GeneratingUnit}
"#,
        );
        let outcome = to_physical(&model, &ConversionOptions::default()).unwrap();
        let physical = outcome.model;
        let direct = physical
            .properties
            .iter()
            .find(|p| p.property == "substation")
            .unwrap();
        assert_eq!(direct.connection, Some(Connection::Direct));
        assert!(direct.container.is_some());
        let edge = physical
            .properties
            .iter()
            .find(|p| p.property == "units")
            .unwrap();
        assert!(matches!(edge.connection, Some(Connection::Edge { .. })));
        assert!(edge.container.is_none());
    }

    #[test]
    fn test_multi_value_rejected_by_default() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: GeneratingUnit
Properties:
  - {Concept: GeneratingUnit, Property: source, Value Type: "text | float64"}
"#,
        );
        let err = to_physical(&model, &ConversionOptions::default()).unwrap_err();
        assert!(matches!(err, ConversionError::MultiValueType { .. }));
    }

    #[test]
    fn test_multi_value_dropped_with_warning_when_opted_in() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: GeneratingUnit
Properties:
  - {Concept: GeneratingUnit, Property: source, Value Type: "text | float64"}
  - {Concept: GeneratingUnit, Property: name, Value Type: text, Max Count: 1}
"#,
        );
        let options = ConversionOptions {
            multi_value: MultiValueMode::DropWithWarning,
            ..ConversionOptions::default()
        };
        let outcome = to_physical(&model, &options).unwrap();
        assert_eq!(outcome.model.properties.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].code, IssueCode::MultiValueTypeDropped);
    }

    #[test]
    fn test_unknown_converts_to_placeholder_by_default() {
        let model = load(
            r##"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: GeneratingUnit
Properties:
  - {Concept: GeneratingUnit, Property: mystery, Value Type: "#N/A"}
"##,
        );
        let outcome = to_physical(&model, &ConversionOptions::default()).unwrap();
        assert_eq!(
            outcome.model.properties[0].value_type,
            PhysicalValueType::Unknown
        );
        assert_eq!(outcome.warnings.len(), 1);
    }

    #[test]
    fn test_requires_constraint_between_child_and_parent_containers() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: Asset
  - Concept: GeneratingUnit
    Implements: Asset
Properties:
  - {Concept: Asset, Property: name, Value Type: text, Max Count: 1}
  - {Concept: GeneratingUnit, Property: ratedPower, Value Type: float64, Max Count: 1}
"#,
        );
        let outcome = to_physical(&model, &ConversionOptions::default()).unwrap();
        let child = outcome
            .model
            .containers
            .iter()
            .find(|c| c.container.suffix() == "GeneratingUnit")
            .unwrap();
        assert_eq!(child.constraint, vec!["requires:power:Asset".to_string()]);
        let parent = outcome
            .model
            .containers
            .iter()
            .find(|c| c.container.suffix() == "Asset")
            .unwrap();
        assert!(parent.constraint.is_empty());
    }

    #[test]
    fn test_implements_carries_to_views() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: Asset
  - Concept: GeneratingUnit
    Implements: Asset
Properties:
  - {Concept: Asset, Property: name, Value Type: text}
"#,
        );
        let outcome = to_physical(&model, &ConversionOptions::default()).unwrap();
        let unit = outcome
            .model
            .views
            .iter()
            .find(|v| v.view.suffix() == "GeneratingUnit")
            .unwrap();
        assert_eq!(unit.implements.len(), 1);
        assert_eq!(unit.implements[0].suffix(), "Asset");
        assert_eq!(unit.implements[0].version(), Some("v1"));
    }

    #[test]
    fn test_input_model_is_not_mutated() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: GeneratingUnit
Properties:
  - {Concept: GeneratingUnit, Property: ratedPower, Value Type: float64}
"#,
        );
        let before = model.clone();
        let _ = to_physical(&model, &ConversionOptions::default()).unwrap();
        assert_eq!(model, before);
    }
}
