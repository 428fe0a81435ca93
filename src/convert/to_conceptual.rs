//! Physical→conceptual conversion
//!
//! Lossy by design: storage detail (containers, indexes, constraints,
//! immutability) is discarded and only the conceptual shape survives.
//! Reverse connections are mirrored onto the target concept instead of
//! being dropped, so the relationship stays visible on both sides.

use std::collections::BTreeSet;

use tracing::debug;

use crate::entities::{ConceptEntity, DataType, ValueType};
use crate::models::physical::{Connection, PhysicalDataModel, PhysicalProperty, PhysicalValueType};
use crate::models::{Concept, ConceptualDataModel, ConceptualMetadata, ConceptualProperty};

/// Convert a physical data model into a conceptual one.
pub fn to_conceptual(model: &PhysicalDataModel) -> ConceptualDataModel {
    let mut conceptual = ConceptualDataModel {
        metadata: metadata_of(model),
        concepts: Vec::new(),
        properties: Vec::new(),
        prefixes: Default::default(),
    };

    for view in &model.views {
        let mut concept = Concept::new(view.view.to_concept());
        concept.name = view.name.clone();
        concept.description = view.description.clone();
        concept.neat_id = view.neat_id;
        for parent in &view.implements {
            concept.implements.push(parent.to_concept());
        }
        conceptual.concepts.push(concept);
    }

    let mut seen: BTreeSet<(ConceptEntity, String)> = BTreeSet::new();
    let mut reversed: Vec<&PhysicalProperty> = Vec::new();
    for property in &model.properties {
        if matches!(property.connection, Some(Connection::Reverse { .. })) {
            reversed.push(property);
            continue;
        }
        let concept = property.view.to_concept();
        let value_type = conceptual_value_type(&property.value_type);
        let mut out = ConceptualProperty::new(concept.clone(), &property.property, value_type);
        out.name = property.name.clone();
        out.description = property.description.clone();
        out.min_count = property.min_count;
        out.max_count = property.max_count;
        out.default = property.default.clone();
        out.neat_id = property.neat_id;
        seen.insert((concept, property.property.clone()));
        conceptual.properties.push(out);
    }

    // A reverse connection on view A named after property q of target B is
    // the inverse of B.q; mirror it as an object property on B pointing
    // back at A, unless B already declares that property itself.
    for property in reversed {
        let Some(Connection::Reverse {
            property: target_property,
        }) = &property.connection
        else {
            continue;
        };
        let PhysicalValueType::View(target) = &property.value_type else {
            continue;
        };
        let concept = target.to_concept();
        let key = (concept.clone(), target_property.clone());
        if seen.contains(&key) {
            continue;
        }
        let mut out = ConceptualProperty::new(
            concept,
            target_property,
            ValueType::Concept(property.view.to_concept()),
        );
        out.description = property.description.clone();
        seen.insert(key);
        conceptual.properties.push(out);
    }

    debug!(
        model = %conceptual.metadata.model_id(),
        concepts = conceptual.concepts.len(),
        properties = conceptual.properties.len(),
        "converted physical data model to conceptual"
    );
    conceptual
}

fn metadata_of(model: &PhysicalDataModel) -> ConceptualMetadata {
    let mut metadata = ConceptualMetadata::new(
        &model.metadata.space,
        &model.metadata.external_id,
        &model.metadata.version,
    );
    metadata.creator = model.metadata.creator.clone();
    metadata.name = model.metadata.name.clone();
    metadata.description = model.metadata.description.clone();
    metadata.created = model.metadata.created;
    metadata.updated = model.metadata.updated;
    metadata
}

fn conceptual_value_type(value_type: &PhysicalValueType) -> ValueType {
    match value_type {
        PhysicalValueType::Data(data_type) => ValueType::Data(*data_type),
        PhysicalValueType::View(view) => ValueType::Concept(view.to_concept()),
        // The enum collection does not survive; values degrade to text.
        PhysicalValueType::Enum { .. } => ValueType::Data(DataType::Text),
        PhysicalValueType::Unknown => ValueType::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::unverified::UnverifiedPhysicalModel;

    fn load(yaml: &str) -> PhysicalDataModel {
        PhysicalDataModel::load(UnverifiedPhysicalModel::from_yaml(yaml).unwrap()).unwrap()
    }

    #[test]
    fn test_views_become_concepts_with_implements() {
        let model = load(
            r#"
Metadata: {space: power, externalId: M, version: v1}
Views:
  - View: Asset
  - View: GeneratingUnit
    Implements: Asset
Containers:
  - Container: GeneratingUnit
Properties:
  - {View: GeneratingUnit, View Property: ratedPower, Value Type: float64,
     Max Count: 1, Container: GeneratingUnit, Container Property: ratedPower}
"#,
        );
        let conceptual = to_conceptual(&model);
        assert_eq!(conceptual.concepts.len(), 2);
        let unit = conceptual.concept(&ConceptEntity::new(Some("power"), "GeneratingUnit", Some("v1"))).unwrap();
        assert_eq!(unit.implements.len(), 1);
        let property = &conceptual.properties[0];
        assert_eq!(property.value_type, ValueType::Data(DataType::Float64));
        assert_eq!(property.max_count, Some(1));
    }

    #[test]
    fn test_storage_detail_is_discarded() {
        let model = load(
            r#"
Metadata: {space: power, externalId: M, version: v1}
Views:
  - View: Asset
Containers:
  - Container: Asset
Properties:
  - {View: Asset, View Property: name, Value Type: text, Max Count: 1,
     Container: Asset, Container Property: name, Index: name, Constraint: unique:name}
"#,
        );
        let conceptual = to_conceptual(&model);
        assert_eq!(conceptual.properties.len(), 1);
        // Nothing in the conceptual property carries index/constraint/container.
        assert_eq!(
            conceptual.properties[0].value_type,
            ValueType::Data(DataType::Text)
        );
    }

    #[test]
    fn test_reverse_connection_mirrors_onto_target() {
        let model = load(
            r#"
Metadata: {space: power, externalId: M, version: v1}
Views:
  - View: Substation
  - View: GeneratingUnit
Containers:
  - Container: GeneratingUnit
Properties:
  - {View: Substation, View Property: units, Value Type: GeneratingUnit,
     Connection: "reverse(property=substation)"}
  - {View: GeneratingUnit, View Property: name, Value Type: text, Max Count: 1,
     Container: GeneratingUnit, Container Property: name}
"#,
        );
        let conceptual = to_conceptual(&model);
        let mirrored = conceptual
            .properties
            .iter()
            .find(|p| p.property == "substation")
            .unwrap();
        assert_eq!(mirrored.concept.suffix(), "GeneratingUnit");
        match &mirrored.value_type {
            ValueType::Concept(target) => assert_eq!(target.suffix(), "Substation"),
            other => panic!("expected concept, got {other:?}"),
        }
    }

    #[test]
    fn test_reverse_does_not_duplicate_existing_property() {
        let model = load(
            r#"
Metadata: {space: power, externalId: M, version: v1}
Views:
  - View: Substation
  - View: GeneratingUnit
Containers:
  - Container: GeneratingUnit
Properties:
  - {View: GeneratingUnit, View Property: substation, Value Type: Substation,
     Connection: direct, Max Count: 1, Container: GeneratingUnit, Container Property: substation}
  - {View: Substation, View Property: units, Value Type: GeneratingUnit,
     Connection: "reverse(property=substation)"}
"#,
        );
        let conceptual = to_conceptual(&model);
        let count = conceptual
            .properties
            .iter()
            .filter(|p| p.property == "substation")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_unknown_placeholder_round_trips() {
        let model = load(
            r##"
Metadata: {space: power, externalId: M, version: v1}
Views:
  - View: Asset
Properties:
  - {View: Asset, View Property: mystery, Value Type: "#N/A"}
"##,
        );
        let conceptual = to_conceptual(&model);
        assert_eq!(conceptual.properties[0].value_type, ValueType::Unknown);
    }
}
