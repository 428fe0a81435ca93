//! Verified conceptual data model
//!
//! An ontology-like description of concepts and properties, independent of
//! storage. Built by normalizing an unverified input model against its own
//! prefix and version; semantic invariants are checked separately by
//! [`crate::validation::conceptual`].

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entities::{ConceptEntity, ValueType, ViewEntity};

use super::metadata::{ConceptualMetadata, NeatId};
use super::physical::PhysicalDataModel;
use super::unverified::{
    split_cell, LoadError, UnverifiedConcept, UnverifiedConceptualModel,
    UnverifiedConceptualProperty, UnverifiedMetadata,
};

/// A conceptual class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub concept: ConceptEntity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parent concepts; expected to form a DAG over the model.
    #[serde(default)]
    pub implements: Vec<ConceptEntity>,
    /// Source-graph type URI this concept was inferred from.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neat_id: Option<NeatId>,
    /// Paired physical view, populated by sync. Lookup only, no ownership.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical: Option<ViewEntity>,
}

impl Concept {
    pub fn new(concept: ConceptEntity) -> Self {
        Self {
            concept,
            name: None,
            description: None,
            implements: Vec::new(),
            instance_source: None,
            neat_id: None,
            physical: None,
        }
    }
}

/// A property of a conceptual class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptualProperty {
    pub concept: ConceptEntity,
    pub property: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value_type: ValueType,
    #[serde(default)]
    pub min_count: u32,
    /// `None` means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Source-graph predicate URIs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instance_source: Vec<String>,
    /// Set by inheritance resolution; excluded from external dumps.
    #[serde(skip)]
    pub inherited: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neat_id: Option<NeatId>,
}

impl ConceptualProperty {
    pub fn new(concept: ConceptEntity, property: &str, value_type: ValueType) -> Self {
        Self {
            concept,
            property: property.to_string(),
            name: None,
            description: None,
            value_type,
            min_count: 0,
            max_count: None,
            default: None,
            instance_source: Vec::new(),
            inherited: false,
            neat_id: None,
        }
    }

    /// Derived data-vs-object distinction; never stored.
    pub fn is_object_property(&self) -> bool {
        self.value_type.is_object()
    }

    pub fn is_required(&self) -> bool {
        self.min_count > 0
    }

    pub fn is_list(&self) -> bool {
        self.max_count != Some(1)
    }
}

/// Side tables pairing conceptual and physical resources by neatId.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelPairing {
    /// concept neatId → paired view.
    pub concepts: BTreeMap<NeatId, ViewEntity>,
    /// conceptual property neatId → physical property neatId.
    pub properties: BTreeMap<NeatId, NeatId>,
}

/// Verified conceptual data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptualDataModel {
    pub metadata: ConceptualMetadata,
    pub concepts: Vec<Concept>,
    pub properties: Vec<ConceptualProperty>,
    /// prefix → namespace URI.
    #[serde(default)]
    pub prefixes: BTreeMap<String, String>,
}

impl ConceptualDataModel {
    /// Build a verified model from unverified input, normalizing every
    /// entity against the model's own prefix and version. Fails only on
    /// structural problems; semantic issues are left for validation.
    pub fn load(unverified: UnverifiedConceptualModel) -> Result<Self, LoadError> {
        let metadata = Self::load_metadata(&unverified.metadata)?;
        let prefix = metadata.prefix.clone();
        let version = metadata.version.clone();

        let mut concepts = Vec::with_capacity(unverified.concepts.len());
        for (row, raw) in unverified.concepts.iter().enumerate() {
            concepts.push(Self::load_concept(raw, row, &prefix, &version)?);
        }

        let mut properties = Vec::with_capacity(unverified.properties.len());
        for (row, raw) in unverified.properties.iter().enumerate() {
            properties.push(Self::load_property(raw, row, &prefix, &version)?);
        }

        debug!(
            model = %metadata.model_id(),
            concepts = concepts.len(),
            properties = properties.len(),
            "loaded conceptual data model"
        );

        Ok(Self {
            metadata,
            concepts,
            properties,
            prefixes: unverified.prefixes,
        })
    }

    fn load_metadata(raw: &UnverifiedMetadata) -> Result<ConceptualMetadata, LoadError> {
        let mut metadata = ConceptualMetadata::new(
            raw.require("prefix")?,
            raw.require("external_id")?,
            raw.require("version")?,
        );
        metadata.schema_completeness = raw.schema_completeness.unwrap_or_default();
        metadata.creator = raw.creators();
        metadata.name = raw.name.clone();
        metadata.description = raw.description.clone();
        if let Some(created) = raw.created {
            metadata.created = created;
        }
        if let Some(updated) = raw.updated {
            metadata.updated = updated;
        }
        Ok(metadata)
    }

    fn load_concept(
        raw: &UnverifiedConcept,
        row: usize,
        prefix: &str,
        version: &str,
    ) -> Result<Concept, LoadError> {
        let entity = |value: &str| {
            ConceptEntity::load(value, Some(prefix))
                .map(|c| ConceptEntity(c.0.with_default_version(version)))
                .map_err(|source| LoadError::Entity {
                    section: "Concepts",
                    row,
                    source,
                })
        };
        let mut concept = Concept::new(entity(&raw.concept)?);
        concept.name = raw.name.clone();
        concept.description = raw.description.clone();
        concept.instance_source = raw.instance_source.clone();
        concept.neat_id = raw.neat_id;
        for parent in split_cell(raw.implements.as_deref()) {
            concept.implements.push(entity(&parent)?);
        }
        Ok(concept)
    }

    fn load_property(
        raw: &UnverifiedConceptualProperty,
        row: usize,
        prefix: &str,
        version: &str,
    ) -> Result<ConceptualProperty, LoadError> {
        let entity_err = |source| LoadError::Entity {
            section: "Properties",
            row,
            source,
        };
        let concept = ConceptEntity::load(&raw.concept, Some(prefix))
            .map(|c| ConceptEntity(c.0.with_default_version(version)))
            .map_err(entity_err)?;
        let value_type = match ValueType::load(raw.value_type.as_str(), Some(prefix)) {
            Ok(ValueType::Concept(c)) => {
                ValueType::Concept(ConceptEntity(c.0.with_default_version(version)))
            }
            Ok(other) => other,
            Err(source) => return Err(entity_err(source)),
        };
        let mut property = ConceptualProperty::new(concept, &raw.property, value_type);
        property.name = raw.name.clone();
        property.description = raw.description.clone();
        property.min_count = raw.min_count.unwrap_or(0);
        property.max_count = raw.max_count.as_ref().and_then(|m| m.resolve());
        property.default = raw.default.clone();
        property.instance_source = split_cell(raw.instance_source.as_deref());
        property.neat_id = raw.neat_id;
        Ok(property)
    }

    /// Dump back to the wire shape with every entity fully resolved and
    /// neatIds stamped. Inherited properties are excluded.
    pub fn dump(&self) -> UnverifiedConceptualModel {
        let prefix = Some(self.metadata.prefix.as_str());
        let version = Some(self.metadata.version.as_str());
        UnverifiedConceptualModel {
            metadata: UnverifiedMetadata {
                role: Some("information architect".to_string()),
                schema_completeness: Some(self.metadata.schema_completeness),
                prefix: Some(self.metadata.prefix.clone()),
                external_id: Some(self.metadata.external_id.clone()),
                version: Some(self.metadata.version.clone()),
                creator: if self.metadata.creator.is_empty() {
                    None
                } else {
                    Some(self.metadata.creator.join(", "))
                },
                name: self.metadata.name.clone(),
                description: self.metadata.description.clone(),
                created: Some(self.metadata.created),
                updated: Some(self.metadata.updated),
            },
            concepts: self
                .concepts
                .iter()
                .map(|concept| UnverifiedConcept {
                    concept: concept.concept.dump(prefix, version),
                    name: concept.name.clone(),
                    description: concept.description.clone(),
                    implements: if concept.implements.is_empty() {
                        None
                    } else {
                        Some(
                            concept
                                .implements
                                .iter()
                                .map(|parent| parent.dump(prefix, version))
                                .collect::<Vec<_>>()
                                .join(", "),
                        )
                    },
                    instance_source: concept.instance_source.clone(),
                    neat_id: concept.neat_id,
                })
                .collect(),
            properties: self
                .properties
                .iter()
                .filter(|property| !property.inherited)
                .map(|property| UnverifiedConceptualProperty {
                    concept: property.concept.dump(prefix, version),
                    property: property.property.clone(),
                    name: property.name.clone(),
                    description: property.description.clone(),
                    value_type: property.value_type.dump(prefix, version),
                    min_count: Some(property.min_count),
                    max_count: property
                        .max_count
                        .map(super::unverified::MaxCountWire::Number),
                    default: property.default.clone(),
                    instance_source: if property.instance_source.is_empty() {
                        None
                    } else {
                        Some(property.instance_source.join(", "))
                    },
                    neat_id: property.neat_id,
                })
                .collect(),
            prefixes: self.prefixes.clone(),
        }
    }

    /// Stamp deterministic neatIds on every concept and property that does
    /// not already carry one.
    pub fn set_neat_ids(&mut self) {
        let model = self.metadata.model_id();
        for concept in &mut self.concepts {
            if concept.neat_id.is_none() {
                concept.neat_id = Some(NeatId::mint(
                    &model,
                    "concept",
                    &concept.concept.to_string(),
                ));
            }
        }
        for property in &mut self.properties {
            if property.neat_id.is_none() {
                let key = format!("{}.{}", property.concept, property.property);
                property.neat_id = Some(NeatId::mint(&model, "property", &key));
            }
        }
    }

    pub fn concept(&self, entity: &ConceptEntity) -> Option<&Concept> {
        self.concepts.iter().find(|c| &c.concept == entity)
    }

    /// Concept ids defined in this model.
    pub fn defined_concepts(&self) -> BTreeSet<&ConceptEntity> {
        self.concepts.iter().map(|c| &c.concept).collect()
    }

    /// Direct (non-inherited) properties of a concept, in model order.
    pub fn properties_of(&self, entity: &ConceptEntity) -> Vec<&ConceptualProperty> {
        self.properties
            .iter()
            .filter(|p| &p.concept == entity)
            .collect()
    }

    /// All ancestors of a concept reachable through `implements`, guarding
    /// against cycles (cycles are a validation error, not a panic here).
    pub fn ancestors(&self, entity: &ConceptEntity) -> Vec<&ConceptEntity> {
        let mut seen: HashSet<&ConceptEntity> = HashSet::new();
        let mut stack: Vec<&ConceptEntity> = match self.concept(entity) {
            Some(concept) => concept.implements.iter().collect(),
            None => Vec::new(),
        };
        let mut out = Vec::new();
        while let Some(parent) = stack.pop() {
            if parent == entity || !seen.insert(parent) {
                continue;
            }
            out.push(parent);
            if let Some(concept) = self.concept(parent) {
                stack.extend(concept.implements.iter());
            }
        }
        out
    }

    /// Whether a concept has any direct or inherited properties.
    pub fn has_properties(&self, entity: &ConceptEntity) -> bool {
        if !self.properties_of(entity).is_empty() {
            return true;
        }
        self.ancestors(entity)
            .iter()
            .any(|parent| !self.properties_of(parent).is_empty())
    }

    /// Materialize inherited properties: for every concept, copies of each
    /// ancestor property not shadowed by an own property, flagged
    /// `inherited`. Leaves the model's own property rows untouched.
    pub fn resolve_inheritance(&mut self) {
        let mut additions = Vec::new();
        for concept in &self.concepts {
            let own: HashSet<&str> = self
                .properties_of(&concept.concept)
                .iter()
                .map(|p| p.property.as_str())
                .collect();
            let mut seen = own.clone();
            for parent in self.ancestors(&concept.concept) {
                for property in self.properties_of(parent) {
                    if seen.contains(property.property.as_str()) {
                        continue;
                    }
                    let mut copy = property.clone();
                    copy.concept = concept.concept.clone();
                    copy.inherited = true;
                    copy.neat_id = None;
                    additions.push(copy);
                    seen.insert(property.property.as_str());
                }
            }
        }
        self.properties.extend(additions);
    }

    /// Populate the conceptual/physical back-references by walking both
    /// models by neatId. Returns the pairing side tables.
    pub fn sync_with_physical_data_model(
        &mut self,
        physical: &mut PhysicalDataModel,
    ) -> ModelPairing {
        let mut pairing = ModelPairing::default();

        let views: BTreeMap<NeatId, ViewEntity> = physical
            .views
            .iter()
            .filter_map(|view| view.neat_id.map(|id| (id, view.view.clone())))
            .collect();
        let mut concepts_by_id: BTreeMap<NeatId, ConceptEntity> = BTreeMap::new();
        for concept in &mut self.concepts {
            if let Some(id) = concept.neat_id {
                concepts_by_id.insert(id, concept.concept.clone());
                if let Some(view) = views.get(&id) {
                    concept.physical = Some(view.clone());
                    pairing.concepts.insert(id, view.clone());
                }
            }
        }
        for view in &mut physical.views {
            if let Some(id) = view.neat_id
                && let Some(concept) = concepts_by_id.get(&id)
            {
                view.conceptual = Some(concept.clone());
            }
        }

        let physical_properties: BTreeSet<NeatId> = physical
            .properties
            .iter()
            .filter_map(|property| property.neat_id)
            .collect();
        for property in &self.properties {
            if let Some(id) = property.neat_id
                && physical_properties.contains(&id)
            {
                pairing.properties.insert(id, id);
            }
        }

        self.metadata.physical = Some(physical.metadata.neat_id());
        physical.metadata.conceptual = Some(self.metadata.neat_id());
        pairing
    }
}
