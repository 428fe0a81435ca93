//! Unverified model input shapes
//!
//! These structs are the wire contract the spreadsheet and YAML importers
//! produce: a `Metadata` mapping plus ordered row lists, with the stable
//! alias set ("Concept", "Property", "Value Type", "Min Count", ...) as
//! field names. Nothing here is resolved or checked beyond what serde can
//! enforce; the verified models in [`super::conceptual`] and
//! [`super::physical`] are built from these.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::EntityParseError;

use super::metadata::{NeatId, SchemaCompleteness};

/// Error turning raw input into a verified model. Structural problems are
/// fatal here; semantic problems are left for validation.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to parse model document: {0}")]
    Document(String),
    #[error("metadata is missing required field '{0}'")]
    MissingMetadata(&'static str),
    #[error("{section} row {row}: {source}")]
    Entity {
        section: &'static str,
        row: usize,
        #[source]
        source: EntityParseError,
    },
}

/// Metadata section shared by both model kinds. `prefix` is the
/// conceptual spelling, `space` the physical one; either alias is
/// accepted on input.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnverifiedMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(
        default,
        rename = "schemaCompleteness",
        alias = "schema_completeness",
        skip_serializing_if = "Option::is_none"
    )]
    pub schema_completeness: Option<SchemaCompleteness>,
    #[serde(default, alias = "space", skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
    #[serde(
        default,
        rename = "externalId",
        alias = "external_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Comma-separated list of creators.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl UnverifiedMetadata {
    pub fn require(&self, field: &'static str) -> Result<&str, LoadError> {
        let value = match field {
            "prefix" | "space" => self.prefix.as_deref(),
            "external_id" => self.external_id.as_deref(),
            "version" => self.version.as_deref(),
            _ => None,
        };
        value.ok_or(LoadError::MissingMetadata(field))
    }

    pub fn creators(&self) -> Vec<String> {
        self.creator
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// "Max Count" accepts a number or a textual "inf"-style marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxCountWire {
    Number(u32),
    Text(String),
}

impl MaxCountWire {
    /// `None` means unbounded.
    pub fn resolve(&self) -> Option<u32> {
        match self {
            MaxCountWire::Number(n) => Some(*n),
            MaxCountWire::Text(text) => {
                let text = text.trim();
                if text.is_empty() || text.eq_ignore_ascii_case("inf") || text == "many" {
                    None
                } else {
                    text.parse().ok()
                }
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnverifiedConcept {
    #[serde(rename = "Concept")]
    pub concept: String,
    #[serde(default, rename = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Comma-separated parent concepts.
    #[serde(default, rename = "Implements", skip_serializing_if = "Option::is_none")]
    pub implements: Option<String>,
    #[serde(
        default,
        rename = "Instance Source",
        skip_serializing_if = "Option::is_none"
    )]
    pub instance_source: Option<String>,
    #[serde(default, rename = "neatId", skip_serializing_if = "Option::is_none")]
    pub neat_id: Option<NeatId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnverifiedConceptualProperty {
    #[serde(rename = "Concept")]
    pub concept: String,
    #[serde(rename = "Property")]
    pub property: String,
    #[serde(default, rename = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Value Type")]
    pub value_type: String,
    #[serde(default, rename = "Min Count", skip_serializing_if = "Option::is_none")]
    pub min_count: Option<u32>,
    #[serde(default, rename = "Max Count", skip_serializing_if = "Option::is_none")]
    pub max_count: Option<MaxCountWire>,
    #[serde(default, rename = "Default", skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Comma-separated source-graph predicate URIs.
    #[serde(
        default,
        rename = "Instance Source",
        skip_serializing_if = "Option::is_none"
    )]
    pub instance_source: Option<String>,
    #[serde(default, rename = "neatId", skip_serializing_if = "Option::is_none")]
    pub neat_id: Option<NeatId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnverifiedConceptualModel {
    #[serde(rename = "Metadata")]
    pub metadata: UnverifiedMetadata,
    #[serde(default, rename = "Concepts")]
    pub concepts: Vec<UnverifiedConcept>,
    #[serde(default, rename = "Properties")]
    pub properties: Vec<UnverifiedConceptualProperty>,
    #[serde(default, rename = "Prefixes")]
    pub prefixes: BTreeMap<String, String>,
}

impl UnverifiedConceptualModel {
    pub fn from_yaml(content: &str) -> Result<Self, LoadError> {
        serde_yaml::from_str(content).map_err(|e| LoadError::Document(e.to_string()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnverifiedView {
    #[serde(rename = "View")]
    pub view: String,
    #[serde(default, rename = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Comma-separated parent views.
    #[serde(default, rename = "Implements", skip_serializing_if = "Option::is_none")]
    pub implements: Option<String>,
    #[serde(default, rename = "Filter", skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, rename = "In Model", skip_serializing_if = "Option::is_none")]
    pub in_model: Option<bool>,
    #[serde(default, rename = "neatId", skip_serializing_if = "Option::is_none")]
    pub neat_id: Option<NeatId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnverifiedContainer {
    #[serde(rename = "Container")]
    pub container: String,
    #[serde(default, rename = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Comma-separated container constraints, e.g. `requires:power:Asset`.
    #[serde(default, rename = "Constraint", skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[serde(default, rename = "Used For", skip_serializing_if = "Option::is_none")]
    pub used_for: Option<String>,
    #[serde(default, rename = "neatId", skip_serializing_if = "Option::is_none")]
    pub neat_id: Option<NeatId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnverifiedPhysicalProperty {
    #[serde(rename = "View")]
    pub view: String,
    #[serde(rename = "View Property")]
    pub view_property: String,
    #[serde(default, rename = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `direct`, `edge(type=...)`, or `reverse(property=...)`.
    #[serde(default, rename = "Connection", skip_serializing_if = "Option::is_none")]
    pub connection: Option<String>,
    #[serde(default, rename = "Value Type", skip_serializing_if = "Option::is_none")]
    pub value_type: Option<String>,
    #[serde(default, rename = "Min Count", skip_serializing_if = "Option::is_none")]
    pub min_count: Option<u32>,
    #[serde(default, rename = "Max Count", skip_serializing_if = "Option::is_none")]
    pub max_count: Option<MaxCountWire>,
    #[serde(default, rename = "Immutable", skip_serializing_if = "Option::is_none")]
    pub immutable: Option<bool>,
    #[serde(default, rename = "Default", skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default, rename = "Container", skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
    #[serde(
        default,
        rename = "Container Property",
        skip_serializing_if = "Option::is_none"
    )]
    pub container_property: Option<String>,
    /// Comma-separated index tags, e.g. `name:btree` or `name:inverted`.
    #[serde(default, rename = "Index", skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    /// Comma-separated constraint tags, e.g. `unique:name`.
    #[serde(default, rename = "Constraint", skip_serializing_if = "Option::is_none")]
    pub constraint: Option<String>,
    #[serde(default, rename = "neatId", skip_serializing_if = "Option::is_none")]
    pub neat_id: Option<NeatId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnverifiedEnumValue {
    #[serde(rename = "Collection")]
    pub collection: String,
    #[serde(rename = "Value")]
    pub value: String,
    #[serde(default, rename = "Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnverifiedNodeType {
    #[serde(rename = "Node")]
    pub node: String,
    #[serde(default, rename = "Usage", skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnverifiedPhysicalModel {
    #[serde(rename = "Metadata")]
    pub metadata: UnverifiedMetadata,
    #[serde(default, rename = "Views")]
    pub views: Vec<UnverifiedView>,
    #[serde(default, rename = "Containers")]
    pub containers: Vec<UnverifiedContainer>,
    #[serde(default, rename = "Properties")]
    pub properties: Vec<UnverifiedPhysicalProperty>,
    #[serde(default, rename = "Enum")]
    pub enums: Vec<UnverifiedEnumValue>,
    #[serde(default, rename = "Nodes")]
    pub nodes: Vec<UnverifiedNodeType>,
}

impl UnverifiedPhysicalModel {
    pub fn from_yaml(content: &str) -> Result<Self, LoadError> {
        serde_yaml::from_str(content).map_err(|e| LoadError::Document(e.to_string()))
    }
}

/// Split a comma-separated cell into trimmed, non-empty items.
pub(crate) fn split_cell(raw: Option<&str>) -> Vec<String> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conceptual_model_from_yaml_aliases() {
        let yaml = r#"
Metadata:
  role: information architect
  prefix: power
  externalId: PowerModel
  version: v1
  creator: "Jon, Emma"
Concepts:
  - Concept: GeneratingUnit
    Implements: Asset
Properties:
  - Concept: GeneratingUnit
    Property: ratedPower
    Value Type: float64
    Min Count: 0
    Max Count: 1
"#;
        let model = UnverifiedConceptualModel::from_yaml(yaml).unwrap();
        assert_eq!(model.metadata.prefix.as_deref(), Some("power"));
        assert_eq!(model.metadata.creators(), vec!["Jon", "Emma"]);
        assert_eq!(model.concepts.len(), 1);
        assert_eq!(model.properties[0].value_type, "float64");
        assert_eq!(model.properties[0].max_count.as_ref().unwrap().resolve(), Some(1));
    }

    #[test]
    fn test_max_count_inf_resolves_to_unbounded() {
        assert_eq!(MaxCountWire::Text("inf".to_string()).resolve(), None);
        assert_eq!(MaxCountWire::Text(String::new()).resolve(), None);
        assert_eq!(MaxCountWire::Number(3).resolve(), Some(3));
    }
}
