//! DMS schema bundle export
//!
//! Turns a verified physical model into the deployable resource shapes a
//! schema-hosting platform consumes: one space, one data model listing, and
//! per-resource view/container/node definitions. The bundle serializes to a
//! YAML-per-resource file map and, behind the `zip-export` feature, to a
//! single zip archive. Purely in-memory; uploading is someone else's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::physical::{Connection, ContainerUsage, PhysicalDataModel, PhysicalValueType};
use crate::validation::identifiers::constraint_kind;

/// Errors from bundle serialization.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to serialize schema resource: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[cfg(feature = "zip-export")]
    #[error("failed to write schema archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[cfg(feature = "zip-export")]
    #[error("failed to write schema archive: {0}")]
    Io(#[from] std::io::Error),
}

/// Reference to a view or container resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReference {
    pub space: String,
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// The space resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceResource {
    pub space: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The data model resource: the listing of views in the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataModelResource {
    pub space: String,
    pub external_id: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub views: Vec<ResourceReference>,
}

/// A view property backed by a container slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappedPropertyResource {
    pub container: ResourceReference,
    pub container_property_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Target view, present on direct relations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<ResourceReference>,
}

/// A view property realized as an edge or reverse connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPropertyResource {
    pub connection_type: String,
    pub source: ResourceReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub edge_type: Option<ResourceReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ViewPropertyResource {
    Connection(ConnectionPropertyResource),
    Mapped(MappedPropertyResource),
}

/// A view resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewResource {
    pub space: String,
    pub external_id: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub implements: Vec<ResourceReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub properties: BTreeMap<String, ViewPropertyResource>,
}

/// Stored type of a container property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPropertyType {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub list: bool,
    /// Enum values, when the kind is `enum`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub values: BTreeMap<String, EnumValueResource>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnumValueResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPropertyResource {
    #[serde(rename = "type")]
    pub kind: ContainerPropertyType,
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub immutable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "constraintType")]
pub enum ConstraintResource {
    #[serde(rename = "requires")]
    Requires { require: ResourceReference },
    #[serde(rename = "uniqueness")]
    Uniqueness { properties: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexResource {
    pub index_type: String,
    pub properties: Vec<String>,
}

/// A container resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerResource {
    pub space: String,
    pub external_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub used_for: String,
    pub properties: BTreeMap<String, ContainerPropertyResource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub constraints: BTreeMap<String, ConstraintResource>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub indexes: BTreeMap<String, IndexResource>,
}

/// A node type resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTypeResource {
    pub space: String,
    pub external_id: String,
}

/// The deployable schema bundle for one physical model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DmsSchemaBundle {
    pub space: SpaceResource,
    pub data_model: DataModelResource,
    pub views: Vec<ViewResource>,
    pub containers: Vec<ContainerResource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub node_types: Vec<NodeTypeResource>,
}

impl DmsSchemaBundle {
    /// Build the bundle from a verified physical model. Local views and
    /// containers become resources; imported ones stay references.
    pub fn from_physical(model: &PhysicalDataModel) -> Self {
        let space = model.metadata.space.clone();
        let views = model
            .views
            .iter()
            .map(|view| ViewResource {
                space: view.view.prefix().unwrap_or(&space).to_string(),
                external_id: view.view.suffix().to_string(),
                version: view
                    .view
                    .version()
                    .unwrap_or(&model.metadata.version)
                    .to_string(),
                name: view.name.clone(),
                description: view.description.clone(),
                implements: view.implements.iter().map(view_reference).collect(),
                filter: view.filter.map(|f| f.name().to_string()),
                properties: view_properties(model, &view.view),
            })
            .collect();

        let containers = model
            .containers
            .iter()
            .map(|container| {
                let mut properties = BTreeMap::new();
                let mut constraints = container_constraints(&container.constraint, &space);
                let mut indexes = BTreeMap::new();
                for ((slot_container, slot), entries) in model.properties_by_container_slot() {
                    if slot_container != container.container {
                        continue;
                    }
                    // First definition wins; conflicting definitions are a
                    // validation error reported before export.
                    let (_, property) = entries[0];
                    properties.insert(
                        slot.clone(),
                        ContainerPropertyResource {
                            kind: container_property_type(model, property),
                            nullable: property.nullable(),
                            immutable: property.immutable,
                            default_value: property.default.clone(),
                            name: property.name.clone(),
                            description: property.description.clone(),
                        },
                    );
                    for tag in &property.index {
                        let (name, kind) = match tag.split_once(':') {
                            Some((name, kind)) => (name.trim(), kind.trim()),
                            None => (tag.as_str(), "btree"),
                        };
                        indexes
                            .entry(name.to_string())
                            .or_insert_with(|| IndexResource {
                                index_type: kind.to_string(),
                                properties: Vec::new(),
                            })
                            .properties
                            .push(slot.clone());
                    }
                    for tag in &property.constraint {
                        if constraint_kind(tag) == "unique" {
                            let name = tag.split_once(':').map_or(slot.as_str(), |(_, n)| n.trim());
                            constraints
                                .entry(name.to_string())
                                .or_insert_with(|| ConstraintResource::Uniqueness {
                                    properties: Vec::new(),
                                });
                            if let Some(ConstraintResource::Uniqueness { properties }) =
                                constraints.get_mut(name)
                            {
                                properties.push(slot.clone());
                            }
                        }
                    }
                }
                ContainerResource {
                    space: container.container.prefix().unwrap_or(&space).to_string(),
                    external_id: container.container.suffix().to_string(),
                    name: container.name.clone(),
                    description: container.description.clone(),
                    used_for: match container.used_for {
                        ContainerUsage::Node => "node",
                        ContainerUsage::Edge => "edge",
                        ContainerUsage::All => "all",
                    }
                    .to_string(),
                    properties,
                    constraints,
                    indexes,
                }
            })
            .collect();

        let bundle = DmsSchemaBundle {
            space: SpaceResource {
                space: space.clone(),
                name: model.metadata.name.clone(),
                description: None,
            },
            data_model: DataModelResource {
                space: space.clone(),
                external_id: model.metadata.external_id.clone(),
                version: model.metadata.version.clone(),
                name: model.metadata.name.clone(),
                description: model.metadata.description.clone(),
                views: model
                    .views
                    .iter()
                    .filter(|view| view.in_model)
                    .map(|view| view_reference(&view.view))
                    .collect(),
            },
            views,
            containers,
            node_types: model
                .nodes
                .iter()
                .map(|node| NodeTypeResource {
                    space: node.node.prefix().unwrap_or(&space).to_string(),
                    external_id: node.node.suffix().to_string(),
                })
                .collect(),
        };
        debug!(
            space = %bundle.space.space,
            views = bundle.views.len(),
            containers = bundle.containers.len(),
            "built schema bundle"
        );
        bundle
    }

    /// Serialize to a file map: path → YAML document.
    pub fn to_yaml_files(&self) -> Result<BTreeMap<String, String>, ExportError> {
        let mut files = BTreeMap::new();
        files.insert(
            format!("spaces/{}.space.yaml", self.space.space),
            serde_yaml::to_string(&self.space)?,
        );
        files.insert(
            format!(
                "data_models/{}.datamodel.yaml",
                self.data_model.external_id
            ),
            serde_yaml::to_string(&self.data_model)?,
        );
        for view in &self.views {
            files.insert(
                format!("views/{}.view.yaml", view.external_id),
                serde_yaml::to_string(view)?,
            );
        }
        for container in &self.containers {
            files.insert(
                format!("containers/{}.container.yaml", container.external_id),
                serde_yaml::to_string(container)?,
            );
        }
        for node in &self.node_types {
            files.insert(
                format!("nodes/{}.node.yaml", node.external_id),
                serde_yaml::to_string(node)?,
            );
        }
        Ok(files)
    }

    /// Serialize the whole bundle into a single zip archive.
    #[cfg(feature = "zip-export")]
    pub fn to_zip_archive(&self) -> Result<Vec<u8>, ExportError> {
        use std::io::Write;

        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for (path, content) in self.to_yaml_files()? {
            writer.start_file(path, options)?;
            writer.write_all(content.as_bytes())?;
        }
        Ok(writer.finish()?.into_inner())
    }
}

fn view_reference(view: &crate::entities::ViewEntity) -> ResourceReference {
    ResourceReference {
        space: view.prefix().unwrap_or_default().to_string(),
        external_id: view.suffix().to_string(),
        version: view.version().map(str::to_string),
    }
}

fn container_reference(
    container: &crate::entities::ContainerEntity,
    default_space: &str,
) -> ResourceReference {
    ResourceReference {
        space: container.prefix().unwrap_or(default_space).to_string(),
        external_id: container.suffix().to_string(),
        version: None,
    }
}

fn view_properties(
    model: &PhysicalDataModel,
    view: &crate::entities::ViewEntity,
) -> BTreeMap<String, ViewPropertyResource> {
    let space = &model.metadata.space;
    let mut out = BTreeMap::new();
    for property in model.properties_of(view) {
        let resource = match (&property.connection, property.container_slot()) {
            (Some(Connection::Edge {
                edge_type,
                direction,
            }), _) => {
                let PhysicalValueType::View(target) = &property.value_type else {
                    continue;
                };
                ViewPropertyResource::Connection(ConnectionPropertyResource {
                    connection_type: if property.is_list() {
                        "multi_edge_connection".to_string()
                    } else {
                        "single_edge_connection".to_string()
                    },
                    source: view_reference(target),
                    direction: direction.clone(),
                    edge_type: edge_type.as_ref().map(|e| ResourceReference {
                        space: e.prefix().unwrap_or(space).to_string(),
                        external_id: e.suffix().to_string(),
                        version: None,
                    }),
                    name: property.name.clone(),
                    description: property.description.clone(),
                })
            }
            (Some(Connection::Reverse { property: through }), _) => {
                let PhysicalValueType::View(target) = &property.value_type else {
                    continue;
                };
                ViewPropertyResource::Connection(ConnectionPropertyResource {
                    connection_type: if property.is_list() {
                        "multi_reverse_direct_relation".to_string()
                    } else {
                        "single_reverse_direct_relation".to_string()
                    },
                    source: view_reference(target),
                    direction: Some(format!("through:{through}")),
                    edge_type: None,
                    name: property.name.clone(),
                    description: property.description.clone(),
                })
            }
            (_, Some((container, slot))) => {
                let source = match &property.value_type {
                    PhysicalValueType::View(target) => Some(view_reference(target)),
                    _ => None,
                };
                ViewPropertyResource::Mapped(MappedPropertyResource {
                    container: container_reference(container, space),
                    container_property_identifier: slot.to_string(),
                    name: property.name.clone(),
                    description: property.description.clone(),
                    source,
                })
            }
            _ => continue,
        };
        out.insert(property.property.clone(), resource);
    }
    out
}

fn container_property_type(
    model: &PhysicalDataModel,
    property: &crate::models::physical::PhysicalProperty,
) -> ContainerPropertyType {
    let (kind, values) = match &property.value_type {
        PhysicalValueType::Data(data_type) => (data_type.dms_name().to_string(), BTreeMap::new()),
        PhysicalValueType::View(_) => ("direct".to_string(), BTreeMap::new()),
        PhysicalValueType::Enum { collection } => {
            let values = model
                .enums
                .iter()
                .filter(|e| &e.collection == collection)
                .map(|e| {
                    (
                        e.value.clone(),
                        EnumValueResource {
                            name: e.name.clone(),
                            description: e.description.clone(),
                        },
                    )
                })
                .collect();
            ("enum".to_string(), values)
        }
        PhysicalValueType::Unknown => ("json".to_string(), BTreeMap::new()),
    };
    ContainerPropertyType {
        kind,
        list: property.is_list(),
        values,
    }
}

/// Container-level constraint tags, keyed by the required resource.
fn container_constraints(
    tags: &[String],
    default_space: &str,
) -> BTreeMap<String, ConstraintResource> {
    let mut out = BTreeMap::new();
    for tag in tags {
        if let Some(target) = tag.strip_prefix("requires:")
            && let Ok(container) = crate::entities::ContainerEntity::load(target, Some(default_space))
        {
            out.insert(
                container.suffix().to_string(),
                ConstraintResource::Requires {
                    require: container_reference(&container, default_space),
                },
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::unverified::UnverifiedPhysicalModel;

    fn model() -> PhysicalDataModel {
        PhysicalDataModel::load(
            UnverifiedPhysicalModel::from_yaml(
                r#"
Metadata: {space: power, externalId: PowerModel, version: v1}
Views:
  - View: Asset
  - View: GeneratingUnit
    Implements: Asset
Containers:
  - Container: Asset
  - Container: GeneratingUnit
    Constraint: requires:Asset
Properties:
  - {View: Asset, View Property: name, Value Type: text, Max Count: 1,
     Container: Asset, Container Property: name, Index: name, Constraint: unique:name}
  - {View: GeneratingUnit, View Property: ratedPower, Value Type: float64,
     Max Count: 1, Container: GeneratingUnit, Container Property: ratedPower}
  - {View: GeneratingUnit, View Property: parts, Value Type: Asset, Connection: edge}
"#,
            )
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_bundle_shape() {
        let bundle = DmsSchemaBundle::from_physical(&model());
        assert_eq!(bundle.space.space, "power");
        assert_eq!(bundle.data_model.views.len(), 2);
        assert_eq!(bundle.views.len(), 2);
        assert_eq!(bundle.containers.len(), 2);
    }

    #[test]
    fn test_container_resource_carries_constraints_and_indexes() {
        let bundle = DmsSchemaBundle::from_physical(&model());
        let asset = bundle
            .containers
            .iter()
            .find(|c| c.external_id == "Asset")
            .unwrap();
        assert!(matches!(
            asset.constraints.get("name"),
            Some(ConstraintResource::Uniqueness { properties }) if properties == &vec!["name".to_string()]
        ));
        assert_eq!(asset.indexes.get("name").unwrap().index_type, "btree");

        let unit = bundle
            .containers
            .iter()
            .find(|c| c.external_id == "GeneratingUnit")
            .unwrap();
        assert!(matches!(
            unit.constraints.get("Asset"),
            Some(ConstraintResource::Requires { require }) if require.external_id == "Asset"
        ));
    }

    #[test]
    fn test_edge_property_becomes_connection_resource() {
        let bundle = DmsSchemaBundle::from_physical(&model());
        let unit = bundle
            .views
            .iter()
            .find(|v| v.external_id == "GeneratingUnit")
            .unwrap();
        match unit.properties.get("parts").unwrap() {
            ViewPropertyResource::Connection(connection) => {
                assert_eq!(connection.connection_type, "multi_edge_connection");
                assert_eq!(connection.source.external_id, "Asset");
            }
            other => panic!("expected connection, got {other:?}"),
        }
    }

    #[test]
    fn test_yaml_file_map_layout() {
        let bundle = DmsSchemaBundle::from_physical(&model());
        let files = bundle.to_yaml_files().unwrap();
        assert!(files.contains_key("spaces/power.space.yaml"));
        assert!(files.contains_key("data_models/PowerModel.datamodel.yaml"));
        assert!(files.contains_key("views/GeneratingUnit.view.yaml"));
        assert!(files.contains_key("containers/Asset.container.yaml"));
        let view: ViewResource =
            serde_yaml::from_str(&files["views/GeneratingUnit.view.yaml"]).unwrap();
        assert_eq!(view.implements.len(), 1);
    }

    #[cfg(feature = "zip-export")]
    #[test]
    fn test_zip_archive_round_trips() {
        use std::io::{Read, Write};

        let bundle = DmsSchemaBundle::from_physical(&model());
        let bytes = bundle.to_zip_archive().unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&bytes).unwrap();
        let mut archive = zip::ZipArchive::new(file.reopen().unwrap()).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"spaces/power.space.yaml".to_string()));

        let mut content = String::new();
        archive
            .by_name("data_models/PowerModel.datamodel.yaml")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        let data_model: DataModelResource = serde_yaml::from_str(&content).unwrap();
        assert_eq!(data_model.external_id, "PowerModel");
    }
}
