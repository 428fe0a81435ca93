//! Verified physical data model
//!
//! The storage-oriented layer: views exposing properties, containers
//! holding the concrete values, plus enum collections and node types.
//! Container properties are the unit of schema storage and must satisfy
//! the platform constraints checked in [`crate::validation::physical`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entities::{
    ConceptEntity, ContainerEntity, DataType, Entity, EntityParseError, ViewEntity,
};

use super::metadata::{NeatId, PhysicalMetadata};
use super::unverified::{
    split_cell, LoadError, UnverifiedContainer, UnverifiedEnumValue, UnverifiedMetadata,
    UnverifiedNodeType, UnverifiedPhysicalModel, UnverifiedPhysicalProperty, UnverifiedView,
};

/// Platform limit: containers a single view may map to.
pub const MAX_CONTAINERS_PER_VIEW: usize = 10;
/// Platform limit: containers under a single hasData filter.
pub const MAX_CONTAINERS_PER_HAS_DATA_FILTER: usize = 5;
/// Platform limit: external id length for views, containers, and properties.
pub const MAX_EXTERNAL_ID_LENGTH: usize = 255;
/// Platform limit: space identifier length.
pub const MAX_SPACE_LENGTH: usize = 43;

/// How a view property relates to another view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Connection {
    /// Inline foreign-key-like field, stored in a container.
    Direct,
    /// Edge records between instances.
    Edge {
        /// Edge type reference, when pinned.
        edge_type: Option<Entity>,
        /// `outwards` (default) or `inwards`.
        direction: Option<String>,
    },
    /// Computed inverse of another view's direct relation or edge.
    Reverse { property: String },
}

impl Connection {
    /// Parse a connection cell. The cell reuses the entity grammar:
    /// `direct`, `edge(type=power:Line)`, `reverse(property=units)`.
    pub fn load(raw: &str, default_prefix: Option<&str>) -> Result<Self, EntityParseError> {
        let entity = Entity::load(raw, None)?;
        match entity.suffix() {
            "direct" => Ok(Connection::Direct),
            "edge" => {
                let edge_type = match entity.arg("type") {
                    Some(value) => Some(Entity::load(value, default_prefix)?),
                    None => None,
                };
                Ok(Connection::Edge {
                    edge_type,
                    direction: entity.arg("direction").map(str::to_string),
                })
            }
            "reverse" => Ok(Connection::Reverse {
                property: entity.arg("property").unwrap_or_default().to_string(),
            }),
            _ => Err(EntityParseError::InvalidFormat(raw.to_string())),
        }
    }

    pub fn dump(&self) -> String {
        match self {
            Connection::Direct => "direct".to_string(),
            Connection::Edge {
                edge_type,
                direction,
            } => {
                let mut args = Vec::new();
                if let Some(direction) = direction {
                    args.push(format!("direction={direction}"));
                }
                if let Some(edge_type) = edge_type {
                    args.push(format!("type={edge_type}"));
                }
                if args.is_empty() {
                    "edge".to_string()
                } else {
                    format!("edge({})", args.join(", "))
                }
            }
            Connection::Reverse { property } => format!("reverse(property={property})"),
        }
    }
}

impl fmt::Display for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dump())
    }
}

/// Value type of a physical property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhysicalValueType {
    Data(DataType),
    /// Connection target.
    View(ViewEntity),
    /// Enum-typed container property, values in [`PhysicalEnum`] rows.
    Enum { collection: String },
    /// Placeholder carried through from an unknown conceptual type;
    /// round-trips back to unknown on the inverse transform.
    Unknown,
}

impl PhysicalValueType {
    pub fn load(raw: &str, default_prefix: Option<&str>) -> Result<Self, EntityParseError> {
        let raw = raw.trim();
        if raw.is_empty() || raw == crate::entities::value_type::UNKNOWN_REPR {
            return Ok(PhysicalValueType::Unknown);
        }
        if let Some(data_type) = DataType::parse(raw) {
            return Ok(PhysicalValueType::Data(data_type));
        }
        let entity = Entity::load(raw, default_prefix)?;
        if entity.suffix() == "enum" {
            return Ok(PhysicalValueType::Enum {
                collection: entity.arg("collection").unwrap_or_default().to_string(),
            });
        }
        Ok(PhysicalValueType::View(ViewEntity(entity)))
    }

    pub fn dump(&self, default_prefix: Option<&str>, default_version: Option<&str>) -> String {
        match self {
            PhysicalValueType::Data(data_type) => data_type.name().to_string(),
            PhysicalValueType::View(view) => view.dump(default_prefix, default_version),
            PhysicalValueType::Enum { collection } => format!("enum(collection={collection})"),
            PhysicalValueType::Unknown => crate::entities::value_type::UNKNOWN_REPR.to_string(),
        }
    }
}

/// Filter selecting which instances a view reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewFilter {
    HasData,
    NodeType,
}

impl ViewFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "hasData" => Some(ViewFilter::HasData),
            "nodeType" => Some(ViewFilter::NodeType),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ViewFilter::HasData => "hasData",
            ViewFilter::NodeType => "nodeType",
        }
    }
}

/// What kind of instances a container stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerUsage {
    #[default]
    Node,
    Edge,
    All,
}

impl ContainerUsage {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "node" => Some(ContainerUsage::Node),
            "edge" => Some(ContainerUsage::Edge),
            "all" => Some(ContainerUsage::All),
            _ => None,
        }
    }
}

/// A physical view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalView {
    pub view: ViewEntity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub implements: Vec<ViewEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<ViewFilter>,
    /// Whether the view is part of the data model listing (imports are not).
    #[serde(default = "default_true")]
    pub in_model: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neat_id: Option<NeatId>,
    /// Paired concept, populated by sync. Lookup only, no ownership.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conceptual: Option<ConceptEntity>,
}

fn default_true() -> bool {
    true
}

impl PhysicalView {
    pub fn new(view: ViewEntity) -> Self {
        Self {
            view,
            name: None,
            description: None,
            implements: Vec::new(),
            filter: None,
            in_model: true,
            neat_id: None,
            conceptual: None,
        }
    }
}

/// A physical container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalContainer {
    pub container: ContainerEntity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Container-level constraint tags, e.g. `requires:power:Asset`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraint: Vec<String>,
    #[serde(default)]
    pub used_for: ContainerUsage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neat_id: Option<NeatId>,
}

impl PhysicalContainer {
    pub fn new(container: ContainerEntity) -> Self {
        Self {
            container,
            name: None,
            description: None,
            constraint: Vec::new(),
            used_for: ContainerUsage::default(),
            neat_id: None,
        }
    }
}

/// A view property, optionally backed by a container property and/or a
/// connection to another view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalProperty {
    pub view: ViewEntity,
    pub property: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection: Option<Connection>,
    pub value_type: PhysicalValueType,
    #[serde(default)]
    pub min_count: u32,
    /// `None` means unbounded (a list property).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u32>,
    #[serde(default)]
    pub immutable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerEntity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_property: Option<String>,
    /// Index tags, e.g. `name:btree`, `name:inverted`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub index: Vec<String>,
    /// Property-level constraint tags, e.g. `unique:name`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraint: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neat_id: Option<NeatId>,
}

impl PhysicalProperty {
    pub fn new(view: ViewEntity, property: &str, value_type: PhysicalValueType) -> Self {
        Self {
            view,
            property: property.to_string(),
            name: None,
            description: None,
            connection: None,
            value_type,
            min_count: 0,
            max_count: None,
            immutable: false,
            default: None,
            container: None,
            container_property: None,
            index: Vec::new(),
            constraint: Vec::new(),
            neat_id: None,
        }
    }

    pub fn nullable(&self) -> bool {
        self.min_count == 0
    }

    pub fn is_list(&self) -> bool {
        self.max_count != Some(1)
    }

    /// The container storage slot, when this property has one.
    pub fn container_slot(&self) -> Option<(&ContainerEntity, &str)> {
        match (&self.container, &self.container_property) {
            (Some(container), Some(property)) => Some((container, property.as_str())),
            _ => None,
        }
    }
}

/// One value in an enum collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalEnum {
    pub collection: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A node type resource deployed alongside the schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalNodeType {
    pub node: Entity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

/// Verified physical data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalDataModel {
    pub metadata: PhysicalMetadata,
    pub views: Vec<PhysicalView>,
    pub containers: Vec<PhysicalContainer>,
    pub properties: Vec<PhysicalProperty>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<PhysicalEnum>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<PhysicalNodeType>,
    /// Views referenced but defined in another model.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub imported_views: BTreeSet<ViewEntity>,
    /// Containers referenced but defined in another model.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub imported_containers: BTreeSet<ContainerEntity>,
}

impl PhysicalDataModel {
    pub fn new(metadata: PhysicalMetadata) -> Self {
        Self {
            metadata,
            views: Vec::new(),
            containers: Vec::new(),
            properties: Vec::new(),
            enums: Vec::new(),
            nodes: Vec::new(),
            imported_views: BTreeSet::new(),
            imported_containers: BTreeSet::new(),
        }
    }

    /// Build a verified model from unverified input.
    pub fn load(unverified: UnverifiedPhysicalModel) -> Result<Self, LoadError> {
        let metadata = Self::load_metadata(&unverified.metadata)?;
        let space = metadata.space.clone();
        let version = metadata.version.clone();

        let mut model = Self::new(metadata);
        for (row, raw) in unverified.views.iter().enumerate() {
            model.views.push(Self::load_view(raw, row, &space, &version)?);
        }
        for (row, raw) in unverified.containers.iter().enumerate() {
            model
                .containers
                .push(Self::load_container(raw, row, &space)?);
        }
        for (row, raw) in unverified.properties.iter().enumerate() {
            model
                .properties
                .push(Self::load_property(raw, row, &space, &version)?);
        }
        for raw in &unverified.enums {
            model.enums.push(PhysicalEnum {
                collection: raw.collection.clone(),
                value: raw.value.clone(),
                name: raw.name.clone(),
                description: raw.description.clone(),
            });
        }
        for (row, raw) in unverified.nodes.iter().enumerate() {
            let node = Entity::load(&raw.node, Some(&space)).map_err(|source| {
                LoadError::Entity {
                    section: "Nodes",
                    row,
                    source,
                }
            })?;
            model.nodes.push(PhysicalNodeType {
                node,
                usage: raw.usage.clone(),
            });
        }
        model.track_imports();

        debug!(
            model = %model.metadata.model_id(),
            views = model.views.len(),
            containers = model.containers.len(),
            properties = model.properties.len(),
            "loaded physical data model"
        );
        Ok(model)
    }

    fn load_metadata(raw: &UnverifiedMetadata) -> Result<PhysicalMetadata, LoadError> {
        let mut metadata = PhysicalMetadata::new(
            raw.require("space")?,
            raw.require("external_id")?,
            raw.require("version")?,
        );
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

    fn load_view(
        raw: &UnverifiedView,
        row: usize,
        space: &str,
        version: &str,
    ) -> Result<PhysicalView, LoadError> {
        let entity = |value: &str| {
            ViewEntity::load(value, Some(space))
                .map(|v| ViewEntity(v.0.with_default_version(version)))
                .map_err(|source| LoadError::Entity {
                    section: "Views",
                    row,
                    source,
                })
        };
        let mut view = PhysicalView::new(entity(&raw.view)?);
        view.name = raw.name.clone();
        view.description = raw.description.clone();
        view.filter = raw.filter.as_deref().and_then(ViewFilter::parse);
        view.in_model = raw.in_model.unwrap_or(true);
        view.neat_id = raw.neat_id;
        for parent in split_cell(raw.implements.as_deref()) {
            view.implements.push(entity(&parent)?);
        }
        Ok(view)
    }

    fn load_container(
        raw: &UnverifiedContainer,
        row: usize,
        space: &str,
    ) -> Result<PhysicalContainer, LoadError> {
        let container =
            ContainerEntity::load(&raw.container, Some(space)).map_err(|source| {
                LoadError::Entity {
                    section: "Containers",
                    row,
                    source,
                }
            })?;
        let mut out = PhysicalContainer::new(container);
        out.name = raw.name.clone();
        out.description = raw.description.clone();
        out.constraint = split_cell(raw.constraint.as_deref());
        out.used_for = raw
            .used_for
            .as_deref()
            .and_then(ContainerUsage::parse)
            .unwrap_or_default();
        out.neat_id = raw.neat_id;
        Ok(out)
    }

    fn load_property(
        raw: &UnverifiedPhysicalProperty,
        row: usize,
        space: &str,
        version: &str,
    ) -> Result<PhysicalProperty, LoadError> {
        let entity_err = |source| LoadError::Entity {
            section: "Properties",
            row,
            source,
        };
        let view = ViewEntity::load(&raw.view, Some(space))
            .map(|v| ViewEntity(v.0.with_default_version(version)))
            .map_err(entity_err)?;
        let value_type = match raw.value_type.as_deref() {
            Some(value) => match PhysicalValueType::load(value, Some(space)).map_err(entity_err)? {
                PhysicalValueType::View(v) => {
                    PhysicalValueType::View(ViewEntity(v.0.with_default_version(version)))
                }
                other => other,
            },
            None => PhysicalValueType::Unknown,
        };
        let mut property = PhysicalProperty::new(view, &raw.view_property, value_type);
        property.name = raw.name.clone();
        property.description = raw.description.clone();
        property.connection = match raw.connection.as_deref() {
            Some(cell) => Some(Connection::load(cell, Some(space)).map_err(entity_err)?),
            None => None,
        };
        property.min_count = raw.min_count.unwrap_or(0);
        property.max_count = raw.max_count.as_ref().and_then(|m| m.resolve());
        property.immutable = raw.immutable.unwrap_or(false);
        property.default = raw.default.clone();
        property.container = match raw.container.as_deref() {
            Some(cell) => Some(ContainerEntity::load(cell, Some(space)).map_err(entity_err)?),
            None => None,
        };
        property.container_property = raw.container_property.clone();
        property.index = split_cell(raw.index.as_deref());
        property.constraint = split_cell(raw.constraint.as_deref());
        property.neat_id = raw.neat_id;
        Ok(property)
    }

    /// Record referenced views/containers from foreign spaces as imports.
    pub fn track_imports(&mut self) {
        let own_views: BTreeSet<&ViewEntity> = self.views.iter().map(|v| &v.view).collect();
        let own_containers: BTreeSet<&ContainerEntity> =
            self.containers.iter().map(|c| &c.container).collect();

        let mut imported_views = BTreeSet::new();
        let mut imported_containers = BTreeSet::new();
        for property in &self.properties {
            if let PhysicalValueType::View(target) = &property.value_type
                && !own_views.contains(target)
                && target.prefix() != Some(self.metadata.space.as_str())
            {
                imported_views.insert(target.clone());
            }
            if let Some(container) = &property.container
                && !own_containers.contains(container)
                && container.prefix() != Some(self.metadata.space.as_str())
            {
                imported_containers.insert(container.clone());
            }
        }
        for view in &self.views {
            for parent in &view.implements {
                if !own_views.contains(parent)
                    && parent.prefix() != Some(self.metadata.space.as_str())
                {
                    imported_views.insert(parent.clone());
                }
            }
        }
        self.imported_views = imported_views;
        self.imported_containers = imported_containers;
    }

    /// Dump back to the wire shape with every entity fully resolved.
    pub fn dump(&self) -> UnverifiedPhysicalModel {
        let space = Some(self.metadata.space.as_str());
        let version = Some(self.metadata.version.as_str());
        UnverifiedPhysicalModel {
            metadata: UnverifiedMetadata {
                role: Some("DMS architect".to_string()),
                schema_completeness: None,
                prefix: Some(self.metadata.space.clone()),
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
            views: self
                .views
                .iter()
                .map(|view| UnverifiedView {
                    view: view.view.dump(space, version),
                    name: view.name.clone(),
                    description: view.description.clone(),
                    implements: if view.implements.is_empty() {
                        None
                    } else {
                        Some(
                            view.implements
                                .iter()
                                .map(|parent| parent.dump(space, version))
                                .collect::<Vec<_>>()
                                .join(", "),
                        )
                    },
                    filter: view.filter.map(|f| f.name().to_string()),
                    in_model: Some(view.in_model),
                    neat_id: view.neat_id,
                })
                .collect(),
            containers: self
                .containers
                .iter()
                .map(|container| UnverifiedContainer {
                    container: container.container.dump(space, None),
                    name: container.name.clone(),
                    description: container.description.clone(),
                    constraint: if container.constraint.is_empty() {
                        None
                    } else {
                        Some(container.constraint.join(", "))
                    },
                    used_for: Some(
                        match container.used_for {
                            ContainerUsage::Node => "node",
                            ContainerUsage::Edge => "edge",
                            ContainerUsage::All => "all",
                        }
                        .to_string(),
                    ),
                    neat_id: container.neat_id,
                })
                .collect(),
            properties: self
                .properties
                .iter()
                .map(|property| UnverifiedPhysicalProperty {
                    view: property.view.dump(space, version),
                    view_property: property.property.clone(),
                    name: property.name.clone(),
                    description: property.description.clone(),
                    connection: property.connection.as_ref().map(Connection::dump),
                    value_type: Some(property.value_type.dump(space, version)),
                    min_count: Some(property.min_count),
                    max_count: property
                        .max_count
                        .map(super::unverified::MaxCountWire::Number),
                    immutable: Some(property.immutable),
                    default: property.default.clone(),
                    container: property.container.as_ref().map(|c| c.dump(space, None)),
                    container_property: property.container_property.clone(),
                    index: if property.index.is_empty() {
                        None
                    } else {
                        Some(property.index.join(", "))
                    },
                    constraint: if property.constraint.is_empty() {
                        None
                    } else {
                        Some(property.constraint.join(", "))
                    },
                    neat_id: property.neat_id,
                })
                .collect(),
            enums: self
                .enums
                .iter()
                .map(|e| UnverifiedEnumValue {
                    collection: e.collection.clone(),
                    value: e.value.clone(),
                    name: e.name.clone(),
                    description: e.description.clone(),
                })
                .collect(),
            nodes: self
                .nodes
                .iter()
                .map(|n| UnverifiedNodeType {
                    node: n.node.dump(space, None),
                    usage: n.usage.clone(),
                })
                .collect(),
        }
    }

    /// Stamp deterministic neatIds on views, containers, and properties
    /// that do not already carry one.
    pub fn set_neat_ids(&mut self) {
        let model = self.metadata.model_id();
        for view in &mut self.views {
            if view.neat_id.is_none() {
                view.neat_id = Some(NeatId::mint(&model, "view", &view.view.to_string()));
            }
        }
        for container in &mut self.containers {
            if container.neat_id.is_none() {
                container.neat_id = Some(NeatId::mint(
                    &model,
                    "container",
                    &container.container.to_string(),
                ));
            }
        }
        for property in &mut self.properties {
            if property.neat_id.is_none() {
                let key = format!("{}.{}", property.view, property.property);
                property.neat_id = Some(NeatId::mint(&model, "property", &key));
            }
        }
    }

    pub fn view(&self, entity: &ViewEntity) -> Option<&PhysicalView> {
        self.views.iter().find(|v| &v.view == entity)
    }

    pub fn container(&self, entity: &ContainerEntity) -> Option<&PhysicalContainer> {
        self.containers.iter().find(|c| &c.container == entity)
    }

    /// Direct (non-inherited) properties of a view, in model order.
    pub fn properties_of(&self, entity: &ViewEntity) -> Vec<&PhysicalProperty> {
        self.properties
            .iter()
            .filter(|p| &p.view == entity)
            .collect()
    }

    /// All ancestors of a view reachable through `implements`, guarding
    /// against cycles.
    pub fn ancestors(&self, entity: &ViewEntity) -> Vec<&ViewEntity> {
        let mut seen: BTreeSet<&ViewEntity> = BTreeSet::new();
        let mut stack: Vec<&ViewEntity> = match self.view(entity) {
            Some(view) => view.implements.iter().collect(),
            None => Vec::new(),
        };
        let mut out = Vec::new();
        while let Some(parent) = stack.pop() {
            if parent == entity || !seen.insert(parent) {
                continue;
            }
            out.push(parent);
            if let Some(view) = self.view(parent) {
                stack.extend(view.implements.iter());
            }
        }
        out
    }

    /// Containers a view maps to through its own properties, sorted.
    pub fn containers_of(&self, entity: &ViewEntity) -> BTreeSet<&ContainerEntity> {
        self.properties_of(entity)
            .iter()
            .filter_map(|p| p.container.as_ref())
            .collect()
    }

    /// Containers a view maps to including inherited mappings, sorted.
    pub fn containers_of_with_inherited(&self, entity: &ViewEntity) -> BTreeSet<&ContainerEntity> {
        let mut out = self.containers_of(entity);
        for parent in self.ancestors(entity) {
            out.extend(self.containers_of(parent));
        }
        out
    }

    /// Properties grouped by container storage slot, with their row
    /// numbers, sorted by slot for deterministic iteration.
    pub fn properties_by_container_slot(
        &self,
    ) -> BTreeMap<(ContainerEntity, String), Vec<(usize, &PhysicalProperty)>> {
        let mut out: BTreeMap<(ContainerEntity, String), Vec<(usize, &PhysicalProperty)>> =
            BTreeMap::new();
        for (row, property) in self.properties.iter().enumerate() {
            if let Some((container, slot)) = property.container_slot() {
                out.entry((container.clone(), slot.to_string()))
                    .or_default()
                    .push((row, property));
            }
        }
        out
    }
}
