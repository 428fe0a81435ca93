//! Model metadata and stable internal identifiers

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable synthetic identifier minted per concept, property, view, and
/// container. Lets the conceptual and physical representations of the same
/// modeling concept reference each other without object pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NeatId(Uuid);

impl NeatId {
    /// Mint a deterministic id from the owning model and a resource key.
    /// The same key always yields the same id, so re-loading a model does
    /// not invalidate cross-model links.
    pub fn mint(model: &str, kind: &str, key: &str) -> Self {
        let seed = format!("neat:{model}:{kind}:{key}");
        Self(Uuid::new_v5(&Uuid::NAMESPACE_URL, seed.as_bytes()))
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for NeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How much of the modeled domain the model claims to cover. Partial
/// models legitimately reference concepts they do not define.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaCompleteness {
    Complete,
    #[default]
    Partial,
    Extended,
}

impl SchemaCompleteness {
    pub fn is_complete(&self) -> bool {
        matches!(self, SchemaCompleteness::Complete)
    }
}

/// Metadata of a conceptual data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConceptualMetadata {
    /// Namespace prefix owning the model's own concepts.
    pub prefix: String,
    pub external_id: String,
    pub version: String,
    #[serde(default)]
    pub schema_completeness: SchemaCompleteness,
    #[serde(default)]
    pub creator: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Paired physical model, once synced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical: Option<NeatId>,
}

impl ConceptualMetadata {
    pub fn new(prefix: &str, external_id: &str, version: &str) -> Self {
        let now = Utc::now();
        Self {
            prefix: prefix.to_string(),
            external_id: external_id.to_string(),
            version: version.to_string(),
            schema_completeness: SchemaCompleteness::default(),
            creator: Vec::new(),
            name: None,
            description: None,
            created: now,
            updated: now,
            physical: None,
        }
    }

    /// Identity of the model itself, used as the namespace for minting
    /// resource neatIds.
    pub fn model_id(&self) -> String {
        format!("{}:{}(version={})", self.prefix, self.external_id, self.version)
    }

    pub fn neat_id(&self) -> NeatId {
        NeatId::mint(&self.model_id(), "conceptual", &self.external_id)
    }
}

/// Metadata of a physical data model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicalMetadata {
    /// Space holding the model's own views and containers.
    pub space: String,
    pub external_id: String,
    pub version: String,
    #[serde(default)]
    pub creator: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    /// Paired conceptual model, once synced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conceptual: Option<NeatId>,
}

impl PhysicalMetadata {
    pub fn new(space: &str, external_id: &str, version: &str) -> Self {
        let now = Utc::now();
        Self {
            space: space.to_string(),
            external_id: external_id.to_string(),
            version: version.to_string(),
            creator: Vec::new(),
            name: None,
            description: None,
            created: now,
            updated: now,
            conceptual: None,
        }
    }

    pub fn model_id(&self) -> String {
        format!("{}:{}(version={})", self.space, self.external_id, self.version)
    }

    pub fn neat_id(&self) -> NeatId {
        NeatId::mint(&self.model_id(), "physical", &self.external_id)
    }
}
