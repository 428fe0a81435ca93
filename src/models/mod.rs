//! Verified data models and their wire-format input shapes
//!
//! External importers (spreadsheets, ontologies, schema services) produce
//! the loosely-typed "unverified" structures in [`unverified`]; the
//! verified models here are built from those by normalizing every entity
//! reference against the model's own prefix and version. Transformers
//! never mutate a verified model in place.

pub mod conceptual;
pub mod metadata;
pub mod physical;
pub mod unverified;

pub use conceptual::{Concept, ConceptualDataModel, ConceptualProperty, ModelPairing};
pub use metadata::{ConceptualMetadata, NeatId, PhysicalMetadata, SchemaCompleteness};
pub use physical::{
    Connection, PhysicalContainer, PhysicalDataModel, PhysicalEnum, PhysicalNodeType,
    PhysicalProperty, PhysicalView, ViewFilter,
};
pub use unverified::{LoadError, UnverifiedConceptualModel, UnverifiedPhysicalModel};
