//! NEAT core - conceptual and physical data model engine
//!
//! Provides the in-memory model layer and transformations:
//! - Entity grammar and value types (parse/serialize round-trip)
//! - Conceptual and physical data models (load/dump/neatId pairing)
//! - Cross-field validation for both model kinds
//! - Conceptual ⇄ physical conversion
//! - Merge/union of same-kind models with conflict-resolution policies
//! - DMS schema bundle export (YAML file map, optional zip archive)
//!
//! Importers that parse external formats and the layers that upload or
//! present results are external collaborators; they produce and consume the
//! unverified model shapes in [`models::unverified`].

pub mod convert;
pub mod entities;
pub mod export;
pub mod merge;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use entities::{
    ConceptEntity, ContainerEntity, DataType, Entity, EntityParseError, MultiValueTypeInfo,
    ValueType, ViewEntity,
};
pub use models::{
    Concept, ConceptualDataModel, ConceptualMetadata, ConceptualProperty, LoadError, NeatId,
    PhysicalContainer, PhysicalDataModel, PhysicalMetadata, PhysicalProperty, PhysicalView,
    SchemaCompleteness, UnverifiedConceptualModel, UnverifiedPhysicalModel,
};
pub use validation::{
    ConceptualValidator, Issue, IssueCode, MultiValidationError, PhysicalValidator, Severity,
    ValidationReport,
};
pub use convert::{
    to_conceptual, to_physical, ConversionError, ConversionOptions, ConversionOutcome,
    MultiValueMode, UnknownMode,
};
pub use merge::{
    merge_conceptual, merge_physical, union_conceptual, ConflictResolution, Join, MergeOptions,
    Priority,
};
pub use export::{DmsSchemaBundle, ExportError};
