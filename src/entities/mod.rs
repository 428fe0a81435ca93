//! Entity references and value types
//!
//! Entities are the leaf identifiers of both model layers: a prefix
//! (namespace or space), a local suffix, and an optional version, with a
//! compact string grammar `[prefix:]suffix[(key=value, ...)]` that every
//! importer and exporter round-trips through.

pub mod data_type;
pub mod entity;
pub mod value_type;

pub use data_type::DataType;
pub use entity::{ConceptEntity, ContainerEntity, Entity, EntityParseError, ViewEntity};
pub use value_type::{MultiValueTypeInfo, ValueType, ValueTypeAtom};
