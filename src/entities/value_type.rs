//! Property value types
//!
//! A property's value type is a tagged union: a primitive data type, a
//! reference to a concept (object property), an ordered union of several
//! candidates when a single type could not be resolved, or the unknown
//! sentinel. Conversion code matches exhaustively on the tag.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::data_type::DataType;
use super::entity::{ConceptEntity, EntityParseError};

/// Wire form of the unknown value type.
pub const UNKNOWN_REPR: &str = "#N/A";

/// Separator between alternatives in a multi-value type string.
const MULTI_SEPARATOR: &str = "|";

/// One alternative inside a multi-value type. Unknown and nested unions
/// are not representable here on purpose.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ValueTypeAtom {
    Data(DataType),
    Concept(ConceptEntity),
}

impl ValueTypeAtom {
    pub fn dump(&self, default_prefix: Option<&str>, default_version: Option<&str>) -> String {
        match self {
            ValueTypeAtom::Data(data_type) => data_type.name().to_string(),
            ValueTypeAtom::Concept(concept) => concept.dump(default_prefix, default_version),
        }
    }
}

/// Ordered, deduplicated union of value types.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct MultiValueTypeInfo {
    types: Vec<ValueTypeAtom>,
}

impl MultiValueTypeInfo {
    pub fn new(types: impl IntoIterator<Item = ValueTypeAtom>) -> Self {
        let mut info = Self::default();
        for atom in types {
            info.push(atom);
        }
        info
    }

    /// Append an alternative, keeping first-seen order and dropping
    /// duplicates.
    pub fn push(&mut self, atom: ValueTypeAtom) {
        if !self.types.contains(&atom) {
            self.types.push(atom);
        }
    }

    pub fn types(&self) -> &[ValueTypeAtom] {
        &self.types
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Union with another multi-value type, preserving first-seen order.
    pub fn merge(mut self, other: MultiValueTypeInfo) -> MultiValueTypeInfo {
        for atom in other.types {
            self.push(atom);
        }
        self
    }

    pub fn dump(&self, default_prefix: Option<&str>, default_version: Option<&str>) -> String {
        self.types
            .iter()
            .map(|atom| atom.dump(default_prefix, default_version))
            .collect::<Vec<_>>()
            .join(MULTI_SEPARATOR)
    }
}

/// The value type of a conceptual or physical property.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueType {
    /// Primitive data property.
    Data(DataType),
    /// Object property pointing at another concept.
    Concept(ConceptEntity),
    /// Union of several candidate types.
    Multi(MultiValueTypeInfo),
    /// Could not be determined.
    Unknown,
}

impl ValueType {
    /// Parse a value type string. Primitive names win over concept
    /// references; `#N/A` is the unknown sentinel; `|`-separated lists
    /// become multi-value types.
    pub fn load(raw: &str, default_prefix: Option<&str>) -> Result<ValueType, EntityParseError> {
        let raw = raw.trim();
        if raw.is_empty() || raw == UNKNOWN_REPR {
            return Ok(ValueType::Unknown);
        }
        if raw.contains(MULTI_SEPARATOR) {
            let mut info = MultiValueTypeInfo::default();
            for part in raw.split(MULTI_SEPARATOR) {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let atom = match DataType::parse(part) {
                    Some(data_type) => ValueTypeAtom::Data(data_type),
                    None => ValueTypeAtom::Concept(ConceptEntity::load(part, default_prefix)?),
                };
                info.push(atom);
            }
            return Ok(ValueType::Multi(info));
        }
        if let Some(data_type) = DataType::parse(raw) {
            return Ok(ValueType::Data(data_type));
        }
        Ok(ValueType::Concept(ConceptEntity::load(
            raw,
            default_prefix,
        )?))
    }

    pub fn dump(&self, default_prefix: Option<&str>, default_version: Option<&str>) -> String {
        match self {
            ValueType::Data(data_type) => data_type.name().to_string(),
            ValueType::Concept(concept) => concept.dump(default_prefix, default_version),
            ValueType::Multi(info) => info.dump(default_prefix, default_version),
            ValueType::Unknown => UNKNOWN_REPR.to_string(),
        }
    }

    /// Whether this is an object property type (points at concepts).
    pub fn is_object(&self) -> bool {
        match self {
            ValueType::Concept(_) | ValueType::Unknown => true,
            ValueType::Multi(info) => info
                .types()
                .iter()
                .any(|atom| matches!(atom, ValueTypeAtom::Concept(_))),
            ValueType::Data(_) => false,
        }
    }

    /// All concept references inside this type.
    pub fn referenced_concepts(&self) -> Vec<&ConceptEntity> {
        match self {
            ValueType::Concept(concept) => vec![concept],
            ValueType::Multi(info) => info
                .types()
                .iter()
                .filter_map(|atom| match atom {
                    ValueTypeAtom::Concept(concept) => Some(concept),
                    ValueTypeAtom::Data(_) => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Union of two value types, used by the combined merge policy.
    /// Unknown never wins over a determined type.
    pub fn merge(self, other: ValueType) -> ValueType {
        if self == other {
            return self;
        }
        match (self, other) {
            (ValueType::Unknown, other) | (other, ValueType::Unknown) => other,
            (ValueType::Multi(a), ValueType::Multi(b)) => ValueType::Multi(a.merge(b)),
            (ValueType::Multi(mut info), single) | (single, ValueType::Multi(mut info))
                if matches!(single, ValueType::Data(_) | ValueType::Concept(_)) =>
            {
                match single {
                    ValueType::Data(data_type) => info.push(ValueTypeAtom::Data(data_type)),
                    ValueType::Concept(concept) => info.push(ValueTypeAtom::Concept(concept)),
                    _ => unreachable!(),
                }
                ValueType::Multi(info)
            }
            (a, b) => {
                let mut info = MultiValueTypeInfo::default();
                for side in [a, b] {
                    match side {
                        ValueType::Data(data_type) => info.push(ValueTypeAtom::Data(data_type)),
                        ValueType::Concept(concept) => info.push(ValueTypeAtom::Concept(concept)),
                        ValueType::Multi(other) => info = info.merge(other),
                        ValueType::Unknown => {}
                    }
                }
                ValueType::Multi(info)
            }
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dump(None, None))
    }
}

impl From<DataType> for ValueType {
    fn from(data_type: DataType) -> Self {
        ValueType::Data(data_type)
    }
}

impl From<ConceptEntity> for ValueType {
    fn from(concept: ConceptEntity) -> Self {
        ValueType::Concept(concept)
    }
}
