//! Conceptual ⇄ physical conversion
//!
//! Both directions build a fresh output model; the input is cloned, never
//! mutated. Conversion is permissive about schema consistency: conflicts it
//! may introduce (two concepts writing the same container slot differently)
//! are left for physical validation to report, which keeps the converter a
//! pure shape transform.

pub mod to_conceptual;
pub mod to_physical;

pub use to_conceptual::to_conceptual;
pub use to_physical::to_physical;

use crate::validation::Issue;

/// What to do with a property whose value type is a union of several
/// candidates. A physical property holds exactly one value type, so a
/// multi-value property cannot be represented faithfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MultiValueMode {
    /// Fail the conversion. The default: silently narrowing a union would
    /// lie about the schema shape.
    #[default]
    Reject,
    /// Drop the property and record a warning.
    DropWithWarning,
}

/// What to do with a property whose value type is unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownMode {
    /// Convert with the unknown placeholder value type. The default: the
    /// placeholder round-trips back to unknown on the inverse transform.
    #[default]
    Placeholder,
    /// Drop the property and record a warning.
    Drop,
}

/// Knobs for the conceptual→physical converter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    pub multi_value: MultiValueMode,
    pub unknown: UnknownMode,
    /// Object properties with `max_count` at or below this limit become
    /// direct relations; above it (or unbounded) they become edges.
    pub direct_relation_limit: u32,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            multi_value: MultiValueMode::default(),
            unknown: UnknownMode::default(),
            direct_relation_limit: 1,
        }
    }
}

/// A converted model together with the warnings recorded along the way.
#[derive(Debug, Clone)]
pub struct ConversionOutcome<M> {
    pub model: M,
    pub warnings: Vec<Issue>,
}

/// Errors from the conceptual→physical converter.
///
/// Schema inconsistency is not an error here; only inputs violating the
/// invariants conceptual validation establishes (or an explicit rejection
/// the caller opted into) fail the conversion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error(
        "property '{property}' of concept '{concept}' has multi-value type '{value_type}' \
         which cannot become a single physical value type"
    )]
    MultiValueType {
        concept: String,
        property: String,
        value_type: String,
    },
    #[error("property '{property}' references concept '{concept}' which is not defined in the model")]
    UndefinedConcept { concept: String, property: String },
}
