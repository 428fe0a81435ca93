//! Primitive value types
//!
//! A closed set of primitive kinds, each carrying its canonical name plus
//! the equivalent names used by the exporters (DMS container property
//! types, XSD datatypes). Parsing is case-insensitive and accepts the
//! aliases the importers produce.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primitive property value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum DataType {
    Boolean,
    Integer,
    Long,
    Float32,
    Float64,
    Text,
    Timestamp,
    Date,
    Json,
    File,
    Timeseries,
    Sequence,
}

impl DataType {
    /// All kinds, in canonical order.
    pub const ALL: [DataType; 12] = [
        DataType::Boolean,
        DataType::Integer,
        DataType::Long,
        DataType::Float32,
        DataType::Float64,
        DataType::Text,
        DataType::Timestamp,
        DataType::Date,
        DataType::Json,
        DataType::File,
        DataType::Timeseries,
        DataType::Sequence,
    ];

    /// Canonical name used in model dumps.
    pub fn name(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Long => "long",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Text => "text",
            DataType::Timestamp => "timestamp",
            DataType::Date => "date",
            DataType::Json => "json",
            DataType::File => "file",
            DataType::Timeseries => "timeseries",
            DataType::Sequence => "sequence",
        }
    }

    /// DMS container property type name.
    pub fn dms_name(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Integer => "int32",
            DataType::Long => "int64",
            DataType::Float32 => "float32",
            DataType::Float64 => "float64",
            DataType::Text => "text",
            DataType::Timestamp => "timestamp",
            DataType::Date => "date",
            DataType::Json => "json",
            DataType::File => "file",
            DataType::Timeseries => "timeseries",
            DataType::Sequence => "sequence",
        }
    }

    /// XSD datatype name, for the ontology-facing exporters.
    pub fn xsd_name(&self) -> &'static str {
        match self {
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Long => "long",
            DataType::Float32 => "float",
            DataType::Float64 => "double",
            DataType::Text => "string",
            DataType::Timestamp => "dateTime",
            DataType::Date => "date",
            DataType::Json => "string",
            DataType::File => "anyURI",
            DataType::Timeseries => "anyURI",
            DataType::Sequence => "anyURI",
        }
    }

    /// Parse a type name, accepting importer aliases.
    pub fn parse(raw: &str) -> Option<DataType> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Some(DataType::Boolean),
            "integer" | "int" | "int32" => Some(DataType::Integer),
            "long" | "int64" => Some(DataType::Long),
            "float32" | "float" => Some(DataType::Float32),
            "float64" | "double" => Some(DataType::Float64),
            "text" | "string" | "langstring" | "token" => Some(DataType::Text),
            "timestamp" | "datetime" | "datetimestamp" => Some(DataType::Timestamp),
            "date" => Some(DataType::Date),
            "json" => Some(DataType::Json),
            "file" => Some(DataType::File),
            "timeseries" => Some(DataType::Timeseries),
            "sequence" => Some(DataType::Sequence),
            _ => None,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TryFrom<String> for DataType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DataType::parse(&value).ok_or_else(|| format!("unknown data type '{value}'"))
    }
}

impl From<DataType> for String {
    fn from(data_type: DataType) -> Self {
        data_type.name().to_string()
    }
}
