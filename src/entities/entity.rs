//! Entity identifier grammar
//!
//! An entity is `[prefix:]suffix[(key=value[, key=value...])]`. The
//! parenthesized arguments carry the version plus any kind-specific keys
//! (`property` for reverse connections, `type` for edges, and so on).
//! Equality and ordering are defined on the canonical string form so that
//! two entities compare equal exactly when they serialize identically.

use std::collections::BTreeMap;
use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Matches `prefix:suffix` or `prefix:suffix(args)`.
static PREFIXED_ENTITY_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<prefix>[a-zA-Z][a-zA-Z0-9_-]*):(?P<suffix>[^\s:()]+)(\((?P<args>[^)]*)\))?$")
        .unwrap()
});

/// Matches a bare `suffix` or `suffix(args)` without a prefix.
static BARE_ENTITY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<suffix>[^\s:()]+)(\((?P<args>[^)]*)\))?$").unwrap());

/// Error raised when a string does not match the entity grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EntityParseError {
    #[error("'{0}' does not match the entity grammar '[prefix:]suffix[(key=value, ...)]'")]
    InvalidFormat(String),
    #[error("entity argument '{0}' is not on the form 'key=value'")]
    InvalidArgument(String),
    #[error("entity string cannot be empty")]
    Empty,
}

/// Reference to a concept, view, container, or other named model resource.
///
/// Immutable once constructed. The `prefix` is `None` while the owning
/// namespace is still undetermined (an importer may only learn it once the
/// whole model is loaded); `load` fills it from the supplied default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Entity {
    prefix: Option<String>,
    suffix: String,
    version: Option<String>,
    /// Kind-specific arguments other than `version`, e.g. `property`,
    /// `type`, `direction`. Kept sorted for deterministic output.
    args: BTreeMap<String, String>,
}

impl Entity {
    /// Create an entity from explicit parts.
    pub fn new(prefix: Option<&str>, suffix: &str, version: Option<&str>) -> Self {
        Self {
            prefix: prefix.map(str::to_string),
            suffix: suffix.to_string(),
            version: version.map(str::to_string),
            args: BTreeMap::new(),
        }
    }

    /// Parse an entity string, falling back to `default_prefix` when the
    /// string carries no prefix of its own.
    pub fn load(raw: &str, default_prefix: Option<&str>) -> Result<Self, EntityParseError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(EntityParseError::Empty);
        }

        let (prefix, suffix, args_str) =
            if let Some(caps) = PREFIXED_ENTITY_REGEX.captures(raw) {
                (
                    Some(caps["prefix"].to_string()),
                    caps["suffix"].to_string(),
                    caps.name("args").map(|m| m.as_str().to_string()),
                )
            } else if let Some(caps) = BARE_ENTITY_REGEX.captures(raw) {
                (
                    default_prefix.map(str::to_string),
                    caps["suffix"].to_string(),
                    caps.name("args").map(|m| m.as_str().to_string()),
                )
            } else {
                return Err(EntityParseError::InvalidFormat(raw.to_string()));
            };

        let mut version = None;
        let mut args = BTreeMap::new();
        if let Some(args_str) = args_str {
            for pair in args_str.split(',') {
                let pair = pair.trim();
                if pair.is_empty() {
                    continue;
                }
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| EntityParseError::InvalidArgument(pair.to_string()))?;
                let (key, value) = (key.trim(), value.trim());
                if key == "version" {
                    version = Some(value.to_string());
                } else {
                    args.insert(key.to_string(), value.to_string());
                }
            }
        }

        Ok(Self {
            prefix,
            suffix,
            version,
            args,
        })
    }

    /// Serialize, omitting the prefix and version segments when they equal
    /// the supplied defaults. `load(dump(e, ctx), ctx) == e` for any
    /// context `ctx` in which `e` is expressible.
    pub fn dump(&self, default_prefix: Option<&str>, default_version: Option<&str>) -> String {
        let mut out = String::new();
        if let Some(prefix) = &self.prefix
            && default_prefix != Some(prefix.as_str())
        {
            out.push_str(prefix);
            out.push(':');
        }
        out.push_str(&self.suffix);

        let mut parts = Vec::new();
        if let Some(version) = &self.version
            && default_version != Some(version.as_str())
        {
            parts.push(format!("version={version}"));
        }
        for (key, value) in &self.args {
            parts.push(format!("{key}={value}"));
        }
        if !parts.is_empty() {
            out.push('(');
            out.push_str(&parts.join(", "));
            out.push(')');
        }
        out
    }

    /// Canonical string form: every segment explicit, no defaults applied.
    pub fn versioned_repr(&self) -> String {
        self.dump(None, None)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// Copy with an extra argument. Used for connection entities such as
    /// `reverse(property=...)`.
    pub fn with_arg(mut self, key: &str, value: &str) -> Self {
        self.args.insert(key.to_string(), value.to_string());
        self
    }

    /// Copy with the prefix replaced when currently undetermined.
    pub fn with_default_prefix(mut self, prefix: &str) -> Self {
        if self.prefix.is_none() {
            self.prefix = Some(prefix.to_string());
        }
        self
    }

    /// Copy with the version filled in when currently absent.
    pub fn with_default_version(mut self, version: &str) -> Self {
        if self.version.is_none() {
            self.version = Some(version.to_string());
        }
        self
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.versioned_repr())
    }
}

// Total order on the canonical string form, for deterministic output.
impl Ord for Entity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.versioned_repr().cmp(&other.versioned_repr())
    }
}

impl PartialOrd for Entity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl TryFrom<String> for Entity {
    type Error = EntityParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Entity::load(&value, None)
    }
}

impl From<Entity> for String {
    fn from(entity: Entity) -> Self {
        entity.versioned_repr()
    }
}

macro_rules! entity_newtype {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub Entity);

        impl $name {
            pub fn new(prefix: Option<&str>, suffix: &str, version: Option<&str>) -> Self {
                Self(Entity::new(prefix, suffix, version))
            }

            pub fn load(raw: &str, default_prefix: Option<&str>) -> Result<Self, EntityParseError> {
                Entity::load(raw, default_prefix).map(Self)
            }

            pub fn dump(&self, default_prefix: Option<&str>, default_version: Option<&str>) -> String {
                self.0.dump(default_prefix, default_version)
            }

            pub fn suffix(&self) -> &str {
                self.0.suffix()
            }

            pub fn prefix(&self) -> Option<&str> {
                self.0.prefix()
            }

            pub fn version(&self) -> Option<&str> {
                self.0.version()
            }

            pub fn as_entity(&self) -> &Entity {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_newtype!(
    /// Reference to a conceptual class.
    ConceptEntity
);
entity_newtype!(
    /// Reference to a physical view.
    ViewEntity
);
entity_newtype!(
    /// Reference to a physical container.
    ContainerEntity
);

impl ConceptEntity {
    /// The paired view reference with the same identifier parts.
    pub fn to_view(&self) -> ViewEntity {
        ViewEntity(self.0.clone())
    }

    /// The backing container reference: same space and suffix, no version
    /// (containers are not versioned).
    pub fn to_container(&self) -> ContainerEntity {
        ContainerEntity(Entity::new(self.0.prefix(), self.0.suffix(), None))
    }
}

impl ViewEntity {
    pub fn to_concept(&self) -> ConceptEntity {
        ConceptEntity(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_bare_suffix_uses_default_prefix() {
        let entity = Entity::load("GeneratingUnit", Some("power")).unwrap();
        assert_eq!(entity.prefix(), Some("power"));
        assert_eq!(entity.suffix(), "GeneratingUnit");
        assert_eq!(entity.version(), None);
    }

    #[test]
    fn test_load_prefixed_versioned() {
        let entity = Entity::load("power:GeneratingUnit(version=v1)", None).unwrap();
        assert_eq!(entity.prefix(), Some("power"));
        assert_eq!(entity.suffix(), "GeneratingUnit");
        assert_eq!(entity.version(), Some("v1"));
    }

    #[test]
    fn test_load_extra_args() {
        let entity = Entity::load("power:reverse(property=units, version=v1)", None).unwrap();
        assert_eq!(entity.arg("property"), Some("units"));
        assert_eq!(entity.version(), Some("v1"));
    }

    #[test]
    fn test_dump_omits_defaults() {
        let entity = Entity::new(Some("power"), "GeneratingUnit", Some("v1"));
        assert_eq!(entity.dump(Some("power"), Some("v1")), "GeneratingUnit");
        assert_eq!(
            entity.dump(Some("other"), Some("v1")),
            "power:GeneratingUnit"
        );
        assert_eq!(
            entity.dump(None, None),
            "power:GeneratingUnit(version=v1)"
        );
    }

    #[test]
    fn test_round_trip_law() {
        for raw in [
            "GeneratingUnit",
            "power:GeneratingUnit",
            "power:GeneratingUnit(version=v1)",
            "power:connection(property=units, version=v1)",
        ] {
            let entity = Entity::load(raw, None).unwrap();
            let dumped = entity.dump(None, None);
            let reloaded = Entity::load(&dumped, None).unwrap();
            assert_eq!(entity, reloaded, "round trip failed for '{raw}'");
        }
    }

    #[test]
    fn test_equality_is_canonical_string_equality() {
        let a = Entity::load("power:Unit(version=v1)", None).unwrap();
        let b = Entity::load("Unit(version=v1)", Some("power")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.versioned_repr(), b.versioned_repr());
    }

    #[test]
    fn test_ordering_is_deterministic() {
        let mut entities = vec![
            Entity::new(Some("b"), "X", None),
            Entity::new(Some("a"), "Y", None),
            Entity::new(Some("a"), "X", Some("v2")),
        ];
        entities.sort();
        let reprs: Vec<_> = entities.iter().map(Entity::versioned_repr).collect();
        assert_eq!(reprs, vec!["a:X(version=v2)", "a:Y", "b:X"]);
    }

    #[test]
    fn test_invalid_strings_rejected() {
        assert!(Entity::load("", None).is_err());
        assert!(Entity::load("a b", None).is_err());
        assert!(Entity::load("pre:fix:suffix", None).is_err());
        assert!(Entity::load("Unit(version)", None).is_err());
    }
}
