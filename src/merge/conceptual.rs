//! Conceptual model merge and union

use std::collections::BTreeSet;

use tracing::debug;

use crate::entities::ConceptEntity;
use crate::models::{Concept, ConceptualDataModel, ConceptualProperty};

use super::{
    combine_lists, pick_scalar, widen_max_count, ConflictResolution, Join, MergeOptions,
};

/// Merge two conceptual models under the given policies.
pub fn merge_conceptual(
    primary: &ConceptualDataModel,
    secondary: &ConceptualDataModel,
    options: &MergeOptions,
) -> ConceptualDataModel {
    let (lead, _) = options.prioritize(primary, secondary);
    let mut out = ConceptualDataModel {
        metadata: lead.metadata.clone(),
        concepts: Vec::new(),
        properties: Vec::new(),
        prefixes: Default::default(),
    };

    out.concepts = merge_keyed(
        &primary.concepts,
        &secondary.concepts,
        options.join,
        |concept| concept.concept.clone(),
        |a, b| merge_concept(a, b, options),
    );
    let surviving: BTreeSet<&ConceptEntity> = out.concepts.iter().map(|c| &c.concept).collect();

    out.properties = merge_keyed(
        &primary.properties,
        &secondary.properties,
        options.join,
        |property| (property.concept.clone(), property.property.clone()),
        |a, b| merge_property(a, b, options),
    );
    out.properties.retain(|p| surviving.contains(&p.concept));

    // Priority side inserted last so its binding wins a prefix conflict.
    let (lead_prefixes, other_prefixes) = options.prioritize(&primary.prefixes, &secondary.prefixes);
    for (prefix, namespace) in other_prefixes.iter().chain(lead_prefixes) {
        out.prefixes.insert(prefix.clone(), namespace.clone());
    }

    debug!(
        primary = %primary.metadata.model_id(),
        secondary = %secondary.metadata.model_id(),
        concepts = out.concepts.len(),
        properties = out.properties.len(),
        "merged conceptual data models"
    );
    out
}

/// Union variant: all of the primary, plus the secondary's concepts, but
/// secondary properties only where the primary already defines the owning
/// concept. One overlapping property cannot pull in an unrelated subgraph.
pub fn union_conceptual(
    primary: &ConceptualDataModel,
    secondary: &ConceptualDataModel,
) -> ConceptualDataModel {
    let options = MergeOptions::default();
    let mut out = merge_conceptual(primary, secondary, &options);
    let primary_concepts: BTreeSet<&ConceptEntity> =
        primary.concepts.iter().map(|c| &c.concept).collect();
    let primary_properties: BTreeSet<(&ConceptEntity, &str)> = primary
        .properties
        .iter()
        .map(|p| (&p.concept, p.property.as_str()))
        .collect();
    out.properties.retain(|p| {
        primary_properties.contains(&(&p.concept, p.property.as_str()))
            || primary_concepts.contains(&p.concept)
    });
    out
}

fn merge_concept(primary: &Concept, secondary: &Concept, options: &MergeOptions) -> Concept {
    let (first, second) = options.prioritize(primary, secondary);
    let mut out = Concept::new(first.concept.clone());
    out.name = pick_scalar(options, &primary.name, &secondary.name);
    out.description = pick_scalar(options, &primary.description, &secondary.description);
    out.instance_source = pick_scalar(options, &primary.instance_source, &secondary.instance_source);
    out.neat_id = first.neat_id.or(second.neat_id);
    out.implements = match options.conflict_resolution {
        ConflictResolution::Priority => first.implements.clone(),
        ConflictResolution::Combined => {
            combine_lists(options, &primary.implements, &secondary.implements)
        }
    };
    out
}

fn merge_property(
    primary: &ConceptualProperty,
    secondary: &ConceptualProperty,
    options: &MergeOptions,
) -> ConceptualProperty {
    let (first, second) = options.prioritize(primary, secondary);
    let mut out = first.clone();
    out.name = pick_scalar(options, &primary.name, &secondary.name);
    out.description = pick_scalar(options, &primary.description, &secondary.description);
    out.default = pick_scalar(options, &primary.default, &secondary.default);
    out.neat_id = first.neat_id.or(second.neat_id);
    match options.conflict_resolution {
        ConflictResolution::Priority => {}
        ConflictResolution::Combined => {
            out.value_type = first.value_type.clone().merge(second.value_type.clone());
            out.min_count = primary.min_count.min(secondary.min_count);
            out.max_count = widen_max_count(primary.max_count, secondary.max_count);
            out.instance_source =
                combine_lists(options, &primary.instance_source, &secondary.instance_source);
        }
    }
    out
}

/// Apply a pairwise merge over two keyed lists. Keys present on both sides
/// are merged; keys on one side survive according to the join policy.
/// Output order: primary order first, then secondary-only keys in order.
pub(crate) fn merge_keyed<T: Clone, K: Ord>(
    primary: &[T],
    secondary: &[T],
    join: Join,
    key: impl Fn(&T) -> K,
    merge: impl Fn(&T, &T) -> T,
) -> Vec<T> {
    let primary_keys: BTreeSet<K> = primary.iter().map(&key).collect();

    let mut out = Vec::new();
    for item in primary {
        let k = key(item);
        if let Some(other) = secondary.iter().find(|s| key(*s) == k) {
            out.push(merge(item, other));
        } else if matches!(join, Join::Primary | Join::Combined) {
            out.push(item.clone());
        }
    }
    for item in secondary {
        if !primary_keys.contains(&key(item))
            && matches!(join, Join::Secondary | Join::Combined)
        {
            out.push(item.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{DataType, ValueType};
    use crate::models::unverified::UnverifiedConceptualModel;
    use crate::merge::Priority;

    fn load(yaml: &str) -> ConceptualDataModel {
        ConceptualDataModel::load(UnverifiedConceptualModel::from_yaml(yaml).unwrap()).unwrap()
    }

    fn primary() -> ConceptualDataModel {
        load(
            r#"
Metadata: {prefix: power, externalId: Primary, version: v1}
Concepts:
  - Concept: PrimaryClass
    Name: primary class
  - Concept: Shared
Properties:
  - {Concept: PrimaryClass, Property: name, Value Type: text, Max Count: 1}
  - {Concept: Shared, Property: capacity, Value Type: float64, Min Count: 1, Max Count: 1}
"#,
        )
    }

    fn secondary() -> ConceptualDataModel {
        load(
            r#"
Metadata: {prefix: power, externalId: Secondary, version: v1}
Concepts:
  - Concept: SecondaryClass
  - Concept: Shared
    Name: shared class
Properties:
  - {Concept: SecondaryClass, Property: code, Value Type: text, Max Count: 1}
  - {Concept: Shared, Property: capacity, Value Type: float32, Min Count: 0, Max Count: 3}
"#,
        )
    }

    #[test]
    fn test_combined_join_keeps_both_sides() {
        let merged = merge_conceptual(&primary(), &secondary(), &MergeOptions::default());
        let suffixes: Vec<_> = merged.concepts.iter().map(|c| c.concept.suffix()).collect();
        assert_eq!(suffixes, vec!["PrimaryClass", "Shared", "SecondaryClass"]);
        assert_eq!(merged.properties.len(), 3);
    }

    #[test]
    fn test_primary_join_drops_secondary_only_concepts() {
        let options = MergeOptions {
            join: Join::Primary,
            ..MergeOptions::default()
        };
        let merged = merge_conceptual(&primary(), &secondary(), &options);
        assert!(merged
            .concepts
            .iter()
            .all(|c| c.concept.suffix() != "SecondaryClass"));
        assert!(merged
            .properties
            .iter()
            .all(|p| p.concept.suffix() != "SecondaryClass"));
    }

    #[test]
    fn test_widening_law() {
        let merged = merge_conceptual(&primary(), &secondary(), &MergeOptions::default());
        let capacity = merged
            .properties
            .iter()
            .find(|p| p.property == "capacity")
            .unwrap();
        assert_eq!(capacity.min_count, 0);
        assert_eq!(capacity.max_count, Some(3));
        match &capacity.value_type {
            ValueType::Multi(info) => assert_eq!(info.types().len(), 2),
            other => panic!("expected multi, got {other:?}"),
        }
    }

    #[test]
    fn test_priority_law() {
        let options = MergeOptions {
            conflict_resolution: ConflictResolution::Priority,
            priority: Priority::Primary,
            ..MergeOptions::default()
        };
        let merged = merge_conceptual(&primary(), &secondary(), &options);
        let capacity = merged
            .properties
            .iter()
            .find(|p| p.property == "capacity")
            .unwrap();
        assert_eq!(capacity.value_type, ValueType::Data(DataType::Float64));
        assert_eq!(capacity.min_count, 1);
        assert_eq!(capacity.max_count, Some(1));
    }

    #[test]
    fn test_scalar_priority_falls_back_when_absent() {
        let merged = merge_conceptual(&primary(), &secondary(), &MergeOptions::default());
        let shared = merged
            .concepts
            .iter()
            .find(|c| c.concept.suffix() == "Shared")
            .unwrap();
        // Primary has no name for Shared; the secondary's fills in.
        assert_eq!(shared.name.as_deref(), Some("shared class"));
    }

    #[test]
    fn test_union_restricts_secondary_properties_to_primary_concepts() {
        let unioned = union_conceptual(&primary(), &secondary());
        // SecondaryClass itself joins the union...
        assert!(unioned
            .concepts
            .iter()
            .any(|c| c.concept.suffix() == "SecondaryClass"));
        // ...its property does not, since the primary never defined it.
        assert!(unioned
            .properties
            .iter()
            .all(|p| p.property != "code"));
        // The shared concept's property is merged as usual.
        assert!(unioned.properties.iter().any(|p| p.property == "capacity"));
    }

    #[test]
    fn test_prefix_conflict_follows_priority() {
        let a = load(
            r#"
Metadata: {prefix: power, externalId: Primary, version: v1}
Concepts:
  - Concept: A
Prefixes: {ex: "http://primary.example.org/"}
"#,
        );
        let b = load(
            r#"
Metadata: {prefix: power, externalId: Secondary, version: v1}
Concepts:
  - Concept: B
Prefixes: {ex: "http://secondary.example.org/", other: "http://other.example.org/"}
"#,
        );

        let merged = merge_conceptual(&a, &b, &MergeOptions::default());
        assert_eq!(merged.prefixes["ex"], "http://primary.example.org/");
        assert_eq!(merged.prefixes.len(), 2);

        let options = MergeOptions {
            priority: Priority::Secondary,
            ..MergeOptions::default()
        };
        let merged = merge_conceptual(&a, &b, &options);
        assert_eq!(merged.prefixes["ex"], "http://secondary.example.org/");
    }

    #[test]
    fn test_merge_does_not_mutate_inputs() {
        let a = primary();
        let b = secondary();
        let (a_before, b_before) = (a.clone(), b.clone());
        let _ = merge_conceptual(&a, &b, &MergeOptions::default());
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }
}
