//! Physical model merge
//!
//! Same policy surface as the conceptual merge. A physical value type has
//! no union form, so a type conflict under the combined policy falls back
//! to the priority side (the unknown placeholder never wins); the resulting
//! inconsistency, if any, is physical validation's to report.

use std::collections::BTreeSet;

use tracing::debug;

use crate::models::physical::{
    PhysicalContainer, PhysicalDataModel, PhysicalProperty, PhysicalValueType, PhysicalView,
};

use super::conceptual::merge_keyed;
use super::{combine_lists, pick_scalar, widen_max_count, ConflictResolution, MergeOptions};

/// Merge two physical models under the given policies.
pub fn merge_physical(
    primary: &PhysicalDataModel,
    secondary: &PhysicalDataModel,
    options: &MergeOptions,
) -> PhysicalDataModel {
    let (lead, _) = options.prioritize(primary, secondary);
    let mut out = PhysicalDataModel::new(lead.metadata.clone());

    out.views = merge_keyed(
        &primary.views,
        &secondary.views,
        options.join,
        |view| view.view.clone(),
        |a, b| merge_view(a, b, options),
    );
    let surviving: BTreeSet<_> = out.views.iter().map(|v| v.view.clone()).collect();

    out.containers = merge_keyed(
        &primary.containers,
        &secondary.containers,
        options.join,
        |container| container.container.clone(),
        |a, b| merge_container(a, b, options),
    );

    out.properties = merge_keyed(
        &primary.properties,
        &secondary.properties,
        options.join,
        |property| (property.view.clone(), property.property.clone()),
        |a, b| merge_property(a, b, options),
    );
    out.properties.retain(|p| surviving.contains(&p.view));

    out.enums = merge_keyed(
        &primary.enums,
        &secondary.enums,
        options.join,
        |e| (e.collection.clone(), e.value.clone()),
        |a, _| a.clone(),
    );
    out.nodes = merge_keyed(
        &primary.nodes,
        &secondary.nodes,
        options.join,
        |n| n.node.clone(),
        |a, _| a.clone(),
    );
    out.track_imports();

    debug!(
        primary = %primary.metadata.model_id(),
        secondary = %secondary.metadata.model_id(),
        views = out.views.len(),
        containers = out.containers.len(),
        properties = out.properties.len(),
        "merged physical data models"
    );
    out
}

fn merge_view(primary: &PhysicalView, secondary: &PhysicalView, options: &MergeOptions) -> PhysicalView {
    let (first, second) = options.prioritize(primary, secondary);
    let mut out = first.clone();
    out.name = pick_scalar(options, &primary.name, &secondary.name);
    out.description = pick_scalar(options, &primary.description, &secondary.description);
    out.neat_id = first.neat_id.or(second.neat_id);
    if options.conflict_resolution == ConflictResolution::Combined {
        out.implements = combine_lists(options, &primary.implements, &secondary.implements);
    }
    out
}

fn merge_container(
    primary: &PhysicalContainer,
    secondary: &PhysicalContainer,
    options: &MergeOptions,
) -> PhysicalContainer {
    let (first, second) = options.prioritize(primary, secondary);
    let mut out = first.clone();
    out.name = pick_scalar(options, &primary.name, &secondary.name);
    out.description = pick_scalar(options, &primary.description, &secondary.description);
    out.neat_id = first.neat_id.or(second.neat_id);
    if options.conflict_resolution == ConflictResolution::Combined {
        out.constraint = combine_lists(options, &primary.constraint, &secondary.constraint);
    }
    out
}

fn merge_property(
    primary: &PhysicalProperty,
    secondary: &PhysicalProperty,
    options: &MergeOptions,
) -> PhysicalProperty {
    let (first, second) = options.prioritize(primary, secondary);
    let mut out = first.clone();
    out.name = pick_scalar(options, &primary.name, &secondary.name);
    out.description = pick_scalar(options, &primary.description, &secondary.description);
    out.default = pick_scalar(options, &primary.default, &secondary.default);
    out.neat_id = first.neat_id.or(second.neat_id);
    if out.value_type == PhysicalValueType::Unknown
        && second.value_type != PhysicalValueType::Unknown
    {
        out.value_type = second.value_type.clone();
    }
    if options.conflict_resolution == ConflictResolution::Combined {
        out.min_count = primary.min_count.min(secondary.min_count);
        out.max_count = widen_max_count(primary.max_count, secondary.max_count);
        out.index = combine_lists(options, &primary.index, &secondary.index);
        out.constraint = combine_lists(options, &primary.constraint, &secondary.constraint);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::DataType;
    use crate::models::unverified::UnverifiedPhysicalModel;

    fn load(yaml: &str) -> PhysicalDataModel {
        PhysicalDataModel::load(UnverifiedPhysicalModel::from_yaml(yaml).unwrap()).unwrap()
    }

    fn primary() -> PhysicalDataModel {
        load(
            r#"
Metadata: {space: power, externalId: Primary, version: v1}
Views:
  - View: Shared
Containers:
  - Container: Shared
Properties:
  - {View: Shared, View Property: capacity, Value Type: float64, Min Count: 1,
     Max Count: 1, Container: Shared, Container Property: capacity, Index: capacity}
"#,
        )
    }

    fn secondary() -> PhysicalDataModel {
        load(
            r#"
Metadata: {space: power, externalId: Secondary, version: v1}
Views:
  - View: Shared
  - View: Extra
Containers:
  - Container: Shared
Properties:
  - {View: Shared, View Property: capacity, Value Type: float64, Min Count: 0,
     Max Count: 5, Container: Shared, Container Property: capacity, Constraint: unique:capacity}
  - {View: Extra, View Property: code, Value Type: text, Max Count: 1}
"#,
        )
    }

    #[test]
    fn test_combined_join_unions_views() {
        let merged = merge_physical(&primary(), &secondary(), &MergeOptions::default());
        assert_eq!(merged.views.len(), 2);
        assert_eq!(merged.properties.len(), 2);
    }

    #[test]
    fn test_widening_law_on_shared_property() {
        let merged = merge_physical(&primary(), &secondary(), &MergeOptions::default());
        let capacity = merged
            .properties
            .iter()
            .find(|p| p.property == "capacity")
            .unwrap();
        assert_eq!(capacity.min_count, 0);
        assert_eq!(capacity.max_count, Some(5));
        assert_eq!(capacity.index, vec!["capacity".to_string()]);
        assert_eq!(capacity.constraint, vec!["unique:capacity".to_string()]);
    }

    #[test]
    fn test_priority_resolution_keeps_primary_shape() {
        let options = MergeOptions {
            conflict_resolution: ConflictResolution::Priority,
            ..MergeOptions::default()
        };
        let merged = merge_physical(&primary(), &secondary(), &options);
        let capacity = merged
            .properties
            .iter()
            .find(|p| p.property == "capacity")
            .unwrap();
        assert_eq!(capacity.min_count, 1);
        assert_eq!(capacity.max_count, Some(1));
        assert!(capacity.constraint.is_empty());
        assert_eq!(
            capacity.value_type,
            PhysicalValueType::Data(DataType::Float64)
        );
    }

    #[test]
    fn test_unknown_value_type_never_wins() {
        let mut a = primary();
        a.properties[0].value_type = PhysicalValueType::Unknown;
        let merged = merge_physical(&a, &secondary(), &MergeOptions::default());
        assert_eq!(
            merged.properties[0].value_type,
            PhysicalValueType::Data(DataType::Float64)
        );
    }
}
