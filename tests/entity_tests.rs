use neat_core::{ConceptEntity, Entity, ValueType, ViewEntity};

#[test]
fn test_round_trip_law_on_canonical_strings() {
    let cases = [
        "GeneratingUnit",
        "power:GeneratingUnit",
        "power:GeneratingUnit(version=v1)",
        "cdf_cdm:CogniteAsset(version=v1)",
        "reverse(property=units)",
        "edge(direction=outwards, type=power:Line)",
    ];
    for raw in cases {
        let entity = Entity::load(raw, None).unwrap();
        assert_eq!(entity.dump(None, None), raw, "canonical dump of '{raw}'");
        assert_eq!(Entity::load(&entity.dump(None, None), None).unwrap(), entity);
    }
}

#[test]
fn test_dump_compacts_against_context() {
    let entity = Entity::load("power:GeneratingUnit(version=v1)", None).unwrap();
    assert_eq!(entity.dump(Some("power"), Some("v1")), "GeneratingUnit");
    assert_eq!(entity.dump(Some("power"), None), "GeneratingUnit(version=v1)");

    // Reloading in the same context restores the original.
    let compact = entity.dump(Some("power"), Some("v1"));
    let reloaded = Entity::load(&compact, Some("power"))
        .unwrap()
        .with_default_version("v1");
    assert_eq!(reloaded, entity);
}

#[test]
fn test_equality_and_ordering_follow_canonical_form() {
    let a = Entity::load("power:Unit(version=v1)", None).unwrap();
    let b = Entity::load("Unit(version=v1)", Some("power")).unwrap();
    assert_eq!(a, b);

    let mut entities = vec![
        Entity::load("power:Zeta", None).unwrap(),
        Entity::load("grid:Alpha", None).unwrap(),
        Entity::load("power:Alpha", None).unwrap(),
    ];
    entities.sort();
    let reprs: Vec<_> = entities.iter().map(|e| e.to_string()).collect();
    assert_eq!(reprs, vec!["grid:Alpha", "power:Alpha", "power:Zeta"]);
}

#[test]
fn test_concept_view_container_conversions() {
    let concept = ConceptEntity::load("power:GeneratingUnit(version=v1)", None).unwrap();
    let view: ViewEntity = concept.to_view();
    assert_eq!(view.version(), Some("v1"));
    assert_eq!(view.to_concept(), concept);

    // Containers are unversioned.
    let container = concept.to_container();
    assert_eq!(container.version(), None);
    assert_eq!(container.suffix(), "GeneratingUnit");
}

#[test]
fn test_value_type_parsing_end_to_end() {
    assert!(matches!(
        ValueType::load("float64", None).unwrap(),
        ValueType::Data(_)
    ));
    assert!(matches!(
        ValueType::load("power:Asset", None).unwrap(),
        ValueType::Concept(_)
    ));
    assert_eq!(ValueType::load("#N/A", None).unwrap(), ValueType::Unknown);
    match ValueType::load("text | power:Asset", None).unwrap() {
        ValueType::Multi(info) => assert_eq!(info.types().len(), 2),
        other => panic!("expected multi, got {other:?}"),
    }
}
