use std::collections::BTreeSet;

use neat_core::{
    ConceptualDataModel, ConceptualValidator, IssueCode, PhysicalDataModel, PhysicalValidator,
    Severity, UnverifiedConceptualModel, UnverifiedPhysicalModel,
};

fn conceptual(yaml: &str) -> ConceptualDataModel {
    ConceptualDataModel::load(UnverifiedConceptualModel::from_yaml(yaml).unwrap()).unwrap()
}

fn physical(yaml: &str) -> PhysicalDataModel {
    PhysicalDataModel::load(UnverifiedPhysicalModel::from_yaml(yaml).unwrap()).unwrap()
}

#[test]
fn test_conflicting_container_property_types_yield_one_error() {
    let model = physical(
        r#"
Metadata: {space: power, externalId: PowerModel, version: v1}
Views:
  - View: GeneratingUnit
  - View: WindTurbine
Containers:
  - Container: GeneratingUnit
Properties:
  - {View: GeneratingUnit, View Property: maxPower, Value Type: float64,
     Min Count: 0, Max Count: 1, Container: GeneratingUnit, Container Property: maxPower}
  - {View: WindTurbine, View Property: maxPower, Value Type: float32,
     Min Count: 0, Max Count: 1, Container: GeneratingUnit, Container Property: maxPower}
"#,
    );
    let report = PhysicalValidator::new(&model).validate();
    let duplicated: Vec<_> = report
        .errors()
        .filter(|issue| issue.code == IssueCode::PropertyDefinitionDuplicated)
        .collect();
    assert_eq!(duplicated.len(), 1, "one error for the one differing feature");
    assert_eq!(duplicated[0].rows, BTreeSet::from([0, 1]));
    assert_eq!(
        duplicated[0].values,
        BTreeSet::from(["float32".to_string(), "float64".to_string()])
    );
}

#[test]
fn test_each_differing_feature_gets_its_own_error() {
    let model = physical(
        r#"
Metadata: {space: power, externalId: PowerModel, version: v1}
Views:
  - View: A
  - View: B
Containers:
  - Container: C
Properties:
  - {View: A, View Property: p, Value Type: float64, Min Count: 1, Max Count: 1,
     Container: C, Container Property: p}
  - {View: B, View Property: p, Value Type: float32, Min Count: 0, Max Count: 1,
     Container: C, Container Property: p}
"#,
    );
    let report = PhysicalValidator::new(&model).validate();
    // Type and nullable both differ; two separate errors, same row sets.
    let duplicated: Vec<_> = report
        .errors()
        .filter(|issue| issue.code == IssueCode::PropertyDefinitionDuplicated)
        .collect();
    assert_eq!(duplicated.len(), 2);
    assert!(duplicated.iter().all(|i| i.rows == BTreeSet::from([0, 1])));
}

#[test]
fn test_min_count_conflict_is_reported_once_as_nullable() {
    let model = physical(
        r#"
Metadata: {space: power, externalId: PowerModel, version: v1}
Views:
  - View: A
  - View: B
Containers:
  - Container: C
Properties:
  - {View: A, View Property: p, Value Type: float64, Min Count: 1, Max Count: 1,
     Container: C, Container Property: p}
  - {View: B, View Property: p, Value Type: float64, Min Count: 0, Max Count: 1,
     Container: C, Container Property: p}
"#,
    );
    let report = PhysicalValidator::new(&model).validate();
    // Only nullability differs; the cardinality feature must not double-report it.
    let duplicated: Vec<_> = report
        .errors()
        .filter(|issue| issue.code == IssueCode::PropertyDefinitionDuplicated)
        .collect();
    assert_eq!(duplicated.len(), 1);
    assert!(duplicated[0].message.contains("nullable"));
    assert_eq!(
        duplicated[0].values,
        BTreeSet::from(["false".to_string(), "true".to_string()])
    );
}

#[test]
fn test_duplicate_errors_are_order_independent() {
    let yaml_forward = r#"
Metadata: {space: power, externalId: PowerModel, version: v1}
Views:
  - View: A
  - View: B
Containers:
  - Container: C
Properties:
  - {View: A, View Property: p, Value Type: float64, Max Count: 1, Container: C, Container Property: p}
  - {View: B, View Property: p, Value Type: float32, Max Count: 1, Container: C, Container Property: p}
"#;
    let forward = physical(yaml_forward);
    let mut backward = forward.clone();
    backward.properties.reverse();

    let collect = |model: &PhysicalDataModel| -> Vec<(IssueCode, BTreeSet<String>)> {
        PhysicalValidator::new(model)
            .validate()
            .errors()
            .map(|issue| (issue.code, issue.values.clone()))
            .collect()
    };
    assert_eq!(collect(&forward), collect(&backward));
}

#[test]
fn test_undefined_foreign_parent_is_exactly_one_warning() {
    let model = conceptual(
        r#"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: A
    Implements: other:B
Properties:
  - {Concept: A, Property: name, Value Type: text}
"#,
    );
    let report = ConceptualValidator::new(&model).validate();
    assert!(!report.has_errors());
    let parent_warnings: Vec<_> = report
        .warnings()
        .filter(|issue| issue.code == IssueCode::UndefinedParent)
        .collect();
    assert_eq!(parent_warnings.len(), 1);
}

#[test]
fn test_undefined_local_parent_is_error() {
    let model = conceptual(
        r#"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: A
    Implements: B
Properties:
  - {Concept: A, Property: name, Value Type: text}
"#,
    );
    let report = ConceptualValidator::new(&model).validate();
    assert!(report
        .errors()
        .any(|issue| issue.code == IssueCode::UndefinedParent));
}

#[test]
fn test_duplicated_concept_error_names_all_rows() {
    let model = conceptual(
        r#"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: A
  - Concept: B
  - Concept: A
Properties:
  - {Concept: A, Property: name, Value Type: text}
  - {Concept: B, Property: name, Value Type: text}
"#,
    );
    let report = ConceptualValidator::new(&model).validate();
    let duplicated: Vec<_> = report
        .errors()
        .filter(|issue| issue.code == IssueCode::DuplicatedResource)
        .collect();
    assert_eq!(duplicated.len(), 1);
    assert_eq!(duplicated[0].rows, BTreeSet::from([0, 2]));
}

#[test]
fn test_report_into_result_raises_all_errors_at_once() {
    let model = conceptual(
        r#"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: A
  - Concept: A
Properties:
  - {Concept: A, Property: name, Value Type: text}
  - {Concept: Missing, Property: other, Value Type: text}
"#,
    );
    let report = ConceptualValidator::new(&model).validate();
    let err = report.into_result().unwrap_err();
    assert!(err.errors.len() >= 2);
    let codes: BTreeSet<_> = err.errors.iter().map(|issue| issue.code).collect();
    assert!(codes.contains(&IssueCode::DuplicatedResource));
    assert!(codes.contains(&IssueCode::UndefinedConcept));
}

#[test]
fn test_identifier_compliance_is_warning_on_conceptual_side() {
    let model = conceptual(
        r#"
Metadata: {prefix: power, externalId: PowerModel, version: v1}
Concepts:
  - Concept: A
Properties:
  - {Concept: A, Property: externalId, Value Type: text}
"#,
    );
    let report = ConceptualValidator::new(&model).validate();
    let compliance: Vec<_> = report
        .issues
        .iter()
        .filter(|issue| issue.code == IssueCode::NonCompliantIdentifier)
        .collect();
    assert_eq!(compliance.len(), 1);
    assert_eq!(compliance[0].severity, Severity::Warning);
}
