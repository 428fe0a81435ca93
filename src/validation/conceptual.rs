//! Conceptual model validation
//!
//! An explicit, ordered pipeline of checks over an already-loaded model.
//! Every check runs even if earlier ones found problems, so the report
//! names everything wrong in one pass.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;

use crate::entities::ConceptEntity;
use crate::models::conceptual::ConceptualDataModel;

use super::identifiers::{is_compliant_external_id, is_compliant_property};
use super::{Issue, IssueCode, ValidationReport};

/// Validator for [`ConceptualDataModel`].
pub struct ConceptualValidator<'a> {
    model: &'a ConceptualDataModel,
}

impl<'a> ConceptualValidator<'a> {
    pub fn new(model: &'a ConceptualDataModel) -> Self {
        Self { model }
    }

    /// Run all checks, in order, each independent and cumulative.
    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        self.check_duplicated_resources(&mut report);
        self.check_namespace_collisions(&mut report);
        self.check_concepts_without_properties(&mut report);
        self.check_undefined_concepts(&mut report);
        self.check_parents_defined(&mut report);
        self.check_referenced_concepts_exist(&mut report);
        self.check_value_types_exist(&mut report);
        self.check_identifier_compliance(&mut report);
        self.check_inheritance_cycles(&mut report);
        report
    }

    fn defined(&self) -> BTreeSet<&ConceptEntity> {
        self.model.defined_concepts()
    }

    /// Check 1: concept ids and (concept, property) pairs must be unique.
    fn check_duplicated_resources(&self, report: &mut ValidationReport) {
        let mut concept_rows: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
        for (row, concept) in self.model.concepts.iter().enumerate() {
            concept_rows
                .entry(concept.concept.to_string())
                .or_default()
                .insert(row);
        }
        for (concept, rows) in concept_rows {
            if rows.len() > 1 {
                let issue = Issue::error(
                    IssueCode::DuplicatedResource,
                    format!("concept '{concept}' is defined more than once"),
                )
                .with_rows(rows);
                let message = format!("{} ({})", issue.message, issue.row_display());
                report.push(Issue { message, ..issue });
            }
        }

        let mut property_rows: BTreeMap<(String, String), BTreeSet<usize>> = BTreeMap::new();
        for (row, property) in self.model.properties.iter().enumerate() {
            property_rows
                .entry((property.concept.to_string(), property.property.clone()))
                .or_default()
                .insert(row);
        }
        for ((concept, property), rows) in property_rows {
            if rows.len() > 1 {
                let issue = Issue::error(
                    IssueCode::DuplicatedResource,
                    format!("property '{property}' of concept '{concept}' is defined more than once"),
                )
                .with_rows(rows);
                let message = format!("{} ({})", issue.message, issue.row_display());
                report.push(Issue { message, ..issue });
            }
        }
    }

    /// Check 2: no two prefixes may share a namespace.
    fn check_namespace_collisions(&self, report: &mut ValidationReport) {
        let mut by_namespace: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (prefix, namespace) in &self.model.prefixes {
            by_namespace
                .entry(namespace.as_str())
                .or_default()
                .push(prefix.as_str());
        }
        for (namespace, prefixes) in by_namespace {
            if prefixes.len() > 1 {
                report.push(
                    Issue::error(
                        IssueCode::NamespaceCollision,
                        format!(
                            "prefixes {} are all bound to namespace '{namespace}'",
                            prefixes.join(", ")
                        ),
                    )
                    .with_values(prefixes.iter().map(|p| p.to_string())),
                );
            }
        }
    }

    /// Check 3: a concept in the model's own namespace with neither direct
    /// nor inherited properties is dangling.
    fn check_concepts_without_properties(&self, report: &mut ValidationReport) {
        let own_prefix = self.model.metadata.prefix.as_str();
        for (row, concept) in self.model.concepts.iter().enumerate() {
            let is_local = match concept.concept.prefix() {
                Some(prefix) => prefix == own_prefix,
                None => true,
            };
            if is_local && !self.model.has_properties(&concept.concept) {
                report.push(
                    Issue::warning(
                        IssueCode::DanglingConcept,
                        format!(
                            "concept '{}' has no direct or inherited properties",
                            concept.concept
                        ),
                    )
                    .with_rows([row]),
                );
            }
        }
    }

    /// Check 4: properties must belong to a defined concept.
    fn check_undefined_concepts(&self, report: &mut ValidationReport) {
        let defined = self.defined();
        for (row, property) in self.model.properties.iter().enumerate() {
            if !defined.contains(&property.concept) {
                report.push(
                    Issue::error(
                        IssueCode::UndefinedConcept,
                        format!(
                            "property '{}' references undefined concept '{}'",
                            property.property, property.concept
                        ),
                    )
                    .with_rows([row]),
                );
            }
        }
    }

    /// Check 5: implements targets must resolve. Foreign-namespace parents
    /// are legitimately external, so those are warnings.
    fn check_parents_defined(&self, report: &mut ValidationReport) {
        let defined = self.defined();
        let own_prefix = self.model.metadata.prefix.as_str();
        for (row, concept) in self.model.concepts.iter().enumerate() {
            for parent in &concept.implements {
                if defined.contains(parent) {
                    continue;
                }
                let foreign = parent.prefix().is_some_and(|prefix| prefix != own_prefix);
                let issue = if foreign {
                    Issue::warning(
                        IssueCode::UndefinedParent,
                        format!(
                            "concept '{}' implements '{parent}', which is assumed to be defined externally",
                            concept.concept
                        ),
                    )
                } else {
                    Issue::error(
                        IssueCode::UndefinedParent,
                        format!(
                            "concept '{}' implements '{parent}', which is not defined in the model",
                            concept.concept
                        ),
                    )
                };
                report.push(issue.with_rows([row]));
            }
        }
    }

    /// Check 6: complete-schema mode re-checks concept references at
    /// warning severity. Intentionally overlaps with check 4; the two are
    /// specified independently.
    fn check_referenced_concepts_exist(&self, report: &mut ValidationReport) {
        if !self.model.metadata.schema_completeness.is_complete() {
            return;
        }
        let defined = self.defined();
        let mut missing: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
        for (row, property) in self.model.properties.iter().enumerate() {
            if !defined.contains(&property.concept) {
                missing
                    .entry(property.concept.to_string())
                    .or_default()
                    .insert(row);
            }
        }
        for (concept, rows) in missing {
            report.push(
                Issue::warning(
                    IssueCode::ReferencedConceptMissing,
                    format!("complete schema references concept '{concept}' which is not defined"),
                )
                .with_rows(rows),
            );
        }
    }

    /// Check 7: object-property value types should point at defined
    /// concepts. Unknown is always acceptable.
    fn check_value_types_exist(&self, report: &mut ValidationReport) {
        let defined = self.defined();
        for (row, property) in self.model.properties.iter().enumerate() {
            for target in property.value_type.referenced_concepts() {
                if !defined.contains(target) {
                    report.push(
                        Issue::warning(
                            IssueCode::UndefinedValueType,
                            format!(
                                "property '{}' of '{}' has value type '{target}' which is not a defined concept",
                                property.property, property.concept
                            ),
                        )
                        .with_rows([row]),
                    );
                }
            }
        }
    }

    /// Check 8: identifiers should already satisfy the physical layer's
    /// patterns; violations are warnings because the conversion will have
    /// to rename them.
    fn check_identifier_compliance(&self, report: &mut ValidationReport) {
        for (row, concept) in self.model.concepts.iter().enumerate() {
            if !is_compliant_external_id(concept.concept.suffix()) {
                report.push(
                    Issue::warning(
                        IssueCode::NonCompliantIdentifier,
                        format!(
                            "concept id '{}' is not compliant with the physical layer",
                            concept.concept.suffix()
                        ),
                    )
                    .with_rows([row])
                    .with_values([concept.concept.suffix().to_string()]),
                );
            }
        }
        for (row, property) in self.model.properties.iter().enumerate() {
            if !is_compliant_property(&property.property) {
                report.push(
                    Issue::warning(
                        IssueCode::NonCompliantIdentifier,
                        format!(
                            "property id '{}' is not compliant with the physical layer",
                            property.property
                        ),
                    )
                    .with_rows([row])
                    .with_values([property.property.clone()]),
                );
            }
            for target in property.value_type.referenced_concepts() {
                if !is_compliant_external_id(target.suffix()) {
                    report.push(
                        Issue::warning(
                            IssueCode::NonCompliantIdentifier,
                            format!(
                                "value type '{}' is not compliant with the physical layer",
                                target.suffix()
                            ),
                        )
                        .with_rows([row])
                        .with_values([target.suffix().to_string()]),
                    );
                }
            }
        }
    }

    /// Supplementary: the implements relation must form a DAG.
    fn check_inheritance_cycles(&self, report: &mut ValidationReport) {
        let mut graph = DiGraph::<&ConceptEntity, ()>::new();
        let mut nodes = HashMap::new();
        for concept in &self.model.concepts {
            nodes
                .entry(&concept.concept)
                .or_insert_with(|| graph.add_node(&concept.concept));
        }
        for concept in &self.model.concepts {
            let child = nodes[&concept.concept];
            for parent in &concept.implements {
                if let Some(&parent_node) = nodes.get(parent) {
                    graph.add_edge(child, parent_node, ());
                }
            }
        }
        for component in tarjan_scc(&graph) {
            let cyclic = component.len() > 1
                || component
                    .first()
                    .is_some_and(|&node| graph.contains_edge(node, node));
            if cyclic {
                let members: BTreeSet<String> = component
                    .iter()
                    .map(|&node| graph[node].to_string())
                    .collect();
                report.push(
                    Issue::error(
                        IssueCode::InheritanceCycle,
                        format!(
                            "implements cycle between: {}",
                            members.iter().cloned().collect::<Vec<_>>().join(", ")
                        ),
                    )
                    .with_values(members),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::unverified::UnverifiedConceptualModel;
    use crate::validation::Severity;

    fn load(yaml: &str) -> ConceptualDataModel {
        ConceptualDataModel::load(UnverifiedConceptualModel::from_yaml(yaml).unwrap()).unwrap()
    }

    #[test]
    fn test_duplicate_property_pair_is_error() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: M, version: v1}
Concepts:
  - Concept: Unit
Properties:
  - {Concept: Unit, Property: maxPower, Value Type: float64}
  - {Concept: Unit, Property: maxPower, Value Type: float32}
"#,
        );
        let report = ConceptualValidator::new(&model).validate();
        let duplicates: Vec<_> = report
            .errors()
            .filter(|i| i.code == IssueCode::DuplicatedResource)
            .collect();
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].rows, BTreeSet::from([0, 1]));
    }

    #[test]
    fn test_namespace_collision_is_error() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: M, version: v1}
Prefixes:
  a: "http://example.org/ns#"
  b: "http://example.org/ns#"
"#,
        );
        let report = ConceptualValidator::new(&model).validate();
        assert!(report
            .errors()
            .any(|i| i.code == IssueCode::NamespaceCollision));
    }

    #[test]
    fn test_foreign_undefined_parent_is_single_warning() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: M, version: v1}
Concepts:
  - Concept: A
    Implements: other:B
Properties:
  - {Concept: A, Property: name, Value Type: text}
"#,
        );
        let report = ConceptualValidator::new(&model).validate();
        let parent_issues: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.code == IssueCode::UndefinedParent)
            .collect();
        assert_eq!(parent_issues.len(), 1);
        assert_eq!(parent_issues[0].severity, Severity::Warning);
    }

    #[test]
    fn test_local_undefined_parent_is_error() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: M, version: v1}
Concepts:
  - Concept: A
    Implements: B
Properties:
  - {Concept: A, Property: name, Value Type: text}
"#,
        );
        let report = ConceptualValidator::new(&model).validate();
        assert!(report.errors().any(|i| i.code == IssueCode::UndefinedParent));
    }

    #[test]
    fn test_dangling_concept_is_warning() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: M, version: v1}
Concepts:
  - Concept: Orphan
"#,
        );
        let report = ConceptualValidator::new(&model).validate();
        assert!(report
            .warnings()
            .any(|i| i.code == IssueCode::DanglingConcept));
        assert!(report.ok());
    }

    #[test]
    fn test_unknown_value_type_is_acceptable() {
        let model = load(
            r##"
Metadata: {prefix: power, externalId: M, version: v1}
Concepts:
  - Concept: Unit
Properties:
  - {Concept: Unit, Property: mystery, Value Type: "#N/A"}
"##,
        );
        let report = ConceptualValidator::new(&model).validate();
        assert!(!report
            .issues
            .iter()
            .any(|i| i.code == IssueCode::UndefinedValueType));
    }

    #[test]
    fn test_inheritance_cycle_is_error() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: M, version: v1}
Concepts:
  - Concept: A
    Implements: B
  - Concept: B
    Implements: A
Properties:
  - {Concept: A, Property: name, Value Type: text}
"#,
        );
        let report = ConceptualValidator::new(&model).validate();
        assert!(report
            .errors()
            .any(|i| i.code == IssueCode::InheritanceCycle));
    }

    #[test]
    fn test_non_compliant_property_id_is_warning() {
        let model = load(
            r#"
Metadata: {prefix: power, externalId: M, version: v1}
Concepts:
  - Concept: Unit
Properties:
  - {Concept: Unit, Property: externalId, Value Type: text}
"#,
        );
        let report = ConceptualValidator::new(&model).validate();
        assert!(report
            .warnings()
            .any(|i| i.code == IssueCode::NonCompliantIdentifier));
    }
}
