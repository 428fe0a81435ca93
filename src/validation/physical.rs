//! Physical model validation
//!
//! Container properties are the unit of schema storage: when several view
//! properties map to the same container property they must agree on every
//! stored feature. Each disagreeing feature is reported as its own
//! duplicated-definition error carrying the distinct values seen, so the
//! report is identical under input reordering.

use std::collections::{BTreeSet, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::DiGraph;

use crate::entities::{ContainerEntity, ViewEntity};
use crate::models::physical::{
    PhysicalDataModel, PhysicalProperty, PhysicalValueType, ViewFilter,
    MAX_CONTAINERS_PER_HAS_DATA_FILTER, MAX_CONTAINERS_PER_VIEW, MAX_EXTERNAL_ID_LENGTH,
    MAX_SPACE_LENGTH,
};

use super::identifiers::{
    constraint_kind, exceeds_external_id_length, exceeds_space_length, index_kind,
    SUPPORTED_CONSTRAINT_KINDS, SUPPORTED_INDEX_KINDS,
};
use super::{Issue, IssueCode, ValidationReport};

/// Stored features of a container property that must agree across all view
/// properties mapping to the same slot.
const DUPLICATE_FEATURES: [&str; 5] = ["value type", "nullable", "cardinality", "index", "constraint"];

/// Validator for [`PhysicalDataModel`].
pub struct PhysicalValidator<'a> {
    model: &'a PhysicalDataModel,
}

impl<'a> PhysicalValidator<'a> {
    pub fn new(model: &'a PhysicalDataModel) -> Self {
        Self { model }
    }

    pub fn validate(&self) -> ValidationReport {
        let mut report = ValidationReport::default();
        self.check_duplicated_container_properties(&mut report);
        self.check_connections_have_targets(&mut report);
        self.check_references_resolve(&mut report);
        self.check_container_limits(&mut report);
        self.check_views_without_properties(&mut report);
        self.check_identifier_lengths(&mut report);
        self.check_index_and_constraint_kinds(&mut report);
        self.check_inheritance_cycles(&mut report);
        report
    }

    /// One feature of a property serialized for agreement comparison.
    fn feature_value(property: &PhysicalProperty, feature: &str) -> String {
        match feature {
            "value type" => property.value_type.dump(None, None),
            "nullable" => property.nullable().to_string(),
            // min_count disagreements belong to the nullable feature
            "cardinality" => match property.max_count {
                Some(n) => format!("..{n}"),
                None => "..inf".to_string(),
            },
            "index" => {
                let tags: BTreeSet<&String> = property.index.iter().collect();
                format!("{tags:?}")
            }
            "constraint" => {
                let tags: BTreeSet<&String> = property.constraint.iter().collect();
                format!("{tags:?}")
            }
            _ => unreachable!("unknown feature"),
        }
    }

    /// (a) Properties sharing a container slot must define it identically.
    /// One error per disagreeing feature, not one merged error.
    fn check_duplicated_container_properties(&self, report: &mut ValidationReport) {
        for ((container, slot), entries) in self.model.properties_by_container_slot() {
            if entries.len() < 2 {
                continue;
            }
            let rows: BTreeSet<usize> = entries.iter().map(|(row, _)| *row).collect();
            for feature in DUPLICATE_FEATURES {
                let values: BTreeSet<String> = entries
                    .iter()
                    .map(|(_, property)| Self::feature_value(property, feature))
                    .collect();
                if values.len() > 1 {
                    let issue = Issue::error(
                        IssueCode::PropertyDefinitionDuplicated,
                        format!(
                            "container property '{slot}' of '{container}' has conflicting {feature} definitions: {values:?}"
                        ),
                    )
                    .with_rows(rows.clone())
                    .with_values(values);
                    let message = format!("{} ({})", issue.message, issue.row_display());
                    report.push(Issue { message, ..issue });
                }
            }
        }
    }

    /// A property with a connection must point at a view.
    fn check_connections_have_targets(&self, report: &mut ValidationReport) {
        for (row, property) in self.model.properties.iter().enumerate() {
            if property.connection.is_some()
                && !matches!(
                    property.value_type,
                    PhysicalValueType::View(_) | PhysicalValueType::Unknown
                )
            {
                report.push(
                    Issue::error(
                        IssueCode::ConnectionWithoutTarget,
                        format!(
                            "property '{}' of view '{}' declares a connection but its value type is not a view",
                            property.property, property.view
                        ),
                    )
                    .with_rows([row]),
                );
            }
        }
    }

    /// (b) Container/view references must resolve locally or be tracked as
    /// imports from another model.
    fn check_references_resolve(&self, report: &mut ValidationReport) {
        let views: BTreeSet<&ViewEntity> = self.model.views.iter().map(|v| &v.view).collect();
        let containers: BTreeSet<&ContainerEntity> =
            self.model.containers.iter().map(|c| &c.container).collect();

        for (row, property) in self.model.properties.iter().enumerate() {
            if !views.contains(&property.view) {
                report.push(
                    Issue::error(
                        IssueCode::MissingView,
                        format!(
                            "property '{}' belongs to view '{}' which is not defined",
                            property.property, property.view
                        ),
                    )
                    .with_rows([row]),
                );
            }
            if let Some(container) = &property.container
                && !containers.contains(container)
                && !self.model.imported_containers.contains(container)
            {
                report.push(
                    Issue::error(
                        IssueCode::MissingContainer,
                        format!(
                            "property '{}' of view '{}' maps to container '{container}' which is not defined",
                            property.property, property.view
                        ),
                    )
                    .with_rows([row]),
                );
            }
            if let PhysicalValueType::View(target) = &property.value_type
                && !views.contains(target)
                && !self.model.imported_views.contains(target)
            {
                report.push(
                    Issue::error(
                        IssueCode::MissingView,
                        format!(
                            "property '{}' of view '{}' points at view '{target}' which is not defined",
                            property.property, property.view
                        ),
                    )
                    .with_rows([row]),
                );
            }
        }

        for view in &self.model.views {
            for parent in &view.implements {
                if !views.contains(parent) && !self.model.imported_views.contains(parent) {
                    report.push(Issue::error(
                        IssueCode::MissingView,
                        format!(
                            "view '{}' implements '{parent}' which is not defined",
                            view.view
                        ),
                    ));
                }
            }
        }
    }

    /// (c) Platform limits on containers per view and per hasData filter.
    fn check_container_limits(&self, report: &mut ValidationReport) {
        for view in &self.model.views {
            let mapped = self.model.containers_of_with_inherited(&view.view);
            if mapped.len() > MAX_CONTAINERS_PER_VIEW {
                report.push(
                    Issue::warning(
                        IssueCode::NotSupportedViewContainerLimit,
                        format!(
                            "view '{}' maps to {} containers, above the supported {MAX_CONTAINERS_PER_VIEW}",
                            view.view,
                            mapped.len()
                        ),
                    )
                    .with_values(mapped.iter().map(|c| c.to_string())),
                );
            }
            if view.filter == Some(ViewFilter::HasData)
                && mapped.len() > MAX_CONTAINERS_PER_HAS_DATA_FILTER
            {
                report.push(
                    Issue::warning(
                        IssueCode::NotSupportedHasDataFilterLimit,
                        format!(
                            "view '{}' has a hasData filter over {} containers, above the supported {MAX_CONTAINERS_PER_HAS_DATA_FILTER}",
                            view.view,
                            mapped.len()
                        ),
                    )
                    .with_values(mapped.iter().map(|c| c.to_string())),
                );
            }
        }
    }

    /// (d) Views with neither own nor inherited properties.
    fn check_views_without_properties(&self, report: &mut ValidationReport) {
        for (row, view) in self.model.views.iter().enumerate() {
            let has_own = !self.model.properties_of(&view.view).is_empty();
            let has_inherited = self
                .model
                .ancestors(&view.view)
                .iter()
                .any(|parent| !self.model.properties_of(parent).is_empty());
            // Views implementing imported parents may inherit externally
            // defined properties; those are not dangling.
            let has_imported_parent = view
                .implements
                .iter()
                .any(|parent| self.model.imported_views.contains(parent));
            if !has_own && !has_inherited && !has_imported_parent {
                report.push(
                    Issue::warning(
                        IssueCode::ViewWithoutProperties,
                        format!("view '{}' has neither own nor inherited properties", view.view),
                    )
                    .with_rows([row]),
                );
            }
        }
    }

    /// (e) Identifier length limits are hard platform errors.
    fn check_identifier_lengths(&self, report: &mut ValidationReport) {
        if exceeds_space_length(&self.model.metadata.space) {
            report.push(Issue::error(
                IssueCode::IdentifierTooLong,
                format!(
                    "space '{}' exceeds {MAX_SPACE_LENGTH} characters",
                    self.model.metadata.space
                ),
            ));
        }
        let mut check = |kind: &str, id: &str| {
            if exceeds_external_id_length(id) {
                report.push(Issue::error(
                    IssueCode::IdentifierTooLong,
                    format!("{kind} id '{id}' exceeds {MAX_EXTERNAL_ID_LENGTH} characters"),
                ));
            }
        };
        for view in &self.model.views {
            check("view", view.view.suffix());
        }
        for container in &self.model.containers {
            check("container", container.container.suffix());
        }
        for property in &self.model.properties {
            check("property", &property.property);
        }
    }

    /// (f) Unsupported index/constraint kinds are errors.
    fn check_index_and_constraint_kinds(&self, report: &mut ValidationReport) {
        for (row, property) in self.model.properties.iter().enumerate() {
            for tag in &property.index {
                let kind = index_kind(tag).unwrap_or_default();
                if !SUPPORTED_INDEX_KINDS.contains(&kind) {
                    report.push(
                        Issue::error(
                            IssueCode::UnsupportedIndex,
                            format!(
                                "property '{}' of view '{}' uses unsupported index type '{kind}'",
                                property.property, property.view
                            ),
                        )
                        .with_rows([row])
                        .with_values([kind.to_string()]),
                    );
                }
            }
            for tag in &property.constraint {
                let kind = constraint_kind(tag);
                if !SUPPORTED_CONSTRAINT_KINDS.contains(&kind) {
                    report.push(
                        Issue::error(
                            IssueCode::UnsupportedConstraint,
                            format!(
                                "property '{}' of view '{}' uses unsupported constraint type '{kind}'",
                                property.property, property.view
                            ),
                        )
                        .with_rows([row])
                        .with_values([kind.to_string()]),
                    );
                }
            }
        }
        for container in &self.model.containers {
            for tag in &container.constraint {
                let kind = constraint_kind(tag);
                if !SUPPORTED_CONSTRAINT_KINDS.contains(&kind) {
                    report.push(
                        Issue::error(
                            IssueCode::UnsupportedConstraint,
                            format!(
                                "container '{}' uses unsupported constraint type '{kind}'",
                                container.container
                            ),
                        )
                        .with_values([kind.to_string()]),
                    );
                }
            }
        }
    }

    /// Supplementary: view inheritance must form a DAG.
    fn check_inheritance_cycles(&self, report: &mut ValidationReport) {
        let mut graph = DiGraph::<&ViewEntity, ()>::new();
        let mut nodes = HashMap::new();
        for view in &self.model.views {
            nodes
                .entry(&view.view)
                .or_insert_with(|| graph.add_node(&view.view));
        }
        for view in &self.model.views {
            let child = nodes[&view.view];
            for parent in &view.implements {
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
