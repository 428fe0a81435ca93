//! Cross-field model validation
//!
//! Validators never raise on recoverable problems: each check appends to a
//! report so one pass surfaces every issue at once. Errors block
//! downstream conversion; warnings are surfaced but non-blocking. The
//! caller picks between "return issues" and "raise on error" via
//! [`ValidationReport::into_result`].

pub mod conceptual;
pub mod identifiers;
pub mod physical;

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use conceptual::ConceptualValidator;
pub use physical::PhysicalValidator;

/// Issue severity. Errors block conversion/export; warnings do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Stable machine-readable issue kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    DuplicatedResource,
    NamespaceCollision,
    DanglingConcept,
    UndefinedConcept,
    UndefinedParent,
    ReferencedConceptMissing,
    UndefinedValueType,
    NonCompliantIdentifier,
    InheritanceCycle,
    PropertyDefinitionDuplicated,
    MissingContainer,
    MissingView,
    ConnectionWithoutTarget,
    NotSupportedViewContainerLimit,
    NotSupportedHasDataFilterLimit,
    ViewWithoutProperties,
    IdentifierTooLong,
    UnsupportedConstraint,
    UnsupportedIndex,
    MultiValueTypeDropped,
    UnknownValueType,
}

/// A single validation finding.
///
/// `rows` and `values` are sets rather than lists so the same finding is
/// reported identically regardless of input row order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub code: IssueCode,
    pub message: String,
    /// 0-based input rows contributing to the finding.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub rows: BTreeSet<usize>,
    /// Distinct conflicting values observed, when applicable.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub values: BTreeSet<String>,
}

impl Issue {
    pub fn error(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            rows: BTreeSet::new(),
            values: BTreeSet::new(),
        }
    }

    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            rows: BTreeSet::new(),
            values: BTreeSet::new(),
        }
    }

    pub fn with_rows(mut self, rows: impl IntoIterator<Item = usize>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn with_values(mut self, values: impl IntoIterator<Item = String>) -> Self {
        self.values.extend(values);
        self
    }

    /// Human-readable row list, 1-based as in the source spreadsheet.
    pub fn row_display(&self) -> String {
        self.rows
            .iter()
            .map(|row| format!("row {}", row + 1))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)?;
        if !self.rows.is_empty() {
            write!(f, " ({})", self.row_display())?;
        }
        Ok(())
    }
}

/// Ordered list of findings from one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub issues: Vec<Issue>,
}

impl ValidationReport {
    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues
            .iter()
            .filter(|issue| issue.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn ok(&self) -> bool {
        !self.has_errors()
    }

    /// Raise-on-error semantics: all errors as one raisable unit, or `Ok`
    /// carrying the warnings.
    pub fn into_result(self) -> Result<Vec<Issue>, MultiValidationError> {
        if self.has_errors() {
            Err(MultiValidationError {
                errors: self
                    .issues
                    .iter()
                    .filter(|issue| issue.severity == Severity::Error)
                    .cloned()
                    .collect(),
                warnings: self
                    .issues
                    .into_iter()
                    .filter(|issue| issue.severity == Severity::Warning)
                    .collect(),
            })
        } else {
            Ok(self.issues)
        }
    }
}

/// Aggregate carrying every validation error from a pass as one raisable
/// unit, so the caller still sees all problems at once.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiValidationError {
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl std::error::Error for MultiValidationError {}

impl fmt::Display for MultiValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "validation failed with {} error(s):", self.errors.len())?;
        for issue in &self.errors {
            writeln!(f, "  - {issue}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_partitions_by_severity() {
        let mut report = ValidationReport::default();
        report.push(Issue::warning(IssueCode::DanglingConcept, "w"));
        report.push(Issue::error(IssueCode::UndefinedConcept, "e"));
        assert_eq!(report.warnings().count(), 1);
        assert_eq!(report.errors().count(), 1);
        assert!(!report.ok());
    }

    #[test]
    fn test_into_result_carries_all_errors() {
        let mut report = ValidationReport::default();
        report.push(Issue::error(IssueCode::UndefinedConcept, "a"));
        report.push(Issue::error(IssueCode::DuplicatedResource, "b"));
        let err = report.into_result().unwrap_err();
        assert_eq!(err.errors.len(), 2);
    }

    #[test]
    fn test_row_display_is_one_based() {
        let issue = Issue::error(IssueCode::DuplicatedResource, "dup").with_rows([0, 2]);
        assert_eq!(issue.row_display(), "row 1, row 3");
    }
}
