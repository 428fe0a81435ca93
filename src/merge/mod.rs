//! Model merge and union
//!
//! Merging combines a primary and a secondary verified model of the same
//! kind. Three orthogonal policies steer the result:
//!
//! - [`Join`] selects which top-level resources (concepts, views) survive.
//! - [`Priority`] selects whose scalar fields win when both sides define a
//!   resource.
//! - [`ConflictResolution`] governs combinable fields: `Priority` keeps the
//!   priority side's value outright, `Combined` unions value types and
//!   lists, and widens cardinality so the merged property never excludes a
//!   value either input allowed.
//!
//! Merges never mutate their inputs; every transform returns a fresh model.

pub mod conceptual;
pub mod physical;

pub use conceptual::{merge_conceptual, union_conceptual};
pub use physical::merge_physical;

/// Which side's top-level resources survive the merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Join {
    Primary,
    Secondary,
    #[default]
    Combined,
}

/// Whose scalar fields (name, description, defaults) win on conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Priority {
    #[default]
    Primary,
    Secondary,
}

/// How combinable fields (value types, lists, cardinality) are merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictResolution {
    /// Keep only the priority side's value.
    Priority,
    /// Union value types and lists; widen cardinality.
    #[default]
    Combined,
}

/// Merge policies, defaulting to a widening combined merge with the
/// primary side winning scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MergeOptions {
    pub join: Join,
    pub priority: Priority,
    pub conflict_resolution: ConflictResolution,
}

impl MergeOptions {
    /// Order a pair as (priority side, other side).
    pub(crate) fn prioritize<'a, T>(&self, primary: &'a T, secondary: &'a T) -> (&'a T, &'a T) {
        match self.priority {
            Priority::Primary => (primary, secondary),
            Priority::Secondary => (secondary, primary),
        }
    }
}

/// Priority-side scalar, falling back to the other side when absent.
pub(crate) fn pick_scalar<T: Clone>(
    options: &MergeOptions,
    primary: &Option<T>,
    secondary: &Option<T>,
) -> Option<T> {
    let (first, second) = options.prioritize(primary, secondary);
    first.clone().or_else(|| second.clone())
}

/// Union of two lists preserving first-seen order, priority side first.
pub(crate) fn combine_lists<T: Clone + PartialEq>(
    options: &MergeOptions,
    primary: &[T],
    secondary: &[T],
) -> Vec<T> {
    let (first, second): (&[T], &[T]) = match options.priority {
        Priority::Primary => (primary, secondary),
        Priority::Secondary => (secondary, primary),
    };
    let mut out: Vec<T> = Vec::with_capacity(first.len() + second.len());
    for item in first.iter().chain(second) {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

/// Widened max count: `None` means unbounded and absorbs any bound.
pub(crate) fn widen_max_count(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        _ => None,
    }
}
