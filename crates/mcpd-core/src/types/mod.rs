//! Shared core types used across the configuration and command layers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of a mutating operation.
///
/// Every mutation in the core reports one of these so front-ends can render
/// feedback (`(operation: updated)`) or branch on it programmatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationResult {
    /// A value or entry that did not exist before was written.
    Created,
    /// An existing value or entry was changed.
    Updated,
    /// Nothing changed.
    Noop,
    /// An existing value or entry was removed.
    Deleted,
}

impl OperationResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationResult::Created => "created",
            OperationResult::Updated => "updated",
            OperationResult::Noop => "noop",
            OperationResult::Deleted => "deleted",
        }
    }

    /// Whether the operation changed the document (and so requires a save).
    pub fn is_change(&self) -> bool {
        !matches!(self, OperationResult::Noop)
    }

    /// Classify replacing `before` with `after`.
    pub fn from_change<T: PartialEq>(before: Option<&T>, after: Option<&T>) -> Self {
        match (before, after) {
            (None, None) => OperationResult::Noop,
            (None, Some(_)) => OperationResult::Created,
            (Some(_), None) => OperationResult::Deleted,
            (Some(old), Some(new)) if old == new => OperationResult::Noop,
            (Some(_), Some(_)) => OperationResult::Updated,
        }
    }

    /// Fold the results of several mutations applied in one command.
    ///
    /// Any change wins over `Noop`; mixed changes collapse to `Updated`.
    pub fn combine(self, other: OperationResult) -> OperationResult {
        match (self, other) {
            (OperationResult::Noop, other) => other,
            (this, OperationResult::Noop) => this,
            (this, other) if this == other => this,
            _ => OperationResult::Updated,
        }
    }
}

impl fmt::Display for OperationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_change_classifies_all_transitions() {
        assert_eq!(
            OperationResult::from_change::<u8>(None, None),
            OperationResult::Noop
        );
        assert_eq!(
            OperationResult::from_change(None, Some(&1)),
            OperationResult::Created
        );
        assert_eq!(
            OperationResult::from_change(Some(&1), None),
            OperationResult::Deleted
        );
        assert_eq!(
            OperationResult::from_change(Some(&1), Some(&1)),
            OperationResult::Noop
        );
        assert_eq!(
            OperationResult::from_change(Some(&1), Some(&2)),
            OperationResult::Updated
        );
    }

    #[test]
    fn combine_prefers_changes() {
        use OperationResult::*;
        assert_eq!(Noop.combine(Noop), Noop);
        assert_eq!(Noop.combine(Created), Created);
        assert_eq!(Deleted.combine(Noop), Deleted);
        assert_eq!(Created.combine(Created), Created);
        assert_eq!(Created.combine(Deleted), Updated);
    }

    #[test]
    fn display_is_lowercase() {
        assert_eq!(OperationResult::Noop.to_string(), "noop");
        assert_eq!(
            serde_json::to_string(&OperationResult::Deleted).unwrap(),
            "\"deleted\""
        );
    }
}
