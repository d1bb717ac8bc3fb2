//! Advisory validation issues.
//!
//! Problems with input data which prevent a model from being built are reported as errors. Less
//! serious problems, e.g. a parameter which is specified but not used by a project's operational
//! type, are collected in a [`ValidationReport`] instead and a neutral default is used.
use log::warn;
use serde::Serialize;
use std::fmt::Display;

/// A single advisory issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    /// The entity the issue relates to (e.g. a project ID)
    pub entity: String,
    /// Description of the issue
    pub message: String,
}

/// Advisory issues found while building a model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Create an empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an advisory issue for an entity and log it as a warning
    pub fn warn(&mut self, entity: impl Display, message: impl Display) {
        let issue = ValidationIssue {
            entity: entity.to_string(),
            message: message.to_string(),
        };
        warn!("{}: {}", issue.entity, issue.message);
        self.issues.push(issue);
    }

    /// Iterate over the recorded issues
    pub fn iter(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter()
    }

    /// The number of recorded issues
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Whether there are no recorded issues
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Whether any issue for `entity` has a message containing `text`
    pub fn contains(&self, entity: &str, text: &str) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.entity == entity && issue.message.contains(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warn() {
        let mut report = ValidationReport::new();
        assert!(report.is_empty());

        report.warn("gas1", "Attribute charging_efficiency is not used");
        assert_eq!(report.len(), 1);
        assert!(report.contains("gas1", "charging_efficiency"));
        assert!(!report.contains("gas2", "charging_efficiency"));
        assert_eq!(
            report.iter().next().unwrap(),
            &ValidationIssue {
                entity: "gas1".into(),
                message: "Attribute charging_efficiency is not used".into()
            }
        );
    }
}
