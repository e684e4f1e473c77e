//! Validation Report
//!
//! Per-field error aggregation. Messages for a field keep the order in which
//! the checks ran; merging two reports unions the keys and concatenates the
//! message lists.

use serde::Serialize;
use std::collections::BTreeMap;

/// Field name to ordered error messages
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Outcome of validating one submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    valid: bool,
    errors: FieldErrors,
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationReport {
    /// An empty (valid) report
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: FieldErrors::new(),
        }
    }

    /// Append a message for a field; the report becomes invalid
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors
            .entry(field.into())
            .or_default()
            .push(message.into());
        self.valid = false;
    }

    /// Fold another report into this one
    pub fn merge(&mut self, other: ValidationReport) {
        for (field, messages) in other.errors {
            self.errors.entry(field).or_default().extend(messages);
        }
        self.valid = self.errors.is_empty();
    }

    /// Builder form of [`merge`](Self::merge)
    pub fn merged(mut self, other: ValidationReport) -> Self {
        self.merge(other);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether any error has been recorded for `field`
    pub fn has_errors_for(&self, field: &str) -> bool {
        self.errors.get(field).is_some_and(|m| !m.is_empty())
    }

    /// Messages recorded for `field`, in check order
    pub fn messages_for(&self, field: &str) -> &[String] {
        self.errors.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn into_errors(self) -> FieldErrors {
        self.errors
    }

    /// Total number of messages across all fields
    pub fn error_count(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_report_is_valid() {
        let report = ValidationReport::new();
        assert!(report.is_valid());
        assert!(report.errors().is_empty());
        assert_eq!(report.error_count(), 0);
    }

    #[test]
    fn test_add_error_invalidates_and_keeps_order() {
        let mut report = ValidationReport::new();
        report.add_error("doc", "first");
        report.add_error("doc", "second");
        report.add_error("email", "bad");

        assert!(!report.is_valid());
        assert_eq!(report.messages_for("doc"), ["first", "second"]);
        assert!(report.has_errors_for("email"));
        assert!(!report.has_errors_for("phone_number"));
        assert_eq!(report.error_count(), 3);
    }

    #[test]
    fn test_merge_unions_keys_and_concatenates() {
        let mut a = ValidationReport::new();
        a.add_error("primary_id_document", "type");
        let mut b = ValidationReport::new();
        b.add_error("primary_id_document", "size");
        b.add_error("proof_of_address_document", "type");

        let merged = a.merged(b);
        assert!(!merged.is_valid());
        assert_eq!(merged.messages_for("primary_id_document"), ["type", "size"]);
        assert_eq!(merged.messages_for("proof_of_address_document"), ["type"]);
    }

    #[test]
    fn test_merge_of_valid_reports_stays_valid() {
        let merged = ValidationReport::new().merged(ValidationReport::new());
        assert!(merged.is_valid());
    }

    #[test]
    fn test_serializes_valid_flag_and_errors() {
        let mut report = ValidationReport::new();
        report.add_error("email", "Please enter a valid email address.");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["errors"]["email"][0], "Please enter a valid email address.");
    }
}
