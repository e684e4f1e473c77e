//! Field Validation Engine
//!
//! Evaluates every rule for a submission and aggregates the failures into a
//! single [`ValidationReport`]. Per field the checks run in a fixed order:
//!
//! 1. mandatory: a required field that is blank gets one error and no further checks
//! 2. format: e.g. the date must parse under the configured format
//! 3. semantic: e.g. not in the future, email/phone shape, allow-list membership
//!
//! Records are only ever built here, and only from a valid report.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::{IntakeConfig, CONTACT_SCOPE};
use crate::records::{
    ContactDetails, ContactInput, DocumentDescriptor, DocumentDescriptorInput,
    DocumentUploadInput, IdentityDocuments, PersonalDetails, PersonalDetailsInput, StepRecord,
    StepSubmission,
};
use crate::report::ValidationReport;
use crate::step::Step;
use crate::validators::{display_date_format, is_future_date, is_valid_email, is_valid_phone, parse_date};

/// Stateless rule evaluation over configured allow-lists and limits
pub struct FieldValidationEngine {
    config: Arc<IntakeConfig>,
    clock: Arc<dyn Clock>,
}

impl FieldValidationEngine {
    pub fn new(config: Arc<IntakeConfig>, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &IntakeConfig {
        &self.config
    }

    /// Validate any step payload
    pub fn validate(&self, submission: &StepSubmission) -> ValidationReport {
        match self.accept(submission) {
            Ok(_) => ValidationReport::new(),
            Err(report) => report,
        }
    }

    /// Validate a payload and build its record when every rule passes
    pub fn accept(&self, submission: &StepSubmission) -> Result<StepRecord, ValidationReport> {
        match submission {
            StepSubmission::PersonalDetails(input) => self
                .accept_personal_details(input)
                .map(StepRecord::PersonalDetails),
            StepSubmission::IdVerification(input) => self
                .accept_documents(input)
                .map(StepRecord::IdentityDocuments),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Personal details
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn validate_personal_details(&self, input: &PersonalDetailsInput) -> ValidationReport {
        self.accept_personal_details(input).err().unwrap_or_default()
    }

    pub fn accept_personal_details(
        &self,
        input: &PersonalDetailsInput,
    ) -> Result<PersonalDetails, ValidationReport> {
        let scope = Step::PersonalDetails.as_str();
        let mut report = ValidationReport::new();

        let full_name = self.require(&mut report, scope, "full_name", &input.full_name);
        let residential_address = self.require(
            &mut report,
            scope,
            "residential_address",
            &input.residential_address,
        );

        let date_of_birth = self
            .require(&mut report, scope, "date_of_birth", &input.date_of_birth)
            .and_then(|dob| self.check_date_of_birth(&mut report, dob));

        let email = self.require(&mut report, scope, "email", &input.email);
        if let Some(email) = email {
            if !is_valid_email(email) {
                report.add_error("email", "Please enter a valid email address.");
            }
        }

        let phone_number = self.require(&mut report, scope, "phone_number", &input.phone_number);
        if let Some(phone) = phone_number {
            if !is_valid_phone(phone) {
                report.add_error("phone_number", "Please enter a valid phone number.");
            }
        }

        let gender = self.require(
            &mut report,
            scope,
            "gender",
            input.gender.as_deref().unwrap_or_default(),
        );
        if let Some(gender) = gender {
            check_allowed(&mut report, "gender", gender, &self.config.genders);
        }

        if !report.is_valid() {
            return Err(report);
        }

        Ok(PersonalDetails::new(
            owned(full_name),
            date_of_birth,
            owned(residential_address),
            owned(email),
            owned(phone_number),
            gender.map(str::to_string),
        ))
    }

    /// Format then semantic check; returns the parsed date only if both pass
    fn check_date_of_birth(
        &self,
        report: &mut ValidationReport,
        value: &str,
    ) -> Option<chrono::NaiveDate> {
        let format = &self.config.date_format;
        let Ok(date) = parse_date(value, format) else {
            report.add_error(
                "date_of_birth",
                format!(
                    "Invalid date of birth format. Please use {}.",
                    display_date_format(format)
                ),
            );
            return None;
        };
        if is_future_date(value, format, self.clock.today()) {
            report.add_error("date_of_birth", "Date of birth cannot be in the future.");
            return None;
        }
        Some(date)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Documents
    // ─────────────────────────────────────────────────────────────────────────────

    /// Validate one document under its caller-chosen field key.
    ///
    /// Media type and size are checked independently, so one file can collect
    /// both messages.
    pub fn validate_document(
        &self,
        field_key: &str,
        document: Option<&DocumentDescriptorInput>,
        required: bool,
    ) -> ValidationReport {
        let mut report = ValidationReport::new();
        let Some(document) = document else {
            if required {
                report.add_error(field_key, mandatory_message(field_key));
            }
            return report;
        };

        if !self.config.accepts_media_type(&document.declared_media_type) {
            report.add_error(
                field_key,
                format!(
                    "File type '{}' is not allowed. Accepted types: {}.",
                    document.declared_media_type,
                    self.config.accepted_types_display()
                ),
            );
        }
        if document.size_bytes > self.config.max_size_bytes {
            report.add_error(
                field_key,
                format!(
                    "File exceeds the maximum size limit of {}.",
                    self.config.max_size_display()
                ),
            );
        }
        report
    }

    /// Validate each uploaded document independently and merge the results
    pub fn validate_documents(&self, input: &DocumentUploadInput) -> ValidationReport {
        let scope = Step::IdVerification.as_str();
        input
            .slots()
            .into_iter()
            .map(|(key, doc)| self.validate_document(key, doc, self.config.is_required(scope, key)))
            .fold(ValidationReport::new(), ValidationReport::merged)
    }

    pub fn accept_documents(
        &self,
        input: &DocumentUploadInput,
    ) -> Result<IdentityDocuments, ValidationReport> {
        let report = self.validate_documents(input);
        if !report.is_valid() {
            return Err(report);
        }
        Ok(IdentityDocuments::new(
            input.primary_id_document.as_ref().map(DocumentDescriptor::from_input),
            input
                .proof_of_address_document
                .as_ref()
                .map(DocumentDescriptor::from_input),
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Contacts
    // ─────────────────────────────────────────────────────────────────────────────

    pub fn validate_contact(&self, input: &ContactInput) -> ValidationReport {
        self.accept_contact(input).err().unwrap_or_default()
    }

    pub fn accept_contact(&self, input: &ContactInput) -> Result<ContactDetails, ValidationReport> {
        let mut report = ValidationReport::new();

        let name = self.require(&mut report, CONTACT_SCOPE, "name", &input.name);

        let relationship =
            self.require(&mut report, CONTACT_SCOPE, "relationship", &input.relationship);
        if let Some(relationship) = relationship {
            check_allowed(
                &mut report,
                "relationship",
                relationship,
                &self.config.contact_relationships,
            );
        }

        let phone_number =
            self.require(&mut report, CONTACT_SCOPE, "phone_number", &input.phone_number);
        if let Some(phone) = phone_number {
            if !is_valid_phone(phone) {
                report.add_error("phone_number", "Please enter a valid phone number.");
            }
        }

        let email = self.require(
            &mut report,
            CONTACT_SCOPE,
            "email",
            input.email.as_deref().unwrap_or_default(),
        );
        if let Some(email) = email {
            if !is_valid_email(email) {
                report.add_error("email", "Please enter a valid email address.");
            }
        }

        if !report.is_valid() {
            return Err(report);
        }

        Ok(ContactDetails::new(
            owned(name),
            owned(relationship),
            owned(phone_number),
            email.map(str::to_string),
        ))
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────────

    /// Trimmed value if present. A blank required field gets its mandatory
    /// error and yields `None`, which skips the later checks for it.
    fn require<'a>(
        &self,
        report: &mut ValidationReport,
        scope: &str,
        field: &str,
        value: &'a str,
    ) -> Option<&'a str> {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(trimmed);
        }
        if self.config.is_required(scope, field) {
            report.add_error(field, mandatory_message(field));
        }
        None
    }
}

fn check_allowed(report: &mut ValidationReport, field: &str, value: &str, allowed: &[String]) {
    if !allowed.iter().any(|a| a == value) {
        report.add_error(
            field,
            format!("{} must be one of: {}.", field_label(field), allowed.join(", ")),
        );
    }
}

fn owned(value: Option<&str>) -> String {
    value.map(str::to_string).unwrap_or_default()
}

fn mandatory_message(field: &str) -> String {
    format!("{} is mandatory.", field_label(field))
}

/// Display label for a field key; unknown keys are title-cased
pub fn field_label(field: &str) -> String {
    let known = match field {
        "full_name" => Some("Full Name"),
        "date_of_birth" => Some("Date of Birth"),
        "residential_address" => Some("Residential Address"),
        "email" => Some("Email"),
        "phone_number" => Some("Phone Number"),
        "gender" => Some("Gender"),
        "name" => Some("Name"),
        "relationship" => Some("Relationship"),
        "primary_id_document" => Some("Primary ID Document"),
        "proof_of_address_document" => Some("Proof of Address Document"),
        _ => None,
    };
    if let Some(label) = known {
        return label.to_string();
    }
    field
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::NaiveDate;

    const MIB: u64 = 1024 * 1024;

    fn engine_with(config: IntakeConfig) -> FieldValidationEngine {
        let clock = FixedClock::on_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
        FieldValidationEngine::new(Arc::new(config), Arc::new(clock))
    }

    fn engine() -> FieldValidationEngine {
        engine_with(IntakeConfig::default())
    }

    fn alice() -> PersonalDetailsInput {
        PersonalDetailsInput {
            full_name: "Alice Wonderland".into(),
            date_of_birth: "1990-01-15".into(),
            residential_address: "123 Rabbit Hole, Wonderland, WN1 2AB".into(),
            email: "alice@wonderland.com".into(),
            phone_number: "+447123456789".into(),
            gender: None,
        }
    }

    fn doc(media_type: &str, size: u64) -> DocumentDescriptorInput {
        DocumentDescriptorInput::new("file", media_type, size)
    }

    #[test]
    fn test_valid_personal_details_build_record() {
        let record = engine().accept_personal_details(&alice()).unwrap();
        assert_eq!(record.full_name(), "Alice Wonderland");
        assert_eq!(
            record.date_of_birth(),
            NaiveDate::from_ymd_opt(1990, 1, 15)
        );
        assert_eq!(record.gender(), None);
    }

    #[test]
    fn test_missing_field_is_mandatory_error_only() {
        let input = PersonalDetailsInput {
            residential_address: "   ".into(),
            ..alice()
        };
        let report = engine().validate_personal_details(&input);
        assert!(!report.is_valid());
        assert_eq!(
            report.messages_for("residential_address"),
            ["Residential Address is mandatory."]
        );
        assert_eq!(report.errors().len(), 1);
    }

    #[test]
    fn test_mandatory_skips_format_checks() {
        let input = PersonalDetailsInput {
            email: String::new(),
            date_of_birth: String::new(),
            ..alice()
        };
        let report = engine().validate_personal_details(&input);
        assert_eq!(report.messages_for("email"), ["Email is mandatory."]);
        assert_eq!(
            report.messages_for("date_of_birth"),
            ["Date of Birth is mandatory."]
        );
    }

    #[test]
    fn test_all_invalid_fields_reported_together() {
        let input = PersonalDetailsInput {
            full_name: "Charlie Chaplin".into(),
            date_of_birth: "2050-12-25".into(),
            residential_address: "456 Silent Film St, Hollywood, CA 90028".into(),
            email: "charlie.com".into(),
            phone_number: "not-a-phone".into(),
            gender: None,
        };
        let report = engine().validate_personal_details(&input);
        assert_eq!(
            report.messages_for("date_of_birth"),
            ["Date of birth cannot be in the future."]
        );
        assert_eq!(
            report.messages_for("email"),
            ["Please enter a valid email address."]
        );
        assert_eq!(
            report.messages_for("phone_number"),
            ["Please enter a valid phone number."]
        );
        assert_eq!(report.error_count(), 3);
    }

    #[test]
    fn test_bad_date_format_names_expected_format() {
        let input = PersonalDetailsInput {
            date_of_birth: "15/01/1990".into(),
            ..alice()
        };
        let report = engine().validate_personal_details(&input);
        assert_eq!(
            report.messages_for("date_of_birth"),
            ["Invalid date of birth format. Please use YYYY-MM-DD."]
        );
    }

    #[test]
    fn test_date_format_follows_config() {
        let config = IntakeConfig {
            date_format: "%d/%m/%Y".into(),
            ..IntakeConfig::default()
        };
        let input = PersonalDetailsInput {
            date_of_birth: "15/01/1990".into(),
            ..alice()
        };
        assert!(engine_with(config.clone()).validate_personal_details(&input).is_valid());

        let report = engine_with(config).validate_personal_details(&alice());
        assert_eq!(
            report.messages_for("date_of_birth"),
            ["Invalid date of birth format. Please use DD/MM/YYYY."]
        );
    }

    #[test]
    fn test_gender_allow_list() {
        let input = PersonalDetailsInput {
            gender: Some("robot".into()),
            ..alice()
        };
        let report = engine().validate_personal_details(&input);
        assert_eq!(
            report.messages_for("gender"),
            ["Gender must be one of: female, male, non_binary, prefer_not_to_say."]
        );

        let input = PersonalDetailsInput {
            gender: Some("female".into()),
            ..alice()
        };
        let record = engine().accept_personal_details(&input).unwrap();
        assert_eq!(record.gender(), Some("female"));
    }

    #[test]
    fn test_optional_field_left_blank_is_skipped() {
        let mut config = IntakeConfig::default();
        config
            .required_fields
            .get_mut("personal_details")
            .unwrap()
            .remove("phone_number");
        let input = PersonalDetailsInput {
            phone_number: String::new(),
            ..alice()
        };
        let record = engine_with(config).accept_personal_details(&input).unwrap();
        assert_eq!(record.phone_number(), "");
    }

    #[test]
    fn test_document_type_not_allowed() {
        let report = engine().validate_document(
            "primary_id_document",
            Some(&doc(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                MIB,
            )),
            true,
        );
        assert_eq!(
            report.messages_for("primary_id_document"),
            ["File type 'application/vnd.openxmlformats-officedocument.wordprocessingml.document' is not allowed. Accepted types: jpeg, png, pdf."]
        );
    }

    #[test]
    fn test_document_size_limit_is_inclusive() {
        let e = engine();
        assert!(e
            .validate_document("doc", Some(&doc("image/png", 5 * MIB)), true)
            .is_valid());

        let report = e.validate_document("doc", Some(&doc("image/png", 6 * MIB)), true);
        assert_eq!(
            report.messages_for("doc"),
            ["File exceeds the maximum size limit of 5MB."]
        );
    }

    #[test]
    fn test_document_can_fail_both_checks() {
        let report = engine().validate_document("doc", Some(&doc("text/plain", 6 * MIB)), true);
        let messages = report.messages_for("doc");
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("File type 'text/plain' is not allowed"));
        assert!(messages[1].starts_with("File exceeds"));
    }

    #[test]
    fn test_missing_document() {
        let report = engine().validate_document("primary_id_document", None, true);
        assert_eq!(
            report.messages_for("primary_id_document"),
            ["Primary ID Document is mandatory."]
        );
        assert!(engine().validate_document("x", None, false).is_valid());
    }

    #[test]
    fn test_documents_merge_under_their_own_keys() {
        let input = DocumentUploadInput {
            primary_id_document: Some(doc("image/gif", MIB)),
            proof_of_address_document: Some(doc("application/pdf", 10 * MIB)),
        };
        let report = engine().validate_documents(&input);
        assert!(report.has_errors_for("primary_id_document"));
        assert!(report.has_errors_for("proof_of_address_document"));
        assert_eq!(report.error_count(), 2);
    }

    #[test]
    fn test_accept_documents() {
        let input = DocumentUploadInput {
            primary_id_document: Some(DocumentDescriptorInput::new(
                "passport.jpg",
                "image/jpeg",
                MIB,
            )),
            proof_of_address_document: Some(DocumentDescriptorInput::new(
                "utility_bill.pdf",
                "application/pdf",
                500 * 1024,
            )),
        };
        let docs = engine().accept_documents(&input).unwrap();
        assert_eq!(docs.primary_id().unwrap().filename(), "passport.jpg");
        assert_eq!(docs.proof_of_address().unwrap().size_bytes(), 500 * 1024);
    }

    #[test]
    fn test_contact_rules() {
        let input = ContactInput {
            name: "Mad Hatter".into(),
            relationship: "nemesis".into(),
            phone_number: "12".into(),
            email: Some("hatter@".into()),
        };
        let report = engine().validate_contact(&input);
        assert!(report.has_errors_for("relationship"));
        assert!(report.has_errors_for("phone_number"));
        assert!(report.has_errors_for("email"));
        assert!(!report.has_errors_for("name"));

        let input = ContactInput {
            name: "White Rabbit".into(),
            relationship: "friend".into(),
            phone_number: "+44 20 7946 0000".into(),
            email: None,
        };
        let contact = engine().accept_contact(&input).unwrap();
        assert_eq!(contact.relationship(), "friend");
        assert_eq!(contact.email(), None);
    }

    #[test]
    fn test_validate_dispatches_by_variant() {
        let submission = StepSubmission::PersonalDetails(alice());
        assert!(engine().validate(&submission).is_valid());

        let submission = StepSubmission::IdVerification(DocumentUploadInput::default());
        let report = engine().validate(&submission);
        assert_eq!(report.errors().len(), 2);
    }

    #[test]
    fn test_field_label_fallback() {
        assert_eq!(field_label("tax_residency_country"), "Tax Residency Country");
        assert_eq!(field_label("date_of_birth"), "Date of Birth");
    }
}
