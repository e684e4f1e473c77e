//! Step Payloads and Records
//!
//! Two layers per step:
//! - Input: what the caller submitted, raw strings, possibly incomplete
//! - Record: the accepted, immutable value built only from a valid input
//!
//! Records are constructed exclusively by the validation engine; their
//! fields are private with read-only accessors.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::step::Step;

// =============================================================================
// INPUTS
// =============================================================================

/// Personal details form as submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalDetailsInput {
    pub full_name: String,
    pub date_of_birth: String,
    pub residential_address: String,
    pub email: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
}

/// An uploaded file as described by the transport layer (no content)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptorInput {
    pub filename: String,
    pub declared_media_type: String,
    pub size_bytes: u64,
}

impl DocumentDescriptorInput {
    pub fn new(
        filename: impl Into<String>,
        declared_media_type: impl Into<String>,
        size_bytes: u64,
    ) -> Self {
        Self {
            filename: filename.into(),
            declared_media_type: declared_media_type.into(),
            size_bytes,
        }
    }
}

/// Identity documents uploaded together; each key namespaces its own errors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentUploadInput {
    pub primary_id_document: Option<DocumentDescriptorInput>,
    pub proof_of_address_document: Option<DocumentDescriptorInput>,
}

impl DocumentUploadInput {
    pub const PRIMARY_ID_KEY: &'static str = "primary_id_document";
    pub const PROOF_OF_ADDRESS_KEY: &'static str = "proof_of_address_document";

    /// Both documents with their field keys, in reporting order
    pub fn slots(&self) -> [(&'static str, Option<&DocumentDescriptorInput>); 2] {
        [
            (Self::PRIMARY_ID_KEY, self.primary_id_document.as_ref()),
            (
                Self::PROOF_OF_ADDRESS_KEY,
                self.proof_of_address_document.as_ref(),
            ),
        ]
    }
}

/// Contact sub-record as submitted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactInput {
    pub name: String,
    pub relationship: String,
    pub phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Payload for one step, tagged by the step it targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum StepSubmission {
    PersonalDetails(PersonalDetailsInput),
    IdVerification(DocumentUploadInput),
}

impl StepSubmission {
    /// The step this payload is meant for
    pub fn step(&self) -> Step {
        match self {
            Self::PersonalDetails(_) => Step::PersonalDetails,
            Self::IdVerification(_) => Step::IdVerification,
        }
    }
}

// =============================================================================
// RECORDS
// =============================================================================

/// Accepted personal details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonalDetails {
    full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    date_of_birth: Option<NaiveDate>,
    residential_address: String,
    email: String,
    phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    gender: Option<String>,
}

impl PersonalDetails {
    pub(crate) fn new(
        full_name: String,
        date_of_birth: Option<NaiveDate>,
        residential_address: String,
        email: String,
        phone_number: String,
        gender: Option<String>,
    ) -> Self {
        Self {
            full_name,
            date_of_birth,
            residential_address,
            email,
            phone_number,
            gender,
        }
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn date_of_birth(&self) -> Option<NaiveDate> {
        self.date_of_birth
    }

    pub fn residential_address(&self) -> &str {
        &self.residential_address
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn gender(&self) -> Option<&str> {
        self.gender.as_deref()
    }
}

/// Accepted document descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDescriptor {
    filename: String,
    declared_media_type: String,
    size_bytes: u64,
}

impl DocumentDescriptor {
    pub(crate) fn from_input(input: &DocumentDescriptorInput) -> Self {
        Self {
            filename: input.filename.clone(),
            declared_media_type: input.declared_media_type.clone(),
            size_bytes: input.size_bytes,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn declared_media_type(&self) -> &str {
        &self.declared_media_type
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }
}

/// Accepted identity documents; absent only when the config makes a slot optional
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityDocuments {
    #[serde(skip_serializing_if = "Option::is_none")]
    primary_id: Option<DocumentDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proof_of_address: Option<DocumentDescriptor>,
}

impl IdentityDocuments {
    pub(crate) fn new(
        primary_id: Option<DocumentDescriptor>,
        proof_of_address: Option<DocumentDescriptor>,
    ) -> Self {
        Self {
            primary_id,
            proof_of_address,
        }
    }

    pub fn primary_id(&self) -> Option<&DocumentDescriptor> {
        self.primary_id.as_ref()
    }

    pub fn proof_of_address(&self) -> Option<&DocumentDescriptor> {
        self.proof_of_address.as_ref()
    }
}

/// Accepted contact
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDetails {
    name: String,
    relationship: String,
    phone_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
}

impl ContactDetails {
    pub(crate) fn new(
        name: String,
        relationship: String,
        phone_number: String,
        email: Option<String>,
    ) -> Self {
        Self {
            name,
            relationship,
            phone_number,
            email,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn relationship(&self) -> &str {
        &self.relationship
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

/// The committed record for one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepRecord {
    PersonalDetails(PersonalDetails),
    IdentityDocuments(IdentityDocuments),
}

impl StepRecord {
    /// The step this record was committed for
    pub fn step(&self) -> Step {
        match self {
            Self::PersonalDetails(_) => Step::PersonalDetails,
            Self::IdentityDocuments(_) => Step::IdVerification,
        }
    }

    pub fn as_personal_details(&self) -> Option<&PersonalDetails> {
        match self {
            Self::PersonalDetails(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_identity_documents(&self) -> Option<&IdentityDocuments> {
        match self {
            Self::IdentityDocuments(d) => Some(d),
            _ => None,
        }
    }
}

/// A child record attached to an instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubRecord {
    pub id: String,
    pub contact: ContactDetails,
}
