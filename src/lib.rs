//! Onboarding Intake
//!
//! Step-gated intake workflow: each step's submission is validated field by
//! field, and only a fully valid submission is stored and advances the
//! applicant to the next step.
//!
//! - [`validators`]: format predicates (email, phone, dates)
//! - [`engine`]: per-step rule evaluation producing a [`ValidationReport`]
//! - [`records`]: submitted inputs and the immutable records built from them
//! - [`state`]: per-applicant [`WorkflowInstance`]
//! - [`workflow`]: [`IntakeWorkflow`], the state machine tying it together
//! - [`store`]: keyed [`RecordStore`] persistence

pub mod clock;
pub mod config;
pub mod engine;
pub mod ids;
pub mod records;
pub mod report;
pub mod state;
pub mod step;
pub mod store;
pub mod validators;
pub mod workflow;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, IntakeConfig};
pub use engine::FieldValidationEngine;
pub use ids::{IdGenerator, SequentialIdGenerator, UuidIdGenerator};
pub use records::{
    ContactDetails, ContactInput, DocumentDescriptor, DocumentDescriptorInput,
    DocumentUploadInput, IdentityDocuments, PersonalDetails, PersonalDetailsInput, StepRecord,
    StepSubmission, SubRecord,
};
pub use report::{FieldErrors, ValidationReport};
pub use state::{ApplicationSummary, StateTransition, WorkflowInstance};
pub use step::Step;
pub use store::{
    InMemoryRecordStore, JsonFileRecordStore, RecordKey, RecordStore, StoreError, StoredRecord,
};
pub use workflow::{IntakeWorkflow, IntakeWorkflowBuilder, SubmissionEcho, SubmissionResult};

/// Errors that abort an intake operation.
///
/// Flow and validation failures are not errors: they come back as a
/// [`SubmissionResult`] with `success == false`.
#[derive(Debug, thiserror::Error)]
pub enum IntakeError {
    #[error("Record store failure for {key}: {source}")]
    Store {
        key: RecordKey,
        #[source]
        source: StoreError,
    },

    #[error("Unexpected record type under {0}")]
    UnexpectedRecord(RecordKey),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl IntakeError {
    /// Whether resubmitting the identical request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store { .. })
    }
}
