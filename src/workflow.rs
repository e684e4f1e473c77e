//! Intake Workflow
//!
//! The step state machine. A submission is accepted only for the instance's
//! current step, validated in full, written to the record store, and only
//! then committed in memory and advanced. Any failure before the store write
//! completes leaves the instance exactly as it was.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::config::IntakeConfig;
use crate::engine::FieldValidationEngine;
use crate::ids::{IdGenerator, UuidIdGenerator};
use crate::records::{ContactDetails, ContactInput, StepRecord, StepSubmission, SubRecord};
use crate::report::FieldErrors;
use crate::state::WorkflowInstance;
use crate::step::Step;
use crate::store::{InMemoryRecordStore, RecordKey, RecordStore, StoredRecord};
use crate::IntakeError;

/// Reserved error key for ordering/prerequisite rejections
pub const FLOW_ERROR_KEY: &str = "application_flow";

/// The workflow execution engine
pub struct IntakeWorkflow {
    engine: Arc<FieldValidationEngine>,
    store: Arc<dyn RecordStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

/// Collaborators for [`IntakeWorkflow`]; unset ones take in-process defaults
pub struct IntakeWorkflowBuilder {
    config: IntakeConfig,
    store: Option<Arc<dyn RecordStore>>,
    ids: Option<Arc<dyn IdGenerator>>,
    clock: Option<Arc<dyn Clock>>,
}

impl IntakeWorkflowBuilder {
    pub fn store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<IntakeWorkflow, IntakeError> {
        self.config.validate()?;
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        Ok(IntakeWorkflow {
            engine: Arc::new(FieldValidationEngine::new(
                Arc::new(self.config),
                clock.clone(),
            )),
            store: self
                .store
                .unwrap_or_else(|| Arc::new(InMemoryRecordStore::new())),
            ids: self.ids.unwrap_or_else(|| Arc::new(UuidIdGenerator)),
            clock,
        })
    }
}

impl IntakeWorkflow {
    pub fn builder(config: IntakeConfig) -> IntakeWorkflowBuilder {
        IntakeWorkflowBuilder {
            config,
            store: None,
            ids: None,
            clock: None,
        }
    }

    pub fn engine(&self) -> &FieldValidationEngine {
        &self.engine
    }

    /// Start a new instance on the first step
    pub fn start(&self) -> WorkflowInstance {
        let instance = WorkflowInstance::new(self.ids.next_id(), self.clock.now());
        info!(
            instance_id = %instance.id(),
            step = %instance.current_step(),
            "Intake started"
        );
        instance
    }

    /// Submit the payload for the instance's current step.
    ///
    /// Flow and validation rejections come back as `Ok` with
    /// `success == false`; only a failed store write is an `Err`, and in that
    /// case the instance is unchanged so the same submission can be retried.
    pub async fn submit(
        &self,
        instance: &mut WorkflowInstance,
        submission: StepSubmission,
    ) -> Result<SubmissionResult, IntakeError> {
        let step = submission.step();
        debug!(instance_id = %instance.id(), step = %step, "Submission received");

        if let Some(message) = flow_violation(instance, step) {
            warn!(
                instance_id = %instance.id(),
                step = %step,
                current_step = %instance.current_step(),
                "Submission rejected by flow check"
            );
            return Ok(SubmissionResult::flow_error(instance.current_step(), message));
        }

        let record = match self.engine.accept(&submission) {
            Ok(record) => record,
            Err(report) => {
                info!(
                    instance_id = %instance.id(),
                    step = %step,
                    error_count = report.error_count(),
                    "Submission failed validation"
                );
                return Ok(SubmissionResult::invalid(
                    instance.current_step(),
                    report.into_errors(),
                    SubmissionEcho::Step(submission),
                ));
            }
        };

        let key = RecordKey::step(instance.id(), step);
        self.persist(&key, StoredRecord::Step(record.clone()))
            .await?;

        let next_step = instance.commit_and_advance(record, self.clock.now());
        info!(
            instance_id = %instance.id(),
            step = %step,
            next_step = %next_step,
            "Step committed"
        );
        Ok(SubmissionResult::accepted(success_message(&submission), next_step))
    }

    /// Attach a contact to the instance without advancing its step
    pub async fn attach_contact(
        &self,
        instance: &mut WorkflowInstance,
        input: ContactInput,
    ) -> Result<SubmissionResult, IntakeError> {
        let current = instance.current_step();
        if !current.accepts_sub_records() {
            warn!(instance_id = %instance.id(), step = %current, "Contact rejected by flow check");
            return Ok(SubmissionResult::flow_error(
                current,
                format!("Currently on step: {}. Cannot add contacts.", current),
            ));
        }
        if let Some(prerequisite) = current.prerequisite() {
            if !instance.is_committed(prerequisite) {
                return Ok(SubmissionResult::flow_error(
                    current,
                    prerequisite_message(prerequisite),
                ));
            }
        }

        let contact = match self.engine.accept_contact(&input) {
            Ok(contact) => contact,
            Err(report) => {
                info!(
                    instance_id = %instance.id(),
                    error_count = report.error_count(),
                    "Contact failed validation"
                );
                return Ok(SubmissionResult::invalid(
                    current,
                    report.into_errors(),
                    SubmissionEcho::Contact(input),
                ));
            }
        };

        let sub_id = self.ids.next_id();
        let key = RecordKey::sub_record(instance.id(), &sub_id);
        self.persist(&key, StoredRecord::Contact(contact.clone()))
            .await?;

        instance.attach(
            SubRecord {
                id: sub_id.clone(),
                contact,
            },
            self.clock.now(),
        );
        info!(
            instance_id = %instance.id(),
            contact_count = instance.sub_records().len(),
            "Contact attached"
        );
        Ok(SubmissionResult::contact_added(current, sub_id))
    }

    /// Read a committed step record back from the store
    pub async fn load_record(
        &self,
        instance_id: &str,
        step: Step,
    ) -> Result<Option<StepRecord>, IntakeError> {
        let key = RecordKey::step(instance_id, step);
        match self.fetch(&key).await? {
            None => Ok(None),
            Some(StoredRecord::Step(record)) => Ok(Some(record)),
            Some(_) => Err(IntakeError::UnexpectedRecord(key)),
        }
    }

    /// Read an attached contact back from the store
    pub async fn load_contact(
        &self,
        instance_id: &str,
        sub_id: &str,
    ) -> Result<Option<ContactDetails>, IntakeError> {
        let key = RecordKey::sub_record(instance_id, sub_id);
        match self.fetch(&key).await? {
            None => Ok(None),
            Some(StoredRecord::Contact(contact)) => Ok(Some(contact)),
            Some(_) => Err(IntakeError::UnexpectedRecord(key)),
        }
    }

    async fn persist(&self, key: &RecordKey, record: StoredRecord) -> Result<(), IntakeError> {
        self.store.put(key, &record).await.map_err(|source| {
            error!(key = %key, error = %source, "Record store write failed");
            IntakeError::Store {
                key: key.clone(),
                source,
            }
        })
    }

    async fn fetch(&self, key: &RecordKey) -> Result<Option<StoredRecord>, IntakeError> {
        self.store
            .get(key)
            .await
            .map_err(|source| IntakeError::Store {
                key: key.clone(),
                source,
            })
    }
}

/// Why `step` may not be submitted right now, if it may not
fn flow_violation(instance: &WorkflowInstance, step: Step) -> Option<String> {
    let current = instance.current_step();
    if current.is_terminal() {
        return Some("Application already submitted; no further changes accepted.".to_string());
    }
    if step != current {
        return Some(format!(
            "Currently on step: {}. Cannot submit {}.",
            current,
            step.description()
        ));
    }
    if instance.is_committed(step) {
        return Some(format!("{} already submitted.", capitalize(step.description())));
    }
    match step.prerequisite() {
        Some(prerequisite) if !instance.is_committed(prerequisite) => {
            Some(prerequisite_message(prerequisite))
        }
        _ => None,
    }
}

fn prerequisite_message(prerequisite: Step) -> String {
    format!(
        "{} must be completed first.",
        capitalize(prerequisite.description())
    )
}

fn success_message(submission: &StepSubmission) -> &'static str {
    match submission {
        StepSubmission::PersonalDetails(_) => "Personal details successfully submitted.",
        StepSubmission::IdVerification(_) => {
            "Documents uploaded successfully. Proceeding to review."
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// The caller's original payload, returned on validation failure so a form
/// can be re-populated
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum SubmissionEcho {
    Step(StepSubmission),
    Contact(ContactInput),
}

/// Structured outcome of a submit or attach call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<FieldErrors>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echo: Option<SubmissionEcho>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
}

impl SubmissionResult {
    fn accepted(message: &str, next_step: Step) -> Self {
        Self {
            success: true,
            message: Some(message.to_string()),
            next_step: Some(next_step),
            current_step: None,
            errors: None,
            echo: None,
            record_id: None,
        }
    }

    fn contact_added(current_step: Step, record_id: String) -> Self {
        Self {
            success: true,
            message: Some("Contact added.".to_string()),
            next_step: None,
            current_step: Some(current_step),
            errors: None,
            echo: None,
            record_id: Some(record_id),
        }
    }

    fn flow_error(current_step: Step, message: String) -> Self {
        Self {
            success: false,
            message: None,
            next_step: None,
            current_step: Some(current_step),
            errors: Some(FieldErrors::from([(
                FLOW_ERROR_KEY.to_string(),
                vec![message],
            )])),
            echo: None,
            record_id: None,
        }
    }

    fn invalid(current_step: Step, errors: FieldErrors, echo: SubmissionEcho) -> Self {
        Self {
            success: false,
            message: None,
            next_step: None,
            current_step: Some(current_step),
            errors: Some(errors),
            echo: Some(echo),
            record_id: None,
        }
    }

    /// Rejected for ordering/prerequisite reasons rather than field content
    pub fn is_flow_error(&self) -> bool {
        self.errors
            .as_ref()
            .is_some_and(|errors| errors.contains_key(FLOW_ERROR_KEY))
    }

    /// Messages for one field, empty if none
    pub fn errors_for(&self, field: &str) -> &[String] {
        self.errors
            .as_ref()
            .and_then(|errors| errors.get(field))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
