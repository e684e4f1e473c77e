//! Workflow State Types
//!
//! Per-applicant state: current step, committed records, attached contacts
//! and the transition history. Mutated only by [`IntakeWorkflow`](crate::IntakeWorkflow).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::records::{IdentityDocuments, PersonalDetails, StepRecord, SubRecord};
use crate::step::Step;

/// One applicant's in-progress intake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowInstance {
    /// Opaque id from the injected generator
    id: String,

    /// Step currently accepting input
    current_step: Step,

    /// Records committed per step, at most one each
    committed: BTreeMap<Step, StepRecord>,

    /// Child records in attachment order
    sub_records: Vec<SubRecord>,

    /// Step advances, oldest first
    history: Vec<StateTransition>,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkflowInstance {
    /// Create an instance positioned on the first step
    pub fn new(id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            current_step: Step::first(),
            committed: BTreeMap::new(),
            sub_records: Vec::new(),
            history: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn current_step(&self) -> Step {
        self.current_step
    }

    pub fn is_terminal(&self) -> bool {
        self.current_step.is_terminal()
    }

    pub fn committed_record(&self, step: Step) -> Option<&StepRecord> {
        self.committed.get(&step)
    }

    pub fn is_committed(&self, step: Step) -> bool {
        self.committed.contains_key(&step)
    }

    pub fn committed_records(&self) -> &BTreeMap<Step, StepRecord> {
        &self.committed
    }

    pub fn sub_records(&self) -> &[SubRecord] {
        &self.sub_records
    }

    pub fn history(&self) -> &[StateTransition] {
        &self.history
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Commit the record for the current step and move to the next one.
    ///
    /// Returns the new current step. The record's step must be the current
    /// step and must not already be committed; the terminal step never
    /// advances.
    pub(crate) fn commit_and_advance(&mut self, record: StepRecord, now: DateTime<Utc>) -> Step {
        let step = record.step();
        debug_assert_eq!(step, self.current_step);
        debug_assert!(!self.committed.contains_key(&step));

        self.committed.insert(step, record);
        self.updated_at = now;

        if let Some(next) = self.current_step.next() {
            self.history.push(StateTransition {
                from_step: self.current_step,
                to_step: next,
                transitioned_at: now,
            });
            self.current_step = next;
        }
        self.current_step
    }

    pub(crate) fn attach(&mut self, sub_record: SubRecord, now: DateTime<Utc>) {
        self.sub_records.push(sub_record);
        self.updated_at = now;
    }

    /// Snapshot of everything collected so far
    pub fn summary(&self) -> ApplicationSummary {
        ApplicationSummary {
            id: self.id.clone(),
            current_step: self.current_step,
            is_complete: self.is_terminal(),
            personal_details: self
                .committed_record(Step::PersonalDetails)
                .and_then(StepRecord::as_personal_details)
                .cloned(),
            identity_documents: self
                .committed_record(Step::IdVerification)
                .and_then(StepRecord::as_identity_documents)
                .cloned(),
            contacts: self.sub_records.clone(),
            history: self.history.clone(),
        }
    }
}

/// Record of a step advance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateTransition {
    pub from_step: Step,
    pub to_step: Step,
    pub transitioned_at: DateTime<Utc>,
}

/// Read-only view of an application for review screens
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationSummary {
    pub id: String,
    pub current_step: Step,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal_details: Option<PersonalDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_documents: Option<IdentityDocuments>,
    pub contacts: Vec<SubRecord>,
    pub history: Vec<StateTransition>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, hour, 0, 0).unwrap()
    }

    fn documents() -> StepRecord {
        StepRecord::IdentityDocuments(IdentityDocuments::new(None, None))
    }

    fn personal() -> StepRecord {
        StepRecord::PersonalDetails(PersonalDetails::new(
            "Alice Wonderland".into(),
            None,
            "123 Rabbit Hole".into(),
            "alice@wonderland.com".into(),
            "+447123456789".into(),
            None,
        ))
    }

    #[test]
    fn test_workflow_instance_creation() {
        let instance = WorkflowInstance::new("app-1", at(9));
        assert_eq!(instance.id(), "app-1");
        assert_eq!(instance.current_step(), Step::PersonalDetails);
        assert!(instance.committed_records().is_empty());
        assert!(instance.history().is_empty());
        assert_eq!(instance.created_at(), instance.updated_at());
    }

    #[test]
    fn test_commit_and_advance_records_history() {
        let mut instance = WorkflowInstance::new("app-1", at(9));

        let next = instance.commit_and_advance(personal(), at(10));
        assert_eq!(next, Step::IdVerification);
        assert!(instance.is_committed(Step::PersonalDetails));
        assert_eq!(instance.history().len(), 1);
        assert_eq!(instance.history()[0].from_step, Step::PersonalDetails);
        assert_eq!(instance.history()[0].to_step, Step::IdVerification);
        assert_eq!(instance.updated_at(), at(10));

        let next = instance.commit_and_advance(documents(), at(11));
        assert_eq!(next, Step::ReviewAndSubmit);
        assert!(instance.is_terminal());
    }

    #[test]
    fn test_summary_reflects_commits() {
        let mut instance = WorkflowInstance::new("app-1", at(9));
        assert!(instance.summary().personal_details.is_none());

        instance.commit_and_advance(personal(), at(10));
        let summary = instance.summary();
        assert_eq!(
            summary.personal_details.unwrap().full_name(),
            "Alice Wonderland"
        );
        assert!(!summary.is_complete);
        assert!(summary.identity_documents.is_none());
    }
}
