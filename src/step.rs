//! Intake Steps
//!
//! The closed, ordered sequence of stages an application moves through.
//! Declaration order is the workflow order.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One stage of the intake workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    PersonalDetails,
    IdVerification,
    ReviewAndSubmit, // terminal
}

impl Step {
    /// All steps in workflow order
    pub const ALL: [Step; 3] = [
        Step::PersonalDetails,
        Step::IdVerification,
        Step::ReviewAndSubmit,
    ];

    pub fn first() -> Self {
        Self::ALL[0]
    }

    /// The step that follows this one, `None` at the terminal step
    pub fn next(&self) -> Option<Step> {
        match self {
            Self::PersonalDetails => Some(Self::IdVerification),
            Self::IdVerification => Some(Self::ReviewAndSubmit),
            Self::ReviewAndSubmit => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next().is_none()
    }

    /// Step whose record must be committed before this step accepts input
    pub fn prerequisite(&self) -> Option<Step> {
        match self {
            Self::PersonalDetails => None,
            Self::IdVerification => Some(Self::PersonalDetails),
            Self::ReviewAndSubmit => Some(Self::IdVerification),
        }
    }

    /// Whether child records (contacts) may be attached while on this step
    pub fn accepts_sub_records(&self) -> bool {
        matches!(self, Self::IdVerification)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PersonalDetails => "personal_details",
            Self::IdVerification => "id_verification",
            Self::ReviewAndSubmit => "review_and_submit",
        }
    }

    /// Human-readable name used in flow messages
    pub fn description(&self) -> &'static str {
        match self {
            Self::PersonalDetails => "personal details",
            Self::IdVerification => "identity documents",
            Self::ReviewAndSubmit => "review and submit",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StepParseError {
    #[error("Unknown intake step: {0}")]
    UnknownStep(String),
}

impl FromStr for Step {
    type Err = StepParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|step| step.as_str() == s)
            .ok_or_else(|| StepParseError::UnknownStep(s.to_string()))
    }
}
