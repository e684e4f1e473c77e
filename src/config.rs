//! Intake Configuration
//!
//! Allow-lists, limits and required-field sets supplied at construction time.
//! Loaded from YAML (`config/intake.yaml` style); any key left out keeps its
//! default.

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::path::Path;

use crate::step::Step;
use crate::validators::DEFAULT_DATE_FORMAT;

/// Required-field scope for contact sub-records
pub const CONTACT_SCOPE: &str = "contact";

/// Environment variable naming a YAML config file
pub const CONFIG_PATH_ENV: &str = "OB_INTAKE_CONFIG";

const MIB: u64 = 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntakeConfig {
    /// Declared media types a document may carry; order is used in messages
    pub accepted_media_types: Vec<String>,

    /// Upper bound on a document's size, inclusive
    pub max_size_bytes: u64,

    /// chrono format for date fields
    pub date_format: String,

    /// Mandatory fields keyed by step name (or `contact`)
    pub required_fields: BTreeMap<String, BTreeSet<String>>,

    /// Allowed values for the optional `gender` field
    pub genders: Vec<String>,

    /// Allowed values for a contact's `relationship`
    pub contact_relationships: Vec<String>,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            accepted_media_types: strings(&["image/jpeg", "image/png", "application/pdf"]),
            max_size_bytes: 5 * MIB,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            required_fields: default_required_fields(),
            genders: strings(&["female", "male", "non_binary", "prefer_not_to_say"]),
            contact_relationships: strings(&[
                "spouse", "partner", "parent", "child", "sibling", "friend", "other",
            ]),
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn default_required_fields() -> BTreeMap<String, BTreeSet<String>> {
    let set = |fields: &[&str]| fields.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>();
    BTreeMap::from([
        (
            Step::PersonalDetails.as_str().to_string(),
            set(&[
                "full_name",
                "date_of_birth",
                "residential_address",
                "email",
                "phone_number",
            ]),
        ),
        (
            Step::IdVerification.as_str().to_string(),
            set(&["primary_id_document", "proof_of_address_document"]),
        ),
        (
            CONTACT_SCOPE.to_string(),
            set(&["name", "relationship", "phone_number"]),
        ),
    ])
}

/// Whether a calendar date formatted with `format` parses back to itself
fn round_trips_date(format: &str) -> bool {
    if format.is_empty() || StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return false;
    }
    let Some(sample) = NaiveDate::from_ymd_opt(2001, 2, 3) else {
        return false;
    };
    // time fields make Display fail on a bare date
    let mut rendered = String::new();
    if write!(rendered, "{}", sample.format(format)).is_err() {
        return false;
    }
    NaiveDate::parse_from_str(&rendered, format).is_ok_and(|parsed| parsed == sample)
}

impl IntakeConfig {
    /// Load configuration from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: IntakeConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `OB_INTAKE_CONFIG` (a `.env` file is
    /// honoured), or fall back to defaults when unset
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => {
                tracing::debug!(path = %path, "Loading intake config");
                Self::load(path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Reject configurations no submission could pass
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accepted_media_types.is_empty() {
            return Err(ConfigError::Invalid(
                "accepted_media_types must not be empty".into(),
            ));
        }
        if self.max_size_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_size_bytes must be greater than zero".into(),
            ));
        }
        if !round_trips_date(&self.date_format) {
            return Err(ConfigError::Invalid(format!(
                "date_format '{}' is not a valid chrono format",
                self.date_format
            )));
        }
        for scope in self.required_fields.keys() {
            if scope != CONTACT_SCOPE && scope.parse::<Step>().is_err() {
                return Err(ConfigError::Invalid(format!(
                    "required_fields has unknown scope '{}'",
                    scope
                )));
            }
        }
        Ok(())
    }

    /// Whether `field` is mandatory within `scope` (a step name or `contact`)
    pub fn is_required(&self, scope: &str, field: &str) -> bool {
        self.required_fields
            .get(scope)
            .is_some_and(|fields| fields.contains(field))
    }

    pub fn accepts_media_type(&self, media_type: &str) -> bool {
        self.accepted_media_types.iter().any(|t| t == media_type)
    }

    /// Size limit as shown to applicants: whole MiB as `5MB`, otherwise bytes
    pub fn max_size_display(&self) -> String {
        if self.max_size_bytes % MIB == 0 {
            format!("{}MB", self.max_size_bytes / MIB)
        } else {
            format!("{} bytes", self.max_size_bytes)
        }
    }

    /// Accepted types as subtypes (`jpeg, png, pdf`)
    pub fn accepted_types_display(&self) -> String {
        self.accepted_media_types
            .iter()
            .map(|t| t.split_once('/').map(|(_, sub)| sub).unwrap_or(t.as_str()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
