use chrono::{DateTime, Utc};
use customs_types::JobId;
use serde::{Deserialize, Serialize};

/// A registered classification job and its operator flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: JobId,
    /// Free-text product description supplied by the user
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intended_use: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub abort_requested: bool,
}

impl JobRecord {
    pub fn new(job_id: JobId, description: impl Into<String>) -> Self {
        Self {
            job_id,
            description: description.into(),
            destination_country: None,
            intended_use: None,
            created_at: Utc::now(),
            abort_requested: false,
        }
    }

    pub fn with_destination(mut self, country: impl Into<String>) -> Self {
        self.destination_country = Some(country.into());
        self
    }

    pub fn with_intended_use(mut self, intended_use: impl Into<String>) -> Self {
        self.intended_use = Some(intended_use.into());
        self
    }
}
