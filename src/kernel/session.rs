use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of the transport, independent of the turn state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// What the candidate asked for when starting the interview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub candidate_name: String,
    pub job_role: String,
}

impl SessionRequest {
    pub fn new(candidate_name: impl Into<String>, job_role: impl Into<String>) -> Self {
        Self {
            candidate_name: candidate_name.into(),
            job_role: job_role.into(),
        }
    }
}

/// One confirmed interview conversation. Created on `session_created`,
/// dropped when the connection closes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub candidate_name: String,
    pub job_role: String,
    pub created_at: DateTime<Utc>,
    /// Set once the final report arrives: no new turns, finish current audio.
    pub wrapping_up: bool,
    /// Final evaluation payload, kept opaque.
    pub report: Option<serde_json::Value>,
    pub completed: bool,
}

impl Session {
    pub fn new(id: Option<String>, request: &SessionRequest) -> Self {
        Self {
            id: id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            candidate_name: request.candidate_name.clone(),
            job_role: request.job_role.clone(),
            created_at: Utc::now(),
            wrapping_up: false,
            report: None,
            completed: false,
        }
    }
}
