use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::strategy::AuthOutcome;
use crate::interact::outcome::InteractionOutcome;
use crate::page::page_model::PageSnapshot;

// ============================================================================
// Cycle report: everything one discover-auth-crawl-interact run produced
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Completed,
    Cancelled,
    /// The browser died mid-cycle; results are partial
    Aborted,
}

/// Plain data handed to the reporting layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub base_url: String,
    pub status: CycleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthOutcome>,
    pub pages: Vec<PageSnapshot>,
    pub interactions: Vec<InteractionOutcome>,
    /// Recoverable problems, in the order they happened
    pub errors: Vec<String>,
    pub screenshots: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CycleReport {
    pub fn new(base_url: &str, started_at: DateTime<Utc>) -> Self {
        Self {
            base_url: base_url.to_string(),
            status: CycleStatus::Completed,
            auth: None,
            pages: Vec::new(),
            interactions: Vec::new(),
            errors: Vec::new(),
            screenshots: Vec::new(),
            started_at,
            finished_at: started_at,
        }
    }

    /// Seal the report with its final status and interaction log.
    pub fn finish(mut self, status: CycleStatus, interactions: Vec<InteractionOutcome>) -> Self {
        self.status = status;
        self.interactions = interactions;
        self.finished_at = Utc::now();
        self
    }

    pub fn succeeded_interactions(&self) -> usize {
        self.interactions.iter().filter(|o| o.success).count()
    }

    pub fn failed_interactions(&self) -> usize {
        self.interactions.len() - self.succeeded_interactions()
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}
