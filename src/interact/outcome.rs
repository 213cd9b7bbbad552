use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::trace::logger::TraceLogger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActionKind {
    Navigate,
    Click,
    Fill,
    Select,
    Check,
    Login,
    Register,
    SubmitForm,
}

/// One entry of the interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionOutcome {
    pub success: bool,
    pub action: ActionKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Destination when the action navigated away from the page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigated_to: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl InteractionOutcome {
    pub fn success(action: ActionKind, element: Option<&str>) -> Self {
        Self {
            success: true,
            action,
            element: element.map(str::to_string),
            error: None,
            navigated_to: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(action: ActionKind, element: Option<&str>, error: impl ToString) -> Self {
        Self {
            success: false,
            action,
            element: element.map(str::to_string),
            error: Some(error.to_string()),
            navigated_to: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_navigation(mut self, url: impl Into<String>) -> Self {
        self.navigated_to = Some(url.into());
        self
    }
}

/// Append-only, ordered history of every outcome in a cycle.
#[derive(Default)]
pub struct InteractionLog {
    entries: Vec<InteractionOutcome>,
    tracer: Option<TraceLogger>,
}

impl InteractionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mirror every appended outcome to a JSONL trace file.
    pub fn with_tracer(tracer: TraceLogger) -> Self {
        Self {
            entries: Vec::new(),
            tracer: Some(tracer),
        }
    }

    pub fn push(&mut self, outcome: InteractionOutcome) {
        if let Some(tracer) = &self.tracer {
            tracer.log(&outcome);
        }
        self.entries.push(outcome);
    }

    pub fn extend(&mut self, outcomes: impl IntoIterator<Item = InteractionOutcome>) {
        for outcome in outcomes {
            self.push(outcome);
        }
    }

    pub fn entries(&self) -> &[InteractionOutcome] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &InteractionOutcome> {
        self.entries.iter().filter(|o| !o.success)
    }

    pub fn into_entries(self) -> Vec<InteractionOutcome> {
        self.entries
    }
}
