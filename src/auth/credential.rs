use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::TestFoxError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    Login,
    TestUser,
    Generated,
}

/// Ordered low to high so `Ord` ranks the best credential last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "type")]
    pub kind: CredentialKind,
    pub email: String,
    pub password: String,
    pub confidence: Confidence,
    #[serde(default)]
    pub source: String,
}

impl Credential {
    /// A fresh account identity for the registration fallback.
    pub fn synthesize() -> Self {
        let stamp = Utc::now().timestamp_millis();
        Self {
            kind: CredentialKind::Generated,
            email: format!("testfox.{}@example.com", stamp),
            password: format!("TestFox!{}Aa", stamp % 100_000),
            confidence: Confidence::Low,
            source: "generated".into(),
        }
    }

    /// Local part of the email, used where a username is asked for.
    pub fn username(&self) -> String {
        self.email
            .split('@')
            .next()
            .unwrap_or_default()
            .replace(['.', '+'], "_")
    }
}

/// Sort by confidence, highest first, keeping discovery order within a
/// confidence level, and drop repeated email/password pairs.
pub fn rank_credentials(credentials: &[Credential]) -> Vec<Credential> {
    let mut ranked: Vec<Credential> = Vec::with_capacity(credentials.len());
    for credential in credentials {
        let seen = ranked
            .iter()
            .any(|c| c.email == credential.email && c.password == credential.password);
        if !seen {
            ranked.push(credential.clone());
        }
    }
    ranked.sort_by(|a, b| b.confidence.cmp(&a.confidence));
    ranked
}

/// Read-only source of discovered credentials.
pub trait CredentialSource {
    fn credentials(&self) -> Vec<Credential>;
}

/// Credentials known up front.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials(pub Vec<Credential>);

impl CredentialSource for StaticCredentials {
    fn credentials(&self) -> Vec<Credential> {
        self.0.clone()
    }
}

/// Load a YAML list of credentials.
pub fn load_credentials(path: &Path) -> Result<StaticCredentials, TestFoxError> {
    let content = std::fs::read_to_string(path).map_err(|e| TestFoxError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let credentials: Vec<Credential> =
        serde_yaml::from_str(&content).map_err(|e| TestFoxError::Yaml {
            path: path.display().to_string(),
            source: e,
        })?;
    Ok(StaticCredentials(credentials))
}
