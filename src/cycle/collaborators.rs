use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::browser::page::BrowserPage;

// ============================================================================
// App runner
// ============================================================================

/// What the runner needs to know about the project under test.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
    pub root: PathBuf,
    /// URL the app is served on, when already known
    pub url: Option<String>,
}

/// Starts the application under test and reports when it is reachable.
pub trait AppRunner {
    /// Start the app and return its base URL.
    fn start(&mut self, project: &ProjectInfo) -> Result<String, String>;

    fn is_ready(&mut self) -> bool;
}

/// Runner for an app that is already being served: `start` just hands back
/// the URL and readiness is an HTTP probe.
pub struct HttpAppRunner {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpAppRunner {
    pub fn new(url: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::blocking::Client::new());
        Self {
            url: url.to_string(),
            client,
        }
    }
}

impl AppRunner for HttpAppRunner {
    fn start(&mut self, project: &ProjectInfo) -> Result<String, String> {
        if let Some(url) = &project.url {
            self.url = url.clone();
        }
        if self.url.is_empty() {
            return Err(format!("no URL known for project '{}'", project.name));
        }
        Ok(self.url.clone())
    }

    fn is_ready(&mut self) -> bool {
        match self.client.get(&self.url).send() {
            Ok(response) => response.status().as_u16() < 500,
            Err(e) => {
                debug!("{} not ready: {}", self.url, e);
                false
            }
        }
    }
}

// ============================================================================
// Screenshot sink
// ============================================================================

/// Receives milestone screenshots. Failures are never fatal.
pub trait ScreenshotSink {
    fn capture(&mut self, page: &mut dyn BrowserPage, name: &str) -> Option<PathBuf>;
}

/// Discards every screenshot.
pub struct NoScreenshots;

impl ScreenshotSink for NoScreenshots {
    fn capture(&mut self, _page: &mut dyn BrowserPage, _name: &str) -> Option<PathBuf> {
        None
    }
}

/// Writes `NNN_<name>.png` files into a directory.
pub struct DirectoryScreenshots {
    dir: PathBuf,
    counter: usize,
}

impl DirectoryScreenshots {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            counter: 0,
        }
    }
}

impl ScreenshotSink for DirectoryScreenshots {
    fn capture(&mut self, page: &mut dyn BrowserPage, name: &str) -> Option<PathBuf> {
        if let Err(e) = std::fs::create_dir_all(&self.dir) {
            warn!("cannot create screenshot dir {}: {}", self.dir.display(), e);
            return None;
        }
        self.counter += 1;
        let path = self
            .dir
            .join(format!("{:03}_{}.png", self.counter, sanitize_filename(name)));
        match page.screenshot(&path) {
            Ok(()) => Some(path),
            Err(e) => {
                warn!("screenshot '{}' failed: {}", name, e);
                None
            }
        }
    }
}

/// Sanitize a milestone name into a safe filename.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect::<String>()
        .to_lowercase()
}
