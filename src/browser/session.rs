use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::browser::page::{BrowserPage, ElementHandle, LoadState};
use crate::error::BrowserError;

/// Request sent to the driver over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum BrowserRequest {
    Navigate { url: String, timeout_ms: u64 },
    CurrentUrl,
    Title,
    Query {
        selector: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        scope: Option<u64>,
        all: bool,
    },
    Click { handle: u64, timeout_ms: u64 },
    Fill { handle: u64, value: String },
    Check { handle: u64 },
    Select { handle: u64, index: usize },
    Press {
        #[serde(skip_serializing_if = "Option::is_none")]
        handle: Option<u64>,
        key: String,
    },
    Wait { state: LoadState, timeout_ms: u64 },
    Back { timeout_ms: u64 },
    Screenshot { path: String },
    Quit,
}

impl BrowserRequest {
    /// Name used in error messages.
    pub fn command_name(&self) -> &'static str {
        match self {
            BrowserRequest::Navigate { .. } => "navigate",
            BrowserRequest::CurrentUrl => "current_url",
            BrowserRequest::Title => "title",
            BrowserRequest::Query { .. } => "query",
            BrowserRequest::Click { .. } => "click",
            BrowserRequest::Fill { .. } => "fill",
            BrowserRequest::Check { .. } => "check",
            BrowserRequest::Select { .. } => "select",
            BrowserRequest::Press { .. } => "press",
            BrowserRequest::Wait { .. } => "wait",
            BrowserRequest::Back { .. } => "back",
            BrowserRequest::Screenshot { .. } => "screenshot",
            BrowserRequest::Quit => "quit",
        }
    }
}

/// Response received from the driver over stdout (one JSON line).
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Set when a driver-side wait expired
    #[serde(default)]
    pub timeout: bool,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub elements: Option<Vec<ElementHandle>>,
}

/// A persistent browser session backed by the Playwright driver script.
///
/// Launches a long-lived Node.js process that keeps one Chromium page open.
/// Commands are sent as NDJSON over stdin, responses read from stdout.
pub struct BrowserSession {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    script: String,
    closed: bool,
}

impl BrowserSession {
    /// Spawn `node <script>` and wait for the ready signal.
    pub fn launch(node: &str, script: &str, headless: bool) -> Result<Self, BrowserError> {
        let mut child = Command::new(node)
            .arg(script)
            .env("TESTFOX_HEADLESS", if headless { "1" } else { "0" })
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| BrowserError::SubprocessSpawn {
                script: script.to_string(),
                source: e,
            })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            BrowserError::SessionIO(format!("Failed to capture stdin of {}", script))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            BrowserError::SessionIO(format!("Failed to capture stdout of {}", script))
        })?;

        let mut session = BrowserSession {
            child,
            stdin,
            reader: BufReader::new(stdout),
            script: script.to_string(),
            closed: false,
        };

        let response = session.read_response("ready signal")?;
        if !response.ok || response.ready != Some(true) {
            return Err(BrowserError::SessionProtocol {
                command: "launch".into(),
                error: response
                    .error
                    .unwrap_or_else(|| format!("No ready signal from {}", script)),
            });
        }

        debug!("browser driver {} ready", script);
        Ok(session)
    }

    fn read_response(&mut self, context: &str) -> Result<BrowserResponse, BrowserError> {
        let mut line = String::new();
        self.reader.read_line(&mut line).map_err(|e| {
            BrowserError::SessionIO(format!("Failed to read from {}: {}", self.script, e))
        })?;

        if line.trim().is_empty() {
            return Err(BrowserError::SessionIO(format!(
                "Empty response from {} (process may have died)",
                self.script
            )));
        }

        serde_json::from_str(line.trim()).map_err(|e| BrowserError::JsonParse {
            context: format!("{} {}", self.script, context),
            source: e,
        })
    }

    /// Send a request and read the response.
    fn send(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, BrowserError> {
        if self.closed {
            return Err(BrowserError::Closed);
        }

        let json = serde_json::to_string(request).map_err(|e| BrowserError::JsonSerialize {
            context: "BrowserRequest".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json).map_err(|e| {
            BrowserError::SessionIO(format!("Failed to write to {}: {}", self.script, e))
        })?;
        self.stdin.flush().map_err(|e| {
            BrowserError::SessionIO(format!("Failed to flush {}: {}", self.script, e))
        })?;

        self.read_response(request.command_name())
    }

    /// Send a request and verify it succeeded.
    fn send_ok(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, BrowserError> {
        let response = self.send(request)?;
        if response.ok {
            return Ok(response);
        }
        let command = request.command_name().to_string();
        if response.timeout {
            let timeout_ms = match request {
                BrowserRequest::Navigate { timeout_ms, .. }
                | BrowserRequest::Click { timeout_ms, .. }
                | BrowserRequest::Wait { timeout_ms, .. }
                | BrowserRequest::Back { timeout_ms } => *timeout_ms,
                _ => 0,
            };
            return Err(BrowserError::Timeout {
                operation: command,
                timeout_ms,
            });
        }
        Err(BrowserError::SessionProtocol {
            command,
            error: response.error.unwrap_or_else(|| "Unknown error".into()),
        })
    }

    fn query_elements(
        &mut self,
        selector: &str,
        scope: Option<u64>,
        all: bool,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        let request = BrowserRequest::Query {
            selector: selector.to_string(),
            scope,
            all,
        };
        Ok(self.send_ok(&request)?.elements.unwrap_or_default())
    }

    fn quit(&mut self) {
        if self.closed {
            return;
        }
        // Best-effort: the process may already be gone
        let _ = self.send(&BrowserRequest::Quit);
        self.closed = true;
        if let Err(e) = self.child.wait() {
            warn!("failed to reap browser driver: {}", e);
        }
    }
}

fn millis(d: Duration) -> u64 {
    d.as_millis() as u64
}

impl BrowserPage for BrowserSession {
    fn goto(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Navigate {
            url: url.to_string(),
            timeout_ms: millis(timeout),
        })?;
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, BrowserError> {
        self.send_ok(&BrowserRequest::CurrentUrl)?
            .url
            .ok_or_else(|| BrowserError::SessionProtocol {
                command: "current_url".into(),
                error: "No URL in response".into(),
            })
    }

    fn title(&mut self) -> Result<String, BrowserError> {
        Ok(self.send_ok(&BrowserRequest::Title)?.title.unwrap_or_default())
    }

    fn query(&mut self, selector: &str) -> Result<Option<ElementHandle>, BrowserError> {
        Ok(self.query_elements(selector, None, false)?.into_iter().next())
    }

    fn query_all(&mut self, selector: &str) -> Result<Vec<ElementHandle>, BrowserError> {
        self.query_elements(selector, None, true)
    }

    fn query_within(
        &mut self,
        scope: &ElementHandle,
        selector: &str,
    ) -> Result<Vec<ElementHandle>, BrowserError> {
        self.query_elements(selector, Some(scope.handle), true)
    }

    fn click(&mut self, element: &ElementHandle, timeout: Duration) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Click {
            handle: element.handle,
            timeout_ms: millis(timeout),
        })?;
        Ok(())
    }

    fn fill(&mut self, element: &ElementHandle, value: &str) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Fill {
            handle: element.handle,
            value: value.to_string(),
        })?;
        Ok(())
    }

    fn check(&mut self, element: &ElementHandle) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Check {
            handle: element.handle,
        })?;
        Ok(())
    }

    fn select_option(&mut self, element: &ElementHandle, index: usize) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Select {
            handle: element.handle,
            index,
        })?;
        Ok(())
    }

    fn press(&mut self, element: Option<&ElementHandle>, key: &str) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Press {
            handle: element.map(|e| e.handle),
            key: key.to_string(),
        })?;
        Ok(())
    }

    fn wait_for_load_state(
        &mut self,
        state: LoadState,
        timeout: Duration,
    ) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Wait {
            state,
            timeout_ms: millis(timeout),
        })?;
        Ok(())
    }

    fn go_back(&mut self, timeout: Duration) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Back {
            timeout_ms: millis(timeout),
        })?;
        Ok(())
    }

    fn screenshot(&mut self, path: &Path) -> Result<(), BrowserError> {
        self.send_ok(&BrowserRequest::Screenshot {
            path: path.display().to_string(),
        })?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), BrowserError> {
        self.quit();
        Ok(())
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.quit();
    }
}
