use crate::browser::page::BrowserPage;
use crate::browser::session::BrowserSession;
use crate::error::BrowserError;

/// Opens a fresh browser page for one cycle.
pub trait BrowserLauncher {
    fn launch(&mut self) -> Result<Box<dyn BrowserPage>, BrowserError>;
}

/// Launches `BrowserSession`s backed by the Node Playwright driver.
#[derive(Debug, Clone)]
pub struct NodeDriverLauncher {
    pub node: String,
    pub script: String,
    pub headless: bool,
}

impl Default for NodeDriverLauncher {
    fn default() -> Self {
        Self {
            node: "node".into(),
            script: "driver/browser_server.js".into(),
            headless: true,
        }
    }
}

impl BrowserLauncher for NodeDriverLauncher {
    fn launch(&mut self) -> Result<Box<dyn BrowserPage>, BrowserError> {
        let session = BrowserSession::launch(&self.node, &self.script, self.headless)?;
        Ok(Box::new(session))
    }
}
