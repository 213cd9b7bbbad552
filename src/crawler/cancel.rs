use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::TestFoxError;

/// Cooperative stop signal shared between a cycle and whoever drives it.
/// Checked between crawl iterations and between cycle steps.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Cancel on the first SIGINT or SIGTERM; exit on the second.
    ///
    /// The listener thread runs for the rest of the process.
    #[cfg(unix)]
    pub fn cancel_on_signals(&self) -> Result<(), TestFoxError> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;
        use tracing::{info, warn};

        let mut signals =
            Signals::new([SIGINT, SIGTERM]).map_err(|e| TestFoxError::SignalSetup(e.to_string()))?;
        let token = self.clone();

        std::thread::Builder::new()
            .name("signal-handler".to_string())
            .spawn(move || {
                for sig in signals.forever() {
                    if token.is_cancelled() {
                        warn!(signal = sig, "second signal, exiting");
                        std::process::exit(130);
                    }
                    info!(signal = sig, "received signal, finishing the current page");
                    token.cancel();
                }
            })
            .map_err(|e| TestFoxError::SignalSetup(format!("failed to spawn signal handler: {}", e)))?;

        Ok(())
    }

    #[cfg(not(unix))]
    pub fn cancel_on_signals(&self) -> Result<(), TestFoxError> {
        Ok(())
    }
}
