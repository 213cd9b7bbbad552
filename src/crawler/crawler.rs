use std::collections::{HashSet, VecDeque};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::page::{BrowserPage, LoadState};
use crate::crawler::cancel::CancellationToken;
use crate::crawler::url_utils::{canonicalize, is_same_origin, resolve_href};
use crate::error::BrowserError;
use crate::page::page_model::PageSnapshot;
use crate::page::snapshot::snapshot_page;

// ============================================================================
// Crawl configuration and results
// ============================================================================

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Hard cap on distinct URLs navigated to, failures included
    pub max_pages: usize,
    pub nav_timeout: Duration,
    /// Best-effort network-idle wait after each navigation
    pub idle_timeout: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 20,
            nav_timeout: Duration::from_secs(8),
            idle_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResult {
    pub pages: Vec<PageSnapshot>,
    /// Canonical URLs in the order they were visited
    pub visited: Vec<String>,
    /// Pages that could not be loaded or snapshotted
    pub errors: Vec<String>,
    pub cancelled: bool,
}

/// Hook run on each freshly snapshotted page, with the browser still on it.
///
/// Returns URLs reached as side effects (clicks, submits) so the crawler can
/// queue them.
pub trait PageVisitor {
    fn visit(
        &mut self,
        page: &mut dyn BrowserPage,
        snapshot: &PageSnapshot,
    ) -> Result<Vec<String>, BrowserError>;
}

/// Visitor that only snapshots.
pub struct NoopVisitor;

impl PageVisitor for NoopVisitor {
    fn visit(
        &mut self,
        _page: &mut dyn BrowserPage,
        _snapshot: &PageSnapshot,
    ) -> Result<Vec<String>, BrowserError> {
        Ok(Vec::new())
    }
}

// ============================================================================
// Breadth-first crawler
// ============================================================================

/// FIFO traversal of the same-origin link graph from a base URL.
///
/// Links are queued in DOM order, so the visit order is deterministic for a
/// static site and may vary on pages that render links dynamically.
pub struct SiteCrawler {
    config: CrawlConfig,
    base: Url,
    cancel: CancellationToken,
    visited: HashSet<String>,
    queued: HashSet<String>,
    queue: VecDeque<String>,
}

impl SiteCrawler {
    pub fn new(base: Url, config: CrawlConfig) -> Self {
        Self {
            config,
            base,
            cancel: CancellationToken::new(),
            visited: HashSet::new(),
            queued: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn has_visited(&self, url: &str) -> bool {
        canonicalize(url).is_some_and(|u| self.visited.contains(&u))
    }

    fn enqueue(&mut self, url: &Url) {
        if !is_same_origin(&self.base, url.as_str()) {
            return;
        }
        let Some(canonical) = canonicalize(url.as_str()) else {
            return;
        };
        if self.visited.contains(&canonical) || !self.queued.insert(canonical.clone()) {
            return;
        }
        self.queue.push_back(canonical);
    }

    fn enqueue_links(&mut self, snapshot: &PageSnapshot) {
        for link in snapshot.navigation_links() {
            if let Some(resolved) = resolve_href(&snapshot.url, &link.href) {
                self.enqueue(&resolved);
            }
        }
    }

    /// Crawl from the base URL. Starts a fresh visited set every call.
    ///
    /// Per-page failures are recorded and skipped; only a dead browser
    /// aborts the crawl.
    pub fn crawl(
        &mut self,
        page: &mut dyn BrowserPage,
        visitor: &mut dyn PageVisitor,
    ) -> Result<CrawlResult, BrowserError> {
        let mut result = CrawlResult::default();
        self.crawl_into(page, visitor, &mut result)?;
        Ok(result)
    }

    /// Like [`crawl`](Self::crawl), but accumulates into a caller-owned
    /// result, which keeps everything gathered before a fatal error.
    pub fn crawl_into(
        &mut self,
        page: &mut dyn BrowserPage,
        visitor: &mut dyn PageVisitor,
        result: &mut CrawlResult,
    ) -> Result<(), BrowserError> {
        self.visited.clear();
        self.queued.clear();
        self.queue.clear();

        let base = self.base.clone();
        self.enqueue(&base);

        while let Some(url) = self.queue.pop_front() {
            if self.cancel.is_cancelled() {
                info!("crawl cancelled with {} URLs queued", self.queue.len() + 1);
                result.cancelled = true;
                break;
            }
            if self.visited.len() >= self.config.max_pages {
                break;
            }
            if !self.visited.insert(url.clone()) {
                continue;
            }
            result.visited.push(url.clone());

            debug!("visiting {}", url);
            if let Err(e) = page.goto(&url, self.config.nav_timeout) {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("skipping {}: {}", url, e);
                result.errors.push(format!("{}: {}", url, e));
                continue;
            }
            let _ = page.wait_for_load_state(LoadState::NetworkIdle, self.config.idle_timeout);

            // Redirects land somewhere else; never snapshot a page twice
            let landed = page.current_url().ok().and_then(|u| canonicalize(&u));
            if let Some(landed) = landed.filter(|l| *l != url) {
                if !is_same_origin(&self.base, &landed)
                    || self.visited.len() >= self.config.max_pages
                    || !self.visited.insert(landed.clone())
                {
                    debug!("{} redirected to {}, skipping", url, landed);
                    continue;
                }
            }

            let snapshot = match snapshot_page(page, &self.base) {
                Ok(s) => s,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("could not snapshot {}: {}", url, e);
                    result.errors.push(format!("{}: {}", url, e));
                    continue;
                }
            };

            self.enqueue_links(&snapshot);
            result.pages.push(snapshot);

            let index = result.pages.len() - 1;
            for side_url in visitor.visit(page, &result.pages[index])? {
                if let Ok(parsed) = Url::parse(&side_url) {
                    self.enqueue(&parsed);
                }
            }
        }

        info!(
            "crawl finished: {} pages, {} errors",
            result.pages.len(),
            result.errors.len()
        );
        Ok(())
    }
}
