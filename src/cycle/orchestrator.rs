use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, info, warn};
use url::Url;

use crate::auth::credential::CredentialSource;
use crate::auth::strategy::{AuthConfig, AuthState, AuthStrategy};
use crate::browser::launcher::BrowserLauncher;
use crate::browser::page::BrowserPage;
use crate::crawler::cancel::CancellationToken;
use crate::crawler::crawler::{CrawlConfig, CrawlResult, PageVisitor, SiteCrawler};
use crate::crawler::url_utils::parse_base;
use crate::cycle::collaborators::{AppRunner, ProjectInfo, ScreenshotSink};
use crate::error::{BrowserError, TestFoxError};
use crate::interact::executor::{ExecutorConfig, InteractionExecutor};
use crate::interact::outcome::InteractionLog;
use crate::page::page_model::PageSnapshot;
use crate::report::report_model::{CycleReport, CycleStatus};
use crate::trace::logger::TraceLogger;

#[derive(Debug, Clone)]
pub struct CycleConfig {
    pub crawl: CrawlConfig,
    pub executor: ExecutorConfig,
    pub auth: AuthConfig,
    pub authenticate: bool,
    /// Fill forms and click elements on each crawled page
    pub interact: bool,
    pub submit_forms: bool,
    pub ready_timeout: Duration,
    pub ready_poll: Duration,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            crawl: CrawlConfig::default(),
            executor: ExecutorConfig::default(),
            auth: AuthConfig::default(),
            authenticate: true,
            interact: true,
            submit_forms: true,
            ready_timeout: Duration::from_secs(30),
            ready_poll: Duration::from_millis(500),
        }
    }
}

/// Closes the browser however the cycle ends.
struct BrowserGuard {
    page: Box<dyn BrowserPage>,
}

impl Drop for BrowserGuard {
    fn drop(&mut self) {
        if let Err(e) = self.page.close() {
            warn!("failed to close browser: {}", e);
        }
    }
}

/// Runs the executor over every page the crawler snapshots.
struct InteractionVisitor<'a> {
    executor: Option<InteractionExecutor>,
    submit_forms: bool,
    log: &'a mut InteractionLog,
    screenshots: &'a mut dyn ScreenshotSink,
    captured: Vec<PathBuf>,
}

impl PageVisitor for InteractionVisitor<'_> {
    fn visit(
        &mut self,
        page: &mut dyn BrowserPage,
        snapshot: &PageSnapshot,
    ) -> Result<Vec<String>, BrowserError> {
        let name = format!("page_{}", page_slug(&snapshot.url));
        self.captured.extend(self.screenshots.capture(page, &name));

        let Some(executor) = self.executor.as_mut() else {
            return Ok(Vec::new());
        };
        let filled = executor.fill_forms(page, snapshot, self.submit_forms)?;
        self.log.extend(filled);
        let clicked = executor.click_all_elements(page)?;
        self.log.extend(clicked);

        Ok(executor
            .take_discovered()
            .into_iter()
            .map(|s| s.url)
            .collect())
    }
}

fn page_slug(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.path().trim_matches('/').replace('/', "_"))
        .ok()
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "home".into())
}

/// Sequences start, auth, crawl and interaction for one cycle.
pub struct CycleOrchestrator<'a> {
    config: CycleConfig,
    runner: &'a mut dyn AppRunner,
    launcher: &'a mut dyn BrowserLauncher,
    credentials: &'a dyn CredentialSource,
    screenshots: &'a mut dyn ScreenshotSink,
    cancel: CancellationToken,
    tracer: Option<TraceLogger>,
}

impl<'a> CycleOrchestrator<'a> {
    pub fn new(
        config: CycleConfig,
        runner: &'a mut dyn AppRunner,
        launcher: &'a mut dyn BrowserLauncher,
        credentials: &'a dyn CredentialSource,
        screenshots: &'a mut dyn ScreenshotSink,
    ) -> Self {
        Self {
            config,
            runner,
            launcher,
            credentials,
            screenshots,
            cancel: CancellationToken::new(),
            tracer: None,
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_tracer(mut self, tracer: TraceLogger) -> Self {
        self.tracer = Some(tracer);
        self
    }

    /// Run one cycle.
    ///
    /// Setup failures (app never starts or becomes reachable, browser does
    /// not launch) return `Err`. Once the browser is up every outcome is a
    /// report; a browser crash yields status `Aborted` with partial results.
    pub fn run(&mut self, project: &ProjectInfo) -> Result<CycleReport, TestFoxError> {
        let started_at = Utc::now();

        let base_url = self.runner.start(project).map_err(TestFoxError::AppStart)?;
        self.wait_until_ready(&base_url)?;
        let base = parse_base(&base_url)?;

        let page = self.launcher.launch().map_err(TestFoxError::BrowserLaunch)?;
        let mut guard = BrowserGuard { page };

        let mut log = match self.tracer.take() {
            Some(tracer) => InteractionLog::with_tracer(tracer),
            None => InteractionLog::new(),
        };
        let mut report = CycleReport::new(base.as_str(), started_at);

        let status = match self.drive(guard.page.as_mut(), &base, &mut log, &mut report) {
            Ok(status) => status,
            Err(e) => {
                error!("browser failure, aborting cycle: {}", e);
                report.errors.push(format!("browser failure: {}", e));
                CycleStatus::Aborted
            }
        };
        drop(guard);

        let report = report.finish(status, log.into_entries());
        info!(
            "cycle {:?}: {} pages, {} interactions, {} errors",
            report.status,
            report.pages.len(),
            report.interactions.len(),
            report.errors.len()
        );
        Ok(report)
    }

    fn wait_until_ready(&mut self, url: &str) -> Result<(), TestFoxError> {
        let start = Instant::now();
        loop {
            if self.runner.is_ready() {
                return Ok(());
            }
            if start.elapsed() >= self.config.ready_timeout {
                return Err(TestFoxError::AppNotReady {
                    url: url.to_string(),
                    waited_ms: start.elapsed().as_millis(),
                });
            }
            std::thread::sleep(self.config.ready_poll);
        }
    }

    fn capture(&mut self, page: &mut dyn BrowserPage, name: &str, report: &mut CycleReport) {
        report.screenshots.extend(self.screenshots.capture(page, name));
    }

    fn drive(
        &mut self,
        page: &mut dyn BrowserPage,
        base: &Url,
        log: &mut InteractionLog,
        report: &mut CycleReport,
    ) -> Result<CycleStatus, BrowserError> {
        match page.goto(base.as_str(), self.config.crawl.nav_timeout) {
            Ok(()) => self.capture(page, "home", report),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => report.errors.push(format!("{}: {}", base, e)),
        }

        if self.config.authenticate {
            if self.cancel.is_cancelled() {
                return Ok(CycleStatus::Cancelled);
            }
            let credentials = self.credentials.credentials();
            let mut strategy = AuthStrategy::new(base.clone(), self.config.auth.clone());
            let outcome = strategy.authenticate(page, &credentials, log)?;
            match outcome.state {
                AuthState::LoginSucceeded => self.capture(page, "post-login", report),
                AuthState::RegistrationSucceeded => self.capture(page, "post-registration", report),
                _ => {
                    warn!("authentication exhausted all fallbacks");
                    report
                        .errors
                        .push("authentication failed: no credential or registration succeeded".into());
                }
            }
            report.auth = Some(outcome);
        }

        if self.cancel.is_cancelled() {
            return Ok(CycleStatus::Cancelled);
        }

        let mut crawler = SiteCrawler::new(base.clone(), self.config.crawl.clone())
            .with_cancellation(self.cancel.clone());
        let mut visitor = InteractionVisitor {
            executor: self
                .config
                .interact
                .then(|| InteractionExecutor::new(base.clone(), self.config.executor.clone())),
            submit_forms: self.config.submit_forms,
            log,
            screenshots: &mut *self.screenshots,
            captured: Vec::new(),
        };
        let mut crawl = CrawlResult::default();
        let outcome = crawler.crawl_into(page, &mut visitor, &mut crawl);
        report.screenshots.append(&mut visitor.captured);
        report.pages = crawl.pages;
        report.errors.extend(crawl.errors);
        outcome?;

        self.capture(page, "final", report);

        Ok(if crawl.cancelled {
            CycleStatus::Cancelled
        } else {
            CycleStatus::Completed
        })
    }
}
