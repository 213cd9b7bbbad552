use std::path::Path;

use tracing::info;

use crate::auth::credential::{StaticCredentials, load_credentials};
use crate::browser::launcher::BrowserLauncher;
use crate::cli::config::{AppConfig, build_crawl_config, build_cycle_config, build_launcher};
use crate::crawler::cancel::CancellationToken;
use crate::crawler::crawler::{NoopVisitor, SiteCrawler};
use crate::crawler::url_utils::parse_base;
use crate::cycle::collaborators::{
    DirectoryScreenshots, HttpAppRunner, NoScreenshots, ProjectInfo, ScreenshotSink,
};
use crate::cycle::orchestrator::CycleOrchestrator;
use crate::error::TestFoxError;
use crate::report::console::{format_console_report, format_crawl_summary};
use crate::report::report_model::{CycleReport, CycleStatus};
use crate::trace::logger::TraceLogger;

// ============================================================================
// crawl subcommand
// ============================================================================

/// Crawl only, or crawl and interact without authenticating.
pub fn cmd_crawl(
    config: &AppConfig,
    url: &str,
    max_pages: Option<usize>,
    interact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    cancel.cancel_on_signals()?;

    if interact {
        let mut cycle_config = build_cycle_config(config, max_pages, false);
        cycle_config.submit_forms = false;
        let mut runner = HttpAppRunner::new(url);
        let mut launcher = build_launcher(config);
        let credentials = StaticCredentials::default();
        let mut screenshots = NoScreenshots;
        let report = CycleOrchestrator::new(
            cycle_config,
            &mut runner,
            &mut launcher,
            &credentials,
            &mut screenshots,
        )
        .with_cancellation(cancel)
        .run(&project_for(url))?;
        print!("{}", format_console_report(&report));
        return Ok(());
    }

    let base = parse_base(url)?;
    let crawl_config = build_crawl_config(config, max_pages);
    info!("crawling {} (max_pages={})", base, crawl_config.max_pages);

    let mut page = build_launcher(config)
        .launch()
        .map_err(TestFoxError::BrowserLaunch)?;
    let mut crawler = SiteCrawler::new(base, crawl_config).with_cancellation(cancel);
    let result = crawler.crawl(page.as_mut(), &mut NoopVisitor);
    page.close()?;

    print!("{}", format_crawl_summary(&result?));
    Ok(())
}

// ============================================================================
// cycle subcommand
// ============================================================================

pub struct CycleArgs<'a> {
    pub url: &'a str,
    pub credentials: Option<&'a str>,
    pub screenshots: Option<&'a str>,
    pub trace: Option<&'a str>,
    pub report: Option<&'a str>,
    pub max_pages: Option<usize>,
    pub no_auth: bool,
    pub format: &'a str,
}

/// Run one full cycle and return whether it completed without failures.
pub fn cmd_cycle(
    config: &AppConfig,
    args: &CycleArgs<'_>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let credentials = match args.credentials {
        Some(path) => load_credentials(Path::new(path))?,
        None => StaticCredentials::default(),
    };
    let mut screenshots: Box<dyn ScreenshotSink> = match args.screenshots {
        Some(dir) => Box::new(DirectoryScreenshots::new(dir)),
        None => Box::new(NoScreenshots),
    };

    let cancel = CancellationToken::new();
    cancel.cancel_on_signals()?;

    let cycle_config = build_cycle_config(config, args.max_pages, !args.no_auth);
    let mut runner = HttpAppRunner::new(args.url);
    let mut launcher = build_launcher(config);

    let mut orchestrator = CycleOrchestrator::new(
        cycle_config,
        &mut runner,
        &mut launcher,
        &credentials,
        screenshots.as_mut(),
    )
    .with_cancellation(cancel);
    if let Some(path) = args.trace {
        orchestrator = orchestrator.with_tracer(TraceLogger::new(path));
    }
    let report = orchestrator.run(&project_for(args.url))?;

    match args.format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print!("{}", format_console_report(&report)),
    }

    if let Some(path) = args.report {
        write_report(&report, Path::new(path))?;
        eprintln!("Report written to {}", path);
    }

    Ok(report.status == CycleStatus::Completed && report.failed_interactions() == 0)
}

fn write_report(report: &CycleReport, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|e| TestFoxError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(())
}

fn project_for(url: &str) -> ProjectInfo {
    ProjectInfo {
        name: url.to_string(),
        url: Some(url.to_string()),
        ..ProjectInfo::default()
    }
}
