use crate::crawler::crawler::CrawlResult;
use crate::interact::outcome::InteractionOutcome;
use crate::report::report_model::CycleReport;

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format a cycle report for terminal output.
///
/// Produces output like:
/// ```text
/// === TestFox cycle: http://localhost:3000/ ===
/// Auth: LoginSucceeded (1 attempt)
///
/// Pages (2):
///   http://localhost:3000/ — Home (1 forms, 3 links)
///   http://localhost:3000/about — About (0 forms, 1 links)
///
/// Failed interactions (1):
///   ✗ Click button.save — element is not visible
///
/// === Results: 12 succeeded, 1 failed, 0 errors in 4.2s (Completed) ===
/// ```
pub fn format_console_report(report: &CycleReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== TestFox cycle: {} ===\n", report.base_url));

    if let Some(auth) = &report.auth {
        out.push_str(&format!(
            "Auth: {:?} ({} attempt{})\n",
            auth.state,
            auth.login_attempts,
            if auth.login_attempts == 1 { "" } else { "s" }
        ));
    }

    out.push_str(&format!("\nPages ({}):\n", report.pages.len()));
    for page in &report.pages {
        out.push_str(&format!(
            "  {} \u{2014} {} ({} forms, {} links)\n",
            page.url,
            page.title,
            page.forms.len(),
            page.links.len()
        ));
    }

    let failures: Vec<&InteractionOutcome> =
        report.interactions.iter().filter(|o| !o.success).collect();
    if !failures.is_empty() {
        out.push_str(&format!("\nFailed interactions ({}):\n", failures.len()));
        for outcome in failures {
            out.push_str(&format!("  {}\n", format_outcome(outcome)));
        }
    }

    if !report.errors.is_empty() {
        out.push_str(&format!("\nErrors ({}):\n", report.errors.len()));
        for error in &report.errors {
            out.push_str(&format!("  [ERROR] {}\n", error));
        }
    }

    let secs = report.duration_ms() as f64 / 1000.0;
    out.push_str(&format!(
        "\n=== Results: {} succeeded, {} failed, {} errors in {:.1}s ({:?}) ===\n",
        report.succeeded_interactions(),
        report.failed_interactions(),
        report.errors.len(),
        secs,
        report.status
    ));

    out
}

/// Format a crawl-only result.
pub fn format_crawl_summary(result: &CrawlResult) -> String {
    let mut out = format!("Crawled {} pages\n", result.pages.len());
    for page in &result.pages {
        out.push_str(&format!(
            "  {} \u{2014} {} ({} forms, {} buttons, {} links, {} tables)\n",
            page.url,
            page.title,
            page.forms.len(),
            page.buttons.len(),
            page.links.len(),
            page.tables.len()
        ));
    }
    for error in &result.errors {
        out.push_str(&format!("  [ERROR] {}\n", error));
    }
    if result.cancelled {
        out.push_str("  (cancelled)\n");
    }
    out
}

/// One line per outcome: marker, action, element, error.
pub fn format_outcome(outcome: &InteractionOutcome) -> String {
    let marker = if outcome.success { "\u{2713}" } else { "\u{2717}" };
    let mut line = format!(
        "{} {:?} {}",
        marker,
        outcome.action,
        outcome.element.as_deref().unwrap_or("-")
    );
    if let Some(error) = &outcome.error {
        line.push_str(&format!(" \u{2014} {}", error));
    }
    line
}
