use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::strategy::AuthConfig;
use crate::browser::launcher::NodeDriverLauncher;
use crate::crawler::crawler::CrawlConfig;
use crate::cycle::orchestrator::CycleConfig;
use crate::interact::executor::ExecutorConfig;

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "testfox",
    version,
    about = "Automated exploratory QA for web apps under development"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: testfox.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl a running app breadth-first and print what each page offers
    Crawl {
        /// Base URL of the running app
        #[arg(long)]
        url: String,

        /// Maximum pages to visit (config file value when omitted)
        #[arg(long)]
        max_pages: Option<usize>,

        /// Fill forms and click elements on each page
        #[arg(long, default_value_t = false)]
        interact: bool,
    },

    /// Run a full cycle: auth, crawl, interact, report
    Cycle {
        /// Base URL of the running app
        #[arg(long)]
        url: String,

        /// YAML file with discovered credentials
        #[arg(long)]
        credentials: Option<String>,

        /// Directory for milestone screenshots
        #[arg(long)]
        screenshots: Option<String>,

        /// JSONL file mirroring the interaction log
        #[arg(long)]
        trace: Option<String>,

        /// Write the full report as JSON to this file
        #[arg(long)]
        report: Option<String>,

        /// Maximum pages to visit (config file value when omitted)
        #[arg(long)]
        max_pages: Option<usize>,

        /// Skip login and registration
        #[arg(long, default_value_t = false)]
        no_auth: bool,

        /// Output format: console or json
        #[arg(long, default_value = "console")]
        format: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `testfox.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub crawl: CrawlSection,
    #[serde(default)]
    pub interact: InteractSection,
    #[serde(default)]
    pub driver: DriverSection,
    #[serde(default)]
    pub app: AppSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSection {
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_nav_timeout_ms")]
    pub nav_timeout_ms: u64,
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            max_pages: default_max_pages(),
            nav_timeout_ms: default_nav_timeout_ms(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractSection {
    #[serde(default = "default_click_timeout_ms")]
    pub click_timeout_ms: u64,
    #[serde(default = "default_settle_timeout_ms")]
    pub settle_timeout_ms: u64,
    #[serde(default = "default_max_clicks")]
    pub max_clicks_per_page: usize,
    #[serde(default = "default_true")]
    pub submit_forms: bool,
}

impl Default for InteractSection {
    fn default() -> Self {
        Self {
            click_timeout_ms: default_click_timeout_ms(),
            settle_timeout_ms: default_settle_timeout_ms(),
            max_clicks_per_page: default_max_clicks(),
            submit_forms: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverSection {
    #[serde(default = "default_node")]
    pub node: String,
    #[serde(default = "default_script")]
    pub script: String,
    #[serde(default = "default_true")]
    pub headless: bool,
}

impl Default for DriverSection {
    fn default() -> Self {
        Self {
            node: default_node(),
            script: default_script(),
            headless: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    #[serde(default = "default_ready_poll_ms")]
    pub ready_poll_ms: u64,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            ready_timeout_ms: default_ready_timeout_ms(),
            ready_poll_ms: default_ready_poll_ms(),
        }
    }
}

// Serde default helpers
fn default_max_pages() -> usize { 20 }
fn default_nav_timeout_ms() -> u64 { 8000 }
fn default_idle_timeout_ms() -> u64 { 3000 }
fn default_click_timeout_ms() -> u64 { 3000 }
fn default_settle_timeout_ms() -> u64 { 2000 }
fn default_max_clicks() -> usize { 50 }
fn default_true() -> bool { true }
fn default_node() -> String { "node".to_string() }
fn default_script() -> String { "driver/browser_server.js".to_string() }
fn default_ready_timeout_ms() -> u64 { 30_000 }
fn default_ready_poll_ms() -> u64 { 500 }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("testfox.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_else(|e| {
            warn!("ignoring malformed config {}: {}", config_path, e);
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

pub fn build_crawl_config(config: &AppConfig, max_pages: Option<usize>) -> CrawlConfig {
    CrawlConfig {
        max_pages: max_pages.unwrap_or(config.crawl.max_pages),
        nav_timeout: Duration::from_millis(config.crawl.nav_timeout_ms),
        idle_timeout: Duration::from_millis(config.crawl.idle_timeout_ms),
    }
}

pub fn build_executor_config(config: &AppConfig) -> ExecutorConfig {
    ExecutorConfig {
        click_timeout: Duration::from_millis(config.interact.click_timeout_ms),
        nav_timeout: Duration::from_millis(config.crawl.nav_timeout_ms),
        settle_timeout: Duration::from_millis(config.interact.settle_timeout_ms),
        max_clicks_per_page: config.interact.max_clicks_per_page,
    }
}

pub fn build_cycle_config(config: &AppConfig, max_pages: Option<usize>, authenticate: bool) -> CycleConfig {
    CycleConfig {
        crawl: build_crawl_config(config, max_pages),
        executor: build_executor_config(config),
        auth: AuthConfig {
            nav_timeout: Duration::from_millis(config.crawl.nav_timeout_ms),
            click_timeout: Duration::from_millis(config.interact.click_timeout_ms),
            ..AuthConfig::default()
        },
        authenticate,
        interact: true,
        submit_forms: config.interact.submit_forms,
        ready_timeout: Duration::from_millis(config.app.ready_timeout_ms),
        ready_poll: Duration::from_millis(config.app.ready_poll_ms),
    }
}

pub fn build_launcher(config: &AppConfig) -> NodeDriverLauncher {
    NodeDriverLauncher {
        node: config.driver.node.clone(),
        script: config.driver.script.clone(),
        headless: config.driver.headless,
    }
}
