use clap::Parser;
use testfox::cli::commands::{CycleArgs, cmd_crawl, cmd_cycle};
use testfox::cli::config::{Cli, Commands, load_config};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Commands::Crawl {
            url,
            max_pages,
            interact,
        } => {
            cmd_crawl(&config, &url, max_pages, interact)?;
        }
        Commands::Cycle {
            url,
            credentials,
            screenshots,
            trace,
            report,
            max_pages,
            no_auth,
            format,
        } => {
            let args = CycleArgs {
                url: &url,
                credentials: credentials.as_deref(),
                screenshots: screenshots.as_deref(),
                trace: trace.as_deref(),
                report: report.as_deref(),
                max_pages,
                no_auth,
                format: &format,
            };
            let clean = cmd_cycle(&config, &args)?;
            if !clean {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

// RUST_LOG wins over -v
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("testfox={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
