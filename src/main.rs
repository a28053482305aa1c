use anyhow::Result;
use clap::Parser;

use relaycheck::cli::Cli;
use relaycheck::config::HarnessConfig;
use relaycheck::orchestrator;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(cli.get_log_level())
        .init();

    let mut config = HarnessConfig::load_with_env(&cli.config)?;
    cli.apply_overrides(&mut config);
    tracing::debug!("running with config: {:?}", config);

    let report = orchestrator::run(&config).await?;

    for outcome in &report.outcomes {
        match &outcome.outcome {
            Ok(result) => println!("{} ({}): ok {}", outcome.name, outcome.method, result),
            Err(reason) => println!("{} ({}): FAILED {}", outcome.name, outcome.method, reason),
        }
    }
    for failure in &report.cleanup_failures {
        println!("cleanup: FAILED {}", failure);
    }

    if report.passed() && report.cleanup_failures.is_empty() {
        println!("run {} passed", report.run_id);
        Ok(())
    } else {
        println!("run {} failed", report.run_id);
        std::process::exit(1);
    }
}
