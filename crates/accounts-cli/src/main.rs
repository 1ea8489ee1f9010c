//! Customer accounts CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;

use accounts_cli::app::App;
use accounts_cli::cli::Cli;
use accounts_cli::error::AppError;
use accounts_cli::telemetry;
use accounts_core::clock::SystemClock;
use accounts_core::rng::SystemRng;
use accounts_event_store::PgEventStore;
use accounts_event_store::config::run_migrations;
use clap::Parser;

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = cli.store_config()?;
    let pool = config.connect().await?;
    run_migrations(&pool).await?;

    let mut app = App::new(
        Arc::new(PgEventStore::new(pool)),
        Arc::new(SystemClock),
        Box::new(SystemRng),
        cli.retry_policy(),
        cli.deadline(),
    );
    let output = app.execute(cli.command).await?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    telemetry::init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "command failed");
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}
