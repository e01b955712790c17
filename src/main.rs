use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info};

use odds_scraper::app::App;
use odds_scraper::cli::Args;
use odds_scraper::logging;

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut app = match App::new().await {
        Ok(app) => app,
        Err(err) => {
            eprintln!("failed to initialize application: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    logging::setup_logging(app.config(), args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = if cfg!(debug_assertions) { "development" } else { "production" },
        port = app.config().port,
        enable_cron = app.config().enable_cron,
        "starting odds scraper"
    );

    app.setup_services();
    app.start_services();

    let exit_code = app.run().await;
    if exit_code != ExitCode::SUCCESS {
        error!("application exited with a non-success code");
    }
    exit_code
}
