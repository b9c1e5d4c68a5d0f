use dotenvy::dotenv;
use std::env;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use workforce_ledger::{
    Error, Result, Workforce,
    config::{database, settings},
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load ledger settings
    let settings = settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;
    info!(company = %settings.company.code, "Settings loaded");

    // 4. Connect and ensure the schema
    let database_url = database::get_database_url();
    let workforce = Workforce::connect(&database_url, settings)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Optional one-shot command
    let args: Vec<String> = env::args().skip(1).collect();
    match args.as_slice() {
        [] => info!("Ledger ready"),
        [command, month] if command == "generate-payroll" => {
            let run = workforce
                .generate_payroll(month)
                .await
                .inspect_err(|e| error!(code = e.code(), "Payroll generation failed: {}", e))?;
            let summary = workforce.payroll_summary(&run.month).await?;
            info!(
                month = %run.month,
                paid = run.records.len(),
                unchanged = run.unchanged,
                skipped = run.skipped_count(),
                total_payout = %summary.total_payout,
                "Payroll run complete"
            );
        }
        _ => {
            return Err(Error::Config {
                message: "usage: workforce-ledger [generate-payroll YYYY-MM]".to_string(),
            });
        }
    }

    Ok(())
}
