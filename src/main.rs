use dotenvy::dotenv;
use habit_wrap::{
    config::{database, settings},
    core::reminder::{ReminderScheduler, TracingPushSender},
    errors::Result,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

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
    info!("Attempted to load .env file.");

    // 3. Load settings
    let settings = settings::load_default_settings()
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;

    // 4. Connect and make sure the schema exists
    if let Some(dir) = database::sqlite_parent_dir(&database::get_database_url()) {
        std::fs::create_dir_all(&dir)?;
    }
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Run the reminder loop until Ctrl-C
    let scheduler = ReminderScheduler::new(db, Arc::new(TracingPushSender), &settings.reminders);
    info!(
        interval_secs = settings.reminders.check_interval_secs,
        "Starting reminder scheduler"
    );
    scheduler
        .run(settings.reminders.check_interval(), async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await;

    info!("Shut down cleanly.");
    Ok(())
}
