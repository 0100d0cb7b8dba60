use chrono::Utc;
use dotenvy::dotenv;
use pharmacy_ledger::{
    config::{database, settings},
    core::{
        alerts,
        tenant::{self, Tenant},
    },
    errors::Result,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars can also be set externally
    dotenv().ok();

    // 3. Load the application configuration
    let app_config = settings::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;
    info!(
        expiry_alert_days = app_config.expiry_alert_days,
        "Successfully processed application configuration."
    );

    // 4. Connect and make sure the schema exists
    let db = database::create_connection(&app_config.database_url)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|_| info!("Database initialized successfully."))
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    // 5. Report the alert state of every organization
    let today = Utc::now().date_naive();
    for org in tenant::list_organizations(&db).await? {
        let summary =
            alerts::alert_summary(&db, Tenant::from(&org), today, app_config.expiry_alert_days)
                .await?;
        if summary.critical_count > 0 {
            warn!(
                organization = %org.name,
                low_stock = summary.low_stock_count,
                expiring = summary.expiring_count,
                expired = summary.critical_count,
                "Organization has expired batches"
            );
        } else {
            info!(
                organization = %org.name,
                low_stock = summary.low_stock_count,
                expiring = summary.expiring_count,
                "Alert summary"
            );
        }
    }

    Ok(())
}
