use citasalud::api::{start_server, ApiContext};
use citasalud::{config, db};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    citasalud::init_tracing();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let db_path = config::database_path();
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = db::sqlite::open_database(&db_path)?;
    tracing::info!(path = %db_path.display(), "Database opened");

    let ctx = ApiContext::new(conn);
    let server = start_server(ctx, config::bind_addr())
        .await
        .map_err(std::io::Error::other)?;
    tracing::info!(addr = %server.addr, "Ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
