use dbproxy::ProxyConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dbproxy=info")),
        )
        .init();

    let config = ProxyConfig::from_env()?;
    if let Err(e) = dbproxy::serve(config).await {
        tracing::error!(error = %e, "dbproxy stopped");
        return Err(e.into());
    }
    Ok(())
}
