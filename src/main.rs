use anyhow::Context;
use duitku_gateway::api::{self, AppState};
use duitku_gateway::config::{Config, EnvConfigProvider, FileConfigProvider};
use duitku_gateway::database::{init_pool, order_repository::PgOrderRepository};
use duitku_gateway::payments::client::ReqwestSender;
use duitku_gateway::payments::providers::duitku::TemplateReturnUrl;
use duitku_gateway::payments::traits::ConfigProvider;
use duitku_gateway::DuitkuProvider;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env()?;

    tracing::info!("Starting Duitku gateway service");
    tracing::info!("Environment: {}", config.server.environment);

    let settings: Arc<dyn ConfigProvider> = match &config.gateway.settings_file {
        Some(path) => {
            tracing::info!("Gateway settings file: {}", path.display());
            Arc::new(FileConfigProvider::new(path.clone()))
        }
        None => {
            tracing::info!("Gateway settings from environment");
            Arc::new(EnvConfigProvider)
        }
    };

    let pool = init_pool(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;

    let sender = ReqwestSender::new(Duration::from_secs(config.gateway.http_timeout_secs))
        .context("Failed to build HTTP client")?;

    let provider = DuitkuProvider::new(
        settings.clone(),
        Arc::new(sender),
        Arc::new(PgOrderRepository::new(pool)),
        Arc::new(TemplateReturnUrl::new(settings)),
    );

    let state = AppState {
        gateway: Arc::new(provider),
        environment: config.server.environment.clone(),
    };

    let app = api::router(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let host: std::net::IpAddr = config
        .server
        .host
        .parse()
        .context("HOST must be an IP address")?;
    let addr = SocketAddr::new(host, config.server.port);
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,duitku_gateway=debug,tower_http=info"));

    let json = std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false);
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
