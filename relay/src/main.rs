use relay::config::RelayConfig;
use relay::routes;
use relay::state::AppState;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = RelayConfig::from_env().expect("invalid relay configuration");
    let state = AppState::new(config.channel_capacity);

    let app = routes::app(state);
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind");

    tracing::info!(%addr, "relay listening");
    axum::serve(listener, app).await.expect("server failed");
}
