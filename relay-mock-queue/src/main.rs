use relay_mock_queue::{MockState, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> std::io::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "relay_mock_queue=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Relay mock queue...");

    let service_id =
        std::env::var("MOCK_SERVICE_ID").unwrap_or_else(|_| "mock-service".to_string());
    let service_name =
        std::env::var("MOCK_SERVICE_NAME").unwrap_or_else(|_| "mock-algorithm".to_string());

    tracing::info!(service_id = %service_id, service_name = %service_name, "Serving one service");

    let app = create_router(MockState::new(service_id, service_name));

    let addr =
        std::env::var("MOCK_QUEUE_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}
