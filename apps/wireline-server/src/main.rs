use wireline_server::{build_router_with_db_bootstrap, init_tracing, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env();
    let listen_addr = config.listen_addr();
    let router = build_router_with_db_bootstrap(&config).await?;

    tracing::info!(event = "server.listen", addr = %listen_addr);
    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
