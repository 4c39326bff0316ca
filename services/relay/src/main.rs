use relay::config::RelayConfig;
use relay::feed::FeedSupervisor;
use relay::relay::Relay;
use relay::server::{self, ServerState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let config = RelayConfig::from_env();
    tracing::info!(symbols = ?config.symbols, "starting depth relay");

    // Relay task owns the books and the subscription registry.
    let (relay, commands) = Relay::new(&config);
    tokio::spawn(relay.run());

    // One supervised upstream feed per configured symbol.
    for symbol in &config.symbols {
        let feed = FeedSupervisor::new(
            symbol.clone(),
            config.stream_url(symbol),
            commands.clone(),
            &config,
        );
        tokio::spawn(feed.run());
    }

    // Downstream subscriber endpoint.
    let app = server::router(ServerState::new(commands));
    let listener = TcpListener::bind(config.listen_addr).await?;

    tracing::info!("listening on {}", config.listen_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
