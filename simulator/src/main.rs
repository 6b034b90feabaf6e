use anyhow::Context;
use clap::Parser;
use farkle_simulator::{Api, Simulator};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Number of players seated in the demo game.
    #[arg(long, default_value_t = 2)]
    players: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args
    let args = Args::parse();

    // Create logger
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let simulator = Arc::new(Simulator::new());

    // Seed one game so the server is usable out of the box. Rolls still
    // have to be scripted via Simulator::script_roll.
    let players: Vec<Uuid> = (0..args.players.max(1)).map(|_| Uuid::new_v4()).collect();
    let game_id = simulator.create_game(players.clone());
    info!(%game_id, "Created demo game");
    for (seat, player_id) in players.iter().enumerate() {
        info!(seat, %player_id, "Seated player");
    }

    let api = Api::new(simulator);
    let app = api.router();

    // Start server
    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("axum server error")?;

    Ok(())
}
