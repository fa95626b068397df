//! Headless multiplayer client
//!
//! Connects to a game server, logs in and keeps the world mirror running
//! without a renderer, printing world statistics once per second.
//!
//! Usage:
//! ```bash
//! cargo run --example headless_client -- 127.0.0.1 8080 Ann
//! ```
//!
//! Set `RUST_LOG=seaward_client=debug` to follow the session protocol.

use std::time::{Duration, Instant};

use seaward::client::{ClientConfig, Endpoint, GameSession};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args
        .next()
        .and_then(|port| port.parse().ok())
        .unwrap_or(8080);
    let name = args.next().unwrap_or_else(|| "headless".to_string());

    println!("Connecting to {}:{} as {}", host, port, name);

    let config = ClientConfig::default()
        .with_endpoint(Endpoint::new(host, port))
        .with_player_name(name);
    let render_interval = config.render_interval;
    let mut session = GameSession::multiplayer(config);

    if let Err(e) = session.start().await {
        eprintln!("Failed to start session: {}", e);
        return;
    }

    let mut render = tokio::time::interval(render_interval);
    let mut stats = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            event = session.next_event() => match event {
                Some(event) => session.handle_event(event),
                None => break,
            },
            _ = render.tick() => {
                session.render_tick(Instant::now());
            }
            _ = stats.tick() => {
                let world = session.world();
                println!(
                    "state={:?} ships={} cannonballs={} crates={} players={} sounds={}",
                    session.status().state,
                    world.ships().len(),
                    world.cannonballs().len(),
                    world.crates().len(),
                    world.players().len(),
                    session.sounds().active_count(),
                );
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Shutting down");
                break;
            }
        }
    }

    session.shutdown();
}
