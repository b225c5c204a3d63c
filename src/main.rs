//! Fingerplay Server
//!
//! Matchmaking and round-arbitration server for a wagering rock-paper-scissors
//! game.

use std::env;

use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use fingerplay::{Config, Server, VERSION};

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("failed to set tracing subscriber");

    info!("Fingerplay Server v{}", VERSION);

    let config_path = env::args().nth(1);
    let config = match config_path {
        Some(path) => match Config::load(&path) {
            Ok(config) => config,
            Err(err) => {
                error!(%path, error = %err, "failed to load config, falling back to defaults");
                Config::dev_default()
            }
        },
        None => {
            info!("no config path given, using development defaults");
            Config::dev_default()
        }
    };

    let server = match Server::build(config).await {
        Ok(server) => server,
        Err(err) => {
            error!(error = %err, "failed to build server");
            std::process::exit(1);
        }
    };

    if let Err(err) = server.run().await {
        error!(error = %err, "server exited with an error");
        std::process::exit(1);
    }
}
