//! Presence and message-relay server for multi-room chat.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000 --leave-mode immediate
//! ```

use std::{sync::Arc, time::Duration};

use clap::{Parser, ValueEnum};
use hiroba_server::{
    config::{CoordinatorConfig, DEFAULT_ROOM, LeaveMode, ServerConfig},
    domain::{DEFAULT_HISTORY_CAPACITY, RoomId},
    infrastructure::message_pusher::WebSocketMessagePusher,
    ui::Server,
    usecase::SessionCoordinator,
};
use hiroba_shared::{logger::setup_logger, time::SystemClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LeaveModeArg {
    /// Announce departure as soon as the connection drops
    Immediate,
    /// Hold presence for the grace period before announcing departure
    Grace,
}

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Presence and message-relay server for multi-room chat", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// How disconnects are turned into departures
    #[arg(long, value_enum, default_value_t = LeaveModeArg::Grace)]
    leave_mode: LeaveModeArg,

    /// Reconnect grace window in seconds (grace mode only)
    #[arg(long, default_value = "5")]
    grace_period_secs: u64,

    /// Messages retained per room for late joiners
    #[arg(long, default_value_t = DEFAULT_HISTORY_CAPACITY)]
    history_capacity: usize,

    /// Room used when a join event carries no room id
    #[arg(long, default_value = DEFAULT_ROOM)]
    default_room: String,

    /// Default log level, overridden by RUST_LOG
    #[arg(long, default_value = "debug")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> Result<ServerConfig, String> {
        let leave_mode = match self.leave_mode {
            LeaveModeArg::Immediate => LeaveMode::Immediate,
            LeaveModeArg::Grace => LeaveMode::Grace(Duration::from_secs(self.grace_period_secs)),
        };
        let default_room = RoomId::new(self.default_room)
            .map_err(|e| format!("invalid --default-room: {e}"))?;
        Ok(ServerConfig {
            host: self.host,
            port: self.port,
            default_room,
            coordinator: CoordinatorConfig {
                leave_mode,
                history_capacity: self.history_capacity,
            },
        })
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logger("hiroba_server", env!("CARGO_BIN_NAME"), &args.log_level);

    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };
    tracing::info!("Starting with {:?}", config.coordinator);

    // 1. MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::default());

    // 2. SessionCoordinator
    let coordinator = Arc::new(SessionCoordinator::new(
        message_pusher.clone(),
        Arc::new(SystemClock),
        config.coordinator,
    ));

    // 3. Server
    let server = Server::new(coordinator, message_pusher, config.default_room);
    if let Err(e) = server.run(config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
