//! Rollcall server binary.
//!
//! # Usage
//!
//! ```bash
//! rollcall-server --fixture crates/rollcall/fixtures/demo.json
//! rollcall-server --bind 0.0.0.0:8080 --fixture school.json --idle-timeout 120
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use rollcall::prelude::*;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Classroom attendance server
#[derive(Parser, Debug)]
#[command(name = "rollcall-server")]
#[command(about = "Token-passing classroom attendance server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    bind: String,

    /// JSON fixture with users, tokens, and classrooms
    #[arg(short, long)]
    fixture: PathBuf,

    /// Seconds a silent connection is kept open
    #[arg(long, default_value = "60")]
    idle_timeout: u64,

    /// Seconds a new connection has to send its handshake
    #[arg(long, default_value = "5")]
    handshake_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), RollcallError> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let fixture = Fixture::load(&args.fixture).await?;
    tracing::info!(
        fixture = %args.fixture.display(),
        users = fixture.users.len(),
        classrooms = fixture.classrooms.len(),
        "fixture loaded"
    );

    let server = RollcallServerBuilder::new()
        .bind(&args.bind)
        .handshake_timeout(Duration::from_secs(args.handshake_timeout))
        .idle_timeout(Duration::from_secs(args.idle_timeout))
        .build(fixture.authenticator(), fixture.directory(), MemoryStore::new())
        .await?;

    tokio::select! {
        result = server.run() => result,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("shutting down");
            Ok(())
        }
    }
}
