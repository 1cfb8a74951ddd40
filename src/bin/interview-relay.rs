use std::time::Duration;

use clap::Parser;
use interview_relay::broker::sweep::loop_sweep_expired;
use interview_relay::server::server::{self, AppState};
use interview_relay::utils::config_loader;
use interview_relay::utils::logging;
use anyhow::Result;
use interview_relay::utils::logging::LogLevel;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "interview-relay.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level);

    // -------------------------------
    // 2. Build application state (secrets, token store, clients)
    // -------------------------------

    let state = AppState::from_config(&service_config).await?;

    // -------------------------------
    // 3. Start periodic token sweep
    // -------------------------------

    let sweeper = tokio::spawn(loop_sweep_expired(
        state.store.clone(),
        Duration::from_secs(service_config.tokens.sweep_interval_seconds),
    ));

    // -------------------------------
    // 4. Start http server (token issuance, relay, recording pass-through)
    // -------------------------------

    info!(
        upstream = %state.relay.upstream.url(),
        recording = state.recording.is_some(),
        "Service starting..."
    );
    let served = server::start(&service_config, state).await;

    // the server returns on ctrl-c; the sweeper would run forever
    sweeper.abort();
    served
}
