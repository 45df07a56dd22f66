//! Command line arguments.

use std::path::PathBuf;

use clap::Parser;
use relay_core::config::DEFAULT_CONFIG_FILE;

/// Workspace crates whose level follows `-v`.
const RELAY_CRATES: [&str; 6] = [
    "frigate_relay",
    "relay_core",
    "relay_dedup",
    "relay_media",
    "relay_telegram",
    "relay_orchestrator",
];

/// Frigate Relay - forward Frigate detections to Telegram topics
#[derive(Parser, Debug)]
#[command(name = "frigate-relay", version)]
#[command(about = "Relay Frigate detection events to Telegram")]
pub struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "FRIGATE_RELAY_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Verbose logging (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Default `EnvFilter` directives for a verbosity level.
pub fn log_filter(verbose: u8) -> String {
    let (level, deps) = match verbose {
        0 => ("info", "teloxide=warn,rumqttc=warn"),
        1 => ("debug", "teloxide=info,rumqttc=info"),
        _ => ("trace", "teloxide=debug,rumqttc=debug"),
    };

    let mut directives: Vec<String> = RELAY_CRATES
        .iter()
        .map(|name| format!("{}={}", name, level))
        .collect();
    directives.push(deps.to_string());
    directives.join(",")
}
