//! Layered configuration: CLI flags override environment variables, which
//! override an optional JSON config file, which falls back to the built-in
//! defaults from [`crate::limits`].
//!
//! Modeled directly on `servers/src/yahoo_logic/config.rs`'s `Config` /
//! `load_config`: a `clap::Parser` struct that also derives `Deserialize`
//! so the same shape can be read back out of a JSON override file. The
//! raw args struct (`ServerConfigArgs`) keeps every field `Option<T>` with
//! no `default_value` so "not set on the CLI or in the environment" is
//! distinguishable from "set to the built-in default" — `clap`'s own
//! `env` fallback already folds CLI and env-var precedence into one
//! optional value per field, leaving `resolve` to fill any remaining gaps
//! from the file overlay, then from `crate::limits`.

use crate::limits::{
    BROADCASTER_COUNT, CONTROL_QUEUE_NAME, DEFAULT_CHANNEL, INACTIVITY_TIMEOUT_SECS,
    MONITOR_INTERVAL_SECS,
};
use clap::Parser;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Raw CLI/env/file fields for the server, before defaults are applied.
#[derive(Parser, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", default)]
#[command(name = "chat-server", about = "Multi-user chatroom server")]
struct ServerConfigArgs {
    /// Optional JSON file overlaying these defaults (CLI flags/env vars still win).
    #[clap(long, env = "CHAT_CONFIG_PATH")]
    config_path: Option<PathBuf>,

    /// Well-known name of the control mailbox.
    #[clap(long, env = "CHAT_CONTROL_QUEUE")]
    control_queue_name: Option<String>,

    /// Number of worker threads in the broadcaster pool.
    #[clap(long, env = "CHAT_BROADCASTER_COUNT")]
    broadcaster_count: Option<usize>,

    /// Seconds of silence after which a client is evicted.
    #[clap(long, env = "CHAT_INACTIVITY_TIMEOUT_SECS")]
    inactivity_timeout_secs: Option<u64>,

    /// Seconds between inactivity sweeps.
    #[clap(long, env = "CHAT_MONITOR_INTERVAL_SECS")]
    monitor_interval_secs: Option<u64>,

    /// Name of the reserved, never-reaped default channel.
    #[clap(long, env = "CHAT_DEFAULT_CHANNEL")]
    default_channel: Option<String>,

    /// Directory log files are written to.
    #[clap(long, env = "CHAT_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// One of trace/debug/info/warn/error.
    #[clap(long, env = "CHAT_LOG_LEVEL")]
    log_level: Option<String>,
}

impl ServerConfigArgs {
    /// Fills every field left `None` here from `file`, then from the
    /// built-in defaults, producing the concrete config the rest of the
    /// server uses.
    fn resolve(self, file: ServerConfigArgs) -> ServerConfig {
        ServerConfig {
            control_queue_name: self
                .control_queue_name
                .or(file.control_queue_name)
                .unwrap_or_else(|| CONTROL_QUEUE_NAME.to_string()),
            broadcaster_count: self
                .broadcaster_count
                .or(file.broadcaster_count)
                .unwrap_or(BROADCASTER_COUNT),
            inactivity_timeout_secs: self
                .inactivity_timeout_secs
                .or(file.inactivity_timeout_secs)
                .unwrap_or(INACTIVITY_TIMEOUT_SECS),
            monitor_interval_secs: self
                .monitor_interval_secs
                .or(file.monitor_interval_secs)
                .unwrap_or(MONITOR_INTERVAL_SECS),
            default_channel: self
                .default_channel
                .or(file.default_channel)
                .unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
            log_dir: self.log_dir.or(file.log_dir).unwrap_or_else(|| PathBuf::from("./logs")),
            log_level: self.log_level.or(file.log_level).unwrap_or_else(|| "info".to_string()),
        }
    }
}

/// Resolved server bring-up configuration: every field concrete, CLI >
/// env > JSON file > built-in default.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub control_queue_name: String,
    pub broadcaster_count: usize,
    pub inactivity_timeout_secs: u64,
    pub monitor_interval_secs: u64,
    pub default_channel: String,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl ServerConfig {
    /// Parses CLI args/env vars, then overlays an optional JSON file for
    /// any field the CLI/env left unset, then falls back to defaults.
    pub fn load() -> Self {
        let cli = ServerConfigArgs::parse();
        let file = cli
            .config_path
            .as_ref()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|contents| serde_json::from_str::<ServerConfigArgs>(&contents).ok())
            .unwrap_or_default();
        cli.resolve(file)
    }
}

/// Client bring-up configuration.
#[derive(Parser, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
#[command(name = "chat-client", about = "Interactive chatroom client")]
pub struct ClientConfig {
    /// Well-known name of the server's control mailbox to attach to.
    #[clap(long, env = "CHAT_CONTROL_QUEUE", default_value = CONTROL_QUEUE_NAME)]
    pub control_queue_name: String,

    /// Directory log files are written to.
    #[clap(long, env = "CHAT_LOG_DIR", default_value = "./logs")]
    pub log_dir: PathBuf,

    /// One of trace/debug/info/warn/error.
    #[clap(long, env = "CHAT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl ClientConfig {
    pub fn load() -> Self {
        ClientConfig::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_defaults_match_limits() {
        let config = ServerConfigArgs::parse_from(["chat-server"]).resolve(ServerConfigArgs::default());
        assert_eq!(config.control_queue_name, CONTROL_QUEUE_NAME);
        assert_eq!(config.broadcaster_count, BROADCASTER_COUNT);
        assert_eq!(config.inactivity_timeout_secs, INACTIVITY_TIMEOUT_SECS);
        assert_eq!(config.monitor_interval_secs, MONITOR_INTERVAL_SECS);
        assert_eq!(config.default_channel, DEFAULT_CHANNEL);
    }

    #[test]
    fn server_config_cli_flags_override_defaults() {
        let config = ServerConfigArgs::parse_from([
            "chat-server",
            "--broadcaster-count",
            "8",
            "--control-queue-name",
            "/custom-control",
        ])
        .resolve(ServerConfigArgs::default());
        assert_eq!(config.broadcaster_count, 8);
        assert_eq!(config.control_queue_name, "/custom-control");
    }

    #[test]
    fn file_overlay_fills_gaps_the_cli_and_env_left_unset() {
        let cli = ServerConfigArgs::parse_from(["chat-server"]);
        let file = ServerConfigArgs { broadcaster_count: Some(6), ..Default::default() };
        let config = cli.resolve(file);
        assert_eq!(config.broadcaster_count, 6);
        // Fields the file also left unset still fall back to the built-in default.
        assert_eq!(config.control_queue_name, CONTROL_QUEUE_NAME);
    }

    #[test]
    fn cli_flag_wins_over_file_overlay() {
        let cli = ServerConfigArgs::parse_from(["chat-server", "--broadcaster-count", "8"]);
        let file = ServerConfigArgs { broadcaster_count: Some(6), ..Default::default() };
        let config = cli.resolve(file);
        assert_eq!(config.broadcaster_count, 8);
    }

    #[test]
    fn client_config_defaults_to_well_known_control_queue() {
        let config = ClientConfig::parse_from(["chat-client"]);
        assert_eq!(config.control_queue_name, CONTROL_QUEUE_NAME);
    }
}
