//! Static capacity and timing constants shared by the server and the client.
//!
//! These mirror `project_defs.h` from the original implementation: small,
//! fixed caps are acceptable because the registry is scanned linearly
//! (O(MAX_CLIENTS) / O(MAX_CHANNELS)), not indexed.

/// Well-known name of the server's control mailbox (overridable via config).
pub const CONTROL_QUEUE_NAME: &str = "/chatroom-control";

/// Number of worker threads in the broadcaster pool.
pub const BROADCASTER_COUNT: usize = 4;

/// Maximum length, in bytes, of a message body (`MSG`/`DM`/`WHO` reply text).
pub const MAX_TEXT: usize = 256;

/// Maximum length, in bytes, of a channel name or a formatted user label.
pub const MAX_NAME: usize = 32;

/// Maximum number of simultaneously registered clients.
pub const MAX_CLIENTS: usize = 10;

/// Maximum number of simultaneously existing rooms (including `#general`).
pub const MAX_CHANNELS: usize = 5;

/// Seconds of silence after which a client is evicted by the monitor.
pub const INACTIVITY_TIMEOUT_SECS: u64 = 120;

/// Cadence, in seconds, at which the monitor sweeps the registry.
pub const MONITOR_INTERVAL_SECS: u64 = 10;

/// The reserved channel every client starts outside of and that is never reaped.
pub const DEFAULT_CHANNEL: &str = "#general";
