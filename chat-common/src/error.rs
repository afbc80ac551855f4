//! Typed library errors. `anyhow` is reserved for the two binaries' `main`.

use thiserror::Error;

/// Failures surfaced by the [`crate::mailbox::Mailbox`] abstraction.
///
/// Mirrors the `errno` branches `send_reply`/`msgrcv` in `main.c` handle
/// explicitly (`EIDRM` -> removed, `EAGAIN` -> would-block, anything else
/// -> other).
#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("mailbox '{0}' is full")]
    WouldBlock(String),

    #[error("mailbox '{0}' no longer exists")]
    Removed(String),

    #[error("mailbox '{0}' I/O error: {1}")]
    Io(String, #[source] std::io::Error),

    #[error("failed to encode/decode wire message: {0}")]
    Codec(#[from] bincode::Error),
}

/// Registry- and handler-level failures.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("server is full, connection rejected")]
    ServerFull,

    #[error("room limit reached, cannot join/create channel")]
    RoomLimitReached,

    #[error("you are not in a channel")]
    NotInChannel,
}
