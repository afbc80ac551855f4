//! The on-host message-queue primitive, and the thin wrapper this crate
//! builds on top of it.
//!
//! Per spec §6 this primitive is treated as an external collaborator: only
//! the contract matters (create/attach by name, a non-blocking send mode
//! that fails with "would block" when full and with "removed" when the
//! queue was destroyed, a receive that blocks until a message arrives or
//! the queue is destroyed, explicit destruction). This module backs that
//! contract with the real `posixmq` crate (POSIX message queues) rather
//! than a hand-rolled substitute.
//!
//! Framing: each `posixmq` message payload is one `bincode`-encoded
//! [`ControlMessage`] or [`ReplyMessage`].

use crate::error::MailboxError;
use crate::wire::{ControlMessage, ReplyMessage};
use posixmq::{OpenOptions, PosixMq};
use std::io;

/// Largest single queued message we ever frame: comfortably above a
/// worst-case `bincode`-encoded [`ControlMessage`] or [`ReplyMessage`]
/// (both bounded by `MAX_TEXT` + 2 * `MAX_NAME` plus framing overhead).
const MAX_MSG_LEN: usize = 1024;

/// How many messages a mailbox will hold before sends start failing.
///
/// Generous for the control mailbox (many clients, light traffic per
/// client); deliberately modest for a private reply mailbox so that a
/// wedged client's queue genuinely can fill up and exercise the
/// delivery-discipline drop path (spec §4.3/§7).
const CONTROL_QUEUE_DEPTH: usize = 64;
const REPLY_QUEUE_DEPTH: usize = 32;

fn classify_io_error(name: &str, err: io::Error) -> MailboxError {
    match err.kind() {
        io::ErrorKind::WouldBlock => MailboxError::WouldBlock(name.to_string()),
        io::ErrorKind::NotFound => MailboxError::Removed(name.to_string()),
        _ => MailboxError::Io(name.to_string(), err),
    }
}

/// A single POSIX mailbox, framed for either `ControlMessage` or `ReplyMessage` traffic.
pub struct Mailbox {
    name: String,
    queue: PosixMq,
}

impl Mailbox {
    /// Name this mailbox was opened/created under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server-side: create (or attach to an already-created) control mailbox.
    ///
    /// Blocking, read-write: the router both receives commands from it and
    /// (only during bring-up diagnostics) could in principle drain it.
    pub fn create_control(name: &str) -> Result<Self, MailboxError> {
        let queue = OpenOptions::readwrite()
            .create()
            .max_msg_len(MAX_MSG_LEN)
            .capacity(CONTROL_QUEUE_DEPTH)
            .open(name)
            .map_err(|e| classify_io_error(name, e))?;
        Ok(Mailbox { name: name.to_string(), queue })
    }

    /// Client-side: attach to the server's already-created control mailbox, write-only, blocking.
    pub fn attach_control(name: &str) -> Result<Self, MailboxError> {
        let queue = OpenOptions::writeonly()
            .open(name)
            .map_err(|e| classify_io_error(name, e))?;
        Ok(Mailbox { name: name.to_string(), queue })
    }

    /// Client-side: create this process's own private reply mailbox under a unique name.
    ///
    /// Blocking, read-write: the client's receiver thread blocks on it; no
    /// other process ever reads from it.
    pub fn create_private(name: &str) -> Result<Self, MailboxError> {
        let queue = OpenOptions::readwrite()
            .create_new()
            .max_msg_len(MAX_MSG_LEN)
            .capacity(REPLY_QUEUE_DEPTH)
            .open(name)
            .map_err(|e| classify_io_error(name, e))?;
        Ok(Mailbox { name: name.to_string(), queue })
    }

    /// Worker-side: open an existing reply mailbox, write-only, non-blocking,
    /// for exactly one delivery attempt.
    pub fn open_reply_nonblocking(name: &str) -> Result<Self, MailboxError> {
        let queue = OpenOptions::writeonly()
            .nonblocking()
            .open(name)
            .map_err(|e| classify_io_error(name, e))?;
        Ok(Mailbox { name: name.to_string(), queue })
    }

    /// Blocking send of a command (client -> server control mailbox).
    pub fn send_command(&self, msg: &ControlMessage) -> Result<(), MailboxError> {
        let bytes = bincode::serialize(msg)?;
        self.queue
            .send(0, &bytes)
            .map_err(|e| classify_io_error(&self.name, e))
    }

    /// Blocking receive of a command (server control mailbox).
    pub fn recv_command(&self) -> Result<ControlMessage, MailboxError> {
        let mut buf = vec![0u8; MAX_MSG_LEN];
        let (len, _priority) = self
            .queue
            .recv(&mut buf)
            .map_err(|e| classify_io_error(&self.name, e))?;
        Ok(bincode::deserialize(&buf[..len])?)
    }

    /// Non-blocking send of a reply. Callers must classify
    /// [`MailboxError::WouldBlock`] (drop + warn) and
    /// [`MailboxError::Removed`] (silently absorb) per spec §7.
    pub fn send_reply_nonblocking(&self, msg: &ReplyMessage) -> Result<(), MailboxError> {
        let bytes = bincode::serialize(msg)?;
        self.queue
            .send(0, &bytes)
            .map_err(|e| classify_io_error(&self.name, e))
    }

    /// Blocking receive of a reply (client private mailbox).
    pub fn recv_reply(&self) -> Result<ReplyMessage, MailboxError> {
        let mut buf = vec![0u8; MAX_MSG_LEN];
        let (len, _priority) = self
            .queue
            .recv(&mut buf)
            .map_err(|e| classify_io_error(&self.name, e))?;
        Ok(bincode::deserialize(&buf[..len])?)
    }

    /// Explicitly destroy a mailbox by name. Idempotent: a second call
    /// observes `NotFound` and is treated as already-gone.
    pub fn destroy(name: &str) {
        if let Err(e) = posixmq::remove_queue(name) {
            if e.kind() != io::ErrorKind::NotFound {
                log::warn!("failed to remove mailbox '{}': {}", name, e);
            }
        }
    }
}

/// A unique name for a client's private reply mailbox, namespaced by pid
/// (stable for the session, and unique enough in practice) and a
/// millisecond timestamp (guards against a rapid restart reusing a pid
/// before the old queue was unlinked).
pub fn private_mailbox_name(pid: u32) -> String {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("/chatroom-client-{}-{}", pid, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_mailbox_name_is_namespaced_by_pid() {
        let name = private_mailbox_name(1234);
        assert!(name.starts_with("/chatroom-client-1234-"));
    }

    #[test]
    fn classify_io_error_maps_known_kinds() {
        let would_block = io::Error::from(io::ErrorKind::WouldBlock);
        assert!(matches!(classify_io_error("/q", would_block), MailboxError::WouldBlock(_)));

        let not_found = io::Error::from(io::ErrorKind::NotFound);
        assert!(matches!(classify_io_error("/q", not_found), MailboxError::Removed(_)));

        let other = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(matches!(classify_io_error("/q", other), MailboxError::Io(_, _)));
    }
}
