//! Wire records exchanged between client and server over mailboxes.
//!
//! These are the Rust equivalents of `CommandMessage` and `ReplyMessage` in
//! `project_defs.h`: framed with `bincode` and carried as the payload of a
//! `posixmq` message. The `mtype` tag is kept on the wire (rather than
//! dropped as redundant) because it is part of the contract in spec §6 and
//! because it lets a single log line or capture dump distinguish the two
//! record kinds without knowing which queue it came from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Message-type tag for a client -> server command, carried on the control mailbox.
pub const MSG_TYPE_COMMAND: u32 = 1;

/// Message-type tag for a server -> client reply, carried on a private mailbox.
pub const MSG_TYPE_BROADCAST: u32 = 2;

/// Opaque, stable identity of a registered client.
///
/// Backed by the client process's OS pid, exactly as the original source's
/// `pid_t sender_pid` — each client is genuinely a separate process talking
/// to the server over a named POSIX mailbox, so the pid is both stable for
/// the session and trivially available without extra bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientHandle(pub u32);

impl fmt::Display for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ClientHandle {
    /// The handle of the calling process, used by the client binary at startup.
    pub fn current_process() -> Self {
        ClientHandle(std::process::id())
    }
}

/// The command a client is issuing, one variant per grammar line in §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandKind {
    Register,
    Join,
    Msg,
    Dm,
    Who,
    Leave,
    Quit,
}

/// A client -> server control record (the `CommandMessage` of `project_defs.h`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlMessage {
    /// Always [`MSG_TYPE_COMMAND`] on the wire; kept for contract fidelity.
    pub mtype: u32,
    pub kind: CommandKind,
    pub sender: ClientHandle,
    /// Name of the sender's private reply mailbox.
    pub reply_mailbox: String,
    /// Target channel for JOIN/MSG(implicit)/WHO. Empty when not applicable.
    pub channel: String,
    /// Target identifier for DM (the peer's [`ClientHandle`] as a string). Empty otherwise.
    pub target: String,
    /// Free text payload for MSG/DM. Empty otherwise.
    pub text: String,
}

impl ControlMessage {
    /// Builds a command with empty channel/target/text, filled in by the caller.
    pub fn new(kind: CommandKind, sender: ClientHandle, reply_mailbox: impl Into<String>) -> Self {
        ControlMessage {
            mtype: MSG_TYPE_COMMAND,
            kind,
            sender,
            reply_mailbox: reply_mailbox.into(),
            channel: String::new(),
            target: String::new(),
            text: String::new(),
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }
}

/// A server -> client reply record (the `ReplyMessage` of `project_defs.h`).
///
/// The `sender` label (`[#room] User 123`, `(DM from 123)`, `SERVER`, ...) is
/// part of the wire contract: the client displays it verbatim (§9, "Unicast
/// sender label").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    /// Always [`MSG_TYPE_BROADCAST`] on the wire; kept for contract fidelity.
    pub mtype: u32,
    pub sender: String,
    pub text: String,
}

impl ReplyMessage {
    pub fn new(sender: impl Into<String>, text: impl Into<String>) -> Self {
        ReplyMessage {
            mtype: MSG_TYPE_BROADCAST,
            sender: sender.into(),
            text: text.into(),
        }
    }

    /// Server-authored system replies (errors, confirmations, notices) all share this label.
    pub fn server(text: impl Into<String>) -> Self {
        ReplyMessage::new("SERVER", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_message_builders_compose() {
        let msg = ControlMessage::new(CommandKind::Dm, ClientHandle(7), "/reply-7")
            .with_target("42")
            .with_text("hello");
        assert_eq!(msg.mtype, MSG_TYPE_COMMAND);
        assert_eq!(msg.sender, ClientHandle(7));
        assert_eq!(msg.target, "42");
        assert_eq!(msg.text, "hello");
        assert_eq!(msg.channel, "");
    }

    #[test]
    fn reply_message_server_uses_server_label() {
        let reply = ReplyMessage::server("Error: Server is full. Connection rejected.");
        assert_eq!(reply.mtype, MSG_TYPE_BROADCAST);
        assert_eq!(reply.sender, "SERVER");
    }

    #[test]
    fn client_handle_round_trips_through_bincode() {
        let handle = ClientHandle::current_process();
        let encoded = bincode::serialize(&handle).unwrap();
        let decoded: ClientHandle = bincode::deserialize(&encoded).unwrap();
        assert_eq!(handle, decoded);
    }
}
