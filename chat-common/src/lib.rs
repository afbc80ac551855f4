//! Shared wire types, configuration, error kinds, and the mailbox (IPC)
//! contract used by both the chatroom server and the chatroom client.

pub mod config;
pub mod error;
pub mod job;
pub mod limits;
pub mod logging;
pub mod mailbox;
pub mod wire;

pub use error::{ChatError, MailboxError};
pub use job::Job;
pub use mailbox::Mailbox;
pub use wire::{ClientHandle, CommandKind, ControlMessage, ReplyMessage};
