//! Delivery jobs produced by handlers/the monitor and consumed by the worker pool.

use crate::wire::ReplyMessage;

/// One delivery action, queued by a handler or the monitor and executed by a worker.
///
/// Jobs own their data outright (no borrowed state) because they must
/// outlive the registry lock under which they were created (spec §4.2:
/// "Jobs are owned by the queue until dequeued, then by the consuming
/// worker until delivery attempt completes").
#[derive(Debug, Clone)]
pub enum Job {
    /// Fan out `reply` to every current member of `channel`.
    Broadcast { channel: String, reply: ReplyMessage },
    /// Deliver `reply` to exactly one mailbox.
    Unicast { target_mailbox: String, reply: ReplyMessage },
}

impl Job {
    /// Accepts `&str`, `&String`, or `String` uniformly: handlers build
    /// these from a mix of owned registry data and borrowed wire-message
    /// fields, and forcing every call site to pick the exact right owned
    /// conversion would be noise.
    pub fn broadcast(channel: impl AsRef<str>, reply: ReplyMessage) -> Self {
        Job::Broadcast { channel: channel.as_ref().to_string(), reply }
    }

    pub fn unicast(target_mailbox: impl AsRef<str>, reply: ReplyMessage) -> Self {
        Job::Unicast { target_mailbox: target_mailbox.as_ref().to_string(), reply }
    }
}
