//! Delivery sink used by workers: wraps per-mailbox `posixmq` handles so a
//! worker doesn't pay the `open` cost on every single delivery attempt.
//!
//! A trait seam (rather than a concrete `PosixMqTransport` passed around
//! directly) exists purely so `#[cfg(test)]` code can substitute an
//! in-process mock sink instead of real mailboxes (spec §8's integration
//! tests), matching the teacher's habit of trait-isolating I/O at crate
//! boundaries (`lib_common::core::dispatcher::Dispatcher` takes a generic
//! sink rather than hard-coding its destination).

use chat_common::error::MailboxError;
use chat_common::mailbox::Mailbox;
use chat_common::wire::ReplyMessage;
use std::collections::HashMap;

/// One worker's view of "deliver this reply to this mailbox".
///
/// Not `Sync`: each worker thread owns its own transport instance and its
/// own cache of open handles, since `posixmq` handles aren't meant to be
/// shared across threads and workers never need to share deliveries.
pub trait ReplyTransport {
    fn deliver(&mut self, target_mailbox: &str, reply: &ReplyMessage) -> Result<(), MailboxError>;
}

/// Production transport: lazily opens and caches a non-blocking write
/// handle per target mailbox name, evicting the cache entry only when the
/// mailbox turns out to have been destroyed.
#[derive(Default)]
pub struct PosixMqTransport {
    cache: HashMap<String, Mailbox>,
}

impl PosixMqTransport {
    pub fn new() -> Self {
        PosixMqTransport { cache: HashMap::new() }
    }

    fn handle_for(&mut self, target_mailbox: &str) -> Result<&Mailbox, MailboxError> {
        if !self.cache.contains_key(target_mailbox) {
            let mailbox = Mailbox::open_reply_nonblocking(target_mailbox)?;
            self.cache.insert(target_mailbox.to_string(), mailbox);
        }
        Ok(self.cache.get(target_mailbox).expect("just inserted"))
    }
}

impl ReplyTransport for PosixMqTransport {
    fn deliver(&mut self, target_mailbox: &str, reply: &ReplyMessage) -> Result<(), MailboxError> {
        let result = self.handle_for(target_mailbox)?.send_reply_nonblocking(reply);
        if let Err(MailboxError::Removed(name)) = &result {
            // The mailbox is gone for good; stop paying for it in the cache.
            self.cache.remove(name);
        }
        result
    }
}

/// Test-only in-process sink, recording every delivery instead of touching
/// real mailboxes.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashSet;

    #[derive(Default)]
    pub struct MockTransport {
        pub delivered: Vec<(String, ReplyMessage)>,
        pub removed_mailboxes: HashSet<String>,
        pub full_mailboxes: HashSet<String>,
    }

    impl ReplyTransport for MockTransport {
        fn deliver(&mut self, target_mailbox: &str, reply: &ReplyMessage) -> Result<(), MailboxError> {
            if self.removed_mailboxes.contains(target_mailbox) {
                return Err(MailboxError::Removed(target_mailbox.to_string()));
            }
            if self.full_mailboxes.contains(target_mailbox) {
                return Err(MailboxError::WouldBlock(target_mailbox.to_string()));
            }
            self.delivered.push((target_mailbox.to_string(), reply.clone()));
            Ok(())
        }
    }
}
