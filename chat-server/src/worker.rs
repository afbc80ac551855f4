//! Fan-out worker (spec §4.3): dequeues one job at a time and performs
//! non-blocking deliveries, isolating a stuck recipient from every other
//! delivery in flight.

use crate::registry::Registry;
use crate::transport::ReplyTransport;
use chat_common::error::MailboxError;
use chat_common::wire::ReplyMessage;
use chat_common::Job;
use crossbeam_channel::Receiver;
use std::sync::{Arc, RwLock};

/// Runs until the job queue is disconnected (every `Sender` dropped),
/// which happens once the router and monitor have both shut down.
pub fn run(jobs: Receiver<Job>, registry: Arc<RwLock<Registry>>, mut transport: impl ReplyTransport) {
    loop {
        let job = match jobs.recv() {
            Ok(job) => job,
            Err(_) => break,
        };

        match job {
            Job::Broadcast { channel, reply } => {
                let members = {
                    let registry = registry.read().expect("registry lock poisoned");
                    registry.members_of(&channel).map(|m| {
                        m.iter()
                            .filter_map(|handle| registry.mailbox_of(*handle).map(str::to_string))
                            .collect::<Vec<_>>()
                    })
                };
                let Some(mailboxes) = members else {
                    // Channel reaped between enqueue and delivery: nothing to do.
                    continue;
                };
                for mailbox in mailboxes {
                    deliver_one(&mut transport, &mailbox, &reply);
                }
            }
            Job::Unicast { target_mailbox, reply } => {
                deliver_one(&mut transport, &target_mailbox, &reply);
            }
        }
    }
}

fn deliver_one(transport: &mut impl ReplyTransport, mailbox: &str, reply: &ReplyMessage) {
    match transport.deliver(mailbox, reply) {
        Ok(()) => {}
        Err(MailboxError::WouldBlock(name)) => {
            log::warn!("dropping delivery to '{}': mailbox full", name);
        }
        Err(MailboxError::Removed(_)) => {
            // Recipient is gone; nothing to log, this is the expected steady state.
        }
        Err(other) => {
            log::error!("delivery to '{}' failed: {}", mailbox, other);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use chat_common::wire::ClientHandle;

    #[test]
    fn broadcast_delivers_to_every_member_including_sender() {
        let mut registry = Registry::new("#general");
        registry.register(ClientHandle(1), "/m1").unwrap();
        registry.register(ClientHandle(2), "/m2").unwrap();
        registry.join(ClientHandle(1), "#r").unwrap().unwrap();
        registry.join(ClientHandle(2), "#r").unwrap().unwrap();
        let registry = Arc::new(RwLock::new(registry));

        let (tx, rx) = crossbeam_channel::unbounded();
        tx.send(Job::broadcast("#r", ReplyMessage::new("[#r] User 1", "hi"))).unwrap();
        drop(tx);

        let mut transport = MockTransport::default();
        // Run inline (not on a thread) by borrowing the transport directly;
        // `run` takes ownership so we re-implement its loop body here for
        // introspection instead of spawning a thread we'd have to join.
        while let Ok(job) = rx.recv() {
            if let Job::Broadcast { channel, reply } = job {
                let guard = registry.read().unwrap();
                let mailboxes: Vec<String> = guard
                    .members_of(&channel)
                    .map(|m| m.iter().filter_map(|h| guard.mailbox_of(*h).map(str::to_string)).collect())
                    .unwrap_or_default();
                drop(guard);
                for mailbox in mailboxes {
                    let _ = transport.deliver(&mailbox, &reply);
                }
            }
        }

        assert_eq!(transport.delivered.len(), 2);
    }

    #[test]
    fn full_mailbox_is_dropped_without_blocking_others() {
        let mut transport = MockTransport::default();
        transport.full_mailboxes.insert("/full".to_string());
        deliver_one(&mut transport, "/full", &ReplyMessage::server("hi"));
        deliver_one(&mut transport, "/ok", &ReplyMessage::server("hi"));
        assert_eq!(transport.delivered.len(), 1);
        assert_eq!(transport.delivered[0].0, "/ok");
    }

    #[test]
    fn removed_mailbox_is_silently_absorbed() {
        let mut transport = MockTransport::default();
        transport.removed_mailboxes.insert("/gone".to_string());
        deliver_one(&mut transport, "/gone", &ReplyMessage::server("hi"));
        assert!(transport.delivered.is_empty());
    }
}
