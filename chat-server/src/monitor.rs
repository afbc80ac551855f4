//! Periodic inactivity sweep (spec §4.6). Holds the registry exclusively
//! for the whole sweep, including the eviction-notice enqueue, matching
//! the original source's monitor rather than the split-collect-then-notify
//! refinement spec §9 Open Question 2 allows but doesn't require — see
//! DESIGN.md for the rationale.

use crate::handlers;
use crate::registry::Registry;
use chat_common::Job;
use crossbeam_channel::{Receiver, Sender};
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Runs until `shutdown` fires or disconnects.
pub fn run(
    registry: Arc<RwLock<Registry>>,
    jobs: Sender<Job>,
    shutdown: Receiver<()>,
    interval: Duration,
    inactivity_timeout: Duration,
) {
    loop {
        match shutdown.recv_timeout(interval) {
            Ok(()) => {
                log::info!("monitor: shutdown signal received");
                break;
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                log::info!("monitor: shutdown channel disconnected");
                break;
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                sweep(&registry, &jobs, inactivity_timeout);
            }
        }
    }
}

fn sweep(registry: &Arc<RwLock<Registry>>, jobs: &Sender<Job>, inactivity_timeout: Duration) {
    let mut registry = registry.write().expect("registry lock poisoned");

    let stale: Vec<_> = registry
        .occupied_clients()
        .filter(|c| c.last_active.elapsed() > inactivity_timeout)
        .map(|c| (c.handle, c.reply_mailbox.clone()))
        .collect();

    for (handle, reply_mailbox) in stale {
        log::info!("monitor: evicting {} for inactivity", handle);
        for job in handlers::quit_jobs(
            &mut registry,
            handle,
            &reply_mailbox,
            "You have been disconnected due to inactivity.",
        ) {
            if jobs.send(job).is_err() {
                log::error!("monitor: job queue disconnected, dropping eviction notice");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_common::wire::ClientHandle;
    use std::thread;

    #[test]
    fn sweep_evicts_only_stale_clients() {
        let mut registry = Registry::new("#general");
        registry.register(ClientHandle(1), "/m1").unwrap();
        registry.register(ClientHandle(2), "/m2").unwrap();
        let registry = Arc::new(RwLock::new(registry));
        let (tx, rx) = crossbeam_channel::unbounded();

        thread::sleep(Duration::from_millis(20));
        registry.write().unwrap().touch(ClientHandle(2));

        sweep(&registry, &tx, Duration::from_millis(10));

        assert!(registry.read().unwrap().find_client(ClientHandle(1)).is_none());
        assert!(registry.read().unwrap().find_client(ClientHandle(2)).is_some());

        drop(tx);
        let mut notices = 0;
        while rx.try_recv().is_ok() {
            notices += 1;
        }
        assert_eq!(notices, 1);
    }
}
