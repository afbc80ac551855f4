//! Bring-up and shutdown (spec §4.7): load configuration, open the control
//! mailbox, start the router/worker-pool/monitor, and tear everything down
//! cleanly on Ctrl-C — mirroring `servers/src/yahoo_logic`'s bring-up
//! shape, adapted from an async task set to a `std::thread` set (see
//! SPEC_FULL.md §5).

mod handlers;
mod monitor;
mod registry;
mod router;
mod transport;
mod worker;

use anyhow::{Context, Result};
use chat_common::config::ServerConfig;
use chat_common::logging::setup_logging;
use chat_common::Mailbox;
use registry::Registry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use transport::PosixMqTransport;

fn main() -> Result<()> {
    let config = ServerConfig::load();
    setup_logging("chat-server", &config.log_dir, &config.log_level)
        .context("failed to initialize logging")?;

    log::info!(
        "chat-server starting: control queue '{}', {} workers, inactivity timeout {}s",
        config.control_queue_name,
        config.broadcaster_count,
        config.inactivity_timeout_secs
    );

    let registry = Arc::new(RwLock::new(Registry::new(&config.default_channel)));
    let control = Mailbox::create_control(&config.control_queue_name)
        .context("failed to create control mailbox")?;

    let (job_tx, job_rx) = crossbeam_channel::unbounded();
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded(1);
    let shutting_down = Arc::new(AtomicBool::new(false));

    let mut worker_handles = Vec::with_capacity(config.broadcaster_count);
    for id in 0..config.broadcaster_count {
        let job_rx = job_rx.clone();
        let registry = Arc::clone(&registry);
        worker_handles.push(
            std::thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || worker::run(job_rx, registry, PosixMqTransport::new()))
                .context("failed to spawn worker thread")?,
        );
    }
    // The router and monitor each hold their own clone of the job sender;
    // dropping this original once both are spawned lets the queue
    // disconnect (and workers exit) once router and monitor have stopped.
    drop(job_rx);

    let monitor_job_tx = job_tx.clone();
    let monitor_registry = Arc::clone(&registry);
    let monitor_interval = Duration::from_secs(config.monitor_interval_secs);
    let inactivity_timeout = Duration::from_secs(config.inactivity_timeout_secs);
    let monitor_handle = std::thread::Builder::new()
        .name("monitor".to_string())
        .spawn(move || {
            monitor::run(monitor_registry, monitor_job_tx, shutdown_rx, monitor_interval, inactivity_timeout)
        })
        .context("failed to spawn monitor thread")?;

    let control_queue_name = config.control_queue_name.clone();
    let ctrlc_shutting_down = Arc::clone(&shutting_down);
    ctrlc::set_handler(move || {
        if ctrlc_shutting_down.swap(true, Ordering::SeqCst) {
            return;
        }
        log::info!("received interrupt, shutting down");
        Mailbox::destroy(&control_queue_name);
        let _ = shutdown_tx.send(());
    })
    .context("failed to register interrupt handler")?;

    let router_registry = Arc::clone(&registry);
    router::run(control, router_registry, job_tx);

    log::info!("router stopped, waiting for monitor and workers");
    let _ = monitor_handle.join();
    for handle in worker_handles {
        let _ = handle.join();
    }

    // Idempotent: the Ctrl-C path already destroyed it in the common case.
    Mailbox::destroy(&config.control_queue_name);

    log::info!("chat-server shut down cleanly");
    Ok(())
}
