//! Single consumer of the control mailbox (spec §4.5): the one place
//! inbound commands are linearized, so handlers only ever have to reason
//! about registry concurrency, never about racing with each other.

use crate::handlers;
use crate::registry::Registry;
use chat_common::wire::CommandKind;
use chat_common::{Job, Mailbox};
use crossbeam_channel::Sender;
use std::sync::{Arc, RwLock};

/// Runs until the control mailbox reports it has been destroyed (the
/// shutdown signal, per spec §4.5/§4.7), or an unrecoverable I/O error.
pub fn run(control: Mailbox, registry: Arc<RwLock<Registry>>, jobs: Sender<Job>) {
    log::info!("router: listening on '{}'", control.name());
    loop {
        let cmd = match control.recv_command() {
            Ok(cmd) => cmd,
            Err(chat_common::MailboxError::Removed(name)) => {
                log::info!("router: control mailbox '{}' removed, shutting down", name);
                break;
            }
            Err(e) => {
                log::error!("router: failed to receive command: {}", e);
                continue;
            }
        };

        {
            let mut registry = registry.write().expect("registry lock poisoned");
            registry.touch(cmd.sender);
        }

        let new_jobs = dispatch(&registry, &cmd);
        for job in new_jobs {
            if jobs.send(job).is_err() {
                log::error!("router: job queue disconnected, dropping job");
            }
        }
    }
}

fn dispatch(registry: &Arc<RwLock<Registry>>, cmd: &chat_common::wire::ControlMessage) -> Vec<Job> {
    match cmd.kind {
        CommandKind::Register => {
            let mut registry = registry.write().expect("registry lock poisoned");
            handlers::handle_register(&mut registry, cmd)
        }
        CommandKind::Join => {
            let mut registry = registry.write().expect("registry lock poisoned");
            handlers::handle_join(&mut registry, cmd)
        }
        CommandKind::Msg => {
            let registry = registry.read().expect("registry lock poisoned");
            handlers::handle_msg(&registry, cmd)
        }
        CommandKind::Dm => {
            let registry = registry.read().expect("registry lock poisoned");
            handlers::handle_dm(&registry, cmd)
        }
        CommandKind::Who => {
            let registry = registry.read().expect("registry lock poisoned");
            handlers::handle_who(&registry, cmd)
        }
        CommandKind::Leave => {
            let mut registry = registry.write().expect("registry lock poisoned");
            handlers::handle_leave(&mut registry, cmd)
        }
        CommandKind::Quit => {
            let mut registry = registry.write().expect("registry lock poisoned");
            handlers::handle_quit(&mut registry, cmd)
        }
    }
}
