//! One function per command kind (spec §4.4). Each handler takes the
//! already-parsed [`ControlMessage`] and a lock guard of the appropriate
//! mode, mutates/reads the registry, and returns the jobs to enqueue.
//!
//! Handlers never touch a mailbox directly and never log a command's
//! *text* payload — only the outcome (registry events, drop/error
//! decisions) is logged, matching the teacher's dispatcher which logs
//! routing decisions, not payloads.

use crate::registry::Registry;
use chat_common::limits::{MAX_NAME, MAX_TEXT};
use chat_common::wire::{ClientHandle, ControlMessage, ReplyMessage};
use chat_common::{ChatError, Job};

/// REGISTER. Caller holds the registry exclusively.
pub fn handle_register(registry: &mut Registry, cmd: &ControlMessage) -> Vec<Job> {
    match registry.register(cmd.sender, &cmd.reply_mailbox) {
        Ok(()) => vec![Job::unicast(
            &cmd.reply_mailbox,
            ReplyMessage::server(format!("Welcome! You are registered as User {}.", cmd.sender)),
        )],
        Err(ChatError::ServerFull) => vec![Job::unicast(
            &cmd.reply_mailbox,
            ReplyMessage::server("Error: Server is full. Connection rejected."),
        )],
        Err(other) => {
            log::warn!("unexpected REGISTER failure for {}: {}", cmd.sender, other);
            vec![]
        }
    }
}

/// JOIN. Caller holds the registry exclusively.
pub fn handle_join(registry: &mut Registry, cmd: &ControlMessage) -> Vec<Job> {
    let channel = truncate_name(&cmd.channel);
    let Some(outcome) = registry.join(cmd.sender, &channel) else {
        // Unknown sender: drop silently (spec §7).
        log::debug!("JOIN from unregistered sender {}, dropping", cmd.sender);
        return vec![];
    };

    match outcome {
        Err(ChatError::RoomLimitReached) => vec![Job::unicast(
            &cmd.reply_mailbox,
            ReplyMessage::server("Error: Channel limit reached, cannot create new channel."),
        )],
        Err(other) => {
            log::warn!("unexpected JOIN failure for {}: {}", cmd.sender, other);
            vec![]
        }
        Ok(outcome) => {
            let mut jobs = Vec::new();

            if let Some(old_channel) = &outcome.left_channel {
                jobs.push(Job::broadcast(
                    old_channel,
                    ReplyMessage::server(format!(
                        "User {} has left {} (joined {}).",
                        cmd.sender, old_channel, channel
                    )),
                ));
            }

            jobs.push(Job::unicast(
                &cmd.reply_mailbox,
                ReplyMessage::server(format!("Joined {}. ({} members)", channel, outcome.member_count)),
            ));

            // The join confirmation and the join-broadcast both fire on
            // every successful JOIN, including a repeat JOIN to the channel
            // the client is already in — only the leave-broadcast above is
            // conditioned on the channel actually changing (matches the
            // source's `handle_join`, which enqueues `confirm_job`/`join_job`
            // unconditionally).
            jobs.push(Job::broadcast(
                &channel,
                ReplyMessage::server(format!("User {} has joined {}.", cmd.sender, channel)),
            ));

            jobs
        }
    }
}

/// MSG. Caller holds the registry shared.
pub fn handle_msg(registry: &Registry, cmd: &ControlMessage) -> Vec<Job> {
    let Some(client) = registry.find_client(cmd.sender) else {
        log::debug!("MSG from unregistered sender {}, dropping", cmd.sender);
        return vec![];
    };

    if client.current_channel.is_empty() {
        return vec![Job::unicast(
            &cmd.reply_mailbox,
            ReplyMessage::server("Error: You are not in a channel."),
        )];
    }

    let text = truncate_text(&cmd.text);
    vec![Job::broadcast(
        client.current_channel.clone(),
        ReplyMessage::new(format!("[{}] User {}", client.current_channel, cmd.sender), text),
    )]
}

/// DM. Caller holds the registry shared.
pub fn handle_dm(registry: &Registry, cmd: &ControlMessage) -> Vec<Job> {
    if registry.find_client(cmd.sender).is_none() {
        log::debug!("DM from unregistered sender {}, dropping", cmd.sender);
        return vec![];
    }

    let target = truncate_name(&cmd.target);
    let Some(target_handle) = parse_handle(&target) else {
        return vec![Job::unicast(
            &cmd.reply_mailbox,
            ReplyMessage::server(format!("Error: User PID {} is not online.", target)),
        )];
    };

    match registry.mailbox_of(target_handle) {
        None => vec![Job::unicast(
            &cmd.reply_mailbox,
            ReplyMessage::server(format!("Error: User PID {} is not online.", target)),
        )],
        Some(target_mailbox) => vec![
            Job::unicast(
                target_mailbox,
                ReplyMessage::new(format!("(DM from {})", cmd.sender), truncate_text(&cmd.text)),
            ),
            Job::unicast(
                &cmd.reply_mailbox,
                ReplyMessage::server(format!("DM sent to {}.", target)),
            ),
        ],
    }
}

/// WHO. Caller holds the registry shared.
pub fn handle_who(registry: &Registry, cmd: &ControlMessage) -> Vec<Job> {
    if registry.find_client(cmd.sender).is_none() {
        log::debug!("WHO from unregistered sender {}, dropping", cmd.sender);
        return vec![];
    }

    let channel = truncate_name(&cmd.channel);
    let Some(members) = registry.members_of(&channel) else {
        return vec![Job::unicast(
            &cmd.reply_mailbox,
            ReplyMessage::server(format!("Error: Channel {} does not exist.", channel)),
        )];
    };

    let names = members
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    let line = truncate_text(&format!("Members of {} ({}): {}", channel, members.len(), names));

    vec![Job::unicast(&cmd.reply_mailbox, ReplyMessage::server(line))]
}

/// LEAVE. Caller holds the registry exclusively.
pub fn handle_leave(registry: &mut Registry, cmd: &ControlMessage) -> Vec<Job> {
    let Some(outcome) = registry.leave(cmd.sender) else {
        log::debug!("LEAVE from unregistered sender {}, dropping", cmd.sender);
        return vec![];
    };

    match outcome {
        Err(ChatError::NotInChannel) => vec![Job::unicast(
            &cmd.reply_mailbox,
            ReplyMessage::server("Error: You are not in a channel."),
        )],
        Err(other) => {
            log::warn!("unexpected LEAVE failure for {}: {}", cmd.sender, other);
            vec![]
        }
        Ok(outcome) => vec![
            Job::broadcast(
                &outcome.channel,
                ReplyMessage::server(format!("User {} has left {}.", cmd.sender, outcome.channel)),
            ),
            Job::unicast(
                &cmd.reply_mailbox,
                ReplyMessage::server(format!("Left {}.", outcome.channel)),
            ),
        ],
    }
}

/// QUIT. Caller holds the registry exclusively.
pub fn handle_quit(registry: &mut Registry, cmd: &ControlMessage) -> Vec<Job> {
    if registry.find_client(cmd.sender).is_none() {
        log::debug!("QUIT from unregistered sender {}, dropping", cmd.sender);
        return vec![];
    }
    quit_jobs(registry, cmd.sender, &cmd.reply_mailbox, "Goodbye!")
}

/// Shared by QUIT and the monitor's inactivity eviction: full removal plus
/// a farewell/notice unicast, with the caller supplying the message text
/// since the two callers word it differently (spec §4.4/§4.6).
pub fn quit_jobs(registry: &mut Registry, handle: ClientHandle, reply_mailbox: &str, message: &str) -> Vec<Job> {
    let mut jobs = vec![Job::unicast(reply_mailbox, ReplyMessage::server(message))];

    if let Some(outcome) = registry.remove_client(handle) {
        if let Some(channel) = outcome.left_channel {
            jobs.push(Job::broadcast(
                channel.clone(),
                ReplyMessage::server(format!("User {} has left {}.", handle, channel)),
            ));
        }
    }

    jobs
}

fn truncate_text(text: &str) -> String {
    if text.len() <= MAX_TEXT {
        text.to_string()
    } else {
        text.chars().take(MAX_TEXT).collect()
    }
}

/// Bounds a channel name or DM target (wire contract §6: `channel[≤MAX_NAME]`,
/// `target[≤MAX_NAME]`), mirroring `truncate_text` above and the original
/// source's fixed `char channel[MAX_CHANNEL]`/`char target[MAX_USERNAME]`
/// buffers (`strncpy` truncates rather than rejecting).
fn truncate_name(name: &str) -> String {
    if name.len() <= MAX_NAME {
        name.to_string()
    } else {
        name.chars().take(MAX_NAME).collect()
    }
}

fn parse_handle(raw: &str) -> Option<ClientHandle> {
    raw.trim().parse::<u32>().ok().map(ClientHandle)
}
