//! Two-thread interactive client (spec §4.8): a sender thread reads stdin
//! lines and forwards parsed commands to the server's control mailbox,
//! while a receiver thread blocks on this process's private mailbox and
//! prints whatever arrives, redrawing the prompt with the classic
//! carriage-return idiom from `client.c`'s `receiver_thread`.

use anyhow::{Context, Result};
use chat_common::config::ClientConfig;
use chat_common::logging::setup_logging;
use chat_common::mailbox::private_mailbox_name;
use chat_common::wire::{ClientHandle, CommandKind, ControlMessage};
use chat_common::{Mailbox, MailboxError};
use std::io::{self, BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

enum ParsedCommand {
    Join(String),
    Msg(String),
    Dm(String, String),
    Who(String),
    Leave,
    Quit,
}

fn parse_line(line: &str) -> Option<ParsedCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut parts = line.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("").to_ascii_uppercase();
    let rest = parts.next().unwrap_or("").trim();

    match cmd.as_str() {
        "JOIN" if !rest.is_empty() => Some(ParsedCommand::Join(rest.to_string())),
        "MSG" if !rest.is_empty() => Some(ParsedCommand::Msg(rest.to_string())),
        "DM" if !rest.is_empty() => {
            let mut dm_parts = rest.splitn(2, char::is_whitespace);
            let target = dm_parts.next().unwrap_or("").trim();
            let text = dm_parts.next().unwrap_or("").trim();
            if target.is_empty() || text.is_empty() {
                None
            } else {
                Some(ParsedCommand::Dm(target.to_string(), text.to_string()))
            }
        }
        "WHO" if !rest.is_empty() => Some(ParsedCommand::Who(rest.to_string())),
        "LEAVE" => Some(ParsedCommand::Leave),
        "QUIT" => Some(ParsedCommand::Quit),
        _ => None,
    }
}

fn prompt() {
    print!("> ");
    let _ = io::stdout().flush();
}

/// Reads stdin one line at a time, parses it per the grammar in §4.8, and
/// forwards the corresponding command. Returns once the user sends QUIT or
/// stdin reaches EOF.
fn sender_loop(control: &Mailbox, handle: ClientHandle, reply_mailbox_name: &str) {
    println!("Enter commands (JOIN #room, MSG <text>, DM <handle> <text>, WHO #room, LEAVE, QUIT):");
    prompt();

    for line in io::stdin().lock().lines() {
        let Ok(line) = line else { break };

        let Some(parsed) = parse_line(&line) else {
            println!("Unknown command or missing parameters. Please retry.");
            prompt();
            continue;
        };

        let is_quit = matches!(parsed, ParsedCommand::Quit);
        let cmd = match parsed {
            ParsedCommand::Join(channel) => {
                ControlMessage::new(CommandKind::Join, handle, reply_mailbox_name).with_channel(channel)
            }
            ParsedCommand::Msg(text) => {
                ControlMessage::new(CommandKind::Msg, handle, reply_mailbox_name).with_text(text)
            }
            ParsedCommand::Dm(target, text) => {
                ControlMessage::new(CommandKind::Dm, handle, reply_mailbox_name)
                    .with_target(target)
                    .with_text(text)
            }
            ParsedCommand::Who(channel) => {
                ControlMessage::new(CommandKind::Who, handle, reply_mailbox_name).with_channel(channel)
            }
            ParsedCommand::Leave => ControlMessage::new(CommandKind::Leave, handle, reply_mailbox_name),
            ParsedCommand::Quit => ControlMessage::new(CommandKind::Quit, handle, reply_mailbox_name),
        };

        if let Err(e) = control.send_command(&cmd) {
            log::error!("failed to send command: {}", e);
            println!("Error: could not reach the server ({}).", e);
            if is_quit {
                break;
            }
        }

        if is_quit {
            break;
        }
        prompt();
    }
}

/// Blocks on the private mailbox and prints each reply on its own line,
/// redrawing the `> ` prompt underneath it.
fn receiver_loop(mailbox: Mailbox) {
    loop {
        match mailbox.recv_reply() {
            Ok(reply) => {
                let line = if reply.sender == "SERVER" {
                    reply.text
                } else {
                    format!("{}: {}", reply.sender, reply.text)
                };
                print!("\r{}\n> ", line);
                let _ = io::stdout().flush();
            }
            Err(MailboxError::Removed(_)) => {
                println!("\rServer disconnected or private mailbox removed. Exiting...");
                break;
            }
            Err(e) => {
                log::warn!("receiver: {}", e);
            }
        }
    }
}

fn cleanup(reply_mailbox_name: &str, done: &AtomicBool) {
    if done.swap(true, Ordering::SeqCst) {
        return;
    }
    log::info!("removing private mailbox '{}'", reply_mailbox_name);
    Mailbox::destroy(reply_mailbox_name);
}

fn main() -> Result<()> {
    let config = ClientConfig::load();
    setup_logging("chat-client", &config.log_dir, &config.log_level)
        .context("failed to initialize logging")?;

    let handle = ClientHandle::current_process();
    let reply_mailbox_name = private_mailbox_name(handle.0);

    let control = Mailbox::attach_control(&config.control_queue_name).with_context(|| {
        format!(
            "failed to attach to control mailbox '{}'. Is the server running?",
            config.control_queue_name
        )
    })?;
    let reply_mailbox = Mailbox::create_private(&reply_mailbox_name)
        .context("failed to create private reply mailbox")?;

    println!(
        "Client started (PID: {}). Private reply mailbox: {}",
        handle, reply_mailbox_name
    );

    control
        .send_command(&ControlMessage::new(CommandKind::Register, handle, reply_mailbox_name.clone()))
        .context("failed to send REGISTER")?;

    let cleanup_done = Arc::new(AtomicBool::new(false));
    {
        let reply_mailbox_name = reply_mailbox_name.clone();
        let cleanup_done = Arc::clone(&cleanup_done);
        ctrlc::set_handler(move || {
            cleanup(&reply_mailbox_name, &cleanup_done);
            std::process::exit(0);
        })
        .context("failed to register interrupt handler")?;
    }

    let receiver_handle = std::thread::spawn(move || receiver_loop(reply_mailbox));

    sender_loop(&control, handle, &reply_mailbox_name);

    // Destroy first: this is what unblocks the receiver thread's pending
    // `recv_reply` (the mailbox is reported removed), so it must happen
    // before we join rather than after.
    cleanup(&reply_mailbox_name, &cleanup_done);
    let _ = receiver_handle.join();

    Ok(())
}
