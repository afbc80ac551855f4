//! Logging bring-up, adapted from `servers/src/yahoo_logic/logger.rs`:
//! a timestamped `fern` dispatch to stdout and to a rotating log file, with
//! the previous run's old log files pruned on startup.

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Initializes `log`'s global logger. `component` names the log file prefix
/// (`"chat-server"` or `"chat-client"`) so the two binaries don't clobber
/// each other's logs when pointed at the same directory.
pub fn setup_logging(component: &str, log_dir: &Path, log_level: &str) -> Result<()> {
    if !log_dir.exists() {
        fs::create_dir_all(log_dir)?;
    }

    cleanup_old_logs(component, log_dir)?;

    let log_file_name = format!(
        "{}_{}.log",
        component,
        chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
    );
    let log_path = log_dir.join(log_file_name);

    let level = match log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d %H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stdout())
        .chain(fern::log_file(log_path)?)
        .apply()?;

    Ok(())
}

fn cleanup_old_logs(component: &str, log_dir: &Path) -> Result<()> {
    let prefix = format!("{}_", component);
    let mut entries: Vec<_> = fs::read_dir(log_dir)?
        .filter_map(|res| res.ok())
        .filter(|e| {
            let name = e.file_name();
            let name = name.to_string_lossy();
            name.starts_with(&prefix) && name.ends_with(".log")
        })
        .collect();

    entries.sort_by_key(|e| {
        std::cmp::Reverse(
            e.metadata()
                .and_then(|m| m.modified())
                .unwrap_or(std::time::SystemTime::UNIX_EPOCH),
        )
    });

    for entry in entries.iter().skip(1) {
        if let Err(e) = fs::remove_file(entry.path()) {
            eprintln!("Failed to delete old log file {:?}: {}", entry.path(), e);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn cleanup_keeps_only_newest_log_and_ignores_other_components() {
        let dir = tempfile::tempdir().unwrap();

        fs::write(dir.path().join("chat-server_2026-01-01_00-00-00.log"), "old").unwrap();
        thread::sleep(Duration::from_millis(10));
        fs::write(dir.path().join("chat-server_2026-01-02_00-00-00.log"), "new").unwrap();
        fs::write(dir.path().join("chat-client_2026-01-01_00-00-00.log"), "other component").unwrap();

        cleanup_old_logs("chat-server", dir.path()).unwrap();

        let remaining: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();

        assert!(remaining.contains(&"chat-server_2026-01-02_00-00-00.log".to_string()));
        assert!(!remaining.contains(&"chat-server_2026-01-01_00-00-00.log".to_string()));
        assert!(remaining.contains(&"chat-client_2026-01-01_00-00-00.log".to_string()));
    }
}
