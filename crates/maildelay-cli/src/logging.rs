// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Where log lines go. The terminal UI owns stdout and stderr while it runs,
/// so interactive sessions log to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// `RUST_LOG` wins over the configured level.
pub fn setup_logging(level: &str, target: &LogTarget) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    match target {
        LogTarget::Stderr => {
            let stderr_layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .try_init()
                .context("install stderr logger")?;
        }
        LogTarget::File(path) => {
            let (dir, file_name) = split_log_path(path)?;
            fs::create_dir_all(dir)
                .with_context(|| format!("create log directory {}", dir.display()))?;
            let file_appender = tracing_appender::rolling::never(dir, file_name);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_appender);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .try_init()
                .context("install file logger")?;
        }
    }
    Ok(())
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr)> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("log file {} has no file name", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((dir, file_name))
}

#[cfg(test)]
mod tests {
    use super::split_log_path;
    use std::ffi::OsStr;
    use std::path::Path;

    #[test]
    fn split_log_path_separates_dir_and_name() {
        let (dir, name) = split_log_path(Path::new("/var/log/maildelay/app.log")).expect("split");
        assert_eq!(dir, Path::new("/var/log/maildelay"));
        assert_eq!(name, OsStr::new("app.log"));
    }

    #[test]
    fn bare_file_name_logs_to_working_dir() {
        let (dir, name) = split_log_path(Path::new("maildelay.log")).expect("split");
        assert_eq!(dir, Path::new("."));
        assert_eq!(name, OsStr::new("maildelay.log"));
    }

    #[test]
    fn path_without_file_name_is_rejected() {
        let error = split_log_path(Path::new("/")).expect_err("root has no file name");
        assert!(error.to_string().contains("no file name"));
    }
}
