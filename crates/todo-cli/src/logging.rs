// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::env;
use std::fs;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Resolves the active filter: `TODO_LOG`, then `RUST_LOG`, then the config level.
fn filter_directives(config_level: &str) -> String {
    ["TODO_LOG", "RUST_LOG"]
        .into_iter()
        .find_map(|name| env::var(name).ok().filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| config_level.to_owned())
}

/// Sends `tracing` output to `log_path`. The terminal belongs to the UI,
/// so nothing is written to stdout or stderr. Keep the guard alive until exit.
pub fn init_logging(log_path: &Path, config_level: &str) -> Result<WorkerGuard> {
    let directives = filter_directives(config_level);
    let filter = EnvFilter::try_new(&directives)
        .map_err(|error| anyhow!("invalid log filter {directives:?}: {error}"))?;

    let dir = log_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_path
        .file_name()
        .ok_or_else(|| anyhow!("log path {} has no file name", log_path.display()))?;
    fs::create_dir_all(dir)
        .with_context(|| format!("create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;
    Ok(guard)
}
