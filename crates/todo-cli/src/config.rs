// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use todo_tui::KeyMap;
use todo_tui::keys::{
    DEFAULT_ADD_KEY, DEFAULT_DELETE_KEYS, DEFAULT_LIST_KEY, DEFAULT_QUIT_KEYS,
    DEFAULT_TOGGLE_COMPLETED_KEY,
};
use tracing_subscriber::EnvFilter;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_LOG_LEVEL: &str = "warn";
const LOG_FILE_NAME: &str = "todo.log";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub keys: Keys,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            storage: Storage::default(),
            keys: Keys::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Keys {
    pub quit: Option<Vec<String>>,
    pub toggle_completed: Option<String>,
    pub add: Option<String>,
    pub list: Option<String>,
    pub delete: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("TODO_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set TODO_CONFIG_PATH to the config file")
        })?;

        Ok(config_root.join(todo_db::APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` at the top and keep values under [storage], [keys], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.version != CONFIG_VERSION {
            bail!(
                "config {} has version {}; expected 1",
                path.display(),
                self.version
            );
        }

        if let Some(db_path) = &self.storage.db_path {
            todo_db::validate_db_path(db_path)?;
        }

        self.key_map()
            .with_context(|| format!("invalid [keys] in {}", path.display()))?;

        EnvFilter::try_new(self.log_level()).map_err(|error| {
            anyhow!(
                "log.level {:?} in {} is not a valid filter: {error}",
                self.log_level(),
                path.display()
            )
        })?;

        if let Some(file) = &self.log.file
            && file.trim().is_empty()
        {
            bail!("log.file in {} must not be empty", path.display());
        }

        Ok(())
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => todo_db::default_db_path(),
        }
    }

    pub fn key_map(&self) -> Result<KeyMap> {
        let keys = &self.keys;
        let quit = keys.quit.clone().unwrap_or_else(|| owned(DEFAULT_QUIT_KEYS));
        let delete = keys
            .delete
            .clone()
            .unwrap_or_else(|| owned(DEFAULT_DELETE_KEYS));
        KeyMap::parse(
            &quit,
            keys.toggle_completed
                .as_deref()
                .unwrap_or(DEFAULT_TOGGLE_COMPLETED_KEY),
            keys.add.as_deref().unwrap_or(DEFAULT_ADD_KEY),
            keys.list.as_deref().unwrap_or(DEFAULT_LIST_KEY),
            &delete,
        )
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let root = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| anyhow!("cannot resolve log directory; set [log].file in the config"))?;
        Ok(root.join(todo_db::APP_NAME).join(LOG_FILE_NAME))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# todo config\n# Place this file at: {}\n\nversion = 1\n\n[storage]\n# Optional. Default is TODO_DB, then the platform data dir (for example ~/.local/share/todo/todo.sqlite)\n# db_path = \"/absolute/path/to/todo.sqlite\"\n\n[keys]\nquit = [{}]\ntoggle_completed = \"{}\"\nadd = \"{}\"\nlist = \"{}\"\ndelete = [{}]\n\n[log]\n# TODO_LOG or RUST_LOG take precedence over this level\nlevel = \"{}\"\n# file = \"/absolute/path/to/todo.log\"\n",
            path.display(),
            quoted_list(DEFAULT_QUIT_KEYS),
            DEFAULT_TOGGLE_COMPLETED_KEY,
            DEFAULT_ADD_KEY,
            DEFAULT_LIST_KEY,
            quoted_list(DEFAULT_DELETE_KEYS),
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| (*value).to_owned()).collect()
}

fn quoted_list(values: &[&str]) -> String {
    values
        .iter()
        .map(|value| format!("\"{value}\""))
        .collect::<Vec<_>>()
        .join(", ")
}
