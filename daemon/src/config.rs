use anyhow::{Context, Result};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::event::DaemonEvent;

pub const MIN_SAMPLE_INTERVAL_SECS: u64 = 1;
pub const MAX_SAMPLE_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 1;

pub const MIN_CRASH_POLL_INTERVAL_SECS: u64 = 1;
pub const MAX_CRASH_POLL_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_CRASH_POLL_INTERVAL_SECS: u64 = 5;

pub const DEFAULT_CONFIRM_ABSENT_TICKS: u32 = 2;
pub const DEFAULT_GRACEFUL_MARKER: &str = "FastShutdown";
/// Resolved at runtime by expanding %USERPROFILE%.
pub const DEFAULT_GAME_LOG_PATH: &str =
    r"C:\Program Files\Roberts Space Industries\StarCitizen\LIVE\Game.log";

/// Root configuration structure. Deserialized from %APPDATA%\Starlog\config.toml.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub features: FeatureConfig,
}

/// Capture settings shared by every session the daemon starts.
#[derive(Debug, Deserialize, Clone)]
pub struct GlobalConfig {
    /// Executable names recognised as the game process (case-insensitive).
    #[serde(default = "default_executable_names")]
    pub executable_names: Vec<String>,
    /// Absolute path of the game's log file.
    #[serde(default = "default_game_log_path")]
    pub game_log_path: String,
    /// Seconds between telemetry samples. Clamped to [1, 60].
    #[serde(default = "default_sample_interval")]
    pub sample_interval_secs: u64,
    /// Seconds between crash-detector liveness polls. Clamped to [1, 300].
    #[serde(default = "default_crash_poll_interval")]
    pub crash_poll_interval_secs: u64,
    /// Consecutive absent polls required before the shutdown decision.
    /// Floored at 1; 1 treats a single missed scan as conclusive.
    #[serde(default = "default_confirm_absent_ticks")]
    pub confirm_absent_ticks: u32,
    /// Marker that distinguishes a graceful shutdown in the log tail.
    #[serde(default = "default_graceful_marker")]
    pub graceful_marker: String,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            executable_names: default_executable_names(),
            game_log_path: DEFAULT_GAME_LOG_PATH.to_string(),
            sample_interval_secs: DEFAULT_SAMPLE_INTERVAL_SECS,
            crash_poll_interval_secs: DEFAULT_CRASH_POLL_INTERVAL_SECS,
            confirm_absent_ticks: DEFAULT_CONFIRM_ABSENT_TICKS,
            graceful_marker: DEFAULT_GRACEFUL_MARKER.to_string(),
        }
    }
}

impl GlobalConfig {
    /// Effective sampling interval, clamped to the supported range.
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs(
            self.sample_interval_secs
                .clamp(MIN_SAMPLE_INTERVAL_SECS, MAX_SAMPLE_INTERVAL_SECS),
        )
    }

    /// Effective crash-poll interval, clamped to the supported range.
    pub fn crash_poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.crash_poll_interval_secs
                .clamp(MIN_CRASH_POLL_INTERVAL_SECS, MAX_CRASH_POLL_INTERVAL_SECS),
        )
    }

    /// Effective absence-confirmation count, never below 1.
    pub fn confirm_absent_ticks(&self) -> u32 {
        self.confirm_absent_ticks.max(1)
    }

    /// Game log path with %USERPROFILE% expanded.
    pub fn game_log_path(&self) -> PathBuf {
        let expanded = match std::env::var("USERPROFILE") {
            Ok(profile) => self.game_log_path.replace("%USERPROFILE%", &profile),
            Err(_) => self.game_log_path.clone(),
        };
        PathBuf::from(expanded)
    }
}

/// Independently toggleable capture features.  A disabled feature starts
/// nothing: no crash detector, no hardware detection or sampling.
#[derive(Debug, Deserialize, Clone)]
pub struct FeatureConfig {
    #[serde(default = "default_true")]
    pub crash_report: bool,
    #[serde(default = "default_true")]
    pub hardware_detection: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self { crash_report: true, hardware_detection: true }
    }
}

/// Loads the config file at `path`, returning `Config::default()` if the file does not exist.
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Spawns a file watcher on the parent directory of `path`.  Whenever the config
/// file is created or modified, reloads it and sends a `ConfigReloaded` event.
pub async fn watch_config(path: PathBuf, tx: mpsc::Sender<DaemonEvent>) {
    let (watch_tx, mut watch_rx) = mpsc::channel::<notify::Event>(16);

    let mut watcher = match RecommendedWatcher::new(
        move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = watch_tx.blocking_send(event);
            }
        },
        NotifyConfig::default(),
    ) {
        Ok(w) => w,
        Err(e) => {
            log::warn!("[config] Failed to create file watcher: {e}");
            return;
        }
    };

    // Watch the parent directory rather than the file directly so we catch
    // editor-style atomic saves (write-new + rename).
    let watch_dir = match path.parent() {
        Some(d) => d.to_path_buf(),
        None => {
            log::warn!("[config] Config path has no parent directory");
            return;
        }
    };

    if let Err(e) = watcher.watch(&watch_dir, RecursiveMode::NonRecursive) {
        log::warn!("[config] Failed to watch config directory: {e}");
        return;
    }

    while let Some(event) = watch_rx.recv().await {
        let affects_config = event.paths.iter().any(|p| p == path.as_path());
        let is_write = matches!(
            event.kind,
            notify::EventKind::Create(_) | notify::EventKind::Modify(_)
        );

        if affects_config && is_write {
            match load_or_default(&path) {
                Ok(config) => {
                    if tx.send(DaemonEvent::ConfigReloaded(config)).await.is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("[config] Failed to reload config: {e:#}"),
            }
        }
    }
}

fn default_executable_names() -> Vec<String> {
    vec!["StarCitizen.exe".to_string(), "StarCitizen".to_string()]
}

fn default_game_log_path() -> String {
    DEFAULT_GAME_LOG_PATH.to_string()
}

fn default_sample_interval() -> u64 {
    DEFAULT_SAMPLE_INTERVAL_SECS
}

fn default_crash_poll_interval() -> u64 {
    DEFAULT_CRASH_POLL_INTERVAL_SECS
}

fn default_confirm_absent_ticks() -> u32 {
    DEFAULT_CONFIRM_ABSENT_TICKS
}

fn default_graceful_marker() -> String {
    DEFAULT_GRACEFUL_MARKER.to_string()
}

fn default_true() -> bool {
    true
}
