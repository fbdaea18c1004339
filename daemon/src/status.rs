use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current operational state of the daemon.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(rename_all = "lowercase")]
pub enum DaemonState {
    /// No watched process is running; no session is being captured.
    Idle,
    /// A watched process is running and a live capture session is active.
    Capturing,
}

/// Runtime status written by the daemon to %APPDATA%\Starlog\status.toml.
/// The GUI reads this file (read-only) to display daemon state.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DaemonStatus {
    /// Daemon binary version (set from Cargo.toml at compile time).
    pub version: String,
    /// Current operational state.
    pub state: DaemonState,
    /// Id of the session currently being captured, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
    /// Executable name of the game currently being captured, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_game: Option<String>,
    /// Display name of the most recently classified game state, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_state: Option<String>,
    /// Outcome of the last ended session: "graceful" or "crashed".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<String>,
    /// RFC 3339 timestamp of the last session end, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_ended_at: Option<String>,
    /// Human-readable error message if the daemon encountered a non-fatal error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DaemonStatus {
    /// Constructs the initial idle status on daemon startup.
    pub fn new() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            state: DaemonState::Idle,
            session_id: None,
            active_game: None,
            game_state: None,
            last_outcome: None,
            last_ended_at: None,
            error: None,
        }
    }
}

/// Serializes `status` to TOML and writes it to `path`.
/// Creates the parent directory if it does not exist.
/// Logs errors rather than panicking — a status write failure should never
/// crash the daemon.
pub fn write_status(path: &Path, status: &DaemonStatus) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            log::warn!("[status] Failed to create directory {}: {e}", parent.display());
            return;
        }
    }
    match toml::to_string_pretty(status) {
        Ok(content) => {
            if let Err(e) = std::fs::write(path, content) {
                log::warn!("[status] Failed to write status file: {e}");
            }
        }
        Err(e) => log::warn!("[status] Failed to serialize status: {e}"),
    }
}
