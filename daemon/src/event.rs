use crate::config::Config;
use crate::crash::CrashReport;
use crate::game_state::GameState;
use crate::process_monitor::ProcessInfo;

pub enum DaemonEvent {
    /// A watched game executable appeared in the process list.
    GameDetected(ProcessInfo),
    /// The active session classified a new game state.
    StateObserved(GameState),
    /// The active session's crash detector filed its report.
    SessionEnded(CrashReport),
    /// The config file changed on disk and was successfully re-parsed.
    ConfigReloaded(Config),
    /// Ctrl+C received; the daemon should dispose the session and exit.
    Shutdown,
}
