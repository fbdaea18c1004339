use std::sync::Arc;
use sysinfo::{Process, ProcessesToUpdate, System};
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration};

use crate::config::Config;
use crate::event::DaemonEvent;

const WATCH_INTERVAL_SECS: u64 = 2;

/// Descriptor of the watched game process as of the last sighting.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInfo {
    pub name: String,
    pub pid: u32,
    /// Cumulative CPU time the process has consumed, in milliseconds.
    pub cumulative_cpu_ms: u64,
    pub memory_bytes: u64,
}

impl ProcessInfo {
    fn from_process(process: &Process) -> Self {
        Self {
            name: process.name().to_string_lossy().into_owned(),
            pid: process.pid().as_u32(),
            cumulative_cpu_ms: process.accumulated_cpu_time(),
            memory_bytes: process.memory(),
        }
    }
}

/// Case-insensitive match of a process name against the configured
/// executable names.
pub(crate) fn name_matches(process_name: &str, targets: &[String]) -> bool {
    targets.iter().any(|t| t.eq_ignore_ascii_case(process_name))
}

/// Locates the target game process in the OS process list and tracks its
/// CPU-time consumption between refreshes.
///
/// A scan that misses the process keeps the previous descriptor — a
/// momentary disappearance from the process list is not termination; that
/// decision belongs to the crash detector, which confirms absence over
/// several ticks.
pub struct ProcessMonitor {
    sys: System,
    targets: Vec<String>,
    info: Option<ProcessInfo>,
    /// Difference of cumulative CPU times between the last two sightings,
    /// in milliseconds.  -1 until two sightings have occurred.
    cpu_delta_ms: i64,
    /// Wall-clock epoch milliseconds of the last refresh.
    last_check_ms: i64,
    /// Wall-clock span between the last two sightings, for load derivation.
    wall_delta_ms: i64,
}

impl ProcessMonitor {
    pub fn new(targets: Vec<String>) -> Self {
        Self {
            sys: System::new(),
            targets,
            info: None,
            cpu_delta_ms: -1,
            last_check_ms: 0,
            wall_delta_ms: 0,
        }
    }

    /// Rescans the OS process list.  Returns `true` if the target process
    /// was seen in this scan.
    pub fn refresh(&mut self) -> bool {
        self.sys.refresh_processes(ProcessesToUpdate::All, false);
        let now_ms = chrono::Utc::now().timestamp_millis();

        let found = self
            .sys
            .processes()
            .values()
            .find(|p| name_matches(&p.name().to_string_lossy(), &self.targets));

        match found {
            Some(process) => {
                let current = ProcessInfo::from_process(process);
                if let Some(previous) = &self.info {
                    if previous.pid == current.pid {
                        self.cpu_delta_ms =
                            current.cumulative_cpu_ms as i64 - previous.cumulative_cpu_ms as i64;
                        self.wall_delta_ms = now_ms - self.last_check_ms;
                    } else {
                        // A new instance restarts the delta bookkeeping.
                        self.cpu_delta_ms = -1;
                        self.wall_delta_ms = 0;
                    }
                }
                self.info = Some(current);
                self.last_check_ms = now_ms;
                true
            }
            None => {
                self.last_check_ms = now_ms;
                false
            }
        }
    }

    /// Descriptor from the last sighting, kept across missed scans.
    pub fn process(&self) -> Option<&ProcessInfo> {
        self.info.as_ref()
    }

    pub fn cpu_delta_ms(&self) -> i64 {
        self.cpu_delta_ms
    }

    pub fn last_check_ms(&self) -> i64 {
        self.last_check_ms
    }

    /// CPU load in percent over the last refresh interval, once two
    /// sightings of the same process instance have occurred.
    pub fn cpu_load_percent(&self) -> Option<f64> {
        if self.cpu_delta_ms < 0 || self.wall_delta_ms <= 0 {
            return None;
        }
        Some(self.cpu_delta_ms as f64 / self.wall_delta_ms as f64 * 100.0)
    }
}

/// Polls the OS process list every [`WATCH_INTERVAL_SECS`] seconds and emits
/// [`DaemonEvent::GameDetected`] whenever a configured game executable
/// appears.  The disappearance of the process is deliberately not reported
/// here: the active session's crash detector owns that decision.
pub async fn watch(config: Arc<RwLock<Config>>, tx: mpsc::Sender<DaemonEvent>) {
    let mut sys = System::new();
    let mut active_pid: Option<u32> = None;
    let mut ticker = interval(Duration::from_secs(WATCH_INTERVAL_SECS));

    loop {
        ticker.tick().await;

        sys.refresh_processes(ProcessesToUpdate::All, false);

        let targets = config.read().await.global.executable_names.clone();
        let found = sys
            .processes()
            .values()
            .find(|p| name_matches(&p.name().to_string_lossy(), &targets))
            .map(ProcessInfo::from_process);

        match (active_pid, found) {
            (None, Some(info)) => {
                log::info!("[monitor] Detected: {} (pid {})", info.name, info.pid);
                active_pid = Some(info.pid);
                if tx.send(DaemonEvent::GameDetected(info)).await.is_err() {
                    break;
                }
            }
            (Some(pid), None) => {
                log::debug!("[monitor] Process {pid} left the process list");
                active_pid = None;
            }
            _ => {} // No change.
        }
    }
}
