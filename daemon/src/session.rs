/// One session worth of captured data.
///
/// A `CaptureSession` owns the append-only timeline of [`DataPoint`]s, the
/// current process/hardware descriptors, and the event bus that fans every
/// mutation out to subscribers.  Live sessions also own the background tasks
/// that feed them (sampler, crash detector); archived sessions are read-only
/// reconstructions and never start any.
///
/// All mutable state sits behind one lock: mutations are serialized against
/// readers, so a reader can never observe a gap or duplicate in the ordinal
/// sequence.  Listeners are invoked after the lock is released.
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::crash::{self, CrashReport, DetectorConfig};
use crate::data_point::{DataPoint, SeriesValues};
use crate::events::{EventBus, Listener, SessionEvent, Topic};
use crate::game_state::GameState;
use crate::hardware::{CpuInformation, DiskInformation, GpuInformation, OsInformation};
use crate::process_monitor::{ProcessInfo, ProcessMonitor};
use crate::sampler::{self, SamplerConfig};

/// Session id used until persistence assigns a real one.
pub const UNASSIGNED_SESSION_ID: i64 = -1;

/// Identity of the captured game build, read from telemetry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GameInformation {
    pub branch: String,
    pub version: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("data point index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("archived sessions cannot record new data points")]
    ArchivedSession,
    #[error("stored data points are not contiguous (expected ordinal {expected}, found {found})")]
    CorruptOrdinals { expected: u64, found: u64 },
}

struct SessionInner {
    session_id: i64,
    data_points: Vec<DataPoint>,
    process: Option<ProcessInfo>,
    cpu_delta_ms: i64,
    last_cpu_check_ms: i64,
    game_info: GameInformation,
    crash_report: Option<CrashReport>,
    cpu_info: CpuInformation,
    gpu_info: GpuInformation,
    disk_info: DiskInformation,
    os_info: OsInformation,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            session_id: UNASSIGNED_SESSION_ID,
            data_points: Vec::new(),
            process: None,
            cpu_delta_ms: -1,
            last_cpu_check_ms: 0,
            game_info: GameInformation::default(),
            crash_report: None,
            cpu_info: CpuInformation::default(),
            gpu_info: GpuInformation::default(),
            disk_info: DiskInformation::default(),
            os_info: OsInformation::default(),
        }
    }
}

pub struct CaptureSession {
    is_archived: bool,
    inner: Mutex<SessionInner>,
    bus: Mutex<EventBus>,
    monitor: Mutex<ProcessMonitor>,
    stop_tx: watch::Sender<bool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl CaptureSession {
    /// Creates a live session and starts its background tasks according to
    /// the feature flags: the crash detector when crash reporting is
    /// enabled, the sampler (and the one-time hardware detection) when
    /// hardware detection is enabled.
    pub fn live(config: &Config) -> Arc<Self> {
        let (stop_tx, _) = watch::channel(false);
        let session = Arc::new(Self {
            is_archived: false,
            inner: Mutex::new(SessionInner::new()),
            bus: Mutex::new(EventBus::new()),
            monitor: Mutex::new(ProcessMonitor::new(config.global.executable_names.clone())),
            stop_tx,
            handles: Mutex::new(Vec::new()),
        });

        if config.features.hardware_detection {
            session.set_cpu_info(CpuInformation::detect());
            session.set_disk_info(DiskInformation::detect());
            session.set_os_info(OsInformation::detect());

            let sampler_handle = sampler::spawn(
                &session,
                SamplerConfig {
                    interval: config.global.sample_interval(),
                    game_log_path: config.global.game_log_path(),
                },
            );
            session.handles.lock().unwrap().push(sampler_handle);
        }

        if config.features.crash_report {
            let detector_handle = crash::spawn(
                &session,
                DetectorConfig {
                    poll_interval: config.global.crash_poll_interval(),
                    confirm_absent_ticks: config.global.confirm_absent_ticks(),
                    game_log_path: config.global.game_log_path(),
                    graceful_marker: config.global.graceful_marker.clone(),
                },
            );
            session.handles.lock().unwrap().push(detector_handle);
        }

        session
    }

    /// Reconstructs an archived session from a stored data-point sequence.
    /// Archived sessions never run background polling and reject new
    /// recordings; the stored ordinals must already be `0..n`.
    pub fn archived(session_id: i64, data_points: Vec<DataPoint>) -> Result<Arc<Self>, SessionError> {
        for (position, point) in data_points.iter().enumerate() {
            if point.index() != position as u64 {
                return Err(SessionError::CorruptOrdinals {
                    expected: position as u64,
                    found: point.index(),
                });
            }
        }

        let (stop_tx, _) = watch::channel(false);
        let mut inner = SessionInner::new();
        inner.session_id = session_id;
        inner.data_points = data_points;

        Ok(Arc::new(Self {
            is_archived: true,
            inner: Mutex::new(inner),
            bus: Mutex::new(EventBus::new()),
            monitor: Mutex::new(ProcessMonitor::new(Vec::new())),
            stop_tx,
            handles: Mutex::new(Vec::new()),
        }))
    }

    // ── timeline ──────────────────────────────────────────────────────────────

    /// Appends a new data point at the end of the timeline and publishes it
    /// twice: the full sample on [`Topic::DataPointAdded`], then the bare
    /// state on [`Topic::StateChanged`].  The ordinal is assigned under the
    /// lock, so it always equals the pre-insertion length.
    pub fn record(&self, state: GameState, series: SeriesValues) -> Result<DataPoint, SessionError> {
        if self.is_archived {
            return Err(SessionError::ArchivedSession);
        }
        let point = {
            let mut inner = self.inner.lock().unwrap();
            let point = DataPoint::new(state, inner.data_points.len() as u64, series);
            inner.data_points.push(point.clone());
            point
        };
        self.publish(SessionEvent::DataPointAdded(point.clone()));
        self.publish(SessionEvent::StateChanged(state));
        Ok(point)
    }

    pub fn get(&self, index: usize) -> Result<DataPoint, SessionError> {
        let inner = self.inner.lock().unwrap();
        inner
            .data_points
            .get(index)
            .cloned()
            .ok_or(SessionError::IndexOutOfRange { index, len: inner.data_points.len() })
    }

    /// Snapshot of the timeline at call time.
    pub fn data_points(&self) -> Vec<DataPoint> {
        self.inner.lock().unwrap().data_points.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().data_points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── subscriptions ─────────────────────────────────────────────────────────

    pub fn subscribe(&self, topic: Topic, listener: Listener) {
        self.bus.lock().unwrap().subscribe(topic, listener);
    }

    fn publish(&self, event: SessionEvent) {
        self.bus.lock().unwrap().publish(&event);
    }

    // ── current fields ────────────────────────────────────────────────────────

    pub fn session_id(&self) -> i64 {
        self.inner.lock().unwrap().session_id
    }

    pub fn set_session_id(&self, session_id: i64) {
        self.inner.lock().unwrap().session_id = session_id;
        self.publish(SessionEvent::SessionIdAssigned(session_id));
    }

    pub fn is_archived(&self) -> bool {
        self.is_archived
    }

    pub fn process_info(&self) -> Option<ProcessInfo> {
        self.inner.lock().unwrap().process.clone()
    }

    /// True once the target process has been sighted at least once.
    pub fn process_sighted(&self) -> bool {
        self.inner.lock().unwrap().process.is_some()
    }

    pub fn set_process_info(&self, info: ProcessInfo) {
        self.inner.lock().unwrap().process = Some(info.clone());
        self.publish(SessionEvent::ProcessInfoChanged(info));
    }

    pub fn cpu_delta_ms(&self) -> i64 {
        self.inner.lock().unwrap().cpu_delta_ms
    }

    pub fn last_cpu_check_ms(&self) -> i64 {
        self.inner.lock().unwrap().last_cpu_check_ms
    }

    pub fn cpu_load_percent(&self) -> Option<f64> {
        self.monitor.lock().unwrap().cpu_load_percent()
    }

    pub fn game_info(&self) -> GameInformation {
        self.inner.lock().unwrap().game_info.clone()
    }

    pub fn set_game_info(&self, info: GameInformation) {
        self.inner.lock().unwrap().game_info = info.clone();
        self.publish(SessionEvent::GameInfoChanged(info));
    }

    pub fn crash_report(&self) -> Option<CrashReport> {
        self.inner.lock().unwrap().crash_report.clone()
    }

    pub fn set_crash_report(&self, report: CrashReport) {
        self.inner.lock().unwrap().crash_report = Some(report.clone());
        self.publish(SessionEvent::CrashReportFiled(report));
    }

    pub fn cpu_info(&self) -> CpuInformation {
        self.inner.lock().unwrap().cpu_info.clone()
    }

    pub fn set_cpu_info(&self, info: CpuInformation) {
        self.inner.lock().unwrap().cpu_info = info.clone();
        self.publish(SessionEvent::CpuInfoChanged(info));
    }

    pub fn gpu_info(&self) -> GpuInformation {
        self.inner.lock().unwrap().gpu_info.clone()
    }

    pub fn set_gpu_info(&self, info: GpuInformation) {
        self.inner.lock().unwrap().gpu_info = info.clone();
        self.publish(SessionEvent::GpuInfoChanged(info));
    }

    pub fn disk_info(&self) -> DiskInformation {
        self.inner.lock().unwrap().disk_info.clone()
    }

    pub fn set_disk_info(&self, info: DiskInformation) {
        self.inner.lock().unwrap().disk_info = info.clone();
        self.publish(SessionEvent::DiskInfoChanged(info));
    }

    pub fn os_info(&self) -> OsInformation {
        self.inner.lock().unwrap().os_info.clone()
    }

    pub fn set_os_info(&self, info: OsInformation) {
        self.inner.lock().unwrap().os_info = info.clone();
        self.publish(SessionEvent::OsInfoChanged(info));
    }

    // ── process monitoring ────────────────────────────────────────────────────

    /// Rescans the process list through the session's monitor and mirrors
    /// the result into the current fields.  Returns `true` if the process
    /// was seen in this scan.  Safe to call from both the background tasks
    /// and a UI-refresh path; refreshes are serialized per session.
    pub fn refresh_process(&self) -> bool {
        let (sighted, info, cpu_delta_ms, last_check_ms) = {
            let mut monitor = self.monitor.lock().unwrap();
            let sighted = monitor.refresh();
            (
                sighted,
                monitor.process().cloned(),
                monitor.cpu_delta_ms(),
                monitor.last_check_ms(),
            )
        };
        {
            let mut inner = self.inner.lock().unwrap();
            inner.process = info.clone();
            inner.cpu_delta_ms = cpu_delta_ms;
            inner.last_cpu_check_ms = last_check_ms;
        }
        if sighted {
            if let Some(info) = info {
                self.publish(SessionEvent::ProcessInfoChanged(info));
            }
        }
        sighted
    }

    // ── lifecycle ─────────────────────────────────────────────────────────────

    /// A receiver that flips to `true` when the session stops.
    pub fn stop_signal(&self) -> watch::Receiver<bool> {
        self.stop_tx.subscribe()
    }

    /// Signals all background tasks to stop after their current tick.
    /// Idempotent.
    pub fn signal_stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    /// Stops and joins the session's background tasks, releasing its
    /// scheduling resources.  Idempotent: later calls find nothing to join.
    pub async fn shutdown(&self) {
        self.signal_stop();
        let handles: Vec<JoinHandle<()>> = self.handles.lock().unwrap().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// True while background tasks are still attached to the session.
    pub fn has_background_tasks(&self) -> bool {
        !self.handles.lock().unwrap().is_empty()
    }
}
