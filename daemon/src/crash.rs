/// Crash/shutdown supervision for a live capture session.
///
/// A recurring task probes process liveness on a fixed interval.  Once the
/// process has been sighted and then stays absent for a configured number of
/// consecutive ticks, the detector reads the game log tail and classifies
/// the termination: graceful if the shutdown marker is present, crashed
/// otherwise.  The report is delivered exactly once and the task then stops
/// itself — there is no guard flag; the loop simply no longer exists.
use std::path::PathBuf;
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::data_point::SeriesValues;
use crate::game_log;
use crate::game_state::GameState;
use crate::session::CaptureSession;

/// Outcome of a terminated session.  Produced exactly once per live session
/// and immutable afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CrashReport {
    pub gracefully_shutdown: bool,
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub poll_interval: Duration,
    /// Consecutive absent ticks required before the outcome is decided.
    /// 1 treats a single missed scan as conclusive.
    pub confirm_absent_ticks: u32,
    pub game_log_path: PathBuf,
    pub graceful_marker: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DetectorState {
    Running,
    Reported,
}

/// Starts the detector for `session`, probing liveness through the
/// session's process monitor.
pub fn spawn(session: &Arc<CaptureSession>, config: DetectorConfig) -> JoinHandle<()> {
    let stop_rx = session.stop_signal();
    spawn_with_probe(Arc::downgrade(session), config, stop_rx, |session| {
        session.refresh_process()
    })
}

/// Detector loop with an injectable liveness probe.  The probe returns
/// whether the process was seen in the current scan.
fn spawn_with_probe<F>(
    session: Weak<CaptureSession>,
    config: DetectorConfig,
    mut stop_rx: watch::Receiver<bool>,
    mut probe: F,
) -> JoinHandle<()>
where
    F: FnMut(&CaptureSession) -> bool + Send + 'static,
{
    tokio::spawn(async move {
        let confirm = config.confirm_absent_ticks.max(1);
        let mut ticker = interval(config.poll_interval);
        let mut absent_ticks = 0u32;
        let mut state = DetectorState::Running;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop_rx.changed() => break,
            }

            let Some(session) = session.upgrade() else {
                break;
            };

            if probe(&session) {
                absent_ticks = 0;
                continue;
            }
            if !session.process_sighted() {
                // Nothing to supervise until the process shows up.
                continue;
            }

            absent_ticks += 1;
            if absent_ticks < confirm {
                continue;
            }

            let graceful = match game_log::read_tail(&config.game_log_path, game_log::TAIL_BYTES) {
                Ok(Some(tail)) => game_log::contains_graceful_marker(&tail, &config.graceful_marker),
                Ok(None) => false,
                Err(e) => {
                    // Transient: retry on the next tick.
                    log::warn!("[crash] Game log unreadable: {e:#}");
                    continue;
                }
            };

            let report = CrashReport { gracefully_shutdown: graceful };
            deliver_report(&session, report);
            state = DetectorState::Reported;
            break;
        }

        log::debug!("[crash] Detector stopped ({state:?})");
    })
}

/// Stores the report on the session, appends the terminal data point, and
/// stops the session's remaining background tasks.
fn deliver_report(session: &CaptureSession, report: CrashReport) {
    let terminal = if report.gracefully_shutdown {
        GameState::ShutdownGracefully
    } else {
        GameState::ShutdownCrashed
    };
    log::info!("[crash] Session ended: {}", terminal.display_name());

    session.set_crash_report(report);
    if let Err(e) = session.record(terminal, SeriesValues::new()) {
        log::warn!("[crash] Failed to record terminal data point: {e}");
    }
    session.signal_stop();
}
