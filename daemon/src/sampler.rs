/// Recurring telemetry sampling for a live capture session.
///
/// Each tick refreshes the process monitor, classifies the current game
/// state from the newest map token in the game log, and appends a data point
/// carrying the series that are observable from the outside (CPU load,
/// process memory).  Ticks where the process is not sighted record nothing.
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use crate::data_point::{SeriesId, SeriesValues};
use crate::game_log;
use crate::game_state::GameState;
use crate::session::CaptureSession;

#[derive(Debug, Clone)]
pub struct SamplerConfig {
    pub interval: Duration,
    pub game_log_path: PathBuf,
}

pub fn spawn(session: &Arc<CaptureSession>, config: SamplerConfig) -> JoinHandle<()> {
    let stop_rx = session.stop_signal();
    let log_path = config.game_log_path.clone();
    spawn_with(
        Arc::downgrade(session),
        config.interval,
        stop_rx,
        move |session| {
            if !session.refresh_process() {
                return None;
            }
            Some(build_sample(session, &log_path))
        },
    )
}

/// Sampling loop with an injectable sample source.  `sample` returning
/// `None` skips the tick.
fn spawn_with<F>(
    session: Weak<CaptureSession>,
    tick: Duration,
    mut stop_rx: watch::Receiver<bool>,
    mut sample: F,
) -> JoinHandle<()>
where
    F: FnMut(&CaptureSession) -> Option<(GameState, SeriesValues)> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(tick);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = stop_rx.changed() => break,
            }

            let Some(session) = session.upgrade() else {
                break;
            };
            let Some((state, series)) = sample(&session) else {
                continue;
            };
            if let Err(e) = session.record(state, series) {
                log::warn!("[sampler] Failed to record sample: {e}");
                break;
            }
        }
        log::debug!("[sampler] Sampling stopped");
    })
}

/// Classifies the current state from the log and collects the observable
/// series for one sample.
fn build_sample(session: &CaptureSession, log_path: &Path) -> (GameState, SeriesValues) {
    let token = match game_log::read_tail(log_path, game_log::TAIL_BYTES) {
        Ok(Some(tail)) => game_log::latest_map_token(&tail),
        Ok(None) => None,
        Err(e) => {
            log::warn!("[sampler] Game log unreadable: {e:#}");
            None
        }
    };
    let state = GameState::match_by_token(token.as_deref());

    let mut series = SeriesValues::new();
    if let Some(load) = session.cpu_load_percent() {
        series.insert(SeriesId::CpuLoad, load);
    }
    if let Some(info) = session.process_info() {
        series.insert(
            SeriesId::MemoryUsage,
            info.memory_bytes as f64 / (1024.0 * 1024.0),
        );
    }
    (state, series)
}
