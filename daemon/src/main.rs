use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use starlog_daemon::events::{SessionEvent, Topic};
use starlog_daemon::session::CaptureSession;
use starlog_daemon::{config, event, paths, process_monitor, status};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ── App data directory ────────────────────────────────────────────────────
    let app_dir = paths::app_data_dir();
    if let Err(e) = std::fs::create_dir_all(&app_dir) {
        log::error!("Failed to create app data directory {}: {e}", app_dir.display());
        std::process::exit(1);
    }

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path();
    let initial_config = config::load_or_default(&config_path).unwrap_or_else(|e| {
        log::warn!("[config] Error (using defaults): {e:#}");
        config::Config::default()
    });
    let shared_config = Arc::new(RwLock::new(initial_config));

    // ── Initial status ────────────────────────────────────────────────────────
    let status_path = paths::status_file_path();
    let mut current_status = status::DaemonStatus::new();
    status::write_status(&status_path, &current_status);

    let (event_tx, mut event_rx) = mpsc::channel::<event::DaemonEvent>(32);

    // ── Background tasks ──────────────────────────────────────────────────────
    tokio::spawn(config::watch_config(config_path, event_tx.clone()));
    tokio::spawn(process_monitor::watch(Arc::clone(&shared_config), event_tx.clone()));

    // Graceful shutdown on Ctrl+C.
    {
        let tx = event_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = tx.send(event::DaemonEvent::Shutdown).await;
            }
        });
    }

    log::info!("starlog-daemon v{} started", env!("CARGO_PKG_VERSION"));

    // ── Event loop ────────────────────────────────────────────────────────────
    let mut active_session: Option<Arc<CaptureSession>> = None;
    let mut next_session_id: i64 = 1;

    while let Some(evt) = event_rx.recv().await {
        match evt {
            event::DaemonEvent::GameDetected(info) => {
                if active_session.is_some() {
                    log::debug!("[main] Already capturing; ignoring detection of {}", info.name);
                    continue;
                }

                log::info!("Capture started: {} (pid {})", info.name, info.pid);
                let cfg = shared_config.read().await.clone();
                let session = CaptureSession::live(&cfg);
                session.set_session_id(next_session_id);

                // Forward session-side happenings into this loop: the crash
                // report ends the session, state changes update the status
                // file.  try_send keeps the listeners non-blocking; a missed
                // state update is repaired by the next sample.
                {
                    let tx = event_tx.clone();
                    session.subscribe(
                        Topic::CrashReportFiled,
                        Box::new(move |published| {
                            if let SessionEvent::CrashReportFiled(report) = published {
                                let _ = tx.try_send(event::DaemonEvent::SessionEnded(report.clone()));
                            }
                            Ok(())
                        }),
                    );
                }
                {
                    let tx = event_tx.clone();
                    session.subscribe(
                        Topic::StateChanged,
                        Box::new(move |published| {
                            if let SessionEvent::StateChanged(state) = published {
                                let _ = tx.try_send(event::DaemonEvent::StateObserved(*state));
                            }
                            Ok(())
                        }),
                    );
                }

                current_status.state = status::DaemonState::Capturing;
                current_status.session_id = Some(next_session_id);
                current_status.active_game = Some(info.name.clone());
                current_status.game_state = None;
                current_status.error = None;
                status::write_status(&status_path, &current_status);

                active_session = Some(session);
                next_session_id += 1;
            }

            event::DaemonEvent::StateObserved(state) => {
                if active_session.is_none() {
                    continue;
                }
                let name = state.display_name().to_string();
                if current_status.game_state.as_deref() != Some(name.as_str()) {
                    log::info!("[main] Game state: {name}");
                    current_status.game_state = Some(name);
                    status::write_status(&status_path, &current_status);
                }
            }

            event::DaemonEvent::SessionEnded(report) => {
                let outcome = if report.gracefully_shutdown { "graceful" } else { "crashed" };
                log::info!("Capture ended ({outcome})");

                if let Some(session) = active_session.take() {
                    session.shutdown().await;
                }

                current_status.state = status::DaemonState::Idle;
                current_status.session_id = None;
                current_status.active_game = None;
                current_status.game_state = None;
                current_status.last_outcome = Some(outcome.to_string());
                current_status.last_ended_at = Some(chrono::Local::now().to_rfc3339());
                status::write_status(&status_path, &current_status);
            }

            event::DaemonEvent::ConfigReloaded(new_config) => {
                log::info!("Config reloaded");
                // The watcher picks the new targets up on its next scan; an
                // already-running session keeps its construction-time settings.
                *shared_config.write().await = new_config;
            }

            event::DaemonEvent::Shutdown => {
                log::info!("Shutting down");
                if let Some(session) = active_session.take() {
                    session.shutdown().await;
                }
                current_status.state = status::DaemonState::Idle;
                current_status.session_id = None;
                current_status.active_game = None;
                current_status.game_state = None;
                current_status.error = None;
                status::write_status(&status_path, &current_status);
                break;
            }
        }
    }
}
