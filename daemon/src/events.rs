/// Typed publish/subscribe for capture-session updates.
///
/// Every mutation of session state is published under an explicit [`Topic`],
/// with one listener registry per topic.  Appending a data point publishes
/// twice: the full sample on [`Topic::DataPointAdded`] and the bare state on
/// [`Topic::StateChanged`], so subscribers can follow either the samples or
/// only the state transitions.
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::crash::CrashReport;
use crate::data_point::DataPoint;
use crate::game_state::GameState;
use crate::hardware::{CpuInformation, DiskInformation, GpuInformation, OsInformation};
use crate::process_monitor::ProcessInfo;
use crate::session::GameInformation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    DataPointAdded,
    StateChanged,
    ProcessInfoChanged,
    GameInfoChanged,
    CpuInfoChanged,
    GpuInfoChanged,
    DiskInfoChanged,
    OsInfoChanged,
    CrashReportFiled,
    SessionIdAssigned,
}

/// A published value.  Each variant maps to exactly one [`Topic`].
#[derive(Debug, Clone)]
pub enum SessionEvent {
    DataPointAdded(DataPoint),
    StateChanged(GameState),
    ProcessInfoChanged(ProcessInfo),
    GameInfoChanged(GameInformation),
    CpuInfoChanged(CpuInformation),
    GpuInfoChanged(GpuInformation),
    DiskInfoChanged(DiskInformation),
    OsInfoChanged(OsInformation),
    CrashReportFiled(CrashReport),
    SessionIdAssigned(i64),
}

impl SessionEvent {
    pub fn topic(&self) -> Topic {
        match self {
            SessionEvent::DataPointAdded(_) => Topic::DataPointAdded,
            SessionEvent::StateChanged(_) => Topic::StateChanged,
            SessionEvent::ProcessInfoChanged(_) => Topic::ProcessInfoChanged,
            SessionEvent::GameInfoChanged(_) => Topic::GameInfoChanged,
            SessionEvent::CpuInfoChanged(_) => Topic::CpuInfoChanged,
            SessionEvent::GpuInfoChanged(_) => Topic::GpuInfoChanged,
            SessionEvent::DiskInfoChanged(_) => Topic::DiskInfoChanged,
            SessionEvent::OsInfoChanged(_) => Topic::OsInfoChanged,
            SessionEvent::CrashReportFiled(_) => Topic::CrashReportFiled,
            SessionEvent::SessionIdAssigned(_) => Topic::SessionIdAssigned,
        }
    }
}

pub type Listener = Box<dyn Fn(&SessionEvent) -> anyhow::Result<()> + Send>;

/// Per-topic listener registries.  Listeners run synchronously on the
/// publishing thread, in registration order, with no de-duplication.
#[derive(Default)]
pub struct EventBus {
    registries: HashMap<Topic, Vec<Listener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, topic: Topic, listener: Listener) {
        self.registries.entry(topic).or_default().push(listener);
    }

    /// Notifies every listener registered for the event's topic.  A failing
    /// or panicking listener is logged and skipped; the remaining listeners
    /// are still invoked.
    pub fn publish(&self, event: &SessionEvent) {
        let Some(listeners) = self.registries.get(&event.topic()) else {
            return;
        };
        for listener in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    log::warn!("[events] Listener failed on {:?}: {e:#}", event.topic());
                }
                Err(_) => {
                    log::warn!("[events] Listener panicked on {:?}", event.topic());
                }
            }
        }
    }

    pub fn listener_count(&self, topic: Topic) -> usize {
        self.registries.get(&topic).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_point::SeriesValues;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn state_event() -> SessionEvent {
        SessionEvent::StateChanged(GameState::Menu)
    }

    // ── topic mapping ─────────────────────────────────────────────────────────

    #[test]
    fn events_map_to_their_topics() {
        let point = DataPoint::new(GameState::Menu, 0, SeriesValues::new());
        assert_eq!(SessionEvent::DataPointAdded(point).topic(), Topic::DataPointAdded);
        assert_eq!(state_event().topic(), Topic::StateChanged);
        assert_eq!(SessionEvent::SessionIdAssigned(7).topic(), Topic::SessionIdAssigned);
        assert_eq!(
            SessionEvent::CrashReportFiled(CrashReport { gracefully_shutdown: true }).topic(),
            Topic::CrashReportFiled
        );
    }

    // ── subscribe / publish ───────────────────────────────────────────────────

    #[test]
    fn publish_notifies_subscribed_listener() {
        let mut bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        bus.subscribe(
            Topic::StateChanged,
            Box::new(move |event| {
                if let SessionEvent::StateChanged(state) = event {
                    sink.lock().unwrap().push(*state);
                }
                Ok(())
            }),
        );

        bus.publish(&state_event());
        assert_eq!(seen.lock().unwrap().as_slice(), &[GameState::Menu]);
    }

    #[test]
    fn publish_only_reaches_the_matching_topic() {
        let mut bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bus.subscribe(
            Topic::DataPointAdded,
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        bus.publish(&state_event());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listeners_run_in_registration_order() {
        let mut bus = EventBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let sink = Arc::clone(&order);
            bus.subscribe(
                Topic::StateChanged,
                Box::new(move |_| {
                    sink.lock().unwrap().push(tag);
                    Ok(())
                }),
            );
        }

        bus.publish(&state_event());
        assert_eq!(order.lock().unwrap().as_slice(), &["first", "second", "third"]);
    }

    #[test]
    fn duplicate_subscriptions_are_not_deduplicated() {
        let mut bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..2 {
            let counter = Arc::clone(&calls);
            bus.subscribe(
                Topic::StateChanged,
                Box::new(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }),
            );
        }

        bus.publish(&state_event());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn publish_without_listeners_is_a_noop() {
        let bus = EventBus::new();
        bus.publish(&state_event());
    }

    // ── failure isolation ─────────────────────────────────────────────────────

    #[test]
    fn failing_listener_does_not_block_later_listeners() {
        let mut bus = EventBus::new();
        bus.subscribe(
            Topic::StateChanged,
            Box::new(|_| anyhow::bail!("listener exploded")),
        );
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bus.subscribe(
            Topic::StateChanged,
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        bus.publish(&state_event());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_listener_does_not_block_later_listeners() {
        let mut bus = EventBus::new();
        bus.subscribe(Topic::StateChanged, Box::new(|_| panic!("listener panicked")));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        bus.subscribe(
            Topic::StateChanged,
            Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        bus.publish(&state_event());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_count_tracks_registrations() {
        let mut bus = EventBus::new();
        assert_eq!(bus.listener_count(Topic::StateChanged), 0);
        bus.subscribe(Topic::StateChanged, Box::new(|_| Ok(())));
        bus.subscribe(Topic::StateChanged, Box::new(|_| Ok(())));
        assert_eq!(bus.listener_count(Topic::StateChanged), 2);
        assert_eq!(bus.listener_count(Topic::DataPointAdded), 0);
    }
}
