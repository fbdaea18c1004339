use std::collections::HashMap;

use crate::game_state::GameState;

/// Identifier of one captured numeric series.
///
/// The set is closed: charts and the archive format index series by these
/// identifiers, so adding one is a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesId {
    Fps,
    CpuLoad,
    MemoryUsage,
    AiCount,
    PlayerCount,
}

impl SeriesId {
    pub const ALL: [SeriesId; 5] = [
        SeriesId::Fps,
        SeriesId::CpuLoad,
        SeriesId::MemoryUsage,
        SeriesId::AiCount,
        SeriesId::PlayerCount,
    ];

    /// Stable label used for chart legends and archived exports.
    pub fn label(&self) -> &'static str {
        match self {
            SeriesId::Fps => "fps",
            SeriesId::CpuLoad => "cpu_load",
            SeriesId::MemoryUsage => "memory_mb",
            SeriesId::AiCount => "ai_count",
            SeriesId::PlayerCount => "player_count",
        }
    }
}

/// Series values captured for one sample, keyed by series identifier.
pub type SeriesValues = HashMap<SeriesId, f64>;

/// One immutable sample in the capture timeline: the game state observed at
/// a zero-based timeline position, plus whichever series were measurable at
/// that moment.  Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    state: GameState,
    index: u64,
    series: SeriesValues,
}

impl DataPoint {
    pub fn new(state: GameState, index: u64, series: SeriesValues) -> Self {
        Self { state, index, series }
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    /// Position in the timeline, zero-based.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Value of one series, if it was captured for this sample.
    pub fn value(&self, id: SeriesId) -> Option<f64> {
        self.series.get(&id).copied()
    }

    pub fn series(&self) -> &SeriesValues {
        &self.series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_point() -> DataPoint {
        let mut series = SeriesValues::new();
        series.insert(SeriesId::Fps, 42.5);
        series.insert(SeriesId::MemoryUsage, 8_192.0);
        DataPoint::new(GameState::PublicUniverse, 3, series)
    }

    // ── accessors ─────────────────────────────────────────────────────────────

    #[test]
    fn accessors_return_constructed_values() {
        let point = make_point();
        assert_eq!(point.state(), GameState::PublicUniverse);
        assert_eq!(point.index(), 3);
        assert_eq!(point.value(SeriesId::Fps), Some(42.5));
        assert_eq!(point.value(SeriesId::MemoryUsage), Some(8_192.0));
    }

    #[test]
    fn missing_series_reads_as_none() {
        let point = make_point();
        assert_eq!(point.value(SeriesId::AiCount), None);
        assert_eq!(point.value(SeriesId::PlayerCount), None);
    }

    #[test]
    fn empty_series_map_is_allowed() {
        let point = DataPoint::new(GameState::ShutdownCrashed, 0, SeriesValues::new());
        assert!(point.series().is_empty());
        for id in SeriesId::ALL {
            assert_eq!(point.value(id), None);
        }
    }

    // ── labels ────────────────────────────────────────────────────────────────

    #[test]
    fn series_labels_are_unique() {
        for a in SeriesId::ALL {
            for b in SeriesId::ALL {
                if a != b {
                    assert_ne!(a.label(), b.label());
                }
            }
        }
    }
}
