/// The closed set of detectable game states.
///
/// Classification is data-driven: each state owns a table of accepted map
/// tokens and [`GameState::match_by_token`] walks [`GameState::ALL`] in
/// declaration order, returning the first state whose table contains the
/// token (case-insensitive).  The two shutdown states and [`Unknown`] are
/// reachable only through an explicit session transition, never through
/// classification.
///
/// [`Unknown`]: GameState::Unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GameState {
    Booting,
    Menu,
    PublicUniverse,
    StarMarine,
    ArenaCommander,
    Hangar,
    ShutdownCrashed,
    ShutdownGracefully,
    Unknown,
}

/// One color stop of a background gradient, offset in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f32,
    pub rgb: (u8, u8, u8),
}

/// Vertical linear-gradient rendered behind a state's chart section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientSpec {
    pub stops: &'static [GradientStop],
}

const PU_GRADIENT: GradientSpec = GradientSpec {
    stops: &[
        GradientStop { offset: 0.1, rgb: (255, 0, 0) },
        GradientStop { offset: 0.5, rgb: (127, 0, 127) },
        GradientStop { offset: 1.0, rgb: (0, 0, 255) },
    ],
};

const SM_GRADIENT: GradientSpec = GradientSpec {
    stops: &[
        GradientStop { offset: 0.1, rgb: (249, 248, 113) },
        GradientStop { offset: 0.5, rgb: (255, 199, 95) },
        GradientStop { offset: 1.0, rgb: (255, 150, 113) },
    ],
};

const AC_GRADIENT: GradientSpec = GradientSpec {
    stops: &[
        GradientStop { offset: 0.1, rgb: (21, 153, 87) },
        GradientStop { offset: 0.5, rgb: (21, 120, 120) },
        GradientStop { offset: 1.0, rgb: (21, 87, 153) },
    ],
};

const HANGAR_GRADIENT: GradientSpec = GradientSpec {
    stops: &[
        GradientStop { offset: 0.1, rgb: (72, 85, 99) },
        GradientStop { offset: 1.0, rgb: (41, 50, 60) },
    ],
};

impl GameState {
    /// All states in declaration order.  This order is the match order.
    pub const ALL: [GameState; 9] = [
        GameState::Booting,
        GameState::Menu,
        GameState::PublicUniverse,
        GameState::StarMarine,
        GameState::ArenaCommander,
        GameState::Hangar,
        GameState::ShutdownCrashed,
        GameState::ShutdownGracefully,
        GameState::Unknown,
    ];

    /// Display name shown in the GUI and used by [`GameState::match_by_name`].
    pub fn display_name(&self) -> &'static str {
        match self {
            GameState::Booting => "Booting",
            GameState::Menu => "Menu",
            GameState::PublicUniverse => "Public Universe",
            GameState::StarMarine => "Star Marine",
            GameState::ArenaCommander => "Arena Commander",
            GameState::Hangar => "Hangar",
            GameState::ShutdownCrashed => "Game Crash",
            GameState::ShutdownGracefully => "Shutdown Gracefully",
            GameState::Unknown => "Unknown",
        }
    }

    /// Map tokens accepted by this state.  Empty for states that are only
    /// reachable through an explicit transition.
    fn tokens(&self) -> &'static [&'static str] {
        match self {
            GameState::Booting => &["nomap", "nolevel"],
            GameState::Menu => &["frontend_main"],
            GameState::PublicUniverse => &["pu"],
            GameState::StarMarine => &["fps_echo11", "fps_demien"],
            GameState::ArenaCommander => {
                &["dfm_brokenmoon", "dfm_dyingstar", "dfm_newhorizonspeedway"]
            }
            GameState::Hangar => &["hangarapp"],
            GameState::ShutdownCrashed => &[],
            GameState::ShutdownGracefully => &[],
            GameState::Unknown => &[],
        }
    }

    /// True if `token` is one of this state's accepted map tokens.
    pub fn matches(&self, token: &str) -> bool {
        self.tokens().iter().any(|t| t.eq_ignore_ascii_case(token))
    }

    /// Classifies a telemetry map token.  Returns the first state in
    /// declaration order that accepts it, or [`GameState::Unknown`] for
    /// `None`, an empty token, or an unrecognised one.
    pub fn match_by_token(token: Option<&str>) -> GameState {
        let token = match token {
            Some(t) if !t.is_empty() => t,
            _ => return GameState::Unknown,
        };
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.matches(token))
            .unwrap_or(GameState::Unknown)
    }

    /// Looks a state up by its exact display name (case-sensitive).
    /// Returns [`GameState::Unknown`] if no name matches.
    pub fn match_by_name(name: &str) -> GameState {
        Self::ALL
            .iter()
            .copied()
            .find(|state| state.display_name() == name)
            .unwrap_or(GameState::Unknown)
    }

    /// Background image asset shown behind the chart while in this state.
    pub fn background_image(&self) -> Option<&'static str> {
        match self {
            GameState::PublicUniverse => Some("pu.jpg"),
            GameState::StarMarine => Some("sm.jpg"),
            GameState::ArenaCommander => Some("ac.jpg"),
            GameState::Hangar => Some("ha.jpg"),
            _ => None,
        }
    }

    /// Gradient rendered behind the chart section covering this state.
    pub fn background_gradient(&self) -> Option<GradientSpec> {
        match self {
            GameState::PublicUniverse => Some(PU_GRADIENT),
            GameState::StarMarine => Some(SM_GRADIENT),
            GameState::ArenaCommander => Some(AC_GRADIENT),
            GameState::Hangar => Some(HANGAR_GRADIENT),
            _ => None,
        }
    }

    /// True for the two shutdown states that end a capture session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GameState::ShutdownCrashed | GameState::ShutdownGracefully
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── match_by_token ────────────────────────────────────────────────────────

    #[test]
    fn token_matching_is_case_insensitive() {
        assert_eq!(GameState::match_by_token(Some("PU")), GameState::PublicUniverse);
        assert_eq!(GameState::match_by_token(Some("pu")), GameState::PublicUniverse);
        assert_eq!(GameState::match_by_token(Some("Pu")), GameState::PublicUniverse);
    }

    #[test]
    fn known_tokens_resolve_to_their_states() {
        assert_eq!(GameState::match_by_token(Some("nomap")), GameState::Booting);
        assert_eq!(GameState::match_by_token(Some("nolevel")), GameState::Booting);
        assert_eq!(GameState::match_by_token(Some("frontend_main")), GameState::Menu);
        assert_eq!(GameState::match_by_token(Some("fps_echo11")), GameState::StarMarine);
        assert_eq!(GameState::match_by_token(Some("fps_demien")), GameState::StarMarine);
        assert_eq!(GameState::match_by_token(Some("dfm_brokenmoon")), GameState::ArenaCommander);
        assert_eq!(GameState::match_by_token(Some("dfm_dyingstar")), GameState::ArenaCommander);
        assert_eq!(
            GameState::match_by_token(Some("dfm_newhorizonspeedway")),
            GameState::ArenaCommander
        );
        assert_eq!(GameState::match_by_token(Some("hangarapp")), GameState::Hangar);
    }

    #[test]
    fn none_and_empty_tokens_are_unknown() {
        assert_eq!(GameState::match_by_token(None), GameState::Unknown);
        assert_eq!(GameState::match_by_token(Some("")), GameState::Unknown);
    }

    #[test]
    fn unrecognised_token_is_unknown() {
        assert_eq!(GameState::match_by_token(Some("gravlev_testbed")), GameState::Unknown);
    }

    #[test]
    fn shutdown_and_unknown_never_match_tokens() {
        for token in ["nomap", "pu", "hangarapp", "crash", "shutdown", "unknown"] {
            assert!(!GameState::ShutdownCrashed.matches(token));
            assert!(!GameState::ShutdownGracefully.matches(token));
            assert!(!GameState::Unknown.matches(token));
        }
    }

    #[test]
    fn at_most_one_state_matches_each_token() {
        let tokens = [
            "nomap", "nolevel", "frontend_main", "pu", "fps_echo11", "fps_demien",
            "dfm_brokenmoon", "dfm_dyingstar", "dfm_newhorizonspeedway", "hangarapp",
        ];
        for token in tokens {
            let matching = GameState::ALL.iter().filter(|s| s.matches(token)).count();
            assert_eq!(matching, 1, "token {token} matched {matching} states");
        }
    }

    // ── match_by_name ─────────────────────────────────────────────────────────

    #[test]
    fn names_resolve_to_their_states() {
        assert_eq!(GameState::match_by_name("Booting"), GameState::Booting);
        assert_eq!(GameState::match_by_name("Menu"), GameState::Menu);
        assert_eq!(GameState::match_by_name("Public Universe"), GameState::PublicUniverse);
        assert_eq!(GameState::match_by_name("Star Marine"), GameState::StarMarine);
        assert_eq!(GameState::match_by_name("Arena Commander"), GameState::ArenaCommander);
        assert_eq!(GameState::match_by_name("Hangar"), GameState::Hangar);
        assert_eq!(GameState::match_by_name("Game Crash"), GameState::ShutdownCrashed);
        assert_eq!(GameState::match_by_name("Shutdown Gracefully"), GameState::ShutdownGracefully);
        assert_eq!(GameState::match_by_name("Unknown"), GameState::Unknown);
    }

    #[test]
    fn name_lookup_is_case_sensitive() {
        assert_eq!(GameState::match_by_name("menu"), GameState::Unknown);
        assert_eq!(GameState::match_by_name("PUBLIC UNIVERSE"), GameState::Unknown);
    }

    #[test]
    fn unrecognised_name_is_unknown() {
        assert_eq!(GameState::match_by_name("Squadron 42"), GameState::Unknown);
    }

    // ── display metadata ──────────────────────────────────────────────────────

    #[test]
    fn playable_states_have_backgrounds_and_gradients() {
        for state in [
            GameState::PublicUniverse,
            GameState::StarMarine,
            GameState::ArenaCommander,
            GameState::Hangar,
        ] {
            assert!(state.background_image().is_some(), "{state:?} has no background");
            assert!(state.background_gradient().is_some(), "{state:?} has no gradient");
        }
    }

    #[test]
    fn transitional_states_have_no_metadata() {
        for state in [
            GameState::Booting,
            GameState::Menu,
            GameState::ShutdownCrashed,
            GameState::ShutdownGracefully,
            GameState::Unknown,
        ] {
            assert!(state.background_image().is_none());
            assert!(state.background_gradient().is_none());
        }
    }

    #[test]
    fn gradient_stops_are_ordered_by_offset() {
        for state in GameState::ALL {
            if let Some(gradient) = state.background_gradient() {
                let offsets: Vec<f32> = gradient.stops.iter().map(|s| s.offset).collect();
                let mut sorted = offsets.clone();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
                assert_eq!(offsets, sorted);
            }
        }
    }

    // ── terminal states ───────────────────────────────────────────────────────

    #[test]
    fn only_shutdown_states_are_terminal() {
        assert!(GameState::ShutdownCrashed.is_terminal());
        assert!(GameState::ShutdownGracefully.is_terminal());
        for state in [
            GameState::Booting,
            GameState::Menu,
            GameState::PublicUniverse,
            GameState::StarMarine,
            GameState::ArenaCommander,
            GameState::Hangar,
            GameState::Unknown,
        ] {
            assert!(!state.is_terminal());
        }
    }
}
