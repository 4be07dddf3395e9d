use serde::{Deserialize, Serialize};

/// Largest hand that can be dealt to four players with cards left to flip
pub const MAX_HAND_SIZE: u8 = 20;

/// Match settings configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSettings {
    /// Cards dealt per player (1-20, default 7)
    pub hand_size: u8,
    /// Human turn countdown in milliseconds (None disables the turn timer)
    pub turn_timeout_ms: Option<i64>,
    /// Whole-match duration in milliseconds (None disables the match timer)
    pub match_duration_ms: Option<i64>,
    /// Cosmetic delay before a bot acts
    pub bot_think_ms: u64,
    /// With exactly two players, reverse behaves like skip
    pub two_player_reverse_skips: bool,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            hand_size: 7,
            turn_timeout_ms: Some(30_000),
            match_duration_ms: Some(15 * 60_000),
            bot_think_ms: 800,
            two_player_reverse_skips: true,
        }
    }
}

impl MatchSettings {
    pub fn new(hand_size: u8) -> Self {
        Self {
            hand_size: hand_size.clamp(1, MAX_HAND_SIZE),
            ..Default::default()
        }
    }

    /// Settings with both timers disabled
    pub fn untimed(hand_size: u8) -> Self {
        Self {
            turn_timeout_ms: None,
            match_duration_ms: None,
            ..Self::new(hand_size)
        }
    }

    pub fn validate(&self) -> Result<(), &'static str> {
        if self.hand_size < 1 || self.hand_size > MAX_HAND_SIZE {
            return Err("Hand size must be between 1 and 20");
        }
        if matches!(self.turn_timeout_ms, Some(ms) if ms <= 0) {
            return Err("Turn timeout must be positive");
        }
        if matches!(self.match_duration_ms, Some(ms) if ms <= 0) {
            return Err("Match duration must be positive");
        }
        Ok(())
    }
}
