//! GameState - canonical match record shared by every participant
//!
//! One record holds the piles, every hand, turn bookkeeping and timer deadlines.
//! It is only mutated through the turn controller and the timer `tick`.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::{Card, Color, MatchSettings};

/// Cards in a full deck
pub const DECK_SIZE: usize = 108;
/// Minimum players per match
pub const MIN_PLAYERS: usize = 2;
/// Maximum players per match
pub const MAX_PLAYERS: usize = 4;

/// Player hand
pub type Hand = SmallVec<[Card; 16]>;

/// Turn controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    AwaitingAction,
    AwaitingColorChoice,
    Finished,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::AwaitingAction => "awaitingAction",
            Phase::AwaitingColorChoice => "awaitingColorChoice",
            Phase::Finished => "finished",
        }
    }
}

/// Play direction (+1 / -1 around the table)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    #[inline]
    pub fn sign(&self) -> i64 {
        match self {
            Direction::Clockwise => 1,
            Direction::CounterClockwise => -1,
        }
    }

    #[inline]
    pub fn reversed(&self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }
}

/// A wild card waiting for its color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingWild {
    pub player_index: usize,
    /// Seat-advance step applied once the color is chosen
    pub step: usize,
}

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EndReason {
    EmptyHand,
    MatchExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LastActionKind {
    Play,
    Draw,
    ForcedDraw,
    Pass,
    ChooseColor,
    CallUno,
}

/// Last action information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastAction {
    pub kind: LastActionKind,
    pub player_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
}

/// Seated player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: String,
    pub display_name: String,
    pub hand: Hand,
    pub is_bot: bool,
    pub uno_called: bool,
}

impl Player {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>, is_bot: bool) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            hand: Hand::new(),
            is_bot,
            uno_called: false,
        }
    }
}

/// Canonical match state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub players: Vec<Player>,

    // Draw pile, top is the last element
    pub deck: Vec<Card>,

    // Discard pile, top is the last element
    pub discard: Vec<Card>,

    pub current_player_index: usize,
    pub direction: Direction,
    pub current_color: Color,
    pub phase: Phase,
    pub pending_wild: Option<PendingWild>,

    pub winner_id: Option<String>,
    pub end_reason: Option<EndReason>,

    // Epoch milliseconds, None while unarmed
    pub turn_deadline: Option<i64>,
    pub match_deadline: Option<i64>,

    /// Bumped on every seat advance; scheduled callbacks compare against it
    pub turn_generation: u64,

    /// Compare-and-swap counter owned by the store
    pub version: u64,

    pub settings: MatchSettings,

    // Seeded randomness for reshuffles and tie-breaks
    pub rng_seed: u64,
    pub rng_cursor: u64,

    pub last_action: Option<LastAction>,
}

impl GameState {
    /// Empty table for the given players; piles are filled by the deck manager
    pub fn new(players: Vec<Player>, settings: MatchSettings, rng_seed: u64) -> Self {
        GameState {
            players,
            deck: Vec::with_capacity(DECK_SIZE),
            discard: Vec::with_capacity(DECK_SIZE),
            current_player_index: 0,
            direction: Direction::Clockwise,
            current_color: Color::Red,
            phase: Phase::AwaitingAction,
            pending_wild: None,
            winner_id: None,
            end_reason: None,
            turn_deadline: None,
            match_deadline: None,
            turn_generation: 0,
            version: 0,
            settings,
            rng_seed,
            rng_cursor: 0,
            last_action: None,
        }
    }

    #[inline]
    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    #[inline]
    pub fn top_card(&self) -> Option<&Card> {
        self.discard.last()
    }

    #[inline]
    pub fn current_player(&self) -> &Player {
        &self.players[self.current_player_index]
    }

    /// Seat of the player with this id
    pub fn player_index(&self, player_id: &str) -> Option<usize> {
        self.players.iter().position(|p| p.id == player_id)
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    /// Cards across deck, discard and every hand
    pub fn total_cards(&self) -> usize {
        self.deck.len()
            + self.discard.len()
            + self.players.iter().map(|p| p.hand.len()).sum::<usize>()
    }

    /// Next deterministic random stream; each call yields a fresh one
    pub fn next_rng(&mut self) -> ChaCha8Rng {
        let stream = self
            .rng_seed
            .wrapping_add(self.rng_cursor.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        self.rng_cursor += 1;
        ChaCha8Rng::seed_from_u64(stream)
    }

    /// End the match with the given winner
    pub fn finish(&mut self, winner_index: usize, reason: EndReason) {
        self.phase = Phase::Finished;
        self.pending_wild = None;
        self.winner_id = Some(self.players[winner_index].id.clone());
        self.end_reason = Some(reason);
        self.turn_deadline = None;
        self.match_deadline = None;
    }
}
