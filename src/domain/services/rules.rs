//! Rules engine - pure legality and effect resolution

use smallvec::SmallVec;

use crate::domain::value_objects::{Card, CardValue, Color, Direction, GameState};

/// A play is legal when it matches the active color, the top card's value, or is wild
#[inline]
pub fn is_legal_play(card: &Card, top_card: &Card, current_color: Color) -> bool {
    card.color == current_color || card.value == top_card.value || card.color == Color::Black
}

/// Seat reached from `current` after `step` seats in `direction`
pub fn seat_advance(current: usize, direction: Direction, step: usize, player_count: usize) -> usize {
    let n = player_count as i64;
    let next = (current as i64 + direction.sign() * step as i64) % n;
    ((next + n) % n) as usize
}

/// Cards the next player is forced to take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawPenalty {
    pub target: usize,
    pub count: usize,
}

/// What a played card does to the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect {
    /// Seats to advance once the play completes
    pub step: usize,
    pub reverses_direction: bool,
    pub draw_penalty: Option<DrawPenalty>,
    /// Seat advance waits for the player to name a color
    pub requires_color: bool,
}

impl Effect {
    fn advance(step: usize) -> Self {
        Self {
            step,
            reverses_direction: false,
            draw_penalty: None,
            requires_color: false,
        }
    }
}

/// Resolve the effect of `card` played by the current player
pub fn resolve_effect(card: &Card, state: &GameState) -> Effect {
    let player_count = state.player_count();
    let next = seat_advance(state.current_player_index, state.direction, 1, player_count);

    match card.value {
        CardValue::Number(_) => Effect::advance(1),
        CardValue::Skip => Effect::advance(2),
        CardValue::Reverse => {
            let step = if player_count == 2 && state.settings.two_player_reverse_skips {
                2
            } else {
                1
            };
            Effect {
                reverses_direction: true,
                ..Effect::advance(step)
            }
        }
        CardValue::Draw2 => Effect {
            draw_penalty: Some(DrawPenalty { target: next, count: 2 }),
            ..Effect::advance(2)
        },
        CardValue::Wild => Effect {
            requires_color: true,
            ..Effect::advance(1)
        },
        CardValue::WildDraw4 => Effect {
            draw_penalty: Some(DrawPenalty { target: next, count: 4 }),
            requires_color: true,
            ..Effect::advance(2)
        },
    }
}

/// Seat of a player whose hand is empty, if any
pub fn check_win(state: &GameState) -> Option<usize> {
    state.players.iter().position(|p| p.hand.is_empty())
}

/// Every card in the player's hand that can legally be played now
pub fn legal_cards(state: &GameState, player_index: usize) -> SmallVec<[Card; 16]> {
    let Some(top) = state.top_card() else {
        return SmallVec::new();
    };

    state.players[player_index]
        .hand
        .iter()
        .filter(|card| is_legal_play(card, top, state.current_color))
        .copied()
        .collect()
}
