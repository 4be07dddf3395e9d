//! Bot agent
//!
//! Plays a uniformly random legal card, draws when nothing is playable and
//! names a random color for its wilds.

use rand::seq::SliceRandom;
use rand::Rng;

use super::PlayerAgent;
use crate::domain::services::{legal_cards, Action};
use crate::domain::value_objects::{Color, GameState, Phase};

/// Random-play bot
pub struct BotAgent;

impl BotAgent {
    pub fn new() -> Self {
        Self
    }

    /// Decide with an injected random source
    pub fn decide_with_rng<R: Rng + ?Sized>(
        &self,
        state: &GameState,
        player_index: usize,
        rng: &mut R,
    ) -> Option<Action> {
        if state.is_finished() || player_index >= state.player_count() {
            return None;
        }

        // A wild left waiting for its color
        if state.phase == Phase::AwaitingColorChoice {
            return state
                .pending_wild
                .filter(|p| p.player_index == player_index)
                .map(|_| Action::ChooseColor {
                    color: random_color(rng),
                });
        }

        if state.current_player_index != player_index {
            return None;
        }

        let playable = legal_cards(state, player_index);

        let player = &state.players[player_index];
        if player.hand.len() == 2 && !player.uno_called && !playable.is_empty() {
            return Some(Action::CallUno);
        }

        match playable.choose(rng) {
            Some(&card) => Some(Action::PlayCard {
                card,
                declared_color: card.is_wild().then(|| random_color(rng)),
            }),
            None => Some(Action::Draw),
        }
    }
}

impl Default for BotAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerAgent for BotAgent {
    fn is_bot(&self) -> bool {
        true
    }

    fn decide(&self, state: &GameState, player_index: usize) -> Option<Action> {
        let mut rng = rand::thread_rng();
        self.decide_with_rng(state, player_index, &mut rng)
    }
}

fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Color {
    Color::BASE[rng.gen_range(0..Color::BASE.len())]
}
