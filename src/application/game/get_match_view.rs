use std::sync::Arc;

use serde::Serialize;

use crate::application::game::MatchError;
use crate::domain::errors::EngineError;
use crate::domain::repositories::MatchRepository;
use crate::domain::services::legal_cards;
use crate::domain::value_objects::{
    Card, Color, Direction, EndReason, GameState, LastAction, Phase,
};

/// Public information about one seat
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatView {
    pub id: String,
    pub display_name: String,
    pub is_bot: bool,
    pub hand_size: usize,
    pub uno_called: bool,
}

/// Match as seen by one participant (or by a spectator when `viewer` is None).
/// Only the viewer's own hand is revealed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchView {
    pub match_id: String,
    pub version: u64,
    pub phase: Phase,
    pub players: Vec<SeatView>,
    pub current_player_index: usize,
    pub current_player_id: String,
    pub direction: Direction,
    pub current_color: Color,
    pub top_card: Option<Card>,
    pub deck_size: usize,
    pub discard_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_color_player_id: Option<String>,
    pub turn_deadline: Option<i64>,
    pub match_deadline: Option<i64>,
    pub winner_id: Option<String>,
    pub end_reason: Option<EndReason>,
    pub last_action: Option<LastAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Card>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playable_cards: Option<Vec<Card>>,
}

impl MatchView {
    pub fn from_state(match_id: &str, state: &GameState, viewer: Option<usize>) -> Self {
        let players = state
            .players
            .iter()
            .map(|p| SeatView {
                id: p.id.clone(),
                display_name: p.display_name.clone(),
                is_bot: p.is_bot,
                hand_size: p.hand.len(),
                uno_called: p.uno_called,
            })
            .collect();

        let hand = viewer.map(|i| state.players[i].hand.to_vec());

        // Playable cards are only offered while the viewer may play
        let playable_cards = viewer
            .filter(|&i| i == state.current_player_index && state.phase == Phase::AwaitingAction)
            .map(|i| legal_cards(state, i).to_vec());

        MatchView {
            match_id: match_id.to_string(),
            version: state.version,
            phase: state.phase,
            players,
            current_player_index: state.current_player_index,
            current_player_id: state.current_player().id.clone(),
            direction: state.direction,
            current_color: state.current_color,
            top_card: state.top_card().copied(),
            deck_size: state.deck.len(),
            discard_size: state.discard.len(),
            pending_color_player_id: state
                .pending_wild
                .map(|p| state.players[p.player_index].id.clone()),
            turn_deadline: state.turn_deadline,
            match_deadline: state.match_deadline,
            winner_id: state.winner_id.clone(),
            end_reason: state.end_reason,
            last_action: state.last_action,
            player_index: viewer,
            hand,
            playable_cards,
        }
    }
}

/// Get match view input
pub struct GetMatchViewInput {
    pub match_id: String,
    pub player_id: Option<String>,
}

/// Get match view use case
pub struct GetMatchView<R: MatchRepository + ?Sized> {
    match_repo: Arc<R>,
}

impl<R: MatchRepository + ?Sized> GetMatchView<R> {
    pub fn new(match_repo: Arc<R>) -> Self {
        Self { match_repo }
    }

    pub async fn execute(&self, input: GetMatchViewInput) -> Result<MatchView, MatchError> {
        let (state, _) = self.match_repo.read_state(&input.match_id).await?;

        let viewer = match input.player_id.as_deref() {
            Some(id) => Some(
                state
                    .player_index(id)
                    .ok_or_else(|| EngineError::UnknownPlayer(id.to_string()))?,
            ),
            None => None,
        };

        Ok(MatchView::from_state(&input.match_id, &state, viewer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::{create_game, SeatConfig};
    use crate::domain::value_objects::MatchSettings;

    fn state() -> GameState {
        let seats = [SeatConfig::human("alice"), SeatConfig::bot("bot")];
        create_game(&seats, MatchSettings::default(), Some(5)).unwrap()
    }

    #[test]
    fn test_view_hides_other_hands() {
        let state = state();
        let view = MatchView::from_state("m", &state, Some(1));

        assert_eq!(view.hand.as_ref().map(|h| h.len()), Some(7));
        assert_eq!(view.players[0].hand_size, 7);
        assert!(view.playable_cards.is_none());

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("deck").is_none());
        assert_eq!(json["currentPlayerId"], "alice");
        assert_eq!(json["players"][1]["isBot"], true);
    }

    #[test]
    fn test_current_player_sees_playable_cards() {
        let state = state();
        let view = MatchView::from_state("m", &state, Some(0));
        let playable = view.playable_cards.unwrap();
        let expected = legal_cards(&state, 0);
        assert_eq!(playable.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_spectator_view() {
        let view = MatchView::from_state("m", &state(), None);
        assert!(view.hand.is_none());
        assert!(view.player_index.is_none());
    }
}
