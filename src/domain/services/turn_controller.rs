//! Turn controller - the match state machine
//!
//! `apply_action` validates an actor's intent against a state snapshot and
//! returns the next state. The input snapshot is never modified, so a rejected
//! action leaves the canonical record untouched.

use std::collections::HashSet;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::domain::errors::EngineError;
use crate::domain::services::deck::{build_deck, deal, draw, draw_into_hand, flip_starter, shuffle};
use crate::domain::services::rules::{check_win, is_legal_play, resolve_effect, seat_advance};
use crate::domain::value_objects::{
    Card, Color, EndReason, GameState, LastAction, LastActionKind, MatchSettings, PendingWild,
    Phase, Player, MAX_PLAYERS, MIN_PLAYERS,
};

/// Player intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    #[serde(rename_all = "camelCase")]
    PlayCard {
        card: Card,
        /// Color for a wild, named together with the play
        #[serde(default)]
        declared_color: Option<Color>,
    },
    Draw,
    ChooseColor {
        color: Color,
    },
    CallUno,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::PlayCard { .. } => "playCard",
            Action::Draw => "draw",
            Action::ChooseColor { .. } => "chooseColor",
            Action::CallUno => "callUno",
        }
    }
}

/// Seat description used to create a game
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeatConfig {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

impl SeatConfig {
    pub fn human(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: None,
            is_bot: false,
        }
    }

    pub fn bot(id: &str) -> Self {
        Self {
            id: id.to_string(),
            display_name: None,
            is_bot: true,
        }
    }
}

/// Create a new game: shuffled deck, hands dealt in seat order, one card flipped
pub fn create_game(
    seats: &[SeatConfig],
    settings: MatchSettings,
    seed: Option<u64>,
) -> Result<GameState, EngineError> {
    if seats.len() < MIN_PLAYERS || seats.len() > MAX_PLAYERS {
        return Err(EngineError::InvalidSetup(format!(
            "{} players, expected {}-{}",
            seats.len(),
            MIN_PLAYERS,
            MAX_PLAYERS
        )));
    }
    settings
        .validate()
        .map_err(|e| EngineError::InvalidSetup(e.to_string()))?;

    let mut seen = HashSet::new();
    for seat in seats {
        if seat.id.trim().is_empty() {
            return Err(EngineError::InvalidSetup("player id must not be empty".to_string()));
        }
        if !seen.insert(seat.id.as_str()) {
            return Err(EngineError::InvalidSetup(format!("duplicate player id '{}'", seat.id)));
        }
    }

    let players = seats
        .iter()
        .map(|seat| {
            let name = seat.display_name.clone().unwrap_or_else(|| seat.id.clone());
            Player::new(seat.id.clone(), name, seat.is_bot)
        })
        .collect();

    let seed = seed.unwrap_or_else(rand::random);
    let hand_size = settings.hand_size as usize;
    let mut state = GameState::new(players, settings, seed);

    let mut deck = build_deck();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    shuffle(&mut deck, &mut rng);
    state.deck = deck;

    deal(&mut state, hand_size)?;
    let starter = flip_starter(&mut state)?;

    tracing::info!(
        "Created game for {} players, {} cards each, starter {}",
        state.player_count(),
        hand_size,
        starter
    );

    Ok(state)
}

/// Apply one player's action to a snapshot, producing the next state
pub fn apply_action(
    state: &GameState,
    actor_id: &str,
    action: &Action,
) -> Result<GameState, EngineError> {
    if state.is_finished() {
        return Err(EngineError::GameAlreadyFinished);
    }

    let actor = state
        .player_index(actor_id)
        .ok_or_else(|| EngineError::UnknownPlayer(actor_id.to_string()))?;

    let mut next = state.clone();
    match action {
        Action::ChooseColor { color } => choose_color(&mut next, actor, *color)?,
        _ if actor != state.current_player_index => return Err(EngineError::NotYourTurn),
        Action::PlayCard {
            card,
            declared_color,
        } => play_card(&mut next, actor, *card, *declared_color)?,
        Action::Draw => draw_turn(&mut next, actor, LastActionKind::Draw)?,
        Action::CallUno => call_uno(&mut next, actor)?,
    }

    next.version += 1;
    tracing::debug!(
        "Player {} applied {} -> phase {}, seat {}",
        actor,
        action.as_str(),
        next.phase.as_str(),
        next.current_player_index
    );
    Ok(next)
}

fn play_card(
    state: &mut GameState,
    actor: usize,
    card: Card,
    declared_color: Option<Color>,
) -> Result<(), EngineError> {
    if state.phase == Phase::AwaitingColorChoice {
        return Err(EngineError::ColorChoicePending);
    }

    let position = state.players[actor]
        .hand
        .iter()
        .position(|&c| c == card)
        .ok_or(EngineError::CardNotInHand(card))?;

    let legal = state
        .top_card()
        .map_or(true, |top| is_legal_play(&card, top, state.current_color));
    if !legal {
        return Err(EngineError::IllegalCard(card));
    }

    if let Some(color) = declared_color {
        if !card.is_wild() || !color.is_base() {
            return Err(EngineError::InvalidColorChoice);
        }
    }

    let hand = &mut state.players[actor].hand;
    hand.remove(position);
    if hand.len() > 1 {
        state.players[actor].uno_called = false;
    }
    state.discard.push(card);
    state.last_action = Some(LastAction {
        kind: LastActionKind::Play,
        player_index: actor,
        card: Some(card),
    });

    // Win check precedes every pending effect
    if let Some(winner) = check_win(state) {
        state.finish(winner, EndReason::EmptyHand);
        tracing::info!("Player {} emptied their hand and wins", winner);
        return Ok(());
    }

    let effect = resolve_effect(&card, state);

    if effect.reverses_direction {
        state.direction = state.direction.reversed();
    }

    if let Some(penalty) = effect.draw_penalty {
        let drawn = draw_into_hand(state, penalty.target, penalty.count);
        tracing::debug!("Player {} draws {} as penalty", penalty.target, drawn);
    }

    if effect.requires_color {
        match declared_color {
            Some(color) => {
                state.current_color = color;
                advance_turn(state, effect.step);
            }
            None => {
                state.phase = Phase::AwaitingColorChoice;
                state.pending_wild = Some(PendingWild {
                    player_index: actor,
                    step: effect.step,
                });
            }
        }
    } else {
        state.current_color = card.color;
        advance_turn(state, effect.step);
    }

    Ok(())
}

fn choose_color(state: &mut GameState, actor: usize, color: Color) -> Result<(), EngineError> {
    let pending = match state.pending_wild {
        Some(pending) if state.phase == Phase::AwaitingColorChoice && pending.player_index == actor => {
            pending
        }
        _ => return Err(EngineError::InvalidColorChoice),
    };

    if !color.is_base() {
        return Err(EngineError::InvalidColorChoice);
    }

    state.current_color = color;
    state.last_action = Some(LastAction {
        kind: LastActionKind::ChooseColor,
        player_index: actor,
        card: None,
    });
    advance_turn(state, pending.step);
    Ok(())
}

/// Draw one card for the active player and pass the turn.
/// An exhausted deck degrades to a plain pass.
pub(crate) fn draw_turn(
    state: &mut GameState,
    actor: usize,
    kind: LastActionKind,
) -> Result<(), EngineError> {
    if state.phase == Phase::AwaitingColorChoice {
        return Err(EngineError::ColorChoicePending);
    }

    let kind = match draw(state) {
        Ok(card) => {
            let player = &mut state.players[actor];
            player.hand.push(card);
            player.uno_called = false;
            kind
        }
        Err(EngineError::DeckExhausted) => {
            tracing::warn!("Deck exhausted, player {} passes", actor);
            LastActionKind::Pass
        }
        Err(e) => return Err(e),
    };

    state.last_action = Some(LastAction {
        kind,
        player_index: actor,
        card: None,
    });
    advance_turn(state, 1);
    Ok(())
}

fn call_uno(state: &mut GameState, actor: usize) -> Result<(), EngineError> {
    let player = &mut state.players[actor];
    if player.hand.len() > 2 {
        return Err(EngineError::UnoNotAllowed);
    }

    player.uno_called = true;
    state.last_action = Some(LastAction {
        kind: LastActionKind::CallUno,
        player_index: actor,
        card: None,
    });
    Ok(())
}

/// Move to the next seat and start a fresh turn
fn advance_turn(state: &mut GameState, step: usize) {
    state.current_player_index = seat_advance(
        state.current_player_index,
        state.direction,
        step,
        state.player_count(),
    );
    state.phase = Phase::AwaitingAction;
    state.pending_wild = None;
    state.turn_generation += 1;
    state.turn_deadline = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{CardValue, Direction, DECK_SIZE};

    /// Table with fixed hands and top card; the rest of the deck stays in the draw pile
    fn rigged(hands: &[&[Card]], top: Card, current: usize) -> GameState {
        let seats = (0..hands.len())
            .map(|i| Player::new(format!("p{}", i), format!("Player {}", i), false))
            .collect();
        let mut state = GameState::new(seats, MatchSettings::untimed(7), 5);

        let mut deck = build_deck();
        let mut take = |card: Card| {
            let pos = deck.iter().position(|&c| c == card).expect("card available");
            deck.remove(pos)
        };
        for (seat, hand) in hands.iter().enumerate() {
            for &card in hand.iter() {
                state.players[seat].hand.push(take(card));
            }
        }
        state.discard.push(take(top));
        state.deck = deck;
        state.current_color = top.color;
        state.current_player_index = current;
        state
    }

    fn red(n: u8) -> Card {
        Card::number(Color::Red, n)
    }

    fn play(card: Card) -> Action {
        Action::PlayCard {
            card,
            declared_color: None,
        }
    }

    #[test]
    fn test_create_game_deals_and_flips() {
        let seats = [SeatConfig::human("alice"), SeatConfig::bot("bot-1"), SeatConfig::human("carol")];
        let state = create_game(&seats, MatchSettings::default(), Some(42)).unwrap();

        assert_eq!(state.player_count(), 3);
        assert!(state.players.iter().all(|p| p.hand.len() == 7));
        assert_eq!(state.discard.len(), 1);
        assert_eq!(state.deck.len(), DECK_SIZE - 21 - 1);
        assert_eq!(state.total_cards(), DECK_SIZE);
        assert_ne!(state.current_color, Color::Black);
        assert_eq!(state.phase, Phase::AwaitingAction);
        assert_eq!(state.current_player_index, 0);
        assert!(state.players[1].is_bot);
        assert_eq!(state.players[0].display_name, "alice");
    }

    #[test]
    fn test_create_game_is_reproducible_with_seed() {
        let seats = [SeatConfig::human("a"), SeatConfig::human("b")];
        let first = create_game(&seats, MatchSettings::default(), Some(7)).unwrap();
        let second = create_game(&seats, MatchSettings::default(), Some(7)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_create_game_rejects_bad_setup() {
        let one = [SeatConfig::human("a")];
        assert!(matches!(
            create_game(&one, MatchSettings::default(), None),
            Err(EngineError::InvalidSetup(_))
        ));

        let five: Vec<SeatConfig> = (0..5).map(|i| SeatConfig::human(&format!("p{}", i))).collect();
        assert!(create_game(&five, MatchSettings::default(), None).is_err());

        let dupes = [SeatConfig::human("a"), SeatConfig::human("a")];
        assert!(create_game(&dupes, MatchSettings::default(), None).is_err());

        let mut settings = MatchSettings::default();
        settings.hand_size = 0;
        let seats = [SeatConfig::human("a"), SeatConfig::human("b")];
        assert!(create_game(&seats, settings, None).is_err());
    }

    #[test]
    fn test_last_card_wins_immediately() {
        let state = rigged(&[&[red(5)], &[Card::number(Color::Blue, 5)]], red(3), 0);

        let next = apply_action(&state, "p0", &play(red(5))).unwrap();

        assert_eq!(next.phase, Phase::Finished);
        assert_eq!(next.winner_id.as_deref(), Some("p0"));
        assert_eq!(next.end_reason, Some(EndReason::EmptyHand));
        assert_eq!(next.version, state.version + 1);
        assert_eq!(next.total_cards(), DECK_SIZE);
    }

    #[test]
    fn test_winning_draw4_skips_penalty() {
        let state = rigged(&[&[Card::wild_draw4()], &[red(1), red(2)]], red(3), 0);

        let next = apply_action(&state, "p0", &play(Card::wild_draw4())).unwrap();

        assert_eq!(next.phase, Phase::Finished);
        assert_eq!(next.players[1].hand.len(), 2);
        assert_eq!(next.pending_wild, None);
    }

    #[test]
    fn test_finished_game_rejects_everything() {
        let state = rigged(&[&[red(5)], &[red(6)]], red(3), 0);
        let finished = apply_action(&state, "p0", &play(red(5))).unwrap();

        assert_eq!(apply_action(&finished, "p1", &Action::Draw), Err(EngineError::GameAlreadyFinished));
        assert_eq!(
            apply_action(&finished, "p1", &Action::ChooseColor { color: Color::Red }),
            Err(EngineError::GameAlreadyFinished)
        );
    }

    #[test]
    fn test_skip_jumps_one_seat() {
        let skip = Card::new(Color::Green, CardValue::Skip);
        let state = rigged(
            &[&[skip, red(1)], &[red(2)], &[red(4)], &[red(6)]],
            Card::number(Color::Green, 3),
            0,
        );

        let next = apply_action(&state, "p0", &play(skip)).unwrap();

        assert_eq!(next.current_player_index, 2);
        assert_eq!(next.current_color, Color::Green);
        assert_eq!(next.turn_generation, state.turn_generation + 1);
    }

    #[test]
    fn test_draw2_penalises_next_and_skips() {
        let draw2 = Card::new(Color::Yellow, CardValue::Draw2);
        let state = rigged(
            &[&[red(1)], &[draw2, red(2)], &[red(4)]],
            Card::number(Color::Yellow, 4),
            1,
        );

        let next = apply_action(&state, "p1", &play(draw2)).unwrap();

        assert_eq!(next.players[2].hand.len(), 3);
        assert_eq!(next.current_player_index, 0);
        assert_eq!(next.total_cards(), DECK_SIZE);
    }

    #[test]
    fn test_reverse_flips_direction() {
        let reverse = Card::new(Color::Red, CardValue::Reverse);
        let state = rigged(&[&[reverse, red(1)], &[red(2)], &[red(4)]], red(3), 0);

        let next = apply_action(&state, "p0", &play(reverse)).unwrap();

        assert_eq!(next.direction, Direction::CounterClockwise);
        assert_eq!(next.current_player_index, 2);
    }

    #[test]
    fn test_two_player_reverse_acts_as_skip() {
        let reverse = Card::new(Color::Red, CardValue::Reverse);
        let state = rigged(&[&[reverse, red(1)], &[red(2)]], red(3), 0);

        let next = apply_action(&state, "p0", &play(reverse)).unwrap();

        assert_eq!(next.current_player_index, 0);
        assert_eq!(next.turn_generation, state.turn_generation + 1);
    }

    #[test]
    fn test_wild_waits_for_color_from_player() {
        let state = rigged(&[&[Card::wild(), red(1)], &[red(2)], &[red(4)]], red(3), 0);

        let waiting = apply_action(&state, "p0", &play(Card::wild())).unwrap();
        assert_eq!(waiting.phase, Phase::AwaitingColorChoice);
        assert_eq!(waiting.pending_wild, Some(PendingWild { player_index: 0, step: 1 }));
        assert_eq!(waiting.current_player_index, 0);

        assert_eq!(apply_action(&waiting, "p1", &Action::Draw), Err(EngineError::NotYourTurn));
        assert_eq!(
            apply_action(&waiting, "p1", &Action::ChooseColor { color: Color::Blue }),
            Err(EngineError::InvalidColorChoice)
        );
        assert_eq!(apply_action(&waiting, "p0", &Action::Draw), Err(EngineError::ColorChoicePending));
        assert_eq!(
            apply_action(&waiting, "p0", &Action::ChooseColor { color: Color::Black }),
            Err(EngineError::InvalidColorChoice)
        );

        let next = apply_action(&waiting, "p0", &Action::ChooseColor { color: Color::Blue }).unwrap();
        assert_eq!(next.current_color, Color::Blue);
        assert_eq!(next.phase, Phase::AwaitingAction);
        assert_eq!(next.current_player_index, 1);
        assert_eq!(next.pending_wild, None);
    }

    #[test]
    fn test_declared_color_resolves_wild_at_once() {
        let state = rigged(&[&[Card::wild_draw4(), red(1)], &[red(2)], &[red(4)]], red(3), 0);

        let action = Action::PlayCard {
            card: Card::wild_draw4(),
            declared_color: Some(Color::Green),
        };
        let next = apply_action(&state, "p0", &action).unwrap();

        assert_eq!(next.phase, Phase::AwaitingAction);
        assert_eq!(next.current_color, Color::Green);
        assert_eq!(next.players[1].hand.len(), 5);
        assert_eq!(next.current_player_index, 2);
    }

    #[test]
    fn test_choose_color_outside_wild_phase() {
        let state = rigged(&[&[red(1)], &[red(2)]], red(3), 0);
        assert_eq!(
            apply_action(&state, "p0", &Action::ChooseColor { color: Color::Red }),
            Err(EngineError::InvalidColorChoice)
        );
    }

    #[test]
    fn test_rejections_leave_state_alone() {
        let state = rigged(&[&[Card::number(Color::Blue, 7), red(1)], &[red(2)]], red(3), 0);
        let before = state.clone();

        assert_eq!(
            apply_action(&state, "p0", &play(Card::number(Color::Blue, 7))),
            Err(EngineError::IllegalCard(Card::number(Color::Blue, 7)))
        );
        assert_eq!(
            apply_action(&state, "p0", &play(red(9))),
            Err(EngineError::CardNotInHand(red(9)))
        );
        assert_eq!(apply_action(&state, "p1", &play(red(2))), Err(EngineError::NotYourTurn));
        assert_eq!(
            apply_action(&state, "ghost", &Action::Draw),
            Err(EngineError::UnknownPlayer("ghost".to_string()))
        );
        assert_eq!(
            apply_action(
                &state,
                "p0",
                &Action::PlayCard {
                    card: red(1),
                    declared_color: Some(Color::Blue)
                }
            ),
            Err(EngineError::InvalidColorChoice)
        );

        assert_eq!(state, before);
    }

    #[test]
    fn test_draw_takes_one_and_passes() {
        let state = rigged(&[&[red(1)], &[red(2)], &[red(4)]], Card::number(Color::Blue, 3), 0);

        let next = apply_action(&state, "p0", &Action::Draw).unwrap();

        assert_eq!(next.players[0].hand.len(), 2);
        assert_eq!(next.deck.len(), state.deck.len() - 1);
        assert_eq!(next.current_player_index, 1);
        assert_eq!(next.last_action.map(|a| a.kind), Some(LastActionKind::Draw));
        assert_eq!(next.version, 1);
    }

    #[test]
    fn test_exhausted_draw_becomes_pass() {
        let mut state = rigged(&[&[red(1)], &[red(2)]], Card::number(Color::Blue, 3), 0);
        let rest = std::mem::take(&mut state.deck);
        state.players[1].hand.extend(rest);

        let next = apply_action(&state, "p0", &Action::Draw).unwrap();

        assert_eq!(next.players[0].hand.len(), 1);
        assert_eq!(next.current_player_index, 1);
        assert_eq!(next.last_action.map(|a| a.kind), Some(LastActionKind::Pass));
        assert_eq!(next.total_cards(), DECK_SIZE);
    }

    #[test]
    fn test_call_uno() {
        let state = rigged(&[&[red(1), red(2)], &[red(4), red(5), red(6)]], red(3), 0);

        let called = apply_action(&state, "p0", &Action::CallUno).unwrap();
        assert!(called.players[0].uno_called);
        assert_eq!(called.current_player_index, 0);
        assert_eq!(called.turn_generation, state.turn_generation);

        let played = apply_action(&called, "p0", &play(red(1))).unwrap();
        assert!(played.players[0].uno_called);

        let mut too_many = state.clone();
        too_many.current_player_index = 1;
        assert_eq!(apply_action(&too_many, "p1", &Action::CallUno), Err(EngineError::UnoNotAllowed));
    }

    #[test]
    fn test_apply_action_is_deterministic() {
        let mut state = rigged(&[&[red(1)], &[red(2)]], Card::number(Color::Blue, 3), 0);
        // Force a reshuffle so the seeded randomness is exercised
        let rest = std::mem::take(&mut state.deck);
        let top = state.discard.pop().unwrap();
        state.discard.extend(rest);
        state.discard.push(top);

        let first = apply_action(&state, "p0", &Action::Draw).unwrap();
        let second = apply_action(&state, "p0", &Action::Draw).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.discard, vec![top]);
    }

    #[test]
    fn test_action_json_shape() {
        let action: Action = serde_json::from_value(serde_json::json!({
            "type": "playCard",
            "card": {"color": "black", "value": "wild"},
            "declaredColor": "yellow"
        }))
        .unwrap();
        assert_eq!(
            action,
            Action::PlayCard {
                card: Card::wild(),
                declared_color: Some(Color::Yellow)
            }
        );

        let draw: Action = serde_json::from_value(serde_json::json!({"type": "draw"})).unwrap();
        assert_eq!(draw, Action::Draw);
    }
}
