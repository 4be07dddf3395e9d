//! Turn and match timers
//!
//! `tick` is a pure function of the state and the current time. Deadlines are
//! stored in the state itself, so any replica evaluating the same snapshot at
//! the same instant makes the same decision, and a repeated tick is a no-op.

use rand::seq::SliceRandom;

use crate::domain::services::turn_controller::draw_turn;
use crate::domain::value_objects::{EndReason, GameState, LastActionKind, Phase};

/// Advance time-based transitions up to `now` (epoch milliseconds)
pub fn tick(state: &GameState, now: i64) -> GameState {
    let mut next = state.clone();
    if next.is_finished() {
        return next;
    }

    if let Some(deadline) = next.match_deadline {
        if now >= deadline {
            expire_match(&mut next);
            next.version += 1;
            return next;
        }
    } else if let Some(duration) = next.settings.match_duration_ms {
        next.match_deadline = Some(now + duration);
    }

    if let Some(timeout) = next.settings.turn_timeout_ms {
        run_turn_timer(&mut next, now, timeout);
    }

    if next != *state {
        next.version += 1;
    }
    next
}

fn run_turn_timer(state: &mut GameState, now: i64, timeout: i64) {
    // Bots act on their own schedule and a pending wild color has no turn timer
    if state.phase != Phase::AwaitingAction || state.current_player().is_bot {
        state.turn_deadline = None;
        return;
    }

    let Some(deadline) = state.turn_deadline else {
        state.turn_deadline = Some(now + timeout);
        return;
    };

    if now < deadline {
        return;
    }

    let seat = state.current_player_index;
    tracing::info!("Turn timer expired for player {}, forcing a draw", seat);
    if let Err(e) = draw_turn(state, seat, LastActionKind::ForcedDraw) {
        tracing::warn!("Forced draw for player {} rejected: {}", seat, e);
        return;
    }

    if !state.current_player().is_bot {
        state.turn_deadline = Some(now + timeout);
    }
}

/// Finish the match in favour of the player holding the fewest cards.
/// Ties are broken with the match's seeded randomness.
fn expire_match(state: &mut GameState) {
    let Some(fewest) = state.players.iter().map(|p| p.hand.len()).min() else {
        return;
    };

    let leaders: Vec<usize> = state
        .players
        .iter()
        .enumerate()
        .filter(|(_, p)| p.hand.len() == fewest)
        .map(|(i, _)| i)
        .collect();

    let mut rng = state.next_rng();
    let winner = leaders.choose(&mut rng).copied().unwrap_or(0);

    tracing::info!(
        "Match expired, player {} wins with {} cards ({} tied)",
        winner,
        fewest,
        leaders.len()
    );
    state.finish(winner, EndReason::MatchExpired);
}

/// True when a callback scheduled for `generation` still refers to the live turn
#[inline]
pub fn is_timer_current(state: &GameState, generation: u64) -> bool {
    !state.is_finished() && state.turn_generation == generation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::turn_controller::{apply_action, create_game, Action, SeatConfig};
    use crate::domain::value_objects::{Card, MatchSettings, DECK_SIZE};

    const T0: i64 = 1_700_000_000_000;

    fn settings() -> MatchSettings {
        MatchSettings {
            turn_timeout_ms: Some(30_000),
            match_duration_ms: Some(600_000),
            ..MatchSettings::default()
        }
    }

    fn humans() -> GameState {
        let seats = [SeatConfig::human("a"), SeatConfig::human("b"), SeatConfig::human("c")];
        create_game(&seats, settings(), Some(11)).unwrap()
    }

    #[test]
    fn test_tick_arms_deadlines_once() {
        let state = humans();

        let armed = tick(&state, T0);
        assert_eq!(armed.turn_deadline, Some(T0 + 30_000));
        assert_eq!(armed.match_deadline, Some(T0 + 600_000));
        assert_eq!(armed.version, state.version + 1);

        let again = tick(&armed, T0 + 1_000);
        assert_eq!(again, armed);
    }

    #[test]
    fn test_turn_timeout_forces_draw() {
        let armed = tick(&humans(), T0);

        let expired = tick(&armed, T0 + 30_000);
        assert_eq!(expired.current_player_index, 1);
        assert_eq!(expired.players[0].hand.len(), 8);
        assert_eq!(expired.turn_generation, armed.turn_generation + 1);
        assert_eq!(expired.turn_deadline, Some(T0 + 60_000));
        assert_eq!(expired.last_action.map(|a| a.kind), Some(LastActionKind::ForcedDraw));
        assert_eq!(expired.total_cards(), DECK_SIZE);

        // A late duplicate of the same timer finds nothing to do
        assert_eq!(tick(&expired, T0 + 30_500), expired);
    }

    #[test]
    fn test_bot_turn_has_no_turn_deadline() {
        let seats = [SeatConfig::bot("bot"), SeatConfig::human("h")];
        let state = create_game(&seats, settings(), Some(3)).unwrap();

        let ticked = tick(&state, T0);
        assert_eq!(ticked.turn_deadline, None);
        assert!(ticked.match_deadline.is_some());
    }

    #[test]
    fn test_untimed_match_is_untouched() {
        let seats = [SeatConfig::human("a"), SeatConfig::human("b")];
        let state = create_game(&seats, MatchSettings::untimed(7), Some(3)).unwrap();
        assert_eq!(tick(&state, T0), state);
    }

    #[test]
    fn test_match_expiry_picks_fewest_cards() {
        let mut state = tick(&humans(), T0);
        let card = state.players[2].hand.pop().unwrap();
        state.discard.insert(0, card);

        let finished = tick(&state, T0 + 600_000);
        assert!(finished.is_finished());
        assert_eq!(finished.winner_id.as_deref(), Some("c"));
        assert_eq!(finished.end_reason, Some(EndReason::MatchExpired));
        assert_eq!(finished.match_deadline, None);

        assert_eq!(tick(&finished, T0 + 700_000), finished);
    }

    #[test]
    fn test_match_expiry_tie_break_is_deterministic() {
        let state = tick(&humans(), T0);
        let first = tick(&state, T0 + 600_000);
        let second = tick(&state, T0 + 600_000);

        assert_eq!(first, second);
        assert!(first.winner_id.is_some());
    }

    #[test]
    fn test_pending_color_has_no_turn_timer() {
        let seats = [SeatConfig::human("a"), SeatConfig::human("b")];
        let untimed_match = MatchSettings {
            match_duration_ms: None,
            ..settings()
        };
        let mut state = create_game(&seats, untimed_match, Some(2)).unwrap();
        state.players[0].hand.push(Card::wild());
        let armed = tick(&state, T0);

        let play = Action::PlayCard {
            card: Card::wild(),
            declared_color: None,
        };
        let waiting = apply_action(&armed, "a", &play).unwrap();
        assert_eq!(waiting.phase, Phase::AwaitingColorChoice);

        // Without a match timer nothing ends the wait but the color itself
        let later = tick(&waiting, T0 + 10 * 30_000);
        assert_eq!(later.phase, Phase::AwaitingColorChoice);
        assert_eq!(later.turn_deadline, None);
        assert_eq!(later.players[0].hand.len(), waiting.players[0].hand.len());
    }

    #[test]
    fn test_is_timer_current() {
        let state = tick(&humans(), T0);
        assert!(is_timer_current(&state, state.turn_generation));

        let advanced = tick(&state, T0 + 30_000);
        assert!(!is_timer_current(&advanced, state.turn_generation));
    }
}
