//! Deck manager - builds, shuffles, deals and reshuffles cards

use rand::Rng;

use crate::domain::errors::EngineError;
use crate::domain::value_objects::{Card, CardValue, Color, GameState, DECK_SIZE};

/// Build the full 108-card deck in a fixed order
pub fn build_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);

    for color in Color::BASE {
        deck.push(Card::number(color, 0));
        for _ in 0..2 {
            for n in 1..=9 {
                deck.push(Card::number(color, n));
            }
            deck.push(Card::new(color, CardValue::Skip));
            deck.push(Card::new(color, CardValue::Reverse));
            deck.push(Card::new(color, CardValue::Draw2));
        }
    }

    for _ in 0..4 {
        deck.push(Card::wild());
        deck.push(Card::wild_draw4());
    }

    deck
}

/// Fisher-Yates shuffle
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

/// Draw the top card, reshuffling the discard (minus its top) when the deck is empty
pub fn draw(state: &mut GameState) -> Result<Card, EngineError> {
    if let Some(card) = state.deck.pop() {
        return Ok(card);
    }

    reshuffle_discard(state);
    state.deck.pop().ok_or(EngineError::DeckExhausted)
}

/// Move every discard card except the top into a freshly shuffled deck.
/// Returns the number of cards moved.
fn reshuffle_discard(state: &mut GameState) -> usize {
    let Some(top) = state.discard.pop() else {
        return 0;
    };

    let mut fresh = std::mem::take(&mut state.discard);
    state.discard.push(top);

    if fresh.is_empty() {
        return 0;
    }

    let mut rng = state.next_rng();
    shuffle(&mut fresh, &mut rng);

    let moved = fresh.len();
    state.deck.extend(fresh);
    tracing::debug!("Reshuffled {} discarded cards into the deck", moved);
    moved
}

/// Draw up to `count` cards into a hand, stopping quietly when nothing is left.
/// Returns how many cards were drawn.
pub fn draw_into_hand(state: &mut GameState, player_index: usize, count: usize) -> usize {
    let mut drawn = 0;
    for _ in 0..count {
        match draw(state) {
            Ok(card) => {
                state.players[player_index].hand.push(card);
                drawn += 1;
            }
            Err(_) => {
                tracing::warn!(
                    "Deck exhausted after {} of {} cards for player {}",
                    drawn,
                    count,
                    player_index
                );
                break;
            }
        }
    }

    if drawn > 0 {
        state.players[player_index].uno_called = false;
    }
    drawn
}

/// Deal `count` cards to each player, one at a time in seat order
pub fn deal(state: &mut GameState, count: usize) -> Result<(), EngineError> {
    for _ in 0..count {
        for seat in 0..state.player_count() {
            let card = draw(state)?;
            state.players[seat].hand.push(card);
        }
    }
    Ok(())
}

/// Flip the first colored card onto the discard to seed the current color.
/// Black cards go back under the deck.
pub fn flip_starter(state: &mut GameState) -> Result<Card, EngineError> {
    for _ in 0..state.deck.len() {
        let card = state.deck.pop().ok_or(EngineError::DeckExhausted)?;
        if card.color.is_base() {
            state.discard.push(card);
            state.current_color = card.color;
            return Ok(card);
        }
        state.deck.insert(0, card);
    }

    Err(EngineError::InvalidSetup("no colored card left to flip".to_string()))
}
