use crate::domain::value_objects::Card;

/// Rejections from the turn controller and deck manager.
///
/// Every variant is returned before any mutation, so the canonical state is
/// never touched by a rejected action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("Card {0} cannot be played on the current discard")]
    IllegalCard(Card),
    #[error("Card {0} is not in your hand")]
    CardNotInHand(Card),
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Game already finished")]
    GameAlreadyFinished,
    #[error("Deck and discard are exhausted")]
    DeckExhausted,
    #[error("State changed concurrently, re-read and retry")]
    StaleState,
    #[error("Invalid color choice")]
    InvalidColorChoice,
    #[error("A wild color must be chosen first")]
    ColorChoicePending,
    #[error("UNO can only be called with two cards or fewer")]
    UnoNotAllowed,
    #[error("Unknown player: {0}")]
    UnknownPlayer(String),
    #[error("Invalid setup: {0}")]
    InvalidSetup(String),
}
