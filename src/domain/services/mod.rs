pub mod deck;
pub mod rules;
pub mod timer;
pub mod turn_controller;

pub use deck::{build_deck, draw_into_hand, shuffle};
pub use rules::{check_win, is_legal_play, legal_cards, resolve_effect};
pub use timer::{is_timer_current, tick};
pub use turn_controller::{apply_action, create_game, Action, SeatConfig};
