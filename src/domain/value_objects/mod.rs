mod card;
mod game_state;
mod match_settings;

pub use card::*;
pub use game_state::*;
pub use match_settings::*;
