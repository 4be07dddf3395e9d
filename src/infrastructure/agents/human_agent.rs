use super::PlayerAgent;
use crate::domain::services::Action;
use crate::domain::value_objects::GameState;

/// Human seat; actions arrive through the API
pub struct HumanAgent;

impl PlayerAgent for HumanAgent {
    fn is_bot(&self) -> bool {
        false
    }

    fn decide(&self, _state: &GameState, _player_index: usize) -> Option<Action> {
        None
    }
}
