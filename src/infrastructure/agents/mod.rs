//! Player agents
//!
//! Humans and bots sit behind the same capability; the runtime asks the agent
//! of the seat to act and never looks at player ids to tell them apart.

mod bot_agent;
mod human_agent;

pub use bot_agent::*;
pub use human_agent::*;

use crate::domain::services::Action;
use crate::domain::value_objects::{GameState, Player};

/// Player agent trait
pub trait PlayerAgent: Send + Sync {
    /// Whether the agent acts on its own
    fn is_bot(&self) -> bool;

    /// Next action for the seat, or None when the agent waits for outside input
    fn decide(&self, state: &GameState, player_index: usize) -> Option<Action>;
}

/// Agent matching a seated player's capability
pub fn agent_for(player: &Player) -> Box<dyn PlayerAgent> {
    if player.is_bot {
        Box::new(BotAgent::new())
    } else {
        Box::new(HumanAgent)
    }
}
