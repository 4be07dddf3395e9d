mod advance_clock;
mod create_match;
mod get_match_view;
mod mutation;
mod submit_action;

pub use advance_clock::*;
pub use create_match::*;
pub use get_match_view::*;
pub use mutation::*;
pub use submit_action::*;
