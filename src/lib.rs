//! Multiplayer UNO-style match engine with an axum service around it.
//!
//! The engine itself lives in `domain`: pure state transitions over a
//! versioned [`GameState`](domain::value_objects::GameState). Everything else
//! stores, schedules and serves those states.

pub mod api;
pub mod application;
pub mod domain;
pub mod infrastructure;
