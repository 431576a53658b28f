pub mod autopilot;
pub mod clock;
pub mod config;
pub mod economy;
pub mod events;
pub mod game;
pub mod geometry;
pub mod persistence;
pub mod player;
pub mod progression;
pub mod rng;
pub mod trash;
pub mod web;
pub mod zones;

pub use config::{ConfigLoader, GameConfig};
pub use economy::GameState;
pub use game::{Game, GameBuilder, GameError, GameView, Input, TickSummary};
