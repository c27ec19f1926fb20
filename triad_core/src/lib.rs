use std::sync::Arc;

use config::Config;
use events::UiSink;
use player::PlayerId;

pub mod config;
mod dealer;
pub mod deck;
pub mod events;
mod game;
pub mod player;
mod presser;
pub mod table;

pub use game::{Game, StopHandle};

/// Runs a complete game against the given UI sink and returns the winners.
/// Frontends that need key-press or stop handles build a [`Game`] instead.
pub fn run_game(config: Config, ui: Arc<dyn UiSink>) -> Vec<PlayerId> {
    Game::new(config, ui).run()
}
