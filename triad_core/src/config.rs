use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// All game tunables. Every field has a default, so a config file only needs
/// to list what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Values per card feature. This is also the number of tokens that make
    /// a submission and the capacity of each player's action queue.
    pub feature_size: usize,
    /// Features per card; the deck holds `feature_size ^ feature_count` cards.
    pub feature_count: u32,
    pub table_size: usize,
    pub player_names: Vec<String>,
    /// Humans get the first ids, computers the rest.
    pub human_players: usize,
    pub computer_players: usize,
    pub turn_timeout_millis: u64,
    /// Artificial delay on every card placement/removal.
    pub table_delay_millis: u64,
    pub point_freeze_millis: u64,
    pub penalty_freeze_millis: u64,
    pub ai_sleep_millis: u64,
    /// Log every legal set on the table at the start of a round.
    pub hints: bool,
    /// Fixed seed for the dealer shuffle and the AI pressers.
    pub rng_seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            feature_size: 3,
            feature_count: 4,
            table_size: 12,
            player_names: vec![
                "You".to_string(),
                "Computer Alpha".to_string(),
                "Computer Bravo".to_string(),
                "Computer Charlie".to_string(),
            ],
            human_players: 1,
            computer_players: 3,
            turn_timeout_millis: 60_000,
            table_delay_millis: 100,
            point_freeze_millis: 1_000,
            penalty_freeze_millis: 3_000,
            ai_sleep_millis: 1_000,
            hints: false,
            rng_seed: None,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn deck_size(&self) -> usize {
        self.feature_size.pow(self.feature_count)
    }

    /// Number of cards in a legal set.
    pub fn set_size(&self) -> usize {
        self.feature_size
    }

    pub fn players(&self) -> usize {
        self.human_players + self.computer_players
    }

    pub fn player_name(&self, id: usize) -> String {
        self.player_names
            .get(id)
            .cloned()
            .unwrap_or_else(|| format!("player-{id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_should_describe_the_canonical_deck() {
        let config = Config::default();

        assert_eq!(config.deck_size(), 81);
        assert_eq!(config.set_size(), 3);
        assert_eq!(config.players(), 4);
    }

    #[test]
    fn player_name_should_fall_back_past_the_configured_list() {
        let config = Config::default();

        assert_eq!(config.player_name(0), "You");
        assert_eq!(config.player_name(7), "player-7");
    }

    #[test]
    fn load_should_keep_defaults_for_absent_fields() {
        let path = std::env::temp_dir().join("triad_config_partial.json");
        fs::write(&path, r#"{ "table_size": 9, "hints": true }"#).unwrap();

        let config = Config::load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(config.table_size, 9);
        assert!(config.hints);
        assert_eq!(config.feature_size, 3);
        assert_eq!(config.turn_timeout_millis, 60_000);
    }

    #[test]
    fn load_should_report_malformed_json() {
        let path = std::env::temp_dir().join("triad_config_broken.json");
        fs::write(&path, "{ not json").unwrap();

        let result = Config::load(&path);
        fs::remove_file(&path).ok();

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
