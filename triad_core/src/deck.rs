use itertools::Itertools;

use crate::config::Config;

/// Opaque card identifier in `0..deck_size`.
pub type Card = usize;

/// Position on the table grid.
pub type Slot = usize;

/// Decides which card tuples form a legal set.
///
/// A card encodes `feature_count` features base `feature_size`; a set of
/// `feature_size` cards is legal when every feature is either constant or
/// pairwise distinct across the cards.
#[derive(Debug, Clone, Copy)]
pub struct Oracle {
    feature_size: usize,
    feature_count: u32,
}

impl Oracle {
    pub fn new(config: &Config) -> Oracle {
        Oracle {
            feature_size: config.feature_size,
            feature_count: config.feature_count,
        }
    }

    pub fn from_dimensions(feature_size: usize, feature_count: u32) -> Oracle {
        Oracle {
            feature_size,
            feature_count,
        }
    }

    pub fn deck_size(&self) -> usize {
        self.feature_size.pow(self.feature_count)
    }

    pub fn set_size(&self) -> usize {
        self.feature_size
    }

    /// Every card id, in encoding order. The dealer shuffles this.
    pub fn full_deck(&self) -> Vec<Card> {
        (0..self.deck_size()).collect()
    }

    pub fn feature(&self, card: Card, index: u32) -> usize {
        card / self.feature_size.pow(index) % self.feature_size
    }

    pub fn features(&self, card: Card) -> Vec<usize> {
        (0..self.feature_count)
            .map(|index| self.feature(card, index))
            .collect()
    }

    pub fn test_set(&self, cards: &[Card]) -> bool {
        if cards.len() != self.set_size() {
            return false;
        }
        (0..self.feature_count).all(|index| {
            let values: Vec<usize> = cards.iter().map(|&card| self.feature(card, index)).collect();
            let all_same = values.iter().all(|&value| value == values[0]);
            let all_distinct = values.iter().unique().count() == values.len();
            all_same || all_distinct
        })
    }

    /// Up to `limit` legal sets among `cards`, in combination order.
    pub fn find_sets(&self, cards: &[Card], limit: usize) -> Vec<Vec<Card>> {
        cards
            .iter()
            .copied()
            .combinations(self.set_size())
            .filter(|set| self.test_set(set))
            .take(limit)
            .collect()
    }

    /// Feature matrix of a card tuple, for hint output.
    pub fn cards_to_features(&self, cards: &[Card]) -> Vec<Vec<usize>> {
        cards.iter().map(|&card| self.features(card)).collect()
    }
}
