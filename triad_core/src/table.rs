use std::{
    sync::{Arc, Mutex},
    thread,
    time::Duration,
};

use itertools::Itertools;

use crate::{
    config::Config,
    deck::{Card, Oracle, Slot},
    events::{UiEvent, UiSink},
    player::PlayerId,
};

/// The shared table: which card sits in which slot, and which players have a
/// token on it.
///
/// Card placement and removal are dealer-only; token operations come from any
/// player thread. All state sits behind one mutex; no operation spans two
/// slots, so finer locking would not be observable.
///
/// Invariants: `slot_to_card[s] == Some(c)` iff `card_to_slot[c] == Some(s)`,
/// and `tokens[s]` is empty whenever slot `s` is empty.
pub struct Table {
    inner: Mutex<TableInner>,
    delay: Duration,
    oracle: Oracle,
    ui: Arc<dyn UiSink>,
}

struct TableInner {
    slot_to_card: Vec<Option<Card>>,
    card_to_slot: Vec<Option<Slot>>,
    tokens: Vec<Vec<PlayerId>>,
}

impl Table {
    pub fn new(config: &Config, oracle: Oracle, ui: Arc<dyn UiSink>) -> Table {
        Table {
            inner: Mutex::new(TableInner {
                slot_to_card: vec![None; config.table_size],
                card_to_slot: vec![None; config.deck_size()],
                tokens: vec![Vec::new(); config.table_size],
            }),
            delay: Duration::from_millis(config.table_delay_millis),
            oracle,
            ui,
        }
    }

    pub fn card_at(&self, slot: Slot) -> Option<Card> {
        self.inner.lock().unwrap().slot_to_card.get(slot).copied().flatten()
    }

    pub fn slot_of(&self, card: Card) -> Option<Slot> {
        self.inner.lock().unwrap().card_to_slot.get(card).copied().flatten()
    }

    pub fn count_cards(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.slot_to_card.iter().flatten().count()
    }

    /// Cards currently on the table, in slot order.
    pub fn cards_on_table(&self) -> Vec<Card> {
        let inner = self.inner.lock().unwrap();
        inner.slot_to_card.iter().copied().flatten().collect()
    }

    /// Dealer only. The delay simulates the placement animation.
    pub fn place_card(&self, card: Card, slot: Slot) {
        thread::sleep(self.delay);
        let mut inner = self.inner.lock().unwrap();
        if inner.slot_to_card[slot].is_some() || inner.card_to_slot[card].is_some() {
            // caller bug; keep the bijection intact
            return;
        }
        inner.slot_to_card[slot] = Some(card);
        inner.card_to_slot[card] = Some(slot);
        self.ui.post(UiEvent::PlaceCard(card, slot));
    }

    /// Dealer only. Clears the slot and every token on it; no-op when the
    /// slot is already empty.
    pub fn remove_card(&self, slot: Slot) {
        thread::sleep(self.delay);
        let mut inner = self.inner.lock().unwrap();
        let card = match inner.slot_to_card[slot] {
            Some(card) => card,
            None => return,
        };
        inner.slot_to_card[slot] = None;
        inner.card_to_slot[card] = None;
        for player in inner.tokens[slot].drain(..) {
            self.ui.post(UiEvent::RemoveToken(player, slot));
        }
        self.ui.post(UiEvent::RemoveCard(slot));
    }

    /// No-op on an empty slot: a token never claims nothing.
    pub fn place_token(&self, player: PlayerId, slot: Slot) {
        let mut inner = self.inner.lock().unwrap();
        if inner.slot_to_card[slot].is_none() {
            return;
        }
        inner.tokens[slot].push(player);
        self.ui.post(UiEvent::PlaceToken(player, slot));
    }

    /// Removes one token of `player` from `slot`; reports whether it did.
    pub fn remove_token(&self, player: PlayerId, slot: Slot) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.slot_to_card[slot].is_none() {
            return false;
        }
        match inner.tokens[slot].iter().position(|&p| p == player) {
            Some(index) => {
                inner.tokens[slot].remove(index);
                self.ui.post(UiEvent::RemoveToken(player, slot));
                true
            }
            None => false,
        }
    }

    pub fn has_token(&self, player: PlayerId, slot: Slot) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.tokens[slot].contains(&player)
    }

    /// The cards this player has tokened, in slot order. The dealer builds
    /// submission candidates from this.
    pub fn player_cards(&self, player: PlayerId) -> Vec<Card> {
        let inner = self.inner.lock().unwrap();
        (0..inner.slot_to_card.len())
            .filter(|&slot| inner.tokens[slot].contains(&player))
            .filter_map(|slot| inner.slot_to_card[slot])
            .collect()
    }

    pub fn count_player_tokens(&self, player: PlayerId) -> usize {
        let inner = self.inner.lock().unwrap();
        (0..inner.tokens.len())
            .filter(|&slot| inner.tokens[slot].contains(&player))
            .count()
    }

    /// Dealer only. Empties the table and returns the removed cards.
    pub fn remove_all_cards(&self) -> Vec<Card> {
        let occupied: Vec<(Slot, Card)> = {
            let inner = self.inner.lock().unwrap();
            inner
                .slot_to_card
                .iter()
                .enumerate()
                .filter_map(|(slot, card)| card.map(|card| (slot, card)))
                .collect()
        };
        let mut cards = Vec::with_capacity(occupied.len());
        for (slot, card) in occupied {
            self.remove_card(slot);
            cards.push(card);
        }
        cards
    }

    /// Logs every legal set currently on the table.
    pub fn hints(&self) {
        let cards = self.cards_on_table();
        for set in self.oracle.find_sets(&cards, usize::MAX) {
            let slots: Vec<Slot> = set.iter().filter_map(|&card| self.slot_of(card)).sorted().collect();
            log::info!(
                "hint: set at slots {:?}, features {:?}",
                slots,
                self.oracle.cards_to_features(&set)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingUi;

    fn table() -> (Arc<Table>, Arc<RecordingUi>) {
        let config = Config {
            table_delay_millis: 0,
            ..Config::default()
        };
        let ui = Arc::new(RecordingUi::new());
        let oracle = Oracle::new(&config);
        (
            Arc::new(Table::new(&config, oracle, ui.clone() as Arc<dyn UiSink>)),
            ui,
        )
    }

    #[test]
    fn place_card_should_update_both_maps() {
        let (table, ui) = table();

        table.place_card(17, 4);

        assert_eq!(table.card_at(4), Some(17));
        assert_eq!(table.slot_of(17), Some(4));
        assert_eq!(table.count_cards(), 1);
        assert_eq!(ui.snapshot(), vec![UiEvent::PlaceCard(17, 4)]);
    }

    #[test]
    fn place_card_should_refuse_an_occupied_slot() {
        let (table, _ui) = table();

        table.place_card(17, 4);
        table.place_card(23, 4);

        assert_eq!(table.card_at(4), Some(17));
        assert_eq!(table.slot_of(23), None);
    }

    #[test]
    fn remove_card_should_clear_maps_and_tokens() {
        let (table, ui) = table();
        table.place_card(17, 4);
        table.place_token(0, 4);
        table.place_token(2, 4);

        table.remove_card(4);

        assert_eq!(table.card_at(4), None);
        assert_eq!(table.slot_of(17), None);
        assert!(!table.has_token(0, 4));
        assert!(!table.has_token(2, 4));
        let events = ui.snapshot();
        assert!(events.contains(&UiEvent::RemoveToken(0, 4)));
        assert!(events.contains(&UiEvent::RemoveToken(2, 4)));
        assert_eq!(events.last(), Some(&UiEvent::RemoveCard(4)));
    }

    #[test]
    fn remove_card_on_an_empty_slot_should_be_a_no_op() {
        let (table, ui) = table();

        table.remove_card(7);

        assert!(ui.snapshot().is_empty());
    }

    #[test]
    fn place_token_should_ignore_empty_slots() {
        let (table, ui) = table();

        table.place_token(1, 3);

        assert!(!table.has_token(1, 3));
        assert!(ui.snapshot().is_empty());
    }

    #[test]
    fn remove_token_should_report_whether_it_removed() {
        let (table, _ui) = table();
        table.place_card(9, 2);
        table.place_token(1, 2);

        assert!(table.remove_token(1, 2));
        assert!(!table.remove_token(1, 2));
        assert!(!table.remove_token(1, 5));
    }

    #[test]
    fn player_cards_should_come_back_in_slot_order() {
        let (table, _ui) = table();
        table.place_card(30, 0);
        table.place_card(10, 5);
        table.place_card(20, 9);
        table.place_token(3, 9);
        table.place_token(3, 0);
        table.place_token(3, 5);
        table.place_token(1, 5);

        assert_eq!(table.player_cards(3), vec![30, 10, 20]);
        assert_eq!(table.count_player_tokens(3), 3);
        assert_eq!(table.count_player_tokens(1), 1);
    }

    #[test]
    fn remove_all_cards_should_return_them_and_empty_the_table() {
        let (table, _ui) = table();
        table.place_card(1, 0);
        table.place_card(2, 3);
        table.place_token(0, 3);

        let cards = table.remove_all_cards();

        assert_eq!(cards, vec![1, 2]);
        assert_eq!(table.count_cards(), 0);
        assert_eq!(table.count_player_tokens(0), 0);
    }
}
