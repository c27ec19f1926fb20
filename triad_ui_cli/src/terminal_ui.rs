use std::sync::{
    mpsc::{Receiver, Sender},
    Mutex,
};

use triad_core::{
    config::Config,
    deck::{Card, Oracle},
    events::{UiEvent, UiSink},
    player::PlayerId,
};

/// Forwards engine events onto an mpsc channel so the render loop can draw
/// them outside the engine threads.
pub struct ChannelUi {
    sender: Mutex<Sender<UiEvent>>,
}

impl ChannelUi {
    pub fn new(sender: Sender<UiEvent>) -> ChannelUi {
        ChannelUi {
            sender: Mutex::new(sender),
        }
    }
}

impl UiSink for ChannelUi {
    fn post(&self, event: UiEvent) {
        // the receiver going away just means the frontend quit first
        let _ = self.sender.lock().unwrap().send(event);
    }
}

struct View {
    oracle: Oracle,
    names: Vec<String>,
    slots: Vec<Option<Card>>,
    tokens: Vec<Vec<PlayerId>>,
    scores: Vec<u32>,
    countdown_secs: Option<u64>,
}

impl View {
    fn new(config: &Config) -> View {
        View {
            oracle: Oracle::new(config),
            names: (0..config.players()).map(|id| config.player_name(id)).collect(),
            slots: vec![None; config.table_size],
            tokens: vec![Vec::new(); config.table_size],
            scores: vec![0; config.players()],
            countdown_secs: None,
        }
    }

    fn name(&self, player: PlayerId) -> &str {
        self.names.get(player).map(String::as_str).unwrap_or("?")
    }

    /// Cards render as their feature digits, e.g. `0210`.
    fn card_label(&self, card: Card) -> String {
        self.oracle
            .features(card)
            .iter()
            .map(|value| value.to_string())
            .collect()
    }

    fn print_table(&self) {
        println!("------------------------------------------------");
        for (slot, card) in self.slots.iter().enumerate() {
            let label = match card {
                Some(card) => self.card_label(*card),
                None => "----".to_string(),
            };
            let tokens = if self.tokens[slot].is_empty() {
                String::new()
            } else {
                let names: Vec<&str> = self.tokens[slot].iter().map(|&p| self.name(p)).collect();
                format!("  [{}]", names.join(", "))
            };
            println!("{slot:>3}: {label}{tokens}");
        }
        let scores: Vec<String> = self
            .names
            .iter()
            .zip(&self.scores)
            .map(|(name, score)| format!("{name}: {score}"))
            .collect();
        println!("scores  {}", scores.join("  |  "));
    }

    fn apply(&mut self, event: &UiEvent) {
        match event {
            UiEvent::PlaceCard(card, slot) => {
                self.slots[*slot] = Some(*card);
                self.print_table();
            }
            UiEvent::RemoveCard(slot) => {
                self.slots[*slot] = None;
                self.tokens[*slot].clear();
                self.print_table();
            }
            UiEvent::PlaceToken(player, slot) => {
                self.tokens[*slot].push(*player);
                self.print_table();
            }
            UiEvent::RemoveToken(player, slot) => {
                if let Some(index) = self.tokens[*slot].iter().position(|p| p == player) {
                    self.tokens[*slot].remove(index);
                }
                self.print_table();
            }
            UiEvent::Score(player, score) => {
                if let Some(entry) = self.scores.get_mut(*player) {
                    *entry = *score;
                }
                println!("~ Score: {} is at {}", self.name(*player), score);
            }
            UiEvent::Freeze(player, millis) => {
                if *millis == 0 {
                    println!("~ {} may play again", self.name(*player));
                } else {
                    println!("~ {} is frozen for {millis} ms", self.name(*player));
                }
            }
            UiEvent::Countdown(millis, warn) => {
                let secs = millis / 1000;
                if self.countdown_secs != Some(secs) {
                    self.countdown_secs = Some(secs);
                    let marker = if *warn && secs <= 5 { " !" } else { "" };
                    println!("~ Countdown: {secs}s{marker}");
                }
            }
            UiEvent::Winner(players) => {
                let names: Vec<&str> = players.iter().map(|&p| self.name(p)).collect();
                println!("================================================");
                println!("Winner is {}", names.join(", "));
                println!("press enter to quit");
            }
        }
    }
}

/// Drains the event channel until the engine drops its end of it.
pub fn run(receiver: Receiver<UiEvent>, config: &Config) {
    let mut view = View::new(config);
    while let Ok(event) = receiver.recv() {
        view.apply(&event);
    }
}
