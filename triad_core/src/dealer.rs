use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Condvar, Mutex,
    },
    time::{Duration, Instant},
};

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::{
    config::Config,
    deck::{Card, Oracle, Slot},
    events::{UiEvent, UiSink},
    player::{Player, PlayerId, PlayerStatus},
    table::Table,
};

/// Tick while the countdown is comfortable.
const WAKE_UP: Duration = Duration::from_millis(1_000);
/// Tick once the countdown turns urgent, to keep the display smooth.
const FAST_WAKE_UP: Duration = Duration::from_millis(10);

/// A condvar everyone can park on. The dealer broadcasts on it to admit or
/// release the player threads; each player also owns one for its presser.
pub(crate) struct Gate {
    lock: Mutex<()>,
    cvar: Condvar,
}

impl Gate {
    pub(crate) fn new() -> Gate {
        Gate {
            lock: Mutex::new(()),
            cvar: Condvar::new(),
        }
    }

    pub(crate) fn wait_while(&self, blocked: impl Fn() -> bool) {
        let mut guard = self.lock.lock().unwrap();
        while blocked() {
            guard = self.cvar.wait(guard).unwrap();
        }
    }

    pub(crate) fn notify_all(&self) {
        let _guard = self.lock.lock().unwrap();
        self.cvar.notify_all();
    }
}

/// FIFO of players whose token count just completed a candidate set. Arrival
/// order is arbitration priority. The queue only carries the payload; waking
/// the dealer goes through its own [`Alarm`], never this lock.
pub(crate) struct Submissions {
    queue: Mutex<VecDeque<PlayerId>>,
}

impl Submissions {
    pub(crate) fn new() -> Submissions {
        Submissions {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    pub(crate) fn submit(&self, player: PlayerId) {
        self.queue.lock().unwrap().push_back(player);
    }

    pub(crate) fn pop(&self) -> Option<PlayerId> {
        self.queue.lock().unwrap().pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}

/// The dealer's own monitor. Submitters and stop requests ring it to cut a
/// pending tick short; it carries no data.
pub(crate) struct Alarm {
    lock: Mutex<()>,
    cvar: Condvar,
}

impl Alarm {
    pub(crate) fn new() -> Alarm {
        Alarm {
            lock: Mutex::new(()),
            cvar: Condvar::new(),
        }
    }

    /// Sleeps up to `timeout`, or until someone rings.
    pub(crate) fn wait_timeout(&self, timeout: Duration) {
        let guard = self.lock.lock().unwrap();
        let _ = self.cvar.wait_timeout(guard, timeout).unwrap();
    }

    pub(crate) fn notify(&self) {
        let _guard = self.lock.lock().unwrap();
        self.cvar.notify_all();
    }
}

/// The round orchestrator. Deals, guarantees a set is present, runs the
/// countdown, arbitrates submissions in arrival order, and tears the game
/// down once no set is left in the deck.
pub(crate) struct Dealer {
    config: Config,
    oracle: Oracle,
    table: Arc<Table>,
    players: Vec<Arc<Player>>,
    submissions: Arc<Submissions>,
    alarm: Arc<Alarm>,
    gate: Arc<Gate>,
    ui: Arc<dyn UiSink>,
    terminate: Arc<AtomicBool>,
    deck: Vec<Card>,
    rng: StdRng,
    reshuffle_at: Instant,
    warn: bool,
}

impl Dealer {
    pub(crate) fn new(
        config: &Config,
        oracle: Oracle,
        table: Arc<Table>,
        players: Vec<Arc<Player>>,
        submissions: Arc<Submissions>,
        alarm: Arc<Alarm>,
        gate: Arc<Gate>,
        terminate: Arc<AtomicBool>,
        ui: Arc<dyn UiSink>,
    ) -> Dealer {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Dealer {
            config: config.clone(),
            oracle,
            table,
            players,
            submissions,
            alarm,
            gate,
            ui,
            terminate,
            deck: oracle.full_deck(),
            rng,
            reshuffle_at: Instant::now(),
            warn: false,
        }
    }

    /// One full game: rounds until the deck holds no set or someone asks the
    /// game to stop.
    pub(crate) fn run(&mut self) {
        log::info!("dealer starting");
        while !self.should_finish() {
            self.deck.shuffle(&mut self.rng);
            self.place_cards_on_table();
            self.ensure_set_on_table();
            if self.config.hints {
                self.table.hints();
            }
            self.update_timer(true);
            self.notify_players();
            self.timer_loop();
            self.suspend_players();
            self.clear_player_actions();
            self.remove_all_cards();
        }
        log::info!("dealer finished");
    }

    /// Ticks until the round times out, arbitrating as submissions arrive
    /// and refilling slots a legal set emptied.
    fn timer_loop(&mut self) {
        while !self.terminate.load(Ordering::Relaxed) && Instant::now() < self.reshuffle_at {
            let tick = if self.warn { FAST_WAKE_UP } else { WAKE_UP };
            // a submission already queued skips the nap entirely
            if self.submissions.is_empty() {
                self.alarm.wait_timeout(tick);
            }
            self.update_timer(false);
            self.check_sets();
            self.place_cards_on_table();
        }
    }

    fn should_finish(&self) -> bool {
        self.terminate.load(Ordering::Relaxed) || self.oracle.find_sets(&self.deck, 1).is_empty()
    }

    /// Moves cards from the deck into every empty slot, until the table is
    /// full or the deck runs out.
    pub(crate) fn place_cards_on_table(&mut self) {
        for slot in 0..self.config.table_size {
            if self.deck.is_empty() {
                break;
            }
            if self.table.card_at(slot).is_none() {
                let card = self.deck.remove(0);
                self.table.place_card(card, slot);
            }
        }
    }

    /// Redeals until the table contains at least one legal set. Sound only
    /// because `should_finish` guarantees the deck still holds one.
    pub(crate) fn ensure_set_on_table(&mut self) {
        while self.oracle.find_sets(&self.table.cards_on_table(), 1).is_empty() {
            log::debug!("no set on the table, redealing");
            self.remove_all_cards();
            self.deck.shuffle(&mut self.rng);
            self.place_cards_on_table();
        }
    }

    /// Re-arms the deadline on `reset`, refreshes the countdown display
    /// either way. The display clamps at zero; only `reset` re-arms.
    pub(crate) fn update_timer(&mut self, reset: bool) {
        let timeout = Duration::from_millis(self.config.turn_timeout_millis);
        if reset {
            self.reshuffle_at = Instant::now() + timeout;
        }
        let left = self.reshuffle_at.saturating_duration_since(Instant::now());
        self.warn = left <= timeout;
        self.ui
            .post(UiEvent::Countdown(left.as_millis() as u64, self.warn));
    }

    /// Opens the gate for a new round. Also releases any submitter stranded
    /// with a voided candidate from the previous round.
    pub(crate) fn notify_players(&self) {
        for player in &self.players {
            player.enable();
        }
        self.gate.notify_all();
    }

    pub(crate) fn suspend_players(&self) {
        for player in &self.players {
            player.suspend();
        }
    }

    /// The table is about to change under them; queued presses are moot.
    fn clear_player_actions(&self) {
        for player in &self.players {
            player.clear_actions();
        }
    }

    pub(crate) fn remove_all_cards(&mut self) {
        for card in self.table.remove_all_cards() {
            self.deck.push(card);
        }
    }

    /// Drains the submission queue in arrival order. A candidate that lost
    /// cards to an earlier legal set in this same pass is void: its player
    /// keeps status `Continue` and stays parked until the next round opens.
    pub(crate) fn check_sets(&mut self) {
        while let Some(player_id) = self.submissions.pop() {
            let player = Arc::clone(&self.players[player_id]);
            let cards = self.table.player_cards(player_id);
            if cards.len() != self.oracle.set_size() {
                player.set_verdict(PlayerStatus::Continue);
                continue;
            }
            if self.oracle.test_set(&cards) {
                player.set_verdict(PlayerStatus::Point);
                let slots: Vec<Slot> = cards
                    .iter()
                    .filter_map(|&card| self.table.slot_of(card))
                    .collect();
                for slot in slots {
                    self.table.remove_card(slot);
                }
            } else {
                player.set_verdict(PlayerStatus::Penalty);
            }
            player.enable();
        }
    }

    /// Releases every parked thread and raises the sticky flags; the caller
    /// joins the threads afterwards.
    pub(crate) fn shutdown(&self) {
        self.notify_players();
        for player in &self.players {
            player.terminate();
        }
        self.gate.notify_all();
    }

    /// All ids sharing the top score win.
    pub(crate) fn announce_winners(&self) -> Vec<PlayerId> {
        let best = self.players.iter().map(|p| p.score()).max().unwrap_or(0);
        let winners: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|p| p.score() == best)
            .map(|p| p.id)
            .collect();
        self.ui.post(UiEvent::Winner(winners.clone()));
        winners
    }
}
