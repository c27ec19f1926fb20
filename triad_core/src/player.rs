use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        Arc, Condvar, Mutex,
    },
    thread,
    time::Duration,
};

use strum_macros::Display;

use crate::{
    config::Config,
    dealer::{Alarm, Gate, Submissions},
    deck::Slot,
    events::{UiEvent, UiSink},
    presser,
    table::Table,
};

pub type PlayerId = usize;

/// Verdict written by the dealer, read by the player after it is woken.
/// The player resets it to `Continue` at the end of a freeze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PlayerStatus {
    Continue,
    Point,
    Penalty,
    Terminated,
}

/// Bounded FIFO of pressed slots.
///
/// Two conditions on one lock: producers park on `not_full` when the queue is
/// saturated, the player thread parks on `not_empty` when there is nothing to
/// do. This lock covers queue contents only; a key press must never wait on
/// the submission rendezvous, which lives on the player monitor instead.
struct ActionQueue {
    slots: Mutex<VecDeque<Slot>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: usize,
}

impl ActionQueue {
    fn new(capacity: usize) -> ActionQueue {
        ActionQueue {
            slots: Mutex::new(VecDeque::with_capacity(capacity)),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity,
        }
    }

    /// Blocks until there is room, then enqueues. Gives up on termination.
    fn push_blocking(&self, slot: Slot, terminate: &AtomicBool) {
        let mut slots = self.slots.lock().unwrap();
        while slots.len() == self.capacity && !terminate.load(Ordering::Relaxed) {
            slots = self.not_full.wait(slots).unwrap();
        }
        if terminate.load(Ordering::Relaxed) {
            return;
        }
        slots.push_back(slot);
        self.not_empty.notify_all();
    }

    /// Parks while the round is live and there is nothing to do.
    fn wait_until_ready(&self, enabled: &AtomicBool, terminate: &AtomicBool) {
        let mut slots = self.slots.lock().unwrap();
        while slots.is_empty()
            && enabled.load(Ordering::Relaxed)
            && !terminate.load(Ordering::Relaxed)
        {
            slots = self.not_empty.wait(slots).unwrap();
        }
    }

    /// Pops one slot, re-checking the gates under the lock.
    fn pop_if(&self, enabled: &AtomicBool, terminate: &AtomicBool) -> Option<Slot> {
        let mut slots = self.slots.lock().unwrap();
        if terminate.load(Ordering::Relaxed) || !enabled.load(Ordering::Relaxed) {
            return None;
        }
        let slot = slots.pop_front()?;
        self.not_full.notify_all();
        Some(slot)
    }

    fn clear(&self) {
        let mut slots = self.slots.lock().unwrap();
        slots.clear();
        self.not_full.notify_all();
    }

    fn wake_all(&self) {
        let _slots = self.slots.lock().unwrap();
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}

pub struct Player {
    pub id: PlayerId,
    pub(crate) human: bool,
    set_size: usize,
    point_freeze: Duration,
    penalty_freeze: Duration,
    pub(crate) table_size: usize,
    pub(crate) ai_sleep: Duration,
    pub(crate) rng_seed: Option<u64>,

    table: Arc<Table>,
    submissions: Arc<Submissions>,
    alarm: Arc<Alarm>,
    gate: Arc<Gate>,
    ui: Arc<dyn UiSink>,

    actions: ActionQueue,
    /// Player monitor: the dealer publishes the verdict through this mutex
    /// and wakes the condvar once arbitration is done.
    status: Mutex<PlayerStatus>,
    verdict: Condvar,
    /// Parks the presser thread while the player is suspended.
    ai_gate: Gate,

    enabled: AtomicBool,
    terminate: AtomicBool,
    score: AtomicU32,
}

impl Player {
    pub(crate) fn new(
        id: PlayerId,
        human: bool,
        config: &Config,
        table: Arc<Table>,
        submissions: Arc<Submissions>,
        alarm: Arc<Alarm>,
        gate: Arc<Gate>,
        ui: Arc<dyn UiSink>,
    ) -> Player {
        Player {
            id,
            human,
            set_size: config.set_size(),
            point_freeze: Duration::from_millis(config.point_freeze_millis),
            penalty_freeze: Duration::from_millis(config.penalty_freeze_millis),
            table_size: config.table_size,
            ai_sleep: Duration::from_millis(config.ai_sleep_millis),
            rng_seed: config.rng_seed,
            table,
            submissions,
            alarm,
            gate,
            ui,
            actions: ActionQueue::new(config.set_size()),
            status: Mutex::new(PlayerStatus::Continue),
            verdict: Condvar::new(),
            ai_gate: Gate::new(),
            enabled: AtomicBool::new(false),
            terminate: AtomicBool::new(false),
            score: AtomicU32::new(0),
        }
    }

    pub fn is_human(&self) -> bool {
        self.human
    }

    pub fn score(&self) -> u32 {
        self.score.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub(crate) fn terminating(&self) -> bool {
        self.terminate.load(Ordering::Relaxed)
    }

    pub(crate) fn status(&self) -> PlayerStatus {
        *self.status.lock().unwrap()
    }

    /// A key press from the human input source or the AI presser. Dropped
    /// while the player may not act or the slot is empty; otherwise blocks
    /// the caller until the queue has room.
    pub fn key_press(&self, slot: Slot) {
        if self.terminating() || !self.is_enabled() {
            return;
        }
        if *self.status.lock().unwrap() != PlayerStatus::Continue {
            return;
        }
        if self.table.card_at(slot).is_none() {
            return;
        }
        self.actions.push_blocking(slot, &self.terminate);
    }

    /// The player thread. Parks on the dealer gate while suspended, on the
    /// action queue while idle, and processes one press per iteration.
    pub(crate) fn run(self: Arc<Self>) {
        let name = thread::current().name().unwrap_or("player").to_string();
        log::info!("thread {name} starting");
        let presser = if self.human {
            None
        } else {
            Some(presser::spawn(Arc::clone(&self)))
        };

        while !self.terminating() {
            self.gate
                .wait_while(|| !self.is_enabled() && !self.terminating());
            self.actions.wait_until_ready(&self.enabled, &self.terminate);
            self.handle_action();
            self.handle_freeze();
        }

        *self.status.lock().unwrap() = PlayerStatus::Terminated;
        if let Some(handle) = presser {
            let _ = handle.join();
        }
        log::info!("thread {name} terminated");
    }

    /// Pops one pressed slot and toggles the token. The press that lands the
    /// final token disables the player, submits it for arbitration and waits
    /// on the player monitor for the dealer's verdict.
    pub(crate) fn handle_action(&self) {
        let slot = match self.actions.pop_if(&self.enabled, &self.terminate) {
            Some(slot) => slot,
            None => return,
        };
        if self.table.card_at(slot).is_none() {
            // the card left the table between the press and now
            return;
        }

        if self.table.has_token(self.id, slot) {
            self.table.remove_token(self.id, slot);
            return;
        }

        let tokens = self.table.count_player_tokens(self.id);
        if tokens >= self.set_size {
            return;
        }
        self.table.place_token(self.id, slot);
        if tokens + 1 == self.set_size {
            self.enabled.store(false, Ordering::Relaxed);
            self.submissions.submit(self.id);
            self.alarm.notify();

            let mut status = self.status.lock().unwrap();
            // a voided submission is not woken directly; the next round's
            // enable releases it through this same predicate
            while *status == PlayerStatus::Continue
                && !self.is_enabled()
                && !self.terminating()
            {
                status = self.verdict.wait(status).unwrap();
            }
        }
    }

    pub(crate) fn handle_freeze(&self) {
        match self.status() {
            PlayerStatus::Point => self.point(),
            PlayerStatus::Penalty => {
                self.penalty();
                if !self.human {
                    // stale presses from before the penalty are worthless
                    self.actions.clear();
                }
            }
            PlayerStatus::Continue | PlayerStatus::Terminated => {}
        }
    }

    fn point(&self) {
        let score = self.score.fetch_add(1, Ordering::Relaxed) + 1;
        self.ui.post(UiEvent::Score(self.id, score));
        self.ui
            .post(UiEvent::Freeze(self.id, self.point_freeze.as_millis() as u64));
        thread::sleep(self.point_freeze);
        *self.status.lock().unwrap() = PlayerStatus::Continue;
        self.ui.post(UiEvent::Freeze(self.id, 0));
    }

    fn penalty(&self) {
        self.ui.post(UiEvent::Freeze(
            self.id,
            self.penalty_freeze.as_millis() as u64,
        ));
        thread::sleep(self.penalty_freeze);
        *self.status.lock().unwrap() = PlayerStatus::Continue;
        self.ui.post(UiEvent::Freeze(self.id, 0));
    }

    /// Dealer side: record the verdict without waking the player.
    pub(crate) fn set_verdict(&self, verdict: PlayerStatus) {
        *self.status.lock().unwrap() = verdict;
        log::debug!("player {} verdict {}", self.id, verdict);
    }

    /// Dealer side: let the player run again and wake whatever waits on it.
    pub(crate) fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
        if !self.human {
            self.ai_gate.notify_all();
        }
        let _status = self.status.lock().unwrap();
        self.verdict.notify_all();
    }

    /// Dealer side: stop the player at its next gate check.
    pub(crate) fn suspend(&self) {
        self.enabled.store(false, Ordering::Relaxed);
        // a consumer parked on the queue re-evaluates and returns to the gate
        self.actions.wake_all();
    }

    pub(crate) fn clear_actions(&self) {
        self.actions.clear();
    }

    /// Sticky. Wakes every suspension point so the thread can drain out.
    pub(crate) fn terminate(&self) {
        self.terminate.store(true, Ordering::Relaxed);
        self.actions.wake_all();
        {
            let _status = self.status.lock().unwrap();
            self.verdict.notify_all();
        }
        self.ai_gate.notify_all();
    }

    /// Parks the presser thread until the player may act again.
    pub(crate) fn ai_wait(&self) {
        self.ai_gate
            .wait_while(|| !self.is_enabled() && !self.terminating());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;

    use super::*;
    use crate::{deck::Oracle, events::RecordingUi};

    fn config() -> Config {
        Config {
            table_delay_millis: 0,
            point_freeze_millis: 10,
            penalty_freeze_millis: 10,
            human_players: 2,
            computer_players: 0,
            ..Config::default()
        }
    }

    fn fixture() -> (Arc<Table>, Arc<Player>, Arc<RecordingUi>, Arc<Submissions>) {
        let config = config();
        let ui = Arc::new(RecordingUi::new());
        let oracle = Oracle::new(&config);
        let table = Arc::new(Table::new(&config, oracle, ui.clone() as Arc<dyn UiSink>));
        // a table with twelve known cards: 0, 1, 2 form a set, 0, 1, 3 do not
        for (slot, card) in (0..12).enumerate() {
            table.place_card(card, slot);
        }
        let submissions = Arc::new(Submissions::new());
        let alarm = Arc::new(Alarm::new());
        let gate = Arc::new(Gate::new());
        let player = Arc::new(Player::new(
            0,
            true,
            &config,
            Arc::clone(&table),
            Arc::clone(&submissions),
            alarm,
            gate,
            ui.clone() as Arc<dyn UiSink>,
        ));
        (table, player, ui, submissions)
    }

    #[test]
    fn key_press_should_be_dropped_while_disabled() {
        let (_table, player, _ui, _submissions) = fixture();

        player.key_press(0);

        assert_eq!(player.actions.len(), 0);
    }

    #[test]
    fn key_press_should_be_dropped_on_an_empty_slot() {
        let (table, player, _ui, _submissions) = fixture();
        player.enable();
        table.remove_card(5);

        player.key_press(5);

        assert_eq!(player.actions.len(), 0);
    }

    #[test]
    fn key_press_should_be_dropped_while_frozen() {
        let (_table, player, _ui, _submissions) = fixture();
        player.enable();
        player.set_verdict(PlayerStatus::Penalty);

        player.key_press(0);

        assert_eq!(player.actions.len(), 0);
    }

    #[test]
    fn two_presses_on_one_slot_should_toggle_the_token() {
        let (table, player, _ui, _submissions) = fixture();
        player.enable();

        player.key_press(5);
        player.handle_action();
        assert!(table.has_token(0, 5));

        player.key_press(5);
        player.handle_action();
        assert!(!table.has_token(0, 5));
    }

    #[test]
    fn handle_action_should_discard_a_slot_emptied_after_the_press() {
        let (table, player, _ui, _submissions) = fixture();
        player.enable();

        player.key_press(5);
        table.remove_card(5);
        player.handle_action();

        assert_eq!(table.count_player_tokens(0), 0);
    }

    #[test]
    fn fourth_press_should_block_until_one_is_consumed() {
        let (_table, player, _ui, _submissions) = fixture();
        player.enable();
        player.key_press(0);
        player.key_press(1);
        player.key_press(2);

        let (sender, receiver) = mpsc::channel();
        let pressing = Arc::clone(&player);
        thread::spawn(move || {
            pressing.key_press(3);
            sender.send(()).unwrap();
        });

        // saturated: the fourth press must not land yet
        assert!(receiver.recv_timeout(Duration::from_millis(100)).is_err());

        player.handle_action();

        assert!(receiver.recv_timeout(Duration::from_secs(2)).is_ok());
        assert_eq!(player.actions.len(), 3);
    }

    #[test]
    fn third_token_should_submit_and_wait_for_the_verdict() {
        let (table, player, _ui, submissions) = fixture();
        player.enable();

        let arbiter_player = Arc::clone(&player);
        let arbiter_submissions = Arc::clone(&submissions);
        let arbiter = thread::spawn(move || loop {
            if let Some(id) = arbiter_submissions.pop() {
                assert_eq!(id, 0);
                arbiter_player.set_verdict(PlayerStatus::Point);
                arbiter_player.enable();
                break;
            }
            thread::sleep(Duration::from_millis(5));
        });

        for slot in [0, 1, 2] {
            player.key_press(slot);
            player.handle_action();
        }
        arbiter.join().unwrap();
        player.handle_freeze();

        assert_eq!(player.score(), 1);
        assert_eq!(player.status(), PlayerStatus::Continue);
        assert!(player.is_enabled());
        assert_eq!(table.count_player_tokens(0), 3);
    }

    #[test]
    fn penalty_should_freeze_without_scoring_and_keep_tokens() {
        let (table, player, ui, submissions) = fixture();
        player.enable();

        let arbiter_player = Arc::clone(&player);
        let arbiter_submissions = Arc::clone(&submissions);
        let arbiter = thread::spawn(move || loop {
            if arbiter_submissions.pop().is_some() {
                arbiter_player.set_verdict(PlayerStatus::Penalty);
                arbiter_player.enable();
                break;
            }
            thread::sleep(Duration::from_millis(5));
        });

        for slot in [0, 1, 3] {
            player.key_press(slot);
            player.handle_action();
        }
        arbiter.join().unwrap();
        player.handle_freeze();

        assert_eq!(player.score(), 0);
        assert_eq!(player.status(), PlayerStatus::Continue);
        // tokens persist across a penalty freeze
        assert_eq!(table.count_player_tokens(0), 3);
        let events = ui.snapshot();
        assert!(events.contains(&UiEvent::Freeze(0, 10)));
        assert!(events.contains(&UiEvent::Freeze(0, 0)));
        assert!(!events.iter().any(|e| matches!(e, UiEvent::Score(_, _))));
    }

    #[test]
    fn a_fourth_token_should_never_be_placed() {
        let (table, player, _ui, _submissions) = fixture();
        player.enable();
        table.place_token(0, 0);
        table.place_token(0, 1);
        table.place_token(0, 2);

        player.key_press(4);
        player.handle_action();

        assert!(!table.has_token(0, 4));
        assert_eq!(table.count_player_tokens(0), 3);
    }
}
