use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
};

use crate::{
    config::Config,
    dealer::{Alarm, Dealer, Gate, Submissions},
    deck::Oracle,
    events::UiSink,
    player::{Player, PlayerId},
    table::Table,
};

/// Builds the table, the players and the dealer, and runs a full game.
/// Frontends grab player handles for key presses and a [`StopHandle`]
/// before calling [`Game::run`].
pub struct Game {
    config: Config,
    players: Vec<Arc<Player>>,
    dealer: Dealer,
    terminate: Arc<AtomicBool>,
    alarm: Arc<Alarm>,
}

impl Game {
    pub fn new(config: Config, ui: Arc<dyn UiSink>) -> Game {
        let oracle = Oracle::new(&config);
        let table = Arc::new(Table::new(&config, oracle, Arc::clone(&ui)));
        let gate = Arc::new(Gate::new());
        let submissions = Arc::new(Submissions::new());
        let alarm = Arc::new(Alarm::new());
        let terminate = Arc::new(AtomicBool::new(false));

        let players: Vec<Arc<Player>> = (0..config.players())
            .map(|id| {
                Arc::new(Player::new(
                    id,
                    id < config.human_players,
                    &config,
                    Arc::clone(&table),
                    Arc::clone(&submissions),
                    Arc::clone(&alarm),
                    Arc::clone(&gate),
                    Arc::clone(&ui),
                ))
            })
            .collect();

        let dealer = Dealer::new(
            &config,
            oracle,
            table,
            players.clone(),
            submissions,
            Arc::clone(&alarm),
            gate,
            Arc::clone(&terminate),
            ui,
        );

        Game {
            config,
            players,
            dealer,
            terminate,
            alarm,
        }
    }

    /// Handle for feeding key presses to a player, from any thread.
    pub fn player(&self, id: PlayerId) -> Arc<Player> {
        Arc::clone(&self.players[id])
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            terminate: Arc::clone(&self.terminate),
            alarm: Arc::clone(&self.alarm),
        }
    }

    /// Spawns the player threads, runs the dealer to completion on the
    /// calling thread, joins everything and returns the winners.
    pub fn run(mut self) -> Vec<PlayerId> {
        let mut handles = Vec::with_capacity(self.players.len());
        for player in &self.players {
            let player = Arc::clone(player);
            let name = self.config.player_name(player.id);
            handles.push(
                thread::Builder::new()
                    .name(name)
                    .spawn(move || player.run())
                    .expect("failed to spawn player thread"),
            );
        }

        self.dealer.run();
        self.dealer.shutdown();
        for handle in handles {
            let _ = handle.join();
        }
        self.dealer.announce_winners()
    }
}

/// Lets a frontend end the game from outside: the dealer notices at its
/// next tick and runs the normal termination choreography.
pub struct StopHandle {
    terminate: Arc<AtomicBool>,
    alarm: Arc<Alarm>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.terminate.store(true, Ordering::Relaxed);
        self.alarm.notify();
    }
}
