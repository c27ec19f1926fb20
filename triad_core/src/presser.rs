use std::{sync::Arc, thread};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::player::Player;

/// Spawns the key-press generator for a computer player.
pub(crate) fn spawn(player: Arc<Player>) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name(format!("computer-{}", player.id))
        .spawn(move || run(player))
        .expect("failed to spawn presser thread")
}

/// A very, very smart AI: presses uniformly random slots while its player is
/// enabled, pausing between presses so the game stays watchable. No skill,
/// no memory.
fn run(player: Arc<Player>) {
    let name = thread::current().name().unwrap_or("computer").to_string();
    log::info!("thread {name} starting");

    let mut rng = match player.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(player.id as u64)),
        None => StdRng::from_entropy(),
    };

    while !player.terminating() {
        player.ai_wait();
        if player.terminating() {
            break;
        }
        let slot = rng.gen_range(0..player.table_size);
        player.key_press(slot);
        thread::sleep(player.ai_sleep);
    }

    log::info!("thread {name} terminated");
}
