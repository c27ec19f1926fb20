mod terminal_ui;

use std::{
    env,
    io::{self, BufRead},
    sync::{mpsc, Arc},
    thread,
};

use terminal_ui::ChannelUi;
use triad_core::{
    config::Config,
    events::UiSink,
    Game,
};

static USAGE: &str = "
*** Triad ***
Race the other players to mark three cards whose features are, one feature
at a time, either all the same or all different. Type a slot number to
toggle your token on it; your third token submits the candidate. A correct
set scores a point and freezes you briefly, a wrong one freezes you longer.

Commands:
  <slot>            toggle your token on that slot
  <player> <slot>   the same, for another human player
  q                 quit
";

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let config = match args.get(1) {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("{error}");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let (sender, receiver) = mpsc::channel();
    let ui: Arc<dyn UiSink> = Arc::new(ChannelUi::new(sender));
    let game = Game::new(config.clone(), ui);
    let humans: Vec<_> = (0..config.human_players).map(|id| game.player(id)).collect();
    let stop = game.stop_handle();

    let engine = thread::Builder::new()
        .name("dealer".to_string())
        .spawn(move || game.run())
        .expect("failed to spawn engine thread");
    let render_config = config.clone();
    let render = thread::spawn(move || terminal_ui::run(receiver, &render_config));

    println!("{USAGE}");
    for line in io::stdin().lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(_) => break,
        };
        if engine.is_finished() {
            break;
        }
        let trimmed = line.trim();
        if trimmed == "q" {
            break;
        }
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let press = match fields.as_slice() {
            [slot] => slot.parse::<usize>().ok().map(|slot| (0, slot)),
            [player, slot] => match (player.parse::<usize>(), slot.parse::<usize>()) {
                (Ok(player), Ok(slot)) => Some((player, slot)),
                _ => None,
            },
            _ => None,
        };
        match press {
            Some((player, slot)) if player < humans.len() && slot < config.table_size => {
                humans[player].key_press(slot);
            }
            _ => println!("? type a slot number between 0 and {}, or q", config.table_size - 1),
        }
    }

    stop.stop();
    let winners = engine.join().unwrap_or_default();
    // the player handles keep the ui sink alive; release them so the render
    // loop sees the channel close
    drop(humans);
    let _ = render.join();
    log::info!("game over, winners: {winners:?}");
}
