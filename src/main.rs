//! Fruit Drop entry point
//!
//! Handles platform-specific initialization and runs a headless demo session:
//! the autopilot plays until the board overflows or the time limit is hit.

use fruit_drop::Game;
use fruit_drop::audio::{AudioManager, LogBackend};
use fruit_drop::persistence::KeyValueStore;
use fruit_drop::sim::CircleWorld;
use fruit_drop::tuning::Tuning;
use fruit_drop::ui::LogUi;

/// Simulated frame length for the demo loop
const FRAME_DT: f32 = 1.0 / 60.0;
/// Demo length cap in simulated seconds
const DEMO_SECONDS: f32 = 300.0;

#[cfg(not(target_arch = "wasm32"))]
const SAVE_PATH: &str = "fruit-drop-save.json";
#[cfg(not(target_arch = "wasm32"))]
const TUNING_ENV: &str = "FRUIT_DROP_TUNING";

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Fruit Drop (native) starting...");

    let seed = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    let json = std::env::var(TUNING_ENV).ok().and_then(|path| match std::fs::read_to_string(&path) {
        Ok(json) => Some(json),
        Err(e) => {
            log::warn!("Can't read tuning file {}: {}", path, e);
            None
        }
    });
    let tuning = Tuning::load_or_default(json.as_deref());
    let store = fruit_drop::persistence::JsonFileStore::open(SAVE_PATH);

    run_demo(tuning, Box::new(store), seed);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    console_error_panic_hook::set_once();
    if let Err(e) = console_log::init_with_level(log::Level::Info) {
        web_sys::console::warn_1(&format!("Logger init failed: {}", e).into());
    }

    let seed = js_sys::Date::now() as u64;
    let store = fruit_drop::persistence::LocalStorageStore::new("fruit_drop_");
    run_demo(Tuning::default(), Box::new(store), seed);
}

fn run_demo(tuning: Tuning, store: Box<dyn KeyValueStore>, seed: u64) {
    let world = CircleWorld::from_tuning(&tuning);
    let mut game = Game::new(tuning, world, store, seed)
        .with_audio(AudioManager::new(Box::new(LogBackend)))
        .with_ui(Box::new(LogUi::default()));
    game.set_idle_mode(true);

    let mut elapsed = 0.0;
    while !game.is_game_over() && elapsed < DEMO_SECONDS {
        game.update(FRAME_DT);
        elapsed += FRAME_DT;
    }

    log::info!(
        "Demo finished after {:.1}s: score {}, high score {}, {} fruit on the board",
        elapsed,
        game.score(),
        game.high_score(),
        game.state.board.len()
    );
}
