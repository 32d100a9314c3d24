//! Session manager
//!
//! Owns the simulation, the physics world and the collaborators around them.
//! Runs the fixed-timestep loop and turns simulation events into audio cues,
//! HUD updates and persisted high scores.

use crate::audio::{AudioManager, CUE_BUTTON_CLICK, CUE_DROP, CUE_GAME_OVER, CUE_MERGE};
use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::persistence::{KeyValueStore, SettingsKey, StoredValue, get_int};
use crate::score::ScoreState;
use crate::settings::Settings;
use crate::sim::{GameEvent, GameState, PhysicsWorld, SessionTimer, TickInput, tick};
use crate::tuning::Tuning;
use crate::ui::{GameUi, MergeEffect, UiEvent};

/// Requests the session cannot handle itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAction {
    /// Leave the game for the main menu
    ReturnToMenu,
}

/// Game instance holding all state
pub struct Game<W: PhysicsWorld> {
    pub state: GameState,
    pub world: W,
    /// Input applied on the next tick. Press, release and pause are one-shot.
    pub input: TickInput,
    store: Box<dyn KeyValueStore>,
    audio: Option<AudioManager>,
    ui: Option<Box<dyn GameUi>>,
    settings: Settings,
    accumulator: f32,
}

impl<W: PhysicsWorld> Game<W> {
    /// Start a session, reading the high score and settings from `store`
    pub fn new(tuning: Tuning, mut world: W, store: Box<dyn KeyValueStore>, seed: u64) -> Self {
        let settings = Settings::load(store.as_ref());
        let high = get_int(store.as_ref(), SettingsKey::HighScore, 0).max(0) as u64;

        let mut state = GameState::new(tuning, seed, &mut world);
        state.score = ScoreState::with_high(high);
        state.timer = settings.session_duration().map(SessionTimer::new);
        log::info!("Game initialized with seed: {} (high score {})", seed, high);

        let mut game = Self {
            state,
            world,
            input: TickInput::default(),
            store,
            audio: None,
            ui: None,
            settings,
            accumulator: 0.0,
        };
        game.dispatch_events();
        game
    }

    /// Attach audio; current settings are applied immediately
    pub fn with_audio(mut self, mut audio: AudioManager) -> Self {
        self.settings.apply(&mut audio);
        self.audio = Some(audio);
        self
    }

    /// Attach a HUD and bring it up to date
    pub fn with_ui(mut self, ui: Box<dyn GameUi>) -> Self {
        self.ui = Some(ui);
        self.refresh_ui();
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    pub fn score(&self) -> u64 {
        self.state.score.current
    }

    pub fn high_score(&self) -> u64 {
        self.state.score.high
    }

    pub fn is_game_over(&self) -> bool {
        self.state.is_game_over()
    }

    // === Input ===

    pub fn pointer_moved(&mut self, x: f32) {
        self.input.pointer_x = Some(x);
    }

    pub fn press(&mut self) {
        self.input.press = true;
    }

    pub fn release(&mut self) {
        self.input.release = true;
    }

    pub fn toggle_pause(&mut self) {
        self.input.pause = true;
    }

    pub fn set_idle_mode(&mut self, idle: bool) {
        self.input.idle_mode = idle;
    }

    /// Run simulation ticks for a frame of `frame_dt` seconds
    ///
    /// Returns the number of ticks run.
    pub fn update(&mut self, frame_dt: f32) -> u32 {
        let dt = frame_dt.clamp(0.0, MAX_FRAME_DT);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            let input = self.input.clone();
            self.step(&input);
            self.accumulator -= SIM_DT;
            substeps += 1;

            // Clear one-shot inputs after processing
            self.input.press = false;
            self.input.release = false;
            self.input.pause = false;
        }
        substeps
    }

    /// Run exactly one tick with `input`
    pub fn step(&mut self, input: &TickInput) {
        tick(&mut self.state, &mut self.world, input, SIM_DT);
        self.dispatch_events();
        if let (Some(ui), Some(timer)) = (&mut self.ui, &self.state.timer) {
            ui.update_timer(&timer.text(), timer.is_urgent());
        }
    }

    /// Clear the board and start over; the high score is kept
    pub fn reset_session(&mut self) {
        self.state.timer = self.settings.session_duration().map(SessionTimer::new);
        self.state.reset(&mut self.world);
        self.accumulator = 0.0;
        self.input = TickInput {
            idle_mode: self.input.idle_mode,
            ..Default::default()
        };
        self.dispatch_events();
        self.refresh_ui();
    }

    /// React to a HUD button
    pub fn handle_ui_event(&mut self, event: UiEvent) -> Option<SessionAction> {
        if let Some(audio) = &mut self.audio {
            audio.play(CUE_BUTTON_CLICK);
        }
        match event {
            UiEvent::Restart => {
                self.reset_session();
                None
            }
            UiEvent::ReturnToMenu => Some(SessionAction::ReturnToMenu),
        }
    }

    /// Forget the saved high score
    pub fn reset_high_score(&mut self) {
        self.state.score.high = 0;
        self.persist_high_score(0);
        if let Some(ui) = &mut self.ui {
            ui.update_high_score(0);
        }
        log::info!("High score reset");
    }

    // === Settings ===

    pub fn set_music_volume(&mut self, vol: f32) {
        self.settings.set_music_volume(vol);
        self.settings_changed();
    }

    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.settings.set_sfx_volume(vol);
        self.settings_changed();
    }

    pub fn set_music_enabled(&mut self, enabled: bool) {
        self.settings.music_enabled = enabled;
        self.settings_changed();
    }

    pub fn set_sfx_enabled(&mut self, enabled: bool) {
        self.settings.sfx_enabled = enabled;
        self.settings_changed();
    }

    /// Choose timed or endless play; takes effect on the next reset
    pub fn set_timed_mode(&mut self, timed: bool, seconds: f32) {
        self.settings.timed_mode = timed;
        self.settings.game_time = seconds.max(0.0);
    }

    fn settings_changed(&mut self) {
        if let Some(audio) = &mut self.audio {
            self.settings.apply(audio);
        }
        self.settings.save(self.store.as_mut());
    }

    fn persist_high_score(&mut self, high: u64) {
        let value = i64::try_from(high).unwrap_or(i64::MAX);
        self.store.set(SettingsKey::HighScore, StoredValue::Int(value));
        if let Err(e) = self.store.flush() {
            log::warn!("Failed to save high score: {}", e);
        }
    }

    fn refresh_ui(&mut self) {
        let Some(ui) = &mut self.ui else { return };
        ui.update_score(self.state.score.current);
        ui.update_high_score(self.state.score.high);
        if self.state.is_game_over() {
            ui.show_game_over(self.state.score.current);
        } else {
            ui.hide_game_over();
        }
        if let Some(timer) = &self.state.timer {
            ui.update_timer(&timer.text(), timer.is_urgent());
        }
    }

    fn dispatch_events(&mut self) {
        for event in self.state.drain_events() {
            match event {
                GameEvent::Dropped { .. } => {
                    if let Some(audio) = &mut self.audio {
                        audio.play(CUE_DROP);
                    }
                }
                GameEvent::Respawned { level, next } => {
                    log::debug!("Holding {}, next {}", level.name(), next.name());
                }
                GameEvent::Merged { level, pos, .. } => {
                    if let Some(audio) = &mut self.audio {
                        audio.play(CUE_MERGE);
                    }
                    // Sized by the pair that merged, not the result
                    let merged = level.prev().unwrap_or(level);
                    if let Some(ui) = &mut self.ui {
                        ui.show_merge_effect(pos, MergeEffect::for_level(merged));
                    }
                }
                GameEvent::ScoreChanged { score } => {
                    if let Some(ui) = &mut self.ui {
                        ui.update_score(score);
                    }
                }
                GameEvent::NewHighScore { high } => {
                    self.persist_high_score(high);
                    if let Some(ui) = &mut self.ui {
                        ui.update_high_score(high);
                    }
                }
                GameEvent::GameOver { final_score, .. } => {
                    if let Some(audio) = &mut self.audio {
                        audio.play(CUE_GAME_OVER);
                    }
                    if let Some(ui) = &mut self.ui {
                        ui.show_game_over(final_score);
                    }
                }
                GameEvent::Restarted => {
                    if let Some(ui) = &mut self.ui {
                        ui.hide_game_over();
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;

    use super::*;
    use crate::audio::tests::Recorder;
    use crate::persistence::{MemoryStore, get_float};
    use crate::sim::{BodyDesc, CircleWorld, Fruit, FruitLevel, GamePhase};

    #[derive(Clone, Default)]
    struct RecordingUi(Rc<RefCell<Vec<String>>>);

    impl RecordingUi {
        fn calls(&self) -> Vec<String> {
            self.0.borrow().clone()
        }

        fn clear(&self) {
            self.0.borrow_mut().clear();
        }
    }

    impl GameUi for RecordingUi {
        fn update_score(&mut self, score: u64) {
            self.0.borrow_mut().push(format!("score {}", score));
        }
        fn update_high_score(&mut self, high: u64) {
            self.0.borrow_mut().push(format!("high {}", high));
        }
        fn show_game_over(&mut self, final_score: u64) {
            self.0.borrow_mut().push(format!("game over {}", final_score));
        }
        fn hide_game_over(&mut self) {
            self.0.borrow_mut().push("hide game over".to_string());
        }
        fn update_timer(&mut self, text: &str, urgent: bool) {
            self.0.borrow_mut().push(format!("timer {} {}", text, urgent));
        }
        fn show_merge_effect(&mut self, _pos: Vec2, effect: MergeEffect) {
            self.0.borrow_mut().push(format!("effect {:?}", effect));
        }
    }

    fn weightless_game(store: MemoryStore) -> Game<CircleWorld> {
        let tuning = Tuning {
            gravity: 0.0,
            ..Tuning::default()
        };
        let world = CircleWorld::from_tuning(&tuning);
        Game::new(tuning, world, Box::new(store), 7)
    }

    fn place(game: &mut Game<CircleWorld>, level: i32, pos: Vec2) {
        let level = FruitLevel::new(level);
        let radius = game.state.tuning.radius_for(level);
        let body = game.world.create_body(BodyDesc::dynamic(pos, radius));
        let fruit = Fruit::new(game.state.ids.next_id(), body, level, pos, &game.state.tuning);
        game.state.board.insert(fruit);
    }

    #[test]
    fn test_loads_saved_high_score() {
        let mut store = MemoryStore::new();
        store.set(SettingsKey::HighScore, StoredValue::Int(4200));
        let game = weightless_game(store);
        assert_eq!(game.high_score(), 4200);
        assert_eq!(game.score(), 0);
    }

    #[test]
    fn test_merge_drives_ui_and_persists_high_score() {
        let ui = RecordingUi::default();
        let recorder = Recorder::default();
        let mut game = weightless_game(MemoryStore::new())
            .with_ui(Box::new(ui.clone()))
            .with_audio(AudioManager::new(Box::new(recorder.clone())));
        ui.clear();
        recorder.0.borrow_mut().clear();

        let r = game.state.tuning.fruit_radii[0];
        place(&mut game, 0, Vec2::new(0.0, 3.0));
        place(&mut game, 0, Vec2::new(0.5 * r, 3.0));
        game.step(&TickInput::default());

        assert_eq!(ui.calls(), vec!["effect Small", "score 100", "high 100"]);
        assert_eq!(get_int(game.store(), SettingsKey::HighScore, 0), 100);
        assert!(recorder.0.borrow().iter().any(|c| c.starts_with("start merge")));
    }

    #[test]
    fn test_merge_effect_sized_by_merged_pair() {
        let ui = RecordingUi::default();
        let mut game = weightless_game(MemoryStore::new()).with_ui(Box::new(ui.clone()));
        ui.clear();

        // Two level 3 fruits make a level 4 one; the burst stays small
        let r = game.state.tuning.fruit_radii[3];
        place(&mut game, 3, Vec2::new(-2.0, 3.0));
        place(&mut game, 3, Vec2::new(-2.0 + 0.5 * r, 3.0));
        // Two level 7 fruits: medium
        let r = game.state.tuning.fruit_radii[7];
        place(&mut game, 7, Vec2::new(2.0, 6.0));
        place(&mut game, 7, Vec2::new(2.0 + 0.5 * r, 6.0));
        game.step(&TickInput::default());

        let effects: Vec<String> = ui.calls().into_iter().filter(|c| c.starts_with("effect")).collect();
        assert_eq!(effects, vec!["effect Small", "effect Medium"]);
    }

    #[test]
    fn test_game_over_and_restart() {
        let ui = RecordingUi::default();
        let mut game = weightless_game(MemoryStore::new()).with_ui(Box::new(ui.clone()));
        place(&mut game, 3, Vec2::new(-3.0, 14.8));
        game.state.add_score(300);

        for _ in 0..240 {
            game.step(&TickInput::default());
        }
        assert!(game.is_game_over());
        assert!(ui.calls().contains(&"game over 300".to_string()));

        ui.clear();
        assert_eq!(game.handle_ui_event(UiEvent::Restart), None);
        assert_eq!(game.state.phase, GamePhase::Playing);
        assert!(game.state.board.is_empty());
        assert_eq!(game.score(), 0);
        assert_eq!(game.high_score(), 300);
        assert!(ui.calls().contains(&"hide game over".to_string()));
        assert!(ui.calls().contains(&"score 0".to_string()));
    }

    #[test]
    fn test_return_to_menu_is_surfaced() {
        let mut game = weightless_game(MemoryStore::new());
        assert_eq!(
            game.handle_ui_event(UiEvent::ReturnToMenu),
            Some(SessionAction::ReturnToMenu)
        );
    }

    #[test]
    fn test_reset_high_score() {
        let mut store = MemoryStore::new();
        store.set(SettingsKey::HighScore, StoredValue::Int(900));
        let mut game = weightless_game(store);
        game.reset_high_score();
        assert_eq!(game.high_score(), 0);
        assert_eq!(get_int(game.store(), SettingsKey::HighScore, -1), 0);
    }

    #[test]
    fn test_update_caps_substeps() {
        let mut game = weightless_game(MemoryStore::new());
        assert_eq!(game.update(0.1), MAX_SUBSTEPS);
        assert_eq!(game.state.time_ticks, MAX_SUBSTEPS as u64);
        // Huge frames are clamped, never more than the cap
        assert!(game.update(5.0) <= MAX_SUBSTEPS);
    }

    #[test]
    fn test_one_shot_inputs_clear_after_a_tick() {
        let mut game = weightless_game(MemoryStore::new());
        game.pointer_moved(1.5);
        game.press();
        game.update(SIM_DT * 1.5);
        assert!(game.state.session.is_aiming());
        assert!(!game.input.press);
        assert_eq!(game.input.pointer_x, Some(1.5));
    }

    #[test]
    fn test_timed_mode_reports_clock() {
        let ui = RecordingUi::default();
        let mut game = weightless_game(MemoryStore::new()).with_ui(Box::new(ui.clone()));
        game.set_timed_mode(true, 90.0);
        game.reset_session();
        assert!(ui.calls().contains(&"timer 01:30 false".to_string()));
        assert!(game.state.timer.is_some());
    }

    #[test]
    fn test_settings_changes_are_saved() {
        let mut game = weightless_game(MemoryStore::new());
        game.set_music_volume(0.3);
        game.set_sfx_enabled(false);
        assert!((get_float(game.store(), SettingsKey::MusicVolume, 0.0) - 0.3).abs() < 1e-6);
        assert_eq!(game.store().get(SettingsKey::SFXEnabled), Some(StoredValue::Bool(false)));
        assert!(!game.settings().sfx_enabled);
    }
}
