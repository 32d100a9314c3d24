//! Named audio cues
//!
//! The game asks for sounds by name (`drop`, `merge`, ...). The manager looks
//! the cue up, applies category volume and mute, and hands the result to an
//! [`AudioBackend`] which does the actual playback.

use serde::{Deserialize, Serialize};

pub const CUE_DROP: &str = "drop";
pub const CUE_MERGE: &str = "merge";
pub const CUE_GAME_OVER: &str = "gameOver";
pub const CUE_BUTTON_CLICK: &str = "buttonClick";
pub const CUE_BACKGROUND_MUSIC: &str = "backgroundMusic";

/// A registered sound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioCue {
    pub name: String,
    /// Cue volume before category scaling (0.0 - 1.0)
    pub volume: f32,
    pub pitch: f32,
    /// Looped cues are music, everything else is an effect
    pub looped: bool,
}

impl AudioCue {
    pub fn sfx(name: &str, volume: f32) -> Self {
        Self {
            name: name.to_string(),
            volume,
            pitch: 1.0,
            looped: false,
        }
    }

    pub fn music(name: &str, volume: f32) -> Self {
        Self {
            name: name.to_string(),
            volume,
            pitch: 1.0,
            looped: true,
        }
    }
}

/// The default cue table
pub fn default_cues() -> Vec<AudioCue> {
    vec![
        AudioCue::sfx(CUE_DROP, 0.8),
        AudioCue::sfx(CUE_MERGE, 1.0),
        AudioCue::sfx(CUE_GAME_OVER, 1.0),
        AudioCue::sfx(CUE_BUTTON_CLICK, 0.6),
        AudioCue::music(CUE_BACKGROUND_MUSIC, 0.7),
    ]
}

/// Playback sink
pub trait AudioBackend {
    /// Start a cue at its effective volume
    fn start(&mut self, cue: &AudioCue, volume: f32);
    fn stop(&mut self, name: &str);
}

/// Backend that only logs, for headless runs
#[derive(Debug, Default)]
pub struct LogBackend;

impl AudioBackend for LogBackend {
    fn start(&mut self, cue: &AudioCue, volume: f32) {
        log::debug!("♪ {} (vol {:.2}, loop {})", cue.name, volume, cue.looped);
    }

    fn stop(&mut self, name: &str) {
        log::debug!("♪ stop {}", name);
    }
}

/// Audio manager for the game
pub struct AudioManager {
    cues: Vec<AudioCue>,
    backend: Box<dyn AudioBackend>,
    music_volume: f32,
    sfx_volume: f32,
    music_enabled: bool,
    sfx_enabled: bool,
}

impl AudioManager {
    /// Build with the default cue table and start the background music
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self::with_cues(backend, default_cues())
    }

    pub fn with_cues(backend: Box<dyn AudioBackend>, cues: Vec<AudioCue>) -> Self {
        let mut manager = Self {
            cues,
            backend,
            music_volume: 0.5,
            sfx_volume: 0.8,
            music_enabled: true,
            sfx_enabled: true,
        };
        manager.play(CUE_BACKGROUND_MUSIC);
        manager
    }

    fn cue(&self, name: &str) -> Option<&AudioCue> {
        self.cues.iter().find(|c| c.name == name)
    }

    /// Volume a cue would play at right now (0 when muted)
    pub fn effective_volume(&self, cue: &AudioCue) -> f32 {
        let (enabled, category) = if cue.looped {
            (self.music_enabled, self.music_volume)
        } else {
            (self.sfx_enabled, self.sfx_volume)
        };
        if enabled { cue.volume * category } else { 0.0 }
    }

    /// Play a cue by name
    pub fn play(&mut self, name: &str) {
        let Some(cue) = self.cue(name) else {
            log::warn!("Sound {} not found", name);
            return;
        };
        let volume = self.effective_volume(cue);
        if volume <= 0.0 {
            return;
        }
        let cue = cue.clone();
        self.backend.start(&cue, volume);
    }

    /// Stop a cue by name
    pub fn stop(&mut self, name: &str) {
        if self.cue(name).is_none() {
            log::warn!("Sound {} not found", name);
            return;
        }
        self.backend.stop(name);
    }

    pub fn music_volume(&self) -> f32 {
        self.music_volume
    }

    pub fn sfx_volume(&self) -> f32 {
        self.sfx_volume
    }

    /// Set music volume (0.0 - 1.0), restarting the looped cues at the new level
    pub fn set_music_volume(&mut self, vol: f32) {
        self.music_volume = vol.clamp(0.0, 1.0);
        self.refresh_music();
    }

    /// Set SFX volume (0.0 - 1.0)
    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_music_enabled(&mut self, enabled: bool) {
        self.music_enabled = enabled;
        self.refresh_music();
    }

    pub fn set_sfx_enabled(&mut self, enabled: bool) {
        self.sfx_enabled = enabled;
    }

    fn refresh_music(&mut self) {
        let looped: Vec<String> = self
            .cues
            .iter()
            .filter(|c| c.looped)
            .map(|c| c.name.clone())
            .collect();
        for name in looped {
            self.backend.stop(&name);
            self.play(&name);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Backend recording every call, shared with the test through an `Rc`
    #[derive(Debug, Clone, Default)]
    pub(crate) struct Recorder(pub Rc<RefCell<Vec<String>>>);

    impl AudioBackend for Recorder {
        fn start(&mut self, cue: &AudioCue, volume: f32) {
            self.0.borrow_mut().push(format!("start {} {:.2}", cue.name, volume));
        }

        fn stop(&mut self, name: &str) {
            self.0.borrow_mut().push(format!("stop {}", name));
        }
    }

    #[test]
    fn test_music_starts_on_construction() {
        let recorder = Recorder::default();
        let _audio = AudioManager::new(Box::new(recorder.clone()));
        assert_eq!(*recorder.0.borrow(), vec!["start backgroundMusic 0.35"]);
    }

    #[test]
    fn test_effective_volume_scales_by_category() {
        let recorder = Recorder::default();
        let mut audio = AudioManager::new(Box::new(recorder.clone()));
        recorder.0.borrow_mut().clear();

        audio.play(CUE_DROP);
        audio.set_sfx_volume(0.5);
        audio.play(CUE_MERGE);
        assert_eq!(*recorder.0.borrow(), vec!["start drop 0.64", "start merge 0.50"]);
    }

    #[test]
    fn test_muted_and_unknown_cues_are_skipped() {
        let recorder = Recorder::default();
        let mut audio = AudioManager::new(Box::new(recorder.clone()));
        recorder.0.borrow_mut().clear();

        audio.set_sfx_enabled(false);
        audio.play(CUE_DROP);
        audio.play("kazoo");
        audio.stop("kazoo");
        audio.set_sfx_enabled(true);
        audio.set_sfx_volume(0.0);
        audio.play(CUE_MERGE);
        assert!(recorder.0.borrow().is_empty());
    }

    #[test]
    fn test_disabling_music_stops_the_loop() {
        let recorder = Recorder::default();
        let mut audio = AudioManager::new(Box::new(recorder.clone()));
        recorder.0.borrow_mut().clear();

        audio.set_music_enabled(false);
        assert_eq!(*recorder.0.borrow(), vec!["stop backgroundMusic"]);
        audio.set_music_volume(2.0);
        assert_eq!(audio.music_volume(), 1.0);
    }
}
