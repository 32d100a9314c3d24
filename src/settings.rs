//! Player settings and preferences
//!
//! Audio preferences are persisted through the key-value store; the
//! game-mode choice is made per session and never saved.

use serde::{Deserialize, Serialize};

use crate::audio::AudioManager;
use crate::persistence::{KeyValueStore, SettingsKey, StoredValue, get_bool, get_float};

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    // === Audio ===
    /// Music volume (0.0 - 1.0)
    pub music_volume: f32,
    /// Sound effects volume (0.0 - 1.0)
    pub sfx_volume: f32,
    pub music_enabled: bool,
    pub sfx_enabled: bool,

    // === Mode (not persisted) ===
    /// Play against the clock
    pub timed_mode: bool,
    /// Timed mode duration in seconds
    pub game_time: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            music_volume: 0.5,
            sfx_volume: 0.8,
            music_enabled: true,
            sfx_enabled: true,

            timed_mode: false,
            game_time: 120.0,
        }
    }
}

impl Settings {
    /// Load persisted preferences, defaults for anything missing
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let defaults = Self::default();
        let settings = Self {
            music_volume: get_float(store, SettingsKey::MusicVolume, defaults.music_volume as f64).clamp(0.0, 1.0)
                as f32,
            sfx_volume: get_float(store, SettingsKey::SFXVolume, defaults.sfx_volume as f64).clamp(0.0, 1.0) as f32,
            music_enabled: get_bool(store, SettingsKey::MusicEnabled, defaults.music_enabled),
            sfx_enabled: get_bool(store, SettingsKey::SFXEnabled, defaults.sfx_enabled),
            ..defaults
        };
        log::info!(
            "Settings: music {:.2} ({}), sfx {:.2} ({})",
            settings.music_volume,
            if settings.music_enabled { "on" } else { "off" },
            settings.sfx_volume,
            if settings.sfx_enabled { "on" } else { "off" },
        );
        settings
    }

    /// Write the persisted preferences and flush
    pub fn save(&self, store: &mut dyn KeyValueStore) {
        store.set(SettingsKey::MusicVolume, StoredValue::Float(self.music_volume as f64));
        store.set(SettingsKey::SFXVolume, StoredValue::Float(self.sfx_volume as f64));
        store.set(SettingsKey::MusicEnabled, StoredValue::Bool(self.music_enabled));
        store.set(SettingsKey::SFXEnabled, StoredValue::Bool(self.sfx_enabled));
        match store.flush() {
            Ok(()) => log::info!("Settings saved"),
            Err(e) => log::warn!("Failed to save settings: {}", e),
        }
    }

    pub fn set_music_volume(&mut self, vol: f32) {
        self.music_volume = vol.clamp(0.0, 1.0);
    }

    pub fn set_sfx_volume(&mut self, vol: f32) {
        self.sfx_volume = vol.clamp(0.0, 1.0);
    }

    /// Timed mode duration, if enabled
    pub fn session_duration(&self) -> Option<f32> {
        self.timed_mode.then_some(self.game_time.max(0.0))
    }

    /// Push the audio preferences into the mixer
    pub fn apply(&self, audio: &mut AudioManager) {
        audio.set_sfx_volume(self.sfx_volume);
        audio.set_sfx_enabled(self.sfx_enabled);
        audio.set_music_volume(self.music_volume);
        audio.set_music_enabled(self.music_enabled);
    }
}
