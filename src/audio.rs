//! Sound collaborator port
//!
//! The game only names cues; synthesis and playback belong to whatever sink
//! the host plugs in. Every call is fire-and-forget and never reaches back
//! into the simulation.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Sound effect cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Burner lit
    Heat,
    /// Hit a mountain, building or dangerous bird
    Crash,
    /// Struck by lightning
    Thunder,
    /// Hit a bird
    Crow,
    CollectStar,
    CollectFuel,
    /// Stage complete or happy ending
    Victory,
    /// Shot, caught or out of fuel
    Fail,
}

impl SoundEffect {
    /// Asset name used by sinks that load samples by key
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundEffect::Heat => "heat",
            SoundEffect::Crash => "crash",
            SoundEffect::Thunder => "thunder",
            SoundEffect::Crow => "crow",
            SoundEffect::CollectStar => "collectStar",
            SoundEffect::CollectFuel => "collectFuel",
            SoundEffect::Victory => "victory",
            SoundEffect::Fail => "fail",
        }
    }
}

/// Per-cue playback options
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundOptions {
    /// 0.0 - 1.0 before master/sfx scaling
    pub volume: f32,
    pub pitch: f32,
}

impl Default for SoundOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pitch: 1.0,
        }
    }
}

impl SoundOptions {
    pub fn volume(volume: f32) -> Self {
        Self {
            volume,
            ..Self::default()
        }
    }
}

/// Anything that can play cues and loop stage music
pub trait AudioSink {
    fn play_effect(&mut self, effect: SoundEffect, options: SoundOptions);

    /// Start looping `track` at `volume`, replacing whatever is playing
    fn play_music(&mut self, track: u8, volume: f32);

    fn stop_music(&mut self);
}

/// Sink for hosts without audio
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play_effect(&mut self, _effect: SoundEffect, _options: SoundOptions) {}
    fn play_music(&mut self, _track: u8, _volume: f32) {}
    fn stop_music(&mut self) {}
}

/// Sink that only logs, for headless runs
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAudio;

impl AudioSink for LogAudio {
    fn play_effect(&mut self, effect: SoundEffect, options: SoundOptions) {
        log::debug!("sfx {} vol={:.2} pitch={:.2}", effect.as_str(), options.volume, options.pitch);
    }

    fn play_music(&mut self, track: u8, volume: f32) {
        log::debug!("music track {track} vol={volume:.2}");
    }

    fn stop_music(&mut self) {
        log::debug!("music stopped");
    }
}

/// A call the recording sink received
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioCall {
    Effect(SoundEffect, SoundOptions),
    Music(u8, f32),
    StopMusic,
}

/// Sink that records every call; clones share one log
#[derive(Debug, Default, Clone)]
pub struct RecordingAudio {
    calls: Rc<RefCell<Vec<AudioCall>>>,
}

impl RecordingAudio {
    pub fn calls(&self) -> Vec<AudioCall> {
        self.calls.borrow().clone()
    }

    pub fn effects(&self) -> Vec<SoundEffect> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                AudioCall::Effect(e, _) => Some(*e),
                _ => None,
            })
            .collect()
    }
}

impl AudioSink for RecordingAudio {
    fn play_effect(&mut self, effect: SoundEffect, options: SoundOptions) {
        self.calls.borrow_mut().push(AudioCall::Effect(effect, options));
    }

    fn play_music(&mut self, track: u8, volume: f32) {
        self.calls.borrow_mut().push(AudioCall::Music(track, volume));
    }

    fn stop_music(&mut self) {
        self.calls.borrow_mut().push(AudioCall::StopMusic);
    }
}

/// Applies player volume settings in front of a sink
pub struct AudioManager {
    sink: Box<dyn AudioSink>,
    master_volume: f32,
    sfx_volume: f32,
    music_volume: f32,
    muted: bool,
    current_track: Option<u8>,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new(Box::new(NullAudio))
    }
}

impl AudioManager {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self {
            sink,
            master_volume: 0.8,
            sfx_volume: 1.0,
            music_volume: 0.6,
            muted: false,
            current_track: None,
        }
    }

    pub fn apply_settings(&mut self, settings: &Settings) {
        self.master_volume = settings.master_volume.clamp(0.0, 1.0);
        self.sfx_volume = settings.sfx_volume.clamp(0.0, 1.0);
        self.music_volume = settings.music_volume.clamp(0.0, 1.0);
        self.set_muted(settings.muted);
    }

    /// Mute/unmute everything; a playing track is restarted at the new level
    pub fn set_muted(&mut self, muted: bool) {
        if self.muted == muted {
            return;
        }
        self.muted = muted;
        if let Some(track) = self.current_track {
            let volume = self.music_level();
            self.sink.play_music(track, volume);
        }
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    fn effect_level(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    fn music_level(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.music_volume
        }
    }

    /// Play a cue; silent cues are not forwarded
    pub fn play(&mut self, effect: SoundEffect, options: SoundOptions) {
        let volume = (options.volume * self.effect_level()).clamp(0.0, 1.0);
        if volume <= 0.0 {
            return;
        }
        self.sink.play_effect(effect, SoundOptions { volume, ..options });
    }

    pub fn play_stage_music(&mut self, track: u8) {
        self.current_track = Some(track);
        let volume = self.music_level();
        self.sink.play_music(track, volume);
    }

    pub fn stop(&mut self) {
        if self.current_track.take().is_some() {
            self.sink.stop_music();
        }
    }

    pub fn current_track(&self) -> Option<u8> {
        self.current_track
    }
}
