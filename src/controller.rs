//! Stage lifecycle
//!
//! `StageController` owns the run state, the scheduler and the collaborators.
//! It keeps at most one frame callback pending: every (re)start and every
//! exit from `Playing` cancels the outstanding handle first, and `on_frame`
//! ignores any handle it is not waiting for.

use std::cell::RefCell;
use std::rc::Rc;

use crate::Field;
use crate::audio::AudioManager;
use crate::persistence::KeyValueStore;
use crate::platform::{FrameHandle, Scheduler};
use crate::progress::UnlockedStages;
use crate::settings::Settings;
use crate::sim::{GameEvent, GameState, Outcome, TickInput, tick};
use crate::tuning::StageConfig;

/// Controller state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    Menu,
    Playing,
    GameOver,
}

/// Observer for state-change events (HUD, modals, level select)
pub trait Presenter {
    fn on_event(&mut self, event: &GameEvent);
}

/// Presenter that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullPresenter;

impl Presenter for NullPresenter {
    fn on_event(&mut self, _event: &GameEvent) {}
}

/// Presenter that keeps every event; clones share one log
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Rc<RefCell<Vec<GameEvent>>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<GameEvent> {
        self.events.borrow().clone()
    }

    /// Remove and return everything logged so far
    pub fn take(&self) -> Vec<GameEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl Presenter for EventLog {
    fn on_event(&mut self, event: &GameEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

const DEFAULT_SEED: u64 = 0x5EED_BA11_0000_0001;

/// Drives stages 1-5 through menu / playing / game over
pub struct StageController<S: Scheduler> {
    scheduler: S,
    audio: AudioManager,
    store: Box<dyn KeyValueStore>,
    presenter: Box<dyn Presenter>,
    settings: Settings,
    unlocked: UnlockedStages,
    field: Field,
    phase: ControllerPhase,
    state: Option<GameState>,
    current_stage: Option<u8>,
    pending: Option<FrameHandle>,
    seed: u64,
    runs: u64,
}

impl<S: Scheduler> StageController<S> {
    /// Build a controller in the menu, loading settings and progress from `store`
    pub fn new(scheduler: S, store: Box<dyn KeyValueStore>, mut audio: AudioManager) -> Self {
        let settings = Settings::load(store.as_ref());
        let unlocked = UnlockedStages::load(store.as_ref());
        audio.apply_settings(&settings);
        Self {
            scheduler,
            audio,
            store,
            presenter: Box::new(NullPresenter),
            settings,
            unlocked,
            field: Field::default(),
            phase: ControllerPhase::Menu,
            state: None,
            current_stage: None,
            pending: None,
            seed: DEFAULT_SEED,
            runs: 0,
        }
    }

    pub fn with_presenter(mut self, presenter: Box<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    /// Base seed; each run derives its own seed from it
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.field = field;
        self
    }

    pub fn phase(&self) -> ControllerPhase {
        self.phase
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// Mutable run state, for debug hosts and tests
    pub fn state_mut(&mut self) -> Option<&mut GameState> {
        self.state.as_mut()
    }

    pub fn current_stage(&self) -> Option<u8> {
        self.current_stage
    }

    /// Outcome of the last finished run, while in `GameOver`
    pub fn outcome(&self) -> Option<&Outcome> {
        self.state.as_ref().and_then(|s| s.outcome.as_ref())
    }

    pub fn unlocked(&self) -> &UnlockedStages {
        &self.unlocked
    }

    /// Level-select gate
    pub fn is_unlocked(&self, stage: u8) -> bool {
        self.unlocked.contains(stage)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Apply and persist new preferences
    pub fn set_settings(&mut self, settings: Settings) {
        self.audio.apply_settings(&settings);
        if let Some(state) = self.state.as_mut() {
            state.particles.set_cap(settings.max_particles());
        }
        if let Err(e) = settings.save(self.store.as_mut()) {
            log::warn!("could not save settings: {e}");
        }
        self.settings = settings;
    }

    pub fn set_muted(&mut self, muted: bool) {
        let settings = Settings {
            muted,
            ..self.settings.clone()
        };
        self.set_settings(settings);
    }

    pub fn audio(&self) -> &AudioManager {
        &self.audio
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    /// Handle of the frame callback the controller is waiting for
    pub fn pending_frame(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Start `stage` from scratch. Returns false (and changes nothing) for
    /// stage numbers outside 1..=5.
    pub fn start_stage(&mut self, stage: u8) -> bool {
        let Some(config) = StageConfig::for_stage(stage) else {
            log::warn!("refusing to start unknown stage {stage}");
            return false;
        };
        self.cancel_pending();

        let seed = self.seed ^ self.runs.wrapping_mul(0x9E37_79B9_7F4A_7C15);
        self.runs += 1;
        let track = config.music_track;
        let mut state = GameState::new(config, self.field, seed);
        state.particles.set_cap(self.settings.max_particles());
        log::info!("starting stage {stage} (seed {seed:#x})");

        self.state = Some(state);
        self.current_stage = Some(stage);
        self.phase = ControllerPhase::Playing;

        self.audio.play_stage_music(track);
        self.presenter.on_event(&GameEvent::Music { track });
        self.flush_events();

        self.pending = Some(self.scheduler.schedule());
        true
    }

    /// Start the current stage again
    pub fn restart_current_stage(&mut self) -> bool {
        match self.current_stage {
            Some(stage) => self.start_stage(stage),
            None => {
                log::warn!("restart requested with no current stage");
                false
            }
        }
    }

    /// Start the stage the last completion pointed to
    pub fn advance_to_next_stage(&mut self) -> bool {
        match self.outcome().and_then(|o| o.next_stage) {
            Some(next) => self.start_stage(next),
            None => {
                log::warn!("no next stage to advance to");
                false
            }
        }
    }

    /// Leave any run, cancel ticking and stop music
    pub fn return_to_menu(&mut self) {
        self.cancel_pending();
        self.audio.stop();
        self.state = None;
        self.phase = ControllerPhase::Menu;
    }

    /// Frame callback. Runs one tick if `handle` is the pending one.
    pub fn on_frame(&mut self, handle: FrameHandle, input: &TickInput) {
        if self.pending != Some(handle) {
            log::debug!("ignoring stale frame {handle:?}");
            return;
        }
        self.pending = None;
        if self.phase != ControllerPhase::Playing {
            return;
        }
        let Some(state) = self.state.as_mut() else {
            return;
        };

        tick(state, input);
        let over = state.is_over();
        let unlock = state
            .outcome
            .as_ref()
            .filter(|o| o.completion)
            .and_then(|o| o.next_stage);
        self.flush_events();

        if over {
            self.phase = ControllerPhase::GameOver;
            if let Some(next) = unlock {
                self.unlock_stage(next);
            }
        } else {
            self.pending = Some(self.scheduler.schedule());
        }
    }

    fn unlock_stage(&mut self, stage: u8) {
        if !self.unlocked.unlock(stage) {
            return;
        }
        log::info!("unlocked stage {stage}");
        if let Err(e) = self.unlocked.save(self.store.as_mut()) {
            log::warn!("could not save unlocked stages: {e}");
        }
        self.presenter.on_event(&GameEvent::StageUnlocked { stage });
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel(handle);
        }
    }

    /// Fan the run's pending events out to audio and the presenter
    fn flush_events(&mut self) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        for event in state.drain_events() {
            if let GameEvent::Sound { effect, options } = &event {
                self.audio.play(*effect, *options);
            }
            self.presenter.on_event(&event);
        }
    }
}
