//! Sky Balloon entry point
//!
//! Native: a headless runner that flies one stage with a simple autopilot
//! and prints the outcome. Web: boots the controller on LocalStorage and
//! `requestAnimationFrame`.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;

    use sky_balloon::StageController;
    use sky_balloon::audio::{AudioManager, LogAudio};
    use sky_balloon::persistence::{KeyValueStore, LocalStorage, MemoryStore};
    use sky_balloon::platform::{FrameHandle, RafScheduler};
    use sky_balloon::sim::TickInput;

    type Controller = StageController<RafScheduler>;

    pub fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            return;
        }
        log::info!("Sky Balloon starting...");

        let store: Box<dyn KeyValueStore> = match LocalStorage::open() {
            Ok(storage) => Box::new(storage),
            Err(e) => {
                log::warn!("{e}; progress will not be saved");
                Box::new(MemoryStore::new())
            }
        };

        let input = Rc::new(RefCell::new(TickInput::default()));
        setup_input(&input);

        // The scheduler's callback reaches the controller through this slot
        let slot: Rc<RefCell<Option<Controller>>> = Rc::new(RefCell::new(None));
        let hook_slot = slot.clone();
        let hook_input = input.clone();
        let hook: Rc<dyn Fn(FrameHandle)> = Rc::new(move |handle| {
            let frame_input = *hook_input.borrow();
            hook_input.borrow_mut().end_frame();
            if let Some(controller) = hook_slot.borrow_mut().as_mut() {
                controller.on_frame(handle, &frame_input);
            }
        });

        let seed = js_sys::Date::now() as u64;
        let controller = StageController::new(
            RafScheduler::new(hook),
            store,
            AudioManager::new(Box::new(LogAudio)),
        )
        .with_seed(seed);
        let stage = controller.unlocked().highest();
        log::info!("Game initialized with seed: {}", seed);

        *slot.borrow_mut() = Some(controller);
        if let Some(controller) = slot.borrow_mut().as_mut() {
            controller.start_stage(stage);
        }
    }

    fn setup_input(input: &Rc<RefCell<TickInput>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        for (kind, down) in [("keydown", true), ("keyup", false)] {
            let input = input.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: web_sys::KeyboardEvent| {
                // Auto-repeat would re-light the burner every few frames
                if down && event.repeat() {
                    return;
                }
                if input.borrow_mut().apply_key(&event.key(), down) {
                    event.prevent_default();
                }
            });
            let _ = window.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() {
    wasm_game::run();
}

#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use std::path::PathBuf;
    use std::process::ExitCode;
    use std::time::{SystemTime, UNIX_EPOCH};

    use clap::Parser;

    use sky_balloon::audio::{AudioManager, LogAudio};
    use sky_balloon::controller::EventLog;
    use sky_balloon::persistence::{FileStore, KeyValueStore, MemoryStore};
    use sky_balloon::platform::ManualScheduler;
    use sky_balloon::sim::{GameEvent, GameState, TickInput, format_elapsed};
    use sky_balloon::{ControllerPhase, QualityPreset, Settings, StageController};

    #[derive(Debug, Parser)]
    #[command(name = "sky-balloon", about = "Fly one stage headless and report the outcome")]
    pub struct Args {
        /// Stage to fly (1-5)
        #[arg(short, long, default_value_t = 1)]
        stage: u8,

        /// RNG seed (defaults to the clock)
        #[arg(long)]
        seed: Option<u64>,

        /// Give up after this many ticks
        #[arg(long, default_value_t = 20_000)]
        max_ticks: u64,

        /// Fly without any input at all
        #[arg(long)]
        no_autopilot: bool,

        /// Persist progress and settings in this directory
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Particle quality: low, medium or high
        #[arg(long)]
        quality: Option<String>,
    }

    /// Hold a cruising band around 40% of the field height
    fn autopilot(state: &GameState) -> TickInput {
        let b = &state.balloon;
        let h = state.field.height;
        let sinking = b.vel.y > 0.8 || b.pos.y > h * 0.45;
        let rising = b.vel.y < -1.2 || b.pos.y < h * 0.3;
        TickInput {
            start_heating: sinking && !b.heating,
            stop_heating: rising && b.heating,
            ..TickInput::default()
        }
    }

    pub fn run(args: Args) -> ExitCode {
        let store: Box<dyn KeyValueStore> = match &args.data_dir {
            Some(dir) => match FileStore::open(dir) {
                Ok(store) => Box::new(store),
                Err(e) => {
                    log::warn!("{e}; using in-memory storage");
                    Box::new(MemoryStore::new())
                }
            },
            None => Box::new(MemoryStore::new()),
        };

        let seed = args.seed.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default()
        });

        let events = EventLog::default();
        let mut controller = StageController::new(
            ManualScheduler::new(),
            store,
            AudioManager::new(Box::new(LogAudio)),
        )
        .with_presenter(Box::new(events.clone()))
        .with_seed(seed);

        if let Some(preset) = args.quality.as_deref().and_then(QualityPreset::parse) {
            let settings = Settings {
                quality: preset,
                ..controller.settings().clone()
            };
            controller.set_settings(settings);
        }

        if !controller.start_stage(args.stage) {
            eprintln!("unknown stage {}", args.stage);
            return ExitCode::FAILURE;
        }

        let mut ticks = 0;
        while ticks < args.max_ticks {
            let Some(handle) = controller.scheduler_mut().pop_due() else {
                break;
            };
            let input = match controller.state() {
                Some(state) if !args.no_autopilot => autopilot(state),
                _ => TickInput::default(),
            };
            controller.on_frame(handle, &input);
            ticks += 1;

            for event in events.take() {
                match event {
                    GameEvent::StarCollected { total, score } => {
                        log::info!("star {total} (score {score})")
                    }
                    GameEvent::SpectatorKilled { total } => log::info!("spectators killed: {total}"),
                    GameEvent::StageUnlocked { stage } => println!("Unlocked stage {stage}"),
                    _ => {}
                }
            }
        }

        match controller.outcome() {
            Some(outcome) if controller.phase() == ControllerPhase::GameOver => {
                println!("{}", outcome.message);
                println!(
                    "stage {} | {} m | score {} | fuel {}% | {}",
                    outcome.stats.stage,
                    outcome.stats.progress_meters,
                    outcome.stats.score,
                    outcome.stats.fuel_percent,
                    format_elapsed(outcome.stats.elapsed_ticks)
                );
                if outcome.victory {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::from(2)
                }
            }
            _ => {
                println!("Still flying after {ticks} ticks");
                ExitCode::from(3)
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> std::process::ExitCode {
    use clap::Parser;

    env_logger::init();
    log::info!("Sky Balloon (headless) starting...");
    headless::run(headless::Args::parse())
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}
