//! Platform abstraction layer
//!
//! The controller asks for "one more frame" through a cancellable scheduler
//! port and the host answers by calling `StageController::on_frame` with the
//! handle it was given. Handles are never reused, so a stale or cancelled
//! callback is recognised and ignored.

/// Identifies one scheduled frame callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameHandle(pub u64);

/// Cancellable frame scheduler
pub trait Scheduler {
    /// Request a callback for the next frame
    fn schedule(&mut self) -> FrameHandle;

    /// Drop a pending callback; unknown or already-fired handles are ignored
    fn cancel(&mut self, handle: FrameHandle);
}

/// Scheduler driven by hand: tests and headless runs pop due frames themselves
#[derive(Debug, Default, Clone)]
pub struct ManualScheduler {
    next_id: u64,
    pending: Vec<FrameHandle>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the oldest pending callback, as the host's frame loop would fire it
    pub fn pop_due(&mut self) -> Option<FrameHandle> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.pending.remove(0))
        }
    }

    pub fn pending(&self) -> &[FrameHandle] {
        &self.pending
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending.push(handle);
        handle
    }

    fn cancel(&mut self, handle: FrameHandle) {
        self.pending.retain(|h| *h != handle);
    }
}

#[cfg(target_arch = "wasm32")]
pub use raf::RafScheduler;

#[cfg(target_arch = "wasm32")]
mod raf {
    use std::cell::Cell;
    use std::rc::Rc;

    use wasm_bindgen::JsCast;
    use wasm_bindgen::prelude::*;

    use super::{FrameHandle, Scheduler};

    struct Pending {
        handle: FrameHandle,
        raf_id: i32,
        fired: Rc<Cell<bool>>,
        _closure: Closure<dyn FnMut(f64)>,
    }

    /// `requestAnimationFrame` scheduler. Fired frames are handed to `on_frame`.
    pub struct RafScheduler {
        next_id: u64,
        pending: Vec<Pending>,
        on_frame: Rc<dyn Fn(FrameHandle)>,
    }

    impl RafScheduler {
        pub fn new(on_frame: Rc<dyn Fn(FrameHandle)>) -> Self {
            Self {
                next_id: 0,
                pending: Vec::new(),
                on_frame,
            }
        }
    }

    impl Scheduler for RafScheduler {
        fn schedule(&mut self) -> FrameHandle {
            self.pending.retain(|p| !p.fired.get());
            self.next_id += 1;
            let handle = FrameHandle(self.next_id);

            let fired = Rc::new(Cell::new(false));
            let hook = self.on_frame.clone();
            let flag = fired.clone();
            let closure = Closure::<dyn FnMut(f64)>::new(move |_time: f64| {
                flag.set(true);
                hook(handle);
            });

            let raf_id = match web_sys::window()
                .map(|w| w.request_animation_frame(closure.as_ref().unchecked_ref()))
            {
                Some(Ok(id)) => id,
                _ => {
                    log::warn!("requestAnimationFrame unavailable");
                    return handle;
                }
            };
            self.pending.push(Pending {
                handle,
                raf_id,
                fired,
                _closure: closure,
            });
            handle
        }

        fn cancel(&mut self, handle: FrameHandle) {
            if let Some(i) = self.pending.iter().position(|p| p.handle == handle) {
                let pending = self.pending.remove(i);
                if !pending.fired.get() {
                    if let Some(window) = web_sys::window() {
                        let _ = window.cancel_animation_frame(pending.raf_id);
                    }
                }
            }
        }
    }
}
