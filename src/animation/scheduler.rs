use std::cell::{Cell, RefCell};

use anyhow::Result;

/// Callback invoked once with the frame's timestamp in milliseconds.
pub type FrameCallback = Box<dyn FnOnce(f64)>;

/// Host hook that runs a callback once before the next frame is painted.
pub trait FrameScheduler {
    /// Current time on the same monotonic clock the frame timestamps use.
    fn now(&self) -> f64;

    /// Queues `callback` for the next frame. Each request fires at most once.
    fn request_frame(&self, callback: FrameCallback) -> Result<()>;
}

/// Deterministic scheduler driven by explicit timestamps.
///
/// Used by the headless CLI and by tests in place of the browser's
/// animation-frame queue.
#[derive(Default)]
pub struct ManualScheduler {
    clock: Cell<f64>,
    queue: RefCell<Vec<FrameCallback>>,
}

impl ManualScheduler {
    pub fn new(start: f64) -> Self {
        Self {
            clock: Cell::new(start),
            queue: RefCell::new(Vec::new()),
        }
    }

    /// Number of callbacks waiting for the next frame.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Moves the host clock without producing a frame.
    pub fn set_time(&self, now: f64) {
        self.clock.set(now);
    }

    /// Moves the clock by `delta` and runs one frame. Returns how many
    /// callbacks fired.
    pub fn advance(&self, delta: f64) -> usize {
        self.run_frame_at(self.clock.get() + delta)
    }

    /// Runs one frame at `timestamp`. Callbacks requested while the frame
    /// runs are deferred to the following frame.
    pub fn run_frame_at(&self, timestamp: f64) -> usize {
        self.clock.set(timestamp);
        let callbacks = std::mem::take(&mut *self.queue.borrow_mut());
        let count = callbacks.len();
        for callback in callbacks {
            callback(timestamp);
        }
        count
    }
}

impl FrameScheduler for ManualScheduler {
    fn now(&self) -> f64 {
        self.clock.get()
    }

    fn request_frame(&self, callback: FrameCallback) -> Result<()> {
        self.queue.borrow_mut().push(callback);
        Ok(())
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("clock", &self.clock.get())
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn callbacks_fire_once_with_the_frame_timestamp() {
        let scheduler = ManualScheduler::new(100.0);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        scheduler
            .request_frame(Box::new(move |ts| sink.borrow_mut().push(ts)))
            .unwrap();

        assert_eq!(scheduler.advance(16.0), 1);
        assert_eq!(scheduler.advance(16.0), 0);
        assert_eq!(*seen.borrow(), vec![116.0]);
        assert_eq!(scheduler.now(), 132.0);
    }

    #[test]
    fn requests_made_during_a_frame_wait_for_the_next() {
        let scheduler = Rc::new(ManualScheduler::new(0.0));
        let inner = Rc::clone(&scheduler);
        scheduler
            .request_frame(Box::new(move |_| {
                inner.request_frame(Box::new(|_| {})).unwrap();
            }))
            .unwrap();

        assert_eq!(scheduler.run_frame_at(10.0), 1);
        assert_eq!(scheduler.pending(), 1);
    }
}
