use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use log::{debug, error, trace};

use super::driver::{AnimationState, FrameSample, PlaybackStatus};
use super::keyframe::{Pose, PourAnimation};
use super::scheduler::FrameScheduler;

/// Destination for the poses produced by the animation loop.
pub trait PoseSink {
    fn write_pose(&mut self, pose: &Pose);
}

impl<F> PoseSink for F
where
    F: FnMut(&Pose),
{
    fn write_pose(&mut self, pose: &Pose) {
        self(pose)
    }
}

type FrameListener = Box<dyn FnMut(&FrameSample)>;

struct PlayerInner {
    state: AnimationState,
    animation: PourAnimation,
    target: Option<Box<dyn PoseSink>>,
    listener: Option<FrameListener>,
    frame_pending: bool,
}

impl PlayerInner {
    fn render(&mut self, now: f64) -> FrameSample {
        let (state, frame) = self.state.update(now, &self.animation);
        if state.status() != self.state.status() {
            debug!("pour playback {:?} -> {:?}", self.state.status(), state.status());
        }
        self.state = state;
        self.write(&frame);
        frame
    }

    fn write(&mut self, frame: &FrameSample) {
        match self.target.as_mut() {
            Some(target) => target.write_pose(&frame.pose),
            None => trace!("no pose target attached; skipping write"),
        }
    }
}

/// Drives an [`AnimationState`] from a [`FrameScheduler`] and writes every
/// sampled pose into its target.
///
/// At most one frame request is outstanding at any time. A frame that
/// observes a non-playing clock does not reschedule, so nothing runs after
/// `pause`/`stop` until `play`/`resume`.
pub struct AnimationPlayer<S: FrameScheduler + 'static> {
    inner: Rc<RefCell<PlayerInner>>,
    scheduler: Rc<S>,
}

impl<S: FrameScheduler + 'static> AnimationPlayer<S> {
    pub fn new(animation: PourAnimation, scheduler: Rc<S>) -> Self {
        let inner = PlayerInner {
            state: AnimationState::new(animation.timeline),
            animation,
            target: None,
            listener: None,
            frame_pending: false,
        };
        Self {
            inner: Rc::new(RefCell::new(inner)),
            scheduler,
        }
    }

    /// Replaces the object receiving poses. `None` turns writes into no-ops.
    pub fn set_target(&self, target: Option<Box<dyn PoseSink>>) {
        self.inner.borrow_mut().target = target;
    }

    /// Registers a callback invoked after every pose write.
    pub fn on_frame(&self, listener: impl FnMut(&FrameSample) + 'static) {
        self.inner.borrow_mut().listener = Some(Box::new(listener));
    }

    pub fn state(&self) -> AnimationState {
        self.inner.borrow().state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.state().status()
    }

    pub fn animation(&self) -> PourAnimation {
        self.inner.borrow().animation
    }

    pub fn frame_pending(&self) -> bool {
        self.inner.borrow().frame_pending
    }

    /// Starts a fresh cycle and begins the frame loop.
    pub fn play(&self) -> Result<()> {
        let now = self.scheduler.now();
        self.transition(|state| state.start(now));
        self.refresh();
        schedule(&self.inner, &self.scheduler)
    }

    /// Continues a paused or stopped cycle from its frozen time; starts a
    /// fresh cycle when idle or completed. No-op while already playing.
    pub fn play_or_resume(&self) -> Result<()> {
        match self.status() {
            PlaybackStatus::Paused | PlaybackStatus::Stopped => self.resume(),
            PlaybackStatus::Idle | PlaybackStatus::Completed => self.play(),
            PlaybackStatus::Playing => Ok(()),
        }
    }

    pub fn pause(&self) {
        let now = self.scheduler.now();
        self.transition(|state| state.pause(now));
        self.refresh();
    }

    pub fn resume(&self) -> Result<()> {
        let now = self.scheduler.now();
        self.transition(|state| state.resume(now));
        schedule(&self.inner, &self.scheduler)
    }

    /// Halts the loop and puts the target back at the start pose.
    pub fn stop(&self) {
        self.transition(AnimationState::stop);
        self.refresh();
    }

    pub fn request_completion(&self) {
        self.transition(AnimationState::request_completion);
    }

    /// Jumps to `time`, pausing playback, and writes that pose immediately.
    pub fn scrub(&self, time: f64) -> FrameSample {
        self.transition(|state| state.scrub(time));
        self.refresh()
    }

    /// Re-samples the current clock and writes the pose without advancing.
    pub fn refresh(&self) -> FrameSample {
        let frame = {
            let mut inner = self.inner.borrow_mut();
            let frame = inner.state.sample(&inner.animation);
            inner.write(&frame);
            frame
        };
        notify(&self.inner, &frame);
        frame
    }

    fn transition(&self, op: impl FnOnce(AnimationState) -> AnimationState) {
        let mut inner = self.inner.borrow_mut();
        let next = op(inner.state);
        if next.status() != inner.state.status() {
            debug!("pour playback {:?} -> {:?}", inner.state.status(), next.status());
        }
        inner.state = next;
    }
}

fn schedule<S: FrameScheduler + 'static>(
    inner: &Rc<RefCell<PlayerInner>>,
    scheduler: &Rc<S>,
) -> Result<()> {
    {
        let mut guard = inner.borrow_mut();
        if guard.frame_pending || !guard.state.is_playing() {
            return Ok(());
        }
        guard.frame_pending = true;
    }

    let frame_inner = Rc::clone(inner);
    let frame_scheduler = Rc::clone(scheduler);
    let requested = scheduler.request_frame(Box::new(move |timestamp| {
        let frame = {
            let mut guard = frame_inner.borrow_mut();
            guard.frame_pending = false;
            if !guard.state.is_playing() {
                return;
            }
            guard.render(timestamp)
        };
        notify(&frame_inner, &frame);
        if frame.keep_running() {
            if let Err(err) = schedule(&frame_inner, &frame_scheduler) {
                error!("failed to schedule next pour frame: {err:?}");
            }
        }
    }));

    if requested.is_err() {
        inner.borrow_mut().frame_pending = false;
    }
    requested
}

// The listener is taken out while it runs so it may query the player.
fn notify(inner: &Rc<RefCell<PlayerInner>>, frame: &FrameSample) {
    let listener = inner.borrow_mut().listener.take();
    if let Some(mut listener) = listener {
        listener(frame);
        let mut guard = inner.borrow_mut();
        if guard.listener.is_none() {
            guard.listener = Some(listener);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::ManualScheduler;

    fn player() -> (AnimationPlayer<ManualScheduler>, Rc<ManualScheduler>, Rc<RefCell<Vec<Pose>>>) {
        let scheduler = Rc::new(ManualScheduler::new(0.0));
        let player = AnimationPlayer::new(PourAnimation::default(), Rc::clone(&scheduler));
        let written = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&written);
        player.set_target(Some(Box::new(move |pose: &Pose| sink.borrow_mut().push(*pose))));
        (player, scheduler, written)
    }

    #[test]
    fn play_writes_a_pose_every_frame() {
        let (player, scheduler, written) = player();
        player.play().unwrap();
        assert!(player.frame_pending());
        for _ in 0..5 {
            assert_eq!(scheduler.advance(100.0), 1);
        }
        let written = written.borrow();
        // One write from play() plus one per frame.
        assert_eq!(written.len(), 6);
        assert_eq!(written[5].rotation.z, 195.0);
    }

    #[test]
    fn pause_stops_scheduling_until_resume() {
        let (player, scheduler, written) = player();
        player.play().unwrap();
        scheduler.advance(100.0);
        player.pause();

        // The request already queued fires but does not reschedule.
        assert_eq!(scheduler.advance(100.0), 1);
        assert_eq!(scheduler.advance(100.0), 0);
        assert!(!player.frame_pending());

        scheduler.set_time(10_000.0);
        player.resume().unwrap();
        scheduler.advance(400.0);
        assert_eq!(player.state().passed_time(), 500.0);
        assert_eq!(written.borrow().last().unwrap().rotation.z, 195.0);
    }

    #[test]
    fn play_or_resume_continues_after_pause() {
        let (player, scheduler, written) = player();
        player.play_or_resume().unwrap();
        scheduler.advance(250.0);
        player.pause();
        scheduler.advance(1_000.0);

        player.play_or_resume().unwrap();
        scheduler.advance(250.0);
        assert_eq!(player.state().passed_time(), 500.0);
        assert_eq!(written.borrow().last().unwrap().rotation.z, 195.0);

        // Already playing: no restart and still one request in flight.
        player.play_or_resume().unwrap();
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(player.state().passed_time(), 500.0);
    }

    #[test]
    fn play_or_resume_continues_from_scrubbed_time() {
        let (player, scheduler, written) = player();
        player.scrub(3_500.0);
        player.play_or_resume().unwrap();
        scheduler.advance(100.0);

        assert_eq!(player.status(), PlaybackStatus::Playing);
        assert_eq!(player.state().passed_time(), 3_600.0);
        let last = *written.borrow().last().unwrap();
        assert!((last.rotation.z - 192.0).abs() < 1e-3);
    }

    #[test]
    fn play_or_resume_restarts_a_completed_cycle() {
        let (player, scheduler, _) = player();
        player.play().unwrap();
        scheduler.advance(500.0);
        player.request_completion();
        while scheduler.pending() > 0 {
            scheduler.advance(500.0);
        }
        assert_eq!(player.status(), PlaybackStatus::Completed);

        player.play_or_resume().unwrap();
        scheduler.advance(250.0);
        assert_eq!(player.status(), PlaybackStatus::Playing);
        assert_eq!(player.state().passed_time(), 250.0);
    }

    #[test]
    fn repeated_play_keeps_a_single_loop() {
        let (player, scheduler, _) = player();
        player.play().unwrap();
        player.play().unwrap();
        player.resume().unwrap();
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn missing_target_is_a_no_op() {
        let scheduler = Rc::new(ManualScheduler::new(0.0));
        let player = AnimationPlayer::new(PourAnimation::default(), Rc::clone(&scheduler));
        player.play().unwrap();
        scheduler.advance(250.0);
        assert!(player.frame_pending());
        assert_eq!(player.state().passed_time(), 250.0);
    }

    #[test]
    fn scrub_pauses_and_writes_immediately() {
        let (player, scheduler, written) = player();
        player.play().unwrap();
        let frame = player.scrub(1_500.0);
        assert_eq!(frame.pose.rotation.z, 210.0);
        assert_eq!(player.status(), PlaybackStatus::Paused);
        assert_eq!(written.borrow().last().unwrap().rotation.z, 210.0);
        scheduler.advance(16.0);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn listener_sees_every_frame() {
        let (player, scheduler, _) = player();
        let times = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&times);
        player.on_frame(move |frame| seen.borrow_mut().push(frame.passed_time));
        player.play().unwrap();
        scheduler.advance(16.0);
        scheduler.advance(16.0);
        assert_eq!(*times.borrow(), vec![0.0, 16.0, 32.0]);
    }
}
