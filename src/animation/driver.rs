use serde::{Deserialize, Serialize};

use super::keyframe::{Phase, Pose, PourAnimation, PourTimeline};

/// Where the pour clock currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackStatus {
    /// Never started.
    Idle,
    Playing,
    Paused,
    Stopped,
    /// Halted after a requested completion reached its hold-reset boundary.
    Completed,
}

/// Clock and flags of the pour driver.
///
/// Every operation consumes the state and returns the next one, so the
/// driver can be exercised without any frame scheduler. Timestamps are
/// milliseconds on the host's monotonic clock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    timeline: PourTimeline,
    status: PlaybackStatus,
    /// Host timestamp at which elapsed time was zero. Only meaningful while playing.
    origin: f64,
    /// Elapsed time at the last update, or the frozen value when not playing.
    elapsed: f64,
    /// Elapsed time at which a requested completion takes effect.
    completion_at: Option<f64>,
}

/// Result of one per-frame update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameSample {
    /// Normalized time in `[0, animation_duration)`.
    pub passed_time: f64,
    pub phase: Phase,
    pub pose: Pose,
    pub status: PlaybackStatus,
}

impl FrameSample {
    /// Whether the frame loop should schedule another iteration.
    pub fn keep_running(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }
}

impl AnimationState {
    pub fn new(timeline: PourTimeline) -> Self {
        Self {
            timeline,
            status: PlaybackStatus::Idle,
            origin: 0.0,
            elapsed: 0.0,
            completion_at: None,
        }
    }

    pub fn timeline(&self) -> PourTimeline {
        self.timeline
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn is_completed(&self) -> bool {
        self.status == PlaybackStatus::Completed
    }

    pub fn completion_pending(&self) -> bool {
        self.completion_at.is_some()
    }

    /// Normalized elapsed time as of the last update.
    pub fn passed_time(&self) -> f64 {
        self.timeline.normalize(self.elapsed)
    }

    /// Begins a fresh cycle at `now`, clearing any stop or completion.
    #[must_use]
    pub fn start(self, now: f64) -> Self {
        Self {
            status: PlaybackStatus::Playing,
            origin: now,
            elapsed: 0.0,
            completion_at: None,
            ..self
        }
    }

    /// Freezes the clock at the elapsed time observed at `now`.
    #[must_use]
    pub fn pause(self, now: f64) -> Self {
        match self.status {
            PlaybackStatus::Completed => self,
            PlaybackStatus::Playing => Self {
                status: PlaybackStatus::Paused,
                elapsed: self.elapsed_at(now),
                ..self
            },
            _ => Self {
                status: PlaybackStatus::Paused,
                ..self
            },
        }
    }

    /// Continues from the frozen elapsed time, excluding the time spent paused.
    #[must_use]
    pub fn resume(self, now: f64) -> Self {
        match self.status {
            PlaybackStatus::Completed | PlaybackStatus::Playing => self,
            _ => Self {
                status: PlaybackStatus::Playing,
                origin: now - self.elapsed,
                ..self
            },
        }
    }

    /// Halts playback and rewinds to the beginning of the cycle.
    #[must_use]
    pub fn stop(self) -> Self {
        Self {
            status: PlaybackStatus::Stopped,
            elapsed: 0.0,
            completion_at: None,
            ..self
        }
    }

    /// Lets the current cycle run until its hold-reset window, then halts.
    ///
    /// The boundary is taken from the last observed elapsed time, so a pour
    /// in progress is never cut short.
    #[must_use]
    pub fn request_completion(self) -> Self {
        if self.is_completed() || self.completion_at.is_some() {
            return self;
        }
        Self {
            completion_at: Some(self.timeline.next_reset_boundary(self.elapsed)),
            ..self
        }
    }

    /// Parks the clock at `time` as if paused there.
    #[must_use]
    pub fn scrub(self, time: f64) -> Self {
        let elapsed = self.timeline.normalize(time.max(0.0));
        let completion_at = self
            .completion_at
            .map(|_| self.timeline.next_reset_boundary(elapsed));
        Self {
            status: PlaybackStatus::Paused,
            elapsed,
            completion_at,
            ..self
        }
    }

    /// Advances the clock to `now` without sampling a pose.
    ///
    /// Only a playing clock moves. Calling this repeatedly with the same
    /// timestamp leaves the state unchanged after the first call.
    #[must_use]
    pub fn advance(self, now: f64) -> Self {
        if !self.is_playing() {
            return self;
        }
        let elapsed = self.elapsed_at(now);
        match self.completion_at {
            Some(deadline) if elapsed >= deadline => Self {
                status: PlaybackStatus::Completed,
                elapsed: 0.0,
                completion_at: None,
                ..self
            },
            _ => Self { elapsed, ..self },
        }
    }

    /// Evaluates the pose for the current clock value.
    pub fn sample(&self, animation: &PourAnimation) -> FrameSample {
        let passed_time = self.passed_time();
        let (phase, pose) = animation.sample_phase(passed_time);
        FrameSample {
            passed_time,
            phase,
            pose,
            status: self.status,
        }
    }

    /// The per-frame update: advance to `now`, then sample.
    #[must_use]
    pub fn update(self, now: f64, animation: &PourAnimation) -> (Self, FrameSample) {
        let next = self.advance(now);
        let frame = next.sample(animation);
        (next, frame)
    }

    // Frame timestamps may precede the instant playback was started by up to
    // one frame; those clamp to zero instead of wrapping to the cycle's end.
    fn elapsed_at(&self, now: f64) -> f64 {
        (now - self.origin).max(0.0)
    }
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::new(PourTimeline::default())
    }
}
