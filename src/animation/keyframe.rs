use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::SceneError;

/// Linear interpolation between two scalars. `fraction` is not clamped.
pub fn lerp(start: f32, end: f32, fraction: f32) -> f32 {
    start + (end - start) * fraction
}

fn lerp_vec3(start: Vec3, end: Vec3, fraction: f32) -> Vec3 {
    Vec3::new(
        lerp(start.x, end.x, fraction),
        lerp(start.y, end.y, fraction),
        lerp(start.z, end.z, fraction),
    )
}

/// Translation and rotation (degrees) written onto an animated shape.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Vec3,
}

impl Pose {
    pub const fn new(translation: Vec3, rotation: Vec3) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Interpolates each of the six components independently.
    pub fn lerp(&self, end: &Pose, fraction: f32) -> Pose {
        Pose {
            translation: lerp_vec3(self.translation, end.translation, fraction),
            rotation: lerp_vec3(self.rotation, end.rotation, fraction),
        }
    }
}

/// The two poses a pour blends between.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PourKeyframes {
    pub start: Pose,
    pub end: Pose,
}

impl Default for PourKeyframes {
    /// Tilts the default teapot 30 degrees about z while lifting it 5 units.
    fn default() -> Self {
        Self {
            start: Pose::new(Vec3::new(-20.0, 0.0, 5.0), Vec3::new(0.0, 0.0, 180.0)),
            end: Pose::new(Vec3::new(-20.0, 5.0, 5.0), Vec3::new(0.0, 0.0, 210.0)),
        }
    }
}

/// Durations, in milliseconds, of the pour and of the holds between pours.
///
/// One cycle is pour-out, hold, pour-back, hold, so the cycle length is
/// `2 * (pour + pause)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeline")]
pub struct PourTimeline {
    pour_duration: f64,
    pause_duration: f64,
}

#[derive(Deserialize)]
struct RawTimeline {
    pour_duration: f64,
    pause_duration: f64,
}

impl TryFrom<RawTimeline> for PourTimeline {
    type Error = SceneError;

    fn try_from(raw: RawTimeline) -> Result<Self, Self::Error> {
        Self::new(raw.pour_duration, raw.pause_duration)
    }
}

impl PourTimeline {
    pub const DEFAULT_POUR_DURATION: f64 = 1000.0;
    pub const DEFAULT_PAUSE_DURATION: f64 = 2000.0;

    /// `pour_duration` must be positive and `pause_duration` non-negative.
    pub fn new(pour_duration: f64, pause_duration: f64) -> Result<Self, SceneError> {
        if !pour_duration.is_finite() || pour_duration <= 0.0 {
            return Err(SceneError::InvalidDuration {
                name: "pour_duration",
                value: pour_duration,
            });
        }
        if !pause_duration.is_finite() || pause_duration < 0.0 {
            return Err(SceneError::InvalidDuration {
                name: "pause_duration",
                value: pause_duration,
            });
        }
        Ok(Self {
            pour_duration,
            pause_duration,
        })
    }

    pub fn pour_duration(&self) -> f64 {
        self.pour_duration
    }

    pub fn pause_duration(&self) -> f64 {
        self.pause_duration
    }

    pub fn animation_duration(&self) -> f64 {
        2.0 * (self.pour_duration + self.pause_duration)
    }

    /// Start of the hold that ends a cycle, relative to the cycle start.
    pub fn reset_hold_start(&self) -> f64 {
        self.animation_duration() - self.pause_duration
    }

    /// Folds any elapsed time into `[0, animation_duration)`.
    pub fn normalize(&self, elapsed: f64) -> f64 {
        let normalized = elapsed.rem_euclid(self.animation_duration());
        // rem_euclid can round up to the modulus for tiny negative inputs.
        if normalized >= self.animation_duration() {
            0.0
        } else {
            normalized
        }
    }

    /// Elapsed time at which the hold-reset window of the cycle containing
    /// `elapsed` begins, or `elapsed` itself when it already lies inside it.
    pub fn next_reset_boundary(&self, elapsed: f64) -> f64 {
        let elapsed = elapsed.max(0.0);
        let passed = self.normalize(elapsed);
        if passed >= self.reset_hold_start() {
            elapsed
        } else {
            elapsed - passed + self.reset_hold_start()
        }
    }

    /// Classifies a normalized time and returns the interpolation fraction
    /// towards the end pose.
    pub fn phase_at(&self, passed_time: f64) -> (Phase, f32) {
        let pour = self.pour_duration;
        let pause = self.pause_duration;
        let reset = self.reset_hold_start();
        if passed_time < pour {
            (Phase::PourOut, (passed_time / pour) as f32)
        } else if passed_time < pour + pause {
            (Phase::HoldPoured, 1.0)
        } else if passed_time < reset {
            (Phase::PourBack, ((reset - passed_time) / pour) as f32)
        } else {
            (Phase::HoldReset, 0.0)
        }
    }
}

impl Default for PourTimeline {
    fn default() -> Self {
        Self {
            pour_duration: Self::DEFAULT_POUR_DURATION,
            pause_duration: Self::DEFAULT_PAUSE_DURATION,
        }
    }
}

/// The four windows of a pour cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    PourOut,
    HoldPoured,
    PourBack,
    HoldReset,
}

/// A complete pour definition: keyframes plus timing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PourAnimation {
    pub keyframes: PourKeyframes,
    pub timeline: PourTimeline,
}

impl PourAnimation {
    pub fn new(keyframes: PourKeyframes, timeline: PourTimeline) -> Self {
        Self {
            keyframes,
            timeline,
        }
    }

    /// Pose at an arbitrary elapsed time; the time is normalized first.
    pub fn sample(&self, elapsed: f64) -> Pose {
        self.sample_phase(elapsed).1
    }

    pub fn sample_phase(&self, elapsed: f64) -> (Phase, Pose) {
        let passed = self.timeline.normalize(elapsed);
        let (phase, fraction) = self.timeline.phase_at(passed);
        let PourKeyframes { start, end } = self.keyframes;
        let pose = match phase {
            Phase::HoldPoured => end,
            Phase::HoldReset => start,
            Phase::PourOut | Phase::PourBack => start.lerp(&end, fraction),
        };
        (phase, pose)
    }
}
