//! Keyframed pour animation.
//!
//! [`PourAnimation`] maps elapsed time to a pose, [`AnimationState`] is the
//! playback clock, and [`AnimationPlayer`] runs the two from a
//! [`FrameScheduler`], writing each pose into a [`PoseSink`].

mod driver;
mod keyframe;
mod player;
mod scheduler;

pub use driver::{AnimationState, FrameSample, PlaybackStatus};
pub use keyframe::{lerp, Phase, Pose, PourAnimation, PourKeyframes, PourTimeline};
pub use player::{AnimationPlayer, PoseSink};
pub use scheduler::{FrameCallback, FrameScheduler, ManualScheduler};
