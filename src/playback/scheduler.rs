use std::time::Duration;

use crate::foundation::config::delay_ms_for_fps;
use crate::foundation::core::POSE_COUNT;
use crate::foundation::error::PetResult;
use crate::geometry::placement::TransformState;
use crate::render::preview::PoseTarget;

/// Whether the preview animation is running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    /// No timer is live.
    #[default]
    Stopped,
    /// A repeating timer is live.
    Playing,
}

impl PlaybackState {
    /// Lowercase name for status output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Playing => "playing",
        }
    }
}

/// Identifies one repeating-timer subscription. A new handle is issued on every (re)start.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(u64);

#[derive(Clone, Copy, Debug)]
struct RepeatingTimer {
    handle: PlaybackHandle,
    interval: Duration,
    next_due: Duration,
}

// Backlog beyond this many ticks is dropped and the timer realigned to `now`.
const MAX_CATCH_UP: usize = POSE_COUNT;

/// Drives the preview at a fixed interval.
///
/// Time is supplied by the caller as a monotonic offset, so the scheduler works with any
/// host loop and can be driven deterministically in tests. At most one timer is live.
#[derive(Debug)]
pub struct AnimationScheduler {
    delay_ms: u32,
    timer: Option<RepeatingTimer>,
    next_handle: u64,
}

impl AnimationScheduler {
    /// A stopped scheduler ticking every `delay_ms` once started.
    pub fn new(delay_ms: u32) -> Self {
        Self {
            delay_ms: delay_ms.max(1),
            timer: None,
            next_handle: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> PlaybackState {
        if self.timer.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    /// Tick interval in milliseconds.
    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    /// Handle of the live timer, if playing.
    pub fn handle(&self) -> Option<PlaybackHandle> {
        self.timer.map(|t| t.handle)
    }

    /// When the next tick is due, if playing.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timer.map(|t| t.next_due)
    }

    /// Start ticking. No-op when already playing.
    pub fn play(&mut self, now: Duration) {
        if self.timer.is_some() {
            return;
        }
        self.start_timer(now);
        tracing::debug!(delay_ms = self.delay_ms, "playback started");
    }

    /// Cancel the timer (if any) and draw the current pose once.
    pub fn stop(&mut self, transform: &TransformState, target: &mut dyn PoseTarget) {
        if let Some(timer) = self.timer.take() {
            tracing::debug!(handle = timer.handle.0, "playback stopped");
        }
        target.render_pose(transform);
    }

    /// Play when stopped, stop when playing.
    pub fn toggle(
        &mut self,
        now: Duration,
        transform: &TransformState,
        target: &mut dyn PoseTarget,
    ) -> PlaybackState {
        match self.state() {
            PlaybackState::Playing => self.stop(transform, target),
            PlaybackState::Stopped => self.play(now),
        }
        self.state()
    }

    /// Stop if playing, move by `delta` poses with clamp-to-zero, and draw once.
    ///
    /// Playback is not resumed.
    pub fn seek(&mut self, delta: i64, transform: &mut TransformState, target: &mut dyn PoseTarget) {
        if self.timer.is_some() {
            self.stop(transform, target);
        }
        transform.current_pose = transform.current_pose.offset(delta);
        target.render_pose(transform);
    }

    /// Change the frame rate. A live timer is replaced by one at the new interval,
    /// keeping the current pose.
    pub fn set_rate(&mut self, fps: u32, now: Duration) -> PetResult<()> {
        self.delay_ms = delay_ms_for_fps(fps)?.max(1);
        if self.timer.take().is_some() {
            self.start_timer(now);
        }
        tracing::debug!(fps, delay_ms = self.delay_ms, "playback rate changed");
        Ok(())
    }

    /// Fire every tick due at `now`: draw the current pose, then advance it.
    ///
    /// Returns the number of ticks fired.
    pub fn tick(
        &mut self,
        now: Duration,
        transform: &mut TransformState,
        target: &mut dyn PoseTarget,
    ) -> usize {
        let mut fired = 0;
        while let Some(timer) = self.timer.as_mut() {
            if timer.next_due > now {
                break;
            }
            if fired == MAX_CATCH_UP {
                timer.next_due = now + timer.interval;
                tracing::warn!(dropped_after = fired, "preview fell behind; realigning timer");
                break;
            }
            timer.next_due += timer.interval;
            target.render_pose(transform);
            transform.current_pose = transform.current_pose.next();
            fired += 1;
        }
        fired
    }

    fn start_timer(&mut self, now: Duration) {
        let interval = Duration::from_millis(u64::from(self.delay_ms));
        self.next_handle += 1;
        self.timer = Some(RepeatingTimer {
            handle: PlaybackHandle(self.next_handle),
            interval,
            next_due: now + interval,
        });
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/scheduler.rs"]
mod tests;
