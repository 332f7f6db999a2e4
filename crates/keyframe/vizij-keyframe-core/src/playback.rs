//! Playback driver: fixed-period ticks, loop/stop policy at the path ends.
//!
//! The host owns the actual timer. It either attaches a [`PlaybackTimer`] and calls
//! [`Interpolator::tick`] whenever that timer fires, or feeds elapsed wall time to
//! [`Interpolator::advance`], which fires one tick per whole period.

use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::events::InterpolatorEvent;
use crate::interpolator::Interpolator;

/// Playback state of an interpolator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Running,
}

impl PlaybackState {
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Running => "running",
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }
}

/// Host periodic-callback facility.
///
/// `start` arms a recurring callback every `period_ms` milliseconds that must end up
/// calling [`Interpolator::tick`]; `stop` cancels it.
pub trait PlaybackTimer {
    fn start(&mut self, period_ms: u32);
    fn stop(&mut self);
}

impl Interpolator {
    /// Attach (or detach) the host timer armed by `start_interpolation`.
    pub fn set_timer(&mut self, timer: Option<Box<dyn PlaybackTimer>>) {
        if let Some(old) = self.timer.as_mut() {
            if self.state.is_running() {
                old.stop();
            }
        }
        self.timer = timer;
        if self.state.is_running() {
            let period = self.period_ms;
            if let Some(t) = self.timer.as_mut() {
                t.start(period);
            }
        }
    }

    #[inline]
    pub fn playback_state(&self) -> PlaybackState {
        self.state
    }

    #[inline]
    pub fn interpolation_is_started(&self) -> bool {
        self.state.is_running()
    }

    /// Start playing from the current time.
    ///
    /// `period_ms`, when given, replaces the tick period. If the current time is
    /// already at or past the end in the direction of play, playback restarts from
    /// the opposite end. Does nothing on an empty path. Performs one tick immediately.
    pub fn start_interpolation(&mut self, period_ms: Option<u32>) {
        if let Some(period) = period_ms {
            self.period_ms = period;
        }
        if self.keyframes.is_empty() {
            return;
        }

        if self.speed > 0.0 && self.interpolation_time >= self.last_time() {
            self.interpolation_time = self.first_time();
        }
        if self.speed < 0.0 && self.interpolation_time <= self.first_time() {
            self.interpolation_time = self.last_time();
        }

        self.state = PlaybackState::Running;
        self.tick_accumulator_ms = 0.0;
        let period = self.period_ms;
        if let Some(timer) = self.timer.as_mut() {
            timer.start(period);
        }
        debug!(
            "playback started at t={} (period {} ms, speed {})",
            self.interpolation_time, self.period_ms, self.speed
        );
        self.tick();
    }

    /// Stop playing; the current time is kept.
    pub fn stop_interpolation(&mut self) {
        if !self.state.is_running() {
            return;
        }
        if let Some(timer) = self.timer.as_mut() {
            timer.stop();
        }
        self.state = PlaybackState::Stopped;
        self.tick_accumulator_ms = 0.0;
        debug!("playback stopped at t={}", self.interpolation_time);
    }

    /// Stop and rewind to the first keyframe. The target is not moved.
    pub fn reset_interpolation(&mut self) {
        self.stop_interpolation();
        self.interpolation_time = self.first_time();
    }

    pub fn toggle_interpolation(&mut self) {
        if self.state.is_running() {
            self.stop_interpolation();
        } else {
            self.start_interpolation(None);
        }
    }

    /// One playback step: evaluate at the current time, then advance it by
    /// `speed * period`. Crossing a path end wraps (looping) or clamps to the end
    /// keyframe and stops; both emit [`InterpolatorEvent::EndReached`].
    ///
    /// Ticks delivered while stopped are ignored.
    pub fn tick(&mut self) {
        if !self.state.is_running() {
            return;
        }

        let time = self.interpolation_time;
        self.evaluate_at(time);

        self.interpolation_time += self.speed * f64::from(self.period_ms) / 1000.0;

        let first = self.first_time();
        let last = self.last_time();
        let looped = self.loop_interpolation;

        if self.interpolation_time > last {
            if looped {
                self.interpolation_time = first + self.interpolation_time - last;
            } else {
                self.evaluate_at(last);
                self.stop_interpolation();
            }
        } else if self.interpolation_time < first {
            if looped {
                self.interpolation_time = last - first + self.interpolation_time;
            } else {
                self.evaluate_at(first);
                self.stop_interpolation();
            }
        } else {
            return;
        }

        let time = self.interpolation_time;
        self.emit(InterpolatorEvent::EndReached { time, looped });
    }

    /// Feed elapsed host time; fires one tick per whole period while running and
    /// returns how many ticks fired. A zero period is treated as one millisecond.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        if !self.state.is_running() {
            return 0;
        }
        self.tick_accumulator_ms += elapsed.as_nanos() as f64 / 1_000_000.0;
        let period = f64::from(self.period_ms.max(1));

        let mut fired = 0;
        while self.state.is_running() && self.tick_accumulator_ms >= period {
            self.tick_accumulator_ms -= period;
            self.tick();
            fired += 1;
        }
        fired
    }

    // ----- parameters -----

    #[inline]
    pub fn interpolation_speed(&self) -> f64 {
        self.speed
    }

    /// Negative speeds play backwards. Takes effect on the next tick.
    #[inline]
    pub fn set_interpolation_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    #[inline]
    pub fn interpolation_period(&self) -> u32 {
        self.period_ms
    }

    /// Tick period in milliseconds. A running timer keeps its old period until restarted.
    #[inline]
    pub fn set_interpolation_period(&mut self, period_ms: u32) {
        self.period_ms = period_ms;
    }

    #[inline]
    pub fn loop_interpolation(&self) -> bool {
        self.loop_interpolation
    }

    #[inline]
    pub fn set_loop_interpolation(&mut self, looped: bool) {
        self.loop_interpolation = looped;
    }

    /// Reserved: persisted, but the path math does not wrap around.
    #[inline]
    pub fn closed_path(&self) -> bool {
        self.closed_path
    }

    #[inline]
    pub fn set_closed_path(&mut self, closed: bool) {
        self.closed_path = closed;
    }
}
