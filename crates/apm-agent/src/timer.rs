// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Duration measurement with an explicit start/stop state machine.

use std::time::{Duration, Instant, SystemTime};

use crate::error::TimerError;

/// Measures the duration of a unit of work.
///
/// A timer moves from unstarted to started to stopped. Once stopped, the
/// duration is fixed; measuring again requires a new timer.
#[derive(Debug, Clone, Default)]
pub struct Timer {
    started_at: Option<Instant>,
    stopped_at: Option<Instant>,
}

impl Timer {
    /// Creates a timer, optionally backdated to a wall-clock start time.
    ///
    /// A timer created with a start time is already running and rejects
    /// [`Timer::start`].
    pub fn new(start: Option<SystemTime>) -> Self {
        Timer {
            started_at: start.map(instant_from_system_time),
            stopped_at: None,
        }
    }

    pub fn start(&mut self) -> Result<(), TimerError> {
        if self.started_at.is_some() {
            return Err(TimerError::AlreadyRunning);
        }
        self.started_at = Some(Instant::now());
        Ok(())
    }

    /// Stops the timer. Stopping twice overwrites the first stop.
    pub fn stop(&mut self) -> Result<(), TimerError> {
        if self.started_at.is_none() {
            return Err(TimerError::NotStarted);
        }
        self.stopped_at = Some(Instant::now());
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped_at.is_some()
    }

    /// Duration between start and stop, in microseconds.
    pub fn duration(&self) -> Result<f64, TimerError> {
        self.stopped_span().map(to_micros)
    }

    /// Duration between start and stop, in milliseconds.
    pub fn duration_ms(&self) -> Result<f64, TimerError> {
        self.stopped_span().map(to_millis)
    }

    /// Time since start in microseconds, or the final duration once stopped.
    pub fn elapsed(&self) -> Result<f64, TimerError> {
        self.running_span().map(to_micros)
    }

    /// Time since start in milliseconds, or the final duration once stopped.
    pub fn elapsed_ms(&self) -> Result<f64, TimerError> {
        self.running_span().map(to_millis)
    }

    fn stopped_span(&self) -> Result<Duration, TimerError> {
        match (self.started_at, self.stopped_at) {
            (Some(started), Some(stopped)) => Ok(stopped.saturating_duration_since(started)),
            (None, _) => Err(TimerError::NotStarted),
            (Some(_), None) => Err(TimerError::NotStopped),
        }
    }

    fn running_span(&self) -> Result<Duration, TimerError> {
        let started = self.started_at.ok_or(TimerError::NotStarted)?;
        match self.stopped_at {
            Some(stopped) => Ok(stopped.saturating_duration_since(started)),
            None => Ok(started.elapsed()),
        }
    }
}

/// Maps a wall-clock instant onto the monotonic clock.
fn instant_from_system_time(start: SystemTime) -> Instant {
    let now = Instant::now();
    match SystemTime::now().duration_since(start) {
        Ok(ago) => now.checked_sub(ago).unwrap_or(now),
        // start lies in the future
        Err(err) => now.checked_add(err.duration()).unwrap_or(now),
    }
}

fn to_micros(span: Duration) -> f64 {
    span.as_secs_f64() * 1_000_000.0
}

fn to_millis(span: Duration) -> f64 {
    span.as_secs_f64() * 1_000.0
}
