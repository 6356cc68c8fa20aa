//! Tick-loop runner.
//!
//! The runtime core performs no timing of its own; callers drive it by
//! invoking [`Metasystem::update`]. [`TickLoop`] is the standard driver: a
//! fixed-rate blocking loop that sleeps away the unused part of each tick
//! budget and warns when a tick overruns it.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::metasystem::Metasystem;

/// Configuration for the tick loop.
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Target ticks per second. Non-positive or non-finite values fall
    /// back to the default rate at run time.
    pub tick_rate: f64,
    /// Maximum number of ticks to run (0 = unlimited).
    pub max_ticks: u64,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
        }
    }
}

/// Drives a [`Metasystem`] at a fixed tick rate.
#[derive(Debug)]
pub struct TickLoop {
    metasystem: Metasystem,
    config: TickConfig,
}

impl TickLoop {
    /// Creates a tick loop around a metasystem.
    #[must_use]
    pub fn new(metasystem: Metasystem, config: TickConfig) -> Self {
        Self { metasystem, config }
    }

    /// Returns a reference to the driven metasystem.
    #[must_use]
    pub fn metasystem(&self) -> &Metasystem {
        &self.metasystem
    }

    /// Returns a mutable reference to the driven metasystem.
    pub fn metasystem_mut(&mut self) -> &mut Metasystem {
        &mut self.metasystem
    }

    /// Consumes the loop, returning the metasystem.
    #[must_use]
    pub fn into_inner(self) -> Metasystem {
        self.metasystem
    }

    /// Runs the loop for the configured number of ticks, or indefinitely.
    ///
    /// Blocking; each iteration runs one [`Metasystem::update`] and sleeps
    /// the remainder of the tick budget.
    pub fn run(&mut self) {
        // A non-positive or non-finite rate has no representable budget.
        let tick_rate = if self.config.tick_rate.is_finite() && self.config.tick_rate > 0.0 {
            self.config.tick_rate
        } else {
            warn!(
                tick_rate = self.config.tick_rate,
                "invalid tick rate, using default"
            );
            TickConfig::default().tick_rate
        };
        let tick_duration = Duration::from_secs_f64(1.0 / tick_rate);
        let mut tick_count = 0u64;

        info!(
            tick_rate,
            max_ticks = self.config.max_ticks,
            "starting tick loop"
        );

        loop {
            let start = Instant::now();

            self.metasystem.update();

            tick_count += 1;
            if self.config.max_ticks > 0 && tick_count >= self.config.max_ticks {
                info!(ticks = tick_count, "tick loop complete");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed < tick_duration {
                std::thread::sleep(tick_duration - elapsed);
            } else {
                warn!(
                    tick = self.metasystem.tick_id(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = tick_duration.as_millis() as u64,
                    "tick exceeded time budget"
                );
            }
        }
    }
}
