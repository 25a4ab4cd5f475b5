//! Rainbow colour cycle
//!
//! The cycle is paced by main-loop iterations, not by a timer. Each call to
//! [`Rainbow::tick`] counts one iteration, so the real period stretches with
//! whatever else the loop does (echoing, replies) and is only roughly stable.

use crate::led::Color;

/// Loop iterations between two colour steps
pub const DEFAULT_INTERVAL: u32 = 300_000;

/// Cycle order: every mix of one or two channels
pub const CYCLE: [Color; 6] = [
    Color::Red,
    Color::Yellow,
    Color::Green,
    Color::Cyan,
    Color::Blue,
    Color::Magenta,
];

/// Position in the colour cycle and the iteration count pacing it
pub struct Rainbow {
    step: usize,
    iterations: u32,
    last_trigger: u32,
    interval: u32,
}

impl Rainbow {
    /// Cycle stepping every `interval` iterations
    pub fn new(interval: u32) -> Self {
        Rainbow {
            step: 0,
            iterations: 0,
            last_trigger: 0,
            interval,
        }
    }

    /// Restarts the cycle at red
    pub fn start(&mut self) -> Color {
        self.step = 0;
        self.last_trigger = self.iterations;
        CYCLE[0]
    }

    /// Counts one loop iteration; returns the new colour when a step is due
    pub fn tick(&mut self) -> Option<Color> {
        self.iterations = self.iterations.wrapping_add(1);
        if self.iterations.wrapping_sub(self.last_trigger) >= self.interval {
            Some(self.advance())
        } else {
            None
        }
    }

    /// Moves to the next colour immediately
    pub fn advance(&mut self) -> Color {
        self.step = (self.step + 1) % CYCLE.len();
        self.last_trigger = self.iterations;
        log::trace!("rainbow step {}: {:?}", self.step, CYCLE[self.step]);
        CYCLE[self.step]
    }

    /// Index into [`CYCLE`]
    pub fn step(&self) -> usize {
        self.step
    }

    /// Colour of the current step
    pub fn color(&self) -> Color {
        CYCLE[self.step]
    }

    /// Iterations per step
    pub fn interval(&self) -> u32 {
        self.interval
    }
}

impl Default for Rainbow {
    fn default() -> Self {
        Rainbow::new(DEFAULT_INTERVAL)
    }
}
