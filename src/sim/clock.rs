//! Simulation clock and per-run telemetry

/// Phase of the simulation clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockPhase {
    /// Editing: placement, deletion and history are allowed
    Stopped,
    /// The world is advancing
    Running,
}

/// Run/pause/slow-motion state.
///
/// Pausing zeroes the time multiplier instead of stopping the loop, and
/// remembers slow motion so resuming restores it.
#[derive(Debug, Clone)]
pub struct SimClock {
    phase: ClockPhase,
    paused: bool,
    slow_motion: bool,
    slow_factor: f32,
    accumulator: f32,
}

impl SimClock {
    pub fn new(slow_factor: f32) -> Self {
        Self {
            phase: ClockPhase::Stopped,
            paused: false,
            slow_motion: false,
            slow_factor,
            accumulator: 0.0,
        }
    }

    pub fn start(&mut self) {
        self.phase = ClockPhase::Running;
        self.paused = false;
        self.accumulator = 0.0;
    }

    /// Stop advancing. Slow motion is kept as a preference for the next run.
    pub fn stop(&mut self) {
        self.phase = ClockPhase::Stopped;
        self.paused = false;
        self.accumulator = 0.0;
    }

    pub fn is_running(&self) -> bool {
        self.phase == ClockPhase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_slow_motion(&self) -> bool {
        self.slow_motion
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn toggle_slow_motion(&mut self) -> bool {
        self.slow_motion = !self.slow_motion;
        self.slow_motion
    }

    /// Multiplier applied to wall time while running
    pub fn time_scale(&self) -> f32 {
        if self.paused {
            0.0
        } else if self.slow_motion {
            self.slow_factor
        } else {
            1.0
        }
    }

    /// Bank scaled frame time and return how many fixed steps are due
    pub fn accumulate(&mut self, frame_dt: f32, step_dt: f32, max_steps: u32) -> u32 {
        if !self.is_running() {
            return 0;
        }
        self.accumulator += frame_dt * self.time_scale();

        let mut steps = 0;
        while self.accumulator >= step_dt && steps < max_steps {
            self.accumulator -= step_dt;
            steps += 1;
        }
        // Drop what could not be caught up on
        if steps == max_steps {
            self.accumulator = self.accumulator.min(step_dt);
        }
        steps
    }
}

/// Counters for the current run, reset whenever a run starts
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Telemetry {
    /// Wall time since the run started, pauses included
    pub elapsed: f32,
    /// `elapsed` at the moment the target was struck
    pub time_to_trigger: Option<f32>,
    /// Collision starts observed while running
    pub collisions: u32,
}

impl Telemetry {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn triggered(&self) -> bool {
        self.time_to_trigger.is_some()
    }
}
