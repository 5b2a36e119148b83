// SPDX-License-Identifier: GPL-3.0-or-later

//! StepGenerator: step/dir/enable pulse generation.
//!
//! A three-state pulse ISR (`Idle` / `DirSetup` / `PulseHigh`) ticking at a
//! fixed pulse-timer rate, plus a continuous-speed overlay used only by
//! jogging. The ISR-tick function returns what to do with the physical pins
//! this tick, driven by a fixed-frequency hardware timer whose interrupt
//! handler is thin glue (see `drivers::pulse_timer`). Unlike a full
//! trapezoidal motion-profile recurrence, the discrete-move and
//! continuous-jog paths share one state machine rather than two.

use crate::fault::Fault;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InternalState {
    Idle,
    DirSetup,
    PulseHigh,
}

/// What the ISR should do with the physical pins this tick. The caller
/// (typically `drivers::stepper_pins::StepperPins::apply`) is responsible
/// for actually driving STEP/DIR/ENABLE from this; `StepGenerator` never
/// touches a GPIO itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PinCommand {
    /// True for exactly the one tick during which STEP should be driven
    /// HIGH; the ISR drives it LOW on every other tick.
    pub step_high: bool,
    /// `Some(direction)` the one tick DIR needs to change.
    pub dir_change: Option<bool>,
    /// `Some(level)` the one tick ENABLE needs to change, set by
    /// `enable()`/`disable()`/`emergency_stop()` and picked up on the next
    /// `tick()`.
    pub enable_level: Option<bool>,
}

impl PinCommand {
    const LOW: Self = Self {
        step_high: false,
        dir_change: None,
        enable_level: None,
    };
}

/// Snapshot of stepper state. `running ⇒ enabled` is maintained as an
/// invariant by construction: `running` is only ever set true from code
/// paths gated on `enabled`, except during `adjust_position`, which never
/// touches `running`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepperPosition {
    pub current: i32,
    pub target: i32,
    pub enabled: bool,
    pub running: bool,
    /// true = positive (away from chuck), false = negative (towards chuck).
    pub direction: bool,
}

struct ContinuousState {
    accel_steps_per_s2: f32,
    target_hz: f32,
    current_hz: f32,
    direction: bool,
    next_step_micros: u64,
}

pub struct StepGenerator {
    tick_period_s: f32,
    current: i32,
    target: i32,
    enabled: bool,
    running: bool,
    direction: bool,
    microsteps: u32,
    state: InternalState,
    continuous: Option<ContinuousState>,
    fault: Option<Fault>,
    /// Set by `enable()`/`disable()`/`emergency_stop()`, consumed by the
    /// next `tick()` and folded into its `PinCommand`. This is how an
    /// enabled-state transition reaches the physical ENABLE line: through
    /// the same caller-applies-it hand-off `tick()` already uses for
    /// STEP/DIR, not through a pin handle `StepGenerator` itself holds.
    enable_pending: Option<bool>,
}

impl StepGenerator {
    /// `pulse_timer_freq_hz` is the fixed frequency at which `tick()` will
    /// be called by the host ISR; must be <= `consts::stepper::PULSE_TIMER_MAX_FREQ_HZ`.
    pub fn new(pulse_timer_freq_hz: u32) -> Self {
        Self {
            tick_period_s: 1.0 / (pulse_timer_freq_hz as f32),
            current: 0,
            target: 0,
            enabled: false,
            running: false,
            direction: true,
            microsteps: 1,
            state: InternalState::Idle,
            continuous: None,
            fault: None,
            enable_pending: None,
        }
    }

    /// Asserts the ENABLE line on the next `tick()`.
    pub fn enable(&mut self) {
        if self.fault.is_some() {
            return;
        }
        self.enabled = true;
        self.enable_pending = Some(true);
    }

    /// Deasserts the ENABLE line on the next `tick()`.
    pub fn disable(&mut self) {
        self.stop();
        self.enabled = false;
        self.enable_pending = Some(false);
    }

    /// Advisory only — the physical driver is DIP-configured; this
    /// is recorded for upstream gearing math.
    pub fn set_microsteps(&mut self, n: u32) {
        self.microsteps = n;
    }

    pub fn microsteps(&self) -> u32 {
        self.microsteps
    }

    pub fn move_relative(&mut self, delta: i32) {
        if self.fault.is_some() {
            return;
        }
        self.target += delta;
        if delta != 0 && !self.running {
            self.running = true;
        }
    }

    pub fn set_absolute(&mut self, target: i32) {
        if self.fault.is_some() {
            return;
        }
        self.target = target;
        if self.target != self.current && !self.running {
            self.running = true;
        }
    }

    pub fn stop(&mut self) {
        self.running = false;
        self.continuous = None;
    }

    pub fn emergency_stop(&mut self) {
        self.stop();
        self.enabled = false;
        self.enable_pending = Some(false);
        self.fault = Some(Fault::estop("emergency stop commanded"));
    }

    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    pub fn status(&self) -> StepperPosition {
        StepperPosition {
            current: self.current,
            target: self.target,
            enabled: self.enabled,
            running: self.running,
            direction: self.direction,
        }
    }

    /// Enters continuous-speed mode, used by `JogProfile`. `target`
    /// is ignored while this mode is active; cadence is governed by the
    /// internal accel integrator instead.
    pub fn run_continuous(&mut self, direction: bool, speed_hz: f32, accel_steps_per_s2: f32) {
        if self.fault.is_some() || !self.enabled {
            return;
        }
        match &mut self.continuous {
            Some(c) => {
                c.target_hz = speed_hz.abs();
                c.accel_steps_per_s2 = accel_steps_per_s2;
                c.direction = direction;
            }
            None => {
                self.continuous = Some(ContinuousState {
                    accel_steps_per_s2,
                    target_hz: speed_hz.abs(),
                    current_hz: 0.0,
                    direction,
                    next_step_micros: 0,
                });
            }
        }
        self.running = true;
    }

    pub fn is_continuous(&self) -> bool {
        self.continuous.is_some()
    }

    pub fn continuous_hz(&self) -> f32 {
        self.continuous.as_ref().map(|c| c.current_hz).unwrap_or(0.0)
    }

    /// Re-bases `current`/`target` by `delta` without motion, e.g. after an
    /// origin redefinition.
    pub fn adjust_position(&mut self, delta: i32) {
        self.current += delta;
        self.target += delta;
    }

    /// Advances the pulse ISR state machine by one tick. Must be called at
    /// exactly the fixed pulse-timer frequency passed to `new()`. Also
    /// carries any pending ENABLE transition queued by `enable()`/
    /// `disable()`/`emergency_stop()` since the previous tick — the caller
    /// (`drivers::stepper_pins::StepperPins::apply`) must apply
    /// `cmd.enable_level` whenever it's `Some`, the same contract it
    /// already follows for `step_high`/`dir_change`.
    pub fn tick(&mut self, now_micros: u64) -> PinCommand {
        let enable_level = self.enable_pending.take();

        let mut cmd = if !self.enabled || self.fault.is_some() {
            self.running = false;
            PinCommand::LOW
        } else {
            match self.state {
                InternalState::DirSetup => {
                    self.state = InternalState::Idle;
                    PinCommand::LOW
                }
                InternalState::PulseHigh => {
                    self.current += if self.direction { 1 } else { -1 };
                    self.state = InternalState::Idle;
                    PinCommand::LOW
                }
                InternalState::Idle => self.tick_idle(now_micros),
            }
        };

        cmd.enable_level = enable_level;
        cmd
    }

    fn tick_idle(&mut self, now_micros: u64) -> PinCommand {
        let required_dir = match &mut self.continuous {
            Some(c) => {
                if !self.running {
                    return PinCommand::LOW;
                }

                if c.current_hz < c.target_hz {
                    c.current_hz = (c.current_hz + c.accel_steps_per_s2 * self.tick_period_s).min(c.target_hz);
                } else if c.current_hz > c.target_hz {
                    c.current_hz = (c.current_hz - c.accel_steps_per_s2 * self.tick_period_s).max(c.target_hz);
                }

                if c.current_hz <= 0.0 {
                    self.running = false;
                    self.continuous = None;
                    return PinCommand::LOW;
                }

                if now_micros >= c.next_step_micros {
                    let period_us = (1.0e6 / c.current_hz) as u64;
                    c.next_step_micros = c.next_step_micros.wrapping_add(period_us.max(1));
                    Some(c.direction)
                } else {
                    None
                }
            }
            None => {
                if !self.running {
                    None
                } else {
                    let delta = self.target - self.current;
                    if delta == 0 {
                        self.running = false;
                        None
                    } else {
                        Some(delta > 0)
                    }
                }
            }
        };

        match required_dir {
            None => PinCommand::LOW,
            Some(dir) if dir != self.direction => {
                self.direction = dir;
                self.state = InternalState::DirSetup;
                PinCommand {
                    step_high: false,
                    dir_change: Some(dir),
                    enable_level: None,
                }
            }
            Some(_) => {
                self.state = InternalState::PulseHigh;
                PinCommand {
                    step_high: true,
                    dir_change: None,
                    enable_level: None,
                }
            }
        }
    }
}
