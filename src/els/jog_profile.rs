// SPDX-License-Identifier: GPL-3.0-or-later

//! JogProfile: smooth continuous motion independent of the spindle.
//!
//! This is a thin sequencer over `StepGenerator::run_continuous`; all of
//! the actual speed-ramp math lives there. JogProfile's job is purely the
//! begin/retarget/end bookkeeping: capping requested speed, retargeting
//! in place if already jogging, and commanding a clean decel-to-stop on
//! end.

use crate::els::step_generator::StepGenerator;

pub struct JogProfile {
    active: bool,
    direction: bool,
    max_jog_speed_hz: f32,
    jog_accel_steps_per_s2: f32,
}

impl JogProfile {
    pub fn new(max_jog_speed_hz: f32, jog_accel_steps_per_s2: f32) -> Self {
        Self {
            active: false,
            direction: true,
            max_jog_speed_hz,
            jog_accel_steps_per_s2,
        }
    }

    pub fn set_max_jog_speed(&mut self, hz: f32) {
        self.max_jog_speed_hz = hz;
    }

    pub fn set_jog_accel(&mut self, steps_per_s2: f32) {
        self.jog_accel_steps_per_s2 = steps_per_s2;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// `speed_hz` is already converted from mm-per-minute by the caller
    /// (MotionCoordinator, through the same gearing math it uses for
    /// Threading/TurningFeed). Capped by `max_jog_speed`. Retargets in
    /// place, without a stop/restart, if jog is already active.
    pub fn begin_jog(&mut self, direction: bool, speed_hz: f32, step: &mut StepGenerator) {
        let capped = speed_hz.abs().min(self.max_jog_speed_hz);
        self.direction = direction;
        self.active = true;
        step.run_continuous(direction, capped, self.jog_accel_steps_per_s2);
    }

    /// Commands deceleration to zero; the step ISR stops itself once
    /// `current_hz` reaches zero. `active` drops immediately since,
    /// from the sequencer's perspective, the jog gesture has ended — the
    /// physical stepper continues decelerating on its own.
    pub fn end_jog(&mut self, step: &mut StepGenerator) {
        if !self.active {
            return;
        }
        step.run_continuous(self.direction, 0.0, self.jog_accel_steps_per_s2);
        self.active = false;
    }

    /// Retargets speed without stopping. New target is applied by the step
    /// ISR on its next evaluation.
    pub fn update_speed(&mut self, new_speed_hz: f32, step: &mut StepGenerator) {
        if !self.active {
            return;
        }
        let capped = new_speed_hz.abs().min(self.max_jog_speed_hz);
        step.run_continuous(self.direction, capped, self.jog_accel_steps_per_s2);
    }
}
