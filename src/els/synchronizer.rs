// SPDX-License-Identifier: GPL-3.0-or-later

//! Synchronizer: the electronic-gearing ISR.
//!
//! A tiny, fixed-rate ISR body that reads one hardware counter and calls
//! `StepGenerator::move_relative`. Travel accumulates in a signed
//! fractional-step accumulator so the whole-step remainder is never lost
//! across ticks, keeping long-run gearing ratios exact.

use crate::els::encoder_capture::wrapping_delta;
use crate::els::gearing::MotionConfig;
use crate::els::step_generator::StepGenerator;
use crate::fault::Fault;

/// Everything the Synchronizer's ISR needs from `MotionConfig`, already
/// reduced to the one ratio it actually uses tick-to-tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GearingConfig {
    pub steps_per_encoder_tick: f64,
    pub update_freq_hz: u32,
}

impl GearingConfig {
    pub fn from_motion_config(cfg: &MotionConfig) -> Self {
        Self {
            steps_per_encoder_tick: crate::els::gearing::steps_per_encoder_tick(cfg),
            update_freq_hz: cfg.sync_frequency_hz,
        }
    }
}

pub struct Synchronizer {
    config: GearingConfig,
    enabled: bool,
    initialized: bool,
    fractional_steps: f64,
    last_count: i32,
}

impl Synchronizer {
    pub fn new() -> Self {
        Self {
            config: GearingConfig {
                steps_per_encoder_tick: 0.0,
                update_freq_hz: crate::consts::synchronizer::UPDATE_FREQ_HZ_DEFAULT,
            },
            enabled: false,
            initialized: false,
            fractional_steps: 0.0,
            last_count: 0,
        }
    }

    /// Allocates the sync timer at `config.update_freq_hz` (the timer is
    /// created paused; actual hardware allocation happens in the
    /// `drivers` glue this type is composed into). Idempotent.
    pub fn begin(&mut self, config: GearingConfig) -> Result<(), Fault> {
        if config.update_freq_hz < crate::consts::synchronizer::UPDATE_FREQ_HZ_MIN
            || config.update_freq_hz > crate::consts::synchronizer::UPDATE_FREQ_HZ_MAX
        {
            return Err(Fault::sync_init("update frequency out of range"));
        }
        self.config = config;
        self.initialized = true;
        Ok(())
    }

    /// Updates steps-per-tick and, if currently running, retimes the ISR:
    /// pause, reset the accumulator and last-count, reprogram, re-enable.
    /// Atomic from the caller's standpoint.
    pub fn set_config(&mut self, config: GearingConfig, current_encoder_count: i32) -> Result<(), Fault> {
        if config.update_freq_hz < crate::consts::synchronizer::UPDATE_FREQ_HZ_MIN
            || config.update_freq_hz > crate::consts::synchronizer::UPDATE_FREQ_HZ_MAX
        {
            return Err(Fault::sync_init("update frequency out of range"));
        }
        let was_enabled = self.enabled;
        if was_enabled {
            self.enabled = false;
        }
        self.config = config;
        self.fractional_steps = 0.0;
        self.last_count = current_encoder_count;
        if was_enabled {
            self.enabled = true;
        }
        Ok(())
    }

    /// Starts/stops the ISR. On enable, resets the fractional accumulator
    /// and seeds `last_count` from the live encoder count.
    pub fn enable(&mut self, on: bool, current_encoder_count: i32) {
        if on {
            self.fractional_steps = 0.0;
            self.last_count = current_encoder_count;
        }
        self.enabled = on;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn steps_per_encoder_tick(&self) -> f64 {
        self.config.steps_per_encoder_tick
    }

    /// Runs one ISR tick: reads `enc.count()`, accumulates, and calls
    /// `step.move_relative` when a whole step is due. No-op unless enabled
    /// and initialized.
    pub fn tick(&mut self, current_encoder_count: i32, step: &mut StepGenerator) {
        if !self.enabled || !self.initialized {
            return;
        }

        let now = current_encoder_count;
        let delta = wrapping_delta(now as u32, self.last_count as u32);
        if delta == 0 {
            self.last_count = now;
            return;
        }

        self.fractional_steps += (delta as f64) * self.config.steps_per_encoder_tick;
        let whole = self.fractional_steps.round() as i32;
        if whole != 0 {
            step.move_relative(whole);
            self.fractional_steps -= whole as f64;
        }
        self.last_count = now;
    }
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gearing(steps_per_tick: f64) -> GearingConfig {
        GearingConfig {
            steps_per_encoder_tick: steps_per_tick,
            update_freq_hz: 10_000,
        }
    }

    // One full revolution (4096 quadrature ticks) at
    // steps_per_encoder_tick=0.09765625 must move exactly 400 steps.
    #[test]
    fn scenario_s1_one_revolution_moves_400_steps() {
        let mut sync = Synchronizer::new();
        sync.begin(gearing(0.097_656_25)).unwrap();
        let mut step = StepGenerator::new(10_000);
        step.enable();
        sync.enable(true, 0);

        let mut count = 0i32;
        let mut now = 0u64;
        for _ in 0..4096 {
            count = count.wrapping_add(1);
            sync.tick(count, &mut step);
        }
        // Drain any outstanding pulses.
        for t in 0..20_000u64 {
            step.tick(t);
            now = t;
        }
        let _ = now;
        assert_eq!(step.status().target, 400);
    }

    #[test]
    fn disabled_synchronizer_does_not_move_stepper() {
        let mut sync = Synchronizer::new();
        sync.begin(gearing(1.0)).unwrap();
        let mut step = StepGenerator::new(10_000);
        step.enable();
        // Not enabled.
        sync.tick(100, &mut step);
        assert_eq!(step.status().target, 0);
    }

    #[test]
    fn no_delta_leaves_accumulator_untouched() {
        let mut sync = Synchronizer::new();
        sync.begin(gearing(0.5)).unwrap();
        let mut step = StepGenerator::new(10_000);
        step.enable();
        sync.enable(true, 1000);
        sync.tick(1000, &mut step);
        assert_eq!(step.status().target, 0);
        assert_eq!(sync.fractional_steps, 0.0);
    }

    // Counter wraps through the u32 boundary while the Synchronizer is
    // live; travel must still be computed correctly.
    #[test]
    fn scenario_s4_handles_encoder_wrap() {
        let mut sync = Synchronizer::new();
        sync.begin(gearing(1.0)).unwrap();
        let mut step = StepGenerator::new(10_000);
        step.enable();
        let start: u32 = u32::MAX - 4;
        sync.enable(true, start as i32);

        let mut count = start;
        for _ in 0..10 {
            count = count.wrapping_add(1);
            sync.tick(count as i32, &mut step);
        }
        assert_eq!(step.status().target, 10);
    }

    // Flipping feed direction flips the sign of steps_per_encoder_tick
    // and the resulting travel direction.
    #[test]
    fn scenario_s3_feed_direction_flip_reverses_travel_sign() {
        let mut sync = Synchronizer::new();
        sync.begin(gearing(0.5)).unwrap();
        let mut step = StepGenerator::new(10_000);
        step.enable();
        sync.enable(true, 0);
        sync.tick(2, &mut step);
        assert_eq!(step.status().target, 1);

        // set_config with a negated ratio, as MotionCoordinator::set_feed_direction does.
        sync.set_config(gearing(-0.5), 2).unwrap();
        sync.enable(true, 2);
        sync.tick(4, &mut step);
        assert_eq!(step.status().target, 0);
    }

    #[test]
    fn set_config_resets_accumulator_and_reseeds_last_count() {
        let mut sync = Synchronizer::new();
        sync.begin(gearing(0.3)).unwrap();
        let mut step = StepGenerator::new(10_000);
        step.enable();
        sync.enable(true, 0);
        sync.tick(1, &mut step); // fractional_steps = 0.3, no whole step yet.
        assert!(sync.fractional_steps > 0.0);

        sync.set_config(gearing(0.3), 50).unwrap();
        assert_eq!(sync.fractional_steps, 0.0);
        assert_eq!(sync.last_count, 50);
        assert!(sync.is_enabled());
    }

    #[test]
    fn begin_rejects_out_of_range_update_frequency() {
        let mut sync = Synchronizer::new();
        let bad = GearingConfig {
            steps_per_encoder_tick: 1.0,
            update_freq_hz: 1,
        };
        assert!(sync.begin(bad).is_err());
    }
}
