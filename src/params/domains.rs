// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-domain parameter definitions and validators. Mirrors the organization of `consts.rs`: one module per
//! domain, defaults and range checks kept next to each other.

use crate::fault::Fault;

/// A single typed, validated, dirty-tracked parameter. Updates only set
/// the dirty bit when the value actually changes.
#[derive(Debug, Clone, Copy)]
pub struct Param<T: Copy + PartialEq> {
    value: T,
    dirty: bool,
    validator: fn(T) -> bool,
}

impl<T: Copy + PartialEq> Param<T> {
    pub const fn new(default: T, validator: fn(T) -> bool) -> Self {
        Self {
            value: default,
            dirty: false,
            validator,
        }
    }

    pub fn get(&self) -> T {
        self.value
    }

    pub fn set(&mut self, new_value: T) -> Result<(), Fault> {
        if !(self.validator)(new_value) {
            return Err(Fault::config_invalid("parameter value rejected by validator"));
        }
        if new_value != self.value {
            self.value = new_value;
            self.dirty = true;
        }
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

// Range-check helper functions need `fn` pointers (no captures) to keep
// `Param` a plain POD type with no closures/allocation, so each domain
// below spells its bound explicitly rather than reusing a closure
// factory.

fn valid_ppr(v: u32) -> bool {
    v >= crate::consts::encoder::PPR_MIN && v <= crate::consts::encoder::PPR_MAX
}
fn valid_filter_level(v: u8) -> bool {
    v <= crate::consts::encoder::FILTER_LEVEL_MAX
}
fn valid_bool(_: bool) -> bool {
    true
}
fn valid_microsteps(v: u32) -> bool {
    matches!(v, 1 | 2 | 4 | 8 | 16 | 32 | 64 | 128 | 256)
}
fn valid_max_speed_hz(v: u32) -> bool {
    v >= crate::consts::stepper::MAX_SPEED_HZ_MIN && v <= crate::consts::stepper::MAX_SPEED_HZ_MAX
}
fn valid_motor_native_steps(v: u32) -> bool {
    v >= crate::consts::stepper::MOTOR_NATIVE_STEPS_MIN && v <= crate::consts::stepper::MOTOR_NATIVE_STEPS_MAX
}
fn valid_teeth(v: u32) -> bool {
    v >= crate::consts::zaxis::TEETH_MIN && v <= crate::consts::zaxis::TEETH_MAX
}
fn valid_positive_f32(v: f32) -> bool {
    v > 0.0
}
fn valid_non_negative_f32(v: f32) -> bool {
    v >= 0.0
}
fn valid_jog_speed_index(v: u8) -> bool {
    v <= crate::consts::system::DEFAULT_JOG_SPEED_INDEX_MAX
}
fn valid_sync_freq(v: u32) -> bool {
    v >= crate::consts::synchronizer::UPDATE_FREQ_HZ_MIN && v <= crate::consts::synchronizer::UPDATE_FREQ_HZ_MAX
}
fn valid_rpm(v: u16) -> bool {
    v <= 10_000
}

pub struct EncoderParams {
    pub ppr: Param<u32>,
    pub filter_level: Param<u8>,
    pub invert_direction: Param<bool>,
}

impl EncoderParams {
    pub const fn defaults() -> Self {
        Self {
            ppr: Param::new(1024, valid_ppr),
            filter_level: Param::new(4, valid_filter_level),
            invert_direction: Param::new(false, valid_bool),
        }
    }
}

pub struct StepperParams {
    pub microsteps: Param<u32>,
    pub invert_enable: Param<bool>,
    pub max_speed_hz: Param<u32>,
    /// Motor full-steps per revolution, before microstepping is applied.
    /// Feeds `MotionConfig::motor_native_steps`, to which
    /// `steps_per_encoder_tick` is directly proportional.
    pub motor_native_steps: Param<u32>,
}

impl StepperParams {
    pub const fn defaults() -> Self {
        Self {
            microsteps: Param::new(8, valid_microsteps),
            invert_enable: Param::new(false, valid_bool),
            max_speed_hz: Param::new(50_000, valid_max_speed_hz),
            motor_native_steps: Param::new(200, valid_motor_native_steps),
        }
    }
}

pub struct ZAxisParams {
    pub motor_pulley_teeth: Param<u32>,
    pub leadscrew_pulley_teeth: Param<u32>,
    pub leadscrew_pitch: Param<f32>,
    pub leadscrew_is_metric: Param<bool>,
    pub max_jog_speed_mm_per_min: Param<f32>,
    /// Carried but not wired into the Sync ISR path — see DESIGN.md for
    /// the integration point a future direction-change compensator would
    /// hook into.
    pub backlash_mm: Param<f32>,
}

impl ZAxisParams {
    pub const fn defaults() -> Self {
        Self {
            motor_pulley_teeth: Param::new(1, valid_teeth),
            leadscrew_pulley_teeth: Param::new(1, valid_teeth),
            leadscrew_pitch: Param::new(4.0, valid_positive_f32),
            leadscrew_is_metric: Param::new(true, valid_bool),
            max_jog_speed_mm_per_min: Param::new(1000.0, valid_positive_f32),
            backlash_mm: Param::new(0.0, valid_non_negative_f32),
        }
    }
}

pub struct MotionParams {
    pub sync_frequency_hz: Param<u32>,
}

impl MotionParams {
    pub const fn defaults() -> Self {
        Self {
            sync_frequency_hz: Param::new(crate::consts::synchronizer::UPDATE_FREQ_HZ_DEFAULT, valid_sync_freq),
        }
    }
}

pub struct SystemParams {
    pub measurement_unit_is_metric: Param<bool>,
    pub jog_enabled: Param<bool>,
    pub default_jog_speed_index: Param<u8>,
}

impl SystemParams {
    pub const fn defaults() -> Self {
        Self {
            measurement_unit_is_metric: Param::new(true, valid_bool),
            jog_enabled: Param::new(true, valid_bool),
            default_jog_speed_index: Param::new(0, valid_jog_speed_index),
        }
    }
}

/// Supervisory spindle parameters. Not detailed in the consumed-parameter
/// list; an over-speed guard is the one spindle-domain value the
/// core itself has a use for (see DESIGN.md).
pub struct SpindleParams {
    pub max_rpm: Param<u16>,
}

impl SpindleParams {
    pub const fn defaults() -> Self {
        Self {
            max_rpm: Param::new(3000, valid_rpm),
        }
    }
}
