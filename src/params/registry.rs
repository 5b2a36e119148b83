// SPDX-License-Identifier: GPL-3.0-or-later

//! ParamRegistry: typed runtime parameters with validation and
//! dirty-tracking.
//!
//! The registry does not know how parameters are persisted; `commit` only
//! iterates dirty parameters and calls a caller-supplied persistence
//! callback, clearing each bit on success. The registry stays
//! storage-agnostic; the caller supplies whatever side-effecting I/O
//! backs it.

use crate::els::gearing::MotionConfig;
use crate::params::domains::{EncoderParams, MotionParams, SpindleParams, StepperParams, SystemParams, ZAxisParams};

/// Identifies one parameter for the persistence callback, so `commit`
/// doesn't need per-field closures or allocation to report what changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamId {
    EncoderPpr,
    EncoderFilterLevel,
    EncoderInvertDirection,
    StepperMicrosteps,
    StepperInvertEnable,
    StepperMaxSpeedHz,
    StepperMotorNativeSteps,
    ZAxisMotorPulleyTeeth,
    ZAxisLeadscrewPulleyTeeth,
    ZAxisLeadscrewPitch,
    ZAxisLeadscrewIsMetric,
    ZAxisMaxJogSpeedMmPerMin,
    ZAxisBacklashMm,
    MotionSyncFrequencyHz,
    SystemMeasurementUnitIsMetric,
    SystemJogEnabled,
    SystemDefaultJogSpeedIndex,
    SpindleMaxRpm,
}

const ALL_PARAM_IDS: [ParamId; 18] = [
    ParamId::EncoderPpr,
    ParamId::EncoderFilterLevel,
    ParamId::EncoderInvertDirection,
    ParamId::StepperMicrosteps,
    ParamId::StepperInvertEnable,
    ParamId::StepperMaxSpeedHz,
    ParamId::StepperMotorNativeSteps,
    ParamId::ZAxisMotorPulleyTeeth,
    ParamId::ZAxisLeadscrewPulleyTeeth,
    ParamId::ZAxisLeadscrewPitch,
    ParamId::ZAxisLeadscrewIsMetric,
    ParamId::ZAxisMaxJogSpeedMmPerMin,
    ParamId::ZAxisBacklashMm,
    ParamId::MotionSyncFrequencyHz,
    ParamId::SystemMeasurementUnitIsMetric,
    ParamId::SystemJogEnabled,
    ParamId::SystemDefaultJogSpeedIndex,
    ParamId::SpindleMaxRpm,
];

pub struct ParamRegistry {
    pub encoder: EncoderParams,
    pub stepper: StepperParams,
    pub zaxis: ZAxisParams,
    pub motion: MotionParams,
    pub system: SystemParams,
    pub spindle: SpindleParams,
}

impl ParamRegistry {
    pub const fn defaults() -> Self {
        Self {
            encoder: EncoderParams::defaults(),
            stepper: StepperParams::defaults(),
            zaxis: ZAxisParams::defaults(),
            motion: MotionParams::defaults(),
            system: SystemParams::defaults(),
            spindle: SpindleParams::defaults(),
        }
    }

    fn is_dirty(&self, id: ParamId) -> bool {
        match id {
            ParamId::EncoderPpr => self.encoder.ppr.is_dirty(),
            ParamId::EncoderFilterLevel => self.encoder.filter_level.is_dirty(),
            ParamId::EncoderInvertDirection => self.encoder.invert_direction.is_dirty(),
            ParamId::StepperMicrosteps => self.stepper.microsteps.is_dirty(),
            ParamId::StepperInvertEnable => self.stepper.invert_enable.is_dirty(),
            ParamId::StepperMaxSpeedHz => self.stepper.max_speed_hz.is_dirty(),
            ParamId::StepperMotorNativeSteps => self.stepper.motor_native_steps.is_dirty(),
            ParamId::ZAxisMotorPulleyTeeth => self.zaxis.motor_pulley_teeth.is_dirty(),
            ParamId::ZAxisLeadscrewPulleyTeeth => self.zaxis.leadscrew_pulley_teeth.is_dirty(),
            ParamId::ZAxisLeadscrewPitch => self.zaxis.leadscrew_pitch.is_dirty(),
            ParamId::ZAxisLeadscrewIsMetric => self.zaxis.leadscrew_is_metric.is_dirty(),
            ParamId::ZAxisMaxJogSpeedMmPerMin => self.zaxis.max_jog_speed_mm_per_min.is_dirty(),
            ParamId::ZAxisBacklashMm => self.zaxis.backlash_mm.is_dirty(),
            ParamId::MotionSyncFrequencyHz => self.motion.sync_frequency_hz.is_dirty(),
            ParamId::SystemMeasurementUnitIsMetric => self.system.measurement_unit_is_metric.is_dirty(),
            ParamId::SystemJogEnabled => self.system.jog_enabled.is_dirty(),
            ParamId::SystemDefaultJogSpeedIndex => self.system.default_jog_speed_index.is_dirty(),
            ParamId::SpindleMaxRpm => self.spindle.max_rpm.is_dirty(),
        }
    }

    fn clear_dirty(&mut self, id: ParamId) {
        match id {
            ParamId::EncoderPpr => self.encoder.ppr.clear_dirty(),
            ParamId::EncoderFilterLevel => self.encoder.filter_level.clear_dirty(),
            ParamId::EncoderInvertDirection => self.encoder.invert_direction.clear_dirty(),
            ParamId::StepperMicrosteps => self.stepper.microsteps.clear_dirty(),
            ParamId::StepperInvertEnable => self.stepper.invert_enable.clear_dirty(),
            ParamId::StepperMaxSpeedHz => self.stepper.max_speed_hz.clear_dirty(),
            ParamId::StepperMotorNativeSteps => self.stepper.motor_native_steps.clear_dirty(),
            ParamId::ZAxisMotorPulleyTeeth => self.zaxis.motor_pulley_teeth.clear_dirty(),
            ParamId::ZAxisLeadscrewPulleyTeeth => self.zaxis.leadscrew_pulley_teeth.clear_dirty(),
            ParamId::ZAxisLeadscrewPitch => self.zaxis.leadscrew_pitch.clear_dirty(),
            ParamId::ZAxisLeadscrewIsMetric => self.zaxis.leadscrew_is_metric.clear_dirty(),
            ParamId::ZAxisMaxJogSpeedMmPerMin => self.zaxis.max_jog_speed_mm_per_min.clear_dirty(),
            ParamId::ZAxisBacklashMm => self.zaxis.backlash_mm.clear_dirty(),
            ParamId::MotionSyncFrequencyHz => self.motion.sync_frequency_hz.clear_dirty(),
            ParamId::SystemMeasurementUnitIsMetric => self.system.measurement_unit_is_metric.clear_dirty(),
            ParamId::SystemJogEnabled => self.system.jog_enabled.clear_dirty(),
            ParamId::SystemDefaultJogSpeedIndex => self.system.default_jog_speed_index.clear_dirty(),
            ParamId::SpindleMaxRpm => self.spindle.max_rpm.clear_dirty(),
        }
    }

    /// Iterates dirty parameters and calls `persist(id)`; on success (`true`)
    /// clears the bit. Order is stable (declaration order above).
    ///
    /// The dirty set is collected into a fixed-capacity `heapless::Vec`
    /// before any callback runs, so `persist` is free to touch `self`
    /// (e.g. re-reading a just-committed value) without fighting the
    /// borrow checker over a live iterator into `ALL_PARAM_IDS`.
    pub fn commit(&mut self, mut persist: impl FnMut(ParamId) -> bool) {
        let dirty: heapless::Vec<ParamId, 18> =
            ALL_PARAM_IDS.iter().copied().filter(|&id| self.is_dirty(id)).collect();

        for id in dirty {
            log::debug!("ParamRegistry: committing {:?}", id);
            if persist(id) {
                self.clear_dirty(id);
            } else {
                log::warn!("ParamRegistry: commit failed for {:?}, left dirty", id);
            }
        }
    }

    pub fn any_dirty(&self) -> bool {
        ALL_PARAM_IDS.iter().any(|&id| self.is_dirty(id))
    }

    /// Builds a `MotionConfig` snapshot out of the registry's current
    /// values, the read-only view `MotionCoordinator` needs to apply as
    /// its gearing configuration. `thread_pitch_mm` is supplied by the
    /// caller since it is a per-job value, not a persisted machine
    /// parameter.
    pub fn to_motion_config(&self, thread_pitch_mm: f64) -> MotionConfig {
        let leadscrew_pitch_mm = if self.zaxis.leadscrew_is_metric.get() {
            self.zaxis.leadscrew_pitch.get() as f64
        } else {
            crate::els::gearing::tpi_to_mm_pitch(self.zaxis.leadscrew_pitch.get() as f64)
        };

        MotionConfig {
            thread_pitch_mm,
            leadscrew_pitch_mm,
            leadscrew_is_metric: self.zaxis.leadscrew_is_metric.get(),
            motor_pulley_teeth: self.zaxis.motor_pulley_teeth.get(),
            leadscrew_pulley_teeth: self.zaxis.leadscrew_pulley_teeth.get(),
            motor_native_steps: self.stepper.motor_native_steps.get(),
            microsteps: self.stepper.microsteps.get(),
            encoder_ppr: self.encoder.ppr.get(),
            sync_frequency_hz: self.motion.sync_frequency_hz.get(),
        }
    }
}

impl Default for ParamRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_only_visits_dirty_params_and_clears_on_success() {
        let mut reg = ParamRegistry::defaults();
        reg.encoder.ppr.set(2048).unwrap();
        reg.stepper.microsteps.set(16).unwrap();
        assert!(reg.any_dirty());

        let mut committed = heapless::Vec::<ParamId, 4>::new();
        reg.commit(|id| {
            let _ = committed.push(id);
            true
        });

        assert!(committed.contains(&ParamId::EncoderPpr));
        assert!(committed.contains(&ParamId::StepperMicrosteps));
        assert!(!reg.any_dirty());
    }

    #[test]
    fn commit_leaves_bit_set_on_persistence_failure() {
        let mut reg = ParamRegistry::defaults();
        reg.system.jog_enabled.set(false).unwrap();
        reg.commit(|_| false);
        assert!(reg.system.jog_enabled.is_dirty());
    }

    #[test]
    fn to_motion_config_converts_imperial_leadscrew() {
        let mut reg = ParamRegistry::defaults();
        reg.zaxis.leadscrew_is_metric.set(false).unwrap();
        reg.zaxis.leadscrew_pitch.set(20.0).unwrap(); // 20 TPI
        let cfg = reg.to_motion_config(1.0);
        assert!((cfg.leadscrew_pitch_mm - 1.27).abs() < 1e-3);
    }

    #[test]
    fn to_motion_config_reads_motor_native_steps_from_registry() {
        let mut reg = ParamRegistry::defaults();
        reg.stepper.motor_native_steps.set(400).unwrap();
        let cfg = reg.to_motion_config(1.0);
        assert_eq!(cfg.motor_native_steps, 400);
    }

    #[test]
    fn motor_native_steps_validator_rejects_zero() {
        let mut reg = ParamRegistry::defaults();
        assert!(reg.stepper.motor_native_steps.set(0).is_err());
    }
}
