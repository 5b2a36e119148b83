// SPDX-License-Identifier: GPL-3.0-or-later

//! The electronic-gearing math: converting mechanical/electrical ratios
//! into the one number the Synchronizer ISR needs per tick.

/// Mechanical + electrical parameters needed to derive `GearingConfig`.
#[derive(Clone, Copy, Debug)]
pub struct MotionConfig {
    /// Thread pitch / feed rate, mm per spindle revolution. Sign encodes
    /// feed direction: negative means towards-chuck. This is the single
    /// canonical sign source — nothing downstream re-derives or flips it.
    pub thread_pitch_mm: f64,
    /// Leadscrew pitch, mm per leadscrew revolution (already converted
    /// from TPI by the caller if `leadscrew_is_metric` is false).
    pub leadscrew_pitch_mm: f64,
    pub leadscrew_is_metric: bool,
    pub motor_pulley_teeth: u32,
    pub leadscrew_pulley_teeth: u32,
    pub motor_native_steps: u32,
    pub microsteps: u32,
    pub encoder_ppr: u32,
    pub sync_frequency_hz: u32,
}

/// Converts an imperial leadscrew TPI value into an effective pitch in mm.
pub fn tpi_to_mm_pitch(tpi: f64) -> f64 {
    25.4 / tpi
}

/// Computes `GearingConfig::steps_per_encoder_tick`:
///
/// ```text
/// Ns = motor_native_steps * microsteps
/// Pe = encoder_ppr * 4
/// Pl = leadscrew_pitch_mm
/// steps_per_encoder_tick = (Pt / Pe) * Ns / (Pl * Gm / Gl)
/// ```
///
/// Computed in f64 throughout so a long-running gear ratio never drifts
/// from accumulated single-precision rounding error.
pub fn steps_per_encoder_tick(cfg: &MotionConfig) -> f64 {
    let ns = (cfg.motor_native_steps as f64) * (cfg.microsteps as f64);
    let pe = (cfg.encoder_ppr as f64) * 4.0;
    let carriage_mm_per_motor_rev =
        cfg.leadscrew_pitch_mm * (cfg.motor_pulley_teeth as f64) / (cfg.leadscrew_pulley_teeth as f64);

    (cfg.thread_pitch_mm / pe) * ns / carriage_mm_per_motor_rev
}

/// Motor microsteps per millimeter of carriage travel, used by the
/// mm <-> steps conversion helpers on `MotionCoordinator`.
pub fn steps_per_mm(cfg: &MotionConfig) -> f64 {
    let ns = (cfg.motor_native_steps as f64) * (cfg.microsteps as f64);
    let carriage_mm_per_motor_rev =
        cfg.leadscrew_pitch_mm * (cfg.motor_pulley_teeth as f64) / (cfg.leadscrew_pulley_teeth as f64);
    ns / carriage_mm_per_motor_rev
}

pub fn mm_to_steps(mm: f32, cfg: &MotionConfig) -> i32 {
    ((mm as f64) * steps_per_mm(cfg)).round() as i32
}

pub fn steps_to_mm(steps: i32, cfg: &MotionConfig) -> f32 {
    ((steps as f64) / steps_per_mm(cfg)) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> MotionConfig {
        MotionConfig {
            thread_pitch_mm: 1.0,
            leadscrew_pitch_mm: 4.0,
            leadscrew_is_metric: true,
            motor_pulley_teeth: 1,
            leadscrew_pulley_teeth: 1,
            motor_native_steps: 200,
            microsteps: 8,
            encoder_ppr: 1024,
            sync_frequency_hz: 10_000,
        }
    }

    // One full revolution at 1:1 metric gearing moves 400 steps.
    #[test]
    fn scenario_s1_metric_1_1_gearing() {
        let cfg = base_config();
        let spt = steps_per_encoder_tick(&cfg);
        assert!((spt - 0.09765625).abs() < 1e-12);

        let one_rev_ticks = 4096.0;
        let delta = (one_rev_ticks * spt).round() as i32;
        assert_eq!(delta, 400);
    }

    // Imperial leadscrew pitch, converted from TPI before gearing.
    #[test]
    fn scenario_s2_imperial_leadscrew() {
        let mut cfg = base_config();
        cfg.leadscrew_is_metric = false;
        cfg.leadscrew_pitch_mm = tpi_to_mm_pitch(20.0);
        cfg.thread_pitch_mm = 1.25;

        let spt = steps_per_encoder_tick(&cfg);
        assert!((spt - 0.384_560_631_55).abs() < 1e-6);

        let delta = (4096.0 * spt).round() as i32;
        assert!(delta == 1574 || delta == 1575);
    }

    #[test]
    fn mm_steps_round_trip_within_one_step_width() {
        let cfg = base_config();
        for mm in [-123.4f32, 0.0, 0.001, 57.25, 300.0] {
            let steps = mm_to_steps(mm, &cfg);
            let back = steps_to_mm(steps, &cfg);
            let step_width_mm = 1.0 / (steps_per_mm(&cfg) as f32);
            assert!((back - mm).abs() <= step_width_mm + 1e-4);
        }
    }
}
