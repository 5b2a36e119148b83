// SPDX-License-Identifier: GPL-3.0-or-later

//! MotionCoordinator: the brain. Single authority over mode,
//! configuration, and orchestration.
//!
//! The single place that owns every other component (encoder capture,
//! step generator, synchronizer, jog profile, auto-stop) and is the one
//! thing the host firmware's main loop and UI boundary actually talk to.

use crate::els::auto_stop::{AutoStop, MovingDirection, TriggerAction};
use crate::els::encoder_capture::{Direction as EncoderDirection, EncoderCapture, QuadratureTimer};
use crate::els::gearing::{self, MotionConfig};
use crate::els::jog_profile::JogProfile;
use crate::els::step_generator::StepGenerator;
use crate::els::synchronizer::{GearingConfig, Synchronizer};
use crate::fault::Fault;
use crate::params::{ParamId, ParamRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Threading,
    TurningFeed,
    Jog,
    Fault,
}

impl Mode {
    fn is_els(self) -> bool {
        matches!(self, Mode::Threading | Mode::TurningFeed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionStatus {
    pub encoder_count: i32,
    pub stepper_current_steps: i32,
    pub stepper_target_steps: i32,
    pub spindle_rpm: i16,
    pub mode: Mode,
    pub motor_enabled: bool,
    pub running: bool,
    pub fault: Option<Fault>,
}

pub struct MotionCoordinator<T: QuadratureTimer> {
    encoder: EncoderCapture<T>,
    step: StepGenerator,
    sync: Synchronizer,
    jog: JogProfile,
    auto_stop: AutoStop,
    params: ParamRegistry,

    config: MotionConfig,
    mode: Mode,
    mode_before_jog: Option<Mode>,
    motor_enabled: bool,
    feed_towards_chuck: bool,
    jog_enabled: bool,

    fault: Option<Fault>,
    fault_pending: bool,

    initialized: bool,
}

fn validate_config(cfg: &MotionConfig) -> Result<(), Fault> {
    if cfg.motor_pulley_teeth < crate::consts::zaxis::TEETH_MIN
        || cfg.motor_pulley_teeth > crate::consts::zaxis::TEETH_MAX
        || cfg.leadscrew_pulley_teeth < crate::consts::zaxis::TEETH_MIN
        || cfg.leadscrew_pulley_teeth > crate::consts::zaxis::TEETH_MAX
    {
        return Err(Fault::config_invalid("pulley teeth out of range"));
    }
    if cfg.leadscrew_pitch_mm <= 0.0 {
        return Err(Fault::config_invalid("leadscrew pitch must be positive"));
    }
    if !matches!(cfg.microsteps, 1 | 2 | 4 | 8 | 16 | 32 | 64 | 128 | 256) {
        return Err(Fault::config_invalid("unsupported microstep division"));
    }
    if cfg.encoder_ppr < crate::consts::encoder::PPR_MIN || cfg.encoder_ppr > crate::consts::encoder::PPR_MAX {
        return Err(Fault::config_invalid("encoder PPR out of range"));
    }
    if cfg.sync_frequency_hz < crate::consts::synchronizer::UPDATE_FREQ_HZ_MIN
        || cfg.sync_frequency_hz > crate::consts::synchronizer::UPDATE_FREQ_HZ_MAX
    {
        return Err(Fault::config_invalid("sync frequency out of range"));
    }
    Ok(())
}

impl<T: QuadratureTimer> MotionCoordinator<T> {
    pub fn new(timer: T, config: MotionConfig, pulse_timer_freq_hz: u32, max_jog_speed_hz: f32, jog_accel_steps_per_s2: f32) -> Self {
        Self {
            encoder: EncoderCapture::new(timer, config.encoder_ppr, false),
            step: StepGenerator::new(pulse_timer_freq_hz),
            sync: Synchronizer::new(),
            jog: JogProfile::new(max_jog_speed_hz, jog_accel_steps_per_s2),
            auto_stop: AutoStop::new(),
            params: ParamRegistry::defaults(),
            config,
            mode: Mode::Idle,
            mode_before_jog: None,
            motor_enabled: false,
            feed_towards_chuck: false,
            jog_enabled: true,
            fault: None,
            fault_pending: false,
            initialized: false,
        }
    }

    /// Initializes C1 -> C2 -> C3 in order. StepGenerator needs no
    /// hardware bring-up of its own in this implementation; it is ready
    /// the moment it's constructed.
    pub fn begin(&mut self, encoder_filter_level: u8) -> Result<(), Fault> {
        validate_config(&self.config)?;
        self.encoder.begin(encoder_filter_level)?;
        let gearing = GearingConfig::from_motion_config(&self.config);
        self.sync.begin(gearing)?;
        self.initialized = true;
        Ok(())
    }

    fn require_initialized(&self) -> Result<(), Fault> {
        if self.initialized {
            Ok(())
        } else {
            Err(Fault::config_invalid("MotionCoordinator::begin was not called"))
        }
    }

    fn apply_config(&mut self) -> Result<(), Fault> {
        validate_config(&self.config)?;
        let gearing = GearingConfig::from_motion_config(&self.config);
        self.sync.set_config(gearing, self.encoder.count())
    }

    pub fn set_config(&mut self, config: MotionConfig) -> Result<(), Fault> {
        self.require_initialized()?;
        validate_config(&config)?;
        let previous = self.config;
        self.config = config;
        if let Err(e) = self.apply_config() {
            self.config = previous;
            return Err(e);
        }
        self.encoder.set_ppr(self.config.encoder_ppr);
        Ok(())
    }

    /// Read-only view of the stored parameters. `MotionCoordinator` is the
    /// only thing in the core that mutates `ParamRegistry`; a host firmware
    /// goes through the setters below rather than reaching into the
    /// registry directly.
    pub fn params(&self) -> &ParamRegistry {
        &self.params
    }

    /// Rebuilds `MotionConfig` from the registry's current values (keeping
    /// the per-job `thread_pitch_mm` already in effect) and applies it the
    /// same way `set_config` does.
    pub fn apply_params(&mut self) -> Result<(), Fault> {
        let cfg = self.params.to_motion_config(self.config.thread_pitch_mm);
        self.set_config(cfg)
    }

    pub fn set_motor_native_steps(&mut self, steps: u32) -> Result<(), Fault> {
        self.params.stepper.motor_native_steps.set(steps)?;
        self.apply_params()
    }

    pub fn set_stepper_microsteps(&mut self, microsteps: u32) -> Result<(), Fault> {
        self.params.stepper.microsteps.set(microsteps)?;
        self.apply_params()
    }

    pub fn set_encoder_ppr(&mut self, ppr: u32) -> Result<(), Fault> {
        self.params.encoder.ppr.set(ppr)?;
        self.apply_params()
    }

    /// Caps any speed this coordinator ever commands the stepper to, in
    /// both jog and the per-tick Sync ISR accumulation.
    pub fn set_stepper_max_speed_hz(&mut self, hz: u32) -> Result<(), Fault> {
        self.params.stepper.max_speed_hz.set(hz)
    }

    /// Supervisory spindle speed ceiling: `poll()` faults the machine out
    /// if the measured spindle RPM ever exceeds this.
    pub fn set_spindle_max_rpm(&mut self, rpm: u16) -> Result<(), Fault> {
        self.params.spindle.max_rpm.set(rpm)
    }

    /// Persists every dirty parameter via the caller-supplied callback.
    pub fn commit_params(&mut self, persist: impl FnMut(ParamId) -> bool) {
        self.params.commit(persist)
    }

    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Fault> {
        self.require_initialized()?;
        if self.mode == Mode::Fault {
            return Err(Fault::config_invalid("cannot change mode while faulted"));
        }
        if self.mode == Mode::Jog {
            return Err(Fault::config_invalid("end jog before changing mode"));
        }
        match mode {
            Mode::Threading | Mode::TurningFeed => {
                self.stop_motion();
                self.apply_config()?;
                self.mode = mode;
                Ok(())
            }
            Mode::Idle => {
                self.stop_motion();
                self.mode = Mode::Idle;
                Ok(())
            }
            Mode::Jog | Mode::Fault => Err(Fault::config_invalid("use begin_jog/emergency_stop for this transition")),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn enable_motor(&mut self) {
        self.step.enable();
        if self.mode.is_els() {
            self.sync.enable(true, self.encoder.count());
        }
        self.motor_enabled = true;
    }

    pub fn disable_motor(&mut self) {
        self.sync.enable(false, self.encoder.count());
        self.step.stop();
        self.step.disable();
        self.motor_enabled = false;
    }

    pub fn start_motion(&mut self) -> Result<(), Fault> {
        match self.mode {
            Mode::Threading | Mode::TurningFeed if self.motor_enabled => {
                self.sync.enable(true, self.encoder.count());
                Ok(())
            }
            Mode::Jog => Ok(()),
            _ => Err(Fault::config_invalid("cannot start motion in current mode")),
        }
    }

    pub fn stop_motion(&mut self) {
        self.sync.enable(false, self.encoder.count());
        self.step.stop();
    }

    pub fn emergency_stop(&mut self) {
        self.sync.enable(false, self.encoder.count());
        self.step.emergency_stop();
        self.jog.end_jog(&mut self.step);
        self.motor_enabled = false;
        self.mode = Mode::Fault;
        self.fault = Some(Fault::estop("emergency stop commanded"));
        self.fault_pending = true;
    }

    pub fn clear_fault(&mut self) {
        self.fault = None;
        self.step.clear_fault();
        if self.mode == Mode::Fault {
            self.mode = Mode::Idle;
        }
    }

    pub fn set_jog_enabled(&mut self, enabled: bool) {
        self.jog_enabled = enabled;
    }

    fn mm_per_min_to_hz(&self, speed_mm_per_min: f32) -> f32 {
        let mm_per_s = speed_mm_per_min / 60.0;
        let hz = (gearing::steps_per_mm(&self.config) as f32) * mm_per_s;
        hz.min(self.params.stepper.max_speed_hz.get() as f32)
    }

    /// `towards_chuck = true` moves in the negative-direction convention
    /// (`StepperPosition::direction == false`).
    pub fn begin_jog(&mut self, towards_chuck: bool, speed_mm_per_min: f32) -> Result<(), Fault> {
        self.require_initialized()?;
        if !self.jog_enabled {
            return Err(Fault::config_invalid("jog is disabled"));
        }
        if self.mode == Mode::Fault {
            return Err(Fault::config_invalid("cannot jog while faulted"));
        }
        if self.mode != Mode::Jog {
            self.mode_before_jog = Some(self.mode);
        }
        self.sync.enable(false, self.encoder.count());
        let hz = self.mm_per_min_to_hz(speed_mm_per_min.abs());
        self.jog.begin_jog(!towards_chuck, hz, &mut self.step);
        self.mode = Mode::Jog;
        Ok(())
    }

    pub fn end_jog(&mut self) {
        self.jog.end_jog(&mut self.step);
    }

    pub fn update_jog_speed(&mut self, speed_mm_per_min: f32) {
        let hz = self.mm_per_min_to_hz(speed_mm_per_min.abs());
        self.jog.update_speed(hz, &mut self.step);
    }

    pub fn set_feed_direction(&mut self, towards_chuck: bool) -> Result<(), Fault> {
        if towards_chuck == self.feed_towards_chuck {
            return Ok(());
        }
        self.config.thread_pitch_mm = -self.config.thread_pitch_mm;
        self.feed_towards_chuck = towards_chuck;
        self.apply_config()
    }

    pub fn configure_absolute_target_stop(&mut self, target_abs_steps: i32, armed: bool) {
        if armed {
            self.auto_stop.arm(target_abs_steps);
        } else {
            self.auto_stop.clear();
        }
    }

    pub fn clear_absolute_target_stop(&mut self) {
        self.auto_stop.clear();
    }

    pub fn was_target_stop_reached_and_halted(&mut self) -> bool {
        self.auto_stop.consume_reached()
    }

    pub fn consume_target_reached(&mut self) -> bool {
        self.auto_stop.consume_reached()
    }

    pub fn consume_fault(&mut self) -> Option<Fault> {
        if self.fault_pending {
            self.fault_pending = false;
            self.fault
        } else {
            None
        }
    }

    pub fn convert_units_to_steps(&self, mm: f32) -> i32 {
        gearing::mm_to_steps(mm, &self.config)
    }

    pub fn convert_steps_to_units(&self, steps: i32) -> f32 {
        gearing::steps_to_mm(steps, &self.config)
    }

    /// Non-ISR periodic housekeeping: checks the spindle overspeed guard,
    /// resumes the mode that was active before a jog once the stepper has
    /// coasted to a stop, and polls AutoStop.
    pub fn poll(&mut self) {
        let rpm = self.encoder.sample().rpm;
        if self.fault.is_none() && rpm.unsigned_abs() as u16 > self.params.spindle.max_rpm.get() {
            self.sync.enable(false, self.encoder.count());
            self.step.emergency_stop();
            self.jog.end_jog(&mut self.step);
            self.motor_enabled = false;
            self.mode = Mode::Fault;
            self.fault = Some(Fault::spindle_overspeed("spindle RPM exceeded configured maximum"));
            self.fault_pending = true;
        }

        let step_status = self.step.status();

        if self.mode == Mode::Jog && !self.jog.is_active() && !step_status.running {
            let prior = self.mode_before_jog.take().unwrap_or(Mode::Idle);
            self.mode = prior;
            if self.motor_enabled && self.mode.is_els() {
                self.sync.enable(true, self.encoder.count());
            }
        }

        let direction = if step_status.direction {
            MovingDirection::Forward
        } else {
            MovingDirection::Reverse
        };
        if self.auto_stop.poll(step_status.current, direction) == TriggerAction::Halt {
            self.sync.enable(false, self.encoder.count());
            if self.mode == Mode::Jog {
                self.jog.end_jog(&mut self.step);
            }
        }

        if let Some(f) = self.step.fault() {
            if self.fault.is_none() {
                self.fault = Some(f);
                self.fault_pending = true;
                self.mode = Mode::Fault;
            }
        }
    }

    /// Runs one Sync ISR tick. Must be called at exactly `config.sync_frequency_hz`.
    pub fn sync_tick(&mut self) {
        let count = self.encoder.count();
        self.sync.tick(count, &mut self.step);
    }

    /// Runs one Step ISR tick. Must be called at exactly the pulse-timer
    /// frequency passed to `new`.
    pub fn step_tick(&mut self, now_micros: u64) -> crate::els::step_generator::PinCommand {
        self.step.tick(now_micros)
    }

    pub fn status(&mut self) -> MotionStatus {
        let sample = self.encoder.sample();
        let step_status = self.step.status();
        MotionStatus {
            encoder_count: sample.count,
            stepper_current_steps: step_status.current,
            stepper_target_steps: step_status.target,
            spindle_rpm: sample.rpm,
            mode: self.mode,
            motor_enabled: self.motor_enabled,
            running: step_status.running || self.sync.is_enabled(),
            fault: self.fault,
        }
    }

    pub fn spindle_direction(&mut self) -> EncoderDirection {
        self.encoder.sample().direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    struct MockTimer {
        count: Cell<u32>,
        now_ms: Cell<u32>,
        reversed: Cell<bool>,
    }

    impl MockTimer {
        fn new() -> Self {
            Self {
                count: Cell::new(0),
                now_ms: Cell::new(0),
                reversed: Cell::new(false),
            }
        }

        fn advance(&self, delta: i32, dt_ms: u32) {
            self.count.set(self.count.get().wrapping_add(delta as u32));
            self.now_ms.set(self.now_ms.get().wrapping_add(dt_ms));
            self.reversed.set(delta < 0);
        }
    }

    impl QuadratureTimer for MockTimer {
        fn start(&mut self, _filter_level: u8) -> Result<(), Fault> {
            Ok(())
        }
        fn raw_count(&self) -> u32 {
            self.count.get()
        }
        fn counting_down(&self) -> bool {
            self.reversed.get()
        }
        fn set_filter(&mut self, _filter_level: u8) {}
        fn zero(&mut self) {
            self.count.set(0);
        }
        fn now_ms(&self) -> u32 {
            self.now_ms.get()
        }
    }

    fn s1_config() -> MotionConfig {
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

    fn drain_step(coord: &mut MotionCoordinator<MockTimer>, ticks: u32) {
        let mut now = 0u64;
        for _ in 0..ticks {
            coord.step_tick(now);
            now += 5;
        }
    }

    // One full revolution of the spindle, driven end-to-end through MotionCoordinator.
    #[test]
    fn scenario_s1_full_revolution_through_coordinator() {
        let mut coord = MotionCoordinator::new(MockTimer::new(), s1_config(), 200_000, 500.0, 100_000.0);
        coord.begin(4).unwrap();
        coord.set_mode(Mode::Threading).unwrap();
        coord.enable_motor();

        for _ in 0..4096 {
            coord.encoder.timer_mut().advance(1, 1);
            coord.sync_tick();
        }
        drain_step(&mut coord, 20_000);

        assert_eq!(coord.status().stepper_target_steps, 400);
    }

    #[test]
    fn emergency_stop_halts_and_requires_clear_fault() {
        let mut coord = MotionCoordinator::new(MockTimer::new(), s1_config(), 200_000, 500.0, 100_000.0);
        coord.begin(4).unwrap();
        coord.set_mode(Mode::Threading).unwrap();
        coord.enable_motor();

        coord.emergency_stop();
        assert_eq!(coord.mode(), Mode::Fault);
        assert!(coord.set_mode(Mode::Idle).is_err());

        assert_eq!(coord.consume_fault().unwrap().kind, crate::fault::FaultKind::EStop);
        assert!(coord.consume_fault().is_none());

        coord.clear_fault();
        assert_eq!(coord.mode(), Mode::Idle);
        coord.set_mode(Mode::Idle).unwrap();
    }

    // Jog override from TurningFeed, then resume.
    #[test]
    fn scenario_s6_jog_override_and_resume() {
        let mut coord = MotionCoordinator::new(MockTimer::new(), s1_config(), 200_000, 500.0, 100_000.0);
        coord.begin(4).unwrap();
        coord.set_mode(Mode::TurningFeed).unwrap();
        coord.enable_motor();
        coord.start_motion().unwrap();
        assert!(coord.sync.is_enabled());

        coord.begin_jog(true, 300.0).unwrap();
        assert_eq!(coord.mode(), Mode::Jog);
        assert!(!coord.sync.is_enabled());
        assert!(coord.step.is_continuous());

        coord.end_jog();
        drain_step(&mut coord, 5000);
        coord.poll();

        assert_eq!(coord.mode(), Mode::TurningFeed);
        assert!(coord.sync.is_enabled());
    }

    #[test]
    fn set_feed_direction_flips_gearing_sign() {
        let mut coord = MotionCoordinator::new(MockTimer::new(), s1_config(), 200_000, 500.0, 100_000.0);
        coord.begin(4).unwrap();
        coord.set_mode(Mode::Threading).unwrap();
        let before = coord.sync.steps_per_encoder_tick();
        coord.set_feed_direction(true).unwrap();
        let after = coord.sync.steps_per_encoder_tick();
        assert!((before + after).abs() < 1e-12);
    }

    // Absolute-position auto-stop, via MotionCoordinator's AutoStop plumbing.
    #[test]
    fn scenario_s5_auto_stop_via_poll() {
        let mut coord = MotionCoordinator::new(MockTimer::new(), s1_config(), 200_000, 500.0, 100_000.0);
        coord.begin(4).unwrap();
        coord.set_mode(Mode::Threading).unwrap();
        coord.enable_motor();
        coord.configure_absolute_target_stop(100, true);

        coord.step.set_absolute(150);
        drain_step(&mut coord, 500);
        coord.poll();

        assert!(coord.consume_target_reached());
        assert!(!coord.sync.is_enabled());
    }

    #[test]
    fn poll_faults_out_on_spindle_overspeed() {
        let mut coord = MotionCoordinator::new(MockTimer::new(), s1_config(), 200_000, 500.0, 100_000.0);
        coord.begin(4).unwrap();
        coord.set_mode(Mode::Threading).unwrap();
        coord.enable_motor();
        coord.set_spindle_max_rpm(100).unwrap();

        // One revolution (4096 quadrature counts) in 10ms is ~4096 RPM, well
        // past the 100 RPM ceiling just configured.
        coord.encoder.timer_mut().advance(4096, 10);
        coord.poll();

        assert_eq!(coord.mode(), Mode::Fault);
        assert_eq!(
            coord.consume_fault().unwrap().kind,
            crate::fault::FaultKind::SpindleOverspeed
        );
        assert!(!coord.sync.is_enabled());
    }

    #[test]
    fn set_stepper_max_speed_hz_caps_jog_speed() {
        let mut coord = MotionCoordinator::new(MockTimer::new(), s1_config(), 200_000, 500.0, 100_000.0);
        coord.begin(4).unwrap();
        coord.set_stepper_max_speed_hz(50).unwrap();

        let hz = coord.mm_per_min_to_hz(1_000_000.0);
        assert!(hz <= 50.0);
    }

    #[test]
    fn convert_units_round_trip() {
        let mut coord = MotionCoordinator::new(MockTimer::new(), s1_config(), 200_000, 500.0, 100_000.0);
        coord.begin(4).unwrap();
        let steps = coord.convert_units_to_steps(25.0);
        let mm = coord.convert_steps_to_units(steps);
        assert!((mm - 25.0).abs() < 0.01);
    }
}
