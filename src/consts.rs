// SPDX-License-Identifier: GPL-3.0-or-later

//! Defaults and hard limits, organized by domain, mirroring the validators
//! in `params::domains`. Values here are the core's own operating
//! constants; parameter *ranges* consumed from the HMI are declared
//! alongside their `ParamRegistry` entries instead, since those are
//! runtime-configurable where these are not.

pub mod encoder {
    /// Window, in milliseconds, below which an RPM estimate is not
    /// recomputed and the previous reading is returned instead.
    pub const MIN_RPM_WINDOW_MS: u32 = 10;

    pub const FILTER_LEVEL_MAX: u8 = 15;

    pub const PPR_MIN: u32 = 100;
    pub const PPR_MAX: u32 = 10_000;
}

pub mod stepper {
    /// Hard ceiling on the step pulse timer.
    pub const PULSE_TIMER_MAX_FREQ_HZ: u32 = 200_000;

    /// Driver-calibrated timing floors, in microseconds.
    pub const MIN_PULSE_WIDTH_US: f32 = 2.5;
    pub const MIN_DIR_SETUP_US: f32 = 5.0;
    pub const MIN_ENABLE_SETUP_US: f32 = 5.0;

    pub const MAX_SPEED_HZ_MIN: u32 = 1;
    pub const MAX_SPEED_HZ_MAX: u32 = 200_000;

    /// Motor full-steps per revolution, before microstepping. 200 (1.8°)
    /// and 400 (0.9°) are the common hybrid-stepper values.
    pub const MOTOR_NATIVE_STEPS_MIN: u32 = 1;
    pub const MOTOR_NATIVE_STEPS_MAX: u32 = 1_000;
}

pub mod synchronizer {
    pub const UPDATE_FREQ_HZ_DEFAULT: u32 = 10_000;
    pub const UPDATE_FREQ_HZ_MIN: u32 = 1_000;
    pub const UPDATE_FREQ_HZ_MAX: u32 = 100_000;
}

pub mod zaxis {
    pub const TEETH_MIN: u32 = 1;
    pub const TEETH_MAX: u32 = 1_000;
}

pub mod system {
    pub const DEFAULT_JOG_SPEED_INDEX_MAX: u8 = 31;
}
