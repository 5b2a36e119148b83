// SPDX-License-Identifier: GPL-3.0-or-later

//! The electronic-lead-screw motion core: encoder capture, step
//! generation, electronic gearing, jogging, auto-stop, and the
//! coordinator that ties them together.

pub mod auto_stop;
pub mod encoder_capture;
pub mod gearing;
pub mod jog_profile;
pub mod motion_coordinator;
pub mod step_generator;
pub mod synchronizer;

pub use auto_stop::{AutoStop, MovingDirection, TriggerAction};
pub use encoder_capture::{Direction, EncoderCapture, EncoderSample, QuadratureTimer, RpmEstimator};
pub use gearing::MotionConfig;
pub use jog_profile::JogProfile;
pub use motion_coordinator::{Mode, MotionCoordinator, MotionStatus};
pub use step_generator::{PinCommand, StepGenerator, StepperPosition};
pub use synchronizer::{GearingConfig, Synchronizer};
