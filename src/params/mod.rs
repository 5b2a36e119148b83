// SPDX-License-Identifier: GPL-3.0-or-later

//! Runtime parameters: typed, validated, dirty-tracked, organized by
//! domain.

pub mod domains;
pub mod registry;

pub use domains::{EncoderParams, MotionParams, Param, SpindleParams, StepperParams, SystemParams, ZAxisParams};
pub use registry::{ParamId, ParamRegistry};
