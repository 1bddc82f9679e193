//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the workspace: input
//! sequences, derived signals, configuration, calibration result and errors.
//! All business crates depend on this crate only; reverse dependencies are
//! prohibited.
//!
//! ## Time Model
//! - Video and tracker timestamps are seconds (f64) on one clock domain
//! - A positive tracker lag means tracker data is delayed relative to video

mod blueprint;
mod calibration_config;
mod error;
mod frame;
mod result;
mod signal;
mod tracker;

pub use blueprint::*;
pub use calibration_config::*;
pub use error::*;
pub use frame::*;
pub use result::*;
pub use signal::*;
pub use tracker::*;
