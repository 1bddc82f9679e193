//! Command implementations.

mod info;
mod run;
mod simulate;
mod validate;

pub use info::run_info;
pub use run::run_calibration;
pub use simulate::run_simulation;
pub use validate::run_validate;
