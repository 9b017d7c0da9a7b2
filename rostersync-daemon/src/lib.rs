//! Long-running watch loop plus systemd unit management.

mod error;
pub mod paths;
mod runtime;
pub mod systemd;

pub use error::DaemonError;
pub use runtime::{init_tracing, run, start_blocking, LoopSummary};
pub use systemd::{generate_unit, install, UnitScope};
