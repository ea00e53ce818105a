//! Global `tracing` subscriber with a filter taken from `[log]` in the
//! settings. `bin/logger_demo.rs` shows the output of a friend request.

mod logger;
pub use logger::*;

pub use tracing::{Instrument, debug, error, info, trace, warn};
