mod repair_worker;
mod server;

pub use repair_worker::*;
pub use server::*;
