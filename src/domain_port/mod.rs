mod repair_queue;
mod user_store;

pub use repair_queue::*;
pub use user_store::*;
