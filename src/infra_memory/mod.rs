mod repair_queue_memory;
mod user_store_memory;

pub use repair_queue_memory::*;
pub use user_store_memory::*;
