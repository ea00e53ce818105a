mod repair_queue_redis;

pub use repair_queue_redis::*;
