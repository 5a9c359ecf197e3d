mod clock;
mod memory;
mod op;
mod redis;
mod traits;

pub use self::redis::RedisStore;
pub use clock::{Clock, ManualClock, SystemClock};
pub use memory::MemoryStore;
pub use op::{format_score, parse_score, Op, Reply};
pub use traits::{ServerTime, Store};
