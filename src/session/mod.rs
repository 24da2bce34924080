pub mod memory;
pub mod record;
pub mod redis;
pub mod registry;
pub mod store;

pub use self::memory::MemorySessionStore;
pub use self::record::{LoginContext, SessionRecord};
pub use self::redis::RedisSessionStore;
pub use self::registry::SessionRegistry;
pub use self::store::{SessionStore, StoreError};
