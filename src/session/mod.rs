// External session store
// Sessions live in the store; everything else only reads and deletes them

pub mod memory;
pub mod redis_store;
pub mod repository;
pub mod types;

pub use memory::MemorySessionRepository;
pub use redis_store::RedisSessionRepository;
pub use repository::{SessionRepository, SessionStoreError, create_repository};
pub use types::{
    Authentication, PRINCIPAL_NAME_INDEX_NAME, SECURITY_CONTEXT_ATTRIBUTE, SecurityContext,
    SessionConfig, StoredSession,
};
