mod buffer_pool;
mod lock_manager;
mod lru_replacer;

pub use buffer_pool::{BufferPool, PageRef};
