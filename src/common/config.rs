/// Size of a page in bytes (4 KB)
pub const PAGE_SIZE: usize = 4096;

/// Heap page header: slot capacity (i32) followed by used slot count (i32)
pub const PAGE_HEADER_SIZE: usize = 8;

/// On-disk width of an integer field (i64, little-endian)
pub const INT_SIZE: usize = 8;

/// On-disk width of a string field, zero padded
pub const STRING_LENGTH: usize = 32;

/// Default buffer pool size (number of cached pages)
pub const DEFAULT_BUFFER_POOL_SIZE: usize = 10;
