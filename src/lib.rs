//! privdb - A page-cached heap-file storage engine in Rust
//!
//! Tables are stored as heap files of fixed-size pages. All page access goes
//! through a shared buffer pool, which caches pages and enforces strict
//! two-phase locking at page granularity.
//!
//! # Architecture
//!
//! - **Record model** (`tuple`): typed values, tuple descriptors and tuples
//!   with their fixed-width binary encoding
//!
//! - **Storage Layer** (`storage`): pages and the files that hold them
//!   - `DiskManager`: reads and writes whole pages of a flat file
//!   - `HeapPage`: slot array of one page and its on-disk format
//!   - `HeapFile`: a table; insert, delete and sequential scan
//!
//! - **Buffer Pool** (`buffer`): page cache and concurrency control
//!   - `BufferPool`: LRU cache with shared/exclusive page locks, deadlock
//!     detection and NO-STEAL/FORCE commit and abort
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use privdb::buffer::BufferPool;
//! use privdb::storage::{DbFile, HeapFile};
//! use privdb::tuple::{TupleBuilder, TupleDesc};
//! use privdb::TransactionId;
//!
//! let pool = Arc::new(BufferPool::new(10));
//! let desc = TupleDesc::builder().string("name").int("age").build_arc();
//! let file = HeapFile::open("people.dat", desc.clone(), pool.clone()).unwrap();
//!
//! let tid = TransactionId::new();
//! let mut t = TupleBuilder::new(desc).value("sam").value(25).build();
//! file.insert_tuple(&mut t, tid).unwrap();
//! pool.commit_transaction(tid).unwrap();
//!
//! let tid = TransactionId::new();
//! for tuple in file.iter(tid).unwrap() {
//!     println!("{:?}", tuple.unwrap().values());
//! }
//! pool.commit_transaction(tid).unwrap();
//! ```

pub mod buffer;
pub mod common;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{DbError, PageKey, Permission, RecordId, Result, TransactionId};
