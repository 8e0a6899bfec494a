//! Contracts between the buffer pool, the storage files, and the layers
//! above them.

use std::sync::Arc;

use crate::common::{PageKey, RecordId, Result, TransactionId};
use crate::tuple::{Tuple, TupleDesc};

use super::page::HeapPage;

/// Boxed tuple stream returned by [`DbFile::iter`].
pub type TupleIter<'a> = Box<dyn Iterator<Item = Result<Tuple>> + 'a>;

/// What the buffer pool needs to know about a cached page.
pub trait Page {
    /// Page number within the owning file.
    fn page_no(&self) -> usize;

    fn is_dirty(&self) -> bool;

    fn set_dirty(&mut self, dirty: bool);

    /// The file this page belongs to, or None if that file has been dropped.
    fn owning_file(&self) -> Option<Arc<dyn DbFile>>;
}

/// A table stored as pages, read and written through the buffer pool.
///
/// Every mutation and scan takes the transaction on whose behalf it runs;
/// page-level locks are acquired inside [`crate::buffer::BufferPool::get_page`].
pub trait DbFile: Send + Sync {
    /// Identity of the file, unique across all open files.
    fn file_id(&self) -> Arc<str>;

    /// Cache and lock key of page `page_no` of this file.
    fn page_key(&self, page_no: usize) -> PageKey {
        PageKey::new(self.file_id(), page_no)
    }

    /// Number of pages currently on disk.
    fn num_pages(&self) -> Result<usize>;

    /// Reads page `page_no` straight from disk, bypassing the cache.
    fn read_page(&self, page_no: usize) -> Result<HeapPage>;

    /// Writes `page` back to its slot on disk and marks it clean.
    fn flush_page(&self, page: &mut HeapPage) -> Result<()>;

    /// Stores `tuple` in a free slot and assigns its record ID.
    fn insert_tuple(&self, tuple: &mut Tuple, tid: TransactionId) -> Result<RecordId>;

    /// Frees the slot named by `tuple`'s record ID.
    fn delete_tuple(&self, tuple: &Tuple, tid: TransactionId) -> Result<()>;

    /// Scans every tuple in file order. Each call starts a fresh scan.
    fn iter(&self, tid: TransactionId) -> Result<TupleIter<'_>>;

    fn descriptor(&self) -> &Arc<TupleDesc>;
}
