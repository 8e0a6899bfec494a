use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::{Condvar, Mutex, RwLock};

use crate::common::{
    DbError, PageKey, Permission, Result, TransactionId, DEFAULT_BUFFER_POOL_SIZE,
};
use crate::storage::page::HeapPage;
use crate::storage::{DbFile, Page};

use super::lock_manager::{LockOutcome, LockTable};
use super::lru_replacer::LruReplacer;

/// Shared handle to a cached page.
///
/// The latch guards the in-memory page only; transactional isolation comes
/// from the page locks taken in [`BufferPool::get_page`]. While a caller
/// holds a handle the page is pinned and will not be evicted.
pub type PageRef = Arc<RwLock<HeapPage>>;

/// Cached pages and their recency order, always updated together
struct PageCache {
    pages: HashMap<PageKey, PageRef>,
    lru: LruReplacer,
}

/// Fixed-capacity page cache that also owns concurrency control.
///
/// Every page access in the system goes through [`BufferPool::get_page`],
/// which takes a shared or exclusive page lock on behalf of a transaction
/// before the page is faulted in. Locks are held until
/// [`BufferPool::commit_transaction`] or [`BufferPool::abort_transaction`].
///
/// Durability is NO-STEAL/FORCE without a log: commit writes every page the
/// transaction locked exclusively, abort drops them from the cache.
///
/// Two mutexes guard disjoint state. `locks` covers the lock tables, the
/// wait-for graph and the active set; `cache` covers the page map and LRU
/// order. Disk reads and commit-time writes happen outside both.
pub struct BufferPool {
    /// Maximum number of cached pages
    capacity: usize,
    locks: Mutex<LockTable>,
    /// Signalled whenever a transaction releases its locks
    lock_released: Condvar,
    cache: Mutex<PageCache>,
}

impl BufferPool {
    /// Creates an empty pool that caches at most `capacity` pages.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            locks: Mutex::new(LockTable::new()),
            lock_released: Condvar::new(),
            cache: Mutex::new(PageCache {
                pages: HashMap::with_capacity(capacity),
                lru: LruReplacer::new(),
            }),
        }
    }

    /// Marks `tid` as running. Taking a lock in `get_page` does the same, so
    /// this is optional.
    pub fn begin_transaction(&self, tid: TransactionId) {
        self.locks.lock().begin(tid);
    }

    /// Returns page `page_no` of `file`, locked for `tid` with `perm`.
    ///
    /// Blocks while another transaction holds a conflicting lock. If waiting
    /// would close a cycle in the wait-for graph, `tid` is aborted and
    /// [`DbError::Deadlock`] is returned. A page past the end of the file
    /// fails with [`DbError::PageOutOfRange`] before any lock is taken.
    pub fn get_page(
        &self,
        file: &dyn DbFile,
        page_no: usize,
        tid: TransactionId,
        perm: Permission,
    ) -> Result<PageRef> {
        // pages reach disk before they can be cached
        let page_count = file.num_pages()?;
        if page_no >= page_count {
            return Err(DbError::PageOutOfRange {
                page_no,
                page_count,
            });
        }
        let key = file.page_key(page_no);
        self.acquire_lock(tid, &key, perm)?;

        if let Some(page) = self.lookup(&key) {
            return Ok(page);
        }

        debug!("page fault on {}", key);
        let page = file.read_page(page_no)?;

        let mut cache = self.cache.lock();
        // another caller may have faulted the same page in meanwhile
        if let Some(page) = cache.pages.get(&key).cloned() {
            cache.lru.touch(&key);
            return Ok(page);
        }
        if cache.pages.len() >= self.capacity {
            self.evict(&mut cache)?;
        }

        let page = Arc::new(RwLock::new(page));
        cache.pages.insert(key.clone(), Arc::clone(&page));
        cache.lru.touch(&key);
        Ok(page)
    }

    fn lookup(&self, key: &PageKey) -> Option<PageRef> {
        let mut cache = self.cache.lock();
        let page = cache.pages.get(key).cloned()?;
        cache.lru.touch(key);
        Some(page)
    }

    fn acquire_lock(&self, tid: TransactionId, key: &PageKey, perm: Permission) -> Result<()> {
        let mut locks = self.locks.lock();
        loop {
            match locks.try_acquire(tid, key, perm) {
                LockOutcome::Granted => {
                    locks.clear_waits(tid);
                    return Ok(());
                }
                LockOutcome::Blocked(blockers) => {
                    locks.set_waits(tid, blockers);
                    if locks.has_cycle(tid) {
                        // the victim stops waiting before its locks go
                        locks.clear_waits(tid);
                        drop(locks);
                        warn!("deadlock on {}, aborting {}", key, tid);
                        self.abort_transaction(tid);
                        return Err(DbError::Deadlock(tid));
                    }
                    self.lock_released.wait(&mut locks);
                }
            }
        }
    }

    /// Evicts one unpinned page, preferring the least recently used clean
    /// one. When every candidate is dirty they are all flushed first and the
    /// least recently used is dropped.
    fn evict(&self, cache: &mut PageCache) -> Result<()> {
        let candidates: Vec<PageKey> = cache
            .lru
            .iter()
            .filter(|key| {
                cache
                    .pages
                    .get(*key)
                    .is_some_and(|page| Arc::strong_count(page) == 1)
            })
            .cloned()
            .collect();

        let clean = candidates.iter().find(|key| {
            cache
                .pages
                .get(*key)
                .is_some_and(|page| !page.read().is_dirty())
        });

        let victim = match clean {
            Some(key) => key.clone(),
            None => {
                let first = candidates.first().cloned().ok_or(DbError::BufferPoolFull)?;
                warn!("all {} evictable pages are dirty, flushing", candidates.len());
                for key in &candidates {
                    let page = cache
                        .pages
                        .get(key)
                        .ok_or_else(|| DbError::PageNotFound(key.clone()))?;
                    Self::flush_cached(key, page)?;
                }
                first
            }
        };

        let page = cache
            .pages
            .remove(&victim)
            .ok_or_else(|| DbError::PageNotFound(victim.clone()))?;
        cache.lru.remove(&victim);
        Self::flush_cached(&victim, &page)?;
        debug!("evicted {}, {} pages cached", victim, cache.lru.len());
        Ok(())
    }

    /// Writes `page` through its owning file if it is dirty.
    fn flush_cached(key: &PageKey, page: &PageRef) -> Result<()> {
        let mut page = page.write();
        if !page.is_dirty() {
            return Ok(());
        }
        let file = page
            .owning_file()
            .ok_or_else(|| DbError::FileClosed(key.clone()))?;
        file.flush_page(&mut page)?;
        debug!("flushed {}", key);
        Ok(())
    }

    /// Writes every dirty cached page to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        let pages: Vec<(PageKey, PageRef)> = self
            .cache
            .lock()
            .pages
            .iter()
            .map(|(key, page)| (key.clone(), Arc::clone(page)))
            .collect();

        for (key, page) in &pages {
            Self::flush_cached(key, page)?;
        }
        Ok(())
    }

    /// Drops `key` from the cache without writing it.
    pub fn discard_page(&self, key: &PageKey) {
        let mut cache = self.cache.lock();
        if cache.pages.remove(key).is_some() {
            cache.lru.remove(key);
            debug!("discarded {}", key);
        }
    }

    /// Forces every page `tid` holds exclusively to disk, then releases all
    /// of its locks.
    ///
    /// If a write fails the locks are kept and the error is returned; the
    /// caller should abort.
    pub fn commit_transaction(&self, tid: TransactionId) -> Result<()> {
        let exclusive = self.locks.lock().exclusive_pages(tid);

        for key in &exclusive {
            let page = self.cache.lock().pages.get(key).cloned();
            if let Some(page) = page {
                Self::flush_cached(key, &page)?;
            }
        }

        self.release(tid);
        info!("committed {} ({} pages forced)", tid, exclusive.len());
        Ok(())
    }

    /// Drops every page `tid` holds exclusively from the cache without
    /// writing it, then releases all of its locks.
    pub fn abort_transaction(&self, tid: TransactionId) {
        let exclusive = self.locks.lock().exclusive_pages(tid);
        for key in &exclusive {
            self.discard_page(key);
        }

        self.release(tid);
        info!("aborted {} ({} pages discarded)", tid, exclusive.len());
    }

    fn release(&self, tid: TransactionId) {
        self.locks.lock().release_all(tid);
        self.lock_released.notify_all();
    }

    /// Page numbers of `file_id` currently cached, most recently used first.
    pub fn resident_pages(&self, file_id: &str) -> Vec<usize> {
        self.cache
            .lock()
            .lru
            .iter()
            .rev()
            .filter(|key| &*key.file_id == file_id)
            .map(|key| key.page_no)
            .collect()
    }

    /// Returns the cached page without locking it. Only for hints that are
    /// re-checked after a proper `get_page`.
    pub(crate) fn peek_page(&self, key: &PageKey) -> Option<PageRef> {
        self.cache.lock().pages.get(key).cloned()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn cached_page_count(&self) -> usize {
        self.cache.lock().pages.len()
    }

    pub fn is_cached(&self, key: &PageKey) -> bool {
        self.cache.lock().pages.contains_key(key)
    }

    /// Whether `tid` holds a lock on `key` at least as strong as `perm`.
    pub fn holds_lock(&self, tid: TransactionId, key: &PageKey, perm: Permission) -> bool {
        self.locks.lock().holds(tid, key, perm)
    }

    pub fn is_active(&self, tid: TransactionId) -> bool {
        self.locks.lock().is_active(tid)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_POOL_SIZE)
    }
}
