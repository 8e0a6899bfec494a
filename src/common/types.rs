use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static TXN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Transaction identifier. Created by the caller and passed into every
/// buffer pool and heap file call made on the transaction's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(u64);

impl TransactionId {
    /// Allocates a fresh, process-unique transaction id.
    pub fn new() -> Self {
        Self(TXN_COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}

/// Lock mode requested when fetching a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    Read,
    Write,
}

/// Identifies a cached page across every open file: the file identity
/// (its path) plus the page number within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageKey {
    pub file_id: Arc<str>,
    pub page_no: usize,
}

impl PageKey {
    pub fn new(file_id: Arc<str>, page_no: usize) -> Self {
        Self { file_id, page_no }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.file_id, self.page_no)
    }
}

/// Record identifier - page number plus slot within that page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    pub page_no: usize,
    pub slot_no: usize,
}

impl RecordId {
    pub fn new(page_no: usize, slot_no: usize) -> Self {
        Self { page_no, slot_no }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.page_no, self.slot_no)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_ids_are_unique() {
        let a = TransactionId::new();
        let b = TransactionId::new();
        assert_ne!(a, b);
        assert!(b.as_u64() > a.as_u64());
    }

    #[test]
    fn test_page_key_equality() {
        let file: Arc<str> = Arc::from("t.dat");
        let a = PageKey::new(file.clone(), 3);
        let b = PageKey::new(Arc::from("t.dat"), 3);
        let c = PageKey::new(file, 4);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "t.dat#3");
    }
}
