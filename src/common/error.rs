use thiserror::Error;

use super::types::{PageKey, RecordId, TransactionId};

/// Database error types
#[derive(Error, Debug)]
pub enum DbError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No free slot on page {0}")]
    NoFreeSlot(usize),

    #[error("Invalid slot {} on page {}", .0.slot_no, .0.page_no)]
    InvalidSlot(RecordId),

    #[error("Slot {} on page {} is empty", .0.slot_no, .0.page_no)]
    EmptySlot(RecordId),

    #[error("Tuple has no record ID")]
    MissingRecordId,

    #[error("Page {0} not found in the buffer pool")]
    PageNotFound(PageKey),

    #[error("Page {page_no} does not exist, file has {page_count} pages")]
    PageOutOfRange { page_no: usize, page_count: usize },

    #[error("Deadlock detected, transaction {0} aborted")]
    Deadlock(TransactionId),

    #[error("Buffer pool is full, every cached page is in use")]
    BufferPoolFull,

    #[error("No tuple of {0} fits on a page")]
    UnusableDescriptor(String),

    #[error("Malformed page: {0}")]
    MalformedPage(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("String of {len} bytes exceeds field width {max}")]
    StringTooLong { len: usize, max: usize },

    #[error("Owning file of page {0} has been closed")]
    FileClosed(PageKey),

    #[error("Malformed CSV: {0}")]
    MalformedCsv(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;
