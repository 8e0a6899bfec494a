pub mod disk;
pub mod page;

mod heap_file;
mod traits;

pub use heap_file::HeapFile;
pub use traits::{DbFile, Page, TupleIter};
