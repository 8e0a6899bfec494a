use std::collections::VecDeque;

use crate::common::PageKey;

/// Recency order of cached pages, least recently used at the front.
///
/// Holds exactly the keys present in the page cache; the buffer pool keeps
/// the two in step under its cache mutex.
#[derive(Debug, Default)]
pub(crate) struct LruReplacer {
    order: VecDeque<PageKey>,
}

impl LruReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `key` to the most recently used end, adding it if absent.
    pub fn touch(&mut self, key: &PageKey) {
        self.remove(key);
        self.order.push_back(key.clone());
    }

    pub fn remove(&mut self, key: &PageKey) -> bool {
        match self.order.iter().position(|k| k == key) {
            Some(pos) => {
                self.order.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Least recently used first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &PageKey> + '_ {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }
}
