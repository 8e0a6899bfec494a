use std::collections::{HashMap, HashSet};

use crate::common::{PageKey, Permission, TransactionId};

/// Result of one attempt to take a page lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LockOutcome {
    Granted,
    /// The request conflicts with these holders
    Blocked(HashSet<TransactionId>),
}

/// Page-level shared/exclusive locks plus the wait-for graph.
///
/// A page key is in at most one of `shared` and `exclusive`. The table
/// itself never blocks; the buffer pool owns it behind a mutex and parks
/// callers on a condition variable when a request is blocked.
#[derive(Debug, Default)]
pub(crate) struct LockTable {
    shared: HashMap<PageKey, HashSet<TransactionId>>,
    exclusive: HashMap<PageKey, TransactionId>,
    /// waiter -> transactions it waits for
    waits_for: HashMap<TransactionId, HashSet<TransactionId>>,
    active: HashSet<TransactionId>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, tid: TransactionId) {
        self.active.insert(tid);
    }

    pub fn is_active(&self, tid: TransactionId) -> bool {
        self.active.contains(&tid)
    }

    /// Grants the lock if it does not conflict, otherwise reports who is in
    /// the way. Taking any lock registers the transaction as active.
    pub fn try_acquire(&mut self, tid: TransactionId, key: &PageKey, perm: Permission) -> LockOutcome {
        if let Some(&holder) = self.exclusive.get(key) {
            if holder == tid {
                return LockOutcome::Granted;
            }
            return LockOutcome::Blocked(HashSet::from([holder]));
        }

        match perm {
            Permission::Read => {
                self.shared.entry(key.clone()).or_default().insert(tid);
            }
            Permission::Write => {
                let others: HashSet<_> = self
                    .shared
                    .get(key)
                    .map(|holders| holders.iter().copied().filter(|&h| h != tid).collect())
                    .unwrap_or_default();
                if !others.is_empty() {
                    return LockOutcome::Blocked(others);
                }
                // sole reader upgrades in place
                self.shared.remove(key);
                self.exclusive.insert(key.clone(), tid);
            }
        }

        self.active.insert(tid);
        LockOutcome::Granted
    }

    /// Replaces the outgoing wait-for edges of `waiter`.
    pub fn set_waits(&mut self, waiter: TransactionId, blockers: HashSet<TransactionId>) {
        self.waits_for.insert(waiter, blockers);
    }

    pub fn clear_waits(&mut self, waiter: TransactionId) {
        self.waits_for.remove(&waiter);
    }

    /// Depth-first search from `start`; a back edge into the current path
    /// is a cycle.
    pub fn has_cycle(&self, start: TransactionId) -> bool {
        let mut visiting = HashSet::new();
        let mut visited = HashSet::new();
        self.visit(start, &mut visiting, &mut visited)
    }

    fn visit(
        &self,
        node: TransactionId,
        visiting: &mut HashSet<TransactionId>,
        visited: &mut HashSet<TransactionId>,
    ) -> bool {
        if visiting.contains(&node) {
            return true;
        }
        if !visited.insert(node) {
            return false;
        }

        visiting.insert(node);
        if let Some(next) = self.waits_for.get(&node) {
            for &neighbor in next {
                if self.visit(neighbor, visiting, visited) {
                    return true;
                }
            }
        }
        visiting.remove(&node);
        false
    }

    pub fn holds(&self, tid: TransactionId, key: &PageKey, perm: Permission) -> bool {
        let exclusive = self.exclusive.get(key) == Some(&tid);
        match perm {
            Permission::Write => exclusive,
            Permission::Read => {
                exclusive || self.shared.get(key).is_some_and(|s| s.contains(&tid))
            }
        }
    }

    /// Pages `tid` holds exclusively, in key order.
    pub fn exclusive_pages(&self, tid: TransactionId) -> Vec<PageKey> {
        let mut keys: Vec<_> = self
            .exclusive
            .iter()
            .filter(|(_, &holder)| holder == tid)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Drops every lock and wait edge of `tid` and forgets the transaction.
    pub fn release_all(&mut self, tid: TransactionId) {
        self.exclusive.retain(|_, holder| *holder != tid);
        self.shared.retain(|_, holders| {
            holders.remove(&tid);
            !holders.is_empty()
        });
        self.waits_for.remove(&tid);
        for blockers in self.waits_for.values_mut() {
            blockers.remove(&tid);
        }
        self.active.remove(&tid);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(page_no: usize) -> PageKey {
        PageKey::new(Arc::from("t.dat"), page_no)
    }

    #[test]
    fn test_readers_share() {
        let mut table = LockTable::new();
        let (a, b) = (TransactionId::new(), TransactionId::new());

        assert_eq!(table.try_acquire(a, &key(0), Permission::Read), LockOutcome::Granted);
        assert_eq!(table.try_acquire(b, &key(0), Permission::Read), LockOutcome::Granted);
        assert!(table.holds(a, &key(0), Permission::Read));
        assert!(table.holds(b, &key(0), Permission::Read));
        assert!(table.is_active(a));
    }

    #[test]
    fn test_writer_excludes() {
        let mut table = LockTable::new();
        let (a, b) = (TransactionId::new(), TransactionId::new());

        assert_eq!(table.try_acquire(a, &key(0), Permission::Write), LockOutcome::Granted);
        assert_eq!(
            table.try_acquire(b, &key(0), Permission::Read),
            LockOutcome::Blocked(HashSet::from([a]))
        );
        assert_eq!(
            table.try_acquire(b, &key(0), Permission::Write),
            LockOutcome::Blocked(HashSet::from([a]))
        );
        // re-entrant for the holder, in either mode
        assert_eq!(table.try_acquire(a, &key(0), Permission::Read), LockOutcome::Granted);
        assert!(table.holds(a, &key(0), Permission::Write));
    }

    #[test]
    fn test_upgrade() {
        let mut table = LockTable::new();
        let (a, b) = (TransactionId::new(), TransactionId::new());

        table.try_acquire(a, &key(0), Permission::Read);
        assert_eq!(table.try_acquire(a, &key(0), Permission::Write), LockOutcome::Granted);
        assert!(table.holds(a, &key(0), Permission::Write));

        table.try_acquire(b, &key(1), Permission::Read);
        table.try_acquire(a, &key(1), Permission::Read);
        assert_eq!(
            table.try_acquire(a, &key(1), Permission::Write),
            LockOutcome::Blocked(HashSet::from([b]))
        );
    }

    #[test]
    fn test_cycle_detection() {
        let mut table = LockTable::new();
        let (a, b, c) = (TransactionId::new(), TransactionId::new(), TransactionId::new());

        table.set_waits(a, HashSet::from([b]));
        table.set_waits(b, HashSet::from([c]));
        assert!(!table.has_cycle(a));

        table.set_waits(c, HashSet::from([a]));
        assert!(table.has_cycle(a));
        assert!(table.has_cycle(c));

        table.clear_waits(b);
        assert!(!table.has_cycle(a));
    }

    #[test]
    fn test_release_all() {
        let mut table = LockTable::new();
        let (a, b) = (TransactionId::new(), TransactionId::new());

        table.try_acquire(a, &key(0), Permission::Write);
        table.try_acquire(a, &key(1), Permission::Read);
        table.try_acquire(a, &key(2), Permission::Write);
        table.set_waits(b, HashSet::from([a]));

        assert_eq!(table.exclusive_pages(a), vec![key(0), key(2)]);

        table.release_all(a);
        assert!(table.exclusive_pages(a).is_empty());
        assert!(!table.holds(a, &key(1), Permission::Read));
        assert!(!table.is_active(a));
        assert!(!table.has_cycle(b));
        assert_eq!(table.try_acquire(b, &key(0), Permission::Write), LockOutcome::Granted);
    }
}
