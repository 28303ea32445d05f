//! Round-robin worker ring.
//!
//! Hands out workers in order: the selected worker moves to the back of
//! the ring, so `n` consecutive selections over `n` workers visit each
//! worker exactly once. Owned by a single `ChunkMapping`; not shared.

use std::collections::VecDeque;

#[derive(Debug, Clone, Default)]
pub struct WorkerRing {
    workers: VecDeque<String>,
}

impl WorkerRing {
    pub fn new(workers: impl IntoIterator<Item = String>) -> Self {
        Self {
            workers: workers.into_iter().collect(),
        }
    }

    /// Select the next worker and rotate it to the back.
    ///
    /// Returns `None` if the ring is empty.
    pub fn next(&mut self) -> Option<String> {
        let worker = self.workers.pop_front()?;
        self.workers.push_back(worker.clone());
        Some(worker)
    }

    pub fn contains(&self, worker: &str) -> bool {
        self.workers.iter().any(|w| w == worker)
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Current order, next selection first.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.workers.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring(names: &[&str]) -> WorkerRing {
        WorkerRing::new(names.iter().map(|s| s.to_string()))
    }

    #[test]
    fn ring_cycles_in_order() {
        let mut ring = ring(&["w1", "w2", "w3"]);

        assert_eq!(ring.next().as_deref(), Some("w1"));
        assert_eq!(ring.next().as_deref(), Some("w2"));
        assert_eq!(ring.next().as_deref(), Some("w3"));
        assert_eq!(ring.next().as_deref(), Some("w1")); // wraps
        assert_eq!(ring.iter().collect::<Vec<_>>(), vec!["w2", "w3", "w1"]);
    }

    #[test]
    fn empty_ring_returns_none() {
        let mut ring = WorkerRing::default();
        assert!(ring.is_empty());
        assert_eq!(ring.next(), None);
    }

    #[test]
    fn single_worker_always_selected() {
        let mut ring = ring(&["only"]);
        for _ in 0..5 {
            assert_eq!(ring.next().as_deref(), Some("only"));
        }
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn contains_checks_membership() {
        let ring = ring(&["w1", "w2"]);
        assert!(ring.contains("w2"));
        assert!(!ring.contains("w3"));
    }
}
