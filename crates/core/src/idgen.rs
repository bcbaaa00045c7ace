//! Monotonic ID generation

use std::sync::atomic::{self, AtomicU64};

/// Thread-safe, monotonically increasing ID generator.
///
/// IDs are never reused; exhausting the 64-bit space panics.
#[derive(Debug)]
pub struct IdGenerator {
    next_id: AtomicU64,
}

impl IdGenerator {
    /// Create a generator whose first ID is `first`
    pub const fn starting_at(first: u64) -> Self {
        Self {
            next_id: AtomicU64::new(first),
        }
    }

    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    /// Get the next available ID
    pub fn next_id(&self) -> u64 {
        let id = self.next_id.fetch_add(1, atomic::Ordering::Relaxed);
        assert!(id != u64::MAX, "id space exhausted");
        id
    }

    /// Peek at the ID the next call will return
    pub fn peek(&self) -> u64 {
        self.next_id.load(atomic::Ordering::Relaxed)
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_generation() {
        let gen = IdGenerator::new();
        let id1 = gen.next_id();
        let id2 = gen.next_id();
        assert_ne!(id1, id2);
        assert!(id2 > id1);
    }

    #[test]
    fn test_starting_at() {
        let gen = IdGenerator::starting_at(10);
        assert_eq!(gen.peek(), 10);
        assert_eq!(gen.next_id(), 10);
        assert_eq!(gen.next_id(), 11);
    }
}
