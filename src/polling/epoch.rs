//! Epoch tokens
//!
//! A monotonically increasing generation shared between an owner and the
//! async continuations it spawns. A continuation applies its result only if
//! its token is still current.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct Epoch {
    current: Arc<AtomicU64>,
}

impl Epoch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation; every older token goes stale
    pub fn advance(&self) -> EpochToken {
        let value = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        EpochToken {
            value,
            current: Arc::clone(&self.current),
        }
    }

    /// Token for the current generation
    pub fn token(&self) -> EpochToken {
        EpochToken {
            value: self.current.load(Ordering::SeqCst),
            current: Arc::clone(&self.current),
        }
    }

    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct EpochToken {
    value: u64,
    current: Arc<AtomicU64>,
}

impl EpochToken {
    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_invalidates_older_tokens() {
        let epoch = Epoch::new();
        let first = epoch.advance();
        assert!(first.is_current());

        let second = epoch.advance();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert!(second.value() > first.value());
    }

    #[test]
    fn test_clones_share_generation() {
        let epoch = Epoch::new();
        let token = epoch.clone().advance();
        assert_eq!(epoch.current(), token.value());
        assert!(epoch.token().is_current());
    }
}
