use crate::prelude::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counter identifying the authoritative render pass of one map
#[derive(Debug, Clone, Default)]
pub struct RenderGeneration {
    counter: Arc<AtomicU64>,
}

impl RenderGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Starts a new generation, superseding every outstanding token
    pub fn advance(&self) -> GenerationToken {
        let generation = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        GenerationToken {
            generation,
            counter: Arc::clone(&self.counter),
        }
    }
}

/// Captured generation of one render pass
#[derive(Debug, Clone)]
pub struct GenerationToken {
    generation: u64,
    counter: Arc<AtomicU64>,
}

impl GenerationToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// False once a newer pass has started
    pub fn is_current(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_supersedes_previous_token() {
        let generation = RenderGeneration::new();
        assert_eq!(generation.current(), 0);

        let first = generation.advance();
        assert_eq!(first.generation(), 1);
        assert!(first.is_current());

        let second = generation.advance();
        assert!(!first.is_current());
        assert!(second.is_current());
        assert_eq!(generation.current(), 2);
    }

    #[test]
    fn test_maps_do_not_share_generations() {
        let a = RenderGeneration::new();
        let b = RenderGeneration::new();
        let token = a.advance();
        b.advance();
        b.advance();
        assert!(token.is_current());
    }
}
