//! # ID Generation
//!
//! Injectable identifier generation for the coordinator.
//!
//! ## Why Injectable?
//! Identifier generation is a capability handed to the coordinator, not an
//! ambient global. Production uses UUID v4 (globally unique without
//! coordination); tests can inject a deterministic sequence and assert on
//! exact ids.

use std::sync::atomic::{AtomicU64, Ordering};

use uuid::Uuid;

/// A source of entity identifiers.
pub trait IdGenerator: Send + Sync {
    /// Returns a fresh unique identifier.
    fn generate(&self) -> String;
}

/// UUID v4 generator; the production default.
#[derive(Debug, Default, Clone)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}

/// Deterministic sequence generator for tests: `prefix-1`, `prefix-2`, ...
#[derive(Debug)]
pub struct SequenceGenerator {
    prefix: String,
    next: AtomicU64,
}

impl SequenceGenerator {
    /// Creates a sequence generator with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        SequenceGenerator {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequenceGenerator {
    fn generate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.prefix, n)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
