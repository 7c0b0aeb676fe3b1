//! Backend discriminants for task implementations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Concurrency backend a task implementation is built on.
///
/// The discriminant is a static property of each implementation type
/// ([`TaskImpl::BACKEND`](crate::TaskImpl::BACKEND)) and drives the
/// registration dispatch policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Single-threaded reference implementation.
    Seq,
    /// Distributed across launcher-spawned worker processes.
    Proc,
    /// Work-stealing thread pool.
    Rayon,
    /// Manually spawned OS threads.
    Threads,
    /// Vectorized lane-split implementation.
    Simd,
    /// Combined process and thread parallelism.
    All,
}

impl Backend {
    /// Stable lowercase name used when composing benchmark names.
    pub fn name(self) -> &'static str {
        match self {
            Backend::Seq => "seq",
            Backend::Proc => "proc",
            Backend::Rayon => "rayon",
            Backend::Threads => "threads",
            Backend::Simd => "simd",
            Backend::All => "all",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_lowercase_and_stable() {
        for (backend, name) in [
            (Backend::Seq, "seq"),
            (Backend::Proc, "proc"),
            (Backend::Rayon, "rayon"),
            (Backend::Threads, "threads"),
            (Backend::Simd, "simd"),
            (Backend::All, "all"),
        ] {
            assert_eq!(backend.name(), name);
            assert_eq!(backend.to_string(), name);
        }
    }
}
