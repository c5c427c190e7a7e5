use std::sync::atomic::{AtomicU64, Ordering};

/// The registry's singleton 64-bit monotonic counter (spec §3, §5).
///
/// The spec's process-shared-memory model would back this with a slot in
/// the mapped file so every process sees the same counter; in-process
/// this is one `AtomicU64`, which is the faithful single-process
/// equivalent — every mutation still increments it before the node lock
/// is released (spec §3 "Version monotonicity"), giving readers the same
/// happens-before guarantee spec §5 describes.
#[derive(Default)]
pub struct VersionCounter(AtomicU64);

impl VersionCounter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Acquire)
    }

    /// Bump the counter and return the new value. Must be called while
    /// the node lock is held, before the lock is released (spec §3).
    pub fn bump(&self) -> u64 {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_is_strictly_monotonic() {
        let version = VersionCounter::new();
        let before = version.get();
        let after = version.bump();
        assert!(after > before);
        assert_eq!(version.get(), after);
    }
}
