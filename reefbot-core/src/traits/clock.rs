//! Monotonic time source

/// Trait for a monotonic millisecond clock
///
/// Takes `&self` so several tasks can share one clock by reference.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u64;

    /// Milliseconds elapsed since `since_ms`
    fn elapsed_since(&self, since_ms: u64) -> u64 {
        self.now_ms().saturating_sub(since_ms)
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u64 {
        (**self).now_ms()
    }
}
