//! Busy-retry policy for both sides of the hand-off queue.
//!
//! Neither the producer (queue full) nor the worker (queue empty) may park
//! on an OS wait primitive; both retry in place. The policy bounds the
//! worst-case CPU burn of that choice: a configurable number of spin-loop
//! hints, then cooperative yields.

/// Tunable backoff applied between queue retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    spin_limit: u32,
}

impl RetryPolicy {
    /// Spin-hint attempts before the policy starts yielding the time slice.
    pub const DEFAULT_SPIN_LIMIT: u32 = 64;

    /// Create a policy that spins `spin_limit` times before yielding.
    ///
    /// `spin_limit == 0` yields on every retry; `u32::MAX` effectively never
    /// yields.
    pub const fn new(spin_limit: u32) -> Self {
        Self { spin_limit }
    }

    /// Configured spin threshold.
    pub const fn spin_limit(&self) -> u32 {
        self.spin_limit
    }

    /// Wait out one failed attempt. `attempt` counts consecutive failures
    /// since the last success; callers reset it to zero on progress.
    #[inline]
    pub fn backoff(&self, attempt: u32) {
        if attempt < self.spin_limit {
            std::hint::spin_loop();
        } else {
            std::thread::yield_now();
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SPIN_LIMIT)
    }
}
