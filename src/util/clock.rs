//! Time helpers: wall-clock timestamps and the injectable tick clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Source of logical execution ticks.
///
/// The execution engine calls [`TickClock::tick`] once per consumed tick. This
/// is the engine's only suspension point.
pub trait TickClock: Send + Sync + 'static {
    /// Advance by one tick, suspending the caller for the tick interval.
    fn tick(&self);
}

/// Clock that sleeps the calling thread for a fixed interval per tick.
#[derive(Debug, Clone, Copy)]
pub struct SystemTickClock {
    interval: Duration,
}

impl SystemTickClock {
    /// Create a clock with the given tick interval.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Configured tick interval.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for SystemTickClock {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

impl TickClock for SystemTickClock {
    fn tick(&self) {
        if !self.interval.is_zero() {
            std::thread::sleep(self.interval);
        }
    }
}

/// Logical clock that never sleeps and only counts ticks.
///
/// Clones share the same counter.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    ticks: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock at tick zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ticks elapsed so far.
    #[must_use]
    pub fn elapsed(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }
}

impl TickClock for ManualClock {
    fn tick(&self) {
        self.ticks.fetch_add(1, Ordering::AcqRel);
    }
}

impl<C: TickClock> TickClock for Arc<C> {
    fn tick(&self) {
        self.as_ref().tick();
    }
}
