use std::{
  sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
  },
  time::{Duration, Instant},
};

/// A monotonic nanosecond time source.
///
/// The engine never reads the wall clock; every handler that needs a
/// timestamp asks its injected clock. Production shells use
/// [`SystemClock`], tests drive a [`ManualClock`] by hand.
pub trait Clock {
  /// Returns the current monotonic time in nanoseconds.
  fn now(&self) -> u64;
}

/// A [`Clock`] backed by [`Instant`], anchored at its creation time.
#[derive(Debug, Clone)]
pub struct SystemClock {
  start: Instant,
}

impl Default for SystemClock {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl SystemClock {
  /// Creates a clock whose zero point is now.
  #[inline]
  pub fn new() -> Self {
    Self {
      start: Instant::now(),
    }
  }
}

impl Clock for SystemClock {
  #[inline]
  fn now(&self) -> u64 {
    self.start.elapsed().as_nanos() as u64
  }
}

/// A hand-driven [`Clock`] for tests and simulations. Clones share the same
/// underlying counter, so a test can hold one handle while the engine holds
/// another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl ManualClock {
  /// Creates a clock at time zero.
  #[inline]
  pub fn new() -> Self {
    Self::default()
  }

  /// Moves the clock forward.
  #[inline]
  pub fn advance(&self, d: Duration) {
    self.0.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
  }

  /// Sets the clock to an absolute nanosecond value. The clock is
  /// monotonic; attempts to move it backward are ignored.
  pub fn set(&self, nanos: u64) {
    self.0.fetch_max(nanos, Ordering::SeqCst);
  }
}

impl Clock for ManualClock {
  #[inline]
  fn now(&self) -> u64 {
    self.0.load(Ordering::SeqCst)
  }
}

#[test]
fn test_manual_clock() {
  let c = ManualClock::new();
  assert_eq!(c.now(), 0);

  c.advance(Duration::from_millis(5));
  assert_eq!(c.now(), 5_000_000);

  let shared = c.clone();
  shared.advance(Duration::from_millis(1));
  assert_eq!(c.now(), 6_000_000);

  c.set(1_000_000);
  assert_eq!(c.now(), 6_000_000);

  c.set(7_000_000);
  assert_eq!(c.now(), 7_000_000);
}
