use std::time::Duration;

/// The errors a [`Swim`](crate::Swim) instance can be constructed with.
///
/// The running protocol itself is infallible: handlers classify their
/// inputs and return outcomes instead of failing. Only a configuration the
/// protocol cannot run with is rejected, at construction time.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
  /// The probe interval is zero, which would stall the failure detector.
  #[error("ruswim: probe interval must be non-zero")]
  ZeroProbeInterval,
  /// The ping timeout is zero, which would time every probe out instantly.
  #[error("ruswim: ping timeout must be non-zero")]
  ZeroPingTimeout,
  /// Lifeguard's suspicion decay needs at least one expected confirmation.
  #[error("ruswim: max independent suspicions must be non-zero")]
  ZeroIndependentSuspicions,
  /// The suspicion timeout floor exceeds its ceiling.
  #[error("ruswim: suspicion timeout floor {min:?} exceeds ceiling {max:?}")]
  InvalidSuspicionBounds {
    /// The configured floor.
    min: Duration,
    /// The configured ceiling.
    max: Duration,
  },
  /// Gossip payloads are capped at zero entries, so nothing would ever
  /// disseminate.
  #[error("ruswim: gossip payloads must allow at least one entry")]
  ZeroGossipPayloadSize,
  /// Updates would be evicted from the gossip queue before a single send.
  #[error("ruswim: gossip retransmit limit must be non-zero")]
  ZeroGossipRetransmitLimit,
}
