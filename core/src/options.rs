use std::time::Duration;

use crate::error::Error;

/// The configuration for creating a [`Swim`](crate::Swim) instance.
#[viewit::viewit(getters(vis_all = "pub"), setters(vis_all = "pub", prefix = "with"))]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Options {
  /// The base period between probe rounds. The effective period is scaled
  /// by the Local Health Multiplier, so a degraded node probes less often.
  #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
  #[viewit(
    getter(const, attrs(doc = "Returns the base period between probe rounds.")),
    setter(const, attrs(doc = "Sets the base period between probe rounds."))
  )]
  probe_interval: Duration,

  /// The base amount of time to wait for an ack to a single ping. The
  /// effective timeout is scaled by the Local Health Multiplier.
  #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
  #[viewit(
    getter(const, attrs(doc = "Returns the base per-ping timeout.")),
    setter(const, attrs(doc = "Sets the base per-ping timeout."))
  )]
  ping_timeout: Duration,

  /// How many peers a failed direct probe is retried through. Each selected
  /// peer is asked to ping the unresponsive target on our behalf.
  #[viewit(
    getter(
      const,
      attrs(doc = "Returns how many peers a failed direct probe is retried through.")
    ),
    setter(
      const,
      attrs(doc = "Sets how many peers a failed direct probe is retried through.")
    )
  )]
  indirect_probe_count: usize,

  /// The maximum number of member records piggybacked on a single probe or
  /// probe response.
  #[viewit(
    getter(
      const,
      attrs(doc = "Returns the maximum number of member records per gossip payload.")
    ),
    setter(
      const,
      attrs(doc = "Sets the maximum number of member records per gossip payload.")
    )
  )]
  max_gossip_messages_per_payload: usize,

  /// How many times a single membership update is re-sent before it decays
  /// out of the gossip queue. A value around `3 * log(cluster size)` gives
  /// every update a high probability of reaching everyone.
  #[viewit(
    getter(
      const,
      attrs(doc = "Returns how many times a membership update is re-sent before it decays.")
    ),
    setter(
      const,
      attrs(doc = "Sets how many times a membership update is re-sent before it decays.")
    )
  )]
  max_gossip_count_per_message: u32,

  /// The ceiling of the Local Health Multiplier. `0` disables Lifeguard's
  /// local health awareness entirely.
  #[viewit(
    getter(
      const,
      attrs(doc = "Returns the ceiling of the Local Health Multiplier.")
    ),
    setter(
      const,
      attrs(doc = "Sets the ceiling of the Local Health Multiplier.")
    )
  )]
  max_local_health_multiplier: u64,

  /// How many independent suspicions about one member are accumulated, and
  /// the `K` at which the suspicion timeout bottoms out at its minimum.
  #[viewit(
    getter(
      const,
      attrs(doc = "Returns how many independent suspicions are accumulated per member.")
    ),
    setter(
      const,
      attrs(doc = "Sets how many independent suspicions are accumulated per member.")
    )
  )]
  max_independent_suspicions: usize,

  /// The floor of the suspicion timeout, reached once
  /// `max_independent_suspicions` peers agree a member is suspect.
  #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
  #[viewit(
    getter(const, attrs(doc = "Returns the floor of the suspicion timeout.")),
    setter(const, attrs(doc = "Sets the floor of the suspicion timeout."))
  )]
  suspicion_timeout_min: Duration,

  /// The ceiling of the suspicion timeout, used while we are the only
  /// suspector.
  #[cfg_attr(feature = "serde", serde(with = "humantime_serde"))]
  #[viewit(
    getter(const, attrs(doc = "Returns the ceiling of the suspicion timeout.")),
    setter(const, attrs(doc = "Sets the ceiling of the suspicion timeout."))
  )]
  suspicion_timeout_max: Duration,

  /// Whether a suspect whose timeout expires becomes unreachable first.
  /// When disabled, expired suspects are declared dead directly.
  #[viewit(
    getter(
      const,
      attrs(doc = "Returns whether expired suspects become unreachable before dead.")
    ),
    setter(
      const,
      attrs(doc = "Sets whether expired suspects become unreachable before dead.")
    )
  )]
  enable_unreachable_state: bool,

  /// Seeds the engine's random source (probe-list insertion points and
  /// indirect-probe sampling). `None` seeds from entropy; tests pin it.
  #[viewit(
    getter(const, attrs(doc = "Returns the seed for the engine's random source.")),
    setter(const, attrs(doc = "Sets the seed for the engine's random source."))
  )]
  rng_seed: Option<u64>,
}

impl Default for Options {
  #[inline]
  fn default() -> Self {
    Self::new()
  }
}

impl Options {
  /// Returns a new instance of `Options` with defaults tuned for a LAN
  /// environment.
  #[inline]
  pub const fn new() -> Self {
    Self {
      probe_interval: Duration::from_secs(1),
      ping_timeout: Duration::from_millis(500),
      indirect_probe_count: 3,
      max_gossip_messages_per_payload: 12,
      max_gossip_count_per_message: 8,
      max_local_health_multiplier: 8,
      max_independent_suspicions: 3,
      suspicion_timeout_min: Duration::from_secs(4),
      suspicion_timeout_max: Duration::from_secs(24),
      enable_unreachable_state: true,
      rng_seed: None,
    }
  }

  /// Checks the configuration for values the protocol cannot run with.
  pub fn validate(&self) -> Result<(), Error> {
    if self.probe_interval.is_zero() {
      return Err(Error::ZeroProbeInterval);
    }
    if self.ping_timeout.is_zero() {
      return Err(Error::ZeroPingTimeout);
    }
    if self.max_independent_suspicions == 0 {
      return Err(Error::ZeroIndependentSuspicions);
    }
    if self.suspicion_timeout_min > self.suspicion_timeout_max {
      return Err(Error::InvalidSuspicionBounds {
        min: self.suspicion_timeout_min,
        max: self.suspicion_timeout_max,
      });
    }
    if self.max_gossip_messages_per_payload == 0 {
      return Err(Error::ZeroGossipPayloadSize);
    }
    if self.max_gossip_count_per_message == 0 {
      return Err(Error::ZeroGossipRetransmitLimit);
    }
    Ok(())
  }
}
