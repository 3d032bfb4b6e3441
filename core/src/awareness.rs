use std::time::Duration;

/// Local health events that feed the Local Health Multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AwarenessEvent {
  /// A probe we issued completed with an ack.
  SuccessfulProbe,
  /// A probe we issued got no answer and no peer was available to verify.
  FailedProbe,
  /// An indirect probe round ended without the expected nacks coming back.
  ProbeWithMissedNack,
  /// A peer claimed we are suspect and we had to refute it.
  RefutingSuspectMessageAboutSelf,
}

impl AwarenessEvent {
  #[inline]
  const fn delta(&self) -> i64 {
    match self {
      Self::SuccessfulProbe => -1,
      Self::FailedProbe | Self::ProbeWithMissedNack | Self::RefutingSuspectMessageAboutSelf => 1,
    }
  }
}

/// The Local Health Multiplier of the Lifeguard extensions.
///
/// A saturating counter in `[0, max]` tracking how trustworthy our own
/// failure detector currently is. Missed acks and refuted suspicions about
/// ourselves raise it; successful probes lower it. Timing parameters are
/// stretched by `1 + score`, so a degraded node probes more patiently
/// instead of flooding the cluster with false suspicions.
#[derive(Debug, Clone)]
pub struct Awareness {
  score: u64,
  max: u64,
}

impl Awareness {
  /// Creates an awareness with score `0` and the given ceiling.
  #[inline]
  pub const fn new(max: u64) -> Self {
    Self { score: 0, max }
  }

  /// Records a local health event, saturating at `0` and `max`.
  pub fn record(&mut self, event: AwarenessEvent) {
    let old = self.score;
    self.score = self
      .score
      .saturating_add_signed(event.delta())
      .min(self.max);
    if self.score != old {
      tracing::debug!(
        target: "ruswim.awareness",
        event = ?event,
        old,
        new = self.score,
        "local health changed"
      );
    }
  }

  /// Returns the current health score. `0` means healthy.
  #[inline]
  pub const fn score(&self) -> u64 {
    self.score
  }

  /// Scales a base timing parameter by the current health: `d * (1 + score)`.
  #[inline]
  pub fn scale(&self, d: Duration) -> Duration {
    d.saturating_mul((1 + self.score) as u32)
  }
}
