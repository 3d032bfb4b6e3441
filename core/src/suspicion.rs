use std::time::Duration;

/// Computes the Lifeguard suspicion timeout for a member with
/// `confirmations` independent suspicions against it.
///
/// The timeout starts at `max` for a lone suspicion and decays
/// logarithmically toward `min` as confirmations accumulate, reaching `min`
/// once `max_confirmations` peers agree:
///
/// ```text
/// timeout = max(min, max - (max - min) * log2(C + 1) / log2(K + 1))
/// ```
pub(crate) fn suspicion_timeout(
  confirmations: usize,
  max_confirmations: usize,
  min: Duration,
  max: Duration,
) -> Duration {
  if min >= max {
    return min;
  }

  let frac =
    ((confirmations as f64) + 1.0).log2() / ((max_confirmations as f64) + 1.0).log2();
  let decayed = max.as_secs_f64() - (max - min).as_secs_f64() * frac;
  if decayed <= min.as_secs_f64() {
    min
  } else {
    Duration::from_secs_f64(decayed)
  }
}
