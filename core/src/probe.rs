use rand::{seq::SliceRandom, Rng};
use ruswim_types::Node;

/// The round-robin probe rotation.
///
/// Holds every probeable peer exactly once and a rotating cursor. New peers
/// are spliced in at a random position so the worst-case detection time
/// stays low on average; appending instead would push every newcomer to the
/// end of the rotation and inflate it.
#[derive(Debug, Default)]
pub(crate) struct ProbeList {
  entries: Vec<Node>,
  next_index: usize,
}

impl ProbeList {
  #[inline]
  pub(crate) fn new() -> Self {
    Self::default()
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.entries.len()
  }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  #[inline]
  pub(crate) fn contains(&self, node: &Node) -> bool {
    self.entries.contains(node)
  }

  #[cfg(test)]
  pub(crate) fn next_index(&self) -> usize {
    self.next_index
  }

  /// Splices `node` in at a uniformly random position. When the insertion
  /// lands at or before the cursor, the cursor moves right by one so the
  /// member that was up next still goes next and the newcomer is neither
  /// skipped nor probed twice in the same traversal.
  pub(crate) fn insert(&mut self, node: Node, rng: &mut impl Rng) {
    debug_assert!(!self.contains(&node), "{node} is already in the probe list");

    if self.entries.is_empty() {
      self.entries.push(node);
      self.next_index = 0;
      return;
    }

    let at = rng.gen_range(0..=self.entries.len());
    self.entries.insert(at, node);
    if at <= self.next_index {
      self.next_index += 1;
    }
  }

  /// Drops `node` from the rotation, repairing the cursor so no survivor is
  /// skipped.
  pub(crate) fn remove(&mut self, node: &Node) {
    let Some(at) = self.entries.iter().position(|n| n == node) else {
      return;
    };

    self.entries.remove(at);
    if at < self.next_index {
      self.next_index -= 1;
    }
    if self.next_index >= self.entries.len() {
      self.next_index = 0;
    }
  }

  /// Returns the next peer to probe and advances the cursor. Completing a
  /// full traversal reshuffles the rotation before the next one starts, per
  /// SWIM's round-robin-with-reshuffle schedule.
  pub(crate) fn next(&mut self, rng: &mut impl Rng) -> Option<Node> {
    if self.is_empty() {
      return None;
    }

    let node = self.entries[self.next_index].clone();
    self.next_index += 1;
    if self.next_index == self.len() {
      self.next_index = 0;
      self.entries.shuffle(rng);
    }
    Some(node)
  }
}
