use std::{
  cmp::Reverse,
  collections::{BinaryHeap, HashMap},
};

use ruswim_types::{Member, Node};

/// An entry queued for dissemination. Ordered by how often it has been sent,
/// then by insertion order, so the least-gossiped update always sits at the
/// heap root.
#[derive(Debug, Clone)]
struct Entry {
  transmits: u32,
  seq: u64,
  member: Member,
}

impl PartialEq for Entry {
  fn eq(&self, other: &Self) -> bool {
    self.transmits == other.transmits && self.seq == other.seq
  }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
  fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Entry {
  fn cmp(&self, other: &Self) -> core::cmp::Ordering {
    (self.transmits, self.seq).cmp(&(other.transmits, other.seq))
  }
}

/// The buffer of pending membership gossip.
///
/// A min-heap keyed by transmit count with one live entry per node: pushing
/// an update for a node invalidates whatever was queued for it before.
/// Superseded heap entries are dropped lazily when they surface at the
/// root. An entry is evicted after `max_transmits` sends.
#[derive(Debug)]
pub(crate) struct GossipQueue {
  heap: BinaryHeap<Reverse<Entry>>,
  live: HashMap<Node, u64>,
  next_seq: u64,
  max_transmits: u32,
}

impl GossipQueue {
  pub(crate) fn new(max_transmits: u32) -> Self {
    Self {
      heap: BinaryHeap::new(),
      live: HashMap::new(),
      next_seq: 0,
      max_transmits,
    }
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.live.len()
  }

  #[inline]
  pub(crate) fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Queues `member` for dissemination with a fresh transmit count,
  /// replacing any entry already queued for the same node.
  pub(crate) fn push(&mut self, member: Member) {
    let seq = self.next_seq;
    self.next_seq += 1;
    self.live.insert(member.node().clone(), seq);
    self.heap.push(Reverse(Entry {
      transmits: 0,
      seq,
      member,
    }));
  }

  /// Drains up to `limit` entries, least-transmitted first. Every drained
  /// entry is charged one transmit and requeued if it has transmits left;
  /// entries for `already_sent` are charged but not returned (their record
  /// went out ahead of the drain).
  pub(crate) fn drain(&mut self, limit: usize, already_sent: Option<&Node>) -> Vec<Member> {
    let mut out = Vec::new();
    let mut requeue = Vec::new();

    let mut drained = 0;
    while drained < limit {
      let Some(Reverse(entry)) = self.heap.pop() else {
        break;
      };
      if self.live.get(entry.member.node()) != Some(&entry.seq) {
        // Superseded by a later push, or removed.
        continue;
      }
      drained += 1;

      if already_sent != Some(entry.member.node()) {
        out.push(entry.member.clone());
      }

      let transmits = entry.transmits + 1;
      if transmits < self.max_transmits {
        requeue.push(Entry { transmits, ..entry });
      } else {
        self.live.remove(entry.member.node());
      }
    }

    // Requeue after the drain so nothing is sent twice in one payload.
    for entry in requeue {
      self.heap.push(Reverse(entry));
    }
    out
  }

  #[cfg(test)]
  pub(crate) fn get(&self, node: &Node) -> Option<(u32, &Member)> {
    let seq = self.live.get(node)?;
    self
      .heap
      .iter()
      .find(|Reverse(e)| e.seq == *seq)
      .map(|Reverse(e)| (e.transmits, &e.member))
  }
}
