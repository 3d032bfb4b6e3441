use super::{Node, Status};

/// A single member of the cluster: a node and the status the local instance
/// currently believes it has.
///
/// This is the record that travels in gossip payloads. The engine keeps its
/// own bookkeeping (protocol period, suspicion start time) alongside it.
#[viewit::viewit(setters(prefix = "with"))]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Member {
  /// The node
  #[viewit(
    getter(const, style = "ref", attrs(doc = "Returns the node")),
    setter(attrs(doc = "Sets the node (Builder pattern)"))
  )]
  node: Node,
  /// The status
  #[viewit(
    getter(const, style = "ref", attrs(doc = "Returns the status")),
    setter(attrs(doc = "Sets the status (Builder pattern)"))
  )]
  status: Status,
}

impl Member {
  /// Creates a new member record.
  #[inline]
  pub const fn new(node: Node, status: Status) -> Self {
    Self { node, status }
  }

  /// Consumes the record, returning the node and status.
  #[inline]
  pub fn into_parts(self) -> (Node, Status) {
    (self.node, self.status)
  }
}

impl core::fmt::Display for Member {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}:{}", self.node, self.status)
  }
}
