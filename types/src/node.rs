use std::net::SocketAddr;

use smol_str::SmolStr;

/// The identity of a peer in the cluster.
///
/// A node is keyed by its gossip address: two `Node` values with the same
/// `addr` are the same peer, regardless of name or generation. The
/// `generation` tag changes when a process restarts on the same address, so
/// shells can tell a rebooted peer from the one they were talking to before.
#[viewit::viewit(setters(prefix = "with"))]
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Node {
  /// The human readable name of the node, only used for display and logging.
  #[viewit(
    getter(const, style = "ref", attrs(doc = "Returns the name of the node")),
    setter(attrs(doc = "Sets the name of the node (Builder pattern)"))
  )]
  id: SmolStr,
  /// The gossip address of the node. This is the identity key.
  #[viewit(
    getter(const, attrs(doc = "Returns the gossip address of the node")),
    setter(const, attrs(doc = "Sets the gossip address of the node (Builder pattern)"))
  )]
  addr: SocketAddr,
  /// The restart generation of the node.
  #[viewit(
    getter(const, attrs(doc = "Returns the restart generation of the node")),
    setter(const, attrs(doc = "Sets the restart generation of the node (Builder pattern)"))
  )]
  generation: u64,
}

impl Node {
  /// Creates a new node with generation `0`.
  #[inline]
  pub fn new(id: impl Into<SmolStr>, addr: SocketAddr) -> Self {
    Self {
      id: id.into(),
      addr,
      generation: 0,
    }
  }
}

impl core::fmt::Display for Node {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}({})", self.id, self.addr)
  }
}

// Identity is the address alone. `Ord`/`Hash` must agree with `Eq`, so they
// are all hand written over `addr`.
impl PartialEq for Node {
  fn eq(&self, other: &Self) -> bool {
    self.addr == other.addr
  }
}

impl Eq for Node {}

impl core::hash::Hash for Node {
  fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
    self.addr.hash(state);
  }
}

impl PartialOrd for Node {
  fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Node {
  fn cmp(&self, other: &Self) -> core::cmp::Ordering {
    self.addr.cmp(&other.addr)
  }
}
