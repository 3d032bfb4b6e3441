use super::{Incarnation, Member, Node};

/// The membership updates piggybacked on a probe or a probe response.
///
/// The wire encoding is the transport's choice; this is the semantic
/// contract between two instances of the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum GossipPayload {
  /// No members to share.
  #[default]
  None,
  /// A list of member records for the receiver to merge.
  Membership(Vec<Member>),
}

impl GossipPayload {
  /// Returns `true` if the payload carries no members.
  #[inline]
  pub const fn is_none(&self) -> bool {
    matches!(self, Self::None)
  }

  /// Returns the carried member records, empty when the payload is
  /// [`GossipPayload::None`].
  #[inline]
  pub fn members(&self) -> &[Member] {
    match self {
      Self::None => &[],
      Self::Membership(members) => members,
    }
  }
}

impl From<Vec<Member>> for GossipPayload {
  fn from(members: Vec<Member>) -> Self {
    if members.is_empty() {
      Self::None
    } else {
      Self::Membership(members)
    }
  }
}

/// The outcome of a probe, as observed by the shell and fed back into the
/// engine. Transport failures and timer expirations are translated into
/// [`PingResponse::Error`] and [`PingResponse::Timeout`] before delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum PingResponse {
  /// The probed peer answered.
  Ack {
    /// The responding node.
    target: Node,
    /// The responder's own incarnation.
    incarnation: Incarnation,
    /// Membership updates piggybacked on the ack.
    payload: GossipPayload,
  },
  /// An intermediary could not reach the target of a ping request.
  Nack {
    /// The node the intermediary failed to reach.
    target: Node,
  },
  /// No answer arrived within the probe timeout.
  Timeout,
  /// The transport failed before an answer could arrive.
  Error,
}

impl PingResponse {
  /// Get the string representation of the response kind
  #[inline]
  pub const fn as_str(&self) -> &'static str {
    match self {
      Self::Ack { .. } => "ack",
      Self::Nack { .. } => "nack",
      Self::Timeout => "timeout",
      Self::Error => "error",
    }
  }
}

impl core::fmt::Display for PingResponse {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
