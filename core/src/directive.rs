use std::time::Duration;

use ruswim_types::{GossipPayload, Member, Node, PingResponse, Status};

/// What the surrounding shell should do next.
///
/// The engine never performs I/O; every externally visible action is
/// described by one of these and dispatched by the shell, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
  /// Send a ping to `target` and feed the outcome back through
  /// [`Swim::on_ping_response`](crate::Swim::on_ping_response), or, when
  /// `ping_req_origin` is set, relay the ack/nack to that origin instead.
  SendPing {
    /// The node to probe.
    target: Node,
    /// Membership updates to piggyback on the ping.
    payload: GossipPayload,
    /// How long the shell should wait before reporting a timeout.
    timeout: Duration,
    /// Set when this ping is sent on behalf of another node's ping request.
    ping_req_origin: Option<Node>,
  },
  /// Ask `via` to probe `target` on our behalf and feed the outcome back
  /// through [`Swim::on_ping_request_response`](crate::Swim::on_ping_request_response).
  SendPingRequest {
    /// The node to probe.
    target: Node,
    /// The intermediary to relay the probe through.
    via: Node,
    /// Membership updates to piggyback on the request.
    payload: GossipPayload,
    /// How long the shell should wait before reporting a timeout.
    timeout: Duration,
  },
  /// Answer the probe we just handled.
  Reply(PingResponse),
  /// Establish a transport-level connection to a newly discovered node
  /// before treating it as probeable.
  Connect {
    /// The node to connect to.
    node: Node,
  },
  /// A member's status changed; notify whoever subscribed.
  MemberStatusChanged {
    /// The member with its new status.
    member: Member,
    /// The status it held before, `None` for a member seen for the first
    /// time.
    previous: Option<Status>,
  },
  /// Surface a protocol anomaly to the shell's logger.
  Log {
    /// The severity of the message.
    level: tracing::Level,
    /// The message to log.
    message: String,
  },
}

/// A batch of directives returned by one handler invocation. The shell must
/// dispatch them in order.
pub type Directives = smallvec::SmallVec<[Directive; 4]>;

/// The result of feeding one status report through the member table's
/// single write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkOutcome {
  /// The report superseded what we knew and was written.
  Applied {
    /// The status the member held before, `None` for a new member.
    previous: Option<Status>,
    /// The status now on record (suspicions may have been merged).
    current: Status,
  },
  /// The report did not supersede the status on record; nothing was
  /// written.
  IgnoredDueToOlderStatus {
    /// The status that stays on record.
    previous: Status,
  },
}

impl MarkOutcome {
  /// Returns `true` if the report was written.
  #[inline]
  pub const fn is_applied(&self) -> bool {
    matches!(self, Self::Applied { .. })
  }
}

/// The classification of a probe result fed back into the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
  /// The response referenced a peer the member table has never seen.
  UnknownMember,
  /// The peer missed the round and is now suspected.
  NewlySuspect,
  /// The failure report was stale and changed nothing.
  IgnoredDueToOlderStatus,
  /// The peer was already unreachable before this round.
  AlreadyUnreachable,
  /// The peer was already dead before this round.
  AlreadyDead,
  /// The peer answered.
  Alive {
    /// The status the peer held before the ack was applied.
    previous: Option<Status>,
  },
  /// An intermediary reported it could not reach the peer. No mark is made;
  /// the shell may use this to tell a broken indirect route from a dead
  /// target.
  NackReceived,
  /// The direct probe failed; the round continues through `peers` relays.
  PingRequestsSent {
    /// How many relays were asked.
    peers: usize,
  },
}
