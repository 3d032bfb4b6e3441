use rand::{rngs::SmallRng, SeedableRng};
use ruswim_types::{Incarnation, Member, Node, Status};

use crate::{
  awareness::Awareness,
  clock::{Clock, SystemClock},
  error::Error,
  gossip::GossipQueue,
  members::Members,
  options::Options,
  probe::ProbeList,
};

mod base;

#[cfg(test)]
pub(crate) mod tests;

/// The SWIM + Lifeguard protocol engine.
///
/// A deterministic state machine over the local membership view. Feed it
/// external events (ticks, incoming pings, probe results, gossip) and it
/// returns the [`Directive`](crate::Directive)s the surrounding shell must
/// carry out. It performs no I/O, never reads the wall clock (time comes
/// from the injected [`Clock`]) and never spawns anything; all concurrency
/// lives in the shell.
pub struct Swim<C = SystemClock> {
  pub(crate) opts: Options,
  pub(crate) me: Node,
  pub(crate) incarnation: Incarnation,
  pub(crate) protocol_period: u64,
  pub(crate) members: Members,
  pub(crate) probe_list: ProbeList,
  pub(crate) gossip: GossipQueue,
  pub(crate) awareness: Awareness,
  pub(crate) clock: C,
  pub(crate) rng: SmallRng,
}

impl Swim<SystemClock> {
  /// Creates an engine for the given local node, on a clock anchored at
  /// construction time.
  pub fn new(me: Node, opts: Options) -> Result<Self, Error> {
    Self::with_clock(me, opts, SystemClock::new())
  }
}

impl<C: Clock> Swim<C> {
  /// Creates an engine for the given local node on an injected clock.
  pub fn with_clock(me: Node, opts: Options, clock: C) -> Result<Self, Error> {
    opts.validate()?;

    let rng = match opts.rng_seed() {
      Some(seed) => SmallRng::seed_from_u64(seed),
      None => SmallRng::from_entropy(),
    };

    let mut members = Members::new(opts.max_independent_suspicions());
    let now = clock.now();
    members.apply(me.clone(), Status::alive(Incarnation::ZERO), 0, now);

    Ok(Self {
      awareness: Awareness::new(opts.max_local_health_multiplier()),
      gossip: GossipQueue::new(opts.max_gossip_count_per_message()),
      probe_list: ProbeList::new(),
      members,
      incarnation: Incarnation::ZERO,
      protocol_period: 0,
      me,
      opts,
      clock,
      rng,
    })
  }

  /// Returns the identity of the local node.
  #[inline]
  pub const fn local_node(&self) -> &Node {
    &self.me
  }

  /// Returns the local node's current incarnation.
  #[inline]
  pub const fn incarnation(&self) -> Incarnation {
    self.incarnation
  }

  /// Returns the local member record. The local node is always alive at its
  /// own current incarnation; this holds even while a stale suspicion about
  /// us is still circulating.
  #[inline]
  pub fn local_member(&self) -> Member {
    Member::new(self.me.clone(), Status::alive(self.incarnation))
  }

  /// Returns the index of the current probe round.
  #[inline]
  pub const fn protocol_period(&self) -> u64 {
    self.protocol_period
  }

  /// Returns the current Local Health Multiplier score. `0` means healthy.
  #[inline]
  pub const fn local_health(&self) -> u64 {
    self.awareness.score()
  }

  /// Returns the number of members in the table, the local node and dead
  /// members included.
  #[inline]
  pub fn num_members(&self) -> usize {
    self.members.len()
  }

  /// Returns the number of members other than the local node.
  #[inline]
  pub fn other_member_count(&self) -> usize {
    self.members.other_member_count(&self.me)
  }

  /// Returns the status currently on record for `node`.
  #[inline]
  pub fn status_of(&self, node: &Node) -> Option<&Status> {
    self.members.status_of(node)
  }

  /// Returns `true` if `node` is present in the member table.
  #[inline]
  pub fn is_member(&self, node: &Node) -> bool {
    self.members.is_member(node)
  }

  /// Returns every member record in the table, in no particular order.
  pub fn members(&self) -> impl Iterator<Item = &Member> {
    self.members.iter().map(|state| &state.member)
  }

  /// Returns the configuration the engine runs with.
  #[inline]
  pub const fn options(&self) -> &Options {
    &self.opts
  }
}
