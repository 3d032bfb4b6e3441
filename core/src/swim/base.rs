use std::time::Duration;

use rand::seq::IteratorRandom;
use ruswim_types::{GossipPayload, Incarnation, Member, Node, PingResponse, Status};

use crate::{
  awareness::AwarenessEvent,
  clock::Clock,
  directive::{Directive, Directives, MarkOutcome, ProbeOutcome},
  suspicion::suspicion_timeout,
};

use super::Swim;

impl<C: Clock> Swim<C> {
  /// Returns the effective period between probe rounds, the base interval
  /// stretched by the Local Health Multiplier. Shells schedule
  /// [`on_periodic_tick`](Self::on_periodic_tick) at this cadence.
  #[inline]
  pub fn dynamic_probe_interval(&self) -> Duration {
    self.awareness.scale(self.opts.probe_interval())
  }

  /// Returns the effective per-ping timeout, the base timeout stretched by
  /// the Local Health Multiplier.
  #[inline]
  pub fn dynamic_ping_timeout(&self) -> Duration {
    self.awareness.scale(self.opts.ping_timeout())
  }

  /// The single write path for member statuses.
  ///
  /// Wraps the table update with the bookkeeping that must never be skipped:
  /// dead members leave the probe rotation, newly discovered members join it
  /// at a random position, and every applied change is queued for gossip
  /// with a fresh transmit count.
  pub(crate) fn mark(&mut self, node: Node, status: Status) -> MarkOutcome {
    let now = self.clock.now();
    let outcome = self
      .members
      .apply(node.clone(), status, self.protocol_period, now);

    if let MarkOutcome::Applied { previous, current } = &outcome {
      if node != self.me {
        if current.is_dead() {
          self.probe_list.remove(&node);
        } else if previous.is_none()
          && current.is_probeable()
          && !self.probe_list.contains(&node)
        {
          self.probe_list.insert(node.clone(), &mut self.rng);
        }
      }

      #[cfg(feature = "metrics")]
      metrics::counter!("ruswim.mark.applied", "status" => current.kind().as_str()).increment(1);

      self.gossip.push(Member::new(node, current.clone()));
    }
    outcome
  }

  /// Adds a member the engine has learned about out of band (bootstrap
  /// seeds, join responses). Newly discovered nodes produce a
  /// [`Directive::Connect`] ahead of any probe directive, so the shell can
  /// establish a transport connection first.
  pub fn add_member(&mut self, node: Node, status: Status) -> Directives {
    let mut out = Directives::new();
    if node == self.me {
      return out;
    }

    let known = self.members.is_member(&node);
    if let MarkOutcome::Applied { previous, current } = self.mark(node.clone(), status) {
      if !known && current.is_probeable() {
        out.push(Directive::Connect { node: node.clone() });
      }
      note_transition(&node, &previous, &current, &mut out);
    }
    out
  }

  /// Builds the membership records to piggyback on an outgoing message.
  ///
  /// When `target` is a member we currently suspect, its record is emitted
  /// first even if its gossip has already decayed: a suspect must always
  /// learn that it is suspected, or it can never refute (the Lifeguard
  /// "buddy system"). The rest of the payload drains the least-transmitted
  /// queue entries.
  pub fn make_gossip_payload(&mut self, target: Option<&Node>) -> GossipPayload {
    let buddy = target
      .and_then(|node| self.members.get(node))
      .filter(|state| state.status().is_suspect())
      .map(|state| state.member.clone());

    if buddy.is_none() && self.gossip.is_empty() {
      return GossipPayload::None;
    }

    let mut members = Vec::new();
    if let Some(member) = &buddy {
      members.push(member.clone());
    }
    members.extend(self.gossip.drain(
      self.opts.max_gossip_messages_per_payload(),
      buddy.as_ref().map(|member| member.node()),
    ));
    GossipPayload::from(members)
  }

  /// Handles an incoming ping: merge the piggybacked gossip, then answer
  /// with an ack carrying our own incarnation and a payload of our own.
  pub fn on_ping(&mut self, payload: GossipPayload) -> Directives {
    let mut out = self.process_gossip(payload);
    let reply = self.make_gossip_payload(None);
    out.push(Directive::Reply(PingResponse::Ack {
      target: self.me.clone(),
      incarnation: self.incarnation,
      payload: reply,
    }));
    out
  }

  /// Handles a request to probe `target` on behalf of `reply_to`. The shell
  /// relays the resulting ack or nack back to `reply_to`; the engine only
  /// decides whether and how to probe.
  pub fn on_ping_request(
    &mut self,
    target: Node,
    reply_to: Node,
    payload: GossipPayload,
  ) -> Directives {
    let mut out = self.process_gossip(payload);

    if target == self.me {
      tracing::debug!(
        target: "ruswim.swim",
        origin = %reply_to,
        "ignoring a request to ping ourselves"
      );
      return out;
    }

    if !self.members.is_member(&target) {
      out.extend(self.add_member(target.clone(), Status::alive(Incarnation::ZERO)));
    }

    let payload = self.make_gossip_payload(Some(&target));
    let timeout = self.dynamic_ping_timeout();
    out.push(Directive::SendPing {
      target,
      payload,
      timeout,
      ping_req_origin: Some(reply_to),
    });
    out
  }

  /// Handles the outcome of a direct probe we issued from
  /// [`on_periodic_tick`](Self::on_periodic_tick).
  ///
  /// An unanswered probe does not suspect the target right away: suspicion
  /// at the same incarnation cannot be refuted by an ack, so the engine
  /// first widens the round through up to `indirect_probe_count` relays and
  /// only suspects when no relay is available (or later, when the indirect
  /// round fails too).
  pub fn on_ping_response(
    &mut self,
    peer: &Node,
    result: PingResponse,
  ) -> (ProbeOutcome, Directives) {
    let mut out = Directives::new();
    if !self.members.is_member(peer) {
      return (ProbeOutcome::UnknownMember, out);
    }

    match result {
      PingResponse::Ack {
        target,
        incarnation,
        payload,
      } => {
        debug_assert_eq!(
          &target, peer,
          "ack for {target} fed back against probe of {peer}"
        );
        self.awareness.record(AwarenessEvent::SuccessfulProbe);
        let before = self.members.status_of(peer).cloned();
        if let MarkOutcome::Applied { previous, current } =
          self.mark(peer.clone(), Status::alive(incarnation))
        {
          note_transition(peer, &previous, &current, &mut out);
        }
        out.extend(self.process_gossip(payload));
        (ProbeOutcome::Alive { previous: before }, out)
      }
      PingResponse::Nack { .. } => (ProbeOutcome::NackReceived, out),
      PingResponse::Timeout | PingResponse::Error => {
        self.awareness.record(AwarenessEvent::FailedProbe);

        let relays = self.members_to_ping_request(peer);
        if relays.is_empty() {
          let outcome = self.suspect_member(peer, &mut out);
          return (outcome, out);
        }

        let timeout = self.dynamic_ping_timeout();
        let peers = relays.len();
        for via in relays {
          let payload = self.make_gossip_payload(Some(peer));
          out.push(Directive::SendPingRequest {
            target: peer.clone(),
            via,
            payload,
            timeout,
          });
        }
        (ProbeOutcome::PingRequestsSent { peers }, out)
      }
    }
  }

  /// Handles the outcome of an indirect probe round for `peer`.
  pub fn on_ping_request_response(
    &mut self,
    peer: &Node,
    result: PingResponse,
  ) -> (ProbeOutcome, Directives) {
    let mut out = Directives::new();
    if !self.members.is_member(peer) {
      return (ProbeOutcome::UnknownMember, out);
    }

    match result {
      PingResponse::Ack {
        target,
        incarnation,
        payload,
      } => {
        debug_assert_eq!(
          &target, peer,
          "relayed ack for {target} fed back against probe of {peer}"
        );
        self.awareness.record(AwarenessEvent::SuccessfulProbe);
        let before = self.members.status_of(peer).cloned();
        if let MarkOutcome::Applied { previous, current } =
          self.mark(peer.clone(), Status::alive(incarnation))
        {
          note_transition(peer, &previous, &current, &mut out);
        }
        out.extend(self.process_gossip(payload));
        (ProbeOutcome::Alive { previous: before }, out)
      }
      PingResponse::Nack { .. } => (ProbeOutcome::NackReceived, out),
      PingResponse::Timeout | PingResponse::Error => {
        // The relays went quiet along with the target; either the target is
        // down or we are too degraded to collect the nacks in time.
        self.awareness.record(AwarenessEvent::ProbeWithMissedNack);
        let outcome = self.suspect_member(peer, &mut out);
        (outcome, out)
      }
    }
  }

  /// Drives one protocol period: probe the next member in the rotation,
  /// expire suspicions whose Lifeguard timeout has run out, and advance the
  /// period counter.
  pub fn on_periodic_tick(&mut self) -> Directives {
    let mut out = Directives::new();

    if let Some(target) = self.probe_list.next(&mut self.rng) {
      let payload = self.make_gossip_payload(Some(&target));
      let timeout = self.dynamic_ping_timeout();
      out.push(Directive::SendPing {
        target,
        payload,
        timeout,
        ping_req_origin: None,
      });
    }

    self.sweep_suspects(&mut out);
    self.protocol_period += 1;
    out
  }

  /// Picks the relays for an indirect probe of `target`: a uniform sample
  /// of `indirect_probe_count` members that are not the target, not us, and
  /// currently alive or suspect.
  pub fn members_to_ping_request(&mut self, target: &Node) -> Vec<Node> {
    let candidates = self
      .members
      .iter()
      .filter(|state| {
        state.node() != &self.me && state.node() != target && state.status().is_probeable()
      })
      .map(|state| state.node().clone())
      .collect::<Vec<_>>();

    candidates
      .into_iter()
      .choose_multiple(&mut self.rng, self.opts.indirect_probe_count())
  }

  /// Merges one incoming gossip payload into the member table.
  pub(crate) fn process_gossip(&mut self, payload: GossipPayload) -> Directives {
    let mut out = Directives::new();
    let GossipPayload::Membership(members) = payload else {
      return out;
    };

    for member in members {
      let (node, status) = member.into_parts();
      if node == self.me {
        self.on_myself_gossip(status, &mut out);
      } else {
        out.extend(self.add_member(node, status));
      }
    }
    out
  }

  /// Handles gossip in which we are the subject.
  fn on_myself_gossip(&mut self, status: Status, out: &mut Directives) {
    match status {
      Status::Alive { .. } => {}
      Status::Suspect { incarnation, .. } => match incarnation.cmp(&self.incarnation) {
        core::cmp::Ordering::Equal => {
          self
            .awareness
            .record(AwarenessEvent::RefutingSuspectMessageAboutSelf);
          self.refute();
          tracing::warn!(
            target: "ruswim.swim",
            incarnation = %self.incarnation,
            "refuting a suspect message about ourselves"
          );
        }
        core::cmp::Ordering::Greater => self.note_foreign_incarnation(incarnation, out),
        core::cmp::Ordering::Less => {
          tracing::trace!(
            target: "ruswim.swim",
            suspected = %incarnation,
            current = %self.incarnation,
            "ignoring a stale suspicion about ourselves"
          );
        }
      },
      Status::Unreachable { incarnation } => match incarnation.cmp(&self.incarnation) {
        core::cmp::Ordering::Equal => self.refute(),
        core::cmp::Ordering::Greater => self.note_foreign_incarnation(incarnation, out),
        core::cmp::Ordering::Less => {}
      },
      Status::Dead => {
        // The cluster has already agreed; there is nothing left to refute.
        if let MarkOutcome::Applied { previous, current } =
          self.mark(self.me.clone(), Status::Dead)
        {
          tracing::error!(target: "ruswim.swim", "the cluster declared us dead");
          out.push(Directive::MemberStatusChanged {
            member: Member::new(self.me.clone(), current),
            previous,
          });
        }
      }
    }
  }

  /// Bumps our incarnation past a circulating accusation and re-announces
  /// ourselves alive.
  fn refute(&mut self) {
    self.incarnation = self.incarnation.next();
    let refuted = self.mark(self.me.clone(), Status::alive(self.incarnation));
    debug_assert!(refuted.is_applied(), "a refutation never loses to older state");

    #[cfg(feature = "metrics")]
    metrics::counter!("ruswim.refute").increment(1);
  }

  /// A peer reported us at an incarnation we have not reached. Only we may
  /// increment our incarnation, so the peer is broken; surface it and move
  /// on.
  fn note_foreign_incarnation(&mut self, incarnation: Incarnation, out: &mut Directives) {
    tracing::warn!(
      target: "ruswim.swim",
      reported = %incarnation,
      current = %self.incarnation,
      "peer claims to know a higher incarnation of us than our own"
    );
    out.push(Directive::Log {
      level: tracing::Level::WARN,
      message: format!(
        "peer claims to know incarnation {incarnation} of us, ours is {}",
        self.incarnation
      ),
    });
  }

  /// Suspects `peer` at its current incarnation with ourselves as the
  /// suspector, classifying the result for the caller.
  fn suspect_member(&mut self, peer: &Node, out: &mut Directives) -> ProbeOutcome {
    let Some(status) = self.members.status_of(peer).cloned() else {
      return ProbeOutcome::UnknownMember;
    };

    match status {
      Status::Alive { incarnation } | Status::Suspect { incarnation, .. } => {
        match self.mark(
          peer.clone(),
          Status::suspect(incarnation, self.me.clone()),
        ) {
          MarkOutcome::Applied { previous, current } => {
            note_transition(peer, &previous, &current, out);
            ProbeOutcome::NewlySuspect
          }
          MarkOutcome::IgnoredDueToOlderStatus { .. } => ProbeOutcome::IgnoredDueToOlderStatus,
        }
      }
      Status::Unreachable { .. } => ProbeOutcome::AlreadyUnreachable,
      Status::Dead => ProbeOutcome::AlreadyDead,
    }
  }

  /// Expires every suspect whose Lifeguard timeout has elapsed.
  fn sweep_suspects(&mut self, out: &mut Directives) {
    let now = self.clock.now();
    let (min, max) = (
      self.opts.suspicion_timeout_min(),
      self.opts.suspicion_timeout_max(),
    );
    let k = self.opts.max_independent_suspicions();

    let expired = self
      .members
      .suspects()
      .filter_map(|state| {
        let Status::Suspect {
          incarnation,
          suspected_by,
        } = state.status()
        else {
          return None;
        };
        let started = state.suspicion_started_at?;
        let timeout = suspicion_timeout(suspected_by.len(), k, min, max);
        (now.saturating_sub(started) > timeout.as_nanos() as u64)
          .then(|| (state.node().clone(), *incarnation, suspected_by.len()))
      })
      .collect::<Vec<_>>();

    for (node, incarnation, confirmations) in expired {
      let next = if self.opts.enable_unreachable_state() {
        Status::unreachable(incarnation)
      } else {
        Status::Dead
      };
      if let MarkOutcome::Applied { previous, current } = self.mark(node.clone(), next) {
        tracing::info!(
          target: "ruswim.swim",
          peer = %node,
          confirmations,
          "suspicion timeout reached, marking {}", current
        );
        #[cfg(feature = "metrics")]
        metrics::counter!("ruswim.suspicion.timeout").increment(1);

        note_transition(&node, &previous, &current, out);
      }
    }
  }
}

/// Queues a `MemberStatusChanged` directive when a member's status kind
/// actually moved (first sighting included). Same-kind refreshes, like a
/// higher alive incarnation or a grown suspector set, stay quiet.
fn note_transition(
  node: &Node,
  previous: &Option<Status>,
  current: &Status,
  out: &mut Directives,
) {
  let changed = match previous {
    None => true,
    Some(previous) => previous.kind() != current.kind(),
  };
  if changed {
    out.push(Directive::MemberStatusChanged {
      member: Member::new(node.clone(), current.clone()),
      previous: previous.clone(),
    });
  }
}
