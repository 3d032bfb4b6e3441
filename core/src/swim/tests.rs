use std::{collections::BTreeSet, time::Duration};

use ruswim_types::{GossipPayload, Incarnation, Member, Node, PingResponse, Status};

use crate::{
  clock::{Clock, ManualClock},
  directive::{Directive, ProbeOutcome},
  Options, Swim,
};

fn node(port: u16) -> Node {
  Node::new(
    format!("n{port}"),
    format!("127.0.0.1:{port}").parse().unwrap(),
  )
}

fn inc(i: u64) -> Incarnation {
  Incarnation::new(i)
}

fn test_options() -> Options {
  Options::new()
    .with_probe_interval(Duration::from_millis(50))
    .with_ping_timeout(Duration::from_millis(25))
    .with_suspicion_timeout_min(Duration::from_secs(1))
    .with_suspicion_timeout_max(Duration::from_secs(5))
    .with_rng_seed(Some(7))
}

fn engine(port: u16) -> (Swim<ManualClock>, ManualClock) {
  let clock = ManualClock::new();
  let swim = Swim::with_clock(node(port), test_options(), clock.clone()).unwrap();
  (swim, clock)
}

fn membership(members: Vec<Member>) -> GossipPayload {
  GossipPayload::Membership(members)
}

fn ack(from: u16, incarnation: Incarnation) -> PingResponse {
  PingResponse::Ack {
    target: node(from),
    incarnation,
    payload: GossipPayload::None,
  }
}

fn status_changes(directives: &[Directive]) -> Vec<(Option<Status>, Status)> {
  directives
    .iter()
    .filter_map(|d| match d {
      Directive::MemberStatusChanged { member, previous } => {
        Some((previous.clone(), member.status().clone()))
      }
      _ => None,
    })
    .collect()
}

#[test]
fn test_construction_rejects_invalid_options() {
  let err = Swim::new(node(1), test_options().with_ping_timeout(Duration::ZERO))
    .err()
    .unwrap();
  assert_eq!(err, crate::Error::ZeroPingTimeout);
}

#[test]
fn test_pings_are_acked_with_our_incarnation() {
  let (mut swim, _clock) = engine(1);
  let out = swim.on_ping(GossipPayload::None);

  assert_eq!(out.len(), 1);
  let Directive::Reply(PingResponse::Ack {
    target,
    incarnation,
    payload,
  }) = &out[0]
  else {
    panic!("expected an ack, got {:?}", out[0]);
  };
  assert_eq!(target, swim.local_node());
  assert_eq!(*incarnation, inc(0));
  assert!(payload.is_none());
}

#[test]
fn test_refuting_a_suspicion_bumps_our_incarnation() {
  let (mut swim, _clock) = engine(1);
  swim.add_member(node(2), Status::alive(inc(0)));

  let out = swim.on_ping(membership(vec![Member::new(
    node(1),
    Status::suspect(inc(0), node(2)),
  )]));

  assert_eq!(swim.incarnation(), inc(1));
  assert_eq!(swim.local_health(), 1);
  assert_eq!(swim.status_of(&node(1)), Some(&Status::alive(inc(1))));

  // The refutation is queued for dissemination and already rides the ack.
  let (_, queued) = swim.gossip.get(&node(1)).unwrap();
  assert_eq!(queued.status(), &Status::alive(inc(1)));
  let Directive::Reply(PingResponse::Ack {
    incarnation,
    payload,
    ..
  }) = out.last().unwrap()
  else {
    panic!("expected the ack last");
  };
  assert_eq!(*incarnation, inc(1));
  assert!(payload
    .members()
    .iter()
    .any(|m| m.node() == &node(1) && m.status() == &Status::alive(inc(1))));
}

#[test]
fn test_stale_suspicions_about_ourselves_are_ignored() {
  let (mut swim, _clock) = engine(1);
  swim.add_member(node(2), Status::alive(inc(0)));
  swim.on_ping(membership(vec![Member::new(
    node(1),
    Status::suspect(inc(0), node(2)),
  )]));
  assert_eq!(swim.incarnation(), inc(1));

  // The same accusation again is now below our incarnation: no change.
  swim.on_ping(membership(vec![Member::new(
    node(1),
    Status::suspect(inc(0), node(2)),
  )]));
  assert_eq!(swim.incarnation(), inc(1));
  assert_eq!(swim.local_health(), 1);
}

#[test]
fn test_a_peer_claiming_a_higher_incarnation_of_us_is_surfaced() {
  let (mut swim, _clock) = engine(1);
  let out = swim.on_ping(membership(vec![Member::new(
    node(1),
    Status::suspect(inc(5), node(2)),
  )]));

  assert_eq!(swim.incarnation(), inc(0));
  assert_eq!(swim.local_health(), 0);
  assert!(out
    .iter()
    .any(|d| matches!(d, Directive::Log { level, .. } if *level == tracing::Level::WARN)));
}

#[test]
fn test_unreachable_gossip_about_ourselves_bumps_incarnation() {
  let (mut swim, _clock) = engine(1);
  swim.on_ping(membership(vec![Member::new(
    node(1),
    Status::unreachable(inc(0)),
  )]));

  assert_eq!(swim.incarnation(), inc(1));
  assert_eq!(swim.status_of(&node(1)), Some(&Status::alive(inc(1))));
  // Being declared unreachable is refuted without a health penalty.
  assert_eq!(swim.local_health(), 0);
}

#[test]
fn test_dead_gossip_about_ourselves_is_terminal() {
  let (mut swim, _clock) = engine(1);
  let out = swim.on_ping(membership(vec![Member::new(node(1), Status::Dead)]));

  assert!(swim.status_of(&node(1)).unwrap().is_dead());
  let changes = status_changes(&out);
  assert_eq!(
    changes,
    vec![(Some(Status::alive(inc(0))), Status::Dead)]
  );
}

#[test]
fn test_gossip_about_unknown_members_connects_before_notifying() {
  let (mut swim, _clock) = engine(1);
  let out = swim.process_gossip(membership(vec![Member::new(
    node(2),
    Status::alive(inc(3)),
  )]));

  assert_eq!(swim.status_of(&node(2)), Some(&Status::alive(inc(3))));
  assert!(swim.probe_list.contains(&node(2)));

  let connect = out
    .iter()
    .position(|d| matches!(d, Directive::Connect { node: n } if n == &node(2)))
    .expect("expected a connect directive");
  let notified = out
    .iter()
    .position(|d| matches!(d, Directive::MemberStatusChanged { .. }))
    .expect("expected a status change directive");
  assert!(connect < notified);
}

#[test]
fn test_unreachable_newcomers_are_tracked_but_not_probed() {
  let (mut swim, _clock) = engine(1);
  let out = swim.process_gossip(membership(vec![Member::new(
    node(2),
    Status::unreachable(inc(0)),
  )]));

  // The record joins the table so its state keeps disseminating, but there
  // is nothing to connect to or probe.
  assert!(swim.is_member(&node(2)));
  assert!(!swim.probe_list.contains(&node(2)));
  assert!(!out.iter().any(|d| matches!(d, Directive::Connect { .. })));
  let tick = swim.on_periodic_tick();
  assert!(!tick
    .iter()
    .any(|d| matches!(d, Directive::SendPing { target, .. } if target == &node(2))));

  // The first sighting is still announced.
  assert_eq!(status_changes(&out).len(), 1);
}

#[test]
fn test_suspicion_merges_without_restarting_the_timer() {
  let (mut swim, clock) = engine(1);
  swim.add_member(node(3), Status::alive(inc(5)));

  clock.advance(Duration::from_millis(10));
  let started = clock.now();
  swim.process_gossip(membership(vec![Member::new(
    node(3),
    Status::suspect(inc(5), node(4)),
  )]));
  assert_eq!(
    swim.members.get(&node(3)).unwrap().suspicion_started_at,
    Some(started)
  );

  clock.advance(Duration::from_millis(500));
  swim.process_gossip(membership(vec![Member::new(
    node(3),
    Status::suspect(inc(5), node(5)),
  )]));

  let state = swim.members.get(&node(3)).unwrap();
  assert_eq!(
    state.status(),
    &Status::Suspect {
      incarnation: inc(5),
      suspected_by: BTreeSet::from([node(4), node(5)]),
    }
  );
  assert_eq!(state.suspicion_started_at, Some(started));
}

#[test]
fn test_repeated_suspicion_gossip_is_idempotent() {
  let (mut swim, _clock) = engine(1);
  swim.add_member(node(3), Status::alive(inc(5)));
  let accusation = membership(vec![Member::new(node(3), Status::suspect(inc(5), node(4)))]);

  swim.process_gossip(accusation.clone());
  // Gossip the suspicion out once, then replay the identical accusation.
  swim.make_gossip_payload(None);
  let (transmits, _) = swim.gossip.get(&node(3)).unwrap();
  assert_eq!(transmits, 1);

  swim.process_gossip(accusation);
  let state = swim.members.get(&node(3)).unwrap();
  assert_eq!(
    state.status(),
    &Status::suspect(inc(5), node(4))
  );
  // No rewrite happened: the queued entry kept its transmit count.
  let (transmits, _) = swim.gossip.get(&node(3)).unwrap();
  assert_eq!(transmits, 1);
}

#[test]
fn test_stale_alive_does_not_clear_suspicion() {
  let (mut swim, _clock) = engine(1);
  swim.add_member(node(4), Status::alive(inc(7)));
  swim.process_gossip(membership(vec![Member::new(
    node(4),
    Status::suspect(inc(7), node(2)),
  )]));

  let out = swim.process_gossip(membership(vec![Member::new(
    node(4),
    Status::alive(inc(6)),
  )]));

  assert!(status_changes(&out).is_empty());
  assert!(swim.status_of(&node(4)).unwrap().is_suspect());
}

#[test]
fn test_direct_probe_timeout_fans_out_before_suspecting() {
  let (mut swim, _clock) = engine(1);
  for port in 2..=4 {
    swim.add_member(node(port), Status::alive(inc(0)));
  }

  let (outcome, out) = swim.on_ping_response(&node(2), PingResponse::Timeout);

  assert_eq!(outcome, ProbeOutcome::PingRequestsSent { peers: 2 });
  assert_eq!(swim.local_health(), 1);
  assert!(swim.status_of(&node(2)).unwrap().is_alive());

  let relays = out
    .iter()
    .filter_map(|d| match d {
      Directive::SendPingRequest { target, via, .. } => {
        assert_eq!(target, &node(2));
        Some(via.clone())
      }
      _ => None,
    })
    .collect::<BTreeSet<_>>();
  assert_eq!(relays, BTreeSet::from([node(3), node(4)]));
}

#[test]
fn test_probe_timeout_with_no_relays_suspects_immediately() {
  let (mut swim, _clock) = engine(1);
  swim.add_member(node(2), Status::alive(inc(0)));

  let (outcome, out) = swim.on_ping_response(&node(2), PingResponse::Timeout);

  assert_eq!(outcome, ProbeOutcome::NewlySuspect);
  assert_eq!(
    swim.status_of(&node(2)),
    Some(&Status::suspect(inc(0), node(1)))
  );
  let changes = status_changes(&out);
  assert_eq!(changes.len(), 1);
  assert!(changes[0].1.is_suspect());
}

#[test]
fn test_indirect_round_failure_suspects_the_target() {
  let (mut swim, _clock) = engine(1);
  for port in 2..=4 {
    swim.add_member(node(port), Status::alive(inc(0)));
  }
  swim.on_ping_response(&node(2), PingResponse::Timeout);

  let (outcome, _) = swim.on_ping_request_response(&node(2), PingResponse::Timeout);
  assert_eq!(outcome, ProbeOutcome::NewlySuspect);
  assert_eq!(
    swim.status_of(&node(2)),
    Some(&Status::suspect(inc(0), node(1)))
  );
  // One failed probe plus one missed nack.
  assert_eq!(swim.local_health(), 2);

  // A second relay timing out adds no new evidence.
  let (outcome, _) = swim.on_ping_request_response(&node(2), PingResponse::Timeout);
  assert_eq!(outcome, ProbeOutcome::IgnoredDueToOlderStatus);
}

#[test]
fn test_indirect_ack_reports_the_target_alive() {
  let (mut swim, _clock) = engine(1);
  for port in 2..=3 {
    swim.add_member(node(port), Status::alive(inc(0)));
  }
  swim.on_ping_response(&node(2), PingResponse::Timeout);
  swim.on_ping_request_response(&node(2), PingResponse::Timeout);
  assert!(swim.status_of(&node(2)).unwrap().is_suspect());

  // The target refuted in the meantime; its ack carries the new incarnation.
  let (outcome, out) = swim.on_ping_request_response(&node(2), ack(2, inc(1)));

  assert!(matches!(outcome, ProbeOutcome::Alive { previous: Some(s) } if s.is_suspect()));
  assert_eq!(swim.status_of(&node(2)), Some(&Status::alive(inc(1))));
  let changes = status_changes(&out);
  assert_eq!(changes.len(), 1);
  assert!(changes[0].1.is_alive());
}

#[test]
fn test_nacks_mark_nothing() {
  let (mut swim, _clock) = engine(1);
  swim.add_member(node(2), Status::alive(inc(0)));

  let (outcome, out) =
    swim.on_ping_request_response(&node(2), PingResponse::Nack { target: node(2) });

  assert_eq!(outcome, ProbeOutcome::NackReceived);
  assert!(out.is_empty());
  assert!(swim.status_of(&node(2)).unwrap().is_alive());
}

#[test]
fn test_responses_about_unknown_members_are_classified() {
  let (mut swim, _clock) = engine(1);
  let (outcome, _) = swim.on_ping_request_response(&node(9), PingResponse::Timeout);
  assert_eq!(outcome, ProbeOutcome::UnknownMember);
  let (outcome, _) = swim.on_ping_response(&node(9), PingResponse::Timeout);
  assert_eq!(outcome, ProbeOutcome::UnknownMember);
}

#[test]
fn test_ping_requests_for_ourselves_are_ignored() {
  let (mut swim, _clock) = engine(1);
  let out = swim.on_ping_request(node(1), node(2), GossipPayload::None);
  assert!(!out
    .iter()
    .any(|d| matches!(d, Directive::SendPing { .. })));
}

#[test]
fn test_ping_requests_for_unknown_targets_add_and_connect_first() {
  let (mut swim, _clock) = engine(1);
  let out = swim.on_ping_request(node(5), node(2), GossipPayload::None);

  assert_eq!(swim.status_of(&node(5)), Some(&Status::alive(inc(0))));

  let connect = out
    .iter()
    .position(|d| matches!(d, Directive::Connect { node: n } if n == &node(5)))
    .expect("expected a connect directive");
  let ping = out
    .iter()
    .position(|d| {
      matches!(
        d,
        Directive::SendPing { target, ping_req_origin: Some(origin), .. }
          if target == &node(5) && origin == &node(2)
      )
    })
    .expect("expected the relayed ping");
  assert!(connect < ping);
}

#[test]
fn test_ticks_probe_the_whole_rotation() {
  let (mut swim, _clock) = engine(1);
  for port in 2..=5 {
    swim.add_member(node(port), Status::alive(inc(0)));
  }
  assert_eq!(swim.num_members(), 5);
  assert_eq!(swim.other_member_count(), 4);

  // Align on a traversal boundary, then one full round must hit everyone.
  while swim.probe_list.next_index() != 0 {
    swim.on_periodic_tick();
  }
  let mut probed = BTreeSet::new();
  for _ in 0..4 {
    let out = swim.on_periodic_tick();
    let Some(Directive::SendPing { target, .. }) = out.first() else {
      panic!("expected a probe each tick");
    };
    assert!(probed.insert(target.clone()));
  }
  assert_eq!(probed.len(), 4);
  assert!(!probed.contains(&node(1)));
}

#[test]
fn test_tick_advances_the_protocol_period() {
  let (mut swim, _clock) = engine(1);
  assert_eq!(swim.protocol_period(), 0);
  swim.on_periodic_tick();
  swim.on_periodic_tick();
  assert_eq!(swim.protocol_period(), 2);
}

#[test]
fn test_suspicion_timeout_expires_to_unreachable() {
  let (mut swim, clock) = engine(1);
  swim.add_member(node(5), Status::alive(inc(4)));
  swim.process_gossip(membership(vec![Member::new(
    node(5),
    Status::suspect(inc(4), node(9)),
  )]));

  // One confirmation against K=3 with bounds [1s, 5s] decays to 3s.
  clock.set(2_500_000_000);
  let out = swim.on_periodic_tick();
  assert!(status_changes(&out).is_empty());
  assert!(swim.status_of(&node(5)).unwrap().is_suspect());

  clock.set(3_001_000_000);
  let out = swim.on_periodic_tick();
  let changes = status_changes(&out);
  assert_eq!(changes.len(), 1);
  assert!(changes[0].0.as_ref().unwrap().is_suspect());
  assert_eq!(changes[0].1, Status::unreachable(inc(4)));
  assert_eq!(
    swim.status_of(&node(5)),
    Some(&Status::unreachable(inc(4)))
  );
}

#[test]
fn test_more_suspectors_expire_sooner() {
  let (mut swim, clock) = engine(1);
  swim.add_member(node(5), Status::alive(inc(4)));
  // Three independent suspicions: the timeout bottoms out at 1s.
  swim.process_gossip(membership(vec![Member::new(
    node(5),
    Status::Suspect {
      incarnation: inc(4),
      suspected_by: BTreeSet::from([node(2), node(3), node(4)]),
    },
  )]));

  clock.set(1_000_000_001);
  let out = swim.on_periodic_tick();
  assert_eq!(status_changes(&out).len(), 1);
  assert!(swim.status_of(&node(5)).unwrap().is_unreachable());
}

#[test]
fn test_expired_suspects_die_directly_without_the_unreachable_state() {
  let clock = ManualClock::new();
  let opts = test_options().with_enable_unreachable_state(false);
  let mut swim = Swim::with_clock(node(1), opts, clock.clone()).unwrap();
  swim.add_member(node(5), Status::alive(inc(4)));
  swim.process_gossip(membership(vec![Member::new(
    node(5),
    Status::suspect(inc(4), node(9)),
  )]));

  clock.set(3_001_000_000);
  let out = swim.on_periodic_tick();
  let changes = status_changes(&out);
  assert_eq!(changes.len(), 1);
  assert_eq!(changes[0].1, Status::Dead);
  assert!(!swim.probe_list.contains(&node(5)));
}

#[test]
fn test_dead_members_stay_dead_and_leave_the_rotation() {
  let (mut swim, _clock) = engine(1);
  swim.add_member(node(6), Status::alive(inc(0)));
  assert!(swim.probe_list.contains(&node(6)));

  swim.process_gossip(membership(vec![Member::new(node(6), Status::Dead)]));
  assert!(swim.status_of(&node(6)).unwrap().is_dead());
  assert!(!swim.probe_list.contains(&node(6)));

  // A later alive report at any incarnation cannot resurrect it, but the
  // member stays in the table so its death keeps being gossiped.
  let out = swim.process_gossip(membership(vec![Member::new(
    node(6),
    Status::alive(inc(99)),
  )]));
  assert!(status_changes(&out).is_empty());
  assert!(swim.status_of(&node(6)).unwrap().is_dead());
  assert!(swim.is_member(&node(6)));
  let payload = swim.make_gossip_payload(None);
  assert!(payload
    .members()
    .iter()
    .any(|m| m.node() == &node(6) && m.status().is_dead()));
}

#[test]
fn test_gossip_decays_after_the_configured_transmits() {
  let clock = ManualClock::new();
  let opts = test_options().with_max_gossip_count_per_message(3);
  let mut swim = Swim::with_clock(node(1), opts, clock).unwrap();
  swim.add_member(node(2), Status::alive(inc(0)));

  let mut emitted = 0;
  for _ in 0..10 {
    emitted += swim.make_gossip_payload(None).members().len();
  }
  assert_eq!(emitted, 3);
}

#[test]
fn test_buddy_system_always_tells_a_suspect() {
  let (mut swim, _clock) = engine(1);
  swim.add_member(node(2), Status::alive(inc(0)));
  swim.process_gossip(membership(vec![Member::new(
    node(2),
    Status::suspect(inc(0), node(3)),
  )]));

  // Decay the suspicion out of the queue entirely.
  for _ in 0..10 {
    swim.make_gossip_payload(None);
  }
  assert!(swim.gossip.get(&node(2)).is_none());

  // A payload destined for the suspect still leads with its own record.
  let payload = swim.make_gossip_payload(Some(&node(2)));
  let members = payload.members();
  assert!(!members.is_empty());
  assert_eq!(members[0].node(), &node(2));
  assert!(members[0].status().is_suspect());
}

#[test]
fn test_members_to_ping_request_filters_and_samples() {
  let (mut swim, _clock) = engine(1);
  for port in 2..=8 {
    swim.add_member(node(port), Status::alive(inc(0)));
  }
  swim.process_gossip(membership(vec![Member::new(node(7), Status::Dead)]));
  swim.process_gossip(membership(vec![Member::new(
    node(8),
    Status::unreachable(inc(0)),
  )]));

  for _ in 0..32 {
    let relays = swim.members_to_ping_request(&node(2));
    assert_eq!(relays.len(), 3);
    for relay in &relays {
      assert_ne!(relay, &node(1));
      assert_ne!(relay, &node(2));
      assert_ne!(relay, &node(7));
      assert_ne!(relay, &node(8));
    }
  }
}

#[test]
fn test_local_health_stays_within_bounds() {
  let (mut swim, _clock) = engine(1);
  for port in 2..=4 {
    swim.add_member(node(port), Status::alive(inc(0)));
  }

  for _ in 0..20 {
    swim.on_ping_response(&node(2), PingResponse::Timeout);
  }
  assert_eq!(swim.local_health(), 8);
  assert_eq!(swim.dynamic_ping_timeout(), Duration::from_millis(225));
  assert_eq!(swim.dynamic_probe_interval(), Duration::from_millis(450));

  for _ in 0..20 {
    swim.on_ping_response(&node(2), ack(2, inc(0)));
  }
  assert_eq!(swim.local_health(), 0);
  assert_eq!(swim.dynamic_ping_timeout(), Duration::from_millis(25));
}

#[test]
fn test_the_local_node_is_always_a_live_member_and_never_probed() {
  let (mut swim, clock) = engine(1);
  for port in 2..=5 {
    swim.add_member(node(port), Status::alive(inc(0)));
  }
  swim.on_ping(membership(vec![Member::new(
    node(1),
    Status::suspect(inc(0), node(2)),
  )]));
  swim.on_ping_response(&node(3), PingResponse::Timeout);
  clock.advance(Duration::from_secs(10));
  swim.on_periodic_tick();

  assert!(!swim.probe_list.contains(&node(1)));
  assert_eq!(
    swim.status_of(&node(1)),
    Some(&Status::alive(swim.incarnation()))
  );
  assert_eq!(swim.local_member().status(), &Status::alive(inc(1)));
}
