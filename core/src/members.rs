use std::collections::{hash_map::Entry, HashMap};

use ruswim_types::{Member, Node, Status};

use crate::directive::MarkOutcome;

/// A member record plus the local bookkeeping the protocol needs about it.
#[derive(Debug, Clone)]
pub(crate) struct MemberState {
  pub(crate) member: Member,
  /// The probe round at which the current status was first established.
  pub(crate) protocol_period: u64,
  /// When the current suspicion began, set iff the status is suspect.
  pub(crate) suspicion_started_at: Option<u64>,
}

impl MemberState {
  #[inline]
  pub(crate) fn node(&self) -> &Node {
    self.member.node()
  }

  #[inline]
  pub(crate) fn status(&self) -> &Status {
    self.member.status()
  }
}

/// The authoritative local view of the cluster.
#[derive(Debug, Default)]
pub(crate) struct Members {
  states: HashMap<Node, MemberState>,
  max_independent_suspicions: usize,
}

impl Members {
  pub(crate) fn new(max_independent_suspicions: usize) -> Self {
    Self {
      states: HashMap::new(),
      max_independent_suspicions,
    }
  }

  #[inline]
  pub(crate) fn get(&self, node: &Node) -> Option<&MemberState> {
    self.states.get(node)
  }

  #[inline]
  pub(crate) fn status_of(&self, node: &Node) -> Option<&Status> {
    self.states.get(node).map(|state| state.member.status())
  }

  #[inline]
  pub(crate) fn is_member(&self, node: &Node) -> bool {
    self.states.contains_key(node)
  }

  #[inline]
  pub(crate) fn len(&self) -> usize {
    self.states.len()
  }

  pub(crate) fn iter(&self) -> impl Iterator<Item = &MemberState> {
    self.states.values()
  }

  pub(crate) fn suspects(&self) -> impl Iterator<Item = &MemberState> {
    self
      .states
      .values()
      .filter(|state| state.status().is_suspect())
  }

  pub(crate) fn other_member_count(&self, local: &Node) -> usize {
    self.states.len() - usize::from(self.states.contains_key(local))
  }

  /// The single write path.
  ///
  /// Applies `status` to `node` iff it strictly supersedes what is on
  /// record. A suspicion at the incarnation already suspected merges its
  /// suspectors into the existing set (capped at
  /// `max_independent_suspicions`, added in node order) without restarting
  /// the suspicion timer; every other freshly established suspicion starts
  /// its timer at `now`. Suspector sets larger than the cap are truncated
  /// in node order before they are stored.
  pub(crate) fn apply(
    &mut self,
    node: Node,
    mut status: Status,
    protocol_period: u64,
    now: u64,
  ) -> MarkOutcome {
    // The cap is an invariant of the suspect status itself, not only of
    // merging: peer-supplied reports may arrive oversized. Truncate in node
    // order, keeping the lowest suspectors, as the merge below does.
    if let Status::Suspect { suspected_by, .. } = &mut status {
      while suspected_by.len() > self.max_independent_suspicions {
        suspected_by.pop_last();
      }
    }

    let state = match self.states.entry(node.clone()) {
      Entry::Vacant(entry) => {
        let suspicion_started_at = status.is_suspect().then_some(now);
        entry.insert(MemberState {
          member: Member::new(node, status.clone()),
          protocol_period,
          suspicion_started_at,
        });
        return MarkOutcome::Applied {
          previous: None,
          current: status,
        };
      }
      Entry::Occupied(entry) => entry.into_mut(),
    };

    let previous = state.member.status().clone();

    // Same-incarnation suspicion: fold the new suspectors into the
    // existing set before deciding supersession.
    let mut merged_suspicion = false;
    if let (
      Status::Suspect {
        incarnation: new_inc,
        suspected_by: new_by,
      },
      Status::Suspect {
        incarnation: prev_inc,
        suspected_by: prev_by,
      },
    ) = (&mut status, &previous)
    {
      if *new_inc == *prev_inc {
        let mut union = prev_by.clone();
        for suspector in new_by.iter() {
          if union.len() >= self.max_independent_suspicions {
            break;
          }
          union.insert(suspector.clone());
        }
        *new_by = union;
        merged_suspicion = true;
      }
    }

    if !status.supersedes(&previous) {
      tracing::trace!(
        target: "ruswim.members",
        peer = %node,
        current = %previous,
        incoming = %status,
        "dropping stale status report"
      );
      return MarkOutcome::IgnoredDueToOlderStatus { previous };
    }

    state.member = Member::new(node, status.clone());
    // A merged suspicion only grew its evidence; the original period and
    // timer stay.
    if !merged_suspicion {
      state.protocol_period = protocol_period;
      state.suspicion_started_at = status.is_suspect().then_some(now);
    }

    MarkOutcome::Applied {
      previous: Some(previous),
      current: status,
    }
  }
}
