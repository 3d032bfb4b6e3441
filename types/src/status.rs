use std::collections::BTreeSet;

use super::{Incarnation, Node};

/// The liveness status of a member, as seen by the local node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Status {
  /// The member responded to its most recent probe.
  Alive {
    /// The incarnation the member was last seen alive at.
    incarnation: Incarnation,
  },
  /// The member missed a probe and is awaiting a suspicion timeout.
  Suspect {
    /// The incarnation the member is suspected at.
    incarnation: Incarnation,
    /// The peers which have independently suspected the member in this
    /// incarnation. Cardinality is capped by the engine's
    /// `max_independent_suspicions`.
    suspected_by: BTreeSet<Node>,
  },
  /// The cluster agreed the member is not responding, but it has not been
  /// declared dead yet.
  Unreachable {
    /// The incarnation the member became unreachable at.
    incarnation: Incarnation,
  },
  /// Terminal. A dead member never transitions to any other status.
  Dead,
}

impl core::fmt::Display for Status {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.kind().as_str())
  }
}

impl Status {
  /// Returns an alive status at the given incarnation.
  #[inline]
  pub const fn alive(incarnation: Incarnation) -> Self {
    Self::Alive { incarnation }
  }

  /// Returns a suspect status at the given incarnation with a single suspector.
  #[inline]
  pub fn suspect(incarnation: Incarnation, suspected_by: Node) -> Self {
    Self::Suspect {
      incarnation,
      suspected_by: BTreeSet::from([suspected_by]),
    }
  }

  /// Returns an unreachable status at the given incarnation.
  #[inline]
  pub const fn unreachable(incarnation: Incarnation) -> Self {
    Self::Unreachable { incarnation }
  }

  /// Returns the incarnation this status was reported at, or `None` for
  /// [`Status::Dead`], which is terminal at every incarnation.
  #[inline]
  pub fn incarnation(&self) -> Option<Incarnation> {
    match self {
      Self::Alive { incarnation }
      | Self::Suspect { incarnation, .. }
      | Self::Unreachable { incarnation } => Some(*incarnation),
      Self::Dead => None,
    }
  }

  /// Returns the kind of this status, without its payload.
  #[inline]
  pub const fn kind(&self) -> StatusKind {
    match self {
      Self::Alive { .. } => StatusKind::Alive,
      Self::Suspect { .. } => StatusKind::Suspect,
      Self::Unreachable { .. } => StatusKind::Unreachable,
      Self::Dead => StatusKind::Dead,
    }
  }

  /// Returns `true` if this status is [`Status::Alive`].
  #[inline]
  pub const fn is_alive(&self) -> bool {
    matches!(self, Self::Alive { .. })
  }

  /// Returns `true` if this status is [`Status::Suspect`].
  #[inline]
  pub const fn is_suspect(&self) -> bool {
    matches!(self, Self::Suspect { .. })
  }

  /// Returns `true` if this status is [`Status::Unreachable`].
  #[inline]
  pub const fn is_unreachable(&self) -> bool {
    matches!(self, Self::Unreachable { .. })
  }

  /// Returns `true` if this status is [`Status::Dead`].
  #[inline]
  pub const fn is_dead(&self) -> bool {
    matches!(self, Self::Dead)
  }

  /// Returns `true` if a member with this status may still be probed and
  /// asked to relay indirect probes.
  #[inline]
  pub const fn is_probeable(&self) -> bool {
    matches!(self, Self::Alive { .. } | Self::Suspect { .. })
  }

  /// The strict partial order used to drop stale membership reports.
  ///
  /// `a.supersedes(b)` holds when `a` is strictly newer information than `b`:
  /// a higher incarnation always wins; at equal incarnations a higher-ranked
  /// kind wins (`Alive < Suspect < Unreachable < Dead`); two suspicions at
  /// the same incarnation are ordered by strict superset of their suspector
  /// sets. Nothing supersedes `Dead`.
  pub fn supersedes(&self, other: &Self) -> bool {
    if other.is_dead() {
      return false;
    }
    if self.is_dead() {
      return true;
    }

    // Both sides carry an incarnation past this point.
    let this_inc = self.incarnation().expect("non-dead status has an incarnation");
    let other_inc = other.incarnation().expect("non-dead status has an incarnation");
    if this_inc != other_inc {
      return this_inc > other_inc;
    }

    match (self, other) {
      (
        Self::Suspect {
          suspected_by: this_by,
          ..
        },
        Self::Suspect {
          suspected_by: other_by,
          ..
        },
      ) => this_by.len() > other_by.len() && this_by.is_superset(other_by),
      _ => self.kind().rank() > other.kind().rank(),
    }
  }
}

/// The kind of a [`Status`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum StatusKind {
  /// Alive status
  Alive,
  /// Suspect status
  Suspect,
  /// Unreachable status
  Unreachable,
  /// Dead status
  Dead,
}

impl StatusKind {
  /// Get the string representation of the status kind
  #[inline]
  pub const fn as_str(&self) -> &'static str {
    match self {
      Self::Alive => "alive",
      Self::Suspect => "suspect",
      Self::Unreachable => "unreachable",
      Self::Dead => "dead",
    }
  }

  #[inline]
  const fn rank(&self) -> u8 {
    match self {
      Self::Alive => 0,
      Self::Suspect => 1,
      Self::Unreachable => 2,
      Self::Dead => 3,
    }
  }
}

impl core::fmt::Display for StatusKind {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.as_str())
  }
}
