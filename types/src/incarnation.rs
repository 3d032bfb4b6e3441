/// A per-node monotonically non-decreasing counter.
///
/// Only the node an incarnation describes may increment it; everyone else
/// just repeats the largest value they have seen. Conflicting reports about
/// the same node are ordered by incarnation first.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Incarnation(u64);

impl core::fmt::Display for Incarnation {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl From<u64> for Incarnation {
  fn from(inc: u64) -> Self {
    Self(inc)
  }
}

impl From<Incarnation> for u64 {
  fn from(inc: Incarnation) -> Self {
    inc.0
  }
}

impl Incarnation {
  /// The zero incarnation, the value every node starts from.
  pub const ZERO: Self = Self(0);

  /// Creates a new incarnation from the given u64.
  #[inline]
  pub const fn new(inc: u64) -> Self {
    Self(inc)
  }

  /// Returns the incarnation that immediately follows this one.
  #[inline]
  pub const fn next(&self) -> Self {
    Self(self.0 + 1)
  }

  /// Returns the raw counter value.
  #[inline]
  pub const fn get(&self) -> u64 {
    self.0
  }
}

#[test]
fn test_incarnation() {
  let i = Incarnation::ZERO;
  assert_eq!(i, 0.into());
  assert_eq!(i.next(), Incarnation::new(1));
  assert!(i.next() > i);
  assert_eq!(u64::from(i.next()), 1);
  assert_eq!(i.next().to_string(), "1");
}
