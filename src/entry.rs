//! Timestamped entries and the values that travel between sources and the merge engines.
//!
//! [`Entry`] is the unit of data being merged: an absolute point in time plus an
//! opaque payload the engines never look at. Sources answer a pull with a
//! [`Pull`], either the next entry or the permanent [`Pull::Exhausted`] marker.
//! Inside the engines an entry is tagged with the [`SourceIndex`] it came from,
//! forming a [`RankedEntry`] that lives in the [`Frontier`](crate::frontier::Frontier)
//! until it is emitted.
//!
//! ## Ordering
//!
//! [`RankedEntry`] is ordered by `(timestamp, source)`. The payload never takes
//! part in a comparison, so entries with equal timestamps from different sources
//! come out in ascending source index order on every run.

use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::fmt;

/// Stable identity of a source within one merge run.
///
/// Sources are numbered `0..N-1` in the order they were handed to the engine.
#[derive(
  Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct SourceIndex(pub usize);

impl SourceIndex {
  /// Creates a source index from its position in the source list.
  #[inline]
  pub const fn new(index: usize) -> Self {
    Self(index)
  }

  /// Returns the raw position.
  #[inline]
  pub const fn as_usize(self) -> usize {
    self.0
  }
}

impl From<usize> for SourceIndex {
  fn from(index: usize) -> Self {
    Self(index)
  }
}

impl fmt::Display for SourceIndex {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A payload stamped with the absolute time it belongs to.
///
/// Entries are inert: the merge engines move them from sources to the sink
/// without reading or mutating the payload.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Entry<P> {
  /// When this entry happened. The only field the engines compare.
  pub timestamp: DateTime<Utc>,
  /// Opaque message body.
  pub payload: P,
}

impl<P> Entry<P> {
  /// Creates a new entry.
  #[inline]
  pub const fn new(timestamp: DateTime<Utc>, payload: P) -> Self {
    Self { timestamp, payload }
  }

  /// Creates an entry at `millis` milliseconds after the Unix epoch.
  ///
  /// Returns `None` when `millis` is outside the range `DateTime<Utc>` can represent.
  pub fn from_millis(millis: i64, payload: P) -> Option<Self> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|timestamp| Self::new(timestamp, payload))
  }

  /// Returns the timestamp.
  #[inline]
  pub const fn timestamp(&self) -> DateTime<Utc> {
    self.timestamp
  }

  /// Returns a reference to the payload.
  #[inline]
  pub const fn payload(&self) -> &P {
    &self.payload
  }

  /// Consumes the entry and returns the payload.
  #[inline]
  pub fn into_payload(self) -> P {
    self.payload
  }
}

/// Result of pulling once from a source.
///
/// A tagged variant rather than an `Option` so that "no more entries" can never be
/// confused with a payload that happens to look empty.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Pull<P> {
  /// The source's next entry.
  Entry(Entry<P>),
  /// The source has no further entries. Permanent for the rest of the run.
  Exhausted,
}

impl<P> Pull<P> {
  /// Returns `Some(&Entry<P>)` if this is `Entry`, otherwise `None`.
  #[inline]
  pub fn entry(&self) -> Option<&Entry<P>> {
    match self {
      Self::Entry(entry) => Some(entry),
      Self::Exhausted => None,
    }
  }

  /// Converts into `Some(Entry<P>)` if this is `Entry`, otherwise `None`.
  #[inline]
  pub fn into_entry(self) -> Option<Entry<P>> {
    match self {
      Self::Entry(entry) => Some(entry),
      Self::Exhausted => None,
    }
  }

  /// Returns `true` if this is `Exhausted`.
  #[inline]
  pub fn is_exhausted(&self) -> bool {
    matches!(self, Self::Exhausted)
  }
}

impl<P> From<Option<Entry<P>>> for Pull<P> {
  fn from(next: Option<Entry<P>>) -> Self {
    match next {
      Some(entry) => Self::Entry(entry),
      None => Self::Exhausted,
    }
  }
}

/// An entry paired with the index of the source that yielded it.
///
/// Exists only between "source yielded entry" and "entry emitted".
#[derive(Clone, Debug)]
pub struct RankedEntry<P> {
  /// The pending entry.
  pub entry: Entry<P>,
  /// Where it came from.
  pub source: SourceIndex,
}

impl<P> RankedEntry<P> {
  /// Tags `entry` with its source.
  #[inline]
  pub const fn new(entry: Entry<P>, source: SourceIndex) -> Self {
    Self { entry, source }
  }

  /// The comparison key: timestamp first, source index as the tie-break.
  #[inline]
  pub fn key(&self) -> (DateTime<Utc>, SourceIndex) {
    (self.entry.timestamp, self.source)
  }

  /// Splits into the entry and its source index.
  #[inline]
  pub fn into_parts(self) -> (Entry<P>, SourceIndex) {
    (self.entry, self.source)
  }
}

impl<P> PartialEq for RankedEntry<P> {
  fn eq(&self, other: &Self) -> bool {
    self.key() == other.key()
  }
}

impl<P> Eq for RankedEntry<P> {}

impl<P> Ord for RankedEntry<P> {
  fn cmp(&self, other: &Self) -> Ordering {
    self.key().cmp(&other.key())
  }
}

impl<P> PartialOrd for RankedEntry<P> {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}
