//! The ordering structure shared by both merge engines.
//!
//! [`Frontier`] holds at most one pending entry per active source and always
//! hands back the earliest one. It is the only place in the crate that decides
//! the relative order of two entries.

use crate::entry::{RankedEntry, SourceIndex};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Min-priority queue of [`RankedEntry`] values keyed by `(timestamp, source)`.
///
/// Built in two phases: [`from_seed`](Frontier::from_seed) heapifies the first
/// entry of every source in linear time, then the engine alternates
/// [`pop_min`](Frontier::pop_min) and [`insert`](Frontier::insert).
#[derive(Debug)]
pub struct Frontier<P> {
  heap: BinaryHeap<Reverse<RankedEntry<P>>>,
}

impl<P> Frontier<P> {
  /// Creates an empty frontier.
  pub fn new() -> Self {
    Self {
      heap: BinaryHeap::new(),
    }
  }

  /// Builds a frontier from the initial heads of all sources at once.
  pub fn from_seed(seed: Vec<RankedEntry<P>>) -> Self {
    let items: Vec<Reverse<RankedEntry<P>>> = seed.into_iter().map(Reverse).collect();
    // BinaryHeap::from(Vec) sifts in place, O(n).
    Self {
      heap: BinaryHeap::from(items),
    }
  }

  /// Adds a source's next entry.
  pub fn insert(&mut self, item: RankedEntry<P>) {
    self.heap.push(Reverse(item));
  }

  /// Removes and returns the earliest entry.
  pub fn pop_min(&mut self) -> Option<RankedEntry<P>> {
    self.heap.pop().map(|Reverse(item)| item)
  }

  /// Returns the earliest entry without removing it.
  pub fn peek_min(&self) -> Option<&RankedEntry<P>> {
    self.heap.peek().map(|Reverse(item)| item)
  }

  /// Returns `true` when no entries are pending.
  pub fn is_empty(&self) -> bool {
    self.heap.is_empty()
  }

  /// Number of pending entries.
  pub fn len(&self) -> usize {
    self.heap.len()
  }

  /// Returns `true` if an entry from `source` is already pending.
  ///
  /// Linear scan; the engines only call it from `debug_assert!`.
  pub fn contains_source(&self, source: SourceIndex) -> bool {
    self.heap.iter().any(|Reverse(item)| item.source == source)
  }
}

impl<P> Default for Frontier<P> {
  fn default() -> Self {
    Self::new()
  }
}

impl<P> FromIterator<RankedEntry<P>> for Frontier<P> {
  fn from_iter<I: IntoIterator<Item = RankedEntry<P>>>(iter: I) -> Self {
    Self::from_seed(iter.into_iter().collect())
  }
}
