//! Synthetic source generator for demos, tests and benchmarks.
//!
//! [`SyntheticSource`] yields a fixed number of [`SyntheticEvent`]s whose
//! timestamps start at a given instant and grow by a random gap on every pull,
//! so each source is ordered while sources interleave unpredictably. As an
//! [`AsyncSource`] it can also sleep for a random latency before answering.
//!
//! Gaps and latencies come from two separately seeded generators. The same seed
//! therefore yields the same entries whether the source is pulled blocking or
//! async, with or without latency.

use crate::entry::{Entry, Pull};
use crate::error::BoxError;
use crate::source::{AsyncSource, Source};
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// Payload produced by [`SyntheticSource`].
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SyntheticEvent {
  /// Label of the generating source.
  pub origin: String,
  /// Position of this event within its source, starting at 0.
  pub sequence: u64,
}

/// A finite source of entries with non-decreasing random timestamps.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
  origin: String,
  remaining: usize,
  sequence: u64,
  next_timestamp: DateTime<Utc>,
  max_gap: TimeDelta,
  max_latency: Option<Duration>,
  gaps: StdRng,
  jitter: StdRng,
}

impl SyntheticSource {
  /// Creates a source labelled `origin` that yields `count` entries, the first at `start`.
  ///
  /// Defaults: gaps of up to one second, no latency, entropy-seeded.
  pub fn new(origin: String, count: usize, start: DateTime<Utc>) -> Self {
    Self {
      origin,
      remaining: count,
      sequence: 0,
      next_timestamp: start,
      max_gap: TimeDelta::seconds(1),
      max_latency: None,
      gaps: StdRng::from_entropy(),
      jitter: StdRng::from_entropy(),
    }
  }

  /// Seeds both generators so runs are reproducible.
  #[must_use]
  pub fn with_seed(mut self, seed: u64) -> Self {
    self.gaps = StdRng::seed_from_u64(seed);
    self.jitter = StdRng::seed_from_u64(seed ^ 0x9e37_79b9_7f4a_7c15);
    self
  }

  /// Sets the largest gap between consecutive timestamps (inclusive).
  /// A zero gap makes every entry of this source share one timestamp.
  #[must_use]
  pub fn with_max_gap(mut self, max_gap: TimeDelta) -> Self {
    self.max_gap = max_gap.max(TimeDelta::zero());
    self
  }

  /// Makes every async pull sleep for a random duration up to `max_latency`.
  #[must_use]
  pub fn with_max_latency(mut self, max_latency: Duration) -> Self {
    self.max_latency = Some(max_latency);
    self
  }

  /// Number of entries still to come.
  pub fn remaining(&self) -> usize {
    self.remaining
  }

  fn next_pull(&mut self) -> Pull<SyntheticEvent> {
    if self.remaining == 0 {
      return Pull::Exhausted;
    }
    self.remaining -= 1;

    let entry = Entry::new(
      self.next_timestamp,
      SyntheticEvent {
        origin: self.origin.clone(),
        sequence: self.sequence,
      },
    );
    self.sequence += 1;

    let max_gap_ms = self.max_gap.num_milliseconds();
    let gap_ms = self.gaps.gen_range(0..=max_gap_ms);
    self.next_timestamp = self
      .next_timestamp
      .checked_add_signed(TimeDelta::milliseconds(gap_ms))
      .unwrap_or(DateTime::<Utc>::MAX_UTC);

    Pull::Entry(entry)
  }

  fn next_latency(&mut self) -> Option<Duration> {
    let max_ms = u64::try_from(self.max_latency?.as_millis()).unwrap_or(u64::MAX);
    Some(Duration::from_millis(self.jitter.gen_range(0..=max_ms)))
  }
}

impl Source for SyntheticSource {
  type Payload = SyntheticEvent;

  fn pull(&mut self) -> Result<Pull<SyntheticEvent>, BoxError> {
    Ok(self.next_pull())
  }
}

#[async_trait]
impl AsyncSource for SyntheticSource {
  type Payload = SyntheticEvent;

  async fn pull(&mut self) -> Result<Pull<SyntheticEvent>, BoxError> {
    if let Some(latency) = self.next_latency() {
      tokio::time::sleep(latency).await;
    }
    Ok(self.next_pull())
  }
}
