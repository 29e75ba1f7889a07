//! Tests for the synthetic source generator.

use crate::entry::Pull;
use crate::source::{AsyncSource, Source};
use crate::synthetic::{SyntheticEvent, SyntheticSource};
use chrono::{DateTime, TimeDelta, Utc};
use std::time::Duration;

fn start() -> DateTime<Utc> {
  DateTime::<Utc>::from_timestamp_millis(1_700_000_000_000).unwrap()
}

fn drain_blocking(mut source: SyntheticSource) -> Vec<(DateTime<Utc>, SyntheticEvent)> {
  let mut out = Vec::new();
  while let Pull::Entry(entry) = Source::pull(&mut source).unwrap() {
    out.push((entry.timestamp, entry.payload));
  }
  out
}

#[test]
fn test_yields_count_entries_in_order() {
  let source = SyntheticSource::new("alpha".to_string(), 50, start())
    .with_seed(7)
    .with_max_gap(TimeDelta::milliseconds(25));
  assert_eq!(source.remaining(), 50);

  let entries = drain_blocking(source);

  assert_eq!(entries.len(), 50);
  assert_eq!(entries[0].0, start());
  assert!(entries.windows(2).all(|w| w[0].0 <= w[1].0));
  assert!(
    entries
      .windows(2)
      .all(|w| w[1].0 - w[0].0 <= TimeDelta::milliseconds(25))
  );
  for (sequence, (_, event)) in entries.iter().enumerate() {
    assert_eq!(event.origin, "alpha");
    assert_eq!(event.sequence, sequence as u64);
  }
}

#[test]
fn test_same_seed_same_entries() {
  let a = drain_blocking(SyntheticSource::new("s".to_string(), 20, start()).with_seed(99));
  let b = drain_blocking(SyntheticSource::new("s".to_string(), 20, start()).with_seed(99));
  assert_eq!(a, b);
}

#[test]
fn test_zero_gap_shares_one_timestamp() {
  let entries = drain_blocking(
    SyntheticSource::new("flat".to_string(), 5, start()).with_max_gap(TimeDelta::zero()),
  );
  assert!(entries.iter().all(|(t, _)| *t == start()));
}

#[test]
fn test_zero_count_is_exhausted_immediately() {
  let mut source = SyntheticSource::new("none".to_string(), 0, start());
  assert!(Source::pull(&mut source).unwrap().is_exhausted());
}

#[tokio::test(start_paused = true)]
async fn test_async_latency_does_not_change_entries() {
  let expected =
    drain_blocking(SyntheticSource::new("lag".to_string(), 10, start()).with_seed(3));

  let mut source = SyntheticSource::new("lag".to_string(), 10, start())
    .with_seed(3)
    .with_max_latency(Duration::from_millis(40));
  let mut actual = Vec::new();
  while let Pull::Entry(entry) = AsyncSource::pull(&mut source).await.unwrap() {
    actual.push((entry.timestamp, entry.payload));
  }

  assert_eq!(actual, expected);
}
