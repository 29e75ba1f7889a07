//! End-to-end merge scenarios run against both engines.

use chrono::{DateTime, TimeDelta, Utc};
use chronoweave::{
  BlockingAsAsync, BoxError, ChannelSink, Entry, IterSource, MergeConfig, MergeError,
  PipelinedMerger, SourceIndex, StreamSource, SyntheticEvent, SyntheticSource, TryIterSource,
  VecSink, merge_blocking, merge_pipelined,
};
use futures::stream;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::time::Duration;
use tokio_stream::StreamExt;

fn init_tracing() {
  let _ = tracing_subscriber::fmt()
    .with_max_level(tracing::Level::TRACE)
    .with_test_writer()
    .try_init();
}

fn entry(ms: i64, payload: &'static str) -> Entry<&'static str> {
  Entry::from_millis(ms, payload).unwrap()
}

type Script = Vec<Vec<Entry<&'static str>>>;

fn iter_sources(script: &Script) -> Vec<IterSource<std::vec::IntoIter<Entry<&'static str>>>> {
  script.iter().cloned().map(IterSource::new).collect()
}

fn run_blocking(script: &Script) -> VecSink<&'static str> {
  let mut sources = iter_sources(script);
  let mut sink = VecSink::new();
  merge_blocking(&mut sources, &mut sink).unwrap();
  sink
}

async fn run_pipelined(script: &Script) -> VecSink<&'static str> {
  let sources: Vec<_> = iter_sources(script)
    .into_iter()
    .map(BlockingAsAsync::new)
    .collect();
  let mut sink = VecSink::new();
  merge_pipelined(sources, &mut sink).await.unwrap();
  sink
}

fn millis<P>(sink: &VecSink<P>) -> Vec<i64> {
  sink
    .timestamps()
    .iter()
    .map(|t| t.timestamp_millis())
    .collect()
}

#[tokio::test]
async fn scenario_three_single_entry_sources() {
  init_tracing();
  let script = vec![
    vec![entry(10, "ten")],
    vec![entry(5, "five")],
    vec![entry(20, "twenty")],
  ];

  for sink in [run_blocking(&script), run_pipelined(&script).await] {
    assert_eq!(millis(&sink), vec![5, 10, 20]);
    assert_eq!(sink.payloads(), vec![&"five", &"ten", &"twenty"]);
    assert_eq!(sink.completions(), 1);
  }
}

#[tokio::test]
async fn scenario_one_empty_source() {
  let script: Script = vec![vec![]];

  for sink in [run_blocking(&script), run_pipelined(&script).await] {
    assert!(sink.entries().is_empty());
    assert_eq!(sink.completions(), 1);
  }
}

#[tokio::test]
async fn scenario_two_interleaved_sources() {
  let script = vec![
    vec![entry(1, "a"), entry(3, "a"), entry(5, "a")],
    vec![entry(2, "b"), entry(4, "b")],
  ];

  for sink in [run_blocking(&script), run_pipelined(&script).await] {
    assert_eq!(millis(&sink), vec![1, 2, 3, 4, 5]);
    assert_eq!(sink.completions(), 1);
  }
}

#[tokio::test]
async fn scenario_failure_on_second_pull() {
  init_tracing();
  let failing = || {
    vec![
      TryIterSource::new(vec![
        Ok(entry(1, "a")),
        Err::<Entry<&'static str>, BoxError>("lost connection".into()),
      ]),
      TryIterSource::new(vec![Ok(entry(2, "b")), Ok(entry(3, "b"))]),
    ]
  };

  let mut blocking_sink = VecSink::new();
  let blocking_error = merge_blocking(&mut failing(), &mut blocking_sink).unwrap_err();

  let pipelined_sources: Vec<_> = failing().into_iter().map(BlockingAsAsync::new).collect();
  let mut pipelined_sink = VecSink::new();
  let pipelined_error = merge_pipelined(pipelined_sources, &mut pipelined_sink)
    .await
    .unwrap_err();

  for (error, sink) in [
    (blocking_error, blocking_sink),
    (pipelined_error, pipelined_sink),
  ] {
    assert!(matches!(
      error,
      MergeError::Source {
        index: SourceIndex(0),
        ..
      }
    ));
    assert_eq!(millis(&sink), vec![1]);
    assert_eq!(sink.completions(), 0);
  }
}

#[tokio::test]
async fn scenario_zero_sources() {
  let script: Script = Vec::new();

  for sink in [run_blocking(&script), run_pipelined(&script).await] {
    assert!(sink.entries().is_empty());
    assert_eq!(sink.completions(), 1);
  }
}

/// Random sources: sorted runs of random length with frequent timestamp ties.
fn random_script(seed: u64) -> Script {
  const PAYLOADS: [&str; 4] = ["w", "x", "y", "z"];
  let mut rng = StdRng::seed_from_u64(seed);
  let source_count = rng.gen_range(0..8);
  (0..source_count)
    .map(|_| {
      let len = rng.gen_range(0..12);
      let mut ts = rng.gen_range(0..20);
      (0..len)
        .map(|_| {
          ts += rng.gen_range(0..4);
          entry(ts, PAYLOADS[rng.gen_range(0..PAYLOADS.len())])
        })
        .collect()
    })
    .collect()
}

#[tokio::test]
async fn property_ordered_complete_and_equivalent() {
  for seed in 0..64 {
    let script = random_script(seed);
    let blocking = run_blocking(&script);
    let pipelined = run_pipelined(&script).await;

    // total ordering
    let ts = millis(&blocking);
    assert!(ts.windows(2).all(|w| w[0] <= w[1]), "seed {seed}: {ts:?}");

    // completeness: every (source, entry) exactly once
    let mut expected: HashMap<(usize, i64, &str), usize> = HashMap::new();
    for (index, entries) in script.iter().enumerate() {
      for e in entries {
        *expected
          .entry((index, e.timestamp.timestamp_millis(), e.payload))
          .or_default() += 1;
      }
    }
    let mut actual: HashMap<(usize, i64, &str), usize> = HashMap::new();
    for (index, e) in blocking.entries() {
      *actual
        .entry((index.as_usize(), e.timestamp.timestamp_millis(), e.payload))
        .or_default() += 1;
    }
    assert_eq!(actual, expected, "seed {seed}");

    // equivalence, including tie order
    assert_eq!(blocking.entries(), pipelined.entries(), "seed {seed}");
    assert_eq!(blocking.completions(), 1);
    assert_eq!(pipelined.completions(), 1);
  }
}

#[tokio::test(start_paused = true)]
async fn synthetic_sources_with_latency_match_blocking_merge() {
  init_tracing();
  let base = DateTime::<Utc>::from_timestamp_millis(0).unwrap();
  let make = |latency: Option<Duration>| -> Vec<SyntheticSource> {
    (0..5u64)
      .map(|s| {
        let source = SyntheticSource::new(format!("feed-{s}"), 40, base)
          .with_seed(1_000 + s)
          .with_max_gap(TimeDelta::milliseconds(3));
        match latency {
          Some(max) => source.with_max_latency(max),
          None => source,
        }
      })
      .collect()
  };

  let mut blocking_sink: VecSink<SyntheticEvent> = VecSink::new();
  merge_blocking(&mut make(None), &mut blocking_sink).unwrap();

  let merger = PipelinedMerger::new(MergeConfig::new().with_name("synthetic".to_string()));
  let mut pipelined_sink: VecSink<SyntheticEvent> = VecSink::new();
  merger
    .run(make(Some(Duration::from_millis(25))), &mut pipelined_sink)
    .await
    .unwrap();

  assert_eq!(blocking_sink.entries().len(), 200);
  assert_eq!(blocking_sink.entries(), pipelined_sink.entries());
}

#[tokio::test]
async fn stream_sources_into_channel_sink() {
  let streams = vec![
    StreamSource::new(stream::iter(vec![
      Ok::<_, BoxError>(entry(2, "s0")),
      Ok(entry(6, "s0")),
    ])),
    StreamSource::new(stream::iter(vec![Ok(entry(4, "s1"))])),
  ];
  let (mut sink, output) = ChannelSink::new(8);

  let consumer = tokio::spawn(async move { output.collect::<Vec<_>>().await });
  merge_pipelined(streams, &mut sink).await.unwrap();
  drop(sink);

  let merged = consumer.await.unwrap();
  let order: Vec<(usize, i64)> = merged
    .iter()
    .map(|(index, e)| (index.as_usize(), e.timestamp.timestamp_millis()))
    .collect();
  assert_eq!(order, vec![(0, 2), (1, 4), (0, 6)]);
}
