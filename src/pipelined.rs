//! # Pipelined Merge Engine
//!
//! Merges [`AsyncSource`]s while overlapping their fetch latency.
//!
//! ## Behavior
//!
//! Every pull runs on its own Tokio task. The engine keeps exactly one such
//! fetch in flight for each source that is not yet exhausted:
//!
//! 1. A fetch is issued for every source at once.
//! 2. The fetches are awaited in index order. Each entry that arrives is set
//!    aside for seeding and the next fetch for that source is issued straight
//!    away. Sources that report exhaustion are dropped.
//! 3. The set-aside heads are heapified into a [`Frontier`].
//! 4. The earliest entry is popped and emitted, then the fetch already running
//!    for its source is awaited. An entry goes back into the frontier and the
//!    following fetch is issued immediately; exhaustion drops the source.
//! 5. When the frontier is empty the sink is told the stream is complete.
//!
//! By the time the engine needs a source's next entry, that fetch has been
//! running since the previous entry was taken, so slow sources wait in parallel
//! instead of one after another. Output order is decided by the frontier alone,
//! never by the order in which fetches finish.
//!
//! ## Failure
//!
//! The first failed pull, sink error, panicked fetch task or (when
//! [`MergeConfig::with_fetch_timeout`] is used) stalled fetch ends the run. All
//! fetches still in flight are aborted and `complete` is not called.

use crate::config::MergeConfig;
use crate::entry::{Pull, RankedEntry, SourceIndex};
use crate::error::{BoxError, ComponentInfo, MergeError};
use crate::frontier::Frontier;
use crate::sink::AsyncSink;
use crate::source::AsyncSource;
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

/// A fetch task hands the source back together with what it pulled.
type Fetch<S> = JoinHandle<(S, Result<Pull<<S as AsyncSource>::Payload>, BoxError>)>;

/// Fetches currently in flight, keyed by source index.
///
/// Owned by the coordinating task only. Dropping it aborts whatever is left.
struct InFlight<S: AsyncSource> {
  fetches: HashMap<SourceIndex, Fetch<S>>,
}

impl<S: AsyncSource> InFlight<S> {
  fn with_capacity(capacity: usize) -> Self {
    Self {
      fetches: HashMap::with_capacity(capacity),
    }
  }

  fn issue(&mut self, index: SourceIndex, mut source: S) {
    trace!(source = %index, "issue fetch");
    let handle = tokio::spawn(async move {
      let result = source.pull().await;
      (source, result)
    });
    let previous = self.fetches.insert(index, handle);
    debug_assert!(previous.is_none(), "two fetches in flight for source {index}");
  }

  async fn resolve(
    &mut self,
    index: SourceIndex,
    timeout: Option<Duration>,
    component: &ComponentInfo,
  ) -> Result<(S, Pull<S::Payload>), MergeError> {
    let Some(mut handle) = self.fetches.remove(&index) else {
      return Err(MergeError::FetchAborted {
        component: component.clone(),
        index,
        reason: "no fetch in flight".to_string(),
      });
    };

    let joined = match timeout {
      Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
        Ok(joined) => joined,
        Err(_) => {
          handle.abort();
          warn!(merger = %component.name, source = %index, ?limit, "fetch timed out");
          return Err(MergeError::FetchTimeout {
            component: component.clone(),
            index,
            timeout: limit,
          });
        }
      },
      None => handle.await,
    };

    let (source, result) = joined.map_err(|join_error| {
      error!(merger = %component.name, source = %index, error = %join_error, "fetch task failed");
      MergeError::FetchAborted {
        component: component.clone(),
        index,
        reason: join_error.to_string(),
      }
    })?;
    let pull = result.map_err(|error| {
      warn!(merger = %component.name, source = %index, error = %error, "pull failed");
      MergeError::Source {
        component: component.clone(),
        index,
        source: error,
      }
    })?;
    Ok((source, pull))
  }

  fn is_outstanding(&self, index: SourceIndex) -> bool {
    self.fetches.contains_key(&index)
  }

  fn len(&self) -> usize {
    self.fetches.len()
  }
}

impl<S: AsyncSource> Drop for InFlight<S> {
  fn drop(&mut self) {
    for (index, handle) in self.fetches.drain() {
      trace!(source = %index, "abort fetch");
      handle.abort();
    }
  }
}

/// Asynchronous k-way merge with one fetch in flight per active source.
#[derive(Debug, Clone, Default)]
pub struct PipelinedMerger {
  config: MergeConfig,
}

impl PipelinedMerger {
  /// Creates a merger with the given configuration.
  pub fn new(config: MergeConfig) -> Self {
    Self { config }
  }

  /// Returns the configuration this merger runs with.
  pub fn config(&self) -> &MergeConfig {
    &self.config
  }

  fn component_info(&self) -> ComponentInfo {
    self
      .config
      .component_info("pipelined_merge", std::any::type_name::<Self>())
  }

  /// Drains every source into `sink` in timestamp order, then signals completion.
  ///
  /// Sources are identified by their position in `sources` and are moved onto
  /// fetch tasks; each is dropped as soon as it reports exhaustion. Must be
  /// called from within a Tokio runtime.
  ///
  /// # Errors
  ///
  /// Returns the first source, sink or fetch failure. The sink is not completed
  /// in that case and may already hold part of the output.
  pub async fn run<S, K>(&self, sources: Vec<S>, sink: &mut K) -> Result<(), MergeError>
  where
    S: AsyncSource,
    K: AsyncSink<S::Payload> + ?Sized,
  {
    let component = self.component_info();
    let timeout = self.config.fetch_timeout();
    let total = sources.len();
    debug!(
      merger = %component.name,
      sources = total,
      ?timeout,
      "starting pipelined merge"
    );

    let mut in_flight = InFlight::with_capacity(total);
    for (position, source) in sources.into_iter().enumerate() {
      in_flight.issue(SourceIndex::new(position), source);
    }

    let mut seed = Vec::with_capacity(total);
    let mut retired = 0usize;
    for position in 0..total {
      let index = SourceIndex::new(position);
      let (source, pull) = in_flight.resolve(index, timeout, &component).await?;
      match pull {
        Pull::Entry(entry) => {
          in_flight.issue(index, source);
          seed.push(RankedEntry::new(entry, index));
        }
        Pull::Exhausted => {
          retired += 1;
          debug!(merger = %component.name, source = %index, "source empty");
        }
      }
    }

    let mut frontier = Frontier::from_seed(seed);
    let mut emitted = 0usize;

    while let Some(ranked) = frontier.pop_min() {
      let (entry, index) = ranked.into_parts();
      debug_assert!(in_flight.is_outstanding(index));
      trace!(merger = %component.name, source = %index, timestamp = %entry.timestamp, "emit");
      sink.emit(index, entry).await.map_err(|source| {
        warn!(merger = %component.name, error = %source, "sink rejected entry");
        MergeError::Sink {
          component: component.clone(),
          source,
        }
      })?;
      emitted += 1;

      let (source, pull) = in_flight.resolve(index, timeout, &component).await?;
      match pull {
        Pull::Entry(next) => {
          in_flight.issue(index, source);
          debug_assert!(!frontier.contains_source(index));
          frontier.insert(RankedEntry::new(next, index));
        }
        Pull::Exhausted => {
          retired += 1;
          debug!(merger = %component.name, source = %index, "source exhausted");
        }
      }
    }

    debug_assert_eq!(in_flight.len(), 0);
    sink.complete().await.map_err(|source| {
      warn!(merger = %component.name, error = %source, "sink failed to complete");
      MergeError::Sink {
        component: component.clone(),
        source,
      }
    })?;
    debug!(
      merger = %component.name,
      emitted,
      retired,
      "pipelined merge complete"
    );
    Ok(())
  }
}

/// Runs a [`PipelinedMerger`] with the default configuration.
///
/// # Errors
///
/// See [`PipelinedMerger::run`].
pub async fn merge_pipelined<S, K>(sources: Vec<S>, sink: &mut K) -> Result<(), MergeError>
where
  S: AsyncSource,
  K: AsyncSink<S::Payload> + ?Sized,
{
  PipelinedMerger::default().run(sources, sink).await
}
