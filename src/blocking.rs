//! # Blocking Merge Engine
//!
//! Merges synchronous sources into one globally ordered sequence.
//!
//! ## Behavior
//!
//! 1. Every source is pulled once, in list order. A source that is exhausted on
//!    its first pull contributes nothing and is never pulled again.
//! 2. The heads are heapified into a [`Frontier`] in one step.
//! 3. The earliest entry is popped and emitted, then its source is pulled once
//!    more. A new entry goes back into the frontier; exhaustion retires the
//!    source for the rest of the run.
//! 4. When the frontier is empty the sink is told the stream is complete.
//!
//! The first error from a source or the sink ends the run. Nothing is retried
//! and `complete` is not called.
//!
//! ## Example
//!
//! ```rust
//! use chronoweave::{BlockingMerger, Entry, IterSource, MergeConfig, VecSink};
//!
//! let at = |ms, p| Entry::from_millis(ms, p).unwrap();
//! let mut sources = vec![
//!   IterSource::new(vec![at(1, 'a'), at(3, 'c')]),
//!   IterSource::new(vec![at(2, 'b')]),
//! ];
//! let mut sink = VecSink::new();
//!
//! BlockingMerger::new(MergeConfig::new().with_name("letters".to_string()))
//!   .run(&mut sources, &mut sink)?;
//! assert_eq!(sink.payloads(), vec![&'a', &'b', &'c']);
//! # Ok::<(), chronoweave::MergeError>(())
//! ```

use crate::config::MergeConfig;
use crate::entry::{Pull, RankedEntry, SourceIndex};
use crate::error::{ComponentInfo, MergeError};
use crate::frontier::Frontier;
use crate::sink::Sink;
use crate::source::Source;
use tracing::{debug, trace, warn};

/// Synchronous k-way merge.
#[derive(Debug, Clone, Default)]
pub struct BlockingMerger {
  config: MergeConfig,
}

impl BlockingMerger {
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
      .component_info("blocking_merge", std::any::type_name::<Self>())
  }

  /// Drains every source into `sink` in timestamp order, then signals completion.
  ///
  /// Sources are identified by their position in `sources`. They are borrowed,
  /// so the caller keeps them once the run returns.
  ///
  /// # Errors
  ///
  /// Returns the first source or sink failure. The sink is not completed in
  /// that case and may already hold part of the output.
  pub fn run<S, K>(&self, sources: &mut [S], sink: &mut K) -> Result<(), MergeError>
  where
    S: Source,
    K: Sink<S::Payload> + ?Sized,
  {
    let component = self.component_info();
    debug!(
      merger = %component.name,
      sources = sources.len(),
      "starting blocking merge"
    );

    let mut seed = Vec::with_capacity(sources.len());
    for (position, source) in sources.iter_mut().enumerate() {
      let index = SourceIndex::new(position);
      match pull_from(source, index, &component)? {
        Pull::Entry(entry) => seed.push(RankedEntry::new(entry, index)),
        Pull::Exhausted => debug!(merger = %component.name, source = %index, "source empty"),
      }
    }

    let mut frontier = Frontier::from_seed(seed);
    let mut emitted = 0usize;
    let mut retired = sources.len() - frontier.len();

    while let Some(ranked) = frontier.pop_min() {
      let (entry, index) = ranked.into_parts();
      trace!(merger = %component.name, source = %index, timestamp = %entry.timestamp, "emit");
      sink.emit(index, entry).map_err(|source| {
        warn!(merger = %component.name, error = %source, "sink rejected entry");
        MergeError::Sink {
          component: component.clone(),
          source,
        }
      })?;
      emitted += 1;

      match pull_from(&mut sources[index.as_usize()], index, &component)? {
        Pull::Entry(next) => {
          debug_assert!(!frontier.contains_source(index));
          frontier.insert(RankedEntry::new(next, index));
        }
        Pull::Exhausted => {
          retired += 1;
          debug!(merger = %component.name, source = %index, "source exhausted");
        }
      }
    }

    sink.complete().map_err(|source| {
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
      "blocking merge complete"
    );
    Ok(())
  }
}

fn pull_from<S: Source>(
  source: &mut S,
  index: SourceIndex,
  component: &ComponentInfo,
) -> Result<Pull<S::Payload>, MergeError> {
  source.pull().map_err(|error| {
    warn!(merger = %component.name, source = %index, error = %error, "pull failed");
    MergeError::Source {
      component: component.clone(),
      index,
      source: error,
    }
  })
}

/// Runs a [`BlockingMerger`] with the default configuration.
///
/// # Errors
///
/// See [`BlockingMerger::run`].
pub fn merge_blocking<S, K>(sources: &mut [S], sink: &mut K) -> Result<(), MergeError>
where
  S: Source,
  K: Sink<S::Payload> + ?Sized,
{
  BlockingMerger::default().run(sources, sink)
}
