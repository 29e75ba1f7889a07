//! # chronoweave
//!
//! Incremental k-way merge of timestamped sources into one chronologically
//! ordered stream.
//!
//! Each source is pulled one entry at a time until it reports exhaustion. The
//! engines keep at most one pending entry per source in a min-priority
//! [`Frontier`] and always emit the earliest, so memory stays bounded by the
//! number of sources no matter how long the streams are.
//!
//! ## Engines
//!
//! - [`BlockingMerger`] / [`merge_blocking`]: for sources that answer immediately.
//! - [`PipelinedMerger`] / [`merge_pipelined`]: for sources whose pulls take time.
//!   One fetch per source is always in flight, so latency across sources overlaps.
//!
//! Both produce the same output for the same source contents. Entries with
//! equal timestamps are emitted in ascending source index order.
//!
//! ## Quick Start
//!
//! ```rust
//! use chronoweave::{Entry, IterSource, VecSink, merge_blocking};
//!
//! let at = |ms, p| Entry::from_millis(ms, p).unwrap();
//! let mut sources = vec![
//!   IterSource::new(vec![at(1, "a1"), at(3, "a3"), at(5, "a5")]),
//!   IterSource::new(vec![at(2, "b2"), at(4, "b4")]),
//! ];
//! let mut sink = VecSink::new();
//!
//! merge_blocking(&mut sources, &mut sink)?;
//! assert_eq!(sink.payloads(), vec![&"a1", &"b2", &"a3", &"b4", &"a5"]);
//! assert_eq!(sink.completions(), 1);
//! # Ok::<(), chronoweave::MergeError>(())
//! ```

#![deny(missing_docs)]

/// Synchronous merge engine.
pub mod blocking;
/// Engine configuration.
pub mod config;
/// Entries, pull results and source indices.
pub mod entry;
/// Merge errors.
pub mod error;
/// The ordering structure both engines share.
pub mod frontier;
/// Asynchronous merge engine with pipelined fetches.
pub mod pipelined;
/// Output sinks.
pub mod sink;
/// Source traits and adapters.
pub mod source;
/// Synthetic source generator.
pub mod synthetic;

pub use blocking::{BlockingMerger, merge_blocking};
pub use config::MergeConfig;
pub use entry::{Entry, Pull, RankedEntry, SourceIndex};
pub use error::{BoxError, ComponentInfo, MergeError, StringError};
pub use frontier::Frontier;
pub use pipelined::{PipelinedMerger, merge_pipelined};
pub use sink::{AsyncSink, ChannelSink, Sink, VecSink};
pub use source::{AsyncSource, BlockingAsAsync, IterSource, Source, StreamSource, TryIterSource};
pub use synthetic::{SyntheticEvent, SyntheticSource};

#[cfg(test)]
mod synthetic_test;
