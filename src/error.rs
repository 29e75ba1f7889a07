//! # Error Handling
//!
//! Errors raised by a merge run.
//!
//! ## Overview
//!
//! Neither engine retries or swallows anything. The first failure, whether a
//! source pull, a sink call, or (pipelined engine only) a fetch that timed out
//! or whose task died, ends the run and is returned from `run` as a
//! [`MergeError`]. When a run fails the sink never receives `complete()`.
//!
//! Sources and sinks report failures as [`BoxError`] so implementations can use
//! whatever error type they already have. [`StringError`] covers the cases where
//! there is only a message.
//!
//! Every [`MergeError`] carries the [`ComponentInfo`] of the engine that failed,
//! so errors from several mergers running side by side can be told apart.

use crate::entry::SourceIndex;
use std::error::Error;
use std::fmt;
use std::time::Duration;

/// Boxed error used by sources and sinks.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Name and type of the component that encountered an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInfo {
  /// The name of the component.
  pub name: String,
  /// The type name of the component.
  pub type_name: String,
}

impl Default for ComponentInfo {
  fn default() -> Self {
    Self {
      name: "default".to_string(),
      type_name: "default".to_string(),
    }
  }
}

impl ComponentInfo {
  /// Creates a new `ComponentInfo` with the given name and type name.
  pub fn new(name: String, type_name: String) -> Self {
    Self { name, type_name }
  }
}

impl fmt::Display for ComponentInfo {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} ({})", self.name, self.type_name)
  }
}

/// A simple error type that wraps a string message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringError(pub String);

impl fmt::Display for StringError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Error for StringError {}

impl From<&str> for StringError {
  fn from(message: &str) -> Self {
    Self(message.to_string())
  }
}

/// Why a merge run stopped before signalling completion.
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
  /// A source's pull returned an error.
  #[error("{component}: pull from source {index} failed: {source}")]
  Source {
    /// The engine that was running.
    component: ComponentInfo,
    /// The failing source.
    index: SourceIndex,
    /// The error the source reported.
    source: BoxError,
  },
  /// The sink rejected an emission or the completion signal.
  #[error("{component}: sink failed: {source}")]
  Sink {
    /// The engine that was running.
    component: ComponentInfo,
    /// The error the sink reported.
    source: BoxError,
  },
  /// An outstanding fetch did not resolve within the configured timeout.
  #[error("{component}: fetch for source {index} did not resolve within {timeout:?}")]
  FetchTimeout {
    /// The engine that was running.
    component: ComponentInfo,
    /// The source whose fetch stalled.
    index: SourceIndex,
    /// The configured limit.
    timeout: Duration,
  },
  /// The task running a fetch panicked or was cancelled.
  #[error("{component}: fetch for source {index} aborted: {reason}")]
  FetchAborted {
    /// The engine that was running.
    component: ComponentInfo,
    /// The source whose fetch died.
    index: SourceIndex,
    /// Description of the failure.
    reason: String,
  },
}

impl MergeError {
  /// The engine the error came from.
  pub fn component(&self) -> &ComponentInfo {
    match self {
      Self::Source { component, .. }
      | Self::Sink { component, .. }
      | Self::FetchTimeout { component, .. }
      | Self::FetchAborted { component, .. } => component,
    }
  }

  /// The source involved, if the failure is tied to one.
  pub fn source_index(&self) -> Option<SourceIndex> {
    match self {
      Self::Source { index, .. }
      | Self::FetchTimeout { index, .. }
      | Self::FetchAborted { index, .. } => Some(*index),
      Self::Sink { .. } => None,
    }
  }

  /// Returns `true` if the sink, rather than a source, caused the failure.
  pub fn is_sink_failure(&self) -> bool {
    matches!(self, Self::Sink { .. })
  }
}
