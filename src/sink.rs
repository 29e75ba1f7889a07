//! # Sink Contract
//!
//! A sink receives the merged output: one `emit` per entry, in final order,
//! followed by exactly one `complete` after the last emission. A failed run
//! never calls `complete`. The engines make no other calls into a sink.
//!
//! ## Reference sinks
//!
//! - [`VecSink`]: collects everything in memory; implements both [`Sink`] and [`AsyncSink`].
//! - [`ChannelSink`]: forwards to a Tokio channel and hands the merged output to
//!   the caller as a stream that ends when the run completes.

use crate::entry::{Entry, SourceIndex};
use crate::error::{BoxError, StringError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Receiver of merged output for the blocking engine.
pub trait Sink<P> {
  /// Accepts the next entry in global order, along with the source it came from.
  ///
  /// # Errors
  ///
  /// Any error aborts the merge run.
  fn emit(&mut self, source: SourceIndex, entry: Entry<P>) -> Result<(), BoxError>;

  /// Called once, after the last emission of a successful run.
  ///
  /// # Errors
  ///
  /// Returned to the caller of the run as a sink failure.
  fn complete(&mut self) -> Result<(), BoxError>;
}

impl<P, K: Sink<P> + ?Sized> Sink<P> for &mut K {
  fn emit(&mut self, source: SourceIndex, entry: Entry<P>) -> Result<(), BoxError> {
    (**self).emit(source, entry)
  }

  fn complete(&mut self) -> Result<(), BoxError> {
    (**self).complete()
  }
}

/// Receiver of merged output for the pipelined engine.
#[async_trait]
pub trait AsyncSink<P: Send + 'static>: Send {
  /// Accepts the next entry in global order, along with the source it came from.
  ///
  /// # Errors
  ///
  /// Any error aborts the merge run.
  async fn emit(&mut self, source: SourceIndex, entry: Entry<P>) -> Result<(), BoxError>;

  /// Called once, after the last emission of a successful run.
  ///
  /// # Errors
  ///
  /// Returned to the caller of the run as a sink failure.
  async fn complete(&mut self) -> Result<(), BoxError>;
}

/// In-memory sink that records every emission and counts completions.
#[derive(Debug, Clone)]
pub struct VecSink<P> {
  entries: Vec<(SourceIndex, Entry<P>)>,
  completions: usize,
}

impl<P> VecSink<P> {
  /// Creates an empty sink.
  pub fn new() -> Self {
    Self {
      entries: Vec::new(),
      completions: 0,
    }
  }

  /// Everything emitted so far, in emission order.
  pub fn entries(&self) -> &[(SourceIndex, Entry<P>)] {
    &self.entries
  }

  /// Timestamps of everything emitted so far, in emission order.
  pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
    self.entries.iter().map(|(_, entry)| entry.timestamp).collect()
  }

  /// Payloads of everything emitted so far, in emission order.
  pub fn payloads(&self) -> Vec<&P> {
    self.entries.iter().map(|(_, entry)| &entry.payload).collect()
  }

  /// Number of times `complete` was called.
  pub fn completions(&self) -> usize {
    self.completions
  }

  /// Returns `true` once `complete` has been called.
  pub fn is_complete(&self) -> bool {
    self.completions > 0
  }

  /// Consumes the sink and returns the recorded emissions.
  pub fn into_entries(self) -> Vec<(SourceIndex, Entry<P>)> {
    self.entries
  }
}

impl<P> Default for VecSink<P> {
  fn default() -> Self {
    Self::new()
  }
}

impl<P> Sink<P> for VecSink<P> {
  fn emit(&mut self, source: SourceIndex, entry: Entry<P>) -> Result<(), BoxError> {
    self.entries.push((source, entry));
    Ok(())
  }

  fn complete(&mut self) -> Result<(), BoxError> {
    self.completions += 1;
    Ok(())
  }
}

#[async_trait]
impl<P: Send + 'static> AsyncSink<P> for VecSink<P> {
  async fn emit(&mut self, source: SourceIndex, entry: Entry<P>) -> Result<(), BoxError> {
    Sink::emit(self, source, entry)
  }

  async fn complete(&mut self) -> Result<(), BoxError> {
    Sink::complete(self)
  }
}

/// Sink that forwards merged output into a bounded Tokio channel.
///
/// Completion drops the sender, so the paired [`ReceiverStream`] ends exactly
/// when the run finishes. A stream that never ends means the run failed or is
/// still going.
#[derive(Debug)]
pub struct ChannelSink<P> {
  tx: Option<mpsc::Sender<(SourceIndex, Entry<P>)>>,
}

impl<P: Send + 'static> ChannelSink<P> {
  /// Creates a sink and the stream its output arrives on.
  pub fn new(capacity: usize) -> (Self, ReceiverStream<(SourceIndex, Entry<P>)>) {
    let (tx, rx) = mpsc::channel(capacity);
    (Self { tx: Some(tx) }, ReceiverStream::new(rx))
  }

  /// Creates a sink around an existing sender.
  pub fn from_sender(tx: mpsc::Sender<(SourceIndex, Entry<P>)>) -> Self {
    Self { tx: Some(tx) }
  }
}

#[async_trait]
impl<P: Send + 'static> AsyncSink<P> for ChannelSink<P> {
  async fn emit(&mut self, source: SourceIndex, entry: Entry<P>) -> Result<(), BoxError> {
    let tx = self
      .tx
      .as_ref()
      .ok_or_else(|| StringError::from("emit after complete"))?;
    tx.send((source, entry))
      .await
      .map_err(|_| StringError::from("output receiver dropped"))?;
    Ok(())
  }

  async fn complete(&mut self) -> Result<(), BoxError> {
    match self.tx.take() {
      Some(_) => Ok(()),
      None => Err(StringError::from("complete called twice").into()),
    }
  }
}
