//! # Source Contract
//!
//! Sources are pulled one entry at a time until they report
//! [`Pull::Exhausted`]. The engines never pull an exhausted source again.
//!
//! ## Overview
//!
//! - [`Source`]: blocking pull, used by [`BlockingMerger`](crate::blocking::BlockingMerger).
//! - [`AsyncSource`]: pull that may take time, used by
//!   [`PipelinedMerger`](crate::pipelined::PipelinedMerger). Each pull runs on its
//!   own Tokio task, so implementations must be `Send + 'static`.
//!
//! A source must never yield an entry earlier than one it already yielded. The
//! engines rely on this for global ordering but do not check it.
//!
//! ## Adapters
//!
//! - [`IterSource`] / [`TryIterSource`]: a blocking source over an iterator.
//! - [`StreamSource`]: an async source over a `futures::Stream`.
//! - [`BlockingAsAsync`]: lifts any blocking source into an async one.

use crate::entry::{Entry, Pull};
use crate::error::BoxError;
use async_trait::async_trait;
use futures::stream::{Fuse, Stream, StreamExt};

/// A producer of timestamped entries that answers immediately.
pub trait Source {
  /// The payload type of the entries this source yields.
  type Payload;

  /// Returns the next entry, or [`Pull::Exhausted`] once there are no more.
  ///
  /// # Errors
  ///
  /// Any error aborts the merge run that issued the pull.
  fn pull(&mut self) -> Result<Pull<Self::Payload>, BoxError>;
}

impl<S: Source + ?Sized> Source for Box<S> {
  type Payload = S::Payload;

  fn pull(&mut self) -> Result<Pull<Self::Payload>, BoxError> {
    (**self).pull()
  }
}

impl<S: Source + ?Sized> Source for &mut S {
  type Payload = S::Payload;

  fn pull(&mut self) -> Result<Pull<Self::Payload>, BoxError> {
    (**self).pull()
  }
}

/// A producer of timestamped entries whose pulls carry latency.
#[async_trait]
pub trait AsyncSource: Send + 'static {
  /// The payload type of the entries this source yields.
  type Payload: Send + 'static;

  /// Resolves to the next entry, or [`Pull::Exhausted`] once there are no more.
  ///
  /// # Errors
  ///
  /// Any error aborts the merge run that issued the pull.
  async fn pull(&mut self) -> Result<Pull<Self::Payload>, BoxError>;
}

#[async_trait]
impl<S: AsyncSource + ?Sized> AsyncSource for Box<S> {
  type Payload = S::Payload;

  async fn pull(&mut self) -> Result<Pull<Self::Payload>, BoxError> {
    (**self).pull().await
  }
}

/// Blocking source over an iterator of entries.
///
/// Reports [`Pull::Exhausted`] once the iterator ends, and on every pull after that.
#[derive(Debug, Clone)]
pub struct IterSource<I> {
  iter: std::iter::Fuse<I>,
}

impl<I: Iterator> IterSource<I> {
  /// Creates a source that yields the items of `items` in order.
  pub fn new<T>(items: T) -> Self
  where
    T: IntoIterator<IntoIter = I>,
  {
    Self {
      iter: items.into_iter().fuse(),
    }
  }
}

impl<I, P> Source for IterSource<I>
where
  I: Iterator<Item = Entry<P>>,
{
  type Payload = P;

  fn pull(&mut self) -> Result<Pull<P>, BoxError> {
    Ok(self.iter.next().into())
  }
}

/// Blocking source over an iterator of fallible entries.
///
/// An `Err` item is returned from [`pull`](Source::pull) as-is.
#[derive(Debug, Clone)]
pub struct TryIterSource<I> {
  iter: std::iter::Fuse<I>,
}

impl<I: Iterator> TryIterSource<I> {
  /// Creates a source that yields the items of `items` in order.
  pub fn new<T>(items: T) -> Self
  where
    T: IntoIterator<IntoIter = I>,
  {
    Self {
      iter: items.into_iter().fuse(),
    }
  }
}

impl<I, P> Source for TryIterSource<I>
where
  I: Iterator<Item = Result<Entry<P>, BoxError>>,
{
  type Payload = P;

  fn pull(&mut self) -> Result<Pull<P>, BoxError> {
    self.iter.next().transpose().map(Pull::from)
  }
}

/// Async source over a stream of fallible entries.
///
/// The end of the stream is reported as [`Pull::Exhausted`].
pub struct StreamSource<St> {
  stream: Fuse<St>,
}

impl<St: Stream> StreamSource<St> {
  /// Wraps `stream`.
  pub fn new(stream: St) -> Self {
    Self {
      stream: stream.fuse(),
    }
  }
}

#[async_trait]
impl<St, P> AsyncSource for StreamSource<St>
where
  St: Stream<Item = Result<Entry<P>, BoxError>> + Send + Unpin + 'static,
  P: Send + 'static,
{
  type Payload = P;

  async fn pull(&mut self) -> Result<Pull<P>, BoxError> {
    self.stream.next().await.transpose().map(Pull::from)
  }
}

/// Runs a blocking [`Source`] behind the [`AsyncSource`] interface.
///
/// The pull happens inline on the fetch task, so the lifted source has no
/// latency of its own.
#[derive(Debug, Clone)]
pub struct BlockingAsAsync<S>(pub S);

impl<S> BlockingAsAsync<S> {
  /// Wraps `source`.
  pub fn new(source: S) -> Self {
    Self(source)
  }

  /// Returns the wrapped source.
  pub fn into_inner(self) -> S {
    self.0
  }
}

#[async_trait]
impl<S> AsyncSource for BlockingAsAsync<S>
where
  S: Source + Send + 'static,
  S::Payload: Send + 'static,
{
  type Payload = S::Payload;

  async fn pull(&mut self) -> Result<Pull<Self::Payload>, BoxError> {
    self.0.pull()
  }
}
