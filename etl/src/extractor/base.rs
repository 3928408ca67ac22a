use crate::error::EtlResult;
use crate::metrics::EtlMetrics;

/// A lazy, finite and non-restartable source of values.
///
/// An extractor is driven by a single thread: it is opened once, polled with
/// [`Extractor::next`] until it returns `Ok(None)`, and closed once.
pub trait Extractor<T> {
    /// Prepares the source. `metrics` is the scope the extractor may record into.
    fn open(&mut self, metrics: &dyn EtlMetrics) -> EtlResult<()>;

    /// Returns the next value, or `Ok(None)` once the source is exhausted.
    ///
    /// Fails with [`crate::error::ErrorKind::InvalidLifecycleUse`] when called before
    /// [`Extractor::open`], and with [`crate::error::ErrorKind::BackingFailure`] when the
    /// underlying source fails in a way that cannot be recovered from.
    fn next(&mut self) -> EtlResult<Option<T>>;

    /// Releases the source.
    fn close(&mut self) -> EtlResult<()>;
}
