use crate::bail;
use crate::error::{ErrorKind, EtlResult};
use crate::extractor::base::Extractor;
use crate::metrics::EtlMetrics;

/// An [`Extractor`] over any iterator of results.
///
/// Errors yielded by the iterator are returned from [`Extractor::next`] as they are.
#[derive(Debug)]
pub struct IteratorExtractor<I> {
    iter: I,
    opened: bool,
}

impl<T, I> IteratorExtractor<I>
where
    I: Iterator<Item = EtlResult<T>>,
{
    pub fn new(iter: I) -> Self {
        Self {
            iter,
            opened: false,
        }
    }
}

impl<T> IteratorExtractor<std::vec::IntoIter<EtlResult<T>>> {
    /// Extracts the given values in order.
    pub fn from_values(values: Vec<T>) -> Self {
        let results = values.into_iter().map(Ok).collect::<Vec<_>>();

        IteratorExtractor::new(results.into_iter())
    }
}

impl<T, I> Extractor<T> for IteratorExtractor<I>
where
    I: Iterator<Item = EtlResult<T>>,
{
    fn open(&mut self, _metrics: &dyn EtlMetrics) -> EtlResult<()> {
        self.opened = true;

        Ok(())
    }

    fn next(&mut self) -> EtlResult<Option<T>> {
        if !self.opened {
            bail!(
                ErrorKind::InvalidLifecycleUse,
                "Extractor was polled before being opened"
            );
        }

        self.iter.next().transpose()
    }

    fn close(&mut self) -> EtlResult<()> {
        self.opened = false;

        Ok(())
    }
}
