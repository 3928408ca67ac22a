use std::marker::PhantomData;

use crate::error::EtlResult;
use crate::lookup::Lookup;
use crate::transformer::base::Transformer;

/// Keeps the values for which `filter` returns `true` when checked against `lookup`, drops the
/// rest.
pub struct FilterTransformer<T, F, L> {
    filter: F,
    lookup: L,
    _marker: PhantomData<fn(T)>,
}

impl<T, F, L> FilterTransformer<T, F, L>
where
    F: Fn(&T, &L) -> bool + Send + Sync,
    L: Send + Sync,
{
    pub fn new(filter: F, lookup: L) -> Self {
        Self {
            filter,
            lookup,
            _marker: PhantomData,
        }
    }
}

impl<T, F, L> Transformer<T, T> for FilterTransformer<T, F, L>
where
    F: Fn(&T, &L) -> bool + Send + Sync,
    L: Send + Sync,
{
    fn transform(&self, input: T) -> EtlResult<Vec<T>> {
        if (self.filter)(&input, &self.lookup) {
            Ok(vec![input])
        } else {
            Ok(vec![])
        }
    }
}

/// Filter that keeps values present in the lookup.
pub fn contains_filter<T, L>(value: &T, lookup: &L) -> bool
where
    L: Lookup<T, T>,
{
    lookup.get(value).is_some()
}
