use std::marker::PhantomData;

use crate::error::EtlResult;
use crate::transformer::base::Transformer;

/// Maps every value to exactly one new value.
pub struct MapTransformer<T, R, F> {
    map: F,
    _marker: PhantomData<fn(T) -> R>,
}

impl<T, R, F> MapTransformer<T, R, F>
where
    F: Fn(T) -> R + Send + Sync,
{
    pub fn new(map: F) -> Self {
        Self {
            map,
            _marker: PhantomData,
        }
    }
}

impl<T, R, F> Transformer<T, R> for MapTransformer<T, R, F>
where
    F: Fn(T) -> R + Send + Sync,
{
    fn transform(&self, input: T) -> EtlResult<Vec<R>> {
        Ok(vec![(self.map)(input)])
    }
}
