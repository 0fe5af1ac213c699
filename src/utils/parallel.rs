#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Collections smaller than this are mapped sequentially even with `parallel`.
#[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
const PARALLEL_THRESHOLD: usize = 1000;

/// Maps `f` over `collection`, in parallel when the `parallel` feature is on
/// and the collection is large. Output order always matches input order.
#[inline]
pub fn map<T, R, F>(collection: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    #[cfg(all(feature = "parallel", not(target_arch = "wasm32")))]
    {
        if collection.len() > PARALLEL_THRESHOLD {
            return collection.par_iter().map(f).collect();
        }
    }
    collection.iter().map(f).collect()
}
